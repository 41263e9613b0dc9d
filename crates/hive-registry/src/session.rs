//! Registry sessions.
//!
//! A [`Registry`] owns one open backend. A process holds at most one session
//! opened through [`Registry::open`]: a second `open` fails with `Busy`, for
//! any file, until the first session is closed or dropped.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use tracing::{info, warn};

use hive_store::{NodeStore, SqliteNodeStore};

use crate::config::RegistryConfig;
use crate::error::{RegistryError, RegistryResult};

/// File of the session currently open in this process.
static OPEN_SESSION: Mutex<Option<PathBuf>> = Mutex::new(None);

/// The process-wide session claim, released on drop.
#[derive(Debug)]
struct SessionClaim;

impl SessionClaim {
    fn acquire(path: &Path) -> RegistryResult<Self> {
        let mut open = OPEN_SESSION.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(held) = open.as_ref() {
            return Err(RegistryError::Busy(held.clone()));
        }
        *open = Some(path.to_path_buf());
        Ok(SessionClaim)
    }
}

impl Drop for SessionClaim {
    fn drop(&mut self) {
        *OPEN_SESSION.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

/// An open registry.
///
/// Reads take `&self`; every mutation takes `&mut self` and runs as one
/// transaction against the backend.
pub struct Registry<S: NodeStore = SqliteNodeStore> {
    pub(crate) store: S,
    pub(crate) config: RegistryConfig,
    claim: Option<SessionClaim>,
}

impl Registry<SqliteNodeStore> {
    /// Open the registry file named by `config`, creating it if needed.
    ///
    /// Fails with `Busy` while another session is open in this process.
    pub fn open(config: RegistryConfig) -> RegistryResult<Self> {
        let claim = SessionClaim::acquire(&config.path)?;
        let store = SqliteNodeStore::open(&config.path, config.sqlite_options())?;
        info!(path = %config.path.display(), "registry opened");
        Ok(Self {
            store,
            config,
            claim: Some(claim),
        })
    }
}

impl<S: NodeStore> Registry<S> {
    /// Wrap an already open backend. No session claim is taken.
    pub fn with_store(store: S, config: RegistryConfig) -> Self {
        Self {
            store,
            config,
            claim: None,
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Direct backend access. Writes made here bypass the registry's
    /// type-consistency checks.
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Close the backend and release the session claim.
    pub fn close(self) -> RegistryResult<()> {
        let Self {
            store,
            config,
            claim,
        } = self;
        let result = store.close();
        drop(claim);
        result?;
        info!(path = %config.path.display(), "registry closed");
        Ok(())
    }

    /// Destroy every key, leaving an empty namespace.
    pub fn initialize(&mut self) -> RegistryResult<()> {
        self.mutate("initialize", |store| Ok(store.reset()?))?;
        info!(path = %self.config.path.display(), "registry initialized");
        Ok(())
    }

    /// Run `f` as one transaction, logging when it is rolled back.
    pub(crate) fn mutate<T, F>(&mut self, op: &'static str, f: F) -> RegistryResult<T>
    where
        F: FnOnce(&mut S) -> RegistryResult<T>,
    {
        let result = self.store.atomically(f);
        if let Err(err) = &result {
            warn!(op, error = %err, "mutation rolled back");
        }
        result
    }
}

impl<S: NodeStore + std::fmt::Debug> std::fmt::Debug for Registry<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("store", &self.store)
            .field("config", &self.config)
            .finish()
    }
}
