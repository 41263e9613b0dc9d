use anyhow::{bail, Context};
use colored::Colorize;
use serde::Serialize;

use hive_registry::{ConsistencyReport, NodeStore, Registry, RegistryConfig};
use hive_types::{KeyPair, KeyType, KeyValue};

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(&cli)?;
    let path = config.path.clone();
    let mut registry = Registry::open(config)
        .with_context(|| format!("opening registry at {}", path.display()))?;

    let result = execute(&mut registry, cli.command);
    registry.close()?;

    let output = result?;
    print_output(&output, cli.format)?;
    if let Output::Report(report) = &output {
        if !report.is_clean() {
            bail!("registry inconsistent: {} violation(s)", report.violations.len());
        }
    }
    Ok(())
}

fn load_config(cli: &Cli) -> anyhow::Result<RegistryConfig> {
    let mut config = match &cli.config {
        Some(file) => RegistryConfig::load(file)?,
        None => RegistryConfig::default(),
    };
    if let Some(db) = &cli.db {
        config.path = db.clone();
    }
    Ok(config)
}

/// Result of one command, printable as text or JSON.
#[derive(Debug, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum Output {
    Initialized,
    Added { key: String },
    Deleted { key: String },
    Stored { key: String, kind: KeyType, bytes: usize },
    Pair(PairView),
    Listing { parent: String, children: Vec<String> },
    Report(ConsistencyReport),
}

#[derive(Debug, Serialize)]
pub struct PairView {
    pub key: String,
    pub kind: KeyType,
    /// Numbers and text as-is, raw bytes hex-encoded, void as null.
    pub value: serde_json::Value,
}

impl From<KeyPair> for PairView {
    fn from(pair: KeyPair) -> Self {
        let (key, value) = pair.into_parts();
        let kind = value.key_type();
        let value = match value {
            KeyValue::Void => serde_json::Value::Null,
            KeyValue::Number(n) => n.into(),
            KeyValue::String(s) => s.into(),
            KeyValue::Raw(bytes) => hex::encode(bytes).into(),
        };
        Self { key, kind, value }
    }
}

pub fn execute<S: NodeStore>(registry: &mut Registry<S>, command: Command) -> anyhow::Result<Output> {
    let output = match command {
        Command::Init => {
            registry.initialize()?;
            Output::Initialized
        }
        Command::Add(args) => {
            registry.add_key(&args.path)?;
            Output::Added { key: canonical(&args.path)? }
        }
        Command::Del(args) => {
            let key = canonical(&args.path)?;
            registry.del_key(&key)?;
            Output::Deleted { key }
        }
        Command::Set(args) => {
            let value = match args.value {
                SetValue::Void => KeyValue::Void,
                SetValue::Number { value } => KeyValue::Number(value),
                SetValue::String { value } => KeyValue::text(&value),
                SetValue::Raw { hex } => KeyValue::Raw(
                    hex::decode(hex.trim()).context("raw values must be hex-encoded")?,
                ),
            };
            let kind = value.key_type();
            let bytes = value.payload_len();
            registry.set(&args.path, value)?;
            Output::Stored { key: canonical(&args.path)?, kind, bytes }
        }
        Command::Get(args) => Output::Pair(registry.get_key_pair(&args.path)?.into()),
        Command::Ls(args) => {
            let children = registry.list(args.path.as_deref())?;
            let parent = match &args.path {
                Some(path) => canonical(path)?,
                None => "/".to_string(),
            };
            Output::Listing { parent, children }
        }
        Command::Verify => Output::Report(registry.verify()?),
    };
    Ok(output)
}

fn canonical(path: &str) -> anyhow::Result<String> {
    Ok(path.parse::<hive_types::KeyPath>()?.to_string())
}

fn print_output(output: &Output, format: OutputFormat) -> anyhow::Result<()> {
    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(output)?);
        return Ok(());
    }
    match output {
        Output::Initialized => println!("{} Registry initialized", "✓".green().bold()),
        Output::Added { key } => println!("{} Added {}", "✓".green(), key.bold()),
        Output::Deleted { key } => println!("{} Deleted {}", "✓".green(), key.bold()),
        Output::Stored { key, kind, bytes } => println!(
            "{} {} = ({}, {} bytes)",
            "✓".green(),
            key.bold(),
            kind.to_string().cyan(),
            bytes
        ),
        Output::Pair(pair) => {
            let value = match &pair.value {
                serde_json::Value::Null => "-".dimmed().to_string(),
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            println!("{} ({}) {}", pair.key.bold(), pair.kind.to_string().cyan(), value);
        }
        Output::Listing { parent, children } => {
            if children.is_empty() {
                println!("{} has no children.", parent.bold());
            }
            for name in children {
                println!("  {name}");
            }
        }
        Output::Report(report) => {
            if report.is_clean() {
                println!("{} Registry consistent", "✓".green().bold());
            } else {
                println!("{} Registry inconsistent", "✗".red().bold());
            }
            println!("  Nodes: {}", report.node_count.to_string().bold());
            println!("  Values: {}", report.value_count.to_string().bold());
            for v in &report.violations {
                println!(
                    "  {} {} {}: {}",
                    "!".red(),
                    v.node.to_string().yellow(),
                    v.name,
                    v.description
                );
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use hive_registry::{InMemoryNodeStore, StorageErrorKind};

    fn memory() -> Registry<InMemoryNodeStore> {
        Registry::with_store(InMemoryNodeStore::new(), RegistryConfig::default())
    }

    fn run(reg: &mut Registry<InMemoryNodeStore>, args: &[&str]) -> anyhow::Result<Output> {
        let mut argv = vec!["hive"];
        argv.extend_from_slice(args);
        execute(reg, Cli::try_parse_from(argv)?.command)
    }

    #[test]
    fn set_and_get_number() {
        let mut reg = memory();
        let out = run(&mut reg, &["set", "net//mtu", "number", "1500"]).unwrap();
        assert!(matches!(
            out,
            Output::Stored { ref key, kind: KeyType::Number, bytes: 8 } if key == "/net/mtu"
        ));

        let Output::Pair(pair) = run(&mut reg, &["get", "/net/mtu"]).unwrap() else {
            panic!("wrong output");
        };
        assert_eq!(pair.value, serde_json::json!(1500));
    }

    #[test]
    fn set_reports_stored_size() {
        let mut reg = memory();
        let out = run(&mut reg, &["set", "/s", "string", "Hello"]).unwrap();
        assert!(matches!(out, Output::Stored { bytes: 6, .. }));
        let out = run(&mut reg, &["set", "/s", "void"]).unwrap();
        assert!(matches!(out, Output::Stored { kind: KeyType::Void, bytes: 0, .. }));
    }

    #[test]
    fn raw_values_are_hex() {
        let mut reg = memory();
        run(&mut reg, &["set", "/blob", "raw", "00ff10"]).unwrap();
        assert_eq!(reg.get_key_pair("/blob").unwrap().as_bytes(), Some(&[0, 0xff, 0x10][..]));

        let Output::Pair(pair) = run(&mut reg, &["get", "/blob"]).unwrap() else {
            panic!("wrong output");
        };
        assert_eq!(pair.value, serde_json::json!("00ff10"));
        assert!(run(&mut reg, &["set", "/blob", "raw", "zz"]).is_err());
    }

    #[test]
    fn add_ls_del() {
        let mut reg = memory();
        run(&mut reg, &["add", "/a/b"]).unwrap();
        run(&mut reg, &["add", "/a/c"]).unwrap();
        let Output::Listing { children, .. } = run(&mut reg, &["ls", "/a"]).unwrap() else {
            panic!("wrong output");
        };
        assert_eq!(children, vec!["b", "c"]);

        run(&mut reg, &["del", "/a"]).unwrap();
        let Output::Listing { children, .. } = run(&mut reg, &["ls"]).unwrap() else {
            panic!("wrong output");
        };
        assert!(children.is_empty());
    }

    #[test]
    fn get_missing_fails() {
        let mut reg = memory();
        let err = run(&mut reg, &["get", "/nope"]).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn storage_errors_propagate() {
        let mut reg = memory();
        reg.store_mut().fail_after(0, StorageErrorKind::ReadOnly);
        let err = run(&mut reg, &["add", "/x"]).unwrap_err();
        assert!(err.to_string().contains("read-only"));
    }

    #[test]
    fn verify_report_serializes() {
        let mut reg = memory();
        run(&mut reg, &["set", "/s", "string", "hi"]).unwrap();
        let out = run(&mut reg, &["verify"]).unwrap();
        let json = serde_json::to_value(&out).unwrap();
        assert_eq!(json["result"], "report");
        assert_eq!(json["node_count"], 2);
        assert!(json["violations"].as_array().unwrap().is_empty());
    }

    #[test]
    fn run_command_against_file() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("reg.db");
        let db_arg = db.to_str().unwrap();

        let cli = Cli::try_parse_from(["hive", "--db", db_arg, "set", "/k", "string", "v"]).unwrap();
        run_command(cli).unwrap();
        let cli = Cli::try_parse_from(["hive", "--db", db_arg, "--format", "json", "get", "/k"]).unwrap();
        run_command(cli).unwrap();

        let reg = Registry::open(RegistryConfig::at(&db)).unwrap();
        assert_eq!(reg.get_key_pair("/k").unwrap().as_str(), Some("v"));
        reg.close().unwrap();
    }
}
