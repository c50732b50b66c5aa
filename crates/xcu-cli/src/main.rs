use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rusqlite::Connection;
use rusqlite::types::ValueRef;

use xcu_core::{FileClassifier, PathsConfig, XcuConfig, paths};

// ─── CLI Definition ─────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "xcu",
    about = "basename, dirname and libmagic filetype, from the shell or inside SQLite",
    version,
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output in JSON format.
    /// Also enabled by setting XCU_JSON=1.
    #[arg(long, global = true)]
    json: bool,

    /// Config file to use instead of the standard location.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the last component of each path.
    Basename {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Print the containing directory of each path.
    Dirname {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Describe the content of each file with libmagic.
    Filetype {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Run one SQL statement against a database with the functions registered.
    Query {
        database: PathBuf,
        sql: String,
    },

    /// Config management.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Run diagnostics.
    Doctor,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration as TOML.
    Show,
    /// Print the config file location.
    Path,
}

// ─── Main ────────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    init_tracing();

    let start = Instant::now();
    let cli = Cli::parse();
    let json_output = cli.json || std::env::var("XCU_JSON").as_deref() == Ok("1");

    let config_path = cli.config.clone().unwrap_or_else(XcuConfig::config_path);
    let config = XcuConfig::load_from(&config_path)
        .with_context(|| format!("loading config from {}", config_path.display()))?;

    match cli.command {
        Commands::Basename { paths: inputs } => {
            let results = split_all(&inputs, &config.paths, paths::basename)?;
            print_results(json_output, &results, start)?;
        }

        Commands::Dirname { paths: inputs } => {
            let results = split_all(&inputs, &config.paths, paths::dirname)?;
            print_results(json_output, &results, start)?;
        }

        Commands::Filetype { paths: inputs } => {
            let classifier = FileClassifier::open(&config.classifier);
            let mut results = Vec::with_capacity(inputs.len());
            for path in &inputs {
                let prepared = paths::prepare(path.as_os_str().as_encoded_bytes(), &config.paths)?;
                let description = classifier.describe(&paths::as_path(prepared));
                results.push((path.display().to_string(), description));
            }
            print_results(json_output, &results, start)?;
        }

        Commands::Query { database, sql } => {
            let conn = open_db(&database, &config)?;
            let output = run_query(&conn, &sql)?;
            let dur = start.elapsed().as_millis();

            if json_output {
                let items: Vec<serde_json::Value> = output
                    .rows
                    .iter()
                    .map(|row| {
                        let object: serde_json::Map<String, serde_json::Value> =
                            output.columns.iter().cloned().zip(row.iter().cloned()).collect();
                        serde_json::Value::Object(object)
                    })
                    .collect();
                print_json(&serde_json::json!({
                    "status": "ok",
                    "data": { "columns": output.columns, "items": items, "changes": output.changes },
                    "meta": { "duration_ms": dur }
                }))?;
            } else if output.columns.is_empty() {
                println!("{} row(s) changed", output.changes);
            } else {
                for row in &output.rows {
                    let cells: Vec<String> = row.iter().map(cell_text).collect();
                    println!("{}", cells.join("\t"));
                }
            }
        }

        Commands::Config { action } => match action {
            ConfigAction::Show => {
                if json_output {
                    print_json(&serde_json::json!({
                        "status": "ok",
                        "data": {
                            "path": config_path.display().to_string(),
                            "classifier": {
                                "database": config.classifier.database.as_ref().map(|p| p.display().to_string()),
                                "follow_symlinks": config.classifier.follow_symlinks,
                                "report_errors": config.classifier.report_errors,
                            },
                            "paths": {
                                "max_len": config.paths.max_len,
                                "strict_length": config.paths.strict_length,
                            }
                        }
                    }))?;
                } else {
                    print!("{}", config.to_toml()?);
                }
            }
            ConfigAction::Path => println!("{}", config_path.display()),
        },

        Commands::Doctor => {
            let mut issues = 0;
            if config_path.exists() {
                println!("✓ Config: {}", config_path.display());
            } else {
                println!("○ Config: not found (using defaults)");
            }

            let classifier = FileClassifier::open(&config.classifier);
            match classifier.init_failure() {
                None => {
                    let database = config
                        .classifier
                        .database
                        .as_ref()
                        .map(|p| p.display().to_string())
                        .unwrap_or_else(|| "default".to_string());
                    println!("✓ libmagic: ready (database: {database})");
                }
                Some(failure) => {
                    issues += 1;
                    println!("✗ libmagic: {failure}");
                }
            }

            println!(
                "○ Paths: max {} bytes, {}",
                config.paths.max_len,
                if config.paths.strict_length { "over-long input rejected" } else { "over-long input truncated" }
            );

            match Connection::open_in_memory().and_then(|conn| {
                xcu_ext::register_functions(&conn, std::sync::Arc::new(classifier), config.paths)?;
                conn.query_row("SELECT basename('/a/b/'), dirname('/a/b/')", [], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
                })
            }) {
                Ok((base, dir)) if base == "b" && dir == "/a" => println!("✓ SQL functions: registered"),
                Ok((base, dir)) => {
                    issues += 1;
                    println!("✗ SQL functions: unexpected results {base:?}, {dir:?}");
                }
                Err(e) => {
                    issues += 1;
                    println!("✗ SQL functions: {e}");
                }
            }

            if issues > 0 {
                println!("\n{issues} issue(s) found");
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

// ─── Helpers ────────────────────────────────────────────────────────────────

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn print_json(val: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(val)?);
    Ok(())
}

fn print_results(json_output: bool, results: &[(String, String)], start: Instant) -> Result<()> {
    if json_output {
        let items: Vec<serde_json::Value> = results
            .iter()
            .map(|(path, result)| serde_json::json!({ "path": path, "result": result }))
            .collect();
        print_json(&serde_json::json!({
            "status": "ok",
            "data": { "items": items },
            "meta": { "duration_ms": start.elapsed().as_millis() }
        }))?;
    } else {
        for (_, result) in results {
            println!("{result}");
        }
    }
    Ok(())
}

fn split_all(
    inputs: &[PathBuf],
    limits: &PathsConfig,
    split: fn(&[u8]) -> &[u8],
) -> Result<Vec<(String, String)>> {
    inputs
        .iter()
        .map(|path| {
            let prepared = paths::prepare(path.as_os_str().as_encoded_bytes(), limits)?;
            Ok((
                path.display().to_string(),
                String::from_utf8_lossy(split(prepared)).into_owned(),
            ))
        })
        .collect()
}

fn open_db(path: &Path, config: &XcuConfig) -> Result<Connection> {
    let conn = Connection::open(path).with_context(|| format!("opening {}", path.display()))?;
    let classifier = xcu_ext::shared_classifier(&config.classifier);
    xcu_ext::register_functions(&conn, classifier, config.paths)?;
    tracing::debug!("opened {} with xcu functions", path.display());
    Ok(conn)
}

struct QueryOutput {
    columns: Vec<String>,
    rows: Vec<Vec<serde_json::Value>>,
    changes: u64,
}

fn run_query(conn: &Connection, sql: &str) -> Result<QueryOutput> {
    let mut stmt = conn.prepare(sql).with_context(|| format!("preparing: {sql}"))?;
    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

    let mut rows = Vec::new();
    let mut cursor = stmt.query([])?;
    while let Some(row) = cursor.next()? {
        let mut values = Vec::with_capacity(columns.len());
        for i in 0..columns.len() {
            values.push(json_value(row.get_ref(i)?));
        }
        rows.push(values);
    }
    drop(cursor);

    let changes = if columns.is_empty() { conn.changes() } else { 0 };
    Ok(QueryOutput { columns, rows, changes })
}

fn json_value(value: ValueRef<'_>) -> serde_json::Value {
    match value {
        ValueRef::Null => serde_json::Value::Null,
        ValueRef::Integer(i) => serde_json::json!(i),
        ValueRef::Real(f) => serde_json::json!(f),
        ValueRef::Text(t) => serde_json::Value::String(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => {
            serde_json::Value::String(b.iter().map(|byte| format!("{byte:02x}")).collect())
        }
    }
}

fn cell_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => "NULL".to_string(),
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
