use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use bankfusion_core::BankCode;
use bankfusion_import::{
    reports, ImportOutcome, ImportSettings, Importer, Layout, MemoryStore, SqliteStore,
    StatementStore,
};
use bankfusion_ingest::Normalizer;

mod config;
mod query_cmd;
mod state;

use config::{Backend, Config};

#[derive(Parser, Debug)]
#[command(name = "bankfusion", version, about = "Normalize and import bank statement JSON")]
struct Cli {
    /// Log filter, e.g. `debug` or `bankfusion_import=debug` (default: $RUST_LOG or info)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Storage backend (overrides bankfusion.toml)
    #[arg(long, global = true, value_enum)]
    backend: Option<Backend>,

    /// SQLite database file (overrides bankfusion.toml)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a default bankfusion.toml and create every collection with its indexes
    Init,

    /// Import every statement file in a directory
    Import {
        dir: PathBuf,

        /// Store every bank in one collection
        #[arg(long)]
        unified: bool,

        /// Drop zero-amount rows that have no description
        #[arg(long)]
        drop_placeholders: bool,

        /// Print the run summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Import a single statement file
    ImportFile {
        file: PathBuf,

        #[arg(long)]
        unified: bool,
    },

    /// Database totals and per-bank overview
    Stats,

    /// Read-only queries over imported statements
    Query {
        #[command(subcommand)]
        command: query_cmd::QueryCommand,
    },

    /// Drop indexes (and optionally documents) so a collection can be rebuilt
    Reset {
        /// Only this collection (default: all)
        #[arg(long)]
        collection: Option<String>,

        /// Only the collection this bank imports into, e.g. `HDFC`
        #[arg(long, conflicts_with = "collection")]
        bank: Option<BankCode>,

        /// Also delete every document
        #[arg(long)]
        all_documents: bool,
    },
}

fn init_tracing(level: Option<&str>) {
    let filter = match level {
        Some(l) => EnvFilter::new(l),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn open_store(cfg: &Config) -> Result<Box<dyn StatementStore>> {
    Ok(match cfg.store.backend {
        Backend::Sqlite => {
            let path = cfg.store.db_path()?;
            Box::new(
                SqliteStore::open(&path)
                    .with_context(|| format!("opening store {}", path.display()))?,
            )
        }
        Backend::Memory => Box::new(MemoryStore::new()),
    })
}

fn import_settings(cfg: &Config, unified: bool) -> ImportSettings {
    let mut settings = cfg.import.clone();
    if unified {
        settings.layout = Layout::Unified;
    }
    settings
}

fn reset_targets(
    store: &dyn StatementStore,
    settings: &ImportSettings,
    collection: Option<String>,
    bank: Option<BankCode>,
) -> Result<Vec<String>> {
    Ok(match (collection, bank) {
        (Some(c), _) => vec![c],
        (None, Some(b)) => vec![settings.collection_for(b)],
        (None, None) => store.collections()?,
    })
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref());

    let mut cfg = config::load_config()?;
    if let Some(backend) = cli.backend {
        cfg.store.backend = backend;
    }
    if let Some(db) = &cli.db {
        cfg.store.path = Some(db.display().to_string());
    }

    match cli.command {
        Command::Init => {
            config::init_config()?;
            let mut store = open_store(&cfg)?;
            for c in cfg.import.collections() {
                cfg.import.prepare_collection(store.as_mut(), &c)?;
                println!("Ready: {c}");
            }
        }

        Command::Import {
            dir,
            unified,
            drop_placeholders,
            json,
        } => {
            if !dir.is_dir() {
                bail!("not a directory: {}", dir.display());
            }
            if drop_placeholders {
                cfg.normalize.drop_placeholder_transactions = true;
            }
            let mut store = open_store(&cfg)?;
            let normalizer = Normalizer::new(cfg.normalize.clone())?;
            let mut importer =
                Importer::new(store.as_mut(), normalizer, import_settings(&cfg, unified));
            let stats = importer.import_directory(&dir)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                print!("{stats}");
            }
        }

        Command::ImportFile { file, unified } => {
            let mut store = open_store(&cfg)?;
            let normalizer = Normalizer::new(cfg.normalize.clone())?;
            let mut importer =
                Importer::new(store.as_mut(), normalizer, import_settings(&cfg, unified));
            match importer.import_file(&file)? {
                ImportOutcome::Inserted { bank, collection } => {
                    println!("Inserted {} statement into {collection}", bank.display_name());
                }
                ImportOutcome::Duplicate { collection, .. } => {
                    println!("Already imported (duplicate in {collection})");
                }
                ImportOutcome::Failed { message, .. } => {
                    bail!("import of {} failed: {message}", file.display());
                }
            }
        }

        Command::Stats => {
            let store = open_store(&cfg)?;
            let stats = reports::database_stats(store.as_ref())?;
            println!("Statements:    {}", stats.total_statements);
            println!("Transactions:  {}", stats.total_transactions);
            if let (Some(first), Some(last)) = (stats.earliest_statement, stats.latest_statement) {
                println!(
                    "Date range:    {} .. {}",
                    first.format("%Y-%m-%d"),
                    last.format("%Y-%m-%d")
                );
            }
            for (bank, n) in &stats.by_bank {
                println!("  {bank:<24} {n}");
            }

            let overview = reports::bank_overview(store.as_ref())?;
            if !overview.is_empty() {
                println!();
                for row in overview {
                    println!(
                        "{:<26} statements={:<4} holders={:<3} closing={:.2} cr={:.2} dr={:.2}",
                        row.collection,
                        row.statements,
                        row.distinct_holders,
                        row.total_closing_balance,
                        row.total_credits,
                        row.total_debits
                    );
                }
            }
        }

        Command::Query { command } => {
            let store = open_store(&cfg)?;
            query_cmd::run(store.as_ref(), command)?;
        }

        Command::Reset {
            collection,
            bank,
            all_documents,
        } => {
            let mut store = open_store(&cfg)?;
            let targets = reset_targets(store.as_ref(), &cfg.import, collection, bank)?;
            for c in targets {
                store.drop_indexes(&c)?;
                info!(collection = %c, "indexes dropped");
                if all_documents {
                    let n = store.clear(&c)?;
                    println!("{c}: indexes dropped, {n} document(s) deleted");
                } else {
                    println!("{c}: indexes dropped");
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_targets() {
        let mut store = MemoryStore::new();
        store.ensure_collection("hdfc_statements").unwrap();
        store.ensure_collection("sbi_statements").unwrap();
        let settings = ImportSettings::default();

        assert_eq!(
            reset_targets(&store, &settings, None, None).unwrap(),
            vec!["hdfc_statements", "sbi_statements"]
        );
        assert_eq!(
            reset_targets(&store, &settings, Some("x".into()), None).unwrap(),
            vec!["x"]
        );

        let bank: BankCode = "hdfc".parse().unwrap();
        assert_eq!(
            reset_targets(&store, &settings, None, Some(bank)).unwrap(),
            vec!["hdfc_statements"]
        );
        let unified = import_settings(&Config::default(), true);
        assert_eq!(
            reset_targets(&store, &unified, None, Some(bank)).unwrap(),
            vec![unified.unified_collection.clone()]
        );
    }

    #[test]
    fn test_reset_bank_flag_parses_short_code() {
        let cli = Cli::try_parse_from(["bankfusion", "reset", "--bank", "SBI"]).unwrap();
        match cli.command {
            Command::Reset { bank, collection, .. } => {
                assert_eq!(bank, Some(BankCode::Sbi));
                assert!(collection.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
        assert!(Cli::try_parse_from(["bankfusion", "reset", "--bank", "NOPE"]).is_err());
        assert!(
            Cli::try_parse_from(["bankfusion", "reset", "--bank", "SBI", "--collection", "x"])
                .is_err()
        );
    }
}
