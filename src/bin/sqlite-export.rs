use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sqlite_export::*;
use tracing::{info, Level};

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
#[clap(propagate_version = true)]
struct Cli {
    /// configuration file path, created with defaults if missing
    #[clap(short, long)]
    config: Option<String>,

    /// SQLite database path, overrides the configured one
    #[clap(long, global = true)]
    db: Option<PathBuf>,

    /// Print debug information
    #[clap(long)]
    debug: bool,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export the country table with a derived density column.
    Export {
        /// Destination file, replaced if it exists
        #[clap(short, long)]
        output: Option<PathBuf>,

        /// Output format
        #[clap(short, long, value_enum, default_value_t = OutputFormat::Csv)]
        format: OutputFormat,

        /// Source table
        #[clap(short, long)]
        table: Option<String>,
    },

    /// Print the column names of a table, in physical order.
    Columns {
        #[clap(name = "TABLE")]
        table: String,
    },

    /// Print the names of all tables in the database.
    Tables,

    /// Run a literal SQL statement and print the resulting rows as CSV.
    Query {
        #[clap(name = "SQL")]
        statement: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.debug {
        tracing_subscriber::fmt()
            // filter spans/events with level DEBUG or higher.
            .with_max_level(Level::DEBUG)
            .init();
    }

    let config = ExportConfig::new(&cli.config).context("failed to load configuration")?;
    let db_path = cli.db.unwrap_or_else(|| config.db_path.clone());
    info!("using database {}", db_path.display());
    let store = SqliteStore::open(db_path);

    match cli.command {
        Commands::Export {
            output,
            format,
            table,
        } => {
            let mut mapping = config.mapping();
            if let Some(table) = table {
                mapping.table = table;
            }
            let destination = output.unwrap_or_else(|| config.output.clone());
            let count = export(&store, &destination, &mapping, format)
                .with_context(|| format!("failed to export table '{}'", mapping.table))?;
            println!("exported {} rows to {}", count, destination.display());
        }
        Commands::Columns { table } => {
            for column in store.columns(&table)? {
                println!("{}", column);
            }
        }
        Commands::Tables => {
            for table in store.tables()? {
                println!("{}", table);
            }
        }
        Commands::Query { statement } => {
            let rows = store.execute(&statement)?;
            let stdout = std::io::stdout();
            let mut wtr = csv::WriterBuilder::new()
                .flexible(true)
                .from_writer(stdout.lock());
            for row in rows {
                wtr.write_record(row.values().iter().map(|v| v.to_string()))?;
            }
            wtr.flush()?;
        }
    }

    Ok(())
}
