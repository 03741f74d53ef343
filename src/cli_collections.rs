use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use collections_server::collection_store::{CollectionStore, SqliteCollectionStore};
use collections_server::collections::{CollectionFilter, CollectionQueryService};

fn parse_path(s: &str) -> Result<PathBuf> {
    let original_path = PathBuf::from(s);
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

/// Offline inspection and maintenance of a collections database.
#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to the SQLite database file.
    #[clap(long, value_parser = parse_path)]
    pub db_path: PathBuf,

    /// Seconds to wait for the database before giving up.
    #[clap(long, default_value_t = 10)]
    pub timeout_sec: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Prints the stored collections as JSON, optionally filtered.
    List {
        /// Case-insensitive substring of the collection name.
        #[clap(long, default_value = "")]
        search: String,

        /// Exact priority, case-insensitive (High, Medium, Low).
        #[clap(long, default_value = "")]
        priority: String,
    },

    /// Deletes a collection. Its products stay cached.
    Delete { id: String },

    /// Prints every cached product as JSON.
    Products,
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();

    if !args.db_path.is_file() {
        bail!("Database file not found: {:?}", args.db_path);
    }
    let store = Arc::new(
        SqliteCollectionStore::new(&args.db_path)
            .with_context(|| format!("Failed to open {:?}", args.db_path))?,
    );

    match args.command {
        Command::List { search, priority } => {
            let query =
                CollectionQueryService::new(store, Duration::from_secs(args.timeout_sec));
            let collections = query
                .list_filtered(&CollectionFilter::new(search, priority))
                .await?;
            print_json(&collections)
        }
        Command::Delete { id } => {
            if !store.delete_collection(&id, None)? {
                bail!("Collection not found: {}", id);
            }
            println!("Collection {} deleted", id);
            Ok(())
        }
        Command::Products => print_json(&store.list_products()?),
    }
}
