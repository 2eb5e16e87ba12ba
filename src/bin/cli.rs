//! ShardKV CLI
//!
//! Offline inspection and maintenance of one replica's data directory:
//! read keys of any type, replay a file of framed log entries, checkpoint.

use std::fs::File;
use std::io::BufReader;

use clap::{Parser, Subcommand};
use shardkv::log::read_entry;
use shardkv::{Config, DataType, Engine, Result};
use tracing_subscriber::{fmt, EnvFilter};

/// ShardKV CLI
#[derive(Parser, Debug)]
#[command(name = "shardkv-cli")]
#[command(about = "Inspect and maintain a shardkv data directory")]
#[command(version)]
struct Args {
    /// Data directory
    #[arg(short, long, default_value = "./shardkv_data")]
    data_dir: String,

    /// Disable per-table key counters (keys need no table prefix)
    #[arg(long)]
    no_table_counter: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Get a string value
    Get { key: String },

    /// Set a string value
    Set { key: String, value: String },

    /// Delete string keys
    Del { keys: Vec<String> },

    /// Print the data type stored at a key
    Type { key: String },

    /// Print every field and value of a hash
    Hgetall { key: String },

    /// Print list items in [start, stop]
    Lrange {
        key: String,
        #[arg(allow_negative_numbers = true)]
        start: i64,
        #[arg(allow_negative_numbers = true)]
        stop: i64,
    },

    /// Print every member of a set
    Smembers { key: String },

    /// Print sorted-set members by rank in [start, stop]
    Zrange {
        key: String,
        #[arg(allow_negative_numbers = true)]
        start: i64,
        #[arg(allow_negative_numbers = true)]
        stop: i64,
    },

    /// Print the number of keys in a table
    TableCount { table: String },

    /// Print the last applied log index
    AppliedIndex,

    /// Apply every framed log entry in a file
    Apply { file: String },

    /// Write a checkpoint and truncate the WAL
    Checkpoint,
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn,shardkv=info"));
    fmt().with_env_filter(filter).with_target(true).init();

    let args = Args::parse();

    let config = Config::builder()
        .data_dir(&args.data_dir)
        .table_counter(!args.no_table_counter)
        .build();

    let engine = match Engine::open(config) {
        Ok(e) => e,
        Err(e) => {
            tracing::error!("Failed to open engine: {}", e);
            std::process::exit(1);
        }
    };

    let result = run(&engine, args.command);
    if let Err(e) = engine.close() {
        tracing::warn!("Failed to close engine: {}", e);
    }
    if let Err(e) = result {
        eprintln!("(error) {}", e);
        std::process::exit(1);
    }
}

fn run(engine: &Engine, command: Commands) -> Result<()> {
    match command {
        Commands::Get { key } => print_value(engine.get(key.as_bytes())?.as_deref()),
        Commands::Set { key, value } => {
            engine.set(key.as_bytes(), value.as_bytes())?;
            println!("OK");
        }
        Commands::Del { keys } => {
            let keys: Vec<&[u8]> = keys.iter().map(|k| k.as_bytes()).collect();
            println!("(integer) {}", engine.del(&keys)?);
        }
        Commands::Type { key } => {
            let name = engine.key_type(key.as_bytes())?.map_or("none", DataType::name);
            println!("{}", name);
        }
        Commands::Hgetall { key } => {
            for (field, value) in engine.hgetall(key.as_bytes())? {
                println!("{} => {}", String::from_utf8_lossy(&field), String::from_utf8_lossy(&value));
            }
        }
        Commands::Lrange { key, start, stop } => {
            print_list(&engine.lrange(key.as_bytes(), start, stop)?);
        }
        Commands::Smembers { key } => print_list(&engine.smembers(key.as_bytes())?),
        Commands::Zrange { key, start, stop } => {
            for (i, pair) in engine.zrange(key.as_bytes(), start, stop)?.iter().enumerate() {
                println!("{}) {} ({})", i + 1, String::from_utf8_lossy(&pair.member), pair.score);
            }
        }
        Commands::TableCount { table } => {
            println!("(integer) {}", engine.get_table_key_count(table.as_bytes())?);
        }
        Commands::AppliedIndex => println!("(integer) {}", engine.applied_index()?),
        Commands::Apply { file } => {
            let mut reader = BufReader::new(File::open(&file)?);
            let (mut applied, mut skipped, mut failed) = (0u64, 0u64, 0u64);
            while let Some(entry) = read_entry(&mut reader)? {
                match engine.apply(&entry) {
                    Ok(reply) if reply.is_duplicate() => skipped += 1,
                    Ok(_) => applied += 1,
                    Err(e) => {
                        tracing::warn!(index = entry.index, command = entry.command.name(), "apply failed: {}", e);
                        failed += 1;
                    }
                }
            }
            println!("applied {}, skipped {}, failed {}", applied, skipped, failed);
        }
        Commands::Checkpoint => {
            let info = engine.checkpoint()?;
            println!(
                "checkpoint {} ({} entries, {} bytes)",
                info.path.display(),
                info.entry_count,
                info.file_size
            );
        }
    }
    Ok(())
}

fn print_value(value: Option<&[u8]>) {
    match value {
        Some(v) => println!("\"{}\"", String::from_utf8_lossy(v)),
        None => println!("(nil)"),
    }
}

fn print_list(items: &[Vec<u8>]) {
    if items.is_empty() {
        println!("(empty list)");
    }
    for (i, item) in items.iter().enumerate() {
        println!("{}) {}", i + 1, String::from_utf8_lossy(item));
    }
}
