//! Parser Service - Parses a downloaded portal file offline
//!
//! Usage:
//!   cargo run --bin parser -- --kind producao --file data/raw/<hash>.raw --limit 5
//!   cargo run --bin parser -- --kind importacao --file ImpVinhos.csv --encoding utf-8

use anyhow::{Context, Result};
use clap::Parser;
use common::DatasetKind;
use parser::{DecodePolicy, TextEncoding};
use tokio::fs;

#[derive(Parser, Debug)]
#[command(name = "parser", about = "Parses a raw portal file into normalized records")]
struct Args {
    /// Dataset kind the file belongs to
    #[arg(long)]
    kind: DatasetKind,

    /// Path to the raw file
    #[arg(long)]
    file: String,

    /// Override the kind's encoding (latin1, windows-1252, utf-8)
    #[arg(long)]
    encoding: Option<TextEncoding>,

    /// Number of records to print
    #[arg(long, default_value = "10")]
    limit: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    common::logging::init_tracing("info")?;
    let args = Args::parse();

    println!("=== Vitibrasil Parser ===");
    println!("Kind: {}", args.kind);
    println!("File: {}", args.file);

    let bytes = fs::read(&args.file)
        .await
        .context("Failed to read raw file")?;
    println!("Content size: {} bytes", bytes.len());

    let mut policy = DecodePolicy::for_kind(args.kind);
    if let Some(encoding) = args.encoding {
        policy = policy.with_encoding(encoding);
    }
    println!("Encoding: {:?}", policy.encoding);

    let (records, stats) = parser::parse_with_policy(args.kind, &bytes, policy)
        .with_context(|| format!("Failed to parse {} file", args.kind))?;

    println!("Rows: {}", stats.rows);
    println!("Candidates: {}", stats.candidates);
    println!("Kept: {} (dropped {})", stats.kept, stats.candidates - stats.kept);

    println!("\nSample records:");
    println!("{}", serde_json::to_string_pretty(&records.iter().take(args.limit).collect::<Vec<_>>())?);
    if records.len() > args.limit {
        println!("  ... and {} more", records.len() - args.limit);
    }

    Ok(())
}
