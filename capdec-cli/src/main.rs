//! Sensor-capture container decoder CLI application.
//!
//! Decodes a container unpacked into a directory and prints what was found in
//! every stream.

use anyhow::{Context, Result};
use capdec_core::{parse_dir, ParseOptions, ResultAggregate};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Instant;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Decoder for sensor-capture containers.
///
/// Reads the JSON header, compiles the record layout of every configured
/// stream and decodes each record blob into named columns.
#[derive(Parser, Debug)]
#[command(name = "capdec")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Container directory
    ///
    /// Expected content:
    /// - header.json: the header document
    /// - <stream>.bin: raw record blobs
    /// - <stream>.json: pre-shaped arrays (list of numeric rows)
    #[arg(value_name = "CONTAINER")]
    input: PathBuf,

    /// Name of the header entry
    #[arg(long, value_name = "NAME", default_value = "header")]
    header: String,

    /// Fail on channels with an unsupported type instead of skipping them
    #[arg(long)]
    strict_types: bool,

    /// Record count to use instead of the header's recordCount
    #[arg(short, long, value_name = "N")]
    record_count: Option<u64>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Suppress progress output and logging below errors
    #[arg(short, long)]
    quiet: bool,
}

fn init_logging(args: &Args) -> Result<()> {
    let level = if args.quiet {
        Level::ERROR
    } else if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")
}

fn print_summary(result: &ResultAggregate) {
    println!("{:<20} {:>10} {:>8}  columns", "stream", "rows", "cols");
    for (name, array) in result.data() {
        let columns = match result.table(name) {
            Some(table) => table.column_names().join(", "),
            None => "(unlabeled)".to_string(),
        };
        println!("{:<20} {:>10} {:>8}  {}", name, array.rows, array.cols, columns);
    }

    if !result.diagnostics().is_empty() {
        println!();
        println!("Diagnostics:");
        for diagnostic in result.diagnostics() {
            println!("  - {}", diagnostic);
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args)?;

    let options = ParseOptions::new()
        .header_entry(&args.header)
        .strict_field_types(args.strict_types)
        .record_count(args.record_count);

    // Setup progress bar
    let progress = if args.quiet {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {msg}")
                .context("Invalid progress template")?,
        );
        pb
    };

    let start_time = Instant::now();
    progress.set_message(format!(
        "Decoding {:?}...",
        args.input.file_name().unwrap_or_default()
    ));

    let result = parse_dir(&args.input, &options).context("Failed to decode container")?;

    let duration = start_time.elapsed();
    progress.finish_with_message(format!(
        "Done! Decoded {} streams ({} labeled) in {:.2}s",
        result.data().len(),
        result.tables().len(),
        duration.as_secs_f64()
    ));

    print_summary(&result);

    if !args.quiet {
        let rows: usize = result.data().values().map(|a| a.rows).sum();
        eprintln!();
        eprintln!("Summary:");
        eprintln!("  Input:        {:?}", args.input);
        eprintln!("  Streams:      {}", result.data().len());
        eprintln!("  Tables:       {}", result.tables().len());
        eprintln!("  Rows:         {}", rows);
        eprintln!("  Diagnostics:  {}", result.diagnostics().len());
        eprintln!("  Duration:     {:.3}s", duration.as_secs_f64());
    }

    Ok(())
}
