//! txmart CLI - Build the transactions data mart
//!
//! # Main Commands
//!
//! ```bash
//! txmart run                                   # Sample extracts -> ./*_vf.csv
//! txmart run --output-dir out --format json    # JSON output elsewhere
//! txmart run --deposits data/deposits.csv.zip  # Override one source
//! txmart run --delimiter ';'                   # Force the CSV delimiter
//! ```
//!
//! # Debug Commands (for development)
//!
//! ```bash
//! txmart parse input.csv           # Just parse a CSV (or single-file zip) to JSON
//! ```
//!
//! Verbosity follows `RUST_LOG` (default `info`).

use clap::{Args, Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use txmart::config::parse_delimiter;
use txmart::{
    extract_single_csv, parse_bytes_with, run, KeyOrder, OutputFormat, PipelineConfig,
    SourceLocation, SourceSet,
};

#[derive(Parser)]
#[command(name = "txmart")]
#[command(about = "Build a Dates dimension and Transactions fact table from raw extracts", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Full pipeline: load -> clean -> Dates dimension -> facts -> export
    Run(RunArgs),

    /// Parse a CSV file and output JSON
    Parse {
        /// Input CSV file (or zip holding one CSV)
        input: PathBuf,

        /// CSV delimiter (auto-detect if not specified)
        #[arg(short, long, value_parser = delimiter_arg)]
        delimiter: Option<char>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Flags of `txmart run`, applied over the environment layer.
#[derive(Args, Debug)]
struct RunArgs {
    /// Base location of the four standard extract files
    #[arg(long)]
    base_url: Option<String>,

    /// Users extract (URL or path)
    #[arg(long)]
    users: Option<String>,

    /// Deposits extract (URL or path; `.zip` is unpacked)
    #[arg(long)]
    deposits: Option<String>,

    /// Withdrawals extract (URL or path)
    #[arg(long)]
    withdrawals: Option<String>,

    /// Events extract (URL or path)
    #[arg(long)]
    events: Option<String>,

    /// Directory the output tables are written to
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Output file format
    #[arg(short, long, value_enum)]
    format: Option<OutputFormat>,

    /// Number DateIDs in calendar order instead of first appearance
    #[arg(long)]
    chronological_date_ids: bool,

    /// HTTP request timeout in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// CSV delimiter for every source (auto-detect if not specified)
    #[arg(short, long, value_parser = delimiter_arg)]
    delimiter: Option<char>,
}

fn delimiter_arg(raw: &str) -> Result<char, String> {
    parse_delimiter(raw).ok_or_else(|| format!("'{raw}' is not a single character"))
}

impl RunArgs {
    fn apply(self, mut config: PipelineConfig) -> PipelineConfig {
        if let Some(base) = self.base_url {
            config.sources = SourceSet::from_base(&base);
        }
        if let Some(users) = self.users {
            config.sources.users = SourceLocation::parse(&users);
        }
        if let Some(deposits) = self.deposits {
            config.sources.deposits = SourceLocation::parse(&deposits);
        }
        if let Some(withdrawals) = self.withdrawals {
            config.sources.withdrawals = SourceLocation::parse(&withdrawals);
        }
        if let Some(events) = self.events {
            config.sources.events = SourceLocation::parse(&events);
        }
        if let Some(dir) = self.output_dir {
            config.output_dir = dir;
        }
        if let Some(format) = self.format {
            config.format = format;
        }
        if self.chronological_date_ids {
            config.key_order = KeyOrder::Chronological;
        }
        if let Some(secs) = self.timeout_secs {
            config.http_timeout_secs = secs;
        }
        if let Some(delimiter) = self.delimiter {
            config.delimiter = Some(delimiter);
        }
        config
    }
}

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run(args) => cmd_run(args.apply(PipelineConfig::from_env())).await,

        Commands::Parse {
            input,
            delimiter,
            output,
        } => cmd_parse(&input, delimiter, output.as_deref()),
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

async fn cmd_run(config: PipelineConfig) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📥 Sources:");
    eprintln!("   users:       {}", config.sources.users);
    eprintln!("   deposits:    {}", config.sources.deposits);
    eprintln!("   withdrawals: {}", config.sources.withdrawals);
    eprintln!("   events:      {}", config.sources.events);
    if let Some(d) = config.delimiter {
        eprintln!("   delimiter:   '{}'", format_delimiter(d));
    }

    let summary = run(&config).await?;

    eprintln!("\n📦 Tables:");
    for table in &summary.tables {
        eprintln!("   {:<16} {:>8} rows  → {}", table.table, table.rows, table.path.display());
    }
    if summary.unresolved_date_ids > 0 {
        eprintln!("   ⚠️  {} rows without a DateID", summary.unresolved_date_ids);
    }

    eprintln!("\n✨ Done!");
    Ok(())
}

fn cmd_parse(
    input: &Path,
    delimiter: Option<char>,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Parsing CSV: {}", input.display());

    let mut bytes = fs::read(input)?;
    if SourceLocation::Path(input.to_path_buf()).is_archive() {
        bytes = extract_single_csv(&bytes)?;
        eprintln!("   Unpacked single-file archive");
    }

    let result = parse_bytes_with(&bytes, delimiter)?;

    eprintln!("   Encoding: {}", result.encoding);
    eprintln!(
        "   Delimiter: '{}'{}",
        format_delimiter(result.delimiter),
        if delimiter.is_none() { " (auto-detected)" } else { "" }
    );
    eprintln!("   Columns: {}", result.table.headers.join(", "));
    eprintln!("✅ Parsed {} records", result.table.len());

    let json = serde_json::to_string_pretty(&result.table)?;
    write_output(&json, output)?;

    Ok(())
}

fn format_delimiter(d: char) -> String {
    match d {
        '\t' => "\\t".to_string(),
        c => c.to_string(),
    }
}

fn write_output(content: &str, path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            eprintln!("💾 Output written to: {}", p.display());
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_args(argv: &[&str]) -> RunArgs {
        let cli = Cli::try_parse_from(["txmart", "run"].iter().chain(argv)).unwrap();
        match cli.command {
            Commands::Run(args) => args,
            Commands::Parse { .. } => panic!("expected the run command"),
        }
    }

    #[test]
    fn test_run_delimiter_flag_overrides_env() {
        let env = PipelineConfig {
            delimiter: Some(','),
            ..PipelineConfig::default()
        };

        let config = run_args(&["--delimiter", ";"]).apply(env.clone());
        assert_eq!(config.delimiter, Some(';'));

        let config = run_args(&["-d", "tab"]).apply(env.clone());
        assert_eq!(config.delimiter, Some('\t'));

        let config = run_args(&[]).apply(env);
        assert_eq!(config.delimiter, Some(','));
    }

    #[test]
    fn test_run_rejects_long_delimiter() {
        assert!(Cli::try_parse_from(["txmart", "run", "--delimiter", ";;"]).is_err());
    }

    #[test]
    fn test_run_flags_apply_over_defaults() {
        let config = run_args(&["--events", "data/events.csv", "-f", "json", "--chronological-date-ids"])
            .apply(PipelineConfig::default());

        assert_eq!(config.sources.events, SourceLocation::Path(PathBuf::from("data/events.csv")));
        assert_eq!(config.format, OutputFormat::Json);
        assert_eq!(config.key_order, KeyOrder::Chronological);
    }
}
