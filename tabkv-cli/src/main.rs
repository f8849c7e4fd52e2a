use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tabkv_client::Client;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod bench;
mod config;
mod smoke;
mod table;

#[derive(Parser)]
#[command(name = "tabkv")]
#[command(about = "TabKV client CLI", long_about = None)]
struct Cli {
    /// Client configuration file (JSON)
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Exercise every client operation once and report the outcome
    Smoke {
        /// Table to create (dropped again at the end)
        #[arg(short, long, default_value = "smoke")]
        table: String,
        /// Number of tablets the table is split into
        #[arg(short, long)]
        span: Option<u32>,
    },
    /// Compare multi-read, per-object enumeration and bulk page fetch
    Bench {
        /// Number of objects to populate
        #[arg(short = 'n', long, default_value = "10000")]
        objects: usize,
        /// Timed passes per method
        #[arg(short, long, default_value = "5")]
        rounds: usize,
        /// Value size in bytes
        #[arg(long, default_value = "100")]
        value_size: usize,
        /// Number of tablets the table is split into
        #[arg(short, long)]
        span: Option<u32>,
    },
}

fn init_logging(json: bool) {
    // Default to info level, override with RUST_LOG
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.json);

    let mut client_config = config::load_client_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Smoke { table, span } => {
            if let Some(span) = span {
                client_config = client_config.with_default_server_span(span);
            }
            let mut client = Client::connect(client_config).context("Failed to connect")?;
            let report = smoke::run(&mut client, &table)?;
            println!("{}", table::format_smoke_table(&report));

            let failed = report.iter().filter(|step| !step.passed).count();
            if failed > 0 {
                anyhow::bail!("{} of {} smoke steps failed", failed, report.len());
            }
            info!("All {} smoke steps passed", report.len());
        }

        Commands::Bench {
            objects,
            rounds,
            value_size,
            span,
        } => {
            if let Some(span) = span {
                client_config = client_config.with_default_server_span(span);
            }
            let mut client = Client::connect(client_config).context("Failed to connect")?;
            let params = bench::BenchParams {
                objects,
                rounds,
                value_size,
            };
            let rows = bench::run(&mut client, &params)?;
            println!("{}", table::format_bench_table(&rows));
        }
    }

    Ok(())
}
