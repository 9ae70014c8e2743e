//! CLI entry point for the read-only gateway reports.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

use ibkr_readonly_cli::commands::{self, Format};
use ibkr_readonly_cli::config::{Config, Overrides};
use ibkr_readonly_cli::error::Result;

#[derive(Parser)]
#[command(name = "ibkr-readonly")]
#[command(about = "Read-only IBKR gateway reports (no order entry)")]
#[command(version)]
struct Cli {
    /// Path to config.toml (optional; defaults apply when missing)
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    /// Gateway base URL, overrides config and IBEAM_GATEWAY_BASE_URL
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Account id, overrides config and IBKR_ACCOUNT_ID
    #[arg(long, global = true)]
    account: Option<String>,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check the gateway session (and keep it alive)
    Status,

    /// Show account balances
    Summary,

    /// Show positions with P&L
    Positions,

    /// Live quotes for one or more symbols
    Quote {
        #[arg(required = true)]
        symbols: Vec<String>,
    },

    /// Fundamentals for a symbol
    Fundamentals { symbol: String },

    /// Historical bars for a symbol
    History {
        symbol: String,

        /// Lookback, e.g. 1d, 1w, 1m, 1y
        #[arg(long, default_value = "1d")]
        period: String,

        /// Bar size, e.g. 1min, 5min, 1h, 1d
        #[arg(long, default_value = "5min")]
        bar: String,
    },

    /// Run the market scanner
    Scan {
        /// Scan type, e.g. MOST_ACTIVE, TOP_PERC_GAIN
        #[arg(long)]
        scan_type: Option<String>,

        /// Market cap floor in millions of USD
        #[arg(long)]
        min_market_cap: Option<f64>,
    },

    /// Company headlines from the news feed
    News {
        #[arg(required = true)]
        symbols: Vec<String>,

        /// Headlines per symbol
        #[arg(long)]
        limit: Option<usize>,
    },
}

fn run(cli: Cli, config: &Config) -> Result<String> {
    let format = if cli.json { Format::Json } else { Format::Text };
    let overrides = Overrides {
        base_url: cli.base_url,
        account_id: cli.account,
    };
    let connect = || commands::connect(config, &overrides);

    match cli.command {
        Command::Status => commands::status(&connect()?),
        Command::Summary => commands::summary(&mut connect()?, format),
        Command::Positions => commands::positions(&mut connect()?, format),
        Command::Quote { symbols } => commands::quotes(&connect()?, &symbols, format),
        Command::Fundamentals { symbol } => commands::fundamentals(&connect()?, &symbol, format),
        Command::History {
            symbol,
            period,
            bar,
        } => commands::history(&connect()?, &symbol, &period, &bar, format),
        Command::Scan {
            scan_type,
            min_market_cap,
        } => {
            let mut filter = config.scanner.clone();
            if let Some(scan_type) = scan_type {
                filter.scan_type = scan_type;
            }
            if let Some(floor) = min_market_cap {
                filter.min_market_cap = floor;
            }
            commands::scan(&connect()?, &filter, format)
        }
        // The news feed needs no gateway session.
        Command::News { symbols, limit } => {
            let feed = commands::news_feed(config)?;
            let limit = limit.unwrap_or(config.news.limit);
            commands::news(&feed, &symbols, limit, format)
        }
    }
}

fn main() {
    dotenvy::dotenv().ok();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .format_timestamp_secs()
        .init();

    let cli = Cli::parse();

    let config = match Config::load_or_default(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading config: {e}");
            process::exit(1);
        }
    };

    match run(cli, &config) {
        Ok(output) => println!("{output}"),
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(e.exit_code());
        }
    }
}
