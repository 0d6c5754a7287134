use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use dip_buyer::clock::today_in;
use dip_buyer::config::{Config, LoggingConfig, DEFAULT_CONFIG_PATH};
use dip_buyer::model::order::{OrderRequest, OrderSide, OrderType, TimeInForce};
use dip_buyer::pipeline::Pipeline;

#[derive(Parser)]
#[command(
    name = "dip-buyer",
    version,
    about = "Buy more of a symbol the further it drops below yesterday's close"
)]
struct Cli {
    /// Path to the TOML config file.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pipeline once: market gate, price signal, sentiment, sizing, order.
    Run {
        /// Log the order instead of sending it.
        #[arg(long, default_value_t = false)]
        dry_run: bool,

        /// Trading date (YYYY-MM-DD). Defaults to today in the exchange timezone.
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Show market state, price change, sentiment and the quantity a run would buy.
    Status {
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Place one order directly, bypassing the sizing policy.
    Order {
        #[arg(long, default_value_t = 1.0)]
        qty: f64,

        #[arg(long, default_value = "buy")]
        side: OrderSide,

        /// Defaults to the configured strategy symbol.
        #[arg(long)]
        symbol: Option<String>,

        #[arg(long, default_value = "day")]
        time_in_force: TimeInForce,

        /// Send a limit order at this price instead of a market order.
        #[arg(long)]
        limit_price: Option<f64>,

        #[arg(long, default_value_t = false)]
        dry_run: bool,
    },
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        logging
            .level
            .parse()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
    });
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);
    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match Config::load_from(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {:#}", e);
            eprintln!("Make sure {} exists and is valid", cli.config.display());
            std::process::exit(1);
        }
    };
    init_tracing(&config.logging);

    tracing::info!(
        symbol = %config.strategy.normalized_symbol(),
        trading_url = %config.alpaca.trading_base_url,
        price_source = ?config.strategy.price_source,
        sentiment = ?config.sentiment.provider,
        "Starting dip-buyer"
    );

    let tz = config.strategy.exchange_tz()?;

    match cli.command {
        Commands::Run { dry_run, date } => {
            let pipeline = Pipeline::from_config(&config, dry_run)?;
            let date = date.unwrap_or_else(|| today_in(tz));
            let outcome = pipeline.run(date).await;
            tracing::info!(stage = outcome.stage(), placed = outcome.placed_order(), "Run finished");
            println!("{}", outcome);
        }
        Commands::Status { date } => {
            let pipeline = Pipeline::from_config(&config, true)?;
            let date = date.unwrap_or_else(|| today_in(tz));
            println!("{}", pipeline.preview(date).await);
        }
        Commands::Order {
            qty,
            side,
            symbol,
            time_in_force,
            limit_price,
            dry_run,
        } => {
            let pipeline = Pipeline::from_config(&config, dry_run)?;
            let symbol = symbol.unwrap_or_else(|| pipeline.settings().symbol.clone());
            let order = match limit_price {
                Some(px) => OrderRequest::limit(&symbol, qty, side, px, time_in_force),
                None => OrderRequest::new(&symbol, qty, side, OrderType::Market, time_in_force),
            }
            .context("invalid order")?;
            match pipeline.submit_manual(&order).await {
                Ok(ack) => println!(
                    "Order placed: {} id={} status={}",
                    order, ack.id, ack.status
                ),
                Err(e) => println!("Order failed: {} ({})", order, e),
            }
        }
    }

    Ok(())
}
