mod chart;
mod client;
mod config;
mod dashboard;
mod notifications;
mod types;
mod web;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::time::{interval_at, Instant};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::chart::TickBars;
use crate::client::{ApiClient, SignalBackend, TickSource};
use crate::config::{load_config, render_toml, AppConfig};
use crate::dashboard::{ControllerSettings, DashboardController};
use crate::types::{Frequency, TickBuffer};
use crate::web::{start_dashboard_server, AppState};

#[derive(Parser)]
#[command(name = "signal-dashboard")]
#[command(author = "Trading Bot")]
#[command(version)]
#[command(about = "Monitoring dashboard for the BTC-USD prediction signal service", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true, default_value = "dashboard.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Mount the dashboard and serve it over HTTP
    Serve {
        /// Dashboard port (defaults to server.port)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Ask the backend whether the prediction process is running
    Status {
        /// minute, hour or day (defaults to the configured frequency)
        #[arg(short, long)]
        frequency: Option<Frequency>,
    },
    /// Start the prediction process
    Start {
        #[arg(short, long)]
        frequency: Option<Frequency>,
    },
    /// Stop the prediction process
    Stop {
        #[arg(short, long)]
        frequency: Option<Frequency>,
    },
    /// Print the signal feed, newest first
    Signals,
    /// Poll the ticker and print normalized bar heights
    Ticks {
        /// Number of samples to take
        #[arg(short = 'n', long, default_value = "10")]
        count: usize,
    },
    /// Print the effective configuration as TOML
    Config,
}

fn init_logging(verbose: bool, json: bool) -> Result<()> {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let builder = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    if json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.log_json)?;

    let config = load_config(Some(cli.config.as_path()))?;
    info!("Signal dashboard v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Serve { port } => {
            let port = port.unwrap_or(config.server.port);
            run_dashboard(config, port).await?;
        }
        Commands::Status { frequency } => {
            let frequency = frequency.unwrap_or(config.frequency);
            let client = ApiClient::new(&config.api, &config.http)?;
            let status = client.is_running(frequency).await?;
            if status.is_running() {
                println!("Prediction process running ({})", frequency);
            } else {
                println!("No ongoing processes.");
            }
        }
        Commands::Start { frequency } => {
            let frequency = frequency.unwrap_or(config.frequency);
            let client = ApiClient::new(&config.api, &config.http)?;
            let ack = client.start_fetch(frequency).await?;
            println!("{}", ack.describe());
        }
        Commands::Stop { frequency } => {
            let frequency = frequency.unwrap_or(config.frequency);
            let client = ApiClient::new(&config.api, &config.http)?;
            let ack = client.stop_fetch(frequency).await?;
            println!("{}", ack.describe());
        }
        Commands::Signals => {
            show_signals(&config).await?;
        }
        Commands::Ticks { count } => {
            sample_ticks(&config, count).await?;
        }
        Commands::Config => {
            print!("{}", render_toml(&config)?);
        }
    }

    Ok(())
}

async fn run_dashboard(config: AppConfig, port: u16) -> Result<()> {
    let client = Arc::new(ApiClient::new(&config.api, &config.http)?);
    let controller = Arc::new(DashboardController::new(
        client.clone(),
        client,
        ControllerSettings::from(&config),
    ));

    controller.mount().await;
    let state = AppState::new(controller.clone(), Arc::new(config));

    tokio::select! {
        result = start_dashboard_server(state, port) => {
            if let Err(e) = &result {
                error!("Dashboard server error: {}", e);
            }
            controller.teardown().await;
            result
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down...");
            controller.teardown().await;
            Ok(())
        }
    }
}

async fn show_signals(config: &AppConfig) -> Result<()> {
    let client = ApiClient::new(&config.api, &config.http)?;
    let signals = client
        .signals()
        .await?
        .into_display_order()
        .ok_or_else(|| anyhow!("backend response has no signal_data"))?;

    if signals.is_empty() {
        println!("No signals.");
        return Ok(());
    }

    println!("{:<6} {:>10}  {}", "SIGNAL", "PROFIT", "TIME");
    for signal in &signals {
        println!("{:<6} {:>10}  {}", signal.signal, signal.profit_label(), signal.time);
    }
    Ok(())
}

async fn sample_ticks(config: &AppConfig, count: usize) -> Result<()> {
    let client = ApiClient::new(&config.api, &config.http)?;
    let mut buffer = TickBuffer::new(config.ticks.capacity);
    let period = config.ticks.interval();
    let mut timer = interval_at(Instant::now(), period);

    for _ in 0..count {
        timer.tick().await;
        match TickSource::second_ticks(&client).await {
            Ok(tick) => {
                info!("{} {}", tick.time, tick.price);
                buffer.push(tick);
            }
            Err(e) => warn!("Tick skipped: {}", e),
        }
    }

    info!("Collected {} of {} ticks", buffer.len(), count);
    let bars = TickBars::from_buffer(&buffer, config.ticks.bar_min, config.ticks.bar_max);
    for (time, height) in bars.times.iter().zip(bars.heights_or_gaps()) {
        match height {
            Some(h) => println!("{}  {:>6.1} {}", time, h, "#".repeat((h / 5.0).round() as usize)),
            None => println!("{}     --", time),
        }
    }
    Ok(())
}
