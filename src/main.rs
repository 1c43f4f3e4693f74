//! Process entry point: wires the bus, store, resilience registry, and
//! aggregator router, then either runs the live pipeline or a backtest.

use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use cms_pipeline::aggregator::{SymbolRouter, WorkerInput};
use cms_pipeline::broker::{PaperExecutionConfig, SimulatedBroker};
use cms_pipeline::bus::{InMemoryBus, MessageBus};
use cms_pipeline::config::Config;
use cms_pipeline::executor::{Executor, PortfolioGuard};
use cms_pipeline::indicators;
use cms_pipeline::models::OhlcBar;
use cms_pipeline::regime;
use cms_pipeline::resilience::CircuitBreaker;
use cms_pipeline::store::{MemoryStore, Store};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "cms-pipeline", about = "Composite Market Score trading pipeline")]
struct Cli {
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Runs the live pipeline with a simulated broker and synthetic feed.
    Run,
    /// Runs a single-symbol backtest over synthetic bars and prints the
    /// resulting metrics.
    Backtest {
        #[arg(long, default_value = "ACME")]
        symbol: String,
        #[arg(long, default_value_t = 200)]
        bars: usize,
    },
}

fn init_tracing(log_level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_new(log_level)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn synthetic_bars(symbol: &str, n: usize) -> Vec<OhlcBar> {
    let start = chrono::Utc::now();
    (0..n)
        .map(|i| {
            let close = 100.0 + (i as f64 * 0.15).sin() * 4.0 + i as f64 * 0.05;
            OhlcBar::new(
                symbol,
                start + chrono::Duration::minutes(i as i64),
                close - 0.2,
                close + 0.5,
                close - 0.5,
                close,
                1_000.0,
            )
            .expect("synthetic bar should satisfy OHLC invariants")
        })
        .collect()
}

async fn run_live(cfg: Config) -> anyhow::Result<()> {
    let bus: Arc<dyn MessageBus> = Arc::new(InMemoryBus::with_capacity(cfg.resilience.bus_buffer_capacity));
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    let guard = Arc::new(PortfolioGuard::new(cfg.executor.daily_loss_limit_fraction, cfg.executor.daily_loss_limit_fraction / 2.0));
    let breaker = Arc::new(CircuitBreaker::new(
        cfg.resilience.breaker_failure_threshold,
        Duration::from_secs(cfg.resilience.breaker_recovery_secs),
        cfg.resilience.breaker_half_open_trial_count,
    ));
    let broker = Arc::new(SimulatedBroker::new(PaperExecutionConfig::from_env(), 100_000.0));
    let executor = Arc::new(Executor::new(
        broker,
        store.clone(),
        guard.clone(),
        breaker,
        bus.clone(),
        cfg.executor.clone(),
        100_000.0,
    ));
    let router = Arc::new(SymbolRouter::new(bus.clone(), store.clone(), cfg.cms.clone()));

    info!("pipeline started with a simulated feed for ACME");
    let bars = synthetic_bars("ACME", 80);
    let mut window = Vec::new();
    for bar in bars {
        window.push(bar);
        if window.len() < 50 {
            continue;
        }
        if let Ok(snapshot) = indicators::compute_snapshot("ACME", &window, &cfg.indicators) {
            router.route("ACME", WorkerInput::Indicator(snapshot)).await;
        }
        let regime_snapshot = regime::classify("ACME", 0.0, &window, &cfg.regime);
        router.route("ACME", WorkerInput::Regime(regime_snapshot)).await;
        router.route("ACME", WorkerInput::SentimentIndex(0.0)).await;
        router.route("ACME", WorkerInput::ShockFactor(0.0)).await;
    }

    let mut signals_rx = bus.subscribe(cms_pipeline::bus::CHANNEL_SIGNALS);
    tokio::select! {
        _ = tokio::time::sleep(Duration::from_secs(1)) => {}
        _ = tokio::signal::ctrl_c() => {
            info!("ctrl-c received, shutting down aggregator workers");
        }
        Ok(payload) = signals_rx.recv() => {
            info!(?payload, "signal observed during startup window");
        }
    }

    router.shutdown();
    let open_positions = store.open_positions().await;
    info!(open_positions = open_positions.len(), "pipeline idle, shutting down demo run");
    let _ = executor;
    Ok(())
}

async fn run_backtest(symbol: &str, bar_count: usize, cfg: Config) -> anyhow::Result<()> {
    let bars = synthetic_bars(symbol, bar_count);
    let result = cms_pipeline::backtester::run(symbol, &bars, &[], &cfg);
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);
    let cfg = Config::from_env();

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => run_live(cfg).await,
        Command::Backtest { symbol, bars } => run_backtest(&symbol, bars, cfg).await,
    }
}
