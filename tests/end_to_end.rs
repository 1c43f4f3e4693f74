//! End-to-end pipeline scenarios, exercised against the public crate
//! surface rather than any internal module path.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use cms_pipeline::aggregator::{SymbolRouter, WorkerInput};
use cms_pipeline::bus::{InMemoryBus, MessageBus, CHANNEL_SIGNALS};
use cms_pipeline::config::Config;
use cms_pipeline::indicators;
use cms_pipeline::models::{
    BollingerSignal, BollingerSnapshot, MacdSignal, MacdSnapshot, OhlcBar, Regime,
    RegimeComponentScores, RegimeInputs, RegimeSnapshot, RsiSignal, TechnicalSignals,
};
use cms_pipeline::regime;
use cms_pipeline::sentiment;
use cms_pipeline::store::{MemoryStore, Store};

fn synthetic_trending_bars(symbol: &str, n: usize, drift: f64) -> Vec<OhlcBar> {
    let start = Utc::now();
    (0..n)
        .map(|i| {
            let close = 100.0 + i as f64 * drift;
            OhlcBar::new(
                symbol,
                start + chrono::Duration::minutes(i as i64),
                close - 0.1,
                close + 0.4,
                close - 0.4,
                close,
                1_000.0,
            )
            .unwrap()
        })
        .collect()
}

/// A sustained bullish price trend plus positive news sentiment should
/// eventually produce a BUY trading signal through the full aggregator.
#[tokio::test]
async fn sustained_bullish_trend_and_positive_sentiment_produce_buy_signal() {
    let cfg = Config::default();
    let bus: Arc<dyn MessageBus> = Arc::new(InMemoryBus::new());
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    let router = SymbolRouter::new(bus.clone(), store.clone(), cfg.cms.clone());
    let mut signals_rx = bus.subscribe(CHANNEL_SIGNALS);

    let bars = synthetic_trending_bars("ACME", 80, 0.6);
    let mut window = Vec::new();
    for bar in bars {
        window.push(bar);
        if window.len() < 50 {
            continue;
        }
        let snapshot = indicators::compute_snapshot("ACME", &window, &cfg.indicators).unwrap();
        router.route("ACME", WorkerInput::Indicator(snapshot)).await;
        let regime_snapshot = regime::classify("ACME", 0.8, &window, &cfg.regime);
        router.route("ACME", WorkerInput::Regime(regime_snapshot)).await;
        router.route("ACME", WorkerInput::SentimentIndex(0.85)).await;
        router.route("ACME", WorkerInput::ShockFactor(0.2)).await;
    }

    let received = tokio::time::timeout(Duration::from_secs(2), signals_rx.recv()).await;
    let signal = received.expect("signal should arrive within timeout").unwrap();
    assert_eq!(signal["signal_class"], "BUY");
}

/// A sharp negative news shock with a falling price trend should produce a
/// SELL signal rather than a HOLD.
#[tokio::test]
async fn sharp_negative_shock_and_bearish_trend_produce_sell_signal() {
    let cfg = Config::default();
    let bus: Arc<dyn MessageBus> = Arc::new(InMemoryBus::new());
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    let router = SymbolRouter::new(bus.clone(), store.clone(), cfg.cms.clone());
    let mut signals_rx = bus.subscribe(CHANNEL_SIGNALS);

    let bars = synthetic_trending_bars("ACME", 80, -0.6);
    let mut window = Vec::new();
    for bar in bars {
        window.push(bar);
        if window.len() < 50 {
            continue;
        }
        let snapshot = indicators::compute_snapshot("ACME", &window, &cfg.indicators).unwrap();
        router.route("ACME", WorkerInput::Indicator(snapshot)).await;
        let regime_snapshot = regime::classify("ACME", -0.8, &window, &cfg.regime);
        router.route("ACME", WorkerInput::Regime(regime_snapshot)).await;
        router.route("ACME", WorkerInput::SentimentIndex(-0.85)).await;
        router.route("ACME", WorkerInput::ShockFactor(-0.3)).await;
    }

    let received = tokio::time::timeout(Duration::from_secs(2), signals_rx.recv()).await;
    let signal = received.expect("signal should arrive within timeout").unwrap();
    assert_eq!(signal["signal_class"], "SELL");
}

/// A bootstrapping worker (not all channels seen yet) must never emit a
/// signal, regardless of how extreme a single fed input is.
#[tokio::test]
async fn bootstrapping_worker_emits_nothing() {
    let cfg = Config::default();
    let bus: Arc<dyn MessageBus> = Arc::new(InMemoryBus::new());
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    let router = SymbolRouter::new(bus.clone(), store.clone(), cfg.cms.clone());
    let mut signals_rx = bus.subscribe(CHANNEL_SIGNALS);

    router
        .route(
            "ACME",
            WorkerInput::Regime(RegimeSnapshot {
                symbol: "ACME".into(),
                regime: Regime::Bull,
                confidence: 0.9,
                components: RegimeComponentScores { bull: 0.9, bear: 0.0, neutral: 0.1, panic: 0.0 },
                inputs: RegimeInputs { sentiment_index: 0.9, volatility_index: 0.1, trend_strength: 0.9 },
                timestamp: Utc::now(),
            }),
        )
        .await;

    let received = tokio::time::timeout(Duration::from_millis(200), signals_rx.recv()).await;
    assert!(received.is_err(), "bootstrapping worker should not emit before all channels report");
}

/// A suppressed symbol never emits, even once fully populated with extreme
/// inputs.
#[tokio::test]
async fn suppressed_symbol_never_emits_even_when_fully_populated() {
    use cms_pipeline::aggregator::SymbolWorker;

    let cfg = Config::default();
    let mut worker = SymbolWorker::new("ACME", cfg.cms.clone());
    worker.suppress();

    let snapshot = cms_pipeline::models::IndicatorSnapshot {
        symbol: "ACME".into(),
        timestamp: Utc::now(),
        rsi: 80.0,
        macd: MacdSnapshot { line: 1.0, signal: 0.2, histogram: 0.8 },
        bollinger: BollingerSnapshot { upper: 110.0, middle: 100.0, lower: 90.0 },
        sma_20: 105.0,
        sma_50: 100.0,
        ema_12: 106.0,
        ema_26: 101.0,
        atr: 2.0,
        signals: TechnicalSignals {
            rsi: RsiSignal::Overbought,
            macd: MacdSignal::BullishCross,
            bollinger: BollingerSignal::UpperBreach,
        },
    };
    assert!(worker.apply(WorkerInput::Indicator(snapshot)).is_none());
    assert!(worker
        .apply(WorkerInput::Regime(RegimeSnapshot {
            symbol: "ACME".into(),
            regime: Regime::Bull,
            confidence: 0.95,
            components: RegimeComponentScores { bull: 0.95, bear: 0.0, neutral: 0.05, panic: 0.0 },
            inputs: RegimeInputs { sentiment_index: 0.95, volatility_index: 0.05, trend_strength: 0.95 },
            timestamp: Utc::now(),
        }))
        .is_none());
    assert!(worker.apply(WorkerInput::SentimentIndex(0.95)).is_none());
    assert!(worker.apply(WorkerInput::ShockFactor(0.8)).is_none());
}

/// Sentiment extraction on an article with clear lexicon hits is
/// directionally correct and carries nonzero confidence.
#[test]
fn sentiment_extraction_on_earnings_beat_is_positive() {
    let article = cms_pipeline::models::Article {
        id: "a1".into(),
        title: "Company beats earnings expectations, shares surge".into(),
        body: "Strong quarterly growth and record profit drove the rally".into(),
        source: "wire".into(),
        published_at: Utc::now(),
        symbols: vec!["ACME".into()],
    };
    let score = sentiment::score_article(&article);
    assert!(score.score > 0.0);
    assert!(score.confidence > 0.0);
}

/// A complete single-symbol backtest over synthetic bars produces a
/// completed result with an equity curve that starts at the configured
/// initial equity.
#[test]
fn backtest_completes_and_reports_metrics() {
    let cfg = Config::default();
    let start = Utc::now();
    let bars: Vec<OhlcBar> = (0..120)
        .map(|i| {
            let close = 100.0 + (i as f64 * 0.1).sin() * 5.0 + i as f64 * 0.2;
            OhlcBar::new(
                "ACME",
                start + chrono::Duration::minutes(i as i64),
                close - 0.2,
                close + 0.5,
                close - 0.5,
                close,
                1_000.0,
            )
            .unwrap()
        })
        .collect();
    let result = cms_pipeline::backtester::run("ACME", &bars, &[], &cfg);
    assert_eq!(result.status, cms_pipeline::models::BacktestStatus::Completed);
    assert_eq!(result.equity_curve.first().unwrap().1, cfg.backtest.initial_equity);
}

/// Mirrors the spec's S6 scenario: a flat, newsless market over roughly a
/// trading year never clears either CMS threshold, so the backtest reports
/// zero trades and an all-zero metrics block rather than forcing a trade.
#[test]
fn flat_market_over_250_days_trades_zero_times() {
    let cfg = Config::default();
    let start = Utc::now();
    let bars: Vec<OhlcBar> = (0..250)
        .map(|i| {
            OhlcBar::new(
                "ACME",
                start + chrono::Duration::days(i as i64),
                99.9,
                100.2,
                99.8,
                100.0,
                1_000.0,
            )
            .unwrap()
        })
        .collect();
    let result = cms_pipeline::backtester::run("ACME", &bars, &[], &cfg);
    assert_eq!(result.status, cms_pipeline::models::BacktestStatus::Completed);
    assert_eq!(result.trades.len(), 0);
    assert_eq!(result.metrics.total_trades, 0);
    assert_eq!(result.metrics.total_return, 0.0);
    assert_eq!(result.metrics.sharpe, 0.0);
    assert_eq!(result.metrics.max_drawdown, 0.0);
    assert_eq!(result.metrics.win_rate, 0.0);
}
