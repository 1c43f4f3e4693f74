//! Backtester: chronological replay with no look-ahead, plus performance
//! metrics, packaged into a single result record.

pub mod metrics;
pub mod replay;

use chrono::Utc;
use uuid::Uuid;

use crate::config::Config;
use crate::models::{Article, BacktestResult, BacktestStatus, OhlcBar};

/// Runs a full single-symbol backtest and packages the result the way the
/// store expects it.
pub fn run(symbol: &str, bars: &[OhlcBar], articles: &[Article], cfg: &Config) -> BacktestResult {
    if bars.len() < 50 {
        return BacktestResult {
            id: Uuid::new_v4().to_string(),
            config_snapshot: serde_json::json!({ "symbol": symbol, "bars": bars.len() }),
            trades: vec![],
            equity_curve: vec![],
            metrics: metrics::compute(cfg.backtest.initial_equity, cfg.backtest.initial_equity, &[], &[]),
            status: BacktestStatus::Failed,
            message: Some("fewer than 50 bars supplied".to_string()),
            created_at: Utc::now(),
        };
    }

    let (trades, equity_curve) = replay::run_single_symbol(symbol, bars, articles, cfg);
    let final_equity = equity_curve.last().map(|(_, e)| *e).unwrap_or(cfg.backtest.initial_equity);
    let computed = metrics::compute(cfg.backtest.initial_equity, final_equity, &equity_curve, &trades);

    BacktestResult {
        id: Uuid::new_v4().to_string(),
        config_snapshot: serde_json::json!({ "symbol": symbol, "bars": bars.len(), "articles": articles.len() }),
        trades,
        equity_curve,
        metrics: computed,
        status: BacktestStatus::Completed,
        message: None,
        created_at: Utc::now(),
    }
}
