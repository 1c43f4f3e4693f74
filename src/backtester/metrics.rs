//! Backtest performance metrics.
//! Sharpe ratio uses `statrs` for the return-series standard deviation.

use chrono::{DateTime, Utc};
use statrs::statistics::Statistics;

use crate::models::{BacktestMetrics, ClosedTrade};

const TRADING_PERIODS_PER_YEAR: f64 = 252.0;

pub fn total_return(initial_equity: f64, final_equity: f64) -> f64 {
    if initial_equity <= 0.0 {
        return 0.0;
    }
    (final_equity - initial_equity) / initial_equity
}

/// Annualized Sharpe ratio over the equity curve's period returns, assuming
/// a zero risk-free rate.
pub fn sharpe_ratio(equity_curve: &[(DateTime<Utc>, f64)]) -> f64 {
    if equity_curve.len() < 2 {
        return 0.0;
    }
    let returns: Vec<f64> = equity_curve
        .windows(2)
        .filter_map(|w| {
            let (prev, cur) = (w[0].1, w[1].1);
            if prev.abs() < 1e-9 {
                None
            } else {
                Some((cur - prev) / prev)
            }
        })
        .collect();
    if returns.len() < 2 {
        return 0.0;
    }
    let mean = returns.clone().mean();
    let std = returns.std_dev();
    if std.abs() < 1e-12 {
        return 0.0;
    }
    (mean / std) * TRADING_PERIODS_PER_YEAR.sqrt()
}

/// Largest peak-to-trough decline over the equity curve, as a positive
/// fraction.
pub fn max_drawdown(equity_curve: &[(DateTime<Utc>, f64)]) -> f64 {
    let mut peak = f64::MIN;
    let mut worst = 0.0;
    for (_, equity) in equity_curve {
        if *equity > peak {
            peak = *equity;
        }
        if peak > 0.0 {
            let drawdown = (peak - equity) / peak;
            if drawdown > worst {
                worst = drawdown;
            }
        }
    }
    worst
}

pub fn win_rate(trades: &[ClosedTrade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let wins = trades.iter().filter(|t| t.pnl > 0.0).count();
    wins as f64 / trades.len() as f64
}

pub fn avg_duration_secs(trades: &[ClosedTrade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let total: i64 = trades.iter().map(|t| (t.exited_at - t.entered_at).num_seconds()).sum();
    total as f64 / trades.len() as f64
}

pub fn compute(
    initial_equity: f64,
    final_equity: f64,
    equity_curve: &[(DateTime<Utc>, f64)],
    trades: &[ClosedTrade],
) -> BacktestMetrics {
    BacktestMetrics {
        total_return: total_return(initial_equity, final_equity),
        sharpe: sharpe_ratio(equity_curve),
        max_drawdown: max_drawdown(equity_curve),
        win_rate: win_rate(trades),
        total_trades: trades.len(),
        avg_duration_secs: avg_duration_secs(trades),
    }
}
