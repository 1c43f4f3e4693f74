//! Chronological replay engine.
//! Merges OHLC bars and articles by timestamp and drives the full
//! indicator -> sentiment -> regime -> CMS -> sizing pipeline with no
//! look-ahead: every computation at time T sees only bars and articles with
//! timestamp <= T.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::cms::{self, CmsInputs};
use crate::config::Config;
use crate::executor::position_sizer;
use crate::indicators;
use crate::models::{Article, ClosedTrade, OhlcBar, OrderSide, SignalClass};
use crate::nlp_aggregator::{EventWindow, SentimentWindow};
use crate::regime;
use crate::sentiment;

enum TimelineEvent<'a> {
    Bar(&'a OhlcBar),
    Article(&'a Article),
}

fn build_timeline<'a>(bars: &'a [OhlcBar], articles: &'a [Article]) -> Vec<(DateTime<Utc>, TimelineEvent<'a>)> {
    let mut timeline: Vec<(DateTime<Utc>, TimelineEvent)> = Vec::with_capacity(bars.len() + articles.len());
    timeline.extend(bars.iter().map(|b| (b.timestamp, TimelineEvent::Bar(b))));
    timeline.extend(articles.iter().map(|a| (a.published_at, TimelineEvent::Article(a))));
    timeline.sort_by_key(|(t, _)| *t);
    timeline
}

struct OpenPosition {
    side: OrderSide,
    entry_price: f64,
    quantity: f64,
    stop_loss: f64,
    take_profit: f64,
    entered_at: DateTime<Utc>,
}

/// Replays `bars` and `articles` for a single symbol in timestamp order,
/// simulating a long/short position at a time with the CMS engine as the
/// sole trade trigger. Returns closed trades and the resulting equity curve.
pub fn run_single_symbol(
    symbol: &str,
    bars: &[OhlcBar],
    articles: &[Article],
    cfg: &Config,
) -> (Vec<ClosedTrade>, Vec<(DateTime<Utc>, f64)>) {
    let timeline = build_timeline(bars, articles);
    let mut bar_history: Vec<OhlcBar> = Vec::new();
    let mut sentiment_window = SentimentWindow::new(&cfg.nlp);
    let mut event_window = EventWindow::new(&cfg.nlp);

    let mut equity = cfg.backtest.initial_equity;
    let mut equity_curve = vec![(Utc::now(), equity)];
    let mut trades = Vec::new();
    let mut open_position: Option<OpenPosition> = None;

    for (timestamp, event) in timeline {
        match event {
            TimelineEvent::Bar(bar) => {
                bar_history.push(bar.clone());

                if let Some(pos) = &open_position {
                    let hit_stop = match pos.side {
                        OrderSide::Buy => bar.low <= pos.stop_loss,
                        OrderSide::Sell => bar.high >= pos.stop_loss,
                    };
                    let hit_target = match pos.side {
                        OrderSide::Buy => bar.high >= pos.take_profit,
                        OrderSide::Sell => bar.low <= pos.take_profit,
                    };
                    if hit_stop || hit_target {
                        let exit_price = if hit_stop { pos.stop_loss } else { pos.take_profit };
                        let pnl = match pos.side {
                            OrderSide::Buy => (exit_price - pos.entry_price) * pos.quantity,
                            OrderSide::Sell => (pos.entry_price - exit_price) * pos.quantity,
                        };
                        let cost = exit_price
                            * pos.quantity
                            * (cfg.backtest.slippage_bps + cfg.backtest.transaction_cost_bps)
                            / 10_000.0;
                        equity += pnl - cost;
                        trades.push(ClosedTrade {
                            symbol: symbol.to_string(),
                            side: pos.side,
                            entry_price: pos.entry_price,
                            exit_price,
                            quantity: pos.quantity,
                            entered_at: pos.entered_at,
                            exited_at: timestamp,
                            pnl,
                        });
                        open_position = None;
                        equity_curve.push((timestamp, equity));
                    }
                }

                if bar_history.len() < 50 {
                    continue;
                }
                let snapshot = match indicators::compute_snapshot(symbol, &bar_history, &cfg.indicators) {
                    Ok(s) => s,
                    Err(_) => continue,
                };
                let regime_snapshot = regime::classify(
                    symbol,
                    sentiment_window.smoothed_index(),
                    &bar_history,
                    &cfg.regime,
                );
                let esf = event_window.shock_factor(timestamp);
                let cms_inputs = CmsInputs {
                    sentiment_index: regime_snapshot.inputs.sentiment_index,
                    volatility_index: regime_snapshot.inputs.volatility_index,
                    trend_strength: regime_snapshot.inputs.trend_strength,
                    event_shock_factor: esf,
                };
                let cms_result = cms::compute(symbol, &cms_inputs, &cfg.cms);

                if open_position.is_none() && cms_result.signal_class != SignalClass::Hold {
                    if let Ok(plan) = position_sizer::plan(
                        cms_result.signal_class,
                        bar.close,
                        snapshot.atr,
                        equity * 0.01,
                        cfg.executor.atr_stop_multiplier,
                    ) {
                        let side: Option<OrderSide> = cms_result.signal_class.into();
                        open_position = Some(OpenPosition {
                            side: side.unwrap(),
                            entry_price: bar.close,
                            quantity: plan.shares,
                            stop_loss: plan.stop_loss_price,
                            take_profit: plan.take_profit_price,
                            entered_at: timestamp,
                        });
                    }
                }
            }
            TimelineEvent::Article(article) => {
                if !article.symbols.iter().any(|s| s == symbol) {
                    continue;
                }
                let score = sentiment::score_article(article);
                sentiment_window.push(&score);
                for ev in sentiment::extract_events(article) {
                    event_window.push(&ev);
                }
            }
        }
    }

    (trades, equity_curve)
}

/// Runs the replay independently per symbol and merges the results, keyed
/// by symbol for a multi-symbol backtest report.
pub fn run_multi_symbol(
    bars_by_symbol: &HashMap<String, Vec<OhlcBar>>,
    articles: &[Article],
    cfg: &Config,
) -> HashMap<String, (Vec<ClosedTrade>, Vec<(DateTime<Utc>, f64)>)> {
    bars_by_symbol
        .iter()
        .map(|(symbol, bars)| (symbol.clone(), run_single_symbol(symbol, bars, articles, cfg)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn synthetic_bars(symbol: &str, n: usize, trend_per_bar: f64) -> Vec<OhlcBar> {
        let start = Utc::now();
        (0..n)
            .map(|i| {
                let close = 100.0 + i as f64 * trend_per_bar;
                OhlcBar::new(
                    symbol,
                    start + Duration::minutes(i as i64),
                    close - 0.2,
                    close + 0.5,
                    close - 0.5,
                    close,
                    1000.0,
                )
                .unwrap()
            })
            .collect()
    }

    #[test]
    fn replay_with_no_articles_runs_on_price_action_alone() {
        let cfg = Config::default();
        let bars = synthetic_bars("ACME", 80, 0.3);
        let (trades, curve) = run_single_symbol("ACME", &bars, &[], &cfg);
        assert!(curve.len() >= 1);
        let _ = trades;
    }

    #[test]
    fn equity_curve_starts_at_initial_equity() {
        let cfg = Config::default();
        let bars = synthetic_bars("ACME", 60, 0.0);
        let (_, curve) = run_single_symbol("ACME", &bars, &[], &cfg);
        assert_eq!(curve[0].1, cfg.backtest.initial_equity);
    }

    #[test]
    fn multi_symbol_replay_returns_one_entry_per_symbol() {
        let cfg = Config::default();
        let mut bars_by_symbol = HashMap::new();
        bars_by_symbol.insert("ACME".to_string(), synthetic_bars("ACME", 60, 0.1));
        bars_by_symbol.insert("OTHER".to_string(), synthetic_bars("OTHER", 60, -0.1));
        let result = run_multi_symbol(&bars_by_symbol, &[], &cfg);
        assert_eq!(result.len(), 2);
    }
}
