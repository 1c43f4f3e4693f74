//! Regime classifier.
//! Four weighted composite scores (bull/bear/neutral/panic) computed from
//! volatility, trend strength, and sentiment, with a panic override and a
//! confidence floor that falls back to neutral when nothing dominates.

use chrono::Utc;

use crate::config::RegimeConfig;
use crate::indicators;
use crate::models::{OhlcBar, Regime, RegimeComponentScores, RegimeInputs, RegimeSnapshot};

/// `clamp(ATR(atr_period) / last close / 0.05, 0, 1)`: true range relative
/// to price, normalized so a 5% ATR maps to full scale.
pub fn volatility_index(bars: &[OhlcBar], atr_period: usize) -> f64 {
    let Some(last) = bars.last() else { return 0.0 };
    if last.close.abs() < 1e-9 {
        return 0.0;
    }
    match indicators::atr(bars, atr_period) {
        Ok(atr_value) => ((atr_value / last.close) / 0.05).clamp(0.0, 1.0),
        Err(_) => 0.0,
    }
}

/// `tanh(10 * (EMA20 - EMA50) / EMA50)`, in [-1, 1].
pub fn trend_strength(bars: &[OhlcBar]) -> f64 {
    let (ema20, ema50) = match (indicators::ema(bars, 20), indicators::ema(bars, 50)) {
        (Ok(a), Ok(b)) => (a, b),
        _ => return 0.0,
    };
    if ema50.abs() < 1e-9 {
        return 0.0;
    }
    (10.0 * (ema20 - ema50) / ema50).tanh()
}

/// Combines sentiment index, volatility, and trend strength into the four
/// regime component scores, each in [0, 1], then picks the regime with the
/// highest score unless confidence falls below the configured floor, in
/// which case it falls back to Neutral rather than a separate variant.
/// Considers at most the most recent `cfg.regime_window` bars.
pub fn classify(symbol: &str, sentiment_index: f64, bars: &[OhlcBar], cfg: &RegimeConfig) -> RegimeSnapshot {
    let windowed = if bars.len() > cfg.regime_window {
        &bars[bars.len() - cfg.regime_window..]
    } else {
        bars
    };
    let vol = volatility_index(windowed, cfg.atr_period);
    let trend = trend_strength(windowed);

    let bull = ((trend.max(0.0)) * 0.6 + (sentiment_index.max(0.0)) * 0.4).clamp(0.0, 1.0);
    let bear = (((-trend).max(0.0)) * 0.6 + ((-sentiment_index).max(0.0)) * 0.4).clamp(0.0, 1.0);
    let neutral = (1.0 - trend.abs()).clamp(0.0, 1.0) * (1.0 - (vol - 0.3).max(0.0));
    let panic = if vol >= cfg.panic_volatility_threshold {
        (vol * 0.7 + ((-sentiment_index).max(0.0)) * 0.3).clamp(0.0, 1.0)
    } else {
        0.0
    };

    let components = RegimeComponentScores { bull, bear, neutral, panic };
    let scored = [
        (Regime::Panic, panic),
        (Regime::Bull, bull),
        (Regime::Bear, bear),
        (Regime::Neutral, neutral),
    ];
    let (best_regime, best_score) = scored
        .iter()
        .copied()
        .fold((Regime::Neutral, -1.0), |acc, cur| if cur.1 > acc.1 { cur } else { acc });

    let total: f64 = scored.iter().map(|(_, s)| s).sum();
    let confidence = if total > 0.0 { best_score / total } else { 0.0 };

    let (regime, confidence) = if confidence < cfg.confidence_floor && best_regime != Regime::Panic {
        (Regime::Neutral, confidence)
    } else {
        (best_regime, confidence)
    };

    RegimeSnapshot {
        symbol: symbol.to_string(),
        regime,
        confidence,
        components,
        inputs: RegimeInputs {
            sentiment_index,
            volatility_index: vol,
            trend_strength: trend,
        },
        timestamp: Utc::now(),
    }
}
