//! Indicator engine.
//! Pure functions over a bar window; no I/O, no shared state. Each
//! `compute_*` function documents the minimum window it needs and returns
//! `InsufficientData` rather than panicking when the caller hasn't met it.

use crate::config::IndicatorConfig;
use crate::error::AppError;
use crate::models::{
    BollingerSignal, BollingerSnapshot, IndicatorSnapshot, MacdSignal, MacdSnapshot, OhlcBar,
    RsiSignal, TechnicalSignals,
};

const MIN_BARS: usize = 50;

fn insufficient(component: &str, have: usize, need: usize) -> AppError {
    AppError::validation(component, format!("need at least {} bars, have {}", need, have))
}

/// Simple moving average of the last `period` closes.
pub fn sma(bars: &[OhlcBar], period: usize) -> Result<f64, AppError> {
    if bars.len() < period {
        return Err(insufficient("sma", bars.len(), period));
    }
    let window = &bars[bars.len() - period..];
    Ok(window.iter().map(|b| b.close).sum::<f64>() / period as f64)
}

/// Exponential moving average over the full series, seeded with an SMA of
/// the first `period` bars (the conventional EMA warm-up).
pub fn ema_series(bars: &[OhlcBar], period: usize) -> Result<Vec<f64>, AppError> {
    if bars.len() < period {
        return Err(insufficient("ema", bars.len(), period));
    }
    let k = 2.0 / (period as f64 + 1.0);
    let seed = bars[..period].iter().map(|b| b.close).sum::<f64>() / period as f64;
    let mut out = Vec::with_capacity(bars.len() - period + 1);
    out.push(seed);
    let mut prev = seed;
    for bar in &bars[period..] {
        let next = bar.close * k + prev * (1.0 - k);
        out.push(next);
        prev = next;
    }
    Ok(out)
}

pub fn ema(bars: &[OhlcBar], period: usize) -> Result<f64, AppError> {
    Ok(*ema_series(bars, period)?.last().unwrap())
}

/// Wilder's RSI: average gain/loss smoothed with a 1/period weight, the same
/// recurrence used for every subsequent bar after the initial simple average.
pub fn rsi(bars: &[OhlcBar], period: usize) -> Result<f64, AppError> {
    if bars.len() < period + 1 {
        return Err(insufficient("rsi", bars.len(), period + 1));
    }
    let deltas: Vec<f64> = bars.windows(2).map(|w| w[1].close - w[0].close).collect();
    let seed = &deltas[..period];
    let mut avg_gain = seed.iter().filter(|d| **d > 0.0).sum::<f64>() / period as f64;
    let mut avg_loss = seed.iter().filter(|d| **d < 0.0).map(|d| -d).sum::<f64>() / period as f64;

    for delta in &deltas[period..] {
        let gain = delta.max(0.0);
        let loss = (-delta).max(0.0);
        avg_gain = (avg_gain * (period as f64 - 1.0) + gain) / period as f64;
        avg_loss = (avg_loss * (period as f64 - 1.0) + loss) / period as f64;
    }

    if avg_loss == 0.0 {
        return Ok(100.0);
    }
    let rs = avg_gain / avg_loss;
    Ok(100.0 - (100.0 / (1.0 + rs)))
}

/// MACD line/signal/histogram from the fast/slow/signal EMA periods.
pub fn macd(bars: &[OhlcBar], fast: usize, slow: usize, signal: usize) -> Result<MacdSnapshot, AppError> {
    if bars.len() < slow + signal {
        return Err(insufficient("macd", bars.len(), slow + signal));
    }
    let fast_series = ema_series(bars, fast)?;
    let slow_series = ema_series(bars, slow)?;
    // fast_series is longer (shorter warm-up); align both to the slow series' tail.
    let offset = fast_series.len() - slow_series.len();
    let macd_line: Vec<f64> = slow_series
        .iter()
        .enumerate()
        .map(|(i, slow_v)| fast_series[i + offset] - slow_v)
        .collect();

    if macd_line.len() < signal {
        return Err(insufficient("macd_signal", macd_line.len(), signal));
    }
    let k = 2.0 / (signal as f64 + 1.0);
    let seed = macd_line[..signal].iter().sum::<f64>() / signal as f64;
    let mut signal_value = seed;
    for v in &macd_line[signal..] {
        signal_value = v * k + signal_value * (1.0 - k);
    }
    let line = *macd_line.last().unwrap();
    Ok(MacdSnapshot {
        line,
        signal: signal_value,
        histogram: line - signal_value,
    })
}

/// Bollinger bands: SMA middle band, +/- `std_dev` standard deviations.
pub fn bollinger(bars: &[OhlcBar], period: usize, std_dev: f64) -> Result<BollingerSnapshot, AppError> {
    if bars.len() < period {
        return Err(insufficient("bollinger", bars.len(), period));
    }
    let window = &bars[bars.len() - period..];
    let mean = window.iter().map(|b| b.close).sum::<f64>() / period as f64;
    let variance = window.iter().map(|b| (b.close - mean).powi(2)).sum::<f64>() / period as f64;
    let sd = variance.sqrt();
    Ok(BollingerSnapshot {
        upper: mean + std_dev * sd,
        middle: mean,
        lower: mean - std_dev * sd,
    })
}

/// Average True Range over `period` bars, Wilder-smoothed.
pub fn atr(bars: &[OhlcBar], period: usize) -> Result<f64, AppError> {
    if bars.len() < period + 1 {
        return Err(insufficient("atr", bars.len(), period + 1));
    }
    let true_ranges: Vec<f64> = bars
        .windows(2)
        .map(|w| {
            let (prev, cur) = (&w[0], &w[1]);
            let a = cur.high - cur.low;
            let b = (cur.high - prev.close).abs();
            let c = (cur.low - prev.close).abs();
            a.max(b).max(c)
        })
        .collect();
    let mut avg = true_ranges[..period].iter().sum::<f64>() / period as f64;
    for tr in &true_ranges[period..] {
        avg = (avg * (period as f64 - 1.0) + tr) / period as f64;
    }
    Ok(avg)
}

fn classify_rsi(value: f64, overbought: f64, oversold: f64) -> RsiSignal {
    if value >= overbought {
        RsiSignal::Overbought
    } else if value <= oversold {
        RsiSignal::Oversold
    } else {
        RsiSignal::Neutral
    }
}

fn classify_macd(snapshot: &MacdSnapshot) -> MacdSignal {
    if snapshot.histogram > 0.0 && snapshot.line > snapshot.signal {
        MacdSignal::BullishCross
    } else if snapshot.histogram < 0.0 && snapshot.line < snapshot.signal {
        MacdSignal::BearishCross
    } else {
        MacdSignal::Neutral
    }
}

fn classify_bollinger(close: f64, bands: &BollingerSnapshot) -> BollingerSignal {
    if close >= bands.upper {
        BollingerSignal::UpperBreach
    } else if close <= bands.lower {
        BollingerSignal::LowerBreach
    } else {
        BollingerSignal::Neutral
    }
}

/// Computes the full indicator snapshot for the latest bar in `bars`.
/// Requires at least 50 bars; returns `InsufficientData` otherwise.
pub fn compute_snapshot(symbol: &str, bars: &[OhlcBar], cfg: &IndicatorConfig) -> Result<IndicatorSnapshot, AppError> {
    if bars.len() < MIN_BARS {
        return Err(insufficient(&format!("indicators::{}", symbol), bars.len(), MIN_BARS));
    }
    let last = bars.last().unwrap();
    let rsi_value = rsi(bars, cfg.rsi_period)?;
    let macd_value = macd(bars, cfg.macd_fast, cfg.macd_slow, cfg.macd_signal)?;
    let bollinger_value = bollinger(bars, cfg.bollinger_period, cfg.bollinger_std_dev)?;
    let sma_20 = sma(bars, 20)?;
    let sma_50 = sma(bars, 50)?;
    let ema_12 = ema(bars, cfg.macd_fast)?;
    let ema_26 = ema(bars, cfg.macd_slow)?;
    let atr_value = atr(bars, cfg.atr_period)?;

    Ok(IndicatorSnapshot {
        symbol: symbol.to_string(),
        timestamp: last.timestamp,
        rsi: rsi_value,
        macd: macd_value,
        bollinger: bollinger_value,
        sma_20,
        sma_50,
        ema_12,
        ema_26,
        atr: atr_value,
        signals: TechnicalSignals {
            rsi: classify_rsi(rsi_value, cfg.rsi_overbought, cfg.rsi_oversold),
            macd: classify_macd(&macd_value),
            bollinger: classify_bollinger(last.close, &bollinger_value),
        },
    })
}
