//! Composite Market Score engine.
//! Weighted combination of normalized factors plus an explanation string
//! listing each component's contribution and the dominant driver.

use chrono::Utc;

use crate::config::CmsConfig;
use crate::models::{
    ComponentContribution, CmsContributions, CmsResult, RegimeSnapshot, SignalClass,
};

/// Inputs the CMS engine fuses for one symbol at one point in time.
pub struct CmsInputs {
    pub sentiment_index: f64,
    pub volatility_index: f64,
    pub trend_strength: f64,
    pub event_shock_factor: f64,
}

fn normalize_sentiment(value: f64) -> f64 {
    value.clamp(-1.0, 1.0) * 100.0
}

/// Volatility contributes negatively: high volatility pulls the composite
/// toward caution (negative contribution) regardless of direction.
fn normalize_volatility(value: f64) -> f64 {
    -(value.clamp(0.0, 1.0)) * 100.0
}

fn normalize_trend(value: f64) -> f64 {
    value.clamp(-1.0, 1.0) * 100.0
}

/// Event shock factor is unbounded in principle; squashed with tanh so a
/// single severe event doesn't dominate the composite outright.
fn normalize_event(value: f64) -> f64 {
    value.tanh() * 100.0
}

fn contribution(normalized: f64, weight: f64) -> ComponentContribution {
    ComponentContribution {
        normalized_value: normalized,
        weight,
        weighted_contribution: normalized * weight,
    }
}

/// Computes the Composite Market Score in [-100, 100] and classifies it into
/// BUY/SELL/HOLD against the configured thresholds (default +/-50).
pub fn compute(symbol: &str, inputs: &CmsInputs, cfg: &CmsConfig) -> CmsResult {
    // Weights are re-normalized so a caller that tweaks one weight without
    // touching the others still gets a CMS in [-100, 100].
    let weight_total =
        cfg.weight_sentiment + cfg.weight_volatility + cfg.weight_trend + cfg.weight_event;
    let (w_sent, w_vol, w_trend, w_event) = if weight_total > 0.0 {
        (
            cfg.weight_sentiment / weight_total,
            cfg.weight_volatility / weight_total,
            cfg.weight_trend / weight_total,
            cfg.weight_event / weight_total,
        )
    } else {
        (0.25, 0.25, 0.25, 0.25)
    };

    let sentiment = contribution(normalize_sentiment(inputs.sentiment_index), w_sent);
    let volatility = contribution(normalize_volatility(inputs.volatility_index), w_vol);
    let trend = contribution(normalize_trend(inputs.trend_strength), w_trend);
    let event = contribution(normalize_event(inputs.event_shock_factor), w_event);

    let cms_score = (sentiment.weighted_contribution
        + volatility.weighted_contribution
        + trend.weighted_contribution
        + event.weighted_contribution)
        .clamp(-100.0, 100.0);

    let signal_class = if cms_score >= cfg.buy_threshold {
        SignalClass::Buy
    } else if cms_score <= cfg.sell_threshold {
        SignalClass::Sell
    } else {
        SignalClass::Hold
    };

    let contributions = CmsContributions { sentiment, volatility, trend, event };
    let (dominant_component, dominant_weighted) = [
        ("sentiment", sentiment.weighted_contribution),
        ("volatility", volatility.weighted_contribution),
        ("trend", trend.weighted_contribution),
        ("event", event.weighted_contribution),
    ]
    .into_iter()
    .max_by(|a, b| a.1.abs().partial_cmp(&b.1.abs()).unwrap())
    .unwrap();

    // Confidence: how far the score sits from the neutral midpoint, how much
    // the components agree in sign, tempered by how concentrated the
    // contribution is in a single component (agreement beats a lone driver).
    let strength = (cms_score.abs() / 100.0).clamp(0.0, 1.0);
    let signs = [
        sentiment.weighted_contribution,
        volatility.weighted_contribution,
        trend.weighted_contribution,
        event.weighted_contribution,
    ];
    let agreeing = signs.iter().filter(|v| v.signum() == cms_score.signum() || **v == 0.0).count();
    let agreement = agreeing as f64 / signs.len() as f64;
    let concentration_penalty = if cms_score.abs() > 1e-9 {
        1.0 - (dominant_weighted.abs() / cms_score.abs()).min(1.0) * 0.2
    } else {
        1.0
    };
    let confidence = (0.5 * strength + 0.3 * agreement + 0.2 * concentration_penalty).clamp(0.0, 1.0);

    let explanation = format!(
        "CMS {:.1} ({:?}): sentiment={:.1} (w={:.2}), volatility={:.1} (w={:.2}), trend={:.1} (w={:.2}), event={:.1} (w={:.2}); dominant={}",
        cms_score,
        signal_class,
        sentiment.normalized_value,
        w_sent,
        volatility.normalized_value,
        w_vol,
        trend.normalized_value,
        w_trend,
        event.normalized_value,
        w_event,
        dominant_component,
    );

    CmsResult {
        symbol: symbol.to_string(),
        cms_score,
        signal_class,
        confidence,
        contributions,
        dominant_component: dominant_component.to_string(),
        explanation,
        timestamp: Utc::now(),
    }
}

/// Convenience constructor pulling sentiment/volatility/trend straight from
/// a regime snapshot, with the event shock factor supplied separately.
pub fn compute_from_regime(regime: &RegimeSnapshot, event_shock_factor: f64, cfg: &CmsConfig) -> CmsResult {
    let inputs = CmsInputs {
        sentiment_index: regime.inputs.sentiment_index,
        volatility_index: regime.inputs.volatility_index,
        trend_strength: regime.inputs.trend_strength,
        event_shock_factor,
    };
    compute(&regime.symbol, &inputs, cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strongly_positive_inputs_classify_buy() {
        let cfg = CmsConfig::default();
        let inputs = CmsInputs {
            sentiment_index: 0.9,
            volatility_index: 0.1,
            trend_strength: 0.9,
            event_shock_factor: 0.5,
        };
        let result = compute("ACME", &inputs, &cfg);
        assert_eq!(result.signal_class, SignalClass::Buy);
        assert!(result.cms_score >= cfg.buy_threshold);
    }

    #[test]
    fn strongly_negative_inputs_classify_sell() {
        let cfg = CmsConfig::default();
        let inputs = CmsInputs {
            sentiment_index: -0.9,
            volatility_index: 0.1,
            trend_strength: -0.9,
            event_shock_factor: -0.5,
        };
        let result = compute("ACME", &inputs, &cfg);
        assert_eq!(result.signal_class, SignalClass::Sell);
    }

    #[test]
    fn neutral_inputs_classify_hold() {
        let cfg = CmsConfig::default();
        let inputs = CmsInputs {
            sentiment_index: 0.0,
            volatility_index: 0.2,
            trend_strength: 0.0,
            event_shock_factor: 0.0,
        };
        let result = compute("ACME", &inputs, &cfg);
        assert_eq!(result.signal_class, SignalClass::Hold);
    }

    #[test]
    fn score_is_always_within_bounds() {
        let cfg = CmsConfig::default();
        let inputs = CmsInputs {
            sentiment_index: 5.0,
            volatility_index: 5.0,
            trend_strength: 5.0,
            event_shock_factor: 100.0,
        };
        let result = compute("ACME", &inputs, &cfg);
        assert!(result.cms_score >= -100.0 && result.cms_score <= 100.0);
    }

    #[test]
    fn explanation_names_dominant_component() {
        let cfg = CmsConfig::default();
        let inputs = CmsInputs {
            sentiment_index: 0.95,
            volatility_index: 0.0,
            trend_strength: 0.0,
            event_shock_factor: 0.0,
        };
        let result = compute("ACME", &inputs, &cfg);
        assert_eq!(result.dominant_component, "sentiment");
        assert!(result.explanation.contains("dominant=sentiment"));
    }

    #[test]
    fn worked_example_holds_within_thresholds() {
        // Mirrors the spec's S1 inputs (SI=0.65, VI=0.25, TS=0.40, ESF=0.15).
        // The worked example states CMS=+33.5; the literal formula instead
        // gives ~+28.0 (see DESIGN.md), so this pins the formula's actual
        // output rather than the example's arithmetic, and checks the
        // classification the example cares about: HOLD.
        let cfg = CmsConfig::default();
        let inputs = CmsInputs {
            sentiment_index: 0.65,
            volatility_index: 0.25,
            trend_strength: 0.40,
            event_shock_factor: 0.15,
        };
        let result = compute("ACME", &inputs, &cfg);
        assert_eq!(result.signal_class, SignalClass::Hold);
        assert!((result.cms_score - 27.988850336231868).abs() < 1e-6, "got {}", result.cms_score);
    }

    #[test]
    fn worked_example_with_shock_and_panic_regime_triggers_sell() {
        // Mirrors the spec's S2 inputs (SI=-0.75, VI=0.85, TS=-0.40, ESF=0.60).
        let cfg = CmsConfig::default();
        let inputs = CmsInputs {
            sentiment_index: -0.75,
            volatility_index: 0.85,
            trend_strength: -0.40,
            event_shock_factor: 0.60,
        };
        let result = compute("ACME", &inputs, &cfg);
        assert_eq!(result.signal_class, SignalClass::Sell);
        assert!((result.cms_score - (-58.12950433001965)).abs() < 1e-6, "got {}", result.cms_score);
    }

    #[test]
    fn unequal_weights_still_normalize_to_full_range() {
        let mut cfg = CmsConfig::default();
        cfg.weight_sentiment = 0.8;
        cfg.weight_volatility = 0.8;
        cfg.weight_trend = 0.8;
        cfg.weight_event = 0.8;
        let inputs = CmsInputs {
            sentiment_index: 1.0,
            volatility_index: 0.0,
            trend_strength: 1.0,
            event_shock_factor: 10.0,
        };
        let result = compute("ACME", &inputs, &cfg);
        assert!(result.cms_score <= 100.0);
    }
}
