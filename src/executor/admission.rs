//! Order admission gates.
//! Ordered ladder of checks a trading signal must clear before the executor
//! is allowed to size and place an order; the first failing check wins.

use crate::executor::portfolio_guard::PortfolioGuard;
use crate::models::{SignalClass, TradingSignal};

#[derive(Debug, Clone, PartialEq)]
pub enum Rejection {
    DailyLossBreakerTripped,
    ExposureLimit { current_exposure: f64, proposed_notional: f64, max_position_size: f64 },
    HoldSignal,
    InsufficientMargin { required: f64, available: f64 },
    DuplicatePosition,
}

impl Rejection {
    pub fn reason(&self) -> String {
        match self {
            Rejection::DailyLossBreakerTripped => "trading_disabled".to_string(),
            Rejection::ExposureLimit { current_exposure, proposed_notional, max_position_size } => {
                format!(
                    "current exposure {:.2} plus proposed notional {:.2} exceeds max position size {:.2}",
                    current_exposure, proposed_notional, max_position_size
                )
            }
            Rejection::HoldSignal => "signal is HOLD".to_string(),
            Rejection::InsufficientMargin { required, available } => {
                format!("required margin {:.2} exceeds available {:.2}", required, available)
            }
            Rejection::DuplicatePosition => "symbol already has an open position".to_string(),
        }
    }
}

pub struct AdmissionContext<'a> {
    pub current_exposure: f64,
    pub proposed_notional: f64,
    pub max_position_size: f64,
    pub available_margin: f64,
    pub required_margin: f64,
    pub symbol_has_open_position: bool,
    pub guard: &'a PortfolioGuard,
}

/// Evaluates every gate in order and returns the first rejection, or `Ok(())`
/// if the signal clears all of them. Order matters and follows the
/// documented ladder:
/// 1. Trading-enabled and daily-trade-count gates collapse into the
///    portfolio guard's daily-loss breaker (`DailyLossBreakerTripped`).
/// 2. Current exposure plus the proposed notional must not exceed the
///    configured max position size (`ExposureLimit`).
/// 3. The CMS-threshold gate collapses into the signal class itself: a
///    non-HOLD signal already cleared the per-side CMS threshold
///    (`HoldSignal`).
/// 4. Required margin must not exceed available margin (`InsufficientMargin`).
/// 5. No existing open position in the same symbol (`DuplicatePosition`).
pub fn evaluate(signal: &TradingSignal, ctx: &AdmissionContext) -> Result<(), Rejection> {
    if ctx.guard.is_throttled() {
        return Err(Rejection::DailyLossBreakerTripped);
    }
    if ctx.current_exposure + ctx.proposed_notional > ctx.max_position_size {
        return Err(Rejection::ExposureLimit {
            current_exposure: ctx.current_exposure,
            proposed_notional: ctx.proposed_notional,
            max_position_size: ctx.max_position_size,
        });
    }
    if signal.signal_class == SignalClass::Hold {
        return Err(Rejection::HoldSignal);
    }
    if ctx.required_margin > ctx.available_margin {
        return Err(Rejection::InsufficientMargin {
            required: ctx.required_margin,
            available: ctx.available_margin,
        });
    }
    if ctx.symbol_has_open_position {
        return Err(Rejection::DuplicatePosition);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PositionSizePlan;
    use chrono::Utc;

    fn signal(class: SignalClass, confidence: f64) -> TradingSignal {
        TradingSignal {
            symbol: "ACME".into(),
            signal_class: class,
            price: 100.0,
            confidence,
            position_size: PositionSizePlan {
                shares: 1.0,
                value: 100.0,
                risk_amount: 10.0,
                stop_loss_price: 95.0,
                take_profit_price: 110.0,
                risk_reward_ratio: 2.0,
            },
            reasons: vec![],
            explanation: "test".into(),
            timestamp: Utc::now(),
        }
    }

    fn baseline_ctx(guard: &PortfolioGuard) -> AdmissionContext {
        AdmissionContext {
            current_exposure: 0.0,
            proposed_notional: 100.0,
            max_position_size: 20_000.0,
            available_margin: 10_000.0,
            required_margin: 100.0,
            symbol_has_open_position: false,
            guard,
        }
    }

    #[test]
    fn hold_signal_is_rejected() {
        let guard = PortfolioGuard::new(0.08, 0.04);
        let ctx = baseline_ctx(&guard);
        let result = evaluate(&signal(SignalClass::Hold, 0.9), &ctx);
        assert_eq!(result, Err(Rejection::HoldSignal));
    }

    #[test]
    fn exposure_limit_is_rejected() {
        let guard = PortfolioGuard::new(0.08, 0.04);
        let mut ctx = baseline_ctx(&guard);
        ctx.current_exposure = 19_950.0;
        let result = evaluate(&signal(SignalClass::Buy, 0.9), &ctx);
        assert_eq!(
            result,
            Err(Rejection::ExposureLimit { current_exposure: 19_950.0, proposed_notional: 100.0, max_position_size: 20_000.0 })
        );
    }

    #[test]
    fn passes_all_gates_when_everything_is_healthy() {
        let guard = PortfolioGuard::new(0.08, 0.04);
        let ctx = baseline_ctx(&guard);
        assert!(evaluate(&signal(SignalClass::Buy, 0.9), &ctx).is_ok());
    }

    #[test]
    fn tripped_breaker_rejects_regardless_of_other_gates() {
        let guard = PortfolioGuard::new(0.08, 0.04);
        guard.record_equity(100_000.0);
        guard.record_equity(90_000.0);
        let ctx = baseline_ctx(&guard);
        let result = evaluate(&signal(SignalClass::Buy, 0.9), &ctx);
        assert_eq!(result, Err(Rejection::DailyLossBreakerTripped));
    }

    #[test]
    fn insufficient_margin_is_rejected() {
        let guard = PortfolioGuard::new(0.08, 0.04);
        let mut ctx = baseline_ctx(&guard);
        ctx.required_margin = 50_000.0;
        let result = evaluate(&signal(SignalClass::Buy, 0.9), &ctx);
        assert_eq!(result, Err(Rejection::InsufficientMargin { required: 50_000.0, available: 10_000.0 }));
    }

    #[test]
    fn duplicate_position_is_rejected_last() {
        let guard = PortfolioGuard::new(0.08, 0.04);
        let mut ctx = baseline_ctx(&guard);
        ctx.symbol_has_open_position = true;
        let result = evaluate(&signal(SignalClass::Buy, 0.9), &ctx);
        assert_eq!(result, Err(Rejection::DuplicatePosition));
    }
}
