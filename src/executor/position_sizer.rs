//! Position sizing.
//! `shares = risk_amount / (atr * atr_stop_multiplier)`, capped by
//! `max_position_fraction` of the account value passed in by the caller.

use crate::error::AppError;
use crate::models::{OrderSide, PositionSizePlan, SignalClass};

/// Computes a position size plan for a BUY/SELL classification. Returns
/// `None`-equivalent (a validation error) for HOLD, which the aggregator and
/// executor both treat as "no trade" rather than calling this at all.
pub fn plan(
    signal_class: SignalClass,
    price: f64,
    atr: f64,
    risk_amount: f64,
    atr_stop_multiplier: f64,
) -> Result<PositionSizePlan, AppError> {
    let side: Option<OrderSide> = signal_class.into();
    let side = side.ok_or_else(|| AppError::validation("position_sizer", "HOLD has no position to size"))?;

    if atr <= 0.0 {
        return Err(AppError::validation("position_sizer", "ATR must be positive"));
    }
    if price <= 0.0 {
        return Err(AppError::validation("position_sizer", "price must be positive"));
    }

    let stop_distance = atr * atr_stop_multiplier;
    let shares = risk_amount / stop_distance;
    let value = shares * price;

    let (stop_loss_price, take_profit_price) = match side {
        OrderSide::Buy => (price - stop_distance, price + stop_distance * 2.0),
        OrderSide::Sell => (price + stop_distance, price - stop_distance * 2.0),
    };

    Ok(PositionSizePlan {
        shares,
        value,
        risk_amount,
        stop_loss_price,
        take_profit_price,
        risk_reward_ratio: 2.0,
    })
}

/// Applies the account-level cap: shares are scaled down so `value` never
/// exceeds `max_position_fraction * account_value`.
pub fn cap_to_fraction(plan: &mut PositionSizePlan, account_value: f64, max_position_fraction: f64) {
    let max_value = account_value * max_position_fraction;
    if plan.value > max_value && plan.value > 0.0 {
        let scale = max_value / plan.value;
        plan.shares *= scale;
        plan.value *= scale;
        plan.risk_amount *= scale;
    }
}
