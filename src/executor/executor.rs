//! Order executor main loop.
//! Runs a trading signal through the admission ladder, sizes and caps the
//! resulting position, then places it through a circuit-breaker-guarded,
//! retried broker call before persisting the resulting order.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::broker::Broker;
use crate::bus::{MessageBus, CHANNEL_ALERTS, CHANNEL_ORDER_UPDATES};
use crate::config::ExecutorConfig;
use crate::error::AppError;
use crate::executor::admission::{self, AdmissionContext, Rejection};
use crate::executor::portfolio_guard::PortfolioGuard;
use crate::executor::position_sizer;
use crate::models::{Order, OrderSide, OrderStatus, OrderType, TradingSignal};
use crate::resilience::{with_retry, CircuitBreaker};
use crate::store::Store;

pub struct Executor {
    broker: Arc<dyn Broker>,
    store: Arc<dyn Store>,
    guard: Arc<PortfolioGuard>,
    breaker: Arc<CircuitBreaker>,
    bus: Arc<dyn MessageBus>,
    cfg: ExecutorConfig,
    account_value: f64,
}

impl Executor {
    pub fn new(
        broker: Arc<dyn Broker>,
        store: Arc<dyn Store>,
        guard: Arc<PortfolioGuard>,
        breaker: Arc<CircuitBreaker>,
        bus: Arc<dyn MessageBus>,
        cfg: ExecutorConfig,
        account_value: f64,
    ) -> Self {
        Self { broker, store, guard, breaker, bus, cfg, account_value }
    }

    fn publish_order_update(&self, order: &Order) {
        self.bus.publish(CHANNEL_ORDER_UPDATES, serde_json::to_value(order).unwrap_or_default());
    }

    fn raise_alert(&self, level: &str, reason: &str, symbol: &str) {
        self.bus.publish(
            CHANNEL_ALERTS,
            serde_json::json!({
                "level": level,
                "reason": reason,
                "symbol": symbol,
                "timestamp": Utc::now(),
            }),
        );
    }

    /// Runs the signal through the admission ladder, sizes it, places it via
    /// the breaker-wrapped broker, and polls to a terminal status. Returns
    /// `Ok(None)` for an admitted rejection (not an error), `Err` only for
    /// unrecoverable placement failures.
    pub async fn handle_signal(&self, signal: TradingSignal, current_exposure: f64, symbol_open: bool) -> Result<Option<Order>, AppError> {
        let available_margin = self.broker.margins().await;
        let required_margin = signal.position_size.value;

        let ctx = AdmissionContext {
            current_exposure,
            proposed_notional: signal.position_size.value,
            max_position_size: self.cfg.max_total_exposure,
            available_margin,
            required_margin,
            symbol_has_open_position: symbol_open,
            guard: &self.guard,
        };

        if let Err(rejection) = admission::evaluate(&signal, &ctx) {
            info!(symbol = %signal.symbol, reason = %rejection.reason(), "signal rejected at admission");
            if rejection == Rejection::DailyLossBreakerTripped {
                self.raise_alert("critical", &rejection.reason(), &signal.symbol);
            }
            return Ok(None);
        }

        let mut plan = signal.position_size;
        position_sizer::cap_to_fraction(&mut plan, self.account_value, self.cfg.max_position_fraction);

        let side: Option<OrderSide> = signal.signal_class.into();
        let side = side.expect("admission already rejected HOLD");

        let order = Order {
            id: Uuid::new_v4().to_string(),
            symbol: signal.symbol.clone(),
            side,
            order_type: OrderType::Market,
            quantity: plan.shares,
            limit_price: Some(signal.price),
            status: OrderStatus::Pending,
            source_signal_id: None,
            filled_quantity: 0.0,
            average_price: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        if !self.breaker.allow_request() {
            warn!(symbol = %signal.symbol, "broker circuit breaker open, rejecting order");
            self.raise_alert("critical", "broker circuit breaker open", &signal.symbol);
            return Err(AppError::resource_exhaustion("executor", "broker circuit breaker open"));
        }

        let broker = self.broker.clone();
        let placed = with_retry(3, 100, 5_000, 0.3, {
            let order = order.clone();
            let broker = broker.clone();
            move || {
                let order = order.clone();
                let broker = broker.clone();
                async move { broker.place_order(order).await }
            }
        })
        .await;

        let placed = match placed {
            Ok(placed) => {
                self.breaker.record_success();
                placed
            }
            Err(err) => {
                self.breaker.record_failure();
                if err.kind == crate::error::ErrorKind::AuthPermission {
                    self.raise_alert("critical", "broker authentication or permission failure", &signal.symbol);
                }
                return Err(err);
            }
        };

        self.store.save_order(placed.clone()).await?;
        self.publish_order_update(&placed);
        Ok(Some(placed))
    }

    /// Polls the broker for a terminal order status, sleeping
    /// `order_poll_interval_ms` between attempts, up to
    /// `order_poll_timeout_secs`.
    pub async fn poll_to_terminal(&self, order_id: &str) -> Result<Order, AppError> {
        let attempts = (self.cfg.order_poll_timeout_secs * 1000) / self.cfg.order_poll_interval_ms.max(1);
        for _ in 0..attempts.max(1) {
            let order = self.broker.order_status(order_id).await?;
            if order.status.is_terminal() {
                self.publish_order_update(&order);
                return Ok(order);
            }
            tokio::time::sleep(Duration::from_millis(self.cfg.order_poll_interval_ms)).await;
        }
        let order = self.broker.order_status(order_id).await?;
        self.publish_order_update(&order);
        Ok(order)
    }
}
