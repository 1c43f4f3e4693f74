//! Broker collaborator.
//! `Broker` trait plus a simulated paper-trading implementation: latency
//! jitter, slippage in basis points of notional, and partial-fill and
//! rejection probabilities.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use rand::Rng;

use crate::error::AppError;
use crate::models::{Order, OrderSide, OrderStatus, Position};

#[async_trait]
pub trait Broker: Send + Sync {
    async fn place_order(&self, order: Order) -> Result<Order, AppError>;
    async fn order_status(&self, id: &str) -> Result<Order, AppError>;
    async fn cancel(&self, id: &str) -> Result<(), AppError>;
    async fn positions(&self) -> Vec<Position>;
    async fn margins(&self) -> f64;
}

#[derive(Debug, Clone)]
pub struct PaperExecutionConfig {
    pub base_latency_ms: u64,
    pub latency_jitter_ms: u64,
    pub slippage_bps_per_1k: f64,
    pub base_slippage_bps: f64,
    pub fee_rate: f64,
    pub partial_fill_prob: f64,
    pub min_fill_ratio: f64,
    pub reject_prob: f64,
}

impl Default for PaperExecutionConfig {
    fn default() -> Self {
        Self {
            base_latency_ms: 150,
            latency_jitter_ms: 200,
            slippage_bps_per_1k: 15.0,
            base_slippage_bps: 10.0,
            fee_rate: 0.005,
            partial_fill_prob: 0.15,
            min_fill_ratio: 0.4,
            reject_prob: 0.02,
        }
    }
}

impl PaperExecutionConfig {
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Ok(v) = std::env::var("PAPER_REJECT_PROB") {
            if let Ok(parsed) = v.parse() {
                cfg.reject_prob = parsed;
            }
        }
        cfg
    }
}

struct Book {
    orders: HashMap<String, Order>,
    positions: HashMap<String, Position>,
    margin_used: f64,
}

/// Simulated broker: accepts an order, applies latency/slippage/partial-fill
/// randomness, and updates its in-memory book. No network I/O.
pub struct SimulatedBroker {
    cfg: PaperExecutionConfig,
    book: Mutex<Book>,
    equity: f64,
}

impl SimulatedBroker {
    pub fn new(cfg: PaperExecutionConfig, equity: f64) -> Self {
        Self {
            cfg,
            book: Mutex::new(Book { orders: HashMap::new(), positions: HashMap::new(), margin_used: 0.0 }),
            equity,
        }
    }

    fn slippage_bps(&self, notional: f64) -> f64 {
        self.cfg.base_slippage_bps + self.cfg.slippage_bps_per_1k * (notional / 1000.0)
    }
}

#[async_trait]
impl Broker for SimulatedBroker {
    async fn place_order(&self, mut order: Order) -> Result<Order, AppError> {
        let latency_jitter = rand::thread_rng().gen_range(0..=self.cfg.latency_jitter_ms.max(1));
        tokio::time::sleep(Duration::from_millis(self.cfg.base_latency_ms + latency_jitter)).await;

        let reject_roll: f64 = rand::thread_rng().gen();
        if reject_roll < self.cfg.reject_prob {
            order.status = OrderStatus::Rejected;
            order.updated_at = Utc::now();
            return Err(AppError::transient_io("simulated_broker", "order rejected by venue")
                .with_context("order_id", order.id.clone()));
        }

        let reference_price = order.limit_price.unwrap_or(100.0);
        let notional = reference_price * order.quantity;
        let slippage = self.slippage_bps(notional) / 10_000.0;
        let filled_price = match order.side {
            OrderSide::Buy => reference_price * (1.0 + slippage),
            OrderSide::Sell => reference_price * (1.0 - slippage),
        };

        let partial_roll: f64 = rand::thread_rng().gen();
        let fill_ratio = if partial_roll < self.cfg.partial_fill_prob {
            rand::thread_rng().gen_range(self.cfg.min_fill_ratio..1.0)
        } else {
            1.0
        };

        let filled_qty = order.quantity * fill_ratio;
        order.filled_quantity = filled_qty;
        order.average_price = Some(filled_price);
        order.status = if fill_ratio >= 1.0 { OrderStatus::Filled } else { OrderStatus::PartiallyFilled };
        order.updated_at = Utc::now();

        let mut book = self.book.lock();
        book.margin_used += notional.abs() * fill_ratio;
        book.orders.insert(order.id.clone(), order.clone());
        if order.status == OrderStatus::Filled || order.status == OrderStatus::PartiallyFilled {
            book.positions.insert(
                order.symbol.clone(),
                Position {
                    symbol: order.symbol.clone(),
                    side: order.side,
                    entry_price: filled_price,
                    quantity: filled_qty,
                    initial_stop: 0.0,
                    current_stop: 0.0,
                    take_profit: 0.0,
                    is_open: true,
                    entered_at: order.created_at,
                    exited_at: None,
                },
            );
        }

        Ok(order)
    }

    async fn order_status(&self, id: &str) -> Result<Order, AppError> {
        self.book
            .lock()
            .orders
            .get(id)
            .cloned()
            .ok_or_else(|| AppError::validation("simulated_broker", "unknown order id").with_context("order_id", id))
    }

    async fn cancel(&self, id: &str) -> Result<(), AppError> {
        let mut book = self.book.lock();
        match book.orders.get_mut(id) {
            Some(order) if order.status.can_transition_to(OrderStatus::Cancelled) => {
                order.status = OrderStatus::Cancelled;
                order.updated_at = Utc::now();
                Ok(())
            }
            Some(_) => Err(AppError::logic_invariant("simulated_broker", "order already terminal")),
            None => Err(AppError::validation("simulated_broker", "unknown order id")),
        }
    }

    async fn positions(&self) -> Vec<Position> {
        self.book.lock().positions.values().filter(|p| p.is_open).cloned().collect()
    }

    async fn margins(&self) -> f64 {
        let book = self.book.lock();
        (self.equity - book.margin_used).max(0.0)
    }
}
