//! Persistence collaborator.
//! A narrow `Store` trait (save/get over a handful of natural keys) backed
//! by an in-memory map.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::AppError;
use crate::models::{BacktestResult, Order, Position, TradingSignal};

#[async_trait]
pub trait Store: Send + Sync {
    async fn save_signal(&self, signal: TradingSignal) -> Result<(), AppError>;
    async fn save_order(&self, order: Order) -> Result<(), AppError>;
    async fn save_position(&self, position: Position) -> Result<(), AppError>;
    async fn save_backtest_result(&self, result: BacktestResult) -> Result<(), AppError>;

    async fn signals_for(&self, symbol: &str) -> Vec<TradingSignal>;
    async fn order(&self, id: &str) -> Option<Order>;
    async fn open_positions(&self) -> Vec<Position>;
    async fn backtest_result(&self, id: &str) -> Option<BacktestResult>;
}

#[derive(Default)]
struct Tables {
    signals: Vec<TradingSignal>,
    orders: HashMap<String, Order>,
    positions: HashMap<String, Position>,
    backtests: HashMap<String, BacktestResult>,
}

pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self { tables: RwLock::new(Tables::default()) }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn save_signal(&self, signal: TradingSignal) -> Result<(), AppError> {
        self.tables.write().await.signals.push(signal);
        Ok(())
    }

    async fn save_order(&self, order: Order) -> Result<(), AppError> {
        self.tables.write().await.orders.insert(order.id.clone(), order);
        Ok(())
    }

    async fn save_position(&self, position: Position) -> Result<(), AppError> {
        self.tables.write().await.positions.insert(position.symbol.clone(), position);
        Ok(())
    }

    async fn save_backtest_result(&self, result: BacktestResult) -> Result<(), AppError> {
        self.tables.write().await.backtests.insert(result.id.clone(), result);
        Ok(())
    }

    async fn signals_for(&self, symbol: &str) -> Vec<TradingSignal> {
        self.tables.read().await.signals.iter().filter(|s| s.symbol == symbol).cloned().collect()
    }

    async fn order(&self, id: &str) -> Option<Order> {
        self.tables.read().await.orders.get(id).cloned()
    }

    async fn open_positions(&self) -> Vec<Position> {
        self.tables.read().await.positions.values().filter(|p| p.is_open).cloned().collect()
    }

    async fn backtest_result(&self, id: &str) -> Option<BacktestResult> {
        self.tables.read().await.backtests.get(id).cloned()
    }
}
