//! Core data model.
//! Every public type here is the serialized shape that crosses the bus or
//! lands in the store, so everything derives `Serialize`/`Deserialize`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single OHLC bar for one symbol. `OhlcBar::new` enforces the shape
/// invariants (non-negative prices/volume, high/low bracketing open/close)
/// so a validated bar can't later fail them downstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OhlcBar {
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl OhlcBar {
    pub fn new(
        symbol: impl Into<String>,
        timestamp: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Result<Self, crate::error::AppError> {
        let bar = Self {
            symbol: symbol.into(),
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        };
        bar.validate()?;
        Ok(bar)
    }

    pub fn validate(&self) -> Result<(), crate::error::AppError> {
        let invalid = |msg: &str| {
            Err(crate::error::AppError::validation("ohlc_bar", msg)
                .with_context("symbol", self.symbol.clone()))
        };
        if self.open < 0.0 || self.high < 0.0 || self.low < 0.0 || self.close < 0.0 {
            return invalid("negative price");
        }
        if self.volume < 0.0 {
            return invalid("negative volume");
        }
        if self.high < self.open.max(self.close) {
            return invalid("high below max(open, close)");
        }
        if self.low > self.open.min(self.close) {
            return invalid("low above min(open, close)");
        }
        Ok(())
    }
}

/// A news article referencing zero or more symbols.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub id: String,
    pub title: String,
    pub body: String,
    pub source: String,
    pub published_at: DateTime<Utc>,
    pub symbols: Vec<String>,
}

/// One sentiment score per article, produced by the sentiment extractor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentScore {
    pub article_id: String,
    pub score: f64,
    pub confidence: f64,
    pub keywords_positive: Vec<String>,
    pub keywords_negative: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    Earnings,
    Merger,
    Acquisition,
    Bankruptcy,
    Regulatory,
    ProductLaunch,
    LeadershipChange,
}

impl EventType {
    pub const ALL: [EventType; 7] = [
        EventType::Earnings,
        EventType::Merger,
        EventType::Acquisition,
        EventType::Bankruptcy,
        EventType::Regulatory,
        EventType::ProductLaunch,
        EventType::LeadershipChange,
    ];
}

/// Zero or more per article, produced by the event extractor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub article_id: String,
    pub event_type: EventType,
    pub severity: f64,
    pub keywords: Vec<String>,
    pub timestamp: DateTime<Utc>,
    pub high_priority: bool,
}

/// Derived purely from the last >=50 bars for a symbol.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MacdSnapshot {
    pub line: f64,
    pub signal: f64,
    pub histogram: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BollingerSnapshot {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RsiSignal {
    Overbought,
    Oversold,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MacdSignal {
    BullishCross,
    BearishCross,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BollingerSignal {
    UpperBreach,
    LowerBreach,
    Neutral,
}

/// Signal derivation layered on top of the raw indicator values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TechnicalSignals {
    pub rsi: RsiSignal,
    pub macd: MacdSignal,
    pub bollinger: BollingerSignal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub rsi: f64,
    pub macd: MacdSnapshot,
    pub bollinger: BollingerSnapshot,
    pub sma_20: f64,
    pub sma_50: f64,
    pub ema_12: f64,
    pub ema_26: f64,
    pub atr: f64,
    pub signals: TechnicalSignals,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Regime {
    Bull,
    Bear,
    Neutral,
    Panic,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegimeComponentScores {
    pub bull: f64,
    pub bear: f64,
    pub neutral: f64,
    pub panic: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegimeInputs {
    pub sentiment_index: f64,
    pub volatility_index: f64,
    pub trend_strength: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegimeSnapshot {
    pub symbol: String,
    pub regime: Regime,
    pub confidence: f64,
    pub components: RegimeComponentScores,
    pub inputs: RegimeInputs,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalClass {
    Buy,
    Sell,
    Hold,
}

/// One component's contribution to the CMS, used in both the result and its
/// human-readable explanation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComponentContribution {
    pub normalized_value: f64,
    pub weight: f64,
    pub weighted_contribution: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CmsContributions {
    pub sentiment: ComponentContribution,
    pub volatility: ComponentContribution,
    pub trend: ComponentContribution,
    pub event: ComponentContribution,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CmsResult {
    pub symbol: String,
    pub cms_score: f64,
    pub signal_class: SignalClass,
    pub confidence: f64,
    pub contributions: CmsContributions,
    pub dominant_component: String,
    pub explanation: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl From<SignalClass> for Option<OrderSide> {
    fn from(class: SignalClass) -> Self {
        match class {
            SignalClass::Buy => Some(OrderSide::Buy),
            SignalClass::Sell => Some(OrderSide::Sell),
            SignalClass::Hold => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionSizePlan {
    pub shares: f64,
    pub value: f64,
    pub risk_amount: f64,
    pub stop_loss_price: f64,
    pub take_profit_price: f64,
    pub risk_reward_ratio: f64,
}

/// Emitted by the aggregator when a symbol's CMS crosses a class boundary
/// or moves by more than `signal_emission_epsilon`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradingSignal {
    pub symbol: String,
    pub signal_class: SignalClass,
    pub price: f64,
    pub confidence: f64,
    pub position_size: PositionSizePlan,
    pub reasons: Vec<String>,
    pub explanation: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderType {
    Market,
    Limit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    Submitted,
    PartiallyFilled,
    Filled,
    Cancelled,
    Rejected,
}

impl OrderStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            OrderStatus::Filled | OrderStatus::Cancelled | OrderStatus::Rejected
        )
    }

    /// Order state transitions never regress; terminal states absorb
    /// further updates.
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Submitted)
                | (Pending, Cancelled)
                | (Pending, Rejected)
                | (Submitted, PartiallyFilled)
                | (Submitted, Filled)
                | (Submitted, Cancelled)
                | (Submitted, Rejected)
                | (PartiallyFilled, PartiallyFilled)
                | (PartiallyFilled, Filled)
                | (PartiallyFilled, Cancelled)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub symbol: String,
    pub side: OrderSide,
    pub order_type: OrderType,
    pub quantity: f64,
    pub limit_price: Option<f64>,
    pub status: OrderStatus,
    pub source_signal_id: Option<String>,
    pub filled_quantity: f64,
    pub average_price: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub side: OrderSide,
    pub entry_price: f64,
    pub quantity: f64,
    pub initial_stop: f64,
    pub current_stop: f64,
    pub take_profit: f64,
    pub is_open: bool,
    pub entered_at: DateTime<Utc>,
    pub exited_at: Option<DateTime<Utc>>,
}

impl Position {
    /// Ratchets the stop only in the favorable direction; it never moves
    /// back against the position.
    pub fn update_trailing_stop(&mut self, candidate: f64) {
        match self.side {
            OrderSide::Buy => {
                if candidate > self.current_stop {
                    self.current_stop = candidate;
                }
            }
            OrderSide::Sell => {
                if candidate < self.current_stop {
                    self.current_stop = candidate;
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosedTrade {
    pub symbol: String,
    pub side: OrderSide,
    pub entry_price: f64,
    pub exit_price: f64,
    pub quantity: f64,
    pub entered_at: DateTime<Utc>,
    pub exited_at: DateTime<Utc>,
    pub pnl: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BacktestMetrics {
    pub total_return: f64,
    pub sharpe: f64,
    pub max_drawdown: f64,
    pub win_rate: f64,
    pub total_trades: usize,
    pub avg_duration_secs: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    pub id: String,
    pub config_snapshot: serde_json::Value,
    pub trades: Vec<ClosedTrade>,
    pub equity_curve: Vec<(DateTime<Utc>, f64)>,
    pub metrics: BacktestMetrics,
    pub status: BacktestStatus,
    pub message: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BacktestStatus {
    Completed,
    Failed,
}
