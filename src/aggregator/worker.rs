//! Per-symbol fan-in state machine.
//! One state cell per symbol that fans in indicator, regime, sentiment, and
//! event-shock readings and triggers the CMS engine whenever a fresh
//! reading arrives.

use std::time::Duration;

use crate::aggregator::slot::Slot;
use crate::cms::{self, CmsInputs};
use crate::config::CmsConfig;
use crate::executor::position_sizer;
use crate::models::{IndicatorSnapshot, PositionSizePlan, RegimeSnapshot, SignalClass, TradingSignal};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Bootstrapping,
    Ready,
    Degraded,
    Suppressed,
}

pub enum WorkerInput {
    Indicator(IndicatorSnapshot),
    Regime(RegimeSnapshot),
    SentimentIndex(f64),
    ShockFactor(f64),
}

/// One instance per symbol, owned by the `SymbolRouter`.
pub struct SymbolWorker {
    pub symbol: String,
    indicator: Slot<IndicatorSnapshot>,
    regime: Slot<RegimeSnapshot>,
    sentiment_index: Slot<f64>,
    shock_factor: Slot<f64>,
    suppressed: bool,
    last_emitted_score: Option<f64>,
    last_emitted_class: Option<SignalClass>,
    cms_cfg: CmsConfig,
    max_age: Duration,
}

impl SymbolWorker {
    pub fn new(symbol: impl Into<String>, cms_cfg: CmsConfig) -> Self {
        let max_age = Duration::from_secs(cms_cfg.slot_staleness_seconds);
        Self {
            symbol: symbol.into(),
            indicator: Slot::empty(),
            regime: Slot::empty(),
            sentiment_index: Slot::empty(),
            shock_factor: Slot::empty(),
            suppressed: false,
            last_emitted_score: None,
            last_emitted_class: None,
            cms_cfg,
            max_age,
        }
    }

    pub fn suppress(&mut self) {
        self.suppressed = true;
    }

    pub fn resume(&mut self) {
        self.suppressed = false;
    }

    pub fn state(&self) -> WorkerState {
        if self.suppressed {
            return WorkerState::Suppressed;
        }
        let all_set = self.indicator.is_set()
            && self.regime.is_set()
            && self.sentiment_index.is_set()
            && self.shock_factor.is_set();
        if !all_set {
            return WorkerState::Bootstrapping;
        }
        let all_fresh = self.indicator.is_fresh(self.max_age)
            && self.regime.is_fresh(self.max_age)
            && self.sentiment_index.is_fresh(self.max_age)
            && self.shock_factor.is_fresh(self.max_age);
        if all_fresh {
            WorkerState::Ready
        } else {
            WorkerState::Degraded
        }
    }

    /// Applies an input to its slot and, if the worker is Ready or Degraded,
    /// recomputes the CMS and returns a `TradingSignal` when the result
    /// crosses a class boundary or moves more than `signal_emission_epsilon`
    /// since the last emission.
    pub fn apply(&mut self, input: WorkerInput) -> Option<TradingSignal> {
        match input {
            WorkerInput::Indicator(snapshot) => self.indicator.set(snapshot),
            WorkerInput::Regime(snapshot) => self.regime.set(snapshot),
            WorkerInput::SentimentIndex(v) => self.sentiment_index.set(v),
            WorkerInput::ShockFactor(v) => self.shock_factor.set(v),
        }

        match self.state() {
            WorkerState::Ready | WorkerState::Degraded => self.maybe_emit(),
            WorkerState::Bootstrapping | WorkerState::Suppressed => None,
        }
    }

    fn maybe_emit(&mut self) -> Option<TradingSignal> {
        let regime = self.regime.get()?.clone();
        let indicator = self.indicator.get()?.clone();
        let sentiment_index = *self.sentiment_index.get()?;
        let shock_factor = *self.shock_factor.get()?;

        let inputs = CmsInputs {
            sentiment_index,
            volatility_index: regime.inputs.volatility_index,
            trend_strength: regime.inputs.trend_strength,
            event_shock_factor: shock_factor,
        };
        let result = cms::compute(&self.symbol, &inputs, &self.cms_cfg);

        let class_changed = self.last_emitted_class != Some(result.signal_class);
        let moved_enough = self
            .last_emitted_score
            .map(|prev| (result.cms_score - prev).abs() >= self.cms_cfg.signal_emission_epsilon)
            .unwrap_or(true);

        if !class_changed && !moved_enough {
            return None;
        }

        self.last_emitted_score = Some(result.cms_score);
        self.last_emitted_class = Some(result.signal_class);

        if result.signal_class == SignalClass::Hold {
            return None;
        }

        let position_size = position_sizer::plan(
            result.signal_class,
            indicator.sma_20.max(indicator.sma_50).max(1.0),
            indicator.atr,
            1.0,
            2.0,
        )
        .unwrap_or(PositionSizePlan {
            shares: 0.0,
            value: 0.0,
            risk_amount: 0.0,
            stop_loss_price: 0.0,
            take_profit_price: 0.0,
            risk_reward_ratio: 0.0,
        });

        Some(TradingSignal {
            symbol: self.symbol.clone(),
            signal_class: result.signal_class,
            price: indicator.sma_20,
            confidence: result.confidence,
            position_size,
            reasons: vec![result.dominant_component.clone()],
            explanation: result.explanation,
            timestamp: result.timestamp,
        })
    }
}
