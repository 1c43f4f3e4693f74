//! Structured configuration.
//! Every component gets its own config struct with documented defaults;
//! `from_env` overlays a handful of environment variables on top, falling
//! back silently on missing or unparsable values.

#[derive(Debug, Clone)]
pub struct IndicatorConfig {
    pub rsi_period: usize,
    pub rsi_overbought: f64,
    pub rsi_oversold: f64,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub bollinger_period: usize,
    pub bollinger_std_dev: f64,
    pub atr_period: usize,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            rsi_period: 14,
            rsi_overbought: 70.0,
            rsi_oversold: 30.0,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            bollinger_period: 20,
            bollinger_std_dev: 2.0,
            atr_period: 14,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NlpConfig {
    pub sentiment_window: usize,
    pub ewma_alpha: f64,
    pub esf_clustering_bonus_cap: f64,
    pub esf_decay_hours: f64,
}

impl Default for NlpConfig {
    fn default() -> Self {
        Self {
            sentiment_window: 20,
            ewma_alpha: 0.3,
            esf_clustering_bonus_cap: 0.3,
            esf_decay_hours: 6.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RegimeConfig {
    pub regime_window: usize,
    pub confidence_floor: f64,
    pub panic_volatility_threshold: f64,
    pub atr_period: usize,
}

impl Default for RegimeConfig {
    fn default() -> Self {
        Self {
            regime_window: 100,
            confidence_floor: 0.4,
            panic_volatility_threshold: 0.85,
            atr_period: 14,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CmsConfig {
    pub weight_sentiment: f64,
    pub weight_volatility: f64,
    pub weight_trend: f64,
    pub weight_event: f64,
    pub buy_threshold: f64,
    pub sell_threshold: f64,
    pub signal_emission_epsilon: f64,
    pub slot_staleness_seconds: u64,
}

impl Default for CmsConfig {
    fn default() -> Self {
        Self {
            weight_sentiment: 0.4,
            weight_volatility: 0.3,
            weight_trend: 0.2,
            weight_event: 0.1,
            buy_threshold: 50.0,
            sell_threshold: -50.0,
            signal_emission_epsilon: 5.0,
            slot_staleness_seconds: 300,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    pub max_position_fraction: f64,
    pub max_total_exposure: f64,
    pub atr_stop_multiplier: f64,
    pub take_profit_r_multiple: f64,
    pub daily_loss_limit_fraction: f64,
    pub order_poll_interval_ms: u64,
    pub order_poll_timeout_secs: u64,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_position_fraction: 0.1,
            max_total_exposure: 20_000.0,
            atr_stop_multiplier: 2.0,
            take_profit_r_multiple: 2.0,
            daily_loss_limit_fraction: 0.03,
            order_poll_interval_ms: 2000,
            order_poll_timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResilienceConfig {
    pub breaker_failure_threshold: u32,
    pub breaker_recovery_secs: u64,
    pub breaker_half_open_trial_count: u32,
    pub retry_max_attempts: u32,
    pub retry_base_backoff_ms: u64,
    pub retry_max_backoff_ms: u64,
    pub retry_jitter_factor: f64,
    pub queue_capacity: usize,
    pub bus_buffer_capacity: usize,
}

impl Default for ResilienceConfig {
    fn default() -> Self {
        Self {
            breaker_failure_threshold: 5,
            breaker_recovery_secs: 30,
            breaker_half_open_trial_count: 1,
            retry_max_attempts: 3,
            retry_base_backoff_ms: 100,
            retry_max_backoff_ms: 30_000,
            retry_jitter_factor: 0.3,
            queue_capacity: 10_000,
            bus_buffer_capacity: 1_000,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BacktestConfig {
    pub initial_equity: f64,
    pub slippage_bps: f64,
    pub transaction_cost_bps: f64,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            initial_equity: 100_000.0,
            slippage_bps: 5.0,
            transaction_cost_bps: 2.0,
        }
    }
}

/// Top-level process configuration, aggregating every component's knobs.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub indicators: IndicatorConfig,
    pub nlp: NlpConfig,
    pub regime: RegimeConfig,
    pub cms: CmsConfig,
    pub executor: ExecutorConfig,
    pub resilience: ResilienceConfig,
    pub backtest: BacktestConfig,
    pub log_level: String,
}

impl Config {
    /// Overlays environment variables on top of the defaults. Missing or
    /// unparsable values silently fall back to the default.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(v) = std::env::var("CMS_BUY_THRESHOLD") {
            if let Ok(parsed) = v.parse() {
                cfg.cms.buy_threshold = parsed;
            }
        }
        if let Ok(v) = std::env::var("CMS_SELL_THRESHOLD") {
            if let Ok(parsed) = v.parse() {
                cfg.cms.sell_threshold = parsed;
            }
        }
        if let Ok(v) = std::env::var("MAX_POSITION_FRACTION") {
            if let Ok(parsed) = v.parse() {
                cfg.executor.max_position_fraction = parsed;
            }
        }
        if let Ok(v) = std::env::var("DAILY_LOSS_LIMIT_FRACTION") {
            if let Ok(parsed) = v.parse() {
                cfg.executor.daily_loss_limit_fraction = parsed;
            }
        }
        cfg.log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        cfg
    }
}
