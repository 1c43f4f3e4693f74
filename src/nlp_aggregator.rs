//! Sentiment window and event shock factor aggregation.
//! Bounded rolling windows that track an EWMA sentiment index and a
//! recency-decayed, clustering-boosted event shock factor.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};

use crate::config::NlpConfig;
use crate::models::{Event, EventType, SentimentScore};

struct TimedScore {
    score: f64,
    confidence: f64,
    timestamp: DateTime<Utc>,
}

/// Per-symbol sentiment window: raw mean, confidence-weighted mean, and an
/// EWMA smoothed index, all over a bounded history of recent scores.
pub struct SentimentWindow {
    history: VecDeque<TimedScore>,
    capacity: usize,
    ewma: Option<f64>,
    alpha: f64,
}

impl SentimentWindow {
    pub fn new(cfg: &NlpConfig) -> Self {
        Self {
            history: VecDeque::with_capacity(cfg.sentiment_window),
            capacity: cfg.sentiment_window,
            ewma: None,
            alpha: cfg.ewma_alpha,
        }
    }

    pub fn push(&mut self, score: &SentimentScore) {
        if self.history.len() == self.capacity {
            self.history.pop_front();
        }
        self.history.push_back(TimedScore {
            score: score.score,
            confidence: score.confidence,
            timestamp: score.timestamp,
        });
        self.ewma = Some(match self.ewma {
            Some(prev) => score.score * self.alpha + prev * (1.0 - self.alpha),
            None => score.score,
        });
    }

    pub fn raw_index(&self) -> f64 {
        if self.history.is_empty() {
            return 0.0;
        }
        self.history.iter().map(|s| s.score).sum::<f64>() / self.history.len() as f64
    }

    /// Weighted by each score's extraction confidence so a handful of
    /// confident articles outweigh a flood of ambiguous ones.
    pub fn weighted_index(&self) -> f64 {
        let total_weight: f64 = self.history.iter().map(|s| s.confidence).sum();
        if total_weight <= 0.0 {
            return 0.0;
        }
        self.history.iter().map(|s| s.score * s.confidence).sum::<f64>() / total_weight
    }

    pub fn smoothed_index(&self) -> f64 {
        self.ewma.unwrap_or(0.0)
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }
}

struct TimedEvent {
    event_type: EventType,
    severity: f64,
    timestamp: DateTime<Utc>,
}

/// Tracks recent events for a symbol and derives the Event Shock Factor:
/// mean severity, boosted when events cluster densely, decayed by the
/// window's mean age.
pub struct EventWindow {
    history: VecDeque<TimedEvent>,
    capacity: usize,
    clustering_bonus_cap: f64,
    decay_hours: f64,
}

impl EventWindow {
    pub fn new(cfg: &NlpConfig) -> Self {
        Self {
            history: VecDeque::with_capacity(64),
            capacity: 64,
            clustering_bonus_cap: cfg.esf_clustering_bonus_cap,
            decay_hours: cfg.esf_decay_hours,
        }
    }

    pub fn push(&mut self, event: &Event) {
        if self.history.len() == self.capacity {
            self.history.pop_front();
        }
        self.history.push_back(TimedEvent {
            event_type: event.event_type,
            severity: event.severity,
            timestamp: event.timestamp,
        });
    }

    /// Event Shock Factor: `clamp((mean(severity) + min(count/10, cap)) *
    /// exp(-mean_age_hours / decay_hours), 0, 1)`.
    pub fn shock_factor(&self, now: DateTime<Utc>) -> f64 {
        if self.history.is_empty() {
            return 0.0;
        }
        let count = self.history.len() as f64;
        let base = self.history.iter().map(|e| e.severity).sum::<f64>() / count;
        let bonus = (count / 10.0).min(self.clustering_bonus_cap);
        let mean_age_hours = self
            .history
            .iter()
            .map(|e| (now - e.timestamp).num_seconds() as f64 / 3600.0)
            .sum::<f64>()
            / count;
        let recency = (-mean_age_hours.max(0.0) / self.decay_hours).exp();
        ((base + bonus) * recency).clamp(0.0, 1.0)
    }

    pub fn dominant_event_type(&self) -> Option<EventType> {
        let mut totals: std::collections::HashMap<EventType, f64> = std::collections::HashMap::new();
        for event in &self.history {
            *totals.entry(event.event_type).or_insert(0.0) += event.severity;
        }
        totals
            .into_iter()
            .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap())
            .map(|(t, _)| t)
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }
}
