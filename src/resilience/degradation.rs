//! Degradation registry: tagged-variant availability.
//! Rather than a boolean up/down flag per collaborator, `Availability<T>`
//! carries the last good value through a stale period before the caller is
//! forced to treat the collaborator as fully unavailable.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::RwLock;

#[derive(Debug, Clone)]
pub enum Availability<T> {
    Available(T),
    Stale(T, Duration),
    Unavailable,
}

impl<T> Availability<T> {
    pub fn value(&self) -> Option<&T> {
        match self {
            Availability::Available(v) | Availability::Stale(v, _) => Some(v),
            Availability::Unavailable => None,
        }
    }

    pub fn is_fresh(&self) -> bool {
        matches!(self, Availability::Available(_))
    }
}

struct Entry<T> {
    value: Option<T>,
    updated_at: Option<Instant>,
}

/// Tracks the last-known value per named collaborator and classifies its
/// freshness on read against a configured staleness horizon.
pub struct DegradationRegistry<T: Clone> {
    stale_after: Duration,
    unavailable_after: Duration,
    entries: RwLock<HashMap<String, Entry<T>>>,
}

impl<T: Clone> DegradationRegistry<T> {
    pub fn new(stale_after: Duration, unavailable_after: Duration) -> Self {
        Self {
            stale_after,
            unavailable_after,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn record(&self, collaborator: &str, value: T) {
        let mut entries = self.entries.write();
        entries.insert(
            collaborator.to_string(),
            Entry { value: Some(value), updated_at: Some(Instant::now()) },
        );
    }

    pub fn mark_failed(&self, collaborator: &str) {
        self.entries.write().entry(collaborator.to_string()).or_insert(Entry {
            value: None,
            updated_at: None,
        });
    }

    pub fn get(&self, collaborator: &str) -> Availability<T> {
        let entries = self.entries.read();
        match entries.get(collaborator) {
            None => Availability::Unavailable,
            Some(entry) => match (&entry.value, entry.updated_at) {
                (Some(value), Some(updated_at)) => {
                    let age = updated_at.elapsed();
                    if age < self.stale_after {
                        Availability::Available(value.clone())
                    } else if age < self.unavailable_after {
                        Availability::Stale(value.clone(), age)
                    } else {
                        Availability::Unavailable
                    }
                }
                _ => Availability::Unavailable,
            },
        }
    }
}
