//! Per-symbol latest-feature cell.
//! Holds the most recent value received on one bus channel along with when
//! it arrived, so the fan-in worker can tell a genuinely fresh reading from
//! one that has gone stale without a separate timer.

use std::time::{Duration, Instant};

pub struct Slot<T> {
    value: Option<T>,
    received_at: Option<Instant>,
}

impl<T: Clone> Slot<T> {
    pub fn empty() -> Self {
        Self { value: None, received_at: None }
    }

    pub fn set(&mut self, value: T) {
        self.value = Some(value);
        self.received_at = Some(Instant::now());
    }

    pub fn get(&self) -> Option<&T> {
        self.value.as_ref()
    }

    pub fn is_fresh(&self, max_age: Duration) -> bool {
        match self.received_at {
            Some(t) => t.elapsed() < max_age,
            None => false,
        }
    }

    pub fn is_set(&self) -> bool {
        self.value.is_some()
    }
}

impl<T: Clone> Default for Slot<T> {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_slot_is_not_set_and_not_fresh() {
        let slot: Slot<f64> = Slot::empty();
        assert!(!slot.is_set());
        assert!(!slot.is_fresh(Duration::from_secs(60)));
    }

    #[test]
    fn set_value_is_fresh_immediately() {
        let mut slot = Slot::empty();
        slot.set(1.0);
        assert!(slot.is_fresh(Duration::from_secs(60)));
        assert_eq!(slot.get(), Some(&1.0));
    }

    #[test]
    fn value_becomes_stale_after_max_age() {
        let mut slot = Slot::empty();
        slot.set(1.0);
        std::thread::sleep(Duration::from_millis(15));
        assert!(!slot.is_fresh(Duration::from_millis(5)));
        assert_eq!(slot.get(), Some(&1.0), "stale value is still retrievable");
    }
}
