//! Event and flag tracking for narrative branching.
//!
//! Two layers: a per-day log that resets every morning, and persistent
//! counters that carry across days (and into save files).

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Events triggered during the current in-game day. Append-only within a
/// day; cleared on the next dawn.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DailyEventLog {
    triggered: BTreeSet<String>,
}

impl DailyEventLog {
    pub fn register(&mut self, event_id: &str) {
        self.triggered.insert(event_id.to_string());
    }

    pub fn has(&self, event_id: &str) -> bool {
        self.triggered.contains(event_id)
    }

    pub fn reset(&mut self) {
        self.triggered.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.triggered.iter().map(String::as_str)
    }
}

/// Flags that persist between days.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistentFlags {
    values: BTreeMap<String, i64>,
}

impl PersistentFlags {
    pub fn bump(&mut self, flag_id: &str, amount: i64) {
        *self.values.entry(flag_id.to_string()).or_insert(0) += amount;
    }

    pub fn set(&mut self, flag_id: &str, value: i64) {
        self.values.insert(flag_id.to_string(), value);
    }

    pub fn get(&self, flag_id: &str) -> i64 {
        self.values.get(flag_id).copied().unwrap_or(0)
    }
}

/// Daily log plus persistent flags, glued onto the session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventSystem {
    pub daily: DailyEventLog,
    pub persistent: PersistentFlags,
}

impl EventSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_saved(persistent: PersistentFlags) -> Self {
        Self {
            daily: DailyEventLog::default(),
            persistent,
        }
    }

    pub fn new_day(&mut self) {
        self.daily.reset();
    }

    /// Register an event for today and bump its lifetime counter.
    pub fn trigger(&mut self, event_id: &str) {
        self.daily.register(event_id);
        self.persistent.bump(&format!("count:{event_id}"), 1);
    }

    pub fn was_triggered_today(&self, event_id: &str) -> bool {
        self.daily.has(event_id)
    }

    pub fn total_occurrences(&self, event_id: &str) -> i64 {
        self.persistent.get(&format!("count:{event_id}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trigger_registers_today_and_counts() {
        let mut events = EventSystem::new();
        events.trigger("perfect_fries_day");
        events.trigger("perfect_fries_day");

        assert!(events.was_triggered_today("perfect_fries_day"));
        assert_eq!(events.total_occurrences("perfect_fries_day"), 2);
    }

    #[test]
    fn test_new_day_resets_daily_only() {
        let mut events = EventSystem::new();
        events.trigger("forced_rest");
        events.new_day();

        assert!(!events.was_triggered_today("forced_rest"));
        assert_eq!(events.total_occurrences("forced_rest"), 1);
    }

    #[test]
    fn test_persistent_set_overwrites() {
        let mut flags = PersistentFlags::default();
        flags.set("mom_mode:3", 1);
        flags.set("mom_mode:3", 2);
        assert_eq!(flags.get("mom_mode:3"), 2);
        assert_eq!(flags.get("missing"), 0);
    }
}
