//! The day-cycle state machine.
//!
//! A day is a fixed sequence of segments, each with a configured real-time
//! window. Exhausted segments advance automatically on tick; skippable ones
//! can be cut short. During the afternoon and evening the controller watches
//! the mood and energy floors and force-rests the player when either is hit.

use crate::balance::{DayTuning, SleepTuning};
use crate::flags::EventSystem;
use crate::stats::{PlayerStats, StatDelta, StatStore};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Event id recorded when the floors cut a day short.
pub const FORCED_REST_EVENT: &str = "forced_rest";

/// One slice of the day. The order is fixed; Sleep wraps to the next Dawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DaySegment {
    Dawn,
    Commute,
    Morning,
    Afternoon,
    Evening,
    Night,
    Sleep,
}

impl DaySegment {
    pub const ORDER: [DaySegment; 7] = [
        DaySegment::Dawn,
        DaySegment::Commute,
        DaySegment::Morning,
        DaySegment::Afternoon,
        DaySegment::Evening,
        DaySegment::Night,
        DaySegment::Sleep,
    ];

    pub fn successor(self) -> DaySegment {
        match self {
            DaySegment::Dawn => DaySegment::Commute,
            DaySegment::Commute => DaySegment::Morning,
            DaySegment::Morning => DaySegment::Afternoon,
            DaySegment::Afternoon => DaySegment::Evening,
            DaySegment::Evening => DaySegment::Night,
            DaySegment::Night => DaySegment::Sleep,
            DaySegment::Sleep => DaySegment::Dawn,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            DaySegment::Dawn => "dawn",
            DaySegment::Commute => "commute",
            DaySegment::Morning => "morning",
            DaySegment::Afternoon => "afternoon",
            DaySegment::Evening => "evening",
            DaySegment::Night => "night",
            DaySegment::Sleep => "sleep",
        }
    }
}

/// What changed between one Dawn and the following Sleep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaySummary {
    pub day: u32,
    pub forced_rest: bool,
    pub mood_change: i32,
    pub hunger_change: i32,
    pub energy_change: i32,
    pub money_change_cents: i64,
    pub german_level: u32,
    pub events: Vec<String>,
}

impl DaySummary {
    /// Human-readable recap, one line per fact.
    pub fn lines(&self) -> Vec<String> {
        let mut lines = vec![format!("Day {} is over.", self.day)];
        if self.forced_rest {
            lines.push("She ran out of steam and the day ended early.".to_string());
        }
        lines.push(format!(
            "Mood {:+}, hunger {:+}, energy {:+}.",
            self.mood_change, self.hunger_change, self.energy_change
        ));
        if self.money_change_cents != 0 {
            lines.push(format!(
                "Wallet moved by {:+.2} euro.",
                self.money_change_cents as f64 / 100.0
            ));
        }
        lines.push(format!("German level {}.", self.german_level));
        lines
    }
}

/// A completed transition, returned from tick/advance/skip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentChange {
    pub from: DaySegment,
    pub to: DaySegment,
    /// Present only on the transition into Sleep.
    pub summary: Option<DaySummary>,
}

const DREAM_LINES: [&str; 4] = [
    "She dreams of fryer oil that never splashes.",
    "She dreams in German and understands every word.",
    "She dreams the tram waits for her, doors open.",
    "She dreams of a kitchen that smells like home.",
];

/// One dream line per night, varying with the day number.
pub fn dream_line(day: u32, rng: &mut impl Rng) -> &'static str {
    let offset = rng.gen_range(0..DREAM_LINES.len() as u32);
    DREAM_LINES[((day + offset) % DREAM_LINES.len() as u32) as usize]
}

/// Drives the segment sequence, the early-exit floors, and the overnight
/// reset. Owns no stats; callers pass the store and event log in so every
/// transition effect flows through the normal mutation path.
#[derive(Debug, Clone)]
pub struct DayCycleController {
    day: u32,
    segment: DaySegment,
    elapsed: f32,
    forced_rest: bool,
    dawn_snapshot: PlayerStats,
    tuning: DayTuning,
    sleep: SleepTuning,
}

impl DayCycleController {
    pub fn new(tuning: DayTuning, sleep: SleepTuning, stats: &StatStore) -> Self {
        Self {
            day: 1,
            segment: DaySegment::Dawn,
            elapsed: 0.0,
            forced_rest: false,
            dawn_snapshot: stats.stats().clone(),
            tuning,
            sleep,
        }
    }

    /// Restore position from a save. The save is written at Sleep, so the
    /// restored controller starts the saved day at Dawn.
    pub fn from_saved(tuning: DayTuning, sleep: SleepTuning, day: u32, stats: &StatStore) -> Self {
        Self {
            day,
            segment: DaySegment::Dawn,
            elapsed: 0.0,
            forced_rest: false,
            dawn_snapshot: stats.stats().clone(),
            tuning,
            sleep,
        }
    }

    pub fn day(&self) -> u32 {
        self.day
    }

    pub fn segment(&self) -> DaySegment {
        self.segment
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// Seconds left in the current segment's window.
    pub fn remaining(&self) -> f32 {
        (self.tuning.segment(self.segment).duration_secs - self.elapsed).max(0.0)
    }

    /// Advance simulated time. Returns the transition if the segment's
    /// window ran out or a floor was hit.
    pub fn tick(
        &mut self,
        dt: f32,
        stats: &mut StatStore,
        events: &mut EventSystem,
    ) -> Option<SegmentChange> {
        self.elapsed += dt.max(0.0);

        if self.floors_hit(stats) {
            return Some(self.force_rest(stats, events));
        }

        if self.elapsed >= self.tuning.segment(self.segment).duration_secs {
            return Some(self.advance(stats, events));
        }
        None
    }

    /// Move to the successor segment regardless of remaining time.
    pub fn advance(&mut self, stats: &mut StatStore, events: &mut EventSystem) -> SegmentChange {
        let from = self.segment;
        let to = self.segment.successor();
        self.segment = to;
        self.elapsed = 0.0;

        let summary = if to == DaySegment::Sleep {
            Some(self.summarize(stats, events))
        } else {
            None
        };

        if from == DaySegment::Sleep {
            self.begin_new_day(stats, events);
        }

        SegmentChange { from, to, summary }
    }

    /// Cut the current segment short. No-op on non-skippable segments:
    /// state, including elapsed time, is left untouched.
    pub fn skip(
        &mut self,
        stats: &mut StatStore,
        events: &mut EventSystem,
    ) -> Option<SegmentChange> {
        if !self.tuning.segment(self.segment).skippable {
            return None;
        }
        Some(self.advance(stats, events))
    }

    fn floors_hit(&self, stats: &StatStore) -> bool {
        matches!(self.segment, DaySegment::Afternoon | DaySegment::Evening)
            && (stats.mood() <= self.tuning.mood_floor
                || stats.energy() <= self.tuning.energy_floor)
    }

    /// Jump straight to Sleep, recording the forced-rest event.
    fn force_rest(&mut self, stats: &mut StatStore, events: &mut EventSystem) -> SegmentChange {
        let from = self.segment;
        self.forced_rest = true;
        events.trigger(FORCED_REST_EVENT);
        self.segment = DaySegment::Sleep;
        self.elapsed = 0.0;
        SegmentChange {
            from,
            to: DaySegment::Sleep,
            summary: Some(self.summarize(stats, events)),
        }
    }

    fn summarize(&self, stats: &StatStore, events: &EventSystem) -> DaySummary {
        let now = stats.stats();
        DaySummary {
            day: self.day,
            forced_rest: self.forced_rest,
            mood_change: now.mood - self.dawn_snapshot.mood,
            hunger_change: now.hunger - self.dawn_snapshot.hunger,
            energy_change: now.energy - self.dawn_snapshot.energy,
            money_change_cents: now.money_cents - self.dawn_snapshot.money_cents,
            german_level: now.german.level,
            events: events.daily.iter().map(str::to_string).collect(),
        }
    }

    /// Overnight recovery plus the daily reset, applied when Sleep wraps
    /// to the next Dawn.
    fn begin_new_day(&mut self, stats: &mut StatStore, events: &mut EventSystem) {
        self.day += 1;
        self.forced_rest = false;
        stats.apply(
            &StatDelta::new()
                .energy(self.sleep.energy_restore)
                .mood(self.sleep.mood_bonus)
                .hunger(self.sleep.hunger_decay),
        );
        events.new_day();
        self.dawn_snapshot = stats.stats().clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::balance::{DayTuning, SleepTuning, StatTuning};
    use crate::stats::PlayerStats;

    fn setup() -> (DayCycleController, StatStore, EventSystem) {
        let stats = StatStore::new(StatTuning::default());
        let controller =
            DayCycleController::new(DayTuning::default(), SleepTuning::default(), &stats);
        (controller, stats, EventSystem::new())
    }

    #[test]
    fn test_full_cycle_visits_every_segment_once() {
        let (mut controller, mut stats, mut events) = setup();
        let mut visited = vec![controller.segment()];
        for _ in 0..DaySegment::ORDER.len() {
            let change = controller.advance(&mut stats, &mut events);
            visited.push(change.to);
        }
        let mut expected: Vec<DaySegment> = DaySegment::ORDER.to_vec();
        expected.push(DaySegment::Dawn);
        assert_eq!(visited, expected);
        assert_eq!(controller.day(), 2);
    }

    #[test]
    fn test_skip_is_noop_on_non_skippable() {
        let (mut controller, mut stats, mut events) = setup();
        // Dawn, Commute are skippable; Morning is not.
        controller.skip(&mut stats, &mut events);
        controller.skip(&mut stats, &mut events);
        assert_eq!(controller.segment(), DaySegment::Morning);

        controller.tick(10.0, &mut stats, &mut events);
        let elapsed_before = controller.elapsed();
        assert!(controller.skip(&mut stats, &mut events).is_none());
        assert_eq!(controller.segment(), DaySegment::Morning);
        assert_eq!(controller.elapsed(), elapsed_before);
    }

    #[test]
    fn test_tick_advances_when_window_runs_out() {
        let (mut controller, mut stats, mut events) = setup();
        let change = controller.tick(45.0, &mut stats, &mut events);
        assert_eq!(
            change.map(|c| c.to),
            Some(DaySegment::Commute),
            "dawn window is 45s"
        );
    }

    #[test]
    fn test_energy_floor_forces_rest_in_afternoon() {
        let (mut controller, mut stats, mut events) = setup();
        for _ in 0..3 {
            controller.advance(&mut stats, &mut events);
        }
        assert_eq!(controller.segment(), DaySegment::Afternoon);

        stats.set_stats_for_test(PlayerStats {
            energy: 5,
            ..PlayerStats::default()
        });
        let change = controller
            .tick(0.1, &mut stats, &mut events)
            .expect("floor hit");
        assert_eq!(change.to, DaySegment::Sleep);
        let summary = change.summary.expect("sleep transition carries summary");
        assert!(summary.forced_rest);
        assert!(events.was_triggered_today(FORCED_REST_EVENT));
    }

    #[test]
    fn test_floors_do_not_apply_in_morning() {
        let (mut controller, mut stats, mut events) = setup();
        controller.advance(&mut stats, &mut events);
        controller.advance(&mut stats, &mut events);
        assert_eq!(controller.segment(), DaySegment::Morning);

        stats.set_stats_for_test(PlayerStats {
            mood: 0,
            energy: 0,
            ..PlayerStats::default()
        });
        assert!(controller.tick(1.0, &mut stats, &mut events).is_none());
        assert_eq!(controller.segment(), DaySegment::Morning);
    }

    #[test]
    fn test_overnight_recovery_and_daily_reset() {
        let (mut controller, mut stats, mut events) = setup();
        stats.set_stats_for_test(PlayerStats {
            mood: 40,
            hunger: 50,
            energy: 20,
            ..PlayerStats::default()
        });
        events.trigger("ate_fries");

        for _ in 0..6 {
            controller.advance(&mut stats, &mut events);
        }
        assert_eq!(controller.segment(), DaySegment::Sleep);

        let change = controller.advance(&mut stats, &mut events);
        assert_eq!(change.to, DaySegment::Dawn);
        assert_eq!(controller.day(), 2);
        assert_eq!(stats.energy(), 50);
        assert_eq!(stats.mood(), 45);
        assert_eq!(stats.hunger(), 42);
        assert!(!events.was_triggered_today("ate_fries"));
    }

    #[test]
    fn test_summary_measures_since_dawn() {
        let (mut controller, mut stats, mut events) = setup();
        stats.apply(&StatDelta::new().mood(-10).money_cents(-150));
        for _ in 0..5 {
            controller.advance(&mut stats, &mut events);
        }
        let change = controller.advance(&mut stats, &mut events);
        let summary = change.summary.expect("entering sleep");
        assert_eq!(summary.day, 1);
        assert_eq!(summary.mood_change, -10);
        assert_eq!(summary.money_change_cents, -150);
        assert!(!summary.forced_rest);
    }
}
