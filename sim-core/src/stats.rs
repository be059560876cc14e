//! Player stats and the StatStore mutation path.
//!
//! All bounded stats clamp on write and never persist out of range. The
//! StatStore is the only component allowed to mutate `PlayerStats`; every
//! minigame and dialogue outcome is folded in through [`StatStore::apply`].

use crate::balance::StatTuning;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Inclusive bounds for mood, hunger, energy, and relationship scores.
pub const STAT_MIN: i32 = 0;
pub const STAT_MAX: i32 = 100;

/// German skill, tracked as a level plus XP within that level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct German {
    pub level: u32,
    /// XP accumulated toward the next level. Reset on level-up with the
    /// remainder carried over.
    pub xp: u32,
}

impl Default for German {
    fn default() -> Self {
        Self { level: 1, xp: 0 }
    }
}

/// The player's bounded attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerStats {
    pub mood: i32,
    pub hunger: i32,
    pub energy: i32,
    pub german: German,
    /// Wallet, in cents. Never negative.
    pub money_cents: i64,
}

impl Default for PlayerStats {
    fn default() -> Self {
        Self {
            mood: 60,
            hunger: 40,
            energy: 70,
            german: German::default(),
            money_cents: 500,
        }
    }
}

/// Per-friend affinity plus the mom relationship.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationships {
    pub mom: i32,
    pub friends: BTreeMap<String, i32>,
}

impl Default for Relationships {
    fn default() -> Self {
        let mut friends = BTreeMap::new();
        friends.insert("zara".to_string(), 50);
        friends.insert("lukas".to_string(), 50);
        Self { mom: 50, friends }
    }
}

/// A signed change to apply to player stats in one step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatDelta {
    pub mood: i32,
    pub hunger: i32,
    pub energy: i32,
    pub german_xp: u32,
    pub money_cents: i64,
}

impl StatDelta {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mood(mut self, amount: i32) -> Self {
        self.mood = amount;
        self
    }

    pub fn hunger(mut self, amount: i32) -> Self {
        self.hunger = amount;
        self
    }

    pub fn energy(mut self, amount: i32) -> Self {
        self.energy = amount;
        self
    }

    pub fn german_xp(mut self, amount: u32) -> Self {
        self.german_xp = amount;
        self
    }

    pub fn money_cents(mut self, amount: i64) -> Self {
        self.money_cents = amount;
        self
    }

    /// Component-wise sum, used when aggregating minigame tiers.
    pub fn combine(&self, other: &StatDelta) -> StatDelta {
        StatDelta {
            mood: self.mood + other.mood,
            hunger: self.hunger + other.hunger,
            energy: self.energy + other.energy,
            german_xp: self.german_xp + other.german_xp,
            money_cents: self.money_cents + other.money_cents,
        }
    }
}

/// Which stat a clamp event refers to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatKind {
    Mood,
    Hunger,
    Energy,
    Money,
    Relationship(String),
}

/// Informational record of a write that hit a bound. Never an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClampEvent {
    pub stat: StatKind,
    pub attempted: i64,
    pub clamped: i64,
}

/// Owns `PlayerStats` and `Relationships` and applies all mutations.
#[derive(Debug, Clone)]
pub struct StatStore {
    stats: PlayerStats,
    relationships: Relationships,
    tuning: StatTuning,
    clamp_log: Vec<ClampEvent>,
}

impl StatStore {
    pub fn new(tuning: StatTuning) -> Self {
        Self {
            stats: PlayerStats::default(),
            relationships: Relationships::default(),
            tuning,
            clamp_log: Vec::new(),
        }
    }

    /// Restore from a saved snapshot.
    pub fn from_saved(tuning: StatTuning, stats: PlayerStats, relationships: Relationships) -> Self {
        let mut store = Self {
            stats,
            relationships,
            tuning,
            clamp_log: Vec::new(),
        };
        // Saves are written clamped, but tolerate hand-edited files.
        store.stats.mood = store.clamp_bounded(StatKind::Mood, store.stats.mood);
        store.stats.hunger = store.clamp_bounded(StatKind::Hunger, store.stats.hunger);
        store.stats.energy = store.clamp_bounded(StatKind::Energy, store.stats.energy);
        store.stats.money_cents = store.stats.money_cents.max(0);
        store
    }

    pub fn stats(&self) -> &PlayerStats {
        &self.stats
    }

    pub fn relationships(&self) -> &Relationships {
        &self.relationships
    }

    pub fn mood(&self) -> i32 {
        self.stats.mood
    }

    pub fn hunger(&self) -> i32 {
        self.stats.hunger
    }

    pub fn energy(&self) -> i32 {
        self.stats.energy
    }

    pub fn german(&self) -> German {
        self.stats.german
    }

    pub fn money_cents(&self) -> i64 {
        self.stats.money_cents
    }

    /// Apply a delta, clamping every bounded field.
    ///
    /// When hunger is below the configured threshold, negative mood deltas
    /// are multiplied by the compounding factor before being applied.
    pub fn apply(&mut self, delta: &StatDelta) {
        let mood_delta = self.effective_mood_delta(delta.mood);
        self.stats.mood = self.write_bounded(StatKind::Mood, self.stats.mood, mood_delta);
        self.stats.hunger = self.write_bounded(StatKind::Hunger, self.stats.hunger, delta.hunger);
        self.stats.energy = self.write_bounded(StatKind::Energy, self.stats.energy, delta.energy);

        if delta.german_xp > 0 {
            self.add_german_xp(delta.german_xp);
        }

        if delta.money_cents != 0 {
            let attempted = self.stats.money_cents + delta.money_cents;
            let clamped = attempted.max(0);
            if clamped != attempted {
                self.clamp_log.push(ClampEvent {
                    stat: StatKind::Money,
                    attempted,
                    clamped,
                });
            }
            self.stats.money_cents = clamped;
        }
    }

    /// The mood delta that `apply` would actually use, after the hunger
    /// compounding rule. Computed at apply time, never stored.
    pub fn effective_mood_delta(&self, mood_delta: i32) -> i32 {
        if mood_delta < 0 && self.stats.hunger < self.tuning.hunger_threshold {
            (mood_delta as f32 * self.tuning.hunger_mood_factor).floor() as i32
        } else {
            mood_delta
        }
    }

    /// Adjust a friend score, creating the entry at the default on first use.
    pub fn relationship_delta(&mut self, friend_id: &str, amount: i32) {
        let default = self.tuning.default_relationship;
        let current = *self
            .relationships
            .friends
            .entry(friend_id.to_string())
            .or_insert(default);
        let next = self.write_bounded(StatKind::Relationship(friend_id.to_string()), current, amount);
        self.relationships.friends.insert(friend_id.to_string(), next);
    }

    pub fn relationship(&self, friend_id: &str) -> i32 {
        self.relationships
            .friends
            .get(friend_id)
            .copied()
            .unwrap_or(self.tuning.default_relationship)
    }

    pub fn mom_delta(&mut self, amount: i32) {
        self.relationships.mom = self.write_bounded(
            StatKind::Relationship("mom".to_string()),
            self.relationships.mom,
            amount,
        );
    }

    pub fn mom(&self) -> i32 {
        self.relationships.mom
    }

    /// Clamp events recorded since the last drain. Informational only.
    pub fn clamp_events(&self) -> &[ClampEvent] {
        &self.clamp_log
    }

    pub fn take_clamp_events(&mut self) -> Vec<ClampEvent> {
        std::mem::take(&mut self.clamp_log)
    }

    /// Movement-speed factor for collaborators; drops when drained.
    pub fn fatigue_modifier(&self) -> f32 {
        if self.stats.energy < 30 {
            0.6
        } else if self.stats.energy < 50 {
            0.8
        } else {
            1.0
        }
    }

    /// Focus factor for collaborators; rises with good mood.
    pub fn focus_modifier(&self) -> f32 {
        if self.stats.mood > 70 {
            1.15
        } else if self.stats.mood < 30 {
            0.8
        } else {
            1.0
        }
    }

    /// Short prose descriptor used in dialogue templates.
    pub fn mood_descriptor(&self) -> &'static str {
        if self.stats.mood >= 70 {
            "bright-eyed"
        } else if self.stats.mood <= 30 {
            "frayed"
        } else {
            "somewhere between tired and hopeful"
        }
    }

    fn add_german_xp(&mut self, amount: u32) {
        let german = &mut self.stats.german;
        german.xp += amount;
        loop {
            let threshold = self.tuning.xp_threshold(german.level);
            if german.xp < threshold {
                break;
            }
            german.xp -= threshold;
            german.level += 1;
        }
    }

    fn write_bounded(&mut self, kind: StatKind, current: i32, delta: i32) -> i32 {
        let attempted = current + delta;
        let clamped = attempted.clamp(STAT_MIN, STAT_MAX);
        if clamped != attempted {
            self.clamp_log.push(ClampEvent {
                stat: kind,
                attempted: attempted as i64,
                clamped: clamped as i64,
            });
        }
        clamped
    }

    fn clamp_bounded(&mut self, kind: StatKind, value: i32) -> i32 {
        self.write_bounded(kind, value, 0)
    }

    /// Overwrite the underlying stats. Test-only escape hatch; normal
    /// mutation goes through `apply`.
    #[doc(hidden)]
    pub fn set_stats_for_test(&mut self, stats: PlayerStats) {
        self.stats = stats;
    }
}
