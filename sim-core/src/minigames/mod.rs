//! Timing-window minigames.
//!
//! All three games share one lifecycle: a session is seeded at start (cue
//! pattern from the day number plus bounded random jitter), inputs are
//! scored against timing windows as they arrive, and `finish` folds the
//! result into a single [`MinigameOutcome`] that the session applies to the
//! stat store and then discards.
//!
//! Difficulty is decided once at start from the player's energy and mood:
//! rested players get wider windows.

pub mod fry;
pub mod hallway;
pub mod quiz;

use crate::balance::BalanceConfig;
use crate::stats::{StatDelta, StatStore};
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use fry::FrySession;
pub use hallway::HallwaySession;
pub use quiz::QuizSession;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MinigameKind {
    Fry,
    Hallway,
    Quiz,
}

impl MinigameKind {
    pub fn name(self) -> &'static str {
        match self {
            MinigameKind::Fry => "fry",
            MinigameKind::Hallway => "hallway",
            MinigameKind::Quiz => "quiz",
        }
    }
}

/// A discrete player input, stamped with session-relative time where the
/// game is time-based.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MinigameInput {
    /// Flip the fries at the given second.
    Flip { at: f32 },
    /// Dodge at the given second.
    Dodge { at: f32 },
    /// Answer the current quiz question.
    Answer { index: usize },
}

/// How well one input scored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tier {
    Perfect,
    Good,
    Miss,
}

#[derive(Debug, Error)]
pub enum MinigameError {
    #[error("that input does not belong to this minigame")]
    InputMismatch,

    #[error("the minigame is already over")]
    AlreadyFinished,
}

/// The result of a finished minigame, folded into the stat store and then
/// dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinigameOutcome {
    pub kind: MinigameKind,
    pub success: bool,
    pub score: u32,
    pub mistakes: u32,
    pub delta: StatDelta,
    pub lines: Vec<String>,
}

/// Window multiplier from the player's condition, read once at start.
pub fn window_scale(config: &BalanceConfig, stats: &StatStore) -> f32 {
    let wellness = (stats.energy() + stats.mood()) as f32 / 200.0;
    let tuning = &config.minigames;
    tuning.window_scale_min + (tuning.window_scale_max - tuning.window_scale_min) * wellness
}

/// A running minigame of any kind.
#[derive(Debug, Clone)]
pub enum Minigame {
    Fry(FrySession),
    Hallway(HallwaySession),
    Quiz(QuizSession),
}

impl Minigame {
    pub fn fry(config: &BalanceConfig, stats: &StatStore, day: u32) -> Self {
        Self::fry_with_rng(config, stats, day, &mut rand::thread_rng())
    }

    pub fn fry_with_rng(
        config: &BalanceConfig,
        stats: &StatStore,
        day: u32,
        rng: &mut impl Rng,
    ) -> Self {
        let scale = window_scale(config, stats);
        Minigame::Fry(FrySession::start_with_rng(&config.fry, scale, day, rng))
    }

    pub fn hallway(config: &BalanceConfig, stats: &StatStore, day: u32) -> Self {
        Self::hallway_with_rng(config, stats, day, &mut rand::thread_rng())
    }

    pub fn hallway_with_rng(
        config: &BalanceConfig,
        stats: &StatStore,
        day: u32,
        rng: &mut impl Rng,
    ) -> Self {
        let scale = window_scale(config, stats);
        Minigame::Hallway(HallwaySession::start_with_rng(
            &config.hallway,
            scale,
            day,
            rng,
        ))
    }

    pub fn quiz(config: &BalanceConfig, stats: &StatStore, day: u32) -> Self {
        Self::quiz_with_rng(config, stats, day, &mut rand::thread_rng())
    }

    pub fn quiz_with_rng(
        config: &BalanceConfig,
        stats: &StatStore,
        day: u32,
        rng: &mut impl Rng,
    ) -> Self {
        Minigame::Quiz(QuizSession::start_with_rng(
            &config.quiz,
            stats.german().level,
            day,
            rng,
        ))
    }

    pub fn kind(&self) -> MinigameKind {
        match self {
            Minigame::Fry(_) => MinigameKind::Fry,
            Minigame::Hallway(_) => MinigameKind::Hallway,
            Minigame::Quiz(_) => MinigameKind::Quiz,
        }
    }

    /// Score one input against the current window or question.
    pub fn handle(&mut self, input: &MinigameInput) -> Result<Tier, MinigameError> {
        match (self, input) {
            (Minigame::Fry(session), MinigameInput::Flip { at }) => session.flip(*at),
            (Minigame::Hallway(session), MinigameInput::Dodge { at }) => session.dodge(*at),
            (Minigame::Quiz(session), MinigameInput::Answer { index }) => session.answer(*index),
            _ => Err(MinigameError::InputMismatch),
        }
    }

    /// True once every cue or question has been consumed.
    pub fn is_complete(&self) -> bool {
        match self {
            Minigame::Fry(session) => session.is_complete(),
            Minigame::Hallway(session) => session.is_complete(),
            Minigame::Quiz(session) => session.is_complete(),
        }
    }

    /// Consume the session and produce the outcome. Unconsumed cues count
    /// as misses.
    pub fn finish(self) -> MinigameOutcome {
        match self {
            Minigame::Fry(session) => session.finish(),
            Minigame::Hallway(session) => session.finish(),
            Minigame::Quiz(session) => session.finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::balance::StatTuning;
    use crate::stats::PlayerStats;

    #[test]
    fn test_window_scale_tracks_condition() {
        let config = BalanceConfig::default();
        let mut stats = StatStore::new(StatTuning::default());

        stats.set_stats_for_test(PlayerStats {
            energy: 100,
            mood: 100,
            ..PlayerStats::default()
        });
        assert!((window_scale(&config, &stats) - 1.2).abs() < 1e-6);

        stats.set_stats_for_test(PlayerStats {
            energy: 0,
            mood: 0,
            ..PlayerStats::default()
        });
        assert!((window_scale(&config, &stats) - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_mismatched_input_is_rejected() {
        let config = BalanceConfig::default();
        let stats = StatStore::new(StatTuning::default());
        let mut game = Minigame::fry(&config, &stats, 1);
        let err = game.handle(&MinigameInput::Answer { index: 0 }).unwrap_err();
        assert!(matches!(err, MinigameError::InputMismatch));
    }
}
