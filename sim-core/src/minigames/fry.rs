//! The fry-cooking minigame.
//!
//! A batch of fries needs a fixed number of well-timed flips. Cue times are
//! laid out from the day number with a little random jitter; each flip is
//! scored against the window around its cue. Oil splashes on a miss.

use super::{MinigameError, MinigameKind, MinigameOutcome, Tier};
use crate::balance::FryTuning;
use crate::stats::StatDelta;
use rand::Rng;

#[derive(Debug, Clone)]
pub struct FrySession {
    tuning: FryTuning,
    cues: Vec<f32>,
    window: f32,
    perfect_window: f32,
    next_cue: usize,
    tiers: Vec<Tier>,
}

impl FrySession {
    /// Seed a session. The base cue layout depends only on the day, so two
    /// runs on the same day differ only by jitter.
    pub fn start_with_rng(tuning: &FryTuning, scale: f32, day: u32, rng: &mut impl Rng) -> Self {
        let phase = (day % 4) as f32 * 0.5;
        let cues = (0..tuning.flips_needed)
            .map(|i| {
                let jitter = if tuning.cue_jitter > 0.0 {
                    rng.gen_range(0.0..tuning.cue_jitter)
                } else {
                    0.0
                };
                tuning.first_cue + phase + i as f32 * tuning.cue_spacing + jitter
            })
            .collect();
        let window = tuning.flip_window * scale;
        Self {
            tuning: tuning.clone(),
            cues,
            window,
            perfect_window: window * tuning.perfect_fraction,
            next_cue: 0,
            tiers: Vec::new(),
        }
    }

    /// Upcoming cue times, for drivers that schedule their inputs.
    pub fn cues(&self) -> &[f32] {
        &self.cues
    }

    pub fn is_complete(&self) -> bool {
        self.next_cue >= self.cues.len()
    }

    /// Score a flip at the given second against the next cue.
    pub fn flip(&mut self, at: f32) -> Result<Tier, MinigameError> {
        let cue = *self
            .cues
            .get(self.next_cue)
            .ok_or(MinigameError::AlreadyFinished)?;
        self.next_cue += 1;

        let distance = (at - cue).abs();
        let tier = if distance <= self.perfect_window {
            Tier::Perfect
        } else if distance <= self.window {
            Tier::Good
        } else {
            Tier::Miss
        };
        self.tiers.push(tier);
        Ok(tier)
    }

    pub fn finish(self) -> MinigameOutcome {
        let perfect = self.tiers.iter().filter(|t| **t == Tier::Perfect).count() as u32;
        let good = self.tiers.iter().filter(|t| **t == Tier::Good).count() as u32;
        let landed = perfect + good;
        // Cues never flipped splash just like late ones.
        let mistakes = self.cues.len() as u32 - landed;
        let success = landed >= self.tuning.flips_needed;

        let t = &self.tuning;
        let mut delta = StatDelta::new()
            .mood(
                perfect as i32 * t.perfect_mood
                    + good as i32 * t.good_mood
                    + mistakes as i32 * t.miss_mood,
            )
            .hunger(perfect as i32 * t.perfect_hunger + good as i32 * t.good_hunger);
        delta = if success {
            delta.combine(
                &StatDelta::new()
                    .mood(t.success_mood)
                    .hunger(t.success_hunger)
                    .energy(t.success_energy),
            )
        } else {
            delta.combine(&StatDelta::new().mood(t.fail_mood).energy(t.fail_energy))
        };

        let mut lines = Vec::new();
        if success {
            lines.push(if mistakes == 0 {
                "Golden. Not a single splash.".to_string()
            } else {
                "Crispy enough. The oil got a word in.".to_string()
            });
        } else {
            lines.push("Burnt again. The kitchen smells like regret.".to_string());
        }

        MinigameOutcome {
            kind: MinigameKind::Fry,
            success,
            score: perfect * 2 + good,
            mistakes,
            delta,
            lines,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::mock::StepRng;

    fn session() -> FrySession {
        let tuning = FryTuning {
            cue_jitter: 0.0,
            ..FryTuning::default()
        };
        FrySession::start_with_rng(&tuning, 1.0, 1, &mut StepRng::new(0, 1))
    }

    #[test]
    fn test_cue_layout_is_deterministic_without_jitter() {
        let a = session();
        let b = session();
        assert_eq!(a.cues(), b.cues());
        // day 1: phase 0.5, first cue 5.0, spacing 6.0
        assert_eq!(a.cues(), &[5.5, 11.5, 17.5]);
    }

    #[test]
    fn test_flip_tiers_by_distance() {
        let mut session = session();
        // Window 1.0, perfect 0.35.
        assert_eq!(session.flip(5.5).unwrap(), Tier::Perfect);
        assert_eq!(session.flip(12.2).unwrap(), Tier::Good);
        assert_eq!(session.flip(20.0).unwrap(), Tier::Miss);
        assert!(session.is_complete());
        assert!(matches!(
            session.flip(0.0),
            Err(MinigameError::AlreadyFinished)
        ));
    }

    #[test]
    fn test_all_perfect_outcome() {
        let mut session = session();
        for cue in session.cues().to_vec() {
            session.flip(cue).unwrap();
        }
        let outcome = session.finish();
        assert!(outcome.success);
        assert_eq!(outcome.score, 6);
        assert_eq!(outcome.mistakes, 0);
        // 3 perfect flips (+4 mood, +8 hunger each) plus the success bonus.
        assert_eq!(outcome.delta.mood, 12 + 8);
        assert_eq!(outcome.delta.hunger, 24 + 12);
        assert_eq!(outcome.delta.energy, -5);
    }

    #[test]
    fn test_unflipped_cues_count_as_misses() {
        let session = session();
        let outcome = session.finish();
        assert!(!outcome.success);
        assert_eq!(outcome.mistakes, 3);
        assert!(outcome.delta.mood < 0);
    }
}
