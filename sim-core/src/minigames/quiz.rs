//! The German vocabulary quiz.
//!
//! Multiple choice, one question at a time. The question pool tier comes
//! from the player's German level plus how deep into the run they are, so
//! the quiz keeps pace with progress.

use super::{MinigameError, MinigameKind, MinigameOutcome, Tier};
use crate::balance::QuizTuning;
use crate::stats::StatDelta;
use rand::Rng;

struct Entry {
    prompt: &'static str,
    options: [&'static str; 4],
    answer: usize,
}

const EASY: [Entry; 6] = [
    Entry {
        prompt: "\"the bread\"",
        options: ["das Brot", "der Brot", "die Brote", "das Brat"],
        answer: 0,
    },
    Entry {
        prompt: "\"thank you\"",
        options: ["bitte", "danke", "hallo", "tschüss"],
        answer: 1,
    },
    Entry {
        prompt: "\"good morning\"",
        options: ["gute Nacht", "guten Abend", "guten Morgen", "guten Tag"],
        answer: 2,
    },
    Entry {
        prompt: "\"the water\"",
        options: ["der Wasser", "die Wasser", "das Wetter", "das Wasser"],
        answer: 3,
    },
    Entry {
        prompt: "\"the house\"",
        options: ["das Haus", "die Haus", "der Haus", "das Hause"],
        answer: 0,
    },
    Entry {
        prompt: "\"the school\"",
        options: ["der Schule", "die Schule", "das Schul", "die Schul"],
        answer: 1,
    },
];

const MEDIUM: [Entry; 6] = [
    Entry {
        prompt: "\"I am hungry\"",
        options: ["ich habe Hunger", "ich bin Hunger", "mir ist Hunger", "ich hungere"],
        answer: 0,
    },
    Entry {
        prompt: "\"the homework\"",
        options: ["das Hauswerk", "die Hausaufgaben", "der Hausauftrag", "die Heimarbeit"],
        answer: 1,
    },
    Entry {
        prompt: "\"to cook\"",
        options: ["kaufen", "küchen", "kochen", "kommen"],
        answer: 2,
    },
    Entry {
        prompt: "\"tired\"",
        options: ["mutig", "mürrisch", "munter", "müde"],
        answer: 3,
    },
    Entry {
        prompt: "\"the tram\"",
        options: ["die Straßenbahn", "der Straßenzug", "das Strassenauto", "die Bahnstraße"],
        answer: 0,
    },
    Entry {
        prompt: "\"to work late\"",
        options: ["früh arbeiten", "lange arbeiten", "langsam arbeiten", "laut arbeiten"],
        answer: 1,
    },
];

const HARD: [Entry; 6] = [
    Entry {
        prompt: "\"nevertheless\"",
        options: ["trotzdem", "deshalb", "außerdem", "jedenfalls"],
        answer: 0,
    },
    Entry {
        prompt: "\"the experience\"",
        options: ["das Erlebnis", "die Erfahrung", "die Erkenntnis", "der Eindruck"],
        answer: 1,
    },
    Entry {
        prompt: "\"exhausted\"",
        options: ["erschrocken", "erleichtert", "erschöpft", "erstaunt"],
        answer: 2,
    },
    Entry {
        prompt: "\"to succeed\"",
        options: ["geraten", "gefallen", "gehören", "gelingen"],
        answer: 3,
    },
    Entry {
        prompt: "\"the responsibility\"",
        options: ["die Verantwortung", "die Verabredung", "die Versicherung", "die Verwaltung"],
        answer: 0,
    },
    Entry {
        prompt: "\"reliable\"",
        options: ["zufällig", "zuverlässig", "zugänglich", "zufrieden"],
        answer: 1,
    },
];

/// Pool tier for a given German level on a given day. Caps at the hard pool.
pub fn difficulty_tier(level: u32, day: u32) -> u32 {
    (level + day.saturating_sub(1) / 2).min(3)
}

fn pool(tier: u32) -> &'static [Entry] {
    match tier {
        0 | 1 => &EASY,
        2 => &MEDIUM,
        _ => &HARD,
    }
}

/// One question as shown to the player.
#[derive(Debug, Clone, PartialEq)]
pub struct QuestionView {
    pub prompt: String,
    pub options: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct QuizSession {
    tuning: QuizTuning,
    tier: u32,
    /// Indices into the tier's pool, in asking order.
    picked: Vec<usize>,
    next: usize,
    correct: u32,
    wrong: u32,
}

impl QuizSession {
    pub fn start_with_rng(tuning: &QuizTuning, level: u32, day: u32, rng: &mut impl Rng) -> Self {
        let tier = difficulty_tier(level, day);
        let pool_len = pool(tier).len();
        let count = tuning.questions.clamp(1, pool_len);
        let start = rng.gen_range(0..pool_len);
        let picked = (0..count).map(|i| (start + i) % pool_len).collect();
        Self {
            tuning: tuning.clone(),
            tier,
            picked,
            next: 0,
            correct: 0,
            wrong: 0,
        }
    }

    pub fn tier(&self) -> u32 {
        self.tier
    }

    pub fn is_complete(&self) -> bool {
        self.next >= self.picked.len()
    }

    pub fn current_question(&self) -> Option<QuestionView> {
        let entry = &pool(self.tier)[*self.picked.get(self.next)?];
        Some(QuestionView {
            prompt: entry.prompt.to_string(),
            options: entry.options.iter().map(|o| o.to_string()).collect(),
        })
    }

    /// Index of the right option for the current question. Lets scripted
    /// drivers play a deliberate result.
    pub fn current_answer(&self) -> Option<usize> {
        Some(pool(self.tier)[*self.picked.get(self.next)?].answer)
    }

    pub fn answer(&mut self, index: usize) -> Result<Tier, MinigameError> {
        let entry = &pool(self.tier)[*self
            .picked
            .get(self.next)
            .ok_or(MinigameError::AlreadyFinished)?];
        self.next += 1;
        if index == entry.answer {
            self.correct += 1;
            Ok(Tier::Perfect)
        } else {
            self.wrong += 1;
            Ok(Tier::Miss)
        }
    }

    pub fn finish(self) -> MinigameOutcome {
        let total = self.picked.len() as u32;
        let t = &self.tuning;
        let all_correct = self.correct == total;
        let at_least_half = self.correct * 2 >= total;

        let (base_mood, xp, line) = if all_correct {
            (
                t.pass_mood,
                t.pass_xp,
                "Every answer lands. Frau Weber almost smiles.",
            )
        } else if at_least_half {
            (
                (t.pass_mood as f32 * t.partial_mood_factor) as i32,
                (t.pass_xp as f32 * t.partial_xp_factor) as u32,
                "Half right. The words are starting to stick.",
            )
        } else {
            (t.fail_mood, 0, "The words swim. Tomorrow, maybe.")
        };

        MinigameOutcome {
            kind: MinigameKind::Quiz,
            success: at_least_half,
            score: self.correct,
            mistakes: self.wrong + (total - self.next.min(total as usize) as u32),
            delta: StatDelta::new()
                .mood(base_mood + self.wrong as i32 * t.wrong_answer_mood)
                .german_xp(xp),
            lines: vec![line.to_string()],
        }
    }
}
