//! Headless play.
//!
//! Drives a session through whole days without any display: minigames are
//! played from their cue lists, conversations follow the first available
//! choice, and everything said or shown lands in a transcript. This is what
//! the binary's `--headless` flag runs and what the integration tests lean
//! on.

use crate::balance::ConfigStore;
use crate::day::DaySegment;
use crate::minigames::{Minigame, MinigameInput, MinigameKind};
use crate::session::{GameSession, SessionError};
use std::path::PathBuf;
use std::time::Duration;

/// How long the evening chat waits for an AI reply before moving on.
const REPLY_WAIT: Duration = Duration::from_millis(50);
const REPLY_WAIT_ROUNDS: u32 = 100;

#[derive(Debug, Clone)]
pub struct HeadlessConfig {
    /// How many full days to play.
    pub days: u32,
    /// Save file written at each Sleep transition, if set.
    pub save_path: Option<PathBuf>,
    /// Whether the evening chat message goes out at all.
    pub chat: bool,
}

impl Default for HeadlessConfig {
    fn default() -> Self {
        Self {
            days: 1,
            save_path: None,
            chat: true,
        }
    }
}

/// A session plus a transcript, played by script.
pub struct HeadlessGame {
    session: GameSession,
    config: HeadlessConfig,
    transcript: Vec<String>,
}

impl HeadlessGame {
    pub fn new(config: ConfigStore, headless: HeadlessConfig) -> Result<Self, SessionError> {
        Ok(Self {
            session: GameSession::new(config)?,
            config: headless,
            transcript: Vec::new(),
        })
    }

    /// Wrap an existing session; tests use this with a mock backend.
    pub fn with_session(session: GameSession, config: HeadlessConfig) -> Self {
        Self {
            session,
            config,
            transcript: Vec::new(),
        }
    }

    pub fn session(&self) -> &GameSession {
        &self.session
    }

    pub fn transcript(&self) -> &[String] {
        &self.transcript
    }

    /// Play the configured number of days.
    pub async fn run(&mut self) -> Result<(), SessionError> {
        for _ in 0..self.config.days {
            self.play_day().await?;
        }
        Ok(())
    }

    /// Play one full day, Dawn back to Dawn.
    pub async fn play_day(&mut self) -> Result<(), SessionError> {
        let day = self.session.day_number();
        self.log(format!("=== Day {day} ==="));

        while self.session.day_number() == day {
            match self.session.segment() {
                DaySegment::Dawn => {
                    self.log("She wakes up before the alarm.");
                    self.leave_segment();
                }
                DaySegment::Commute => {
                    self.play_timing_game(MinigameKind::Hallway)?;
                    self.leave_segment();
                }
                DaySegment::Morning => {
                    self.play_quiz()?;
                    self.leave_segment();
                }
                DaySegment::Afternoon => {
                    self.play_timing_game(MinigameKind::Fry)?;
                    if self.session.stats().hunger() < 30 && self.session.buy_snack() {
                        self.log("Vending machine dinner. Again.");
                    }
                    self.leave_segment();
                }
                DaySegment::Evening => {
                    if self.config.chat {
                        self.evening_chat().await;
                    }
                    self.leave_segment();
                }
                DaySegment::Night => {
                    self.night_talk()?;
                    self.leave_segment();
                }
                DaySegment::Sleep => {
                    self.log(self.session.dream());
                    if let Some(path) = self.config.save_path.clone() {
                        self.session.save(&path).await?;
                        self.log(format!("Saved to {}.", path.display()));
                    }
                    self.leave_segment();
                }
            }
        }
        Ok(())
    }

    /// Leave the current segment, ticking it out when it can't be skipped.
    fn leave_segment(&mut self) {
        let before = self.session.segment();
        let change = match self.session.skip() {
            Some(change) => Some(change),
            None => {
                // Non-skippable; run the clock out. The forced-rest floors
                // may fire first and that's fine.
                let mut change = None;
                while change.is_none() && self.session.segment() == before {
                    change = self.session.tick(60.0);
                }
                change
            }
        };
        if let Some(change) = change {
            if let Some(summary) = &change.summary {
                for line in summary.lines() {
                    self.log(line);
                }
            }
        }
    }

    fn play_timing_game(&mut self, kind: MinigameKind) -> Result<(), SessionError> {
        self.session.start_minigame(kind)?;
        let cues: Vec<f32> = match self.session.minigame() {
            Some(Minigame::Fry(fry)) => fry.cues().to_vec(),
            Some(Minigame::Hallway(hallway)) => hallway.cues().to_vec(),
            _ => Vec::new(),
        };
        for cue in cues {
            let input = match kind {
                MinigameKind::Fry => MinigameInput::Flip { at: cue },
                MinigameKind::Hallway => MinigameInput::Dodge { at: cue },
                MinigameKind::Quiz => continue,
            };
            self.session.minigame_input(&input)?;
        }
        let outcome = self.session.finish_minigame()?;
        for line in &outcome.lines {
            self.log(line.clone());
        }
        Ok(())
    }

    fn play_quiz(&mut self) -> Result<(), SessionError> {
        self.session.start_minigame(MinigameKind::Quiz)?;
        loop {
            let answer = match self.session.minigame() {
                Some(Minigame::Quiz(quiz)) => quiz.current_answer(),
                _ => None,
            };
            match answer {
                Some(index) => {
                    self.session
                        .minigame_input(&MinigameInput::Answer { index })?;
                }
                None => break,
            }
        }
        let outcome = self.session.finish_minigame()?;
        for line in &outcome.lines {
            self.log(line.clone());
        }
        Ok(())
    }

    async fn evening_chat(&mut self) {
        let message = "long shift. fries everywhere. tell me something good";
        self.log(format!("you -> zara: {message}"));
        if let Some(line) = self.session.say("zara", message) {
            self.log(format!("{}: {}", line.speaker, line.text));
            return;
        }
        for _ in 0..REPLY_WAIT_ROUNDS {
            tokio::time::sleep(REPLY_WAIT).await;
            let lines = self.session.poll();
            if !lines.is_empty() {
                for line in lines {
                    self.log(format!("{}: {}", line.speaker, line.text));
                }
                return;
            }
            if !self.session.reply_pending() {
                break;
            }
        }
        self.log("No reply tonight.");
    }

    fn night_talk(&mut self) -> Result<(), SessionError> {
        let mut turn = self.session.talk_to_mom()?;
        // Follow the first choice; bounded so cyclic graphs terminate.
        for _ in 0..6 {
            for line in &turn.lines {
                self.log(format!("{}: {}", turn.speaker, line));
            }
            let Some(choice) = turn.choices.first() else {
                break;
            };
            let (choice_id, label) = (choice.id.clone(), choice.label.clone());
            self.log(format!("you: {label}"));
            match self.session.choose(&choice_id)? {
                Some(next) => turn = next,
                None => break,
            }
        }
        self.session.close_dialogue();
        Ok(())
    }

    fn log(&mut self, line: impl Into<String>) {
        self.transcript.push(line.into());
    }
}
