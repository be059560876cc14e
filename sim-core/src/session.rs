//! The game session facade.
//!
//! One `GameSession` owns the whole mutable state of a run: stats, events,
//! the day cycle, the dialogue engine, and at most one running minigame.
//! Every command comes in through a method here and every stat change goes
//! out through the StatStore, on a single thread; nothing in the core locks.

use crate::balance::{ConfigError, ConfigStore};
use crate::day::{dream_line, DayCycleController, DaySegment, SegmentChange};
use crate::dialogue::{
    DialogueContext, DialogueEngine, DialogueError, DialogueTurn, LineSource, SpokenLine,
    TextBackend,
};
use crate::flags::EventSystem;
use crate::minigames::{Minigame, MinigameError, MinigameInput, MinigameKind, MinigameOutcome, Tier};
use crate::persist::{PersistError, SavedGame};
use crate::stats::{StatDelta, StatStore};
use localai::LocalAi;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Event id recorded on a flawless fry run; gates a friend reaction.
pub const PERFECT_FRIES_EVENT: &str = "perfect_fries";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Persist(#[from] PersistError),

    #[error(transparent)]
    Dialogue(#[from] DialogueError),

    #[error(transparent)]
    Minigame(#[from] MinigameError),

    #[error("backend client error: {0}")]
    Backend(#[from] localai::Error),

    #[error("a minigame is already running")]
    MinigameAlreadyRunning,

    #[error("no minigame is running")]
    NoMinigameRunning,
}

/// Mom's state when the night talk starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MomMode {
    Neutral,
    Tired,
    Drunk,
}

impl MomMode {
    pub fn node_id(self) -> &'static str {
        match self {
            MomMode::Neutral => "mom.neutral",
            MomMode::Tired => "mom.tired",
            MomMode::Drunk => "mom.drunk",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            MomMode::Neutral => "neutral",
            MomMode::Tired => "tired",
            MomMode::Drunk => "drunk",
        }
    }
}

pub struct GameSession {
    config: ConfigStore,
    stats: StatStore,
    events: EventSystem,
    day: DayCycleController,
    dialogue: DialogueEngine,
    minigame: Option<Minigame>,
    mom_mode_today: Option<MomMode>,
}

impl GameSession {
    /// Start a fresh run with a real backend client built from config.
    pub fn new(config: ConfigStore) -> Result<Self, SessionError> {
        let backend = LocalAi::new(config.ai.backend.clone())?;
        Ok(Self::with_backend(config, Arc::new(backend)))
    }

    /// Start a fresh run with an injected backend. The test seam.
    pub fn with_backend(config: ConfigStore, backend: Arc<dyn TextBackend>) -> Self {
        let stats = StatStore::new(config.balance.stats.clone());
        let day = DayCycleController::new(
            config.balance.day.clone(),
            config.balance.sleep.clone(),
            &stats,
        );
        let dialogue =
            DialogueEngine::new(config.bank.clone(), config.ai.clone(), backend);
        Self {
            config,
            stats,
            events: EventSystem::new(),
            day,
            dialogue,
            minigame: None,
            mom_mode_today: None,
        }
    }

    /// Resume from a save.
    pub fn resume(config: ConfigStore, saved: SavedGame) -> Result<Self, SessionError> {
        let backend: Arc<dyn TextBackend> = Arc::new(LocalAi::new(config.ai.backend.clone())?);
        let stats = StatStore::from_saved(
            config.balance.stats.clone(),
            saved.stats,
            saved.relationships,
        );
        let day = DayCycleController::from_saved(
            config.balance.day.clone(),
            config.balance.sleep.clone(),
            saved.day,
            &stats,
        );
        let dialogue =
            DialogueEngine::new(config.bank.clone(), config.ai.clone(), backend);
        Ok(Self {
            config,
            stats,
            events: EventSystem::from_saved(saved.flags),
            day,
            dialogue,
            minigame: None,
            mom_mode_today: None,
        })
    }

    pub fn config(&self) -> &ConfigStore {
        &self.config
    }

    pub fn stats(&self) -> &StatStore {
        &self.stats
    }

    pub fn stats_mut(&mut self) -> &mut StatStore {
        &mut self.stats
    }

    pub fn events(&self) -> &EventSystem {
        &self.events
    }

    pub fn day_number(&self) -> u32 {
        self.day.day()
    }

    pub fn segment(&self) -> DaySegment {
        self.day.segment()
    }

    // ------------------------------------------------------------------
    // Day cycle
    // ------------------------------------------------------------------

    /// Advance simulated time. A transition out of the current segment
    /// abandons any running minigame and open dialogue.
    pub fn tick(&mut self, dt: f32) -> Option<SegmentChange> {
        let change = self.day.tick(dt, &mut self.stats, &mut self.events)?;
        self.on_segment_change(&change);
        Some(change)
    }

    /// Skip the current segment if it allows skipping.
    pub fn skip(&mut self) -> Option<SegmentChange> {
        let change = self.day.skip(&mut self.stats, &mut self.events)?;
        self.on_segment_change(&change);
        Some(change)
    }

    fn on_segment_change(&mut self, change: &SegmentChange) {
        self.minigame = None;
        self.dialogue.close();
        if change.to == DaySegment::Dawn {
            self.mom_mode_today = None;
        }
    }

    /// Tonight's dream, varying with the day.
    pub fn dream(&self) -> &'static str {
        dream_line(self.day.day(), &mut rand::thread_rng())
    }

    // ------------------------------------------------------------------
    // Dialogue
    // ------------------------------------------------------------------

    /// Open a scripted conversation at the given node.
    pub fn talk(&mut self, node_id: &str) -> Result<DialogueTurn, SessionError> {
        let ctx = self.context_for_node(node_id);
        Ok(self.dialogue.open(node_id, &ctx, &self.events)?)
    }

    /// Open the night talk with mom, picking tonight's mode.
    pub fn talk_to_mom(&mut self) -> Result<DialogueTurn, SessionError> {
        let mode = self.mom_night_mode_with_rng(&mut rand::thread_rng());
        self.talk(mode.node_id())
    }

    /// Decide (once per day) which state mom is in tonight.
    pub fn mom_night_mode_with_rng(&mut self, rng: &mut impl Rng) -> MomMode {
        if let Some(mode) = self.mom_mode_today {
            return mode;
        }
        // Low mood wins before the drunk roll is ever considered.
        let mode = if self.stats.mood() < 30 {
            MomMode::Tired
        } else if self.stats.mom() >= self.config.balance.events.mom_drunk_threshold
            && rng.gen_bool(0.4)
        {
            MomMode::Drunk
        } else {
            MomMode::Neutral
        };
        self.mom_mode_today = Some(mode);
        self.events.trigger(&format!("mom_mode:{}", mode.name()));
        mode
    }

    /// Pick a choice in the open conversation.
    pub fn choose(&mut self, choice_id: &str) -> Result<Option<DialogueTurn>, SessionError> {
        let ctx = match self.dialogue.current_node() {
            Some(node_id) => self.context_for_node(node_id),
            None => self.context_for_persona(""),
        };
        Ok(self.dialogue.choose(choice_id, &ctx, &self.events)?)
    }

    pub fn close_dialogue(&mut self) {
        self.dialogue.close();
    }

    /// Send free text to a friend. Friends below the ignore threshold leave
    /// it on read; everyone else replies, by AI or stub.
    pub fn say(&mut self, friend_id: &str, text: &str) -> Option<SpokenLine> {
        if self.stats.relationship(friend_id) <= self.config.balance.events.friend_ignore_threshold
        {
            self.events.trigger(&format!("ignored_by:{friend_id}"));
            return Some(SpokenLine {
                speaker: display_name(friend_id),
                persona: friend_id.to_string(),
                text: "...".to_string(),
                source: LineSource::Scripted,
            });
        }
        let ctx = self.context_for_persona(friend_id);
        let reply = self
            .dialogue
            .request_reply(&display_name(friend_id), friend_id, text, &ctx);
        if let Some(line) = &reply {
            self.apply_reply_effects(line);
        }
        reply
    }

    /// Drain completed AI replies and fold their relationship effects in.
    pub fn poll(&mut self) -> Vec<SpokenLine> {
        let ctx = self.context_for_persona("");
        let lines = self.dialogue.poll(&ctx);
        for line in &lines {
            self.apply_reply_effects(line);
        }
        lines
    }

    pub fn reply_pending(&self) -> bool {
        self.dialogue.pending()
    }

    /// Denylist hits recorded by the dialogue engine. For balance tuning.
    pub fn policy_hits(&self) -> &[crate::dialogue::PolicyHit] {
        self.dialogue.policy_hits()
    }

    fn apply_reply_effects(&mut self, line: &SpokenLine) {
        // Getting an answer at all warms the friendship a little.
        if line.persona != "mom" && !line.persona.is_empty() {
            self.stats.relationship_delta(&line.persona, 2);
        }
    }

    fn context_for_node(&self, node_id: &str) -> DialogueContext {
        let persona = self
            .dialogue
            .bank()
            .get(node_id)
            .and_then(|node| node.ai_persona.clone())
            .unwrap_or_default();
        self.context_for_persona(&persona)
    }

    fn context_for_persona(&self, persona: &str) -> DialogueContext {
        let relationship = if persona == "mom" {
            self.stats.mom()
        } else if persona.is_empty() {
            // No speaker in play; templates get the neutral default.
            self.config.balance.stats.default_relationship
        } else {
            self.stats.relationship(persona)
        };
        DialogueContext {
            day: self.day.day(),
            mood: self.stats.mood(),
            relationship,
            mood_descriptor: self.stats.mood_descriptor().to_string(),
        }
    }

    // ------------------------------------------------------------------
    // Minigames
    // ------------------------------------------------------------------

    /// Start a minigame; difficulty is read from current energy and mood.
    pub fn start_minigame(&mut self, kind: MinigameKind) -> Result<&Minigame, SessionError> {
        self.start_minigame_with_rng(kind, &mut rand::thread_rng())
    }

    pub fn start_minigame_with_rng(
        &mut self,
        kind: MinigameKind,
        rng: &mut impl Rng,
    ) -> Result<&Minigame, SessionError> {
        if self.minigame.is_some() {
            return Err(SessionError::MinigameAlreadyRunning);
        }
        let day = self.day.day();
        let game = match kind {
            MinigameKind::Fry => Minigame::fry_with_rng(&self.config.balance, &self.stats, day, rng),
            MinigameKind::Hallway => {
                Minigame::hallway_with_rng(&self.config.balance, &self.stats, day, rng)
            }
            MinigameKind::Quiz => {
                Minigame::quiz_with_rng(&self.config.balance, &self.stats, day, rng)
            }
        };
        Ok(self.minigame.insert(game))
    }

    pub fn minigame(&self) -> Option<&Minigame> {
        self.minigame.as_ref()
    }

    /// Feed one input to the running minigame.
    pub fn minigame_input(&mut self, input: &MinigameInput) -> Result<Tier, SessionError> {
        let game = self
            .minigame
            .as_mut()
            .ok_or(SessionError::NoMinigameRunning)?;
        Ok(game.handle(input)?)
    }

    /// End the running minigame and fold its outcome into the stats.
    pub fn finish_minigame(&mut self) -> Result<MinigameOutcome, SessionError> {
        let game = self.minigame.take().ok_or(SessionError::NoMinigameRunning)?;
        let outcome = game.finish();
        self.stats.apply(&outcome.delta);
        self.events
            .trigger(&format!("minigame:{}", outcome.kind.name()));
        if outcome.kind == MinigameKind::Fry && outcome.success && outcome.mistakes == 0 {
            self.events.trigger(PERFECT_FRIES_EVENT);
        }
        Ok(outcome)
    }

    // ------------------------------------------------------------------
    // Economy
    // ------------------------------------------------------------------

    /// Buy from the vending machine. Returns false, with no effect, when
    /// the wallet can't cover it.
    pub fn buy_snack(&mut self) -> bool {
        let vending = &self.config.balance.vending;
        if self.stats.money_cents() < vending.cost_cents {
            return false;
        }
        self.stats.apply(
            &StatDelta::new()
                .money_cents(-vending.cost_cents)
                .hunger(vending.hunger)
                .mood(vending.mood),
        );
        self.events.trigger("vending_snack");
        true
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    /// Current state as a save document.
    pub fn snapshot(&self) -> SavedGame {
        SavedGame::new(
            self.day.day(),
            self.stats.stats().clone(),
            self.stats.relationships().clone(),
            self.events.persistent.clone(),
        )
    }

    pub async fn save(&self, path: impl AsRef<Path>) -> Result<(), SessionError> {
        self.snapshot().save(path).await?;
        Ok(())
    }
}

fn display_name(id: &str) -> String {
    let mut chars = id.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::PlayerStats;
    use rand::rngs::mock::StepRng;

    fn session() -> GameSession {
        let backend = LocalAi::new(localai::BackendSettings::default());
        GameSession::with_backend(
            ConfigStore::builtin(),
            Arc::new(backend.unwrap()),
        )
    }

    #[test]
    fn test_minigame_lifecycle_applies_outcome() {
        let mut session = session();
        let mut rng = StepRng::new(0, 1);
        session
            .start_minigame_with_rng(MinigameKind::Quiz, &mut rng)
            .unwrap();
        assert!(matches!(
            session.start_minigame_with_rng(MinigameKind::Fry, &mut rng),
            Err(SessionError::MinigameAlreadyRunning)
        ));

        while let Some(Minigame::Quiz(quiz)) = session.minigame() {
            if quiz.is_complete() {
                break;
            }
            let answer = quiz.current_answer().unwrap();
            session
                .minigame_input(&MinigameInput::Answer { index: answer })
                .unwrap();
        }

        let xp_before = session.stats().german().xp;
        let outcome = session.finish_minigame().unwrap();
        assert!(outcome.success);
        assert!(session.stats().german().xp > xp_before || session.stats().german().level > 1);
        assert!(session.events().was_triggered_today("minigame:quiz"));
        assert!(session.minigame().is_none());
    }

    #[test]
    fn test_low_relationship_friend_ignores() {
        let mut session = session();
        for _ in 0..20 {
            session.stats_mut().relationship_delta("zara", -5);
        }
        assert!(session.stats().relationship("zara") <= 25);

        let line = session.say("zara", "hey, you around?").unwrap();
        assert_eq!(line.text, "...");
        assert!(session.events().was_triggered_today("ignored_by:zara"));
    }

    #[test]
    fn test_say_with_disabled_backend_replies_and_warms() {
        let mut session = session();
        let before = session.stats().relationship("lukas");
        let line = session.say("lukas", "you will not believe my shift").unwrap();
        assert_eq!(line.source, LineSource::Fallback);
        assert_eq!(session.stats().relationship("lukas"), before + 2);
    }

    #[test]
    fn test_mom_mode_is_stable_within_a_day() {
        let mut session = session();
        session.stats_mut().mom_delta(40); // 50 -> 90, above the threshold
        let mut rng = StepRng::new(0, 1);
        let first = session.mom_night_mode_with_rng(&mut rng);
        let second = session.mom_night_mode_with_rng(&mut rng);
        assert_eq!(first, second);
        assert!(session
            .events()
            .was_triggered_today(&format!("mom_mode:{}", first.name())));
    }

    #[test]
    fn test_mom_tired_when_mood_is_low() {
        let mut session = session();
        session.stats_mut().set_stats_for_test(PlayerStats {
            mood: 10,
            ..PlayerStats::default()
        });
        let mode = session.mom_night_mode_with_rng(&mut StepRng::new(0, 1));
        assert_eq!(mode, MomMode::Tired);
    }

    #[test]
    fn test_low_mood_wins_over_the_drunk_roll() {
        let mut session = session();
        session.stats_mut().mom_delta(40); // 50 -> 90, above the threshold
        session.stats_mut().set_stats_for_test(PlayerStats {
            mood: 10,
            ..PlayerStats::default()
        });
        // StepRng(0, 1) wins a 40% roll, so only the ordering saves us here.
        let mode = session.mom_night_mode_with_rng(&mut StepRng::new(0, 1));
        assert_eq!(mode, MomMode::Tired);
    }

    #[test]
    fn test_context_without_a_persona_uses_the_default_relationship() {
        let mut session = session();
        session.stats_mut().mom_delta(40);
        let ctx = session.context_for_persona("");
        assert_eq!(
            ctx.relationship,
            session.config().balance.stats.default_relationship
        );
        assert_eq!(session.context_for_persona("mom").relationship, 90);
    }

    #[test]
    fn test_vending_respects_wallet() {
        let mut session = session();
        // Default wallet 500 cents, snack 150.
        assert!(session.buy_snack());
        assert_eq!(session.stats().money_cents(), 350);

        assert!(session.buy_snack());
        assert!(session.buy_snack());
        assert_eq!(session.stats().money_cents(), 50);
        assert!(!session.buy_snack(), "50 cents does not cover a snack");
        assert_eq!(session.stats().money_cents(), 50);
    }

    #[test]
    fn test_segment_change_abandons_minigame_and_dialogue() {
        let mut session = session();
        session.talk("mom.neutral").unwrap();
        let change = session.skip().expect("dawn is skippable");
        assert_eq!(change.to, DaySegment::Commute);
        assert!(session.minigame().is_none());
        session
            .start_minigame_with_rng(MinigameKind::Fry, &mut StepRng::new(0, 1))
            .unwrap();
        session.skip();
        assert!(session.minigame().is_none());
    }
}
