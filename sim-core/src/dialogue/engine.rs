//! Dialogue resolution and the AI-backed free-text path.
//!
//! Scripted turns resolve synchronously against the bank. Free-text replies
//! go out as spawned, cancellable generation tasks; completions arrive over
//! a channel and are applied by `poll` only if the request is still live.
//! Every failure path lands on a deterministic persona stub, so the player
//! always gets a line and never sees an error.

use crate::balance::AiConfig;
use crate::dialogue::bank::{DialogueBank, DialogueChoice, DialogueNode};
use crate::flags::EventSystem;
use localai::{GenerateRequest, LocalAi};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;

#[derive(Debug, Error)]
pub enum DialogueError {
    #[error("unknown dialogue node: {0}")]
    UnknownNode(String),

    #[error("dialogue node {0} is not available yet")]
    NodeUnavailable(String),

    #[error("no dialogue is open")]
    NoActiveDialogue,

    #[error("unknown choice: {0}")]
    UnknownChoice(String),
}

/// Values templates can reference: `{day}`, `{mood}`, `{relationship}`,
/// `{mood_descriptor}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialogueContext {
    pub day: u32,
    pub mood: i32,
    pub relationship: i32,
    pub mood_descriptor: String,
}

impl DialogueContext {
    pub fn expand(&self, template: &str) -> String {
        template
            .replace("{day}", &self.day.to_string())
            .replace("{mood}", &self.mood.to_string())
            .replace("{relationship}", &self.relationship.to_string())
            .replace("{mood_descriptor}", &self.mood_descriptor)
    }
}

/// Where a spoken line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineSource {
    Scripted,
    Generated,
    Fallback,
}

/// One line of speech, scripted or generated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpokenLine {
    pub speaker: String,
    pub persona: String,
    pub text: String,
    pub source: LineSource,
}

/// A resolved scripted beat, ready for display.
#[derive(Debug, Clone, PartialEq)]
pub struct DialogueTurn {
    pub node_id: String,
    pub speaker: String,
    pub lines: Vec<String>,
    /// Choices whose requirements are met, labels expanded.
    pub choices: Vec<DialogueChoice>,
}

impl DialogueTurn {
    /// A turn with no available choices ends the conversation.
    pub fn is_terminal(&self) -> bool {
        self.choices.is_empty()
    }
}

/// Record of a generated reply that tripped the denylist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyHit {
    pub persona: String,
    pub matched: String,
}

/// Seam between the engine and the generation client, so tests can stand in
/// a scripted or never-responding backend.
pub trait TextBackend: Send + Sync {
    fn enabled(&self) -> bool;

    fn generate<'a>(
        &'a self,
        request: &'a GenerateRequest,
    ) -> Pin<Box<dyn Future<Output = Result<String, localai::Error>> + Send + 'a>>;
}

impl TextBackend for LocalAi {
    fn enabled(&self) -> bool {
        self.is_enabled()
    }

    fn generate<'a>(
        &'a self,
        request: &'a GenerateRequest,
    ) -> Pin<Box<dyn Future<Output = Result<String, localai::Error>> + Send + 'a>> {
        Box::pin(LocalAi::generate(self, request))
    }
}

struct TaskResult {
    generation: u64,
    speaker: String,
    persona: String,
    player_text: String,
    result: Result<String, localai::Error>,
}

/// Resolves scripted nodes and manages in-flight generation requests.
///
/// The free-text path requires a tokio runtime when the backend is enabled;
/// with the backend disabled everything is synchronous and never blocks.
pub struct DialogueEngine {
    bank: DialogueBank,
    config: AiConfig,
    backend: Arc<dyn TextBackend>,
    current: Option<String>,
    recent: VecDeque<(String, String)>,
    generation: u64,
    in_flight: bool,
    tx: mpsc::UnboundedSender<TaskResult>,
    rx: mpsc::UnboundedReceiver<TaskResult>,
    policy_hits: Vec<PolicyHit>,
}

impl DialogueEngine {
    pub fn new(bank: DialogueBank, config: AiConfig, backend: Arc<dyn TextBackend>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            bank,
            config,
            backend,
            current: None,
            recent: VecDeque::new(),
            generation: 0,
            in_flight: false,
            tx,
            rx,
            policy_hits: Vec::new(),
        }
    }

    pub fn bank(&self) -> &DialogueBank {
        &self.bank
    }

    pub fn current_node(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// Open a conversation at the given node.
    pub fn open(
        &mut self,
        node_id: &str,
        ctx: &DialogueContext,
        events: &EventSystem,
    ) -> Result<DialogueTurn, DialogueError> {
        let node = self
            .bank
            .get(node_id)
            .ok_or_else(|| DialogueError::UnknownNode(node_id.to_string()))?;
        if !requirements_met(&node.requires, events) {
            return Err(DialogueError::NodeUnavailable(node_id.to_string()));
        }
        let turn = resolve_turn(node, ctx, events);
        self.cancel_pending();
        self.current = Some(turn.node_id.clone());
        for line in &turn.lines {
            self.remember(&turn.speaker, line);
        }
        Ok(turn)
    }

    /// Pick a choice in the open conversation. `Ok(None)` means the
    /// conversation ended.
    pub fn choose(
        &mut self,
        choice_id: &str,
        ctx: &DialogueContext,
        events: &EventSystem,
    ) -> Result<Option<DialogueTurn>, DialogueError> {
        let current = self.current.clone().ok_or(DialogueError::NoActiveDialogue)?;
        let node = self
            .bank
            .get(&current)
            .ok_or_else(|| DialogueError::UnknownNode(current.clone()))?;
        let choice = node
            .choices
            .iter()
            .find(|c| c.id == choice_id && requirements_met(&c.requires, events))
            .ok_or_else(|| DialogueError::UnknownChoice(choice_id.to_string()))?;

        match &choice.next {
            Some(next) => {
                let next = next.clone();
                self.open(&next, ctx, events).map(Some)
            }
            None => {
                self.close();
                Ok(None)
            }
        }
    }

    /// End the open conversation and drop any in-flight generation.
    pub fn close(&mut self) {
        self.current = None;
        self.cancel_pending();
    }

    /// Send free text to a persona. Returns the reply immediately when the
    /// backend is disabled; otherwise the reply arrives through [`poll`].
    pub fn request_reply(
        &mut self,
        speaker: &str,
        persona: &str,
        player_text: &str,
        ctx: &DialogueContext,
    ) -> Option<SpokenLine> {
        self.remember("you", player_text);

        if !self.backend.enabled() {
            let line = self.fallback_line(speaker, persona, player_text, ctx);
            self.remember(&line.speaker, &line.text);
            return Some(line);
        }

        let request = self.build_request(persona, player_text, ctx);
        self.cancel_pending();
        self.in_flight = true;

        let backend = Arc::clone(&self.backend);
        let tx = self.tx.clone();
        let generation = self.generation;
        let timeout = Duration::from_secs(self.config.backend.timeout_secs.max(1));
        let speaker = speaker.to_string();
        let persona = persona.to_string();
        let player_text = player_text.to_string();
        tokio::spawn(async move {
            let mut result = run_once(backend.as_ref(), &request, timeout).await;
            // One retry on fast failures; a timeout has already spent the
            // whole budget, so it goes straight to the fallback.
            if matches!(result, Some(Err(_))) {
                result = run_once(backend.as_ref(), &request, timeout).await;
            }
            let result = result
                .unwrap_or_else(|| Err(localai::Error::Network("request timed out".to_string())));
            let _ = tx.send(TaskResult {
                generation,
                speaker,
                persona,
                player_text,
                result,
            });
        });
        None
    }

    /// Drain completed generation tasks. Stale results (anything requested
    /// before the last cancel) are discarded without effect.
    pub fn poll(&mut self, ctx: &DialogueContext) -> Vec<SpokenLine> {
        let mut lines = Vec::new();
        while let Ok(task) = self.rx.try_recv() {
            if task.generation != self.generation {
                continue;
            }
            self.in_flight = false;
            let line = match task.result {
                Ok(text) => self.admit(&task.speaker, &task.persona, &task.player_text, text, ctx),
                Err(_) => self.fallback_line(&task.speaker, &task.persona, &task.player_text, ctx),
            };
            self.remember(&line.speaker, &line.text);
            lines.push(line);
        }
        lines
    }

    /// Invalidate any in-flight request; its result will be discarded.
    pub fn cancel_pending(&mut self) {
        self.generation += 1;
        self.in_flight = false;
    }

    pub fn pending(&self) -> bool {
        self.in_flight
    }

    /// Denylist hits recorded since the last drain. For tuning, not errors.
    pub fn policy_hits(&self) -> &[PolicyHit] {
        &self.policy_hits
    }

    pub fn take_policy_hits(&mut self) -> Vec<PolicyHit> {
        std::mem::take(&mut self.policy_hits)
    }

    /// Apply the output policy to generated text: trim, denylist, length cap.
    fn admit(
        &mut self,
        speaker: &str,
        persona: &str,
        player_text: &str,
        text: String,
        ctx: &DialogueContext,
    ) -> SpokenLine {
        let text = text.trim().to_string();
        if text.is_empty() {
            return self.fallback_line(speaker, persona, player_text, ctx);
        }

        let lowered = text.to_lowercase();
        if let Some(matched) = self
            .config
            .denylist
            .iter()
            .find(|term| !term.is_empty() && lowered.contains(&term.to_lowercase()))
        {
            self.policy_hits.push(PolicyHit {
                persona: persona.to_string(),
                matched: matched.clone(),
            });
            return self.fallback_line(speaker, persona, player_text, ctx);
        }

        SpokenLine {
            speaker: speaker.to_string(),
            persona: persona.to_string(),
            text: truncate_chars(&text, self.config.max_reply_chars),
            source: LineSource::Generated,
        }
    }

    fn fallback_line(
        &self,
        speaker: &str,
        persona: &str,
        player_text: &str,
        ctx: &DialogueContext,
    ) -> SpokenLine {
        SpokenLine {
            speaker: speaker.to_string(),
            persona: persona.to_string(),
            text: persona_stub(persona, player_text, ctx),
            source: LineSource::Fallback,
        }
    }

    fn build_request(
        &self,
        persona: &str,
        player_text: &str,
        ctx: &DialogueContext,
    ) -> GenerateRequest {
        let system = self
            .config
            .personas
            .get(persona)
            .cloned()
            .unwrap_or_else(|| format!("You are {persona}. Reply in one or two short sentences."));

        let mut prompt = String::new();
        prompt.push_str(&format!(
            "Day {}. Their mood is {} ({}). Relationship score {}.\n",
            ctx.day, ctx.mood, ctx.mood_descriptor, ctx.relationship
        ));
        let window = self
            .recent
            .iter()
            .rev()
            .take(self.config.recent_window)
            .collect::<Vec<_>>();
        for (who, what) in window.into_iter().rev() {
            prompt.push_str(&format!("{who}: {what}\n"));
        }
        prompt.push_str(&format!("you: {player_text}\n{persona}:"));

        GenerateRequest::new(system, prompt)
            .with_temperature(self.config.temperature)
            .with_max_tokens(self.config.max_tokens)
    }

    fn remember(&mut self, who: &str, what: &str) {
        self.recent.push_back((who.to_string(), what.to_string()));
        // Keep a little headroom over the prompt window.
        let cap = self.config.recent_window.max(1) * 2;
        while self.recent.len() > cap {
            self.recent.pop_front();
        }
    }
}

/// One bounded generation attempt. `None` means the call timed out.
async fn run_once(
    backend: &dyn TextBackend,
    request: &GenerateRequest,
    timeout: Duration,
) -> Option<Result<String, localai::Error>> {
    tokio::time::timeout(timeout, backend.generate(request))
        .await
        .ok()
}

fn requirements_met(requires: &[String], events: &EventSystem) -> bool {
    requires.iter().all(|id| events.was_triggered_today(id))
}

fn resolve_turn(node: &DialogueNode, ctx: &DialogueContext, events: &EventSystem) -> DialogueTurn {
    DialogueTurn {
        node_id: node.id.clone(),
        speaker: node.speaker.clone(),
        lines: node.lines.iter().map(|line| ctx.expand(line)).collect(),
        choices: node
            .choices
            .iter()
            .filter(|choice| requirements_met(&choice.requires, events))
            .map(|choice| DialogueChoice {
                label: ctx.expand(&choice.label),
                ..choice.clone()
            })
            .collect(),
    }
}

/// Truncate to at most `max` characters on a char boundary.
fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((index, _)) => text[..index].trim_end().to_string(),
        None => text.to_string(),
    }
}

const STUB_MOM: [&str; 3] = [
    "Mm. Tell me more tomorrow, I'm listening, just tired.",
    "You always say that. Eat something first.",
    "I know, sweetheart. I know.",
];

const STUB_FRIEND: [&str; 3] = [
    "ha. classic you.",
    "wait, really? tell me everything tomorrow",
    "ok but have you eaten anything today",
];

/// Deterministic canned reply for a persona, keyed on the message and day so
/// repeated sessions replay identically.
fn persona_stub(persona: &str, player_text: &str, ctx: &DialogueContext) -> String {
    let pool: &[&str] = if persona == "mom" { &STUB_MOM } else { &STUB_FRIEND };
    let key = player_text.len() as u32 + ctx.day + persona.len() as u32;
    pool[(key as usize) % pool.len()].to_string()
}
