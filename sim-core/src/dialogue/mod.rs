//! Scripted dialogue with an AI-backed free-text path.
//!
//! Scripted conversations come from a [`bank::DialogueBank`] node graph;
//! free-text chat goes through the [`engine::DialogueEngine`], which either
//! asks a text-generation backend or falls back to deterministic persona
//! stubs. Generation failures never surface as errors.

pub mod bank;
pub mod engine;

pub use bank::{DialogueBank, DialogueChoice, DialogueNode};
pub use engine::{
    DialogueContext, DialogueEngine, DialogueError, DialogueTurn, LineSource, PolicyHit,
    SpokenLine, TextBackend,
};
