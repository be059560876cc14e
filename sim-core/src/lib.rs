//! Day-cycle life-simulation engine.
//!
//! This crate provides:
//! - A fixed day-segment state machine (dawn through sleep)
//! - Bounded player stats with clamp tracking and derived effects
//! - Scripted dialogue with an AI-backed fallback path
//! - Timing-window minigames (fry cooking, hallway dodge, German quiz)
//! - JSON balance configuration and versioned save files
//!
//! # Quick Start
//!
//! ```ignore
//! use sim_core::{ConfigStore, GameSession};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConfigStore::builtin();
//!     let mut session = GameSession::new(config)?;
//!
//!     session.tick(5.0);
//!     let turn = session.talk("mom.neutral")?;
//!     println!("{}", turn.lines.join("\n"));
//!
//!     session.save("save.json").await?;
//!     Ok(())
//! }
//! ```

pub mod balance;
pub mod day;
pub mod dialogue;
pub mod flags;
pub mod headless;
pub mod minigames;
pub mod persist;
pub mod session;
pub mod stats;
pub mod testing;

// Primary public API
pub use balance::{BalanceConfig, ConfigError, ConfigStore};
pub use day::{DayCycleController, DaySegment, DaySummary, SegmentChange};
pub use dialogue::{DialogueContext, DialogueEngine, DialogueError, DialogueTurn, SpokenLine};
pub use flags::EventSystem;
pub use headless::{HeadlessConfig, HeadlessGame};
pub use minigames::{Minigame, MinigameInput, MinigameKind, MinigameOutcome};
pub use session::{GameSession, SessionError};
pub use stats::{PlayerStats, StatDelta, StatStore};
pub use testing::{MockBackend, TestHarness};
