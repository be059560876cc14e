//! Versioned save files.
//!
//! One JSON document per save, written at each Sleep transition and read at
//! boot. The version field is checked before anything else; a mismatch is
//! an error rather than a silent migration.

use crate::flags::PersistentFlags;
use crate::stats::{PlayerStats, Relationships};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// Current save format version. Bump when the layout changes.
pub const SAVE_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("save file io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("save file is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("save version {found} does not match expected {expected}")]
    VersionMismatch { found: u32, expected: u32 },
}

/// Everything needed to resume a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedGame {
    pub version: u32,
    /// Unix seconds at write time.
    pub saved_at: u64,
    pub day: u32,
    pub stats: PlayerStats,
    pub relationships: Relationships,
    pub flags: PersistentFlags,
}

impl SavedGame {
    pub fn new(
        day: u32,
        stats: PlayerStats,
        relationships: Relationships,
        flags: PersistentFlags,
    ) -> Self {
        Self {
            version: SAVE_VERSION,
            saved_at: unix_now(),
            day,
            stats,
            relationships,
            flags,
        }
    }

    pub async fn save(&self, path: impl AsRef<Path>) -> Result<(), PersistError> {
        let json = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }

    pub async fn load(path: impl AsRef<Path>) -> Result<Self, PersistError> {
        let content = tokio::fs::read_to_string(path).await?;
        let saved: SavedGame = serde_json::from_str(&content)?;
        if saved.version != SAVE_VERSION {
            return Err(PersistError::VersionMismatch {
                found: saved.version,
                expected: SAVE_VERSION,
            });
        }
        Ok(saved)
    }

    /// Read just the header fields without validating the full document.
    /// Useful for save pickers.
    pub async fn peek(path: impl AsRef<Path>) -> Result<SaveMetadata, PersistError> {
        let content = tokio::fs::read_to_string(path).await?;
        let metadata: SaveMetadata = serde_json::from_str(&content)?;
        Ok(metadata)
    }
}

/// Header fields common to every save version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveMetadata {
    pub version: u32,
    pub saved_at: u64,
    pub day: u32,
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
