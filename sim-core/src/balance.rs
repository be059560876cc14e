//! Balance and settings configuration.
//!
//! Everything tunable lives in JSON files loaded once at boot and cached
//! for the rest of the session: `balance.json` for numbers,
//! `dialogue/bank.json` for the node graph, `ai/settings.json` for the
//! generation backend. A missing or malformed file is fatal at startup;
//! it is the only fatal error category in the system. Every struct also
//! carries playable defaults so tests run without files on disk.

use crate::day::DaySegment;
use crate::dialogue::bank::DialogueBank;
use localai::BackendSettings;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from loading configuration. Fatal at boot.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing config file: {0}")]
    Missing(PathBuf),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("malformed config {path}: {source}")]
    Malformed {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Stat-system tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StatTuning {
    /// Hunger below this compounds mood losses.
    pub hunger_threshold: i32,
    /// Multiplier applied to negative mood deltas while starving.
    pub hunger_mood_factor: f32,
    /// Score assigned to a friend on first contact.
    pub default_relationship: i32,
    /// XP needed to clear level 1.
    pub xp_level_base: u32,
    /// Additional XP needed per level beyond the first.
    pub xp_level_growth: u32,
}

impl Default for StatTuning {
    fn default() -> Self {
        Self {
            hunger_threshold: 20,
            hunger_mood_factor: 1.5,
            default_relationship: 50,
            xp_level_base: 100,
            xp_level_growth: 0,
        }
    }
}

impl StatTuning {
    /// XP required to move past the given level.
    pub fn xp_threshold(&self, level: u32) -> u32 {
        self.xp_level_base + self.xp_level_growth * level.saturating_sub(1)
    }
}

/// One day segment's real-time window.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentTuning {
    pub duration_secs: f32,
    pub skippable: bool,
}

impl Default for SegmentTuning {
    fn default() -> Self {
        Self {
            duration_secs: 60.0,
            skippable: true,
        }
    }
}

/// Per-segment windows plus the early-exit floors.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DayTuning {
    pub dawn: SegmentTuning,
    pub commute: SegmentTuning,
    pub morning: SegmentTuning,
    pub afternoon: SegmentTuning,
    pub evening: SegmentTuning,
    pub night: SegmentTuning,
    pub sleep: SegmentTuning,
    /// Mood at or below this during afternoon/evening forces rest.
    pub mood_floor: i32,
    /// Energy at or below this during afternoon/evening forces rest.
    pub energy_floor: i32,
}

impl Default for DayTuning {
    fn default() -> Self {
        Self {
            dawn: SegmentTuning {
                duration_secs: 45.0,
                skippable: true,
            },
            commute: SegmentTuning {
                duration_secs: 30.0,
                skippable: true,
            },
            morning: SegmentTuning {
                duration_secs: 120.0,
                skippable: false,
            },
            afternoon: SegmentTuning {
                duration_secs: 90.0,
                skippable: true,
            },
            evening: SegmentTuning {
                duration_secs: 60.0,
                skippable: true,
            },
            night: SegmentTuning {
                duration_secs: 60.0,
                skippable: false,
            },
            sleep: SegmentTuning {
                duration_secs: 5.0,
                skippable: true,
            },
            mood_floor: 15,
            energy_floor: 5,
        }
    }
}

impl DayTuning {
    pub fn segment(&self, segment: DaySegment) -> &SegmentTuning {
        match segment {
            DaySegment::Dawn => &self.dawn,
            DaySegment::Commute => &self.commute,
            DaySegment::Morning => &self.morning,
            DaySegment::Afternoon => &self.afternoon,
            DaySegment::Evening => &self.evening,
            DaySegment::Night => &self.night,
            DaySegment::Sleep => &self.sleep,
        }
    }
}

/// Overnight recovery applied when a new day starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SleepTuning {
    pub energy_restore: i32,
    pub mood_bonus: i32,
    pub hunger_decay: i32,
}

impl Default for SleepTuning {
    fn default() -> Self {
        Self {
            energy_restore: 30,
            mood_bonus: 5,
            hunger_decay: -8,
        }
    }
}

/// Shared minigame difficulty scaling: timing windows are multiplied by a
/// factor interpolated between these bounds from current energy and mood.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MinigameTuning {
    pub window_scale_min: f32,
    pub window_scale_max: f32,
}

impl Default for MinigameTuning {
    fn default() -> Self {
        Self {
            window_scale_min: 0.8,
            window_scale_max: 1.2,
        }
    }
}

/// Fry-cooking minigame tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FryTuning {
    pub duration_secs: f32,
    pub flips_needed: u32,
    /// Half-width of the "good" flip window around a cue, in seconds.
    pub flip_window: f32,
    /// Fraction of the window that still counts as perfect.
    pub perfect_fraction: f32,
    pub first_cue: f32,
    pub cue_spacing: f32,
    /// Maximum random offset added to each cue.
    pub cue_jitter: f32,
    pub perfect_mood: i32,
    pub perfect_hunger: i32,
    pub good_mood: i32,
    pub good_hunger: i32,
    pub miss_mood: i32,
    pub success_mood: i32,
    pub success_hunger: i32,
    pub success_energy: i32,
    pub fail_mood: i32,
    pub fail_energy: i32,
}

impl Default for FryTuning {
    fn default() -> Self {
        Self {
            duration_secs: 45.0,
            flips_needed: 3,
            flip_window: 1.0,
            perfect_fraction: 0.35,
            first_cue: 5.0,
            cue_spacing: 6.0,
            cue_jitter: 1.0,
            perfect_mood: 4,
            perfect_hunger: 8,
            good_mood: 2,
            good_hunger: 4,
            miss_mood: -2,
            success_mood: 8,
            success_hunger: 12,
            success_energy: -5,
            fail_mood: -6,
            fail_energy: -8,
        }
    }
}

/// Hallway-dodge minigame tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HallwayTuning {
    pub duration_secs: f32,
    pub obstacles: u32,
    pub dodge_window: f32,
    pub perfect_fraction: f32,
    pub first_cue: f32,
    pub cue_spacing: f32,
    pub cue_jitter: f32,
    /// Collisions allowed while still counting as a clean run.
    pub allowed_hits: u32,
    pub hit_mood: i32,
    pub hit_energy: i32,
    pub clean_mood: i32,
}

impl Default for HallwayTuning {
    fn default() -> Self {
        Self {
            duration_secs: 24.0,
            obstacles: 6,
            dodge_window: 0.6,
            perfect_fraction: 0.4,
            first_cue: 2.0,
            cue_spacing: 3.5,
            cue_jitter: 0.6,
            allowed_hits: 1,
            hit_mood: -2,
            hit_energy: -3,
            clean_mood: 5,
        }
    }
}

/// German quiz tuning and reward curve.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QuizTuning {
    pub questions: usize,
    pub pass_mood: i32,
    pub pass_xp: u32,
    /// Multipliers applied to the pass rewards on a partial result.
    pub partial_mood_factor: f32,
    pub partial_xp_factor: f32,
    pub fail_mood: i32,
    pub wrong_answer_mood: i32,
}

impl Default for QuizTuning {
    fn default() -> Self {
        Self {
            questions: 4,
            pass_mood: 10,
            pass_xp: 45,
            partial_mood_factor: 0.6,
            partial_xp_factor: 0.5,
            fail_mood: -6,
            wrong_answer_mood: -3,
        }
    }
}

/// Vending-machine snack economics.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VendingTuning {
    pub cost_cents: i64,
    pub hunger: i32,
    pub mood: i32,
}

impl Default for VendingTuning {
    fn default() -> Self {
        Self {
            cost_cents: 150,
            hunger: 15,
            mood: 2,
        }
    }
}

/// Narrative event thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EventTuning {
    /// Mom relationship at or above this can unlock the drunk night mode.
    pub mom_drunk_threshold: i32,
    /// Friends at or below this leave messages on read.
    pub friend_ignore_threshold: i32,
}

impl Default for EventTuning {
    fn default() -> Self {
        Self {
            mom_drunk_threshold: 70,
            friend_ignore_threshold: 25,
        }
    }
}

/// The full balance file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BalanceConfig {
    pub stats: StatTuning,
    pub day: DayTuning,
    pub sleep: SleepTuning,
    pub minigames: MinigameTuning,
    pub fry: FryTuning,
    pub hallway: HallwayTuning,
    pub quiz: QuizTuning,
    pub vending: VendingTuning,
    pub events: EventTuning,
}

/// AI settings: backend connection plus the engine-side output policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    #[serde(flatten)]
    pub backend: BackendSettings,
    /// Persona id to system-prompt text.
    pub personas: HashMap<String, String>,
    /// Substrings that force substitution of the canned line.
    pub denylist: Vec<String>,
    /// Hard cap on reply length after sanitization.
    pub max_reply_chars: usize,
    /// How many recent exchanges are included in the prompt.
    pub recent_window: usize,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            backend: BackendSettings::default(),
            personas: HashMap::new(),
            denylist: Vec::new(),
            max_reply_chars: 240,
            recent_window: 8,
            temperature: 0.2,
            max_tokens: 120,
        }
    }
}

/// All configuration, loaded once at boot and cached.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    pub balance: BalanceConfig,
    pub ai: AiConfig,
    pub bank: DialogueBank,
}

impl ConfigStore {
    /// Load from a data directory:
    /// `balance.json`, `ai/settings.json`, `dialogue/bank.json`.
    pub fn load(data_dir: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let data_dir = data_dir.as_ref();
        let balance = read_json(&data_dir.join("balance.json"))?;
        let ai = read_json(&data_dir.join("ai").join("settings.json"))?;
        let bank = read_json(&data_dir.join("dialogue").join("bank.json"))?;
        Ok(Self { balance, ai, bank })
    }

    /// Built-in defaults with the bundled dialogue bank. No files needed.
    pub fn builtin() -> Self {
        Self {
            balance: BalanceConfig::default(),
            ai: AiConfig::default(),
            bank: DialogueBank::builtin(),
        }
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::Missing(path.to_path_buf()));
    }
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| ConfigError::Malformed {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_contract_numbers() {
        let tuning = StatTuning::default();
        assert_eq!(tuning.hunger_threshold, 20);
        assert_eq!(tuning.hunger_mood_factor, 1.5);
        assert_eq!(tuning.xp_threshold(1), 100);
        assert_eq!(tuning.xp_threshold(5), 100);
    }

    #[test]
    fn test_xp_growth_curve() {
        let tuning = StatTuning {
            xp_level_base: 100,
            xp_level_growth: 25,
            ..StatTuning::default()
        };
        assert_eq!(tuning.xp_threshold(1), 100);
        assert_eq!(tuning.xp_threshold(3), 150);
    }

    #[test]
    fn test_balance_partial_json_fills_defaults() {
        let balance: BalanceConfig =
            serde_json::from_str(r#"{"fry": {"flips_needed": 5}}"#).unwrap();
        assert_eq!(balance.fry.flips_needed, 5);
        assert_eq!(balance.fry.flip_window, 1.0);
        assert_eq!(balance.quiz.pass_xp, 45);
    }

    #[test]
    fn test_ai_config_flattens_backend() {
        let config: AiConfig = serde_json::from_str(
            r#"{"enabled": true, "provider": "koboldcpp", "max_reply_chars": 120}"#,
        )
        .unwrap();
        assert!(config.backend.enabled);
        assert_eq!(config.max_reply_chars, 120);
        assert_eq!(config.recent_window, 8);
    }

    #[test]
    fn test_missing_file_is_fatal() {
        let err = ConfigStore::load("/definitely/not/a/dir").unwrap_err();
        assert!(matches!(err, ConfigError::Missing(_)));
    }

    #[test]
    fn test_load_bundled_data_dir() {
        let dir = concat!(env!("CARGO_MANIFEST_DIR"), "/../data");
        let store = ConfigStore::load(dir).unwrap();
        assert!(!store.bank.is_empty());
        assert_eq!(store.balance.vending.cost_cents, 150);
        assert!(!store.ai.backend.enabled);
        assert!(store.ai.personas.contains_key("mom"));
    }

    #[test]
    fn test_segment_lookup() {
        let day = DayTuning::default();
        assert!(!day.segment(crate::day::DaySegment::Night).skippable);
        assert!(day.segment(crate::day::DaySegment::Dawn).skippable);
    }
}
