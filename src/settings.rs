//! Runtime settings
//!
//! Stored as JSON next to the score file. Every field has a default, so a
//! partial file only overrides what it names.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::highscores::MAX_HIGH_SCORES;
use crate::sim::spatial::DEFAULT_NODE_CAPACITY;

/// Game settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// How many high scores to keep
    pub top_k: usize,
    /// Where the high score file lives
    pub score_file: String,
    /// Items per quadtree node before it subdivides
    pub quadtree_capacity: usize,
    /// Run seed; `None` picks one from the clock
    pub seed: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            top_k: MAX_HIGH_SCORES,
            score_file: "traffic_scores.dat".to_string(),
            quadtree_capacity: DEFAULT_NODE_CAPACITY,
            seed: None,
        }
    }
}

impl Settings {
    /// Load settings from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        serde_json::from_str(&json).map_err(|source| Error::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load settings, falling back to defaults if the file is missing or bad
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(settings) => {
                log::info!("Loaded settings from {}", path.display());
                settings
            }
            Err(Error::Io { source, .. }) if source.kind() == std::io::ErrorKind::NotFound => {
                log::info!("Using default settings");
                Self::default()
            }
            Err(err) => {
                log::warn!("{err}; using default settings");
                Self::default()
            }
        }
    }

    /// Save settings as pretty JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).map_err(|source| Error::Config {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, json).map_err(|e| Error::io(path, e))?;
        log::info!("Settings saved");
        Ok(())
    }

    /// Seed to use for this run
    pub fn effective_seed(&self) -> u64 {
        self.seed.unwrap_or_else(|| {
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_nanos() as u64)
                .unwrap_or(0)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let settings: Settings = serde_json::from_str(r#"{ "top_k": 5, "seed": 42 }"#).unwrap();
        assert_eq!(settings.top_k, 5);
        assert_eq!(settings.seed, Some(42));
        assert_eq!(settings.quadtree_capacity, DEFAULT_NODE_CAPACITY);
        assert_eq!(settings.score_file, "traffic_scores.dat");
    }

    #[test]
    fn test_world_extent_is_not_configurable() {
        // Older files carried world_width/world_height; they are ignored now
        let settings: Settings =
            serde_json::from_str(r#"{ "world_width": 10.0, "world_height": 10.0 }"#).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_missing_file_falls_back() {
        let settings = Settings::load_or_default(Path::new("no/such/settings.json"));
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_explicit_seed_wins() {
        let settings = Settings {
            seed: Some(7),
            ..Default::default()
        };
        assert_eq!(settings.effective_seed(), 7);
    }
}
