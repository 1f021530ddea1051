//! Bot discovery
//!
//! Scans the bots directory at startup, loads each `config.yml`, and
//! registers the enabled bots. Unreadable or disabled bots are logged
//! and skipped; they never take the whole server down.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::bot::{load_bot_config, BotConfig};

/// Registry of discovered, enabled bots
#[derive(Debug, Default)]
pub struct BotRegistry {
    bots: HashMap<String, BotConfig>,
    bots_dir: PathBuf,
}

impl BotRegistry {
    /// Discover bots under `bots_dir`
    ///
    /// Directories are visited in sorted order. A directory without a
    /// `config.yml` is ignored; a directory whose config fails to parse
    /// is skipped with a warning.
    pub fn discover(bots_dir: impl Into<PathBuf>) -> Self {
        let bots_dir = bots_dir.into();
        let mut bots = HashMap::new();

        let entries = match std::fs::read_dir(&bots_dir) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(
                    path = %bots_dir.display(),
                    error = %e,
                    "Bots directory not readable, starting with no bots"
                );
                return Self { bots, bots_dir };
            }
        };

        let mut dirs: Vec<PathBuf> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_dir())
            .collect();
        dirs.sort();

        for dir in dirs {
            let dir_name = match dir.file_name().and_then(|n| n.to_str()) {
                Some(name) => name.to_string(),
                None => continue,
            };

            if !dir.join("config.yml").exists() {
                continue;
            }

            match load_bot_config(&bots_dir, &dir_name) {
                Ok(config) => {
                    let bot_id = config.bot.id.clone();
                    if config.bot.enabled {
                        tracing::info!(bot_id = %bot_id, "Registered bot");
                        bots.insert(bot_id, config);
                    } else {
                        tracing::info!(bot_id = %bot_id, "Bot disabled, skipping");
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        bot_dir = %dir.display(),
                        error = %e,
                        "Could not read bot config, skipping"
                    );
                }
            }
        }

        Self { bots, bots_dir }
    }

    /// Look up an enabled bot by id
    pub fn get(&self, bot_id: &str) -> Option<&BotConfig> {
        self.bots.get(bot_id)
    }

    /// Ids of all enabled bots, sorted
    pub fn bot_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.bots.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.bots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bots.is_empty()
    }

    /// The directory bots were discovered from
    pub fn bots_dir(&self) -> &Path {
        &self.bots_dir
    }
}
