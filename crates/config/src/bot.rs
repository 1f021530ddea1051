//! Per-bot configuration
//!
//! Each bot directory carries:
//! - `config.yml` — identity, enablement, retrieval defaults, suggestions
//! - `prompt.yml` — system prompt template under a `prompt:` key
//! - `data/` — knowledge YAML files consumed by the chunker

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::ConfigError;

/// A bot's `config.yml`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    pub bot: BotSettings,
    /// Suggested starter questions shown by the frontend
    #[serde(default)]
    pub suggestions: Vec<String>,
}

/// The `bot:` section of `config.yml`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotSettings {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_personality")]
    pub personality: String,
    #[serde(default)]
    pub rag: RagDefaults,
}

fn default_personality() -> String {
    "friendly".to_string()
}

/// Retrieval defaults for one bot
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RagDefaults {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,
}

fn default_top_k() -> usize {
    5
}

fn default_similarity_threshold() -> f64 {
    0.3
}

impl Default for RagDefaults {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            similarity_threshold: default_similarity_threshold(),
        }
    }
}

/// Load a bot's `config.yml`
pub fn load_bot_config(bots_dir: &Path, bot_id: &str) -> Result<BotConfig, ConfigError> {
    let config_path = bots_dir.join(bot_id).join("config.yml");

    if !config_path.exists() {
        return Err(ConfigError::FileNotFound(config_path.display().to_string()));
    }

    let content = std::fs::read_to_string(&config_path)
        .map_err(|e| ConfigError::ParseError(format!("{}: {}", config_path.display(), e)))?;

    serde_yaml::from_str(&content)
        .map_err(|e| ConfigError::ParseError(format!("{}: {}", config_path.display(), e)))
}

/// System prompt file shape (`prompt.yml`)
#[derive(Debug, Deserialize)]
struct PromptFile {
    prompt: String,
}

/// Load a bot's system prompt template from `prompt.yml`
///
/// The template may contain a `{current_date}` placeholder; substitution
/// happens at generation time, not here.
pub fn load_prompt_template(bots_dir: &Path, bot_id: &str) -> Result<String, ConfigError> {
    let prompt_path = bots_dir.join(bot_id).join("prompt.yml");

    if !prompt_path.exists() {
        return Err(ConfigError::FileNotFound(prompt_path.display().to_string()));
    }

    let content = std::fs::read_to_string(&prompt_path)
        .map_err(|e| ConfigError::ParseError(format!("{}: {}", prompt_path.display(), e)))?;

    let file: PromptFile = serde_yaml::from_str(&content)
        .map_err(|e| ConfigError::ParseError(format!("{}: {}", prompt_path.display(), e)))?;

    if file.prompt.trim().is_empty() {
        return Err(ConfigError::MissingField(format!(
            "prompt in {}",
            prompt_path.display()
        )));
    }

    Ok(file.prompt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write_bot_file(dir: &Path, bot_id: &str, name: &str, content: &str) {
        let bot_dir = dir.join(bot_id);
        std::fs::create_dir_all(&bot_dir).unwrap();
        std::fs::write(bot_dir.join(name), content).unwrap();
    }

    #[test]
    fn test_load_bot_config() {
        let dir = tempdir().unwrap();
        write_bot_file(
            dir.path(),
            "guitar",
            "config.yml",
            r#"
bot:
  id: guitar
  name: Guitar Bot
  enabled: true
  rag:
    top_k: 3
    similarity_threshold: 0.5
suggestions:
  - "What guitars do you own?"
"#,
        );

        let config = load_bot_config(dir.path(), "guitar").unwrap();
        assert_eq!(config.bot.id, "guitar");
        assert!(config.bot.enabled);
        assert_eq!(config.bot.rag.top_k, 3);
        assert_eq!(config.bot.rag.similarity_threshold, 0.5);
        assert_eq!(config.suggestions.len(), 1);
        // Defaulted field
        assert_eq!(config.bot.personality, "friendly");
    }

    #[test]
    fn test_rag_defaults_when_section_absent() {
        let dir = tempdir().unwrap();
        write_bot_file(
            dir.path(),
            "minimal",
            "config.yml",
            "bot:\n  id: minimal\n  enabled: true\n",
        );

        let config = load_bot_config(dir.path(), "minimal").unwrap();
        assert_eq!(config.bot.rag.top_k, 5);
        assert_eq!(config.bot.rag.similarity_threshold, 0.3);
    }

    #[test]
    fn test_missing_config_is_error() {
        let dir = tempdir().unwrap();
        let err = load_bot_config(dir.path(), "ghost").unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound(_)));
    }

    #[test]
    fn test_load_prompt_template() {
        let dir = tempdir().unwrap();
        write_bot_file(
            dir.path(),
            "guitar",
            "prompt.yml",
            "prompt: |\n  You are a helpful assistant. Today is {current_date}.\n",
        );

        let template = load_prompt_template(dir.path(), "guitar").unwrap();
        assert!(template.contains("{current_date}"));
    }

    #[test]
    fn test_missing_prompt_is_error() {
        let dir = tempdir().unwrap();
        write_bot_file(dir.path(), "guitar", "config.yml", "bot:\n  id: guitar\n");
        let err = load_prompt_template(dir.path(), "guitar").unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound(_)));
    }
}
