use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::core::params::GenerationParameters;
use crate::services::llm::LlmConfig;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_output")]
    pub output_folder: String,

    #[serde(default)]
    pub unattended: bool,

    #[serde(default = "default_include_references")]
    pub include_references: bool,

    #[serde(default)]
    pub reference_limit: Option<usize>,

    pub llm: LlmConfig,

    #[serde(default)]
    pub defaults: BookDefaults,
}

/// Initial answers for the setup prompts, and the whole run when unattended.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct BookDefaults {
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub source_file: Option<String>,
    #[serde(flatten)]
    pub params: GenerationParameters,
}

fn default_output() -> String {
    "output".to_string()
}
fn default_include_references() -> bool {
    true
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new("config.yml"))
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            anyhow::bail!("{} not found. Please create one.", path.display());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let mut config = Self::parse(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        config.apply_env();
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(serde_yaml_ng::from_str(content)?)
    }

    /// Fills an empty Gemini key from `GEMINI_API_KEY` or `API_KEY`.
    fn apply_env(&mut self) {
        if let Some(gemini) = self.llm.gemini.as_mut() {
            if gemini.api_key.is_empty() {
                if let Some(key) = ["GEMINI_API_KEY", "API_KEY"]
                    .iter()
                    .find_map(|k| std::env::var(k).ok().filter(|v| !v.is_empty()))
                {
                    log::debug!("Using Gemini API key from environment");
                    gemini.api_key = key;
                }
            }
        }
    }

    pub fn ensure_directories(&self) -> Result<()> {
        fs::create_dir_all(&self.output_folder)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::params::{OutputLanguage, PublicationType};

    #[test]
    fn test_minimal_config_uses_defaults() -> Result<()> {
        let config = Config::parse("llm:\n  provider: ollama\n  ollama:\n    base_url: http://localhost:11434\n    model: llama3\n")?;
        assert_eq!(config.output_folder, "output");
        assert!(!config.unattended);
        assert!(config.include_references);
        assert_eq!(config.reference_limit, None);
        assert_eq!(config.defaults.params, GenerationParameters::default());
        assert!(config.defaults.topic.is_none());
        Ok(())
    }

    #[test]
    fn test_full_config() -> Result<()> {
        let yaml = r#"
output_folder: books
unattended: true
include_references: false
reference_limit: 40
llm:
  provider: gemini
  gemini:
    api_key: abc
defaults:
  topic: Renewable energy policy
  publication_type: technical
  chapter_count: 5
  target_words: 10000
  language: en
"#;
        let config = Config::parse(yaml)?;
        assert_eq!(config.output_folder, "books");
        assert!(config.unattended);
        assert!(!config.include_references);
        assert_eq!(config.reference_limit, Some(40));
        let gemini = config.llm.gemini.as_ref().unwrap();
        assert_eq!(gemini.api_key, "abc");
        assert_eq!(gemini.model, "gemini-2.5-flash");
        assert_eq!(config.defaults.topic.as_deref(), Some("Renewable energy policy"));
        assert_eq!(config.defaults.params.publication_type, PublicationType::Technical);
        assert_eq!(config.defaults.params.chapter_count, 5);
        assert_eq!(config.defaults.params.language, OutputLanguage::En);
        Ok(())
    }

    #[test]
    fn test_load_from_disk() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("config.yml");
        assert!(Config::load_from(&path).is_err());

        fs::write(&path, "llm:\n  provider: openai\n  openai:\n    api_key: k\n    model: gpt\n")?;
        let loaded = Config::load_from(&path)?;
        assert_eq!(loaded.llm.provider, "openai");
        assert_eq!(loaded.output_folder, "output");
        Ok(())
    }
}
