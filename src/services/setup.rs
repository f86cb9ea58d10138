use crate::core::config::{BookDefaults, Config};
use crate::core::io::Storage;
use crate::core::params::{
    Audience, GenerationParameters, OutputLanguage, PublicationType, Tone, MAX_CHAPTERS,
    MAX_TARGET_WORDS, MIN_CHAPTERS, MIN_TARGET_WORDS,
};
use anyhow::{anyhow, Context, Result};
use inquire::{CustomType, Select, Text};

/// Topic and parameters for one run.
#[derive(Debug, Clone)]
pub struct BookRequest {
    pub topic: String,
    pub params: GenerationParameters,
}

/// Collects the next book request, from the prompts or, when the config is
/// unattended, straight from `defaults`.
pub async fn run_setup(config: &Config, storage: &dyn Storage) -> Result<BookRequest> {
    let defaults = &config.defaults;
    let mut request = if config.unattended {
        unattended_request(defaults)?
    } else {
        prompt_request(defaults)?
    };

    if let Some(path) = source_file(config, defaults)? {
        let material = storage
            .read_to_string(&path)
            .await
            .with_context(|| format!("Failed to load source material from {}", path))?;
        log::info!("Loaded {} characters of source material from {}", material.len(), path);
        request.params.source_material = Some(material);
    }

    request.params.validate()?;
    Ok(request)
}

fn unattended_request(defaults: &BookDefaults) -> Result<BookRequest> {
    let topic = defaults
        .topic
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| anyhow!("unattended mode needs defaults.topic in config.yml"))?;
    Ok(BookRequest {
        topic: topic.to_string(),
        params: defaults.params.clone(),
    })
}

fn source_file(config: &Config, defaults: &BookDefaults) -> Result<Option<String>> {
    if config.unattended {
        return Ok(defaults.source_file.clone().filter(|p| !p.trim().is_empty()));
    }
    let mut prompt = Text::new("Source material file (optional):");
    if let Some(path) = defaults.source_file.as_deref() {
        prompt = prompt.with_default(path);
    }
    let path = prompt.prompt()?;
    let path = path.trim();
    Ok((!path.is_empty()).then(|| path.to_string()))
}

fn prompt_request(defaults: &BookDefaults) -> Result<BookRequest> {
    let base = &defaults.params;

    let language = select(
        "Output language:",
        &OutputLanguage::ALL,
        base.language,
        |l| match l {
            OutputLanguage::Es => "Español".to_string(),
            OutputLanguage::En => "English".to_string(),
        },
    )?;

    let mut topic_prompt = Text::new("Topic or article:");
    if let Some(topic) = defaults.topic.as_deref() {
        topic_prompt = topic_prompt.with_default(topic);
    }
    let topic = topic_prompt.prompt()?.trim().to_string();
    if topic.is_empty() {
        return Err(anyhow!("A topic is required"));
    }

    let publication_type = select("Publication type:", &PublicationType::ALL, base.publication_type, |p| {
        p.label(language).to_string()
    })?;
    let tone = select("Tone:", &Tone::ALL, base.tone, |t| t.label(language).to_string())?;
    let audience = select("Audience:", &Audience::ALL, base.audience, |a| {
        a.label(language).to_string()
    })?;

    let chapter_count = CustomType::<u32>::new(&format!("Chapters ({}-{}):", MIN_CHAPTERS, MAX_CHAPTERS))
        .with_default(base.chapter_count)
        .with_error_message("Please enter a whole number")
        .with_validator(|n: &u32| {
            Ok(if (MIN_CHAPTERS..=MAX_CHAPTERS).contains(n) {
                inquire::validator::Validation::Valid
            } else {
                inquire::validator::Validation::Invalid("Out of range".into())
            })
        })
        .prompt()?;

    let target_words = CustomType::<u32>::new(&format!(
        "Target words ({}-{}):",
        MIN_TARGET_WORDS, MAX_TARGET_WORDS
    ))
    .with_default(base.target_words)
    .with_error_message("Please enter a whole number")
    .with_validator(|n: &u32| {
        Ok(if (MIN_TARGET_WORDS..=MAX_TARGET_WORDS).contains(n) {
            inquire::validator::Validation::Valid
        } else {
            inquire::validator::Validation::Invalid("Out of range".into())
        })
    })
    .prompt()?;

    Ok(BookRequest {
        topic,
        params: GenerationParameters {
            publication_type,
            tone,
            audience,
            chapter_count,
            target_words,
            language,
            source_material: None,
        },
    })
}

/// Select prompt over `options`, starting on `current`.
fn select<T, F>(prompt: &str, options: &[T], current: T, label: F) -> Result<T>
where
    T: Copy + PartialEq,
    F: Fn(&T) -> String,
{
    let labels: Vec<String> = options.iter().map(&label).collect();
    let start = options.iter().position(|o| *o == current).unwrap_or(0);
    let choice = Select::new(prompt, labels.clone())
        .with_starting_cursor(start)
        .prompt()?;

    labels
        .iter()
        .position(|l| *l == choice)
        .map(|i| options[i])
        .ok_or_else(|| anyhow!("Unknown option: {}", choice))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::io::NativeStorage;

    fn unattended_config(yaml_defaults: &str) -> Result<Config> {
        let yaml = format!(
            "unattended: true\nllm:\n  provider: ollama\n  ollama:\n    base_url: http://localhost:11434\n    model: llama3\ndefaults:\n{}",
            yaml_defaults
        );
        Config::parse(&yaml)
    }

    #[tokio::test]
    async fn test_unattended_uses_defaults() -> Result<()> {
        let config = unattended_config("  topic: Renewable energy policy\n  tone: informal\n  chapter_count: 6\n")?;
        let request = run_setup(&config, &NativeStorage::new()).await?;
        assert_eq!(request.topic, "Renewable energy policy");
        assert_eq!(request.params.tone, Tone::Informal);
        assert_eq!(request.params.chapter_count, 6);
        assert!(request.params.source_material.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_unattended_reads_source_file() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "Feed-in tariffs were introduced in 1990.")?;

        let config = unattended_config(&format!(
            "  topic: Renewable energy policy\n  source_file: {}\n",
            path.display()
        ))?;
        let request = run_setup(&config, &NativeStorage::new()).await?;
        assert_eq!(
            request.params.source_material.as_deref(),
            Some("Feed-in tariffs were introduced in 1990.")
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_unattended_requires_topic() -> Result<()> {
        let config = unattended_config("  topic: \"  \"\n")?;
        assert!(run_setup(&config, &NativeStorage::new()).await.is_err());
        Ok(())
    }

    #[tokio::test]
    async fn test_unattended_rejects_out_of_range_defaults() -> Result<()> {
        let config = unattended_config("  topic: Solar\n  chapter_count: 40\n")?;
        assert!(run_setup(&config, &NativeStorage::new()).await.is_err());
        Ok(())
    }
}
