use anyhow::{anyhow, Context, Result};
use serde_json::{json, Value};

use crate::core::error::GenerationError;
use crate::core::locale::{self, format_number, render};
use crate::core::model::Outline;
use crate::core::params::GenerationParameters;
use crate::services::llm::LlmClient;
use crate::utils::text::strip_code_blocks;

/// JSON Schema the outline response must satisfy.
pub fn outline_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "title": { "type": "string", "description": "Main title of the book." },
            "introduction": {
                "type": "object",
                "properties": { "title": { "type": "string" } },
                "required": ["title"]
            },
            "chapters": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "title": { "type": "string" },
                        "sections": { "type": "array", "items": { "type": "string" } }
                    },
                    "required": ["title", "sections"]
                }
            },
            "conclusion": {
                "type": "object",
                "properties": { "title": { "type": "string" } },
                "required": ["title"]
            }
        },
        "required": ["title", "introduction", "chapters", "conclusion"]
    })
}

pub struct OutlineGenerator<'a> {
    llm: &'a dyn LlmClient,
}

impl<'a> OutlineGenerator<'a> {
    pub fn new(llm: &'a dyn LlmClient) -> Self {
        Self { llm }
    }

    pub async fn generate(
        &self,
        topic: &str,
        params: &GenerationParameters,
    ) -> Result<Outline, GenerationError> {
        let strings = locale::strings(params.language);
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(GenerationError::Validation(strings.err_empty_topic.to_string()));
        }
        params.validate()?;

        let prompt = build_prompt(topic, params);
        log::debug!("Requesting outline ({} chapters, {} words)", params.chapter_count, params.target_words);

        let outcome = async {
            let raw = self
                .llm
                .chat_json(strings.outline_system, &prompt, &outline_schema())
                .await?;
            parse_outline(&raw, params.chapter_count as usize)
        }
        .await;

        outcome.map_err(|e| {
            log::error!("Error generating book outline: {:#}", e);
            GenerationError::Outline {
                message: strings.err_outline.to_string(),
                detail: format!("{:#}", e),
            }
        })
    }
}

pub fn build_prompt(topic: &str, params: &GenerationParameters) -> String {
    let lang = params.language;
    let s = locale::strings(lang);
    let words = format_number(params.target_words, lang);
    let chapters = params.chapter_count.to_string();

    let mut prompt = String::new();
    prompt.push_str(s.outline_task);
    prompt.push('\n');
    if let Some(material) = params.source_material() {
        prompt.push_str(&format!("\n{}\n{}\n", s.base_material, material));
    }
    prompt.push_str(&format!(
        "\n{}\n{} {}\n{} {}\n{} {}\n{} {}\n\n{}\n{}\n{}\n{}\n{}\n{}",
        s.publication_params,
        s.param_type,
        params.publication_type.label(lang),
        s.param_tone,
        params.tone.label(lang),
        s.param_audience,
        params.audience.label(lang),
        s.param_topic,
        topic,
        s.structure_requirements,
        render(s.outline_word_count, &[("words", &words)]),
        render(s.outline_chapters, &[("chapters", &chapters)]),
        s.outline_sections,
        s.outline_casing,
        s.outline_json_shape,
    ));
    prompt
}

/// Parses and normalizes the service's outline payload.
///
/// Blank section titles are dropped and surplus chapters are cut so the
/// outline holds exactly `expected_chapters`; fewer chapters is an error.
pub fn parse_outline(raw: &str, expected_chapters: usize) -> Result<Outline> {
    let clean = strip_code_blocks(raw);
    let mut outline: Outline = serde_json::from_str(&clean)
        .with_context(|| format!("Failed to parse outline JSON: {}", clean))?;

    outline.title = outline.title.trim().to_string();
    outline.introduction.title = outline.introduction.title.trim().to_string();
    outline.conclusion.title = outline.conclusion.title.trim().to_string();
    if outline.title.is_empty() || outline.introduction.title.is_empty() || outline.conclusion.title.is_empty() {
        return Err(anyhow!("Outline is missing a title"));
    }

    for chapter in &mut outline.chapters {
        chapter.title = chapter.title.trim().to_string();
        if chapter.title.is_empty() {
            return Err(anyhow!("Outline contains a chapter without title"));
        }
        chapter.sections = chapter
            .sections
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
    }

    if outline.chapters.len() < expected_chapters {
        return Err(anyhow!(
            "Outline has {} chapters, expected {}",
            outline.chapters.len(),
            expected_chapters
        ));
    }
    if outline.chapters.len() > expected_chapters {
        log::warn!(
            "Outline has {} chapters, keeping the first {}",
            outline.chapters.len(),
            expected_chapters
        );
        outline.chapters.truncate(expected_chapters);
    }

    Ok(outline)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::params::{OutputLanguage, PublicationType};
    use crate::services::llm::mock::{text, CallKind, ScriptedLlm};

    fn outline_json(chapters: usize) -> String {
        let chapters: Vec<Value> = (0..chapters)
            .map(|i| json!({ "title": format!("Chapter {}", i + 1), "sections": ["A", "B", "C"] }))
            .collect();
        json!({
            "title": "Renewable Energy Policy",
            "introduction": { "title": "Introduction" },
            "chapters": chapters,
            "conclusion": { "title": "Conclusion" }
        })
        .to_string()
    }

    fn params(chapters: u32, lang: OutputLanguage) -> GenerationParameters {
        GenerationParameters {
            chapter_count: chapters,
            target_words: 10_000,
            language: lang,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_generate_outline_with_requested_chapters() {
        let body = outline_json(5);
        let llm = ScriptedLlm::new(move |_| text(&body));
        let calls = llm.calls.clone();

        let outline = OutlineGenerator::new(&llm)
            .generate("Renewable energy policy", &params(5, OutputLanguage::En))
            .await
            .unwrap();

        assert_eq!(outline.chapters.len(), 5);
        assert_eq!(outline.total_sections(), 5 * 3 + 2);

        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].kind, CallKind::Json);
        assert!(calls[0].user.contains("Renewable energy policy"));
        assert!(calls[0].user.contains("10,000 words"));
        assert!(calls[0].user.contains("5 main chapters"));
    }

    #[tokio::test]
    async fn test_blank_topic_fails_before_calling_service() {
        let llm = ScriptedLlm::new(|_| text("{}"));
        let calls = llm.calls.clone();

        let err = OutlineGenerator::new(&llm)
            .generate("   ", &params(5, OutputLanguage::Es))
            .await
            .unwrap_err();

        assert!(matches!(err, GenerationError::Validation(_)));
        assert_eq!(err.to_string(), "Por favor, introduce un tema o un artículo.");
        assert!(calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_service_failure_maps_to_outline_error() {
        let llm = ScriptedLlm::new(|_| Err(anyhow!("HTTP 503")));
        let err = OutlineGenerator::new(&llm)
            .generate("Topic", &params(5, OutputLanguage::En))
            .await
            .unwrap_err();

        match err {
            GenerationError::Outline { message, detail } => {
                assert!(message.starts_with("Could not generate the book outline"));
                assert!(detail.contains("HTTP 503"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_malformed_payload_maps_to_outline_error() {
        let llm = ScriptedLlm::new(|_| text("Here is your outline: title..."));
        let err = OutlineGenerator::new(&llm)
            .generate("Topic", &params(5, OutputLanguage::En))
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::Outline { .. }));
    }

    #[test]
    fn test_parse_outline_strips_fences_and_normalizes() {
        let raw = r#"```json
{"title":" Book ","introduction":{"title":"Intro"},"chapters":[
  {"title":"One","sections":["a"," ","b "]},
  {"title":"Two","sections":["c"]},
  {"title":"Three","sections":["d"]}
],"conclusion":{"title":"End"}}
```"#;
        let outline = parse_outline(raw, 2).unwrap();
        assert_eq!(outline.title, "Book");
        assert_eq!(outline.chapters.len(), 2);
        assert_eq!(outline.chapters[0].sections, vec!["a", "b"]);
    }

    #[test]
    fn test_parse_outline_rejects_missing_fields_and_short_outlines() {
        assert!(parse_outline(r#"{"title":"x","chapters":[]}"#, 0).is_err());
        assert!(parse_outline(&outline_json(4), 5).is_err());
        assert!(parse_outline(&outline_json(5), 5).is_ok());
    }

    #[test]
    fn test_prompt_includes_parameters_and_material() {
        let params = GenerationParameters {
            publication_type: PublicationType::Workbook,
            source_material: Some("Notes on feed-in tariffs".to_string()),
            ..params(7, OutputLanguage::Es)
        };
        let prompt = build_prompt("Política energética", &params);
        assert!(prompt.contains("cuaderno de ejercicios"));
        assert!(prompt.contains("Notes on feed-in tariffs"));
        assert!(prompt.contains("10.000 palabras"));
        assert!(prompt.contains("7 capítulos principales"));
        assert!(prompt.contains("Política energética"));
    }

    #[test]
    fn test_schema_requires_top_level_fields() {
        let schema = outline_schema();
        let required: Vec<&str> = schema["required"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(Value::as_str)
            .collect();
        assert_eq!(required, vec!["title", "introduction", "chapters", "conclusion"]);
    }
}
