use anyhow::anyhow;

use crate::core::error::GenerationError;
use crate::core::locale::{self, render};
use crate::core::model::SectionContent;
use crate::core::params::{GenerationParameters, OutputLanguage, PublicationType};
use crate::services::llm::{LlmClient, LlmReply};
use crate::utils::text::{split_on_sentinel, strip_leading_title};

/// Everything needed to write one leaf of the book.
#[derive(Debug, Clone)]
pub struct SectionRequest<'r> {
    pub book_title: &'r str,
    pub chapter_title: &'r str,
    pub section_title: &'r str,
    pub params: &'r GenerationParameters,
    pub words: u32,
    pub include_references: bool,
}

pub struct SectionWriter<'a> {
    llm: &'a dyn LlmClient,
}

impl<'a> SectionWriter<'a> {
    pub fn new(llm: &'a dyn LlmClient) -> Self {
        Self { llm }
    }

    pub async fn write_section(&self, req: &SectionRequest<'_>) -> Result<SectionContent, GenerationError> {
        let strings = locale::strings(req.params.language);
        let prompt = build_prompt(req);
        log::debug!("Requesting section {:?} ({} words)", req.section_title, req.words);

        let reply = if req.include_references {
            self.llm.chat_grounded(strings.section_system, &prompt).await
        } else {
            self.llm
                .chat(strings.section_system, &prompt)
                .await
                .map(|text| LlmReply { text, sources: Vec::new() })
        };

        let section = reply.and_then(|reply| {
            let section = parse_section(req.section_title, reply);
            if section.text.is_empty() {
                return Err(anyhow!("Service returned no text"));
            }
            Ok(section)
        });

        section.map_err(|e| {
            log::error!("Error generating content for section {:?}: {:#}", req.section_title, e);
            GenerationError::Section {
                title: req.section_title.to_string(),
                message: render(strings.err_section, &[("title", req.section_title)]),
                detail: format!("{:#}", e),
            }
        })
    }
}

/// Turns raw service output into a section. A trailing reference block
/// behind either language's sentinel is moved out of the body.
pub fn parse_section(title: &str, reply: LlmReply) -> SectionContent {
    let sentinels: Vec<&str> = OutputLanguage::ALL
        .iter()
        .map(|l| locale::strings(*l).reference_sentinel)
        .collect();
    let (body, references) = split_on_sentinel(&reply.text, &sentinels);

    SectionContent {
        title: title.to_string(),
        text: strip_leading_title(body, title),
        references,
        sources: reply.sources,
    }
}

pub fn build_prompt(req: &SectionRequest<'_>) -> String {
    let lang = req.params.language;
    let s = locale::strings(lang);
    let publication = req.params.publication_type.label(lang);
    let audience = req.params.audience.label(lang);
    let words = req.words.to_string();

    let mut prompt = format!(
        "{}\n\n{}\n{} \"{}\"\n{} {}\n{} {}\n{} {}\n",
        s.section_task,
        s.book_context,
        s.context_topic,
        req.book_title,
        s.param_type,
        publication,
        s.param_tone,
        req.params.tone.label(lang),
        s.param_audience,
        audience,
    );
    if let Some(material) = req.params.source_material() {
        prompt.push_str(&format!("\n{}\n{}\n", s.base_material, material));
    }
    prompt.push_str(&format!(
        "\n{}\n{} \"{}\"\n{} \"{}\"\n\n{}\n{}\n{}\n",
        s.section_to_write,
        s.context_chapter,
        req.chapter_title,
        s.context_section,
        req.section_title,
        s.writing_instructions,
        render(s.section_word_count, &[("words", &words)]),
        render(s.section_style, &[("publication", publication), ("audience", audience)]),
    ));
    if req.include_references {
        let search = if req.params.publication_type == PublicationType::Academic {
            s.search_scholar
        } else {
            s.search_web
        };
        prompt.push_str(search);
        prompt.push('\n');
        prompt.push_str(s.citations);
        prompt.push('\n');
    }
    prompt.push_str(s.dialogue);
    prompt.push('\n');
    prompt.push_str(s.no_heading);
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::GroundingSource;
    use crate::services::llm::mock::{text, CallKind, ScriptedLlm};

    fn request<'r>(params: &'r GenerationParameters, include_references: bool) -> SectionRequest<'r> {
        SectionRequest {
            book_title: "Renewable Energy Policy",
            chapter_title: "Market Instruments",
            section_title: "Feed-in Tariffs",
            params,
            words: 476,
            include_references,
        }
    }

    #[tokio::test]
    async fn test_grounded_section_keeps_sources_and_strips_title() {
        let llm = ScriptedLlm::new(|_| {
            Ok(LlmReply {
                text: "## Feed-in Tariffs\n\nGermany pioneered tariffs (Smith, 2020).".to_string(),
                sources: vec![GroundingSource {
                    uri: Some("https://example.org/fit".to_string()),
                    title: Some("example.org".to_string()),
                }],
            })
        });
        let calls = llm.calls.clone();
        let params = GenerationParameters {
            language: OutputLanguage::En,
            ..Default::default()
        };

        let section = SectionWriter::new(&llm)
            .write_section(&request(&params, true))
            .await
            .unwrap();

        assert_eq!(section.title, "Feed-in Tariffs");
        assert_eq!(section.text, "Germany pioneered tariffs (Smith, 2020).");
        assert_eq!(section.sources.len(), 1);
        assert!(section.references.is_empty());

        let calls = calls.lock().unwrap();
        assert_eq!(calls[0].kind, CallKind::Grounded);
        assert!(calls[0].user.contains("Google Scholar"));
        assert!(calls[0].user.contains("approximately 476 words"));
    }

    #[tokio::test]
    async fn test_plain_section_when_references_disabled() {
        let llm = ScriptedLlm::new(|_| text("Body only."));
        let calls = llm.calls.clone();
        let params = GenerationParameters::default();

        let section = SectionWriter::new(&llm)
            .write_section(&request(&params, false))
            .await
            .unwrap();

        assert_eq!(section.text, "Body only.");
        let calls = calls.lock().unwrap();
        assert_eq!(calls[0].kind, CallKind::Chat);
        assert!(!calls[0].user.contains("Google"));
        assert!(!calls[0].user.contains("APA"));
    }

    #[tokio::test]
    async fn test_failure_names_the_section() {
        let llm = ScriptedLlm::new(|_| Err(anyhow!("timeout")));
        let params = GenerationParameters::default();

        let err = SectionWriter::new(&llm)
            .write_section(&request(&params, true))
            .await
            .unwrap_err();

        match &err {
            GenerationError::Section { title, detail, .. } => {
                assert_eq!(title, "Feed-in Tariffs");
                assert!(detail.contains("timeout"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(
            err.to_string(),
            "No se pudo generar el contenido para la sección \"Feed-in Tariffs\"."
        );
    }

    #[tokio::test]
    async fn test_empty_text_is_a_failure() {
        let llm = ScriptedLlm::new(|_| text("  # Feed-in Tariffs \n  "));
        let params = GenerationParameters::default();
        let err = SectionWriter::new(&llm)
            .write_section(&request(&params, false))
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::Section { .. }));
    }

    #[test]
    fn test_parse_section_moves_sentinel_tail_into_references() {
        let section = parse_section(
            "Costs",
            LlmReply {
                text: "Costs fell.\n###REFERENCIAS###\nLópez, M. (2021). Energía.\n".to_string(),
                sources: Vec::new(),
            },
        );
        assert_eq!(section.text, "Costs fell.");
        assert_eq!(section.references, vec!["López, M. (2021). Energía."]);
    }

    #[test]
    fn test_parse_section_without_sentinel_has_no_references() {
        let section = parse_section("Costs", LlmReply { text: "costs\nCosts fell.".to_string(), sources: Vec::new() });
        assert_eq!(section.text, "Costs fell.");
        assert!(section.references.is_empty());
    }

    #[test]
    fn test_prompt_uses_web_search_for_non_academic() {
        let params = GenerationParameters {
            publication_type: PublicationType::Tutorial,
            source_material: Some("Base notes".to_string()),
            ..Default::default()
        };
        let prompt = build_prompt(&request(&params, true));
        assert!(prompt.contains("búsqueda de Google"));
        assert!(!prompt.contains("Google Académico"));
        assert!(prompt.contains("Base notes"));
        assert!(prompt.contains("\"Market Instruments\""));
        assert!(prompt.contains("\"Feed-in Tariffs\""));
        assert!(prompt.contains("guion largo"));
    }
}
