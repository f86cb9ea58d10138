use std::collections::HashSet;

use crate::core::error::GenerationError;
use crate::core::locale::{self, render};
use crate::core::model::GroundingSource;
use crate::core::params::OutputLanguage;
use crate::services::llm::LlmClient;
use crate::utils::text::strip_code_blocks;

/// Dedup key of a source: its normalized URI, else its title.
fn source_key(source: &GroundingSource) -> Option<String> {
    let uri = source.uri.as_deref().map(str::trim).filter(|u| !u.is_empty());
    if let Some(uri) = uri {
        let normalized = url::Url::parse(uri)
            .map(|u| u.to_string())
            .unwrap_or_else(|_| uri.to_string());
        return Some(format!("uri:{}", normalized));
    }
    source
        .title
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(|t| format!("title:{}", t))
}

/// First occurrence wins; entries with neither URI nor title are dropped.
pub fn dedup_sources(sources: &[GroundingSource]) -> Vec<GroundingSource> {
    let mut seen = HashSet::new();
    sources
        .iter()
        .filter(|s| match source_key(s) {
            Some(key) => seen.insert(key),
            None => false,
        })
        .cloned()
        .collect()
}

pub struct ReferenceConsolidator<'a> {
    llm: &'a dyn LlmClient,
}

impl<'a> ReferenceConsolidator<'a> {
    pub fn new(llm: &'a dyn LlmClient) -> Self {
        Self { llm }
    }

    /// One formatted, alphabetized citation line per distinct source.
    /// Returns an empty list without calling the service when nothing survives dedup.
    pub async fn consolidate(
        &self,
        sources: &[GroundingSource],
        book_topic: &str,
        lang: OutputLanguage,
        limit: Option<usize>,
    ) -> Result<Vec<String>, GenerationError> {
        let mut unique = dedup_sources(sources);
        if let Some(limit) = limit {
            unique.truncate(limit);
        }
        if unique.is_empty() {
            log::debug!("No grounding sources to consolidate");
            return Ok(Vec::new());
        }

        let strings = locale::strings(lang);
        let prompt = build_prompt(&unique, book_topic, lang);
        log::debug!("Consolidating {} sources ({} collected)", unique.len(), sources.len());

        match self.llm.chat(strings.references_system, &prompt).await {
            Ok(raw) => Ok(parse_reference_lines(&raw)),
            Err(e) => {
                log::error!("Error consolidating references: {:#}", e);
                Err(GenerationError::References {
                    message: strings.err_references.to_string(),
                    detail: format!("{:#}", e),
                })
            }
        }
    }
}

pub fn build_prompt(sources: &[GroundingSource], book_topic: &str, lang: OutputLanguage) -> String {
    let s = locale::strings(lang);
    let mut prompt = render(s.references_task, &[("topic", book_topic)]);
    prompt.push_str("\n\n");
    for source in sources {
        let title = source.title.as_deref().unwrap_or("");
        match source.uri.as_deref() {
            Some(uri) if !title.is_empty() => prompt.push_str(&format!("- {} ({})\n", title, uri)),
            Some(uri) => prompt.push_str(&format!("- {}\n", uri)),
            None => prompt.push_str(&format!("- {}\n", title)),
        }
    }
    prompt.push('\n');
    prompt.push_str(s.references_rules);
    prompt
}

pub fn parse_reference_lines(raw: &str) -> Vec<String> {
    strip_code_blocks(raw)
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::llm::mock::{text, ScriptedLlm};
    use anyhow::anyhow;

    fn src(uri: Option<&str>, title: Option<&str>) -> GroundingSource {
        GroundingSource {
            uri: uri.map(str::to_string),
            title: title.map(str::to_string),
        }
    }

    #[test]
    fn test_dedup_first_occurrence_wins() {
        let sources = vec![
            src(Some("https://iea.org/a"), Some("IEA A")),
            src(Some("https://irena.org/b"), Some("IRENA")),
            src(Some("https://iea.org/a"), Some("IEA duplicate")),
            src(None, None),
            src(Some("  "), Some("")),
        ];
        let unique = dedup_sources(&sources);
        assert_eq!(unique.len(), 2);
        assert_eq!(unique[0].title.as_deref(), Some("IEA A"));
        assert_eq!(unique[1].title.as_deref(), Some("IRENA"));
    }

    #[test]
    fn test_dedup_normalizes_uris() {
        let sources = vec![
            src(Some("https://IEA.org/a"), Some("upper")),
            src(Some("https://iea.org/a"), Some("lower")),
        ];
        assert_eq!(dedup_sources(&sources).len(), 1);
    }

    #[test]
    fn test_dedup_is_idempotent() {
        let sources = vec![
            src(Some("https://a.org"), None),
            src(None, Some("Untitled report")),
            src(Some("https://a.org"), Some("again")),
            src(None, Some("Untitled report")),
        ];
        let once = dedup_sources(&sources);
        let twice = dedup_sources(&once);
        assert_eq!(once, twice);
        assert_eq!(once.len(), 2);
    }

    #[tokio::test]
    async fn test_empty_sources_skip_the_service() {
        let llm = ScriptedLlm::new(|_| text("should not be used"));
        let calls = llm.calls.clone();

        let refs = ReferenceConsolidator::new(&llm)
            .consolidate(&[src(None, None)], "Topic", OutputLanguage::En, None)
            .await
            .unwrap();

        assert!(refs.is_empty());
        assert!(calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_consolidate_lists_sources_and_splits_lines() {
        let llm = ScriptedLlm::new(|_| text("Adams, B. (2019). Wind.\n\n  Zeller, C. (2022). Solar.  \n"));
        let calls = llm.calls.clone();
        let sources = vec![
            src(Some("https://a.org/wind"), Some("a.org")),
            src(Some("https://z.org/solar"), Some("z.org")),
            src(Some("https://a.org/wind"), Some("a.org")),
        ];

        let refs = ReferenceConsolidator::new(&llm)
            .consolidate(&sources, "Renewable energy policy", OutputLanguage::En, None)
            .await
            .unwrap();

        assert_eq!(refs, vec!["Adams, B. (2019). Wind.", "Zeller, C. (2022). Solar."]);
        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].user.matches("https://a.org/wind").count(), 1);
        assert!(calls[0].user.contains("Renewable energy policy"));
        assert!(calls[0].user.contains("alphabetically"));
    }

    #[tokio::test]
    async fn test_limit_applies_after_dedup() {
        let llm = ScriptedLlm::new(|_| text("ref"));
        let calls = llm.calls.clone();
        let sources = vec![
            src(Some("https://one.org"), None),
            src(Some("https://one.org"), None),
            src(Some("https://two.org"), None),
            src(Some("https://three.org"), None),
        ];

        ReferenceConsolidator::new(&llm)
            .consolidate(&sources, "Topic", OutputLanguage::Es, Some(2))
            .await
            .unwrap();

        let calls = calls.lock().unwrap();
        assert!(calls[0].user.contains("https://one.org"));
        assert!(calls[0].user.contains("https://two.org"));
        assert!(!calls[0].user.contains("https://three.org"));
    }

    #[tokio::test]
    async fn test_service_failure_maps_to_reference_error() {
        let llm = ScriptedLlm::new(|_| Err(anyhow!("quota exceeded")));
        let err = ReferenceConsolidator::new(&llm)
            .consolidate(&[src(Some("https://a.org"), None)], "Topic", OutputLanguage::En, None)
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::References { .. }));
        assert_eq!(err.detail(), Some("quota exceeded"));
    }
}
