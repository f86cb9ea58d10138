use serde::{Deserialize, Serialize};

use crate::core::error::GenerationError;
use crate::core::locale::{self, format_number, render};

pub const MIN_CHAPTERS: u32 = 5;
pub const MAX_CHAPTERS: u32 = 20;
pub const MIN_TARGET_WORDS: u32 = 10_000;
pub const MAX_TARGET_WORDS: u32 = 60_000;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum PublicationType {
    #[default]
    Academic,
    General,
    Technical,
    Tutorial,
    CaseStudy,
    Workbook,
}

impl PublicationType {
    pub const ALL: [PublicationType; 6] = [
        PublicationType::Academic,
        PublicationType::General,
        PublicationType::Technical,
        PublicationType::Tutorial,
        PublicationType::CaseStudy,
        PublicationType::Workbook,
    ];

    pub fn label(&self, lang: OutputLanguage) -> &'static str {
        match (self, lang) {
            (PublicationType::Academic, OutputLanguage::Es) => "académica",
            (PublicationType::Academic, OutputLanguage::En) => "academic",
            (PublicationType::General, OutputLanguage::Es) => "difusión general",
            (PublicationType::General, OutputLanguage::En) => "general dissemination",
            (PublicationType::Technical, OutputLanguage::Es) => "técnica",
            (PublicationType::Technical, OutputLanguage::En) => "technical",
            (PublicationType::Tutorial, _) => "tutorial",
            (PublicationType::CaseStudy, OutputLanguage::Es) => "libro de casos",
            (PublicationType::CaseStudy, OutputLanguage::En) => "case study book",
            (PublicationType::Workbook, OutputLanguage::Es) => "cuaderno de ejercicios",
            (PublicationType::Workbook, OutputLanguage::En) => "workbook",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Tone {
    #[default]
    Formal,
    Professional,
    Informal,
}

impl Tone {
    pub const ALL: [Tone; 3] = [Tone::Formal, Tone::Professional, Tone::Informal];

    pub fn label(&self, lang: OutputLanguage) -> &'static str {
        match (self, lang) {
            (Tone::Formal, _) => "formal",
            (Tone::Professional, OutputLanguage::Es) => "profesional",
            (Tone::Professional, OutputLanguage::En) => "professional",
            (Tone::Informal, _) => "informal",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Audience {
    #[default]
    Professionals,
    General,
    Adults,
    Youth,
}

impl Audience {
    pub const ALL: [Audience; 4] = [
        Audience::Professionals,
        Audience::General,
        Audience::Adults,
        Audience::Youth,
    ];

    pub fn label(&self, lang: OutputLanguage) -> &'static str {
        match (self, lang) {
            (Audience::Professionals, OutputLanguage::Es) => "profesionales",
            (Audience::Professionals, OutputLanguage::En) => "professionals",
            (Audience::General, _) => "general",
            (Audience::Adults, OutputLanguage::Es) => "adultos",
            (Audience::Adults, OutputLanguage::En) => "adults",
            (Audience::Youth, OutputLanguage::Es) => "jóvenes",
            (Audience::Youth, OutputLanguage::En) => "young people",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputLanguage {
    #[default]
    Es,
    En,
}

impl OutputLanguage {
    pub const ALL: [OutputLanguage; 2] = [OutputLanguage::Es, OutputLanguage::En];

    pub fn code(&self) -> &'static str {
        match self {
            OutputLanguage::Es => "es",
            OutputLanguage::En => "en",
        }
    }
}

/// Everything the pipeline needs to know about the book besides its topic.
/// Frozen for the duration of a run: the orchestrator keeps its own copy.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct GenerationParameters {
    #[serde(default)]
    pub publication_type: PublicationType,
    #[serde(default)]
    pub tone: Tone,
    #[serde(default)]
    pub audience: Audience,
    #[serde(default = "default_chapter_count")]
    pub chapter_count: u32,
    #[serde(default = "default_target_words")]
    pub target_words: u32,
    #[serde(default)]
    pub language: OutputLanguage,
    #[serde(default)]
    pub source_material: Option<String>,
}

fn default_chapter_count() -> u32 {
    7
}
fn default_target_words() -> u32 {
    25_000
}

impl Default for GenerationParameters {
    fn default() -> Self {
        Self {
            publication_type: PublicationType::default(),
            tone: Tone::default(),
            audience: Audience::default(),
            chapter_count: default_chapter_count(),
            target_words: default_target_words(),
            language: OutputLanguage::default(),
            source_material: None,
        }
    }
}

impl GenerationParameters {
    /// Bounds check, reported in the output language.
    pub fn validate(&self) -> Result<(), GenerationError> {
        let s = locale::strings(self.language);
        if !(MIN_CHAPTERS..=MAX_CHAPTERS).contains(&self.chapter_count) {
            return Err(GenerationError::Validation(render(
                s.err_chapter_count,
                &[
                    ("min", &MIN_CHAPTERS.to_string()),
                    ("max", &MAX_CHAPTERS.to_string()),
                    ("value", &self.chapter_count.to_string()),
                ],
            )));
        }
        if !(MIN_TARGET_WORDS..=MAX_TARGET_WORDS).contains(&self.target_words) {
            return Err(GenerationError::Validation(render(
                s.err_target_words,
                &[
                    ("min", &format_number(MIN_TARGET_WORDS, self.language)),
                    ("max", &format_number(MAX_TARGET_WORDS, self.language)),
                    ("value", &format_number(self.target_words, self.language)),
                ],
            )));
        }
        Ok(())
    }

    /// Base material with surrounding whitespace removed; blank counts as absent.
    pub fn source_material(&self) -> Option<&str> {
        self.source_material
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}
