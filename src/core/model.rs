use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::core::params::OutputLanguage;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct OutlineNode {
    pub title: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct OutlineChapter {
    pub title: String,
    pub sections: Vec<String>,
}

/// Titles-only skeleton of a book, as returned by the outline request.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Outline {
    pub title: String,
    pub introduction: OutlineNode,
    pub chapters: Vec<OutlineChapter>,
    pub conclusion: OutlineNode,
}

/// Where a generated unit of text lands in the book.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeafPosition {
    Introduction,
    Section { chapter: usize, section: usize },
    Conclusion,
}

impl Outline {
    /// Sections of every chapter plus introduction and conclusion.
    pub fn total_sections(&self) -> usize {
        self.chapters.iter().map(|c| c.sections.len()).sum::<usize>() + 2
    }

    /// Leaves in generation order: introduction, each chapter's sections, conclusion.
    pub fn leaves(&self) -> Vec<LeafPosition> {
        let mut leaves = Vec::with_capacity(self.total_sections());
        leaves.push(LeafPosition::Introduction);
        for (chapter, c) in self.chapters.iter().enumerate() {
            for section in 0..c.sections.len() {
                leaves.push(LeafPosition::Section { chapter, section });
            }
        }
        leaves.push(LeafPosition::Conclusion);
        leaves
    }

    pub fn leaf_title(&self, pos: LeafPosition) -> Option<&str> {
        match pos {
            LeafPosition::Introduction => Some(&self.introduction.title),
            LeafPosition::Section { chapter, section } => self
                .chapters
                .get(chapter)
                .and_then(|c| c.sections.get(section))
                .map(String::as_str),
            LeafPosition::Conclusion => Some(&self.conclusion.title),
        }
    }
}

/// Per-section word budget: `round(target / total)`, 0 when there is nothing to write.
pub fn words_per_section(target_words: u32, total_sections: usize) -> u32 {
    if total_sections == 0 {
        return 0;
    }
    (target_words as f64 / total_sections as f64).round() as u32
}

/// Citation metadata returned by web-grounded generation.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
pub struct GroundingSource {
    pub uri: Option<String>,
    pub title: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct SectionContent {
    pub title: String,
    pub text: String,
    #[serde(default)]
    pub references: Vec<String>,
    #[serde(default)]
    pub sources: Vec<GroundingSource>,
}

impl SectionContent {
    pub fn pending(title: &str) -> Self {
        Self {
            title: title.to_string(),
            ..Default::default()
        }
    }

    pub fn is_pending(&self) -> bool {
        self.text.is_empty()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct GeneratedChapter {
    pub title: String,
    pub sections: Vec<SectionContent>,
}

/// The accumulator. Starts as an outline-shaped skeleton of pending sections
/// and is filled leaf by leaf in [`Outline::leaves`] order.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct GeneratedBook {
    pub title: String,
    pub introduction: SectionContent,
    pub chapters: Vec<GeneratedChapter>,
    pub conclusion: SectionContent,
    #[serde(default)]
    pub references: Vec<String>,
    pub language: OutputLanguage,
}

impl GeneratedBook {
    pub fn skeleton(outline: &Outline, language: OutputLanguage) -> Self {
        Self {
            title: outline.title.clone(),
            introduction: SectionContent::pending(&outline.introduction.title),
            chapters: outline
                .chapters
                .iter()
                .map(|c| GeneratedChapter {
                    title: c.title.clone(),
                    sections: c.sections.iter().map(|s| SectionContent::pending(s)).collect(),
                })
                .collect(),
            conclusion: SectionContent::pending(&outline.conclusion.title),
            references: Vec::new(),
            language,
        }
    }

    pub fn leaf_mut(&mut self, pos: LeafPosition) -> Option<&mut SectionContent> {
        match pos {
            LeafPosition::Introduction => Some(&mut self.introduction),
            LeafPosition::Section { chapter, section } => self
                .chapters
                .get_mut(chapter)
                .and_then(|c| c.sections.get_mut(section)),
            LeafPosition::Conclusion => Some(&mut self.conclusion),
        }
    }

    /// All leaves in generation order.
    pub fn sections(&self) -> impl Iterator<Item = &SectionContent> {
        std::iter::once(&self.introduction)
            .chain(self.chapters.iter().flat_map(|c| c.sections.iter()))
            .chain(std::iter::once(&self.conclusion))
    }

    /// Grounding sources of every written leaf, in encounter order (duplicates kept).
    pub fn grounding_sources(&self) -> Vec<GroundingSource> {
        self.sections().flat_map(|s| s.sources.iter().cloned()).collect()
    }

    pub fn word_count(&self) -> usize {
        self.sections()
            .map(|s| crate::utils::text::count_words(&s.text))
            .sum()
    }
}

#[derive(Debug, Serialize, Clone, PartialEq, Default)]
pub struct ProgressState {
    pub completed: usize,
    pub total: usize,
    pub word_count: usize,
    pub task: String,
}

impl ProgressState {
    pub fn percentage(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.completed as f64 / self.total as f64 * 100.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunStage {
    #[default]
    Idle,
    OutlineGenerating,
    OutlineReady,
    SectionsGenerating,
    Complete,
    /// Published with a failed step. By then the manager itself is back in
    /// `Idle` (outline failure) or `OutlineReady` (section failure).
    Error,
}

impl RunStage {
    pub fn describe(&self) -> &'static str {
        match self {
            RunStage::Idle => "idle",
            RunStage::OutlineGenerating => "generating the outline",
            RunStage::OutlineReady => "waiting for outline confirmation",
            RunStage::SectionsGenerating => "writing sections",
            RunStage::Complete => "complete",
            RunStage::Error => "recovering from an error",
        }
    }
}

/// What observers receive after every step. The book is a copy taken at
/// publish time, so later writes never show through.
#[derive(Debug, Clone, Default)]
pub struct ProgressSnapshot {
    pub stage: RunStage,
    pub progress: ProgressState,
    pub percentage: f64,
    pub book: Option<Arc<GeneratedBook>>,
    pub error: Option<String>,
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn sample_outline(sections_per_chapter: &[usize]) -> Outline {
        Outline {
            title: "Renewable Energy Policy".to_string(),
            introduction: OutlineNode {
                title: "Why Policy Matters".to_string(),
            },
            chapters: sections_per_chapter
                .iter()
                .enumerate()
                .map(|(i, n)| OutlineChapter {
                    title: format!("Chapter {}", i + 1),
                    sections: (0..*n).map(|j| format!("Section {}.{}", i + 1, j + 1)).collect(),
                })
                .collect(),
            conclusion: OutlineNode {
                title: "Looking Ahead".to_string(),
            },
        }
    }

    #[test]
    fn test_total_sections_counts_intro_and_conclusion() {
        let outline = sample_outline(&[3, 4, 5, 3, 4]);
        assert_eq!(outline.total_sections(), 19 + 2);
        assert_eq!(outline.leaves().len(), outline.total_sections());
    }

    #[test]
    fn test_leaves_order() {
        let outline = sample_outline(&[2, 1]);
        assert_eq!(
            outline.leaves(),
            vec![
                LeafPosition::Introduction,
                LeafPosition::Section { chapter: 0, section: 0 },
                LeafPosition::Section { chapter: 0, section: 1 },
                LeafPosition::Section { chapter: 1, section: 0 },
                LeafPosition::Conclusion,
            ]
        );
        assert_eq!(
            outline.leaf_title(LeafPosition::Section { chapter: 0, section: 1 }),
            Some("Section 1.2")
        );
        assert_eq!(
            outline.leaf_title(LeafPosition::Section { chapter: 5, section: 0 }),
            None
        );
    }

    #[test]
    fn test_words_per_section_rounds() {
        assert_eq!(words_per_section(10_000, 21), 476);
        assert_eq!(words_per_section(10_000, 16), 625);
        // 25000 / 23 = 1086.95...
        assert_eq!(words_per_section(25_000, 23), 1087);
        assert_eq!(words_per_section(10_000, 0), 0);
    }

    #[test]
    fn test_skeleton_mirrors_outline() {
        let outline = sample_outline(&[3, 2]);
        let book = GeneratedBook::skeleton(&outline, OutputLanguage::En);
        assert_eq!(book.title, outline.title);
        assert_eq!(book.chapters.len(), 2);
        assert_eq!(book.chapters[0].sections.len(), 3);
        assert_eq!(book.chapters[1].sections[1].title, "Section 2.2");
        assert!(book.sections().all(SectionContent::is_pending));
        assert_eq!(book.sections().count(), outline.total_sections());
    }

    #[test]
    fn test_progress_percentage() {
        let mut progress = ProgressState {
            total: 8,
            ..Default::default()
        };
        assert_eq!(progress.percentage(), 0.0);
        progress.completed = 2;
        assert_eq!(progress.percentage(), 25.0);
        progress.completed = 8;
        assert_eq!(progress.percentage(), 100.0);
        assert_eq!(ProgressState::default().percentage(), 0.0);
    }
}
