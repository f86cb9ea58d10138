use std::collections::BTreeSet;
use std::sync::Arc;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::core::config::Config;
use crate::core::error::GenerationError;
use crate::core::locale::{self, render};
use crate::core::model::{
    words_per_section, GeneratedBook, LeafPosition, Outline, ProgressSnapshot, ProgressState,
    RunStage,
};
use crate::core::params::GenerationParameters;
use crate::services::llm::LlmClient;
use crate::services::outline::OutlineGenerator;
use crate::services::references::ReferenceConsolidator;
use crate::services::section::{SectionRequest, SectionWriter};
use crate::utils::text::count_words;

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub include_references: bool,
    pub reference_limit: Option<usize>,
}

impl From<&Config> for RunOptions {
    fn from(config: &Config) -> Self {
        Self {
            include_references: config.include_references,
            reference_limit: config.reference_limit,
        }
    }
}

/// A confirmed (or confirmable) outline and the accumulator built from it.
#[derive(Debug, Clone)]
struct PreparedRun {
    topic: String,
    params: GenerationParameters,
    outline: Outline,
    book: GeneratedBook,
}

#[derive(Debug)]
enum RunState {
    Idle,
    OutlineGenerating,
    OutlineReady(Box<PreparedRun>),
    SectionsGenerating,
    Complete {
        run: Box<PreparedRun>,
        book: Arc<GeneratedBook>,
    },
}

impl RunState {
    fn stage(&self) -> RunStage {
        match self {
            RunState::Idle => RunStage::Idle,
            RunState::OutlineGenerating => RunStage::OutlineGenerating,
            RunState::OutlineReady(_) => RunStage::OutlineReady,
            RunState::SectionsGenerating => RunStage::SectionsGenerating,
            RunState::Complete { .. } => RunStage::Complete,
        }
    }
}

/// Drives outline generation and the sequential section run.
///
/// Every transition takes `&mut self`, so at most one run is active per
/// manager. Observers follow along through [`WorkflowManager::subscribe`].
pub struct WorkflowManager {
    llm: Box<dyn LlmClient>,
    options: RunOptions,
    state: RunState,
    last_error: Option<String>,
    progress_tx: watch::Sender<ProgressSnapshot>,
    cancel: CancellationToken,
}

impl WorkflowManager {
    pub fn new(config: &Config, llm: Box<dyn LlmClient>) -> Self {
        Self::with_options(RunOptions::from(config), llm)
    }

    pub fn with_options(options: RunOptions, llm: Box<dyn LlmClient>) -> Self {
        let (progress_tx, _) = watch::channel(ProgressSnapshot::default());
        Self {
            llm,
            options,
            state: RunState::Idle,
            last_error: None,
            progress_tx,
            cancel: CancellationToken::new(),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<ProgressSnapshot> {
        self.progress_tx.subscribe()
    }

    /// Token for the next (or current) section run. Cancelling it stops the
    /// run before the next section starts or while a section is in flight.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn stage(&self) -> RunStage {
        self.state.stage()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn outline(&self) -> Option<&Outline> {
        match &self.state {
            RunState::OutlineReady(run) | RunState::Complete { run, .. } => Some(&run.outline),
            _ => None,
        }
    }

    /// The finished book, or the partial one left by a failed run.
    pub fn book(&self) -> Option<&GeneratedBook> {
        match &self.state {
            RunState::OutlineReady(run) => Some(&run.book),
            RunState::Complete { book, .. } => Some(book),
            _ => None,
        }
    }

    /// Idle -> OutlineGenerating -> OutlineReady, or back to Idle on failure.
    pub async fn generate_outline(
        &mut self,
        topic: &str,
        params: GenerationParameters,
    ) -> Result<&Outline, GenerationError> {
        if !matches!(self.state, RunState::Idle) {
            return Err(GenerationError::InvalidState {
                action: "generate an outline",
                state: self.stage().describe(),
            });
        }

        let strings = locale::strings(params.language);
        let checked = if topic.trim().is_empty() {
            Err(GenerationError::Validation(strings.err_empty_topic.to_string()))
        } else {
            params.validate()
        };
        if let Err(e) = checked {
            self.fail(&e);
            return Err(e);
        }

        self.last_error = None;
        self.transition(RunState::OutlineGenerating);
        self.publish(
            &ProgressState {
                task: strings.task_outline.to_string(),
                ..Default::default()
            },
            0.0,
            None,
        );

        let result = OutlineGenerator::new(self.llm.as_ref())
            .generate(topic, &params)
            .await;

        match result {
            Ok(outline) => {
                log::info!(
                    "Outline ready: {:?}, {} chapters, {} sections",
                    outline.title,
                    outline.chapters.len(),
                    outline.total_sections()
                );
                let book = GeneratedBook::skeleton(&outline, params.language);
                let progress = ProgressState {
                    total: outline.total_sections(),
                    ..Default::default()
                };
                self.transition(RunState::OutlineReady(Box::new(PreparedRun {
                    topic: topic.trim().to_string(),
                    params,
                    outline,
                    book,
                })));
                let skeleton = self.book().cloned();
                self.publish(&progress, 0.0, skeleton.as_ref());
                self.outline().ok_or(GenerationError::InvalidState {
                    action: "read the outline",
                    state: RunStage::Idle.describe(),
                })
            }
            Err(e) => {
                self.transition(RunState::Idle);
                self.fail(&e);
                self.publish_as(RunStage::Error, &ProgressState::default(), 0.0, None);
                Err(e)
            }
        }
    }

    /// OutlineReady -> Idle, dropping the outline.
    pub fn discard_outline(&mut self) -> Result<(), GenerationError> {
        if !matches!(self.state, RunState::OutlineReady(_)) {
            return Err(GenerationError::InvalidState {
                action: "discard the outline",
                state: self.stage().describe(),
            });
        }
        self.reset();
        Ok(())
    }

    /// Back to Idle from anywhere, forgetting outline, book and error.
    pub fn reset(&mut self) {
        self.transition(RunState::Idle);
        self.last_error = None;
        self.publish(&ProgressState::default(), 0.0, None);
    }

    /// OutlineReady -> SectionsGenerating -> Complete.
    ///
    /// Leaves are written strictly one after another. Any failure or
    /// cancellation stops the run and returns to OutlineReady, keeping the
    /// sections written so far in [`WorkflowManager::book`].
    pub async fn generate_book(&mut self) -> Result<Arc<GeneratedBook>, GenerationError> {
        let mut run = match std::mem::replace(&mut self.state, RunState::SectionsGenerating) {
            RunState::OutlineReady(run) => run,
            other => {
                let stage = other.stage();
                self.state = other;
                return Err(GenerationError::InvalidState {
                    action: "generate the book",
                    state: stage.describe(),
                });
            }
        };
        log::info!("State: {:?} -> {:?}", RunStage::OutlineReady, RunStage::SectionsGenerating);
        self.last_error = None;

        let cancel = self.cancel.clone();
        let outcome = self.write_sections(&mut run, &cancel).await;
        // A used token is spent; the next run gets a fresh one.
        if cancel.is_cancelled() {
            self.cancel = CancellationToken::new();
        }

        match outcome {
            Ok(progress) => {
                let book = Arc::new(run.book.clone());
                self.transition(RunState::Complete {
                    run,
                    book: book.clone(),
                });
                self.publish(&progress, 100.0, Some(&book));
                log::info!("Book complete: {} words", progress.word_count);
                Ok(book)
            }
            Err((e, progress)) => {
                let partial = run.book.clone();
                self.transition(RunState::OutlineReady(run));
                self.fail(&e);
                self.publish_as(RunStage::Error, &progress, progress.percentage(), Some(&partial));
                Err(e)
            }
        }
    }

    async fn write_sections(
        &self,
        run: &mut PreparedRun,
        cancel: &CancellationToken,
    ) -> Result<ProgressState, (GenerationError, ProgressState)> {
        let lang = run.params.language;
        let strings = locale::strings(lang);
        let total = run.outline.total_sections();
        let words = words_per_section(run.params.target_words, total);
        let chapter_count = run.outline.chapters.len().to_string();

        run.book = GeneratedBook::skeleton(&run.outline, lang);
        let mut progress = ProgressState {
            total,
            ..Default::default()
        };
        log::info!("Writing {} sections at ~{} words each", total, words);
        self.publish(&progress, 0.0, Some(&run.book));

        for pos in run.outline.leaves() {
            let Some(section_title) = run.outline.leaf_title(pos) else {
                continue;
            };
            let (chapter_title, task) = match pos {
                LeafPosition::Introduction => (
                    strings.introduction,
                    render(strings.task_introduction, &[("title", section_title)]),
                ),
                LeafPosition::Section { chapter, .. } => (
                    run.outline.chapters[chapter].title.as_str(),
                    render(
                        strings.task_section,
                        &[
                            ("chapter", &(chapter + 1).to_string()),
                            ("chapters", &chapter_count),
                            ("title", section_title),
                        ],
                    ),
                ),
                LeafPosition::Conclusion => (
                    strings.conclusion,
                    render(strings.task_conclusion, &[("title", section_title)]),
                ),
            };
            progress.task = task;
            self.publish(&progress, progress.percentage(), Some(&run.book));

            if cancel.is_cancelled() {
                log::warn!("Run cancelled before {:?}", section_title);
                return Err((GenerationError::Cancelled, progress));
            }

            let request = SectionRequest {
                book_title: &run.outline.title,
                chapter_title,
                section_title,
                params: &run.params,
                words,
                include_references: self.options.include_references,
            };
            let writer = SectionWriter::new(self.llm.as_ref());
            let result = tokio::select! {
                _ = cancel.cancelled() => Err(GenerationError::Cancelled),
                r = writer.write_section(&request) => r,
            };

            let content = match result {
                Ok(content) => content,
                Err(e) => return Err((e, progress)),
            };

            progress.word_count += count_words(&content.text);
            progress.completed += 1;
            if let Some(slot) = run.book.leaf_mut(pos) {
                *slot = content;
            }
            self.publish(&progress, progress.percentage(), Some(&run.book));
        }

        run.book.references = self.collect_references(run, cancel, &mut progress).await;
        progress.task = strings.task_done.to_string();
        Ok(progress)
    }

    /// Consolidated bibliography for the finished sections. Never fails: on
    /// error the per-section reference lists are merged instead.
    async fn collect_references(
        &self,
        run: &PreparedRun,
        cancel: &CancellationToken,
        progress: &mut ProgressState,
    ) -> Vec<String> {
        let fallback = || -> Vec<String> {
            run.book
                .sections()
                .flat_map(|s| s.references.iter().cloned())
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect()
        };

        if !self.options.include_references {
            return fallback();
        }

        let strings = locale::strings(run.params.language);
        progress.task = strings.task_references.to_string();
        self.publish(progress, 100.0, Some(&run.book));

        let sources = run.book.grounding_sources();
        let consolidator = ReferenceConsolidator::new(self.llm.as_ref());
        let result = tokio::select! {
            _ = cancel.cancelled() => Err(GenerationError::Cancelled),
            r = consolidator.consolidate(
                &sources,
                &run.topic,
                run.params.language,
                self.options.reference_limit,
            ) => r,
        };

        match result {
            Ok(refs) if !refs.is_empty() => refs,
            Ok(_) => fallback(),
            Err(e) => {
                log::warn!("Reference consolidation skipped: {} ({})", e, e.detail().unwrap_or("-"));
                fallback()
            }
        }
    }

    fn transition(&mut self, next: RunState) {
        let from = self.state.stage();
        let to = next.stage();
        if from != to {
            log::info!("State: {:?} -> {:?}", from, to);
        }
        self.state = next;
    }

    fn fail(&mut self, e: &GenerationError) {
        log::error!("{} ({})", e, e.detail().unwrap_or("-"));
        self.last_error = Some(e.to_string());
    }

    fn publish(&self, progress: &ProgressState, percentage: f64, book: Option<&GeneratedBook>) {
        self.publish_as(self.state.stage(), progress, percentage, book);
    }

    fn publish_as(
        &self,
        stage: RunStage,
        progress: &ProgressState,
        percentage: f64,
        book: Option<&GeneratedBook>,
    ) {
        self.progress_tx.send_replace(ProgressSnapshot {
            stage,
            progress: progress.clone(),
            percentage,
            book: book.map(|b| Arc::new(b.clone())),
            error: self.last_error.clone(),
        });
    }
}
