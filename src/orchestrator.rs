//! Coloring book asset orchestration
//!
//! Builds the ordered task list (cover, then pages 1..N), runs it strictly one
//! call at a time, and pauses between calls to stay under provider rate
//! limits. Any failed call aborts the run; partial results are dropped.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::book::{GenerationRequest, GenerationResult};
use crate::error::GenerateError;
use crate::prompts;
use crate::provider::ImageGenerator;

/// Default pause between image calls
pub const DEFAULT_PACING: Duration = Duration::from_millis(1000);

/// Delay strategy between consecutive image calls
#[async_trait]
pub trait Pacer: Send + Sync {
    async fn pause(&self);
}

/// Sleeps on the tokio timer
#[derive(Debug, Clone, Copy)]
pub struct TokioPacer {
    interval: Duration,
}

impl TokioPacer {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl Default for TokioPacer {
    fn default() -> Self {
        Self::new(DEFAULT_PACING)
    }
}

#[async_trait]
impl Pacer for TokioPacer {
    async fn pause(&self) {
        if !self.interval.is_zero() {
            tokio::time::sleep(self.interval).await;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    Cover,
    /// Zero-based page index
    Page(usize),
}

/// One image call in the run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageTask {
    pub kind: TaskKind,
    pub prompt: String,
}

impl ImageTask {
    fn progress_message(&self, page_count: usize) -> String {
        match self.kind {
            TaskKind::Cover => "Creating the cover page...".to_string(),
            TaskKind::Page(index) => format!("Drawing page {} of {}...", index + 1, page_count),
        }
    }
}

/// Ordered task list for a request: the cover first, then every page
pub fn plan(request: &GenerationRequest) -> Vec<ImageTask> {
    let page_count = request.page_count as usize;
    let mut tasks = Vec::with_capacity(page_count + 1);
    tasks.push(ImageTask {
        kind: TaskKind::Cover,
        prompt: prompts::cover_prompt(&request.theme, &request.name),
    });
    tasks.extend((0..page_count).map(|index| ImageTask {
        kind: TaskKind::Page(index),
        prompt: prompts::page_prompt(&request.theme, index + 1),
    }));
    tasks
}

pub struct Orchestrator {
    generator: Arc<dyn ImageGenerator>,
    pacer: Arc<dyn Pacer>,
}

impl Orchestrator {
    pub fn new(generator: Arc<dyn ImageGenerator>, pacer: Arc<dyn Pacer>) -> Self {
        Self { generator, pacer }
    }

    /// Generate the cover and pages for `request`.
    ///
    /// `on_progress` receives a message and a percentage before each call.
    pub async fn generate<F>(
        &self,
        request: &GenerationRequest,
        mut on_progress: F,
    ) -> Result<GenerationResult, GenerateError>
    where
        F: FnMut(&str, f64) + Send,
    {
        request.validate()?;

        let tasks = plan(request);
        let total = tasks.len();
        let page_count = request.page_count as usize;
        info!(
            "Generating coloring book: theme=\"{}\" pages={}",
            request.theme, page_count
        );

        let mut cover_image = None;
        let mut pages = Vec::with_capacity(page_count);

        for (step, task) in tasks.iter().enumerate() {
            let percentage = (step + 1) as f64 / total as f64 * 100.0;
            on_progress(&task.progress_message(page_count), percentage);

            let image = self
                .generator
                .generate_image(&task.prompt)
                .await
                .map_err(|e| {
                    warn!("Image step {} of {} failed: {}", step + 1, total, e);
                    e
                })?;

            match task.kind {
                TaskKind::Cover => cover_image = Some(image),
                TaskKind::Page(_) => pages.push(image),
            }
            debug!("Image step {} of {} complete", step + 1, total);

            if step + 1 < total {
                self.pacer.pause().await;
            }
        }

        // plan() always starts with the cover
        let cover_image = cover_image.unwrap_or_default();

        info!("Coloring book assets ready: {} pages", pages.len());
        Ok(GenerationResult { cover_image, pages })
    }
}
