//! End-to-end coloring book flow: generate, assemble, write files, remember.

use std::path::{Path, PathBuf};

use base64::Engine;
use thiserror::Error;
use tracing::{info, warn};

use crate::book::{GenerationRequest, GenerationResult};
use crate::error::GenerateError;
use crate::history::{Creation, HistoryStore};
use crate::orchestrator::Orchestrator;
use crate::pdf::{self, PdfError};

#[derive(Debug, Error)]
pub enum StudioError {
    #[error(transparent)]
    Generate(#[from] GenerateError),

    #[error(transparent)]
    Pdf(#[from] PdfError),

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Image {index} could not be decoded: {source}")]
    Decode {
        index: usize,
        #[source]
        source: base64::DecodeError,
    },
}

/// Files written for one book
#[derive(Debug, Clone)]
pub struct SavedBook {
    pub pdf_path: PathBuf,
    pub image_paths: Vec<PathBuf>,
    /// New history record, `None` if the request was already remembered or
    /// could not be saved
    pub creation: Option<Creation>,
    pub page_count: usize,
}

pub struct Studio {
    orchestrator: Orchestrator,
    history: HistoryStore,
}

impl Studio {
    pub fn new(orchestrator: Orchestrator, history: HistoryStore) -> Self {
        Self {
            orchestrator,
            history,
        }
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    /// Generate a book and write it to `out_dir`.
    ///
    /// History is only updated once the PDF has been written. Failing to
    /// update it is logged and does not fail the book.
    pub async fn create_book<F>(
        &mut self,
        request: &GenerationRequest,
        out_dir: &Path,
        save_images: bool,
        mut on_progress: F,
    ) -> Result<SavedBook, StudioError>
    where
        F: FnMut(&str, f64) + Send,
    {
        // Validate up front so nothing is reported for a bad request
        request.validate().map_err(GenerateError::from)?;

        on_progress("Warming up the magic crayons...", 0.0);
        let result = self.orchestrator.generate(request, &mut on_progress).await?;

        on_progress("Assembling your coloring book PDF...", 100.0);
        let pdf_bytes = pdf::assemble(&result.cover_image, &result.pages)?;

        std::fs::create_dir_all(out_dir).map_err(|source| StudioError::Write {
            path: out_dir.to_path_buf(),
            source,
        })?;

        let pdf_path = out_dir.join(request.pdf_file_name());
        write_file(&pdf_path, &pdf_bytes)?;
        info!("Coloring book written to {:?}", pdf_path);

        let image_paths = if save_images {
            write_images(request, &result, out_dir)?
        } else {
            Vec::new()
        };

        let creation = match self
            .history
            .save(&request.theme, &request.name, request.page_count)
        {
            Ok(creation) => creation,
            Err(e) => {
                warn!("Book saved but history was not updated: {}", e);
                None
            }
        };

        Ok(SavedBook {
            pdf_path,
            image_paths,
            creation,
            page_count: result.pages.len(),
        })
    }
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<(), StudioError> {
    std::fs::write(path, bytes).map_err(|source| StudioError::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// Cover and page JPEGs, named the same way as the browser downloads
fn write_images(
    request: &GenerationRequest,
    result: &GenerationResult,
    out_dir: &Path,
) -> Result<Vec<PathBuf>, StudioError> {
    let named = std::iter::once((request.cover_file_name(), &result.cover_image)).chain(
        result
            .pages
            .iter()
            .enumerate()
            .map(|(i, page)| (request.page_file_name(i), page)),
    );

    let mut paths = Vec::with_capacity(result.pages.len() + 1);
    for (index, (file_name, encoded)) in named.enumerate() {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(encoded.trim())
            .map_err(|source| StudioError::Decode { index, source })?;
        let path = out_dir.join(file_name);
        write_file(&path, &bytes)?;
        paths.push(path);
    }
    Ok(paths)
}
