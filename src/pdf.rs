//! PDF discovery and page-level text extraction.
//!
//! Parsing is delegated to `lopdf` and runs on the blocking pool since it is CPU bound.

use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

/// Errors raised while reading a PDF.
#[derive(Debug, Error)]
pub enum PdfError {
    /// The document could not be opened or parsed.
    #[error("failed to load PDF {path}: {source}")]
    Load {
        /// File that failed to load.
        path: String,
        /// Underlying parser error.
        #[source]
        source: lopdf::Error,
    },
    /// The blocking extraction task panicked or was cancelled.
    #[error("PDF extraction task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Text extracted from a single page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageText {
    /// Zero-based page number.
    pub page: u32,
    /// Extracted text, possibly empty for image-only pages.
    pub text: String,
}

/// List the PDF files directly inside `folder`, sorted by path.
///
/// Only files at depth one are returned, symlinks to files included; the `.pdf` extension match
/// is case-insensitive. Dangling links are skipped.
pub fn discover_pdf_files(folder: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(folder)
        .follow_links(true)
        .min_depth(1)
        .max_depth(1)
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(error) if error.depth() > 0 => {
                tracing::warn!(
                    path = ?error.path(),
                    error = %error,
                    "Skipping unreadable folder entry"
                );
                continue;
            }
            Err(error) => return Err(std::io::Error::from(error)),
        };
        if entry.file_type().is_file() && has_pdf_extension(entry.path()) {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok(files)
}

fn has_pdf_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false)
}

/// Extract the text of every page of the PDF at `path`.
pub async fn extract_pages(path: &Path) -> Result<Vec<PageText>, PdfError> {
    let owned = path.to_path_buf();
    tokio::task::spawn_blocking(move || extract_pages_blocking(&owned)).await?
}

fn extract_pages_blocking(path: &Path) -> Result<Vec<PageText>, PdfError> {
    let document = lopdf::Document::load(path).map_err(|source| PdfError::Load {
        path: path.display().to_string(),
        source,
    })?;

    let pages = document
        .get_pages()
        .into_keys()
        .enumerate()
        .map(|(index, page_number)| {
            let text = match document.extract_text(&[page_number]) {
                Ok(text) => text,
                Err(error) => {
                    tracing::debug!(
                        file = %path.display(),
                        page = page_number,
                        error = %error,
                        "Page text extraction failed; treating page as empty"
                    );
                    String::new()
                }
            };
            PageText {
                page: index as u32,
                text,
            }
        })
        .collect();

    Ok(pages)
}
