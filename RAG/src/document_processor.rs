use anyhow::{Context, Result};
use pdf_extract::extract_text;
use std::fs;
use std::path::Path;

pub struct DocumentProcessor;

impl DocumentProcessor {
    pub fn new() -> Self {
        Self
    }

    /// Reads the text of a document. PDFs go through text extraction,
    /// anything else is read as UTF-8.
    pub fn load_text(&self, file_path: &Path) -> Result<String> {
        let is_pdf = file_path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("pdf"))
            .unwrap_or(false);

        log::info!("Loading document: {}", file_path.display());

        let content = if is_pdf {
            extract_text(file_path)
                .with_context(|| format!("failed to extract text from {}", file_path.display()))?
        } else {
            fs::read_to_string(file_path)
                .with_context(|| format!("failed to read {}", file_path.display()))?
        };

        log::info!("Loaded {} characters", content.chars().count());
        Ok(content)
    }
}

impl Default for DocumentProcessor {
    fn default() -> Self {
        Self::new()
    }
}
