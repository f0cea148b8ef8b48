use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

const BUILTIN_RAG_DATA: &str = include_str!("../data/rag_data.json");

/// One pre-extracted field of a document. `page` is empty when the value
/// was not found in the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldValue {
    pub value: String,
    pub page: String,
}

/// Field values keyed by document filename.
#[derive(Debug, Clone, Default)]
pub struct RagData {
    entries: HashMap<String, Vec<FieldValue>>,
}

impl RagData {
    pub fn builtin() -> Result<Self> {
        Self::from_json(BUILTIN_RAG_DATA).context("built-in rag data is malformed")
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read rag data from {}", path.display()))?;
        Self::from_json(&raw).with_context(|| format!("failed to parse rag data in {}", path.display()))
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let entries: HashMap<String, Vec<FieldValue>> = serde_json::from_str(raw)?;
        log::info!("Loaded rag data for {} documents", entries.len());
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn lookup(&self, file_name: &str) -> Option<&[FieldValue]> {
        let key = normalize_key(file_name);
        self.entries.get(key.as_str()).map(Vec::as_slice)
    }
}

fn copy_suffix() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // unescaped dot: any character may precede "pdf"; one trailing newline
    // is tolerated before the end
    RE.get_or_init(|| Regex::new(r" \(\d+\)(.pdf)(\n?)$").expect("valid copy-suffix pattern"))
}

/// Strips the ` (n)` that browsers append to repeated downloads, e.g.
/// `"report (2).pdf"` becomes `"report.pdf"`.
pub fn normalize_key(file_name: &str) -> String {
    copy_suffix().replace(file_name, "$1$2").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_download_counter() {
        assert_eq!(normalize_key("07461252_Redacted (2).pdf"), "07461252_Redacted.pdf");
        assert_eq!(normalize_key("07461252_Redacted (15).pdf"), "07461252_Redacted.pdf");
    }

    #[test]
    fn keeps_a_trailing_newline() {
        assert_eq!(normalize_key("x (2).pdf\n"), "x.pdf\n");
        assert_eq!(normalize_key("x (2).pdf\n\n"), "x (2).pdf\n\n");
    }

    #[test]
    fn leaves_other_names_alone() {
        assert_eq!(normalize_key("07461252_Redacted.pdf"), "07461252_Redacted.pdf");
        assert_eq!(normalize_key("report (2).txt"), "report (2).txt");
        assert_eq!(normalize_key("report (a).pdf"), "report (a).pdf");
        assert_eq!(normalize_key("report (2) final.pdf"), "report (2) final.pdf");
    }

    #[test]
    fn builtin_table_has_all_documents() {
        let data = RagData::builtin().unwrap();
        assert_eq!(data.len(), 11);

        let fields = data.lookup("10995925_Redacted (1).pdf").unwrap();
        assert_eq!(fields.len(), 7);
        assert_eq!(
            fields[0],
            FieldValue {
                value: "none".to_string(),
                page: String::new()
            }
        );
        assert_eq!(fields[3].value, "07/24/2023");
        assert_eq!(fields[3].page, "55");
    }

    #[test]
    fn unknown_file_is_none() {
        let data = RagData::builtin().unwrap();
        assert!(data.lookup("missing.pdf").is_none());
    }

    #[test]
    fn loads_replacement_table_from_json() {
        let data = RagData::from_json(r#"{"a.pdf": [{"value": "yes", "page": "4"}]}"#).unwrap();
        assert_eq!(data.lookup("a (3).pdf").unwrap()[0].page, "4");
        assert!(RagData::from_json("[]").is_err());
    }
}
