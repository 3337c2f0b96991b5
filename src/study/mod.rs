use std::{fmt, path::Path};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{error::Result, store};

pub mod doi;
pub mod import;

/// One entry of the studies dataset.
///
/// Only `id` and `title` are required. Fields this type does not know about are kept in
/// `extra` and written back unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Study {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authors: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publication: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub significance: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<StudyType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub featured: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Study {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Study {
            id: id.into(),
            title: title.into(),
            authors: None,
            publication: None,
            year: None,
            summary: None,
            significance: None,
            url: None,
            kind: None,
            category: None,
            featured: None,
            extra: Map::new(),
        }
    }

    pub fn url(&self) -> &str {
        self.url.as_deref().unwrap_or_default()
    }

    pub fn summary(&self) -> &str {
        self.summary.as_deref().unwrap_or_default()
    }

    /// Whether this record stands for a PDF shipped with the site.
    pub fn is_pdf_document(&self) -> bool {
        self.kind == Some(StudyType::PdfDocument) || self.id.to_ascii_lowercase().ends_with(".pdf")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum StudyType {
    Book,
    ScientificPaper,
    PdfDocument,
    /// Anything else found in the dataset, carried through verbatim.
    Other(String),
}

impl From<String> for StudyType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "book" => StudyType::Book,
            "scientific_paper" => StudyType::ScientificPaper,
            "pdf_document" => StudyType::PdfDocument,
            _ => StudyType::Other(s),
        }
    }
}

impl From<StudyType> for String {
    fn from(t: StudyType) -> Self {
        t.to_string()
    }
}

impl fmt::Display for StudyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StudyType::Book => f.write_str("book"),
            StudyType::ScientificPaper => f.write_str("scientific_paper"),
            StudyType::PdfDocument => f.write_str("pdf_document"),
            StudyType::Other(s) => f.write_str(s),
        }
    }
}

pub fn load(path: &Path) -> Result<Vec<Study>> {
    store::read_json(path)
}

pub fn save(path: &Path, studies: &[Study]) -> Result<()> {
    store::write_json(path, studies)
}
