use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid spreadsheet export: {0}")]
    Csv(#[from] csv::Error),

    #[error("cannot read workbook {path}: {reason}")]
    Workbook { path: PathBuf, reason: String },

    #[error("cannot process image {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("duplicate override key: {0}")]
    DuplicateOverrideKey(String),

    #[error("duplicate summary patch title: {0}")]
    DuplicatePatchTitle(String),

    #[error("text extraction failed for {path}: {reason}")]
    Extraction { path: PathBuf, reason: String },

    #[error("HTTP error: {0}")]
    Http(#[from] ureq::Error),

    #[error("API error: {0}")]
    Api(String),

    #[error("malformed translation: {0}")]
    MalformedTranslation(String),

    #[error("unknown language code '{code}' (available: {available})")]
    UnknownLanguage { code: String, available: String },

    #[error("environment variable {0} is not set")]
    MissingCredential(String),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn image(path: impl Into<PathBuf>, source: image::ImageError) -> Self {
        Error::Image {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Error::Json {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
