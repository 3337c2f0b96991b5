use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::{
    error::{Error, Result},
    study::Study,
};

/// Corrected metadata for the record(s) identified by `key`.
///
/// `key` is a file name, a DOI, or any other fragment distinctive enough to be found inside a
/// record's id or URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Override {
    pub key: String,
    pub title: String,
    pub authors: String,
    pub publication: String,
    pub year: String,
    pub summary: String,
    #[serde(default)]
    pub url: Option<String>,
}

impl Override {
    /// Whether an earlier run already wrote this entry's fields onto `study`.
    pub fn is_carried_by(&self, study: &Study) -> bool {
        study.title == self.title
            && study.authors.as_deref() == Some(self.authors.as_str())
            && study.publication.as_deref() == Some(self.publication.as_str())
            && study.year.as_deref() == Some(self.year.as_str())
            && study.summary.as_deref() == Some(self.summary.as_str())
    }
}

/// Override entries in file order with a unique-key index.
#[derive(Debug, Clone, Default)]
pub struct OverrideTable {
    entries: Vec<Override>,
    index: HashMap<String, usize>,
}

impl OverrideTable {
    /// Build the table, rejecting empty and repeated keys.
    pub fn new(entries: Vec<Override>) -> Result<Self> {
        let mut index = HashMap::with_capacity(entries.len());
        for (i, entry) in entries.iter().enumerate() {
            if entry.key.trim().is_empty() {
                return Err(Error::Config(format!("override #{} has an empty key", i + 1)));
            }
            if index.insert(entry.key.clone(), i).is_some() {
                return Err(Error::DuplicateOverrideKey(entry.key.clone()));
            }
        }
        Ok(OverrideTable { entries, index })
    }

    pub fn get(&self, key: &str) -> Option<&Override> {
        self.index.get(key).map(|&i| &self.entries[i])
    }

    /// The first entry whose bibliographic fields the record already carries.
    pub fn carried_by(&self, study: &Study) -> Option<&Override> {
        self.entries.iter().find(|o| o.is_carried_by(study))
    }

    /// Entries in the order they were loaded.
    pub fn iter(&self) -> impl Iterator<Item = &Override> {
        self.entries.iter()
    }
}

/// Whether `url` points into the site's own document folder rather than to an external page.
pub fn is_local_document(url: &str, local_prefix: &str) -> bool {
    Url::parse(url).is_err() && url.contains(local_prefix)
}

/// Overwrite the bibliographic fields of `study` with `ov`.
///
/// The URL is only replaced when the override points at a local document, so working DOI
/// links on the record survive.
pub fn apply_override(study: &mut Study, ov: &Override, local_prefix: &str) {
    study.title = ov.title.clone();
    study.authors = Some(ov.authors.clone());
    study.publication = Some(ov.publication.clone());
    study.year = Some(ov.year.clone());
    study.summary = Some(ov.summary.clone());
    if let Some(url) = ov.url.as_deref()
        && is_local_document(url, local_prefix)
    {
        study.url = Some(url.to_string());
    }
}
