use std::collections::HashSet;

use serde::Deserialize;
use tracing::{info, warn};

use crate::{
    error::{Error, Result},
    study::Study,
    text::fold_title,
};

/// Fragment matches shorter than this are too likely to hit unrelated titles.
const MIN_FRAGMENT_CHARS: usize = 10;

/// A corrected (usually translated) summary for the study with the given title.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SummaryPatch {
    pub title: String,
    pub summary: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchMatch {
    Exact,
    Fragment,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatchReport {
    /// Record ids that received a summary.
    pub updated: Vec<String>,
    /// Patch titles that matched no record.
    pub unmatched: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct PatchTable {
    patches: Vec<(String, SummaryPatch)>,
}

impl PatchTable {
    /// Build the table, rejecting titles that fold to the same key.
    pub fn new(patches: Vec<SummaryPatch>) -> Result<Self> {
        let mut seen = HashSet::new();
        let mut folded = Vec::with_capacity(patches.len());
        for patch in patches {
            let key = fold_title(&patch.title);
            if key.is_empty() {
                return Err(Error::Config("summary patch with an empty title".into()));
            }
            if !seen.insert(key.clone()) {
                return Err(Error::DuplicatePatchTitle(patch.title));
            }
            folded.push((key, patch));
        }
        Ok(PatchTable { patches: folded })
    }

    /// The patch for `title`: an exact folded match first, then the first fragment match.
    pub fn lookup(&self, title: &str) -> Option<(&SummaryPatch, PatchMatch)> {
        let title = fold_title(title);
        if title.is_empty() {
            return None;
        }
        if let Some((_, p)) = self.patches.iter().find(|(key, _)| *key == title) {
            return Some((p, PatchMatch::Exact));
        }
        self.patches
            .iter()
            .find(|(key, _)| {
                (key.chars().count() > MIN_FRAGMENT_CHARS && title.contains(key.as_str()))
                    || (title.chars().count() > MIN_FRAGMENT_CHARS && key.contains(title.as_str()))
            })
            .map(|(_, p)| (p, PatchMatch::Fragment))
    }

    pub fn apply(&self, studies: &mut [Study]) -> PatchReport {
        let mut report = PatchReport::default();
        let mut used = HashSet::new();

        for study in studies.iter_mut() {
            let Some((patch, how)) = self.lookup(&study.title) else {
                continue;
            };
            if how == PatchMatch::Fragment {
                info!("updated {} (partial title match)", study.title);
            } else {
                info!("updated {}", study.title);
            }
            study.summary = Some(patch.summary.clone());
            used.insert(patch.title.clone());
            report.updated.push(study.id.clone());
        }

        for (_, patch) in &self.patches {
            if !used.contains(&patch.title) {
                warn!("no study found for title '{}'", patch.title);
                report.unmatched.push(patch.title.clone());
            }
        }

        report
    }
}
