use std::{collections::HashSet, fmt};

use tracing::info;

use crate::{study::Study, text::normalize_title};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemovalReason {
    /// The id or title is on the removal list.
    Listed,
    /// A repeated title carrying one of the date markers.
    DatedDuplicate { marker: String },
}

impl fmt::Display for RemovalReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemovalReason::Listed => f.write_str("listed for removal"),
            RemovalReason::DatedDuplicate { marker } => write!(f, "duplicate dated {marker}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Removal {
    pub id: String,
    pub title: String,
    pub reason: RemovalReason,
}

/// Special case for the regulatory documents that were imported twice under the same title.
///
/// Only titles containing one of the date markers are ever treated as duplicates. Other
/// repeated titles are left alone.
#[derive(Debug, Clone, Default)]
pub struct DatedDuplicateRule {
    markers: Vec<String>,
}

impl DatedDuplicateRule {
    pub fn new<I, S>(markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        DatedDuplicateRule {
            markers: markers
                .into_iter()
                .map(|m| normalize_title(m.as_ref()))
                .filter(|m| !m.is_empty())
                .collect(),
        }
    }

    fn marker_in(&self, normalized_title: &str) -> Option<&str> {
        self.markers
            .iter()
            .map(String::as_str)
            .find(|m| normalized_title.contains(m))
    }
}

#[derive(Debug, Clone, Default)]
pub struct RemovalFilter {
    listed: HashSet<String>,
    dated_duplicates: DatedDuplicateRule,
}

impl RemovalFilter {
    fn is_listed(&self, study: &Study) -> bool {
        self.listed.contains(&study.id) || self.listed.contains(&study.title)
    }

    pub fn new(listed: impl IntoIterator<Item = String>, dated_duplicates: DatedDuplicateRule) -> Self {
        RemovalFilter {
            listed: listed.into_iter().collect(),
            dated_duplicates,
        }
    }

    /// Drop listed records and dated duplicates, keeping the survivors in their original order.
    ///
    /// `fix` runs on every record that is not listed by id or incoming title. Duplicates are
    /// detected on the fixed titles, and a fixed title that is itself listed is dropped too.
    pub fn apply<F>(&self, studies: Vec<Study>, mut fix: F) -> (Vec<Study>, Vec<Removal>)
    where
        F: FnMut(&mut Study),
    {
        let mut seen = HashSet::new();
        let mut kept = Vec::with_capacity(studies.len());
        let mut removed = Vec::new();

        for mut study in studies {
            let reason = if self.is_listed(&study) {
                Some(RemovalReason::Listed)
            } else {
                fix(&mut study);
                let norm = normalize_title(&study.title);
                if self.is_listed(&study) {
                    Some(RemovalReason::Listed)
                } else if seen.contains(&norm) {
                    self.dated_duplicates
                        .marker_in(&norm)
                        .map(|m| RemovalReason::DatedDuplicate { marker: m.to_string() })
                } else {
                    seen.insert(norm);
                    None
                }
            };

            match reason {
                Some(reason) => {
                    info!("removing {} ({reason})", study.title);
                    removed.push(Removal {
                        id: study.id,
                        title: study.title,
                        reason,
                    });
                }
                None => kept.push(study),
            }
        }

        (kept, removed)
    }
}
