//! Clean-up passes over the studies dataset driven by a hand-maintained JSON file.
//!
//! Each record is first checked against the removal list, then given its override, then
//! checked for being a dated duplicate of an earlier survivor. URL rewrites run last over the
//! survivors. Records that already carry an override, and URLs that already are a rewrite
//! target, are left alone, so running the passes over their own output changes nothing.

use std::{collections::HashSet, path::Path};

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::{error::Result, store, study::Study};

pub mod filter;
pub mod matcher;
pub mod overrides;
pub mod summaries;

use filter::{DatedDuplicateRule, Removal, RemovalFilter};
use matcher::MatchRule;
use overrides::{Override, OverrideTable, apply_override};

/// On-disk layout of the reconcile file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReconcileFile {
    /// Ids or exact titles of records to drop.
    pub remove: Vec<String>,
    /// Date fragments marking titles that were imported more than once.
    pub duplicate_markers: Vec<String>,
    pub overrides: Vec<Override>,
    pub url_rewrites: Vec<UrlRewrite>,
}

/// Replace the URL of every record whose URL contains `contains`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UrlRewrite {
    pub contains: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Applied {
    pub id: String,
    pub key: String,
    pub rule: MatchRule,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub removed: Vec<Removal>,
    pub overridden: Vec<Applied>,
    pub rewritten: usize,
    /// Override keys that matched no record.
    pub unused_keys: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Reconciler {
    filter: RemovalFilter,
    overrides: OverrideTable,
    rewrites: Vec<UrlRewrite>,
    local_prefix: String,
}

impl Reconciler {
    pub fn load(path: &Path, local_prefix: &str) -> Result<Self> {
        let file: ReconcileFile = store::read_json(path)?;
        Reconciler::from_file(file, local_prefix)
    }

    pub fn from_file(file: ReconcileFile, local_prefix: &str) -> Result<Self> {
        Ok(Reconciler {
            filter: RemovalFilter::new(file.remove, DatedDuplicateRule::new(&file.duplicate_markers)),
            overrides: OverrideTable::new(file.overrides)?,
            rewrites: file.url_rewrites,
            local_prefix: local_prefix.to_string(),
        })
    }

    pub fn run(&self, studies: Vec<Study>) -> (Vec<Study>, ReconcileReport) {
        let mut used = HashSet::new();
        let mut overridden = Vec::new();
        let (mut studies, removed) = self.filter.apply(studies, |study| {
            if let Some(applied) = self.fix(study, &mut used) {
                overridden.push(applied);
            }
        });
        let mut report = ReconcileReport {
            removed,
            overridden,
            ..Default::default()
        };

        for ov in self.overrides.iter() {
            if !used.contains(ov.key.as_str()) {
                warn!("override key {} matched no study", ov.key);
                report.unused_keys.push(ov.key.clone());
            }
        }

        for study in studies.iter_mut() {
            let Some(current) = study.url.as_deref() else {
                continue;
            };
            if self.rewrites.iter().any(|rw| rw.url == current) {
                continue;
            }
            if let Some(rw) = self.rewrites.iter().find(|rw| current.contains(&rw.contains)) {
                info!("rewrote url of {}", study.id);
                study.url = Some(rw.url.clone());
                report.rewritten += 1;
            }
        }

        (studies, report)
    }

    /// Apply the override matching `study`, unless it already carries one.
    fn fix<'s>(&'s self, study: &mut Study, used: &mut HashSet<&'s str>) -> Option<Applied> {
        if let Some(ov) = self.overrides.carried_by(study) {
            debug!("{} already carries override {}", study.id, ov.key);
            used.insert(ov.key.as_str());
            return None;
        }

        let m = matcher::find(study, &self.overrides)?;
        if m.rule == MatchRule::Substring {
            let candidates: Vec<_> = matcher::substring_candidates(study, &self.overrides).collect();
            if candidates.len() > 1 {
                warn!(
                    "{} contains several override keys ({}); using {}",
                    study.id,
                    candidates.join(", "),
                    m.key
                );
            }
        }
        debug!("{} matched {} by {}", study.id, m.key, m.rule);

        let ov = self.overrides.get(m.key)?;
        apply_override(study, ov, &self.local_prefix);
        info!("fixed {}", study.title);
        used.insert(m.key);
        Some(Applied {
            id: study.id.clone(),
            key: m.key.to_string(),
            rule: m.rule,
        })
    }
}
