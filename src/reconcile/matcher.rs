use std::fmt;

use super::overrides::OverrideTable;
use crate::study::Study;

/// Which lookup connected a record to an override entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchRule {
    ExactId,
    ExactUrl,
    /// The key occurs somewhere inside the record's id or URL.
    Substring,
}

impl fmt::Display for MatchRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchRule::ExactId => f.write_str("exact id"),
            MatchRule::ExactUrl => f.write_str("exact url"),
            MatchRule::Substring => f.write_str("substring"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Match<'t> {
    pub key: &'t str,
    pub rule: MatchRule,
}

type RuleFn = for<'s, 't> fn(&'s Study, &'t OverrideTable) -> Option<&'t str>;

/// Lookups tried against every record.
///
/// NOTE: Ordering is important here, as it signifies priority. The first rule that finds a key
/// decides the match and the remaining rules are not consulted.
static RULES: &[(MatchRule, RuleFn)] = &[
    (MatchRule::ExactId, exact_id),
    (MatchRule::ExactUrl, exact_url),
    (MatchRule::Substring, substring),
];

fn exact_id<'t>(study: &Study, table: &'t OverrideTable) -> Option<&'t str> {
    table.get(&study.id).map(|o| o.key.as_str())
}

fn exact_url<'t>(study: &Study, table: &'t OverrideTable) -> Option<&'t str> {
    let url = study.url.as_deref().filter(|u| !u.is_empty())?;
    table.get(url).map(|o| o.key.as_str())
}

fn substring<'t>(study: &Study, table: &'t OverrideTable) -> Option<&'t str> {
    substring_candidates(study, table).next()
}

/// Every key contained in the record's id or URL, in table order.
pub fn substring_candidates<'a, 't>(
    study: &'a Study,
    table: &'t OverrideTable,
) -> impl Iterator<Item = &'t str> + 'a
where
    't: 'a,
{
    table
        .iter()
        .map(|o| o.key.as_str())
        .filter(move |key| study.id.contains(key) || study.url().contains(key))
}

/// Find the override entry for `study`, reporting which rule fired.
pub fn find<'t>(study: &Study, table: &'t OverrideTable) -> Option<Match<'t>> {
    RULES
        .iter()
        .find_map(|(rule, lookup)| lookup(study, table).map(|key| Match { key, rule: *rule }))
}
