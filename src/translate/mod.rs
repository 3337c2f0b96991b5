//! Translation of locale documents through a chat completion API.
//!
//! Only string leaves are ever meant to change. Every answer from the model is checked
//! against the shape of what was sent before it is used.

use std::{
    path::{Path, PathBuf},
    thread,
    time::Duration,
};

use indicatif::ProgressBar;
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::{
    config::TranslationConfig,
    error::{Error, Result},
    store,
};

pub mod client;

pub use client::{ChatClient, ClientSettings, OpenAiClient};

const SYSTEM_PROMPT: &str = "You are a translator. Return only valid JSON.";

#[derive(Debug, Clone)]
pub struct TranslateOptions {
    pub source_language_name: String,
    pub protected_terms: Vec<String>,
    pub split_sections: bool,
    pub delay: Duration,
}

impl From<&TranslationConfig> for TranslateOptions {
    fn from(config: &TranslationConfig) -> Self {
        TranslateOptions {
            source_language_name: config.source_language_name.clone(),
            protected_terms: config.protected_terms.clone(),
            split_sections: config.split_sections,
            delay: Duration::from_millis(config.delay_ms),
        }
    }
}

/// Remove a surrounding Markdown code fence (with or without a `json` tag) from model output.
pub fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let rest = rest.strip_suffix("```").unwrap_or(rest);
    rest.trim()
}

pub fn build_prompt(
    unit: &Value,
    source_language: &str,
    target_language: &str,
    protected_terms: &[String],
) -> Result<String> {
    let body = serde_json::to_string_pretty(unit)
        .map_err(|e| Error::MalformedTranslation(format!("encoding source: {e}")))?;
    let mut prompt = format!(
        "Translate this JSON from {source_language} to {target_language}.\n\n\
         Rules:\n\
         - Only translate string VALUES, keep all keys unchanged\n\
         - Keep HTML tags (<strong>, <em>) intact\n"
    );
    if !protected_terms.is_empty() {
        prompt.push_str(&format!("- Keep proper nouns: {}\n", protected_terms.join(", ")));
    }
    prompt.push_str("- Return ONLY valid JSON, no markdown or explanations\n\nJSON to translate:\n");
    prompt.push_str(&body);
    Ok(prompt)
}

/// Whether `translated` differs from `source` in string leaves only.
pub fn same_shape(source: &Value, translated: &Value) -> bool {
    match (source, translated) {
        (Value::String(_), Value::String(_)) => true,
        (Value::Object(a), Value::Object(b)) => {
            a.len() == b.len()
                && a.iter()
                    .all(|(k, v)| b.get(k).is_some_and(|w| same_shape(v, w)))
        }
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(v, w)| same_shape(v, w))
        }
        (a, b) => a == b,
    }
}

/// Send one unit to the model and accept the answer only if it keeps the unit's shape.
pub fn translate_unit(
    client: &dyn ChatClient,
    unit: &Value,
    target_language: &str,
    opts: &TranslateOptions,
) -> Result<Value> {
    let prompt = build_prompt(
        unit,
        &opts.source_language_name,
        target_language,
        &opts.protected_terms,
    )?;
    let answer = client.complete(SYSTEM_PROMPT, &prompt)?;
    let parsed: Value = serde_json::from_str(strip_code_fence(&answer))
        .map_err(|e| Error::MalformedTranslation(e.to_string()))?;
    if !same_shape(unit, &parsed) {
        return Err(Error::MalformedTranslation(
            "keys or non-string values changed".into(),
        ));
    }
    Ok(parsed)
}

/// Translate a whole document.
///
/// In section mode every top-level key is sent on its own and a section that fails falls back
/// to the source text. Otherwise the document is one unit and any failure is returned.
pub fn translate_document(
    client: &dyn ChatClient,
    source: &Value,
    target_language: &str,
    opts: &TranslateOptions,
    progress: &ProgressBar,
) -> Result<Value> {
    let sections = match source {
        Value::Object(map) if opts.split_sections => map,
        _ => {
            let out = translate_unit(client, source, target_language, opts);
            progress.inc(1);
            return out;
        }
    };

    let mut translated = Map::with_capacity(sections.len());
    for (i, (key, value)) in sections.iter().enumerate() {
        if i > 0 && !opts.delay.is_zero() {
            thread::sleep(opts.delay);
        }
        progress.set_message(key.clone());

        let unit = Value::Object(Map::from_iter([(key.clone(), value.clone())]));
        let section = match translate_unit(client, &unit, target_language, opts) {
            Ok(Value::Object(mut map)) => map.remove(key).unwrap_or_else(|| value.clone()),
            Ok(_) => value.clone(),
            Err(e) => {
                warn!("section {key} kept untranslated: {e}");
                value.clone()
            }
        };
        translated.insert(key.clone(), section);
        progress.inc(1);
    }
    Ok(Value::Object(translated))
}

/// Number of model calls `translate_document` makes for `source`.
pub fn unit_count(source: &Value, opts: &TranslateOptions) -> u64 {
    match source {
        Value::Object(map) if opts.split_sections => map.len() as u64,
        _ => 1,
    }
}

#[derive(Debug, Default)]
pub struct RunSummary {
    pub written: Vec<PathBuf>,
    pub failed: Vec<(String, Error)>,
}

/// Translate `source` into each `(code, name)` language and write `<locales_dir>/<code>/<document>`.
///
/// A language that fails is recorded and the run moves on to the next one.
pub fn translate_languages(
    client: &dyn ChatClient,
    source: &Value,
    locales_dir: &Path,
    document: &Path,
    languages: &[(&str, &str)],
    opts: &TranslateOptions,
    progress: &ProgressBar,
) -> RunSummary {
    let mut summary = RunSummary::default();
    for (i, (code, name)) in languages.iter().enumerate() {
        if i > 0 && !opts.delay.is_zero() {
            thread::sleep(opts.delay);
        }
        info!("translating {} to {name} ({code})", document.display());
        let dest = locales_dir.join(code).join(document);
        let result = translate_document(client, source, name, opts, progress)
            .and_then(|doc| store::write_json(&dest, &doc));
        match result {
            Ok(()) => {
                info!("saved {}", dest.display());
                summary.written.push(dest);
            }
            Err(e) => {
                warn!("{name} ({code}) failed: {e}");
                summary.failed.push((code.to_string(), e));
            }
        }
    }
    summary
}
