use std::path::{Path, PathBuf};

use indicatif::ProgressBar;
use percent_encoding::{AsciiSet, CONTROLS, percent_decode_str, utf8_percent_encode};
use tracing::{info, warn};

use super::{PageRange, SUMMARY_PLACEHOLDER, TextSource, guess_document};
use crate::study::Study;

const MIN_SUMMARY_CHARS: usize = 50;
const PDF_PUBLICATION: &str = "PDF Download";

/// Characters escaped when a file name becomes the last segment of a document URL.
const FILE_NAME_ENCODE_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

pub struct AnalyzeOptions<'a> {
    pub pdf_dir: &'a Path,
    pub url_prefix: &'a str,
    pub pages: PageRange,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AnalyzeReport {
    pub analyzed: usize,
    pub degraded: usize,
    pub missing: Vec<String>,
    pub titles: usize,
    pub summaries: usize,
}

/// Re-read every PDF-backed record and replace placeholder titles and summaries with guesses.
///
/// A document that cannot be found or read never stops the batch: missing files are skipped
/// and unreadable ones fall back to file-name titles.
pub fn analyze_studies(
    studies: &mut [Study],
    source: &dyn TextSource,
    opts: &AnalyzeOptions<'_>,
    progress: &ProgressBar,
) -> AnalyzeReport {
    let mut report = AnalyzeReport::default();

    for study in studies.iter_mut() {
        progress.inc(1);
        if !study.is_pdf_document() {
            continue;
        }

        let Some(path) = locate_document(study, opts) else {
            warn!("no PDF found for {}; skipping", study.id);
            report.missing.push(study.id.clone());
            continue;
        };

        info!("re-analyzing {}", path.display());
        let guess = guess_document(source, &path, opts.pages);
        report.analyzed += 1;
        if guess.degraded {
            report.degraded += 1;
        }

        if title_looks_like_filename(study) {
            study.title = guess.title;
            report.titles += 1;
        }
        if summary_is_generic(study) {
            study.summary = Some(guess.summary);
            report.summaries += 1;
        }

        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| study.id.clone());
        study.url = Some(document_url(opts.url_prefix, &filename));
        study.publication = Some(PDF_PUBLICATION.to_string());
    }

    report
}

fn document_url(prefix: &str, filename: &str) -> String {
    format!("{}{}", prefix, utf8_percent_encode(filename, FILE_NAME_ENCODE_SET))
}

/// The record's file inside the PDF directory, by id first and then by its local URL.
fn locate_document(study: &Study, opts: &AnalyzeOptions<'_>) -> Option<PathBuf> {
    let by_id = opts.pdf_dir.join(&study.id);
    if by_id.is_file() {
        return Some(by_id);
    }
    let encoded = study.url().strip_prefix(opts.url_prefix)?;
    let decoded = percent_decode_str(encoded).decode_utf8().ok()?;
    let by_url = opts.pdf_dir.join(&*decoded);
    by_url.is_file().then_some(by_url)
}

fn title_looks_like_filename(study: &Study) -> bool {
    study.title == study.id || study.title.contains('_') || study.title.contains(".pdf")
}

fn summary_is_generic(study: &Study) -> bool {
    let summary = study.summary();
    summary.contains(SUMMARY_PLACEHOLDER) || summary.chars().count() < MIN_SUMMARY_CHARS
}
