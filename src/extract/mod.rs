//! Best-effort title and summary guessing over text pulled from the first pages of a PDF.
//!
//! Everything here works on plain text. Getting the text out of the document is the job of a
//! [`TextSource`], normally the `pdftotext` tool.

use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

use crate::text::{normalize_ws, truncate_with_marker};

pub mod analyze;
pub mod pdftotext;

pub use pdftotext::{PageRange, Pdftotext, TextSource};

/// Written into records whose summary could not be guessed.
pub const SUMMARY_PLACEHOLDER: &str = "Zusammenfassung wird generiert...";
pub const TRUNCATION_MARKER: &str = "...";
pub const MAX_SUMMARY_CHARS: usize = 800;

const MIN_LINE_CHARS: usize = 5;
const TITLE_SCAN_LINES: usize = 10;
const TITLE_MAX_LINES: usize = 5;
const MIN_TITLE_CHARS: usize = 10;
const MIN_PARAGRAPH_CHARS: usize = 200;

const JUNK_PREFIXES: &[&str] = &[
    "downloaded from",
    "http",
    "www",
    "vol.",
    "no.",
    "pp.",
    "page",
    "copyright",
    "journal of",
    "clinical medicine",
    "review article",
    "original article",
    "research article",
    // Section headings end a title block.
    "abstract",
    "summary",
    "zusammenfassung",
    "introduction",
    "einleitung",
    "keywords",
    "key words",
];

const DISQUALIFYING: &[&str] = &["references", "copyright"];

static DIGITS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+$").unwrap());
static SECTION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?ims)^[ \t]*(?:abstract|summary|zusammenfassung)[ \t]*(?:[:.\-–—]|\r?$)(.*?)(?:\b(?:introduction|einleitung|keywords|key\s+words)\b|^[ \t]*\d+\.[ \t])",
    )
    .unwrap()
});
static PARAGRAPH_BREAK_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n[ \t]*\n").unwrap());

/// What the heuristics made of one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentGuess {
    pub title: String,
    pub summary: String,
    /// Set when the text could not be read and both fields are fallbacks.
    pub degraded: bool,
}

/// Boilerplate that can never be part of a title.
pub fn is_junk_line(line: &str) -> bool {
    let line = line.trim().to_lowercase();
    if line.chars().count() < MIN_LINE_CHARS {
        return true;
    }
    if JUNK_PREFIXES.iter().any(|p| line.starts_with(p)) {
        return true;
    }
    DIGITS_RE.is_match(&line)
}

/// Title derived from a file name: extension dropped, separators turned into spaces.
pub fn filename_title(filename: &str) -> String {
    let name = Path::new(filename)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(filename);
    let stem = match name.rsplit_once('.') {
        Some((stem, ext))
            if !stem.is_empty() && !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()) =>
        {
            stem
        }
        _ => name,
    };
    normalize_ws(&stem.replace(['-', '_'], " "))
}

pub fn guess_title(text: &str, filename: &str) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let start = lines
        .iter()
        .take(TITLE_SCAN_LINES)
        .position(|l| !is_junk_line(l));

    if let Some(start) = start {
        let run: Vec<&str> = lines[start..]
            .iter()
            .take(TITLE_MAX_LINES)
            .take_while(|l| !is_junk_line(l))
            .map(|l| l.trim())
            .collect();
        let title = normalize_ws(&run.join(" "));
        if title.chars().count() > MIN_TITLE_CHARS {
            return title;
        }
    }

    filename_title(filename)
}

pub fn guess_summary(text: &str) -> String {
    if let Some(body) = section_summary(text) {
        return body;
    }
    if let Some(paragraph) = paragraph_summary(text) {
        return paragraph;
    }
    SUMMARY_PLACEHOLDER.to_string()
}

/// Body of an "Abstract"/"Summary"/"Zusammenfassung" section, up to the next known heading.
fn section_summary(text: &str) -> Option<String> {
    let caps = SECTION_RE.captures(text)?;
    let body = normalize_ws(caps.get(1)?.as_str());
    if body.is_empty() {
        return None;
    }
    Some(truncate_with_marker(&body, MAX_SUMMARY_CHARS, TRUNCATION_MARKER))
}

/// First long paragraph that is not a reference list or a copyright notice.
fn paragraph_summary(text: &str) -> Option<String> {
    PARAGRAPH_BREAK_RE
        .split(text)
        .map(normalize_ws)
        .find(|p| {
            let lower = p.to_lowercase();
            p.chars().count() > MIN_PARAGRAPH_CHARS
                && !DISQUALIFYING.iter().any(|d| lower.contains(d))
        })
        .map(|p| truncate_with_marker(&p, MAX_SUMMARY_CHARS, TRUNCATION_MARKER))
}

/// Run both heuristics over the text of `path`, degrading to fallbacks when the text cannot
/// be read.
pub fn guess_document(source: &dyn TextSource, path: &Path, pages: PageRange) -> DocumentGuess {
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    match source.extract(path, pages) {
        Ok(text) => DocumentGuess {
            title: guess_title(&text, &filename),
            summary: guess_summary(&text),
            degraded: false,
        },
        Err(e) => {
            warn!("{e}; falling back to file name");
            DocumentGuess {
                title: filename_title(&filename),
                summary: SUMMARY_PLACEHOLDER.to_string(),
                degraded: true,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, Result};
    use proptest::strategy::Strategy;
    use std::path::PathBuf;

    const SCENARIO_B: &str =
        "JOURNAL OF X\n12\nReal Paper Title\nSubtitle Continues\nAbstract: Kava   extracts were\ntested in vivo.\nIntroduction\nMore text.";

    #[test]
    fn scenario_title_skips_header_and_page_number() {
        assert_eq!(
            guess_title(SCENARIO_B, "paper.pdf"),
            "Real Paper Title Subtitle Continues"
        );
    }

    #[test]
    fn scenario_summary_is_text_between_markers() {
        assert_eq!(guess_summary(SCENARIO_B), "Kava extracts were tested in vivo.");
    }

    #[test]
    fn junk_lines_are_classified() {
        assert!(is_junk_line("  1234 "));
        assert!(is_junk_line("abc"));
        assert!(is_junk_line("Downloaded from https://academic.oup.com"));
        assert!(is_junk_line("Vol. 12, No. 3"));
        assert!(is_junk_line("Research Article"));
        assert!(!is_junk_line("Kava and dopamine antagonism"));
    }

    #[test]
    fn digit_only_and_short_lines_are_junk() {
        proptest::proptest!(|(digits in "[0-9]{1,12}", short in "[A-Za-z ]{0,4}")| {
            proptest::prop_assert!(is_junk_line(&digits));
            proptest::prop_assert!(is_junk_line(&short));
        })
    }

    #[test]
    fn boilerplate_prefixes_are_junk() {
        proptest::proptest!(|(prefix in proptest::sample::select(JUNK_PREFIXES.to_vec()), rest in "[A-Za-z ]{0,30}")| {
            let line = format!("{}{}", prefix.to_uppercase(), rest);
            proptest::prop_assert!(is_junk_line(&line));
        })
    }

    #[test]
    fn title_never_contains_junk_lines() {
        let line = proptest::prop_oneof![
            "[A-Z][a-z]{4,12}( [a-z]{3,8}){1,4}",
            "[0-9]{1,4}",
            proptest::sample::select(vec!["Downloaded from x", "Vol. 3", "www.example.org", "Abstract"])
                .prop_map(String::from),
        ];
        proptest::proptest!(|(lines in proptest::collection::vec(line, 0..12))| {
            let text = lines.join("\n");
            let title = guess_title(&text, "fallback-name.pdf");
            if title != "fallback name" {
                for l in lines.iter().filter(|l| is_junk_line(l)) {
                    proptest::prop_assert!(!title.contains(l.trim()), "junk {:?} in {:?}", l, title);
                }
            }
        })
    }

    #[test]
    fn short_title_falls_back_to_filename() {
        assert_eq!(
            guess_title("Kava\n\n", "Toxicity_of-Kava.pdf"),
            "Toxicity of Kava"
        );
        assert_eq!(guess_title("", "kava-clinical-factsheet.pdf"), "kava clinical factsheet");
    }

    #[test]
    fn title_run_is_capped_and_stops_at_junk() {
        let text = "Line number one\nLine number two\n42\nLine number three";
        assert_eq!(guess_title(text, "x.pdf"), "Line number one Line number two");
        let text = (1..=8).map(|i| format!("Title line {i}")).collect::<Vec<_>>().join("\n");
        assert_eq!(
            guess_title(&text, "x.pdf"),
            "Title line 1 Title line 2 Title line 3 Title line 4 Title line 5"
        );
    }

    #[test]
    fn filename_title_strips_extension_and_separators() {
        assert_eq!(
            filename_title("AvinAshiteshPrasad-FinalPublishedpaper.pdf"),
            "AvinAshiteshPrasad FinalPublishedpaper"
        );
        assert_eq!(filename_title("dir/some_file-name.PDF"), "some file name");
        assert_eq!(filename_title("no-extension"), "no extension");
    }

    #[test]
    fn abstract_section_between_markers() {
        let word = "[a-z]{3,9}".prop_filter("no section words", |w| {
            !["abstract", "summary", "introduction", "einleitung", "keywords", "key", "words"]
                .iter()
                .any(|k| w.contains(k))
        });
        proptest::proptest!(|(words in proptest::collection::vec(word, 1..200), seps in proptest::collection::vec(proptest::sample::select(vec![" ", "  ", "\n", " \t"]), 200))| {
            let mut body = String::new();
            for (w, s) in words.iter().zip(seps.iter().cycle()) {
                body.push_str(w);
                body.push_str(s);
            }
            let text = format!("Some Title Here\nAbstract\n{body}\nIntroduction\nrest of paper");
            let summary = guess_summary(&text);
            let expected = normalize_ws(&body);
            if expected.chars().count() > MAX_SUMMARY_CHARS {
                let cut: String = expected.chars().take(MAX_SUMMARY_CHARS).collect();
                proptest::prop_assert_eq!(summary, format!("{cut}..."));
            } else {
                proptest::prop_assert_eq!(summary, expected);
            }
        })
    }

    #[test]
    fn section_stops_at_numbered_heading() {
        let text = "Zusammenfassung\nKava wirkt angstlösend.\n1. Hintergrund\nText";
        assert_eq!(guess_summary(text), "Kava wirkt angstlösend.");
    }

    #[test]
    fn prose_starting_with_a_section_word_is_not_a_header() {
        let text = "Summary of Product Characteristics for kava\nKava root extract tablets.\n\n\
                    Abstract\nThe real abstract body.\nIntroduction\nrest";
        assert_eq!(guess_summary(text), "The real abstract body.");
        assert_eq!(guess_summary("Summary - Kava is safe.\nKeywords: kava"), "Kava is safe.");
    }

    #[test]
    fn decimal_numbers_do_not_end_the_section() {
        let text = "Abstract\nThe dose was 0.1. mg per kg.\nKeywords: kava";
        assert_eq!(guess_summary(text), "The dose was 0.1. mg per kg.");
    }

    #[test]
    fn paragraph_fallback_skips_references_and_copyright() {
        let long = "kava ".repeat(60);
        let text = format!(
            "Title\n\nReferences {long}\n\nCopyright {long}\n\n{long}\n\nshort"
        );
        let summary = guess_summary(&text);
        assert_eq!(summary, normalize_ws(&long));
        assert!(!summary.ends_with("..."));
    }

    #[test]
    fn paragraph_fallback_truncates() {
        let long = "wurzel ".repeat(200);
        let summary = guess_summary(&long);
        assert_eq!(summary.chars().count(), MAX_SUMMARY_CHARS + TRUNCATION_MARKER.len());
        assert!(summary.ends_with(TRUNCATION_MARKER));
    }

    #[test]
    fn nothing_found_yields_placeholder() {
        assert_eq!(guess_summary("Title\n\nshort paragraph"), SUMMARY_PLACEHOLDER);
    }

    struct FailingSource;

    impl TextSource for FailingSource {
        fn extract(&self, path: &Path, _pages: PageRange) -> Result<String> {
            Err(Error::Extraction {
                path: path.to_path_buf(),
                reason: "broken xref table".into(),
            })
        }
    }

    struct FixedSource(&'static str);

    impl TextSource for FixedSource {
        fn extract(&self, _path: &Path, _pages: PageRange) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    #[test]
    fn extraction_failure_degrades_to_fallbacks() {
        let path = PathBuf::from("/docs/ToxicityofKava_Kava.pdf");
        let guess = guess_document(&FailingSource, &path, PageRange::default());
        assert!(guess.degraded);
        assert_eq!(guess.title, "ToxicityofKava Kava");
        assert_eq!(guess.summary, SUMMARY_PLACEHOLDER);
    }

    #[test]
    fn extracted_text_feeds_both_heuristics() {
        let path = PathBuf::from("/docs/paper.pdf");
        let guess = guess_document(&FixedSource(SCENARIO_B), &path, PageRange::default());
        assert!(!guess.degraded);
        assert_eq!(guess.title, "Real Paper Title Subtitle Continues");
        assert_eq!(guess.summary, "Kava extracts were tested in vivo.");
    }
}
