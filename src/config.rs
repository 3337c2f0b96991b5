use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;

use crate::{
    error::{Error, Result},
    extract::PageRange,
    study::Study,
};

/// Looked up in the working directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "curate.toml";

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub paths: Paths,
    pub extraction: ExtractionConfig,
    pub import: ImportConfig,
    pub translation: TranslationConfig,
    pub icons: IconsConfig,
    /// Target language code to the language name used in prompts.
    pub languages: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Paths {
    pub studies: PathBuf,
    pub pdf_dir: PathBuf,
    pub locales_dir: PathBuf,
    pub overrides: PathBuf,
    pub summary_patches: PathBuf,
    /// URL prefix under which the site serves `pdf_dir`.
    pub document_url_prefix: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExtractionConfig {
    pub pdftotext: PathBuf,
    pub layout: bool,
    pub pages: PageRange,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImportConfig {
    /// The literature spreadsheet: an `.xlsx`/`.ods` workbook or a CSV export.
    pub spreadsheet: Option<PathBuf>,
    pub paper_category: String,
    pub pdf_category: String,
    pub pdf_summary: String,
    /// PDFs whose file name contains one of these are not imported.
    pub skip_markers: Vec<String>,
    /// Hand-written records placed at the top of a fresh import.
    pub books: Vec<Study>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TranslationConfig {
    pub endpoint: String,
    pub model: String,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
    /// Pause between two API calls.
    pub delay_ms: u64,
    /// Translate each top-level key on its own instead of the whole document at once.
    pub split_sections: bool,
    pub source_language: String,
    pub source_language_name: String,
    /// Names that must come back untranslated.
    pub protected_terms: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IconsConfig {
    /// Square logo the favicons are scaled from.
    pub logo: PathBuf,
    /// Folder receiving the favicons.
    pub output_dir: PathBuf,
    /// Photo cropped into the social preview image.
    pub hero: PathBuf,
    /// Transparent PNG with the preview caption, centred over the darkened photo.
    pub og_overlay: Option<PathBuf>,
    pub og_image: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            paths: Paths::default(),
            extraction: ExtractionConfig::default(),
            import: ImportConfig::default(),
            translation: TranslationConfig::default(),
            icons: IconsConfig::default(),
            languages: default_languages(),
        }
    }
}

impl Default for Paths {
    fn default() -> Self {
        Paths {
            studies: PathBuf::from("client/src/data/studies.json"),
            pdf_dir: PathBuf::from("client/public/documents/studies"),
            locales_dir: PathBuf::from("client/src/locales"),
            overrides: PathBuf::from("data/overrides.json"),
            summary_patches: PathBuf::from("data/summary-patches.json"),
            document_url_prefix: "/documents/studies/".to_string(),
        }
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        ExtractionConfig {
            pdftotext: PathBuf::from("pdftotext"),
            layout: true,
            pages: PageRange::default(),
        }
    }
}

impl Default for ImportConfig {
    fn default() -> Self {
        ImportConfig {
            spreadsheet: None,
            paper_category: "Pharmacology & Safety".to_string(),
            pdf_category: "General Research".to_string(),
            pdf_summary: "PDF Document available for download/reference.".to_string(),
            skip_markers: Vec::new(),
            books: Vec::new(),
        }
    }
}

impl Default for TranslationConfig {
    fn default() -> Self {
        TranslationConfig {
            endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            temperature: 0.2,
            max_tokens: 8000,
            timeout_secs: 60,
            delay_ms: 500,
            split_sections: true,
            source_language: "de".to_string(),
            source_language_name: "German".to_string(),
            protected_terms: [
                "Kava",
                "Nakamal",
                "Tanoa",
                "Bilo",
                "Yaqona",
                "Sevusevu",
                "Noble Kava",
                "Piper methysticum",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

impl Default for IconsConfig {
    fn default() -> Self {
        IconsConfig {
            logo: PathBuf::from("client/public/logo-kava-wiki.png"),
            output_dir: PathBuf::from("client/public"),
            hero: PathBuf::from("client/public/images/hero-home.jpg"),
            og_overlay: None,
            og_image: PathBuf::from("client/public/og-image.png"),
        }
    }
}

fn default_languages() -> BTreeMap<String, String> {
    [
        ("en", "English"),
        ("es", "Spanish"),
        ("fr", "French"),
        ("nl", "Dutch"),
        ("pl", "Polish"),
        ("cs", "Czech"),
        ("pt", "Portuguese"),
        ("it", "Italian"),
        ("ro", "Romanian"),
        ("hu", "Hungarian"),
        ("bg", "Bulgarian"),
        ("el", "Greek"),
        ("tr", "Turkish"),
        ("no", "Norwegian"),
        ("da", "Danish"),
        ("fi", "Finnish"),
        ("sv", "Swedish"),
        ("ja", "Japanese"),
        ("zh", "Chinese (Simplified)"),
        ("ru", "Russian"),
        ("ka", "Georgian"),
    ]
    .into_iter()
    .map(|(code, name)| (code.to_string(), name.to_string()))
    .collect()
}

impl Config {
    /// Load `path`, or `curate.toml` from the working directory when present, or the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p,
            None if Path::new(DEFAULT_CONFIG_FILE).is_file() => Path::new(DEFAULT_CONFIG_FILE),
            None => return Ok(Config::default()),
        };
        let raw = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Config::parse(&raw)
    }

    pub fn parse(raw: &str) -> Result<Self> {
        let config: Config = toml::from_str(raw).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let pages = self.extraction.pages;
        if pages.first == 0 || pages.first > pages.last {
            return Err(Error::Config(format!(
                "extraction.pages must satisfy 1 <= first <= last, got {}..{}",
                pages.first, pages.last
            )));
        }
        if self.paths.document_url_prefix.is_empty() {
            return Err(Error::Config("paths.document_url_prefix is empty".into()));
        }
        if self.translation.api_key_env.is_empty() {
            return Err(Error::Config("translation.api_key_env is empty".into()));
        }
        Ok(())
    }

    /// Name of a configured target language.
    pub fn language_name(&self, code: &str) -> Result<&str> {
        self.languages
            .get(code)
            .map(String::as_str)
            .ok_or_else(|| Error::UnknownLanguage {
                code: code.to_string(),
                available: self.languages.keys().cloned().collect::<Vec<_>>().join(", "),
            })
    }

    /// Every configured target language except the source language.
    pub fn target_languages(&self) -> impl Iterator<Item = (&str, &str)> {
        self.languages
            .iter()
            .filter(|(code, _)| **code != self.translation.source_language)
            .map(|(code, name)| (code.as_str(), name.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::study::StudyType;

    #[test]
    fn empty_file_gives_defaults() {
        let config = Config::parse("").expect("parse");
        assert_eq!(config.extraction.pages, PageRange { first: 1, last: 3 });
        assert_eq!(config.translation.api_key_env, "OPENAI_API_KEY");
        assert_eq!(config.language_name("ka").unwrap(), "Georgian");
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = Config::parse(
            r#"
            [paths]
            studies = "/srv/site/studies.json"

            [translation]
            model = "gpt-4o"
            split_sections = false

            [languages]
            fr = "French"
            de = "German"
            "#,
        )
        .expect("parse");
        assert_eq!(config.paths.studies, PathBuf::from("/srv/site/studies.json"));
        assert_eq!(config.paths.document_url_prefix, "/documents/studies/");
        assert_eq!(config.translation.model, "gpt-4o");
        assert!(!config.translation.split_sections);
        let targets: Vec<_> = config.target_languages().collect();
        assert_eq!(targets, [("fr", "French")]);
    }

    #[test]
    fn books_deserialize_as_studies() {
        let config = Config::parse(
            r#"
            [[import.books]]
            id = "book-lebot"
            title = "Kava: The Pacific Elixir"
            type = "book"
            featured = true
            "#,
        )
        .expect("parse");
        let book = &config.import.books[0];
        assert_eq!(book.kind, Some(StudyType::Book));
        assert_eq!(book.featured, Some(true));
    }

    #[test]
    fn unknown_language_lists_available_codes() {
        let config = Config::parse("[languages]\nfr = \"French\"\nit = \"Italian\"").unwrap();
        let err = config.language_name("xx").unwrap_err();
        assert_eq!(
            err.to_string(),
            "unknown language code 'xx' (available: fr, it)"
        );
    }

    #[test]
    fn invalid_page_range_is_rejected() {
        let err = Config::parse("[extraction.pages]\nfirst = 4\nlast = 2").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(Config::parse("[paths]\nstudys = \"x\"").is_err());
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }

    #[test]
    fn example_file_parses() {
        let config = Config::parse(include_str!("../curate.example.toml")).expect("parse");
        assert_eq!(config.import.books.len(), 2);
        assert_eq!(config.import.books[1].title, "Kava – Wurzel der Ruhe");
        assert_eq!(config.languages.len(), 3);
        assert_eq!(
            config.icons.og_overlay.as_deref(),
            Some(Path::new("design/og-caption.png"))
        );
    }
}
