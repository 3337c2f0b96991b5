use std::{
    path::{Component, Path, PathBuf},
    str::FromStr,
};

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (defaults to ./curate.toml when present)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build the studies dataset from the spreadsheet export and the PDF folder
    Import {
        #[arg(value_name = "SPREADSHEET")]
        spreadsheet: Option<PathBuf>,
    },
    /// Guess titles and summaries of PDF-backed studies from their text
    Analyze,
    /// Drop unwanted records, apply manual overrides and URL rewrites
    Reconcile {
        #[arg(value_name = "OVERRIDES")]
        overrides: Option<PathBuf>,
    },
    /// Replace summaries from a title-indexed patch file
    Summaries {
        #[arg(value_name = "PATCHES")]
        patches: Option<PathBuf>,
    },
    /// Translate a locale document into one or all configured languages
    Translate {
        #[arg(value_name = "DOCUMENT")]
        document: LocaleDocument,
        #[arg(value_name = "LANG")]
        language: Option<String>,
    },
    /// Generate the favicons and the social preview image
    Icons {
        /// Generate only one of the two sets
        #[arg(long, value_enum)]
        only: Option<IconSet>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum IconSet {
    /// PNG favicons and favicon.ico from the logo
    Favicons,
    /// The 1200x630 social preview from the hero photo
    Og,
}

/// A locale file name such as `kultur.json`, resolved inside each language folder.
///
/// Only plain relative paths are accepted so a document can never be written outside the
/// locales directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LocaleDocument(PathBuf);

impl LocaleDocument {
    pub fn as_path(&self) -> &Path {
        &self.0
    }
}

impl FromStr for LocaleDocument {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let path = PathBuf::from(s);
        if s.is_empty() || !path.components().all(|c| matches!(c, Component::Normal(_))) {
            return Err(format!("'{s}' is not a file name inside the locales directory"));
        }
        if !path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
        {
            return Err(format!("'{s}' is not a .json document"));
        }
        Ok(LocaleDocument(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn translate_takes_document_and_optional_language() {
        let cli = Cli::try_parse_from(["curate", "--config", "c.toml", "translate", "kultur.json", "fr"])
            .expect("parse");
        assert_eq!(cli.config.as_deref(), Some(Path::new("c.toml")));
        match cli.command {
            Command::Translate { document, language } => {
                assert_eq!(document.as_path(), Path::new("kultur.json"));
                assert_eq!(language.as_deref(), Some("fr"));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn translate_requires_a_document() {
        assert!(Cli::try_parse_from(["curate", "translate"]).is_err());
    }

    #[test]
    fn icons_accepts_an_optional_set() {
        let cli = Cli::try_parse_from(["curate", "icons", "--only", "og"]).expect("parse");
        assert!(matches!(cli.command, Command::Icons { only: Some(IconSet::Og) }));
        let cli = Cli::try_parse_from(["curate", "icons"]).expect("parse");
        assert!(matches!(cli.command, Command::Icons { only: None }));
        assert!(Cli::try_parse_from(["curate", "icons", "--only", "banner"]).is_err());
    }

    #[test]
    fn escaping_documents_are_rejected() {
        for bad in ["../de/kultur.json", "/etc/kultur.json", "kultur.txt", ""] {
            assert!(LocaleDocument::from_str(bad).is_err(), "{bad} accepted");
        }
        assert!(LocaleDocument::from_str("pages/wirkung.json").is_ok());
    }

    #[test]
    fn plain_json_names_are_accepted() {
        proptest::proptest!(|(stem in "[A-Za-z0-9_-]{1,24}")| {
            let name = format!("{stem}.json");
            let doc = LocaleDocument::from_str(&name).expect("parse");
            proptest::prop_assert_eq!(doc.as_path(), Path::new(&name));
        })
    }
}
