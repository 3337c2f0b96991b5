use std::fmt;

use once_cell::sync::Lazy;
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use regex::Regex;
use url::Url;

const PATH_SEGMENT_ENCODE_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// A DOI as found in a spreadsheet cell, with wrappers and trailing prose stripped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Doi<'a> {
    prefix: &'a str,
    suffix: &'a str,
}

impl<'a> Doi<'a> {
    pub fn parse(cell: &'a str) -> Option<Self> {
        let mut s = cell.trim();

        if let Some(rest) = s
            .strip_prefix("doi:")
            .or_else(|| s.strip_prefix("DOI:"))
            .or_else(|| s.strip_prefix("urn:doi:"))
            .or_else(|| s.strip_prefix("URN:DOI:"))
        {
            s = rest.trim_start();
        }

        if let Some(rest) = s
            .strip_prefix("https://doi.org/")
            .or_else(|| s.strip_prefix("http://doi.org/"))
            .or_else(|| s.strip_prefix("https://dx.doi.org/"))
            .or_else(|| s.strip_prefix("http://dx.doi.org/"))
        {
            s = rest;
        }

        if let Some(idx) = s.find(['?', '#']) {
            s = &s[..idx];
        }

        s = s.trim_end_matches(|c: char| {
            matches!(c, '.' | ',' | ';' | ':' | ')' | ']' | '}' | '\"' | '\'')
        });

        static DOI_RE: Lazy<Regex> =
            Lazy::new(|| Regex::new(r"^(10\.\d{4,}(?:\.\d+)*)/([^\p{C}\s]+)$").unwrap());

        let caps = DOI_RE.captures(s)?;
        Some(Doi {
            prefix: caps.get(1)?.as_str(),
            suffix: caps.get(2)?.as_str(),
        })
    }

    /// Resolver link for this DOI with the suffix percent-encoded.
    pub fn to_url(&self) -> Url {
        let enc_suffix = utf8_percent_encode(self.suffix, PATH_SEGMENT_ENCODE_SET).to_string();
        // Prefix is digits and dots, the suffix is encoded: always a valid URL.
        Url::parse(&format!("https://doi.org/{}/{}", self.prefix, enc_suffix))
            .unwrap_or_else(|_| unreachable!("doi.org URL with encoded suffix"))
    }
}

impl fmt::Display for Doi<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.prefix, self.suffix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::strategy::Strategy;

    fn doi_core() -> impl Strategy<Value = (String, String, String)> {
        (
            proptest::collection::vec(
                proptest::sample::select(('0'..='9').collect::<Vec<_>>()),
                4..=9,
            )
            .prop_map(|v| v.into_iter().collect::<String>()),
            "[A-Za-z0-9][-A-Za-z0-9._()/]{0,40}[A-Za-z0-9]",
        )
            .prop_map(|(digits, suffix)| {
                let prefix = format!("10.{digits}");
                (format!("{prefix}/{suffix}"), prefix, suffix)
            })
    }

    #[test]
    fn parse_accepts_bare_and_wrapped_cells() {
        let wrappers = vec!["", "doi:", "DOI: ", "https://doi.org/", "http://dx.doi.org/"];
        proptest::proptest!(|(t in doi_core(), pre in proptest::sample::select(wrappers.clone()))| {
            let (full, prefix, suffix) = t;
            let cell = format!("{pre}{full}");
            let doi = Doi::parse(&cell).expect("should parse");
            proptest::prop_assert_eq!(doi.prefix, prefix.as_str());
            proptest::prop_assert_eq!(doi.suffix, suffix.as_str());
            proptest::prop_assert_eq!(doi.to_string(), full);
        })
    }

    #[test]
    fn parse_drops_trailing_punctuation_and_query() {
        let doi = Doi::parse("https://doi.org/10.1136/jnnp.58.5.639?via=ihub.").unwrap();
        assert_eq!(doi.to_string(), "10.1136/jnnp.58.5.639");
        let doi = Doi::parse(" 10.1021/jm50002a007; ").unwrap();
        assert_eq!(doi.to_string(), "10.1021/jm50002a007");
    }

    #[test]
    fn parse_rejects_non_doi_cells() {
        proptest::proptest!(|(s in "[A-Za-z0-9 _-]{0,64}")| {
            proptest::prop_assume!(!s.contains("10."));
            proptest::prop_assert!(Doi::parse(&s).is_none());
        })
    }

    #[test]
    fn to_url_encodes_suffix() {
        let doi = Doi::parse("10.7326/0003-4819-125-11-199612010-00023").unwrap();
        assert_eq!(
            doi.to_url().as_str(),
            "https://doi.org/10.7326/0003-4819-125-11-199612010-00023"
        );
        let doi = Doi::parse("10.1000/a<b>").unwrap();
        assert_eq!(doi.to_url().as_str(), "https://doi.org/10.1000/a%3Cb%3E");
    }
}
