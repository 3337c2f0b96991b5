use std::{
    path::{Path, PathBuf},
    process::Command,
};

use serde::Deserialize;

use crate::error::{Error, Result};

/// Inclusive page bounds handed to the extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct PageRange {
    pub first: u32,
    pub last: u32,
}

impl Default for PageRange {
    fn default() -> Self {
        PageRange { first: 1, last: 3 }
    }
}

/// Anything that can turn a document on disk into plain text.
pub trait TextSource {
    fn extract(&self, path: &Path, pages: PageRange) -> Result<String>;
}

/// The poppler `pdftotext` tool, run once per document.
#[derive(Debug, Clone)]
pub struct Pdftotext {
    program: PathBuf,
    layout: bool,
}

impl Pdftotext {
    pub fn new(program: impl Into<PathBuf>, layout: bool) -> Self {
        Pdftotext {
            program: program.into(),
            layout,
        }
    }

    fn command(&self, path: &Path, pages: PageRange) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg("-f")
            .arg(pages.first.to_string())
            .arg("-l")
            .arg(pages.last.to_string());
        if self.layout {
            cmd.arg("-layout");
        }
        cmd.arg(path.as_os_str()).arg("-");
        cmd
    }
}

impl Default for Pdftotext {
    fn default() -> Self {
        Pdftotext::new("pdftotext", true)
    }
}

impl TextSource for Pdftotext {
    fn extract(&self, path: &Path, pages: PageRange) -> Result<String> {
        let fail = |reason: String| Error::Extraction {
            path: path.to_path_buf(),
            reason,
        };

        if !path.is_file() {
            return Err(fail("file not found".into()));
        }

        let output = self.command(path, pages).output().map_err(|e| {
            fail(format!(
                "failed to run {}: {e}. Is poppler installed?",
                self.program.display()
            ))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(fail(format!(
                "{} exited with {}: {}",
                self.program.display(),
                output.status,
                stderr.trim()
            )));
        }

        String::from_utf8(output.stdout).map_err(|e| fail(format!("output is not UTF-8: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_passes_page_bounds_and_stdout_target() {
        let tool = Pdftotext::default();
        let cmd = tool.command(Path::new("/docs/a.pdf"), PageRange { first: 2, last: 4 });
        let args: Vec<_> = cmd.get_args().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(args, ["-f", "2", "-l", "4", "-layout", "/docs/a.pdf", "-"]);
        assert_eq!(cmd.get_program(), "pdftotext");
    }

    #[test]
    fn missing_file_is_an_extraction_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Pdftotext::default()
            .extract(&dir.path().join("gone.pdf"), PageRange::default())
            .unwrap_err();
        assert!(matches!(err, Error::Extraction { .. }));
        assert!(err.to_string().contains("gone.pdf"));
    }

    #[test]
    fn missing_program_is_an_extraction_error() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = dir.path().join("a.pdf");
        std::fs::write(&pdf, b"%PDF-1.4").unwrap();
        let tool = Pdftotext::new(dir.path().join("no-such-pdftotext"), false);
        let err = tool.extract(&pdf, PageRange::default()).unwrap_err();
        assert!(err.to_string().contains("failed to run"));
    }
}
