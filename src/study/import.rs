//! Building a fresh studies dataset from the literature spreadsheet and the PDF folder.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use calamine::{Data, DataType, Range, Reader, open_workbook_auto};
use serde::Deserialize;
use tracing::{info, warn};

use super::{Study, StudyType, doi::Doi};
use crate::{
    config::ImportConfig,
    error::{Error, Result},
    extract::filename_title,
};

const PDF_PUBLICATION: &str = "PDF Document";
const WORKBOOK_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xlsb", "xls", "ods"];

/// One row of the literature spreadsheet. Columns that are absent read as empty.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SpreadsheetRow {
    #[serde(rename = "DOI")]
    doi: String,
    #[serde(rename = "Title")]
    title: String,
    #[serde(rename = "Authors")]
    authors: String,
    #[serde(rename = "Journal")]
    journal: String,
    #[serde(rename = "Publication date")]
    date: String,
    #[serde(rename = "Abstract")]
    abstract_: String,
}

#[derive(Debug, Default)]
pub struct Import {
    pub studies: Vec<Study>,
    pub books: usize,
    pub papers: usize,
    pub documents: usize,
}

/// Year part of a spreadsheet date such as `2019-03-01`.
fn year_of(date: &str) -> &str {
    date.split('-').next().unwrap_or_default().trim()
}

fn paper_from_row(row: SpreadsheetRow, category: &str) -> Option<Study> {
    let (id, url) = match Doi::parse(&row.doi) {
        Some(doi) => (doi.to_string(), doi.to_url().to_string()),
        None => (row.doi.trim().to_string(), String::new()),
    };
    if id.is_empty() {
        return None;
    }

    let mut study = Study::new(id, row.title.trim());
    study.authors = Some(row.authors.trim().to_string());
    study.publication = Some(row.journal.trim().to_string());
    study.year = Some(year_of(&row.date).to_string());
    study.summary = Some(row.abstract_.trim().to_string());
    study.significance = Some(String::new());
    study.url = Some(url);
    study.kind = Some(StudyType::ScientificPaper);
    study.category = Some(category.to_string());
    Some(study)
}

fn papers_from_rows<I>(rows: I, category: &str) -> Result<Vec<Study>>
where
    I: IntoIterator<Item = Result<SpreadsheetRow>>,
{
    let mut studies = Vec::new();
    for (i, row) in rows.into_iter().enumerate() {
        let row = row?;
        if row.doi.trim().is_empty() && row.title.trim().is_empty() {
            continue;
        }
        match paper_from_row(row, category) {
            Some(study) => studies.push(study),
            None => warn!("spreadsheet row {} has no DOI; skipping", i + 2),
        }
    }
    Ok(studies)
}

/// Parse a CSV export of the literature spreadsheet into paper records.
pub fn read_spreadsheet<R: io::Read>(reader: R, category: &str) -> Result<Vec<Study>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);
    let rows = reader.deserialize::<SpreadsheetRow>().map(|row| row.map_err(Error::from));
    papers_from_rows(rows, category)
}

/// Cell contents as the CSV export would show them. Dates become `YYYY-MM-DD`.
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::DateTime(_) | Data::DateTimeIso(_) => cell
            .as_datetime()
            .map(|dt| dt.date().to_string())
            .unwrap_or_else(|| cell.to_string()),
        _ => cell.to_string(),
    }
}

/// Rows below the header of a worksheet, with columns found by their header names.
fn rows_from_range(range: &Range<Data>) -> Vec<SpreadsheetRow> {
    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        return Vec::new();
    };
    let column = |name: &str| header.iter().position(|cell| cell_text(cell).trim() == name);
    let [doi, title, authors, journal, date, abstract_] =
        ["DOI", "Title", "Authors", "Journal", "Publication date", "Abstract"].map(column);

    rows.map(|row| {
        let get = |col: Option<usize>| col.and_then(|c| row.get(c)).map(cell_text).unwrap_or_default();
        SpreadsheetRow {
            doi: get(doi),
            title: get(title),
            authors: get(authors),
            journal: get(journal),
            date: get(date),
            abstract_: get(abstract_),
        }
    })
    .collect()
}

/// Read paper records from the first worksheet of an Excel or OpenDocument workbook.
pub fn read_workbook(path: &Path, category: &str) -> Result<Vec<Study>> {
    let workbook_error = |reason: String| Error::Workbook {
        path: path.to_path_buf(),
        reason,
    };
    let mut workbook = open_workbook_auto(path).map_err(|e| workbook_error(e.to_string()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| workbook_error("no worksheets".into()))?
        .map_err(|e| workbook_error(e.to_string()))?;
    papers_from_rows(rows_from_range(&range).into_iter().map(Ok), category)
}

fn is_workbook(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| WORKBOOK_EXTENSIONS.iter().any(|w| ext.eq_ignore_ascii_case(w)))
}

/// Papers from a workbook or a CSV export, chosen by the file extension.
pub fn read_papers(path: &Path, category: &str) -> Result<Vec<Study>> {
    if is_workbook(path) {
        return read_workbook(path, category);
    }
    let file = fs::File::open(path).map_err(|e| Error::io(path, e))?;
    read_spreadsheet(io::BufReader::new(file), category)
}

/// PDF files in `dir`, sorted by name.
pub fn scan_pdfs(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).map_err(|e| Error::io(dir, e))?;
    let mut pdfs = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| Error::io(dir, e))?.path();
        let is_pdf = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
        if is_pdf && path.is_file() {
            pdfs.push(path);
        }
    }
    pdfs.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(pdfs)
}

fn document_from_file(filename: &str, config: &ImportConfig, year: i32) -> Study {
    let mut study = Study::new(filename, filename_title(filename));
    study.authors = Some(String::new());
    study.publication = Some(PDF_PUBLICATION.to_string());
    study.year = Some(year.to_string());
    study.summary = Some(config.pdf_summary.clone());
    study.significance = Some(String::new());
    study.url = Some(String::new());
    study.kind = Some(StudyType::PdfDocument);
    study.category = Some(config.pdf_category.clone());
    study
}

/// Featured books first, then spreadsheet papers, then the PDF folder.
///
/// A missing spreadsheet or PDF folder is reported and that source contributes nothing.
pub fn import_studies(
    config: &ImportConfig,
    spreadsheet: Option<&Path>,
    pdf_dir: &Path,
    year: i32,
) -> Result<Import> {
    let mut import = Import::default();

    import.studies.extend(config.books.iter().cloned());
    import.books = config.books.len();

    match spreadsheet {
        Some(path) if path.is_file() => {
            info!("reading spreadsheet {}", path.display());
            let papers = read_papers(path, &config.paper_category)?;
            import.papers = papers.len();
            import.studies.extend(papers);
        }
        Some(path) => warn!("spreadsheet {} not found; importing PDFs only", path.display()),
        None => warn!("no spreadsheet configured; importing PDFs only"),
    }

    if !pdf_dir.is_dir() {
        warn!("PDF directory {} not found", pdf_dir.display());
        return Ok(import);
    }
    for path in scan_pdfs(pdf_dir)? {
        let Some(filename) = path.file_name().and_then(|n| n.to_str()) else {
            warn!("skipping non UTF-8 file name {}", path.display());
            continue;
        };
        if config.skip_markers.iter().any(|m| filename.contains(m.as_str())) {
            info!("skipping {filename}");
            continue;
        }
        import.studies.push(document_from_file(filename, config, year));
        import.documents += 1;
    }

    Ok(import)
}
