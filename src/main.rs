use std::{path::PathBuf, process};

use anyhow::Context;
use chrono::Datelike;
use clap::Parser;
use serde_json::Value;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::{
    cli::{Cli, Command, IconSet, LocaleDocument},
    config::Config,
    extract::{
        Pdftotext,
        analyze::{AnalyzeOptions, analyze_studies},
    },
    reconcile::{
        Reconciler,
        summaries::{PatchTable, SummaryPatch},
    },
    translate::{ClientSettings, OpenAiClient, TranslateOptions},
};

mod cli;
mod config;
mod error;
mod extract;
mod icons;
mod reconcile;
mod report;
mod store;
mod study;
mod text;
mod translate;

fn main() -> anyhow::Result<()> {
    // Usage errors exit with 1, like every other failed run.
    let args = match Cli::try_parse() {
        Ok(args) => args,
        Err(e) if e.use_stderr() => {
            let _ = e.print();
            process::exit(1);
        }
        Err(e) => e.exit(),
    };
    init_logging();

    let config = Config::load(args.config.as_deref()).context("loading configuration")?;
    match args.command {
        Command::Import { spreadsheet } => import(&config, spreadsheet),
        Command::Analyze => analyze(&config),
        Command::Reconcile { overrides } => reconcile(&config, overrides),
        Command::Summaries { patches } => summaries(&config, patches),
        Command::Translate { document, language } => {
            translate(&config, &document, language.as_deref())
        }
        Command::Icons { only } => generate_icons(&config, only),
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(report::color_enabled())
        .with_target(false)
        .init();
}

fn import(config: &Config, spreadsheet: Option<PathBuf>) -> anyhow::Result<()> {
    let spreadsheet = spreadsheet.or_else(|| config.import.spreadsheet.clone());
    let year = chrono::Local::now().year();
    let import = study::import::import_studies(
        &config.import,
        spreadsheet.as_deref(),
        &config.paths.pdf_dir,
        year,
    )?;
    study::save(&config.paths.studies, &import.studies)
        .with_context(|| format!("writing {}", config.paths.studies.display()))?;
    info!(
        "wrote {} entries ({} books, {} papers, {} documents) to {}",
        import.studies.len(),
        import.books,
        import.papers,
        import.documents,
        config.paths.studies.display()
    );
    report::print_tally(import.studies.len(), 0);
    Ok(())
}

fn analyze(config: &Config) -> anyhow::Result<()> {
    let path = &config.paths.studies;
    let mut studies = study::load(path)?;
    let source = Pdftotext::new(&config.extraction.pdftotext, config.extraction.layout);
    let opts = AnalyzeOptions {
        pdf_dir: &config.paths.pdf_dir,
        url_prefix: &config.paths.document_url_prefix,
        pages: config.extraction.pages,
    };

    let progress = report::progress(studies.len() as u64, "analyze");
    let outcome = analyze_studies(&mut studies, &source, &opts, &progress);
    progress.finish_and_clear();

    study::save(path, &studies).with_context(|| format!("writing {}", path.display()))?;
    info!(
        "{} documents analyzed, {} titles and {} summaries updated",
        outcome.analyzed, outcome.titles, outcome.summaries
    );
    report::print_tally(
        outcome.analyzed - outcome.degraded,
        outcome.degraded + outcome.missing.len(),
    );
    Ok(())
}

fn reconcile(config: &Config, overrides: Option<PathBuf>) -> anyhow::Result<()> {
    let overrides = overrides.unwrap_or_else(|| config.paths.overrides.clone());
    let reconciler = Reconciler::load(&overrides, &config.paths.document_url_prefix)
        .with_context(|| format!("loading {}", overrides.display()))?;

    let path = &config.paths.studies;
    let studies = study::load(path)?;
    let before = studies.len();
    let (studies, outcome) = reconciler.run(studies);
    study::save(path, &studies).with_context(|| format!("writing {}", path.display()))?;

    info!(
        "{before} -> {} entries: {} removed, {} fixed, {} urls rewritten",
        studies.len(),
        outcome.removed.len(),
        outcome.overridden.len(),
        outcome.rewritten
    );
    report::print_tally(outcome.overridden.len(), outcome.unused_keys.len());
    Ok(())
}

fn summaries(config: &Config, patches: Option<PathBuf>) -> anyhow::Result<()> {
    let patches = patches.unwrap_or_else(|| config.paths.summary_patches.clone());
    let entries: Vec<SummaryPatch> = store::read_json(&patches)?;
    let table = PatchTable::new(entries).with_context(|| format!("loading {}", patches.display()))?;

    let path = &config.paths.studies;
    let mut studies = study::load(path)?;
    let outcome = table.apply(&mut studies);
    study::save(path, &studies).with_context(|| format!("writing {}", path.display()))?;

    report::print_tally(outcome.updated.len(), outcome.unmatched.len());
    Ok(())
}

fn translate(config: &Config, document: &LocaleDocument, language: Option<&str>) -> anyhow::Result<()> {
    let languages: Vec<(&str, &str)> = match language {
        Some(code) => vec![(code, config.language_name(code)?)],
        None => config.target_languages().collect(),
    };
    let settings = ClientSettings::from_env(&config.translation)?;
    let client = OpenAiClient::new(settings);

    let source_path = config
        .paths
        .locales_dir
        .join(&config.translation.source_language)
        .join(document.as_path());
    let source: Value = store::read_json(&source_path)?;
    let opts = TranslateOptions::from(&config.translation);

    let progress = report::progress(
        translate::unit_count(&source, &opts) * languages.len() as u64,
        "translate",
    );
    let run = translate::translate_languages(
        &client,
        &source,
        &config.paths.locales_dir,
        document.as_path(),
        &languages,
        &opts,
        &progress,
    );
    progress.finish_and_clear();

    report::print_tally(run.written.len(), run.failed.len());
    if language.is_some()
        && let Some((code, err)) = run.failed.into_iter().next()
    {
        return Err(err).with_context(|| format!("translating {} to {code}", document.as_path().display()));
    }
    Ok(())
}

fn generate_icons(config: &Config, only: Option<IconSet>) -> anyhow::Result<()> {
    let paths = &config.icons;
    let mut written = 0;
    let mut failures = Vec::new();

    if only != Some(IconSet::Og) {
        match icons::open(&paths.logo).and_then(|logo| icons::write_favicons(&logo, &paths.output_dir)) {
            Ok(files) => written += files.len(),
            Err(e) => {
                error!("favicons: {e}");
                failures.push(e);
            }
        }
    }
    if only != Some(IconSet::Favicons) {
        match icons::write_social_image(&paths.hero, paths.og_overlay.as_deref(), &paths.og_image) {
            Ok(()) => written += 1,
            Err(e) => {
                error!("social image: {e}");
                failures.push(e);
            }
        }
    }

    report::print_tally(written, failures.len());
    match failures.into_iter().next() {
        Some(e) => Err(e).context("generating images"),
        None => Ok(()),
    }
}
