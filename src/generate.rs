//! High-level pipeline: orchestrates load → resolve → render for one run.
//!
//! The loader runs once to build the full in-memory dataset, the resolver
//! once to build the identifier → path map, and the renderer once per unit.
//! A fatal [`GenerateError`] stops the run immediately; per-unit write
//! failures are collected into the report and the run carries on
//! (best-effort generation).

use std::collections::BTreeSet;
use std::fs;
use std::path::PathBuf;

use tracing::{error, info};

use crate::config::GenerateConfig;
use crate::loader::{load_dataset, LoadError};
use crate::renderer::{
    render_index_note, render_note, write_note, RenderContext, WriteError,
};
use crate::resolver::{display_titles, resolve};

/// Outcome of a completed run, for the end-of-run summary.
#[derive(Debug)]
pub struct GenerateReport {
    pub notes_written: Vec<PathBuf>,
    pub failures: Vec<WriteFailure>,
    pub unresolved_refs: usize,
}

/// One unit that could not be written. The rest of the run is unaffected.
#[derive(Debug)]
pub struct WriteFailure {
    pub uid: String,
    pub error: WriteError,
}

/// Fatal pipeline failure: nothing useful was (or can be) generated.
#[derive(Debug)]
pub enum GenerateError {
    Load(LoadError),
    OutputExists(PathBuf),
    Io(std::io::Error),
}

impl From<LoadError> for GenerateError {
    fn from(e: LoadError) -> Self {
        GenerateError::Load(e)
    }
}

impl From<std::io::Error> for GenerateError {
    fn from(e: std::io::Error) -> Self {
        GenerateError::Io(e)
    }
}

impl std::fmt::Display for GenerateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GenerateError::Load(e) => write!(f, "load failed: {}", e),
            GenerateError::OutputExists(path) => write!(
                f,
                "{} already exists; remove it or pass --force",
                path.display()
            ),
            GenerateError::Io(e) => write!(f, "io error: {}", e),
        }
    }
}

impl std::error::Error for GenerateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GenerateError::Load(e) => Some(e),
            GenerateError::OutputExists(_) => None,
            GenerateError::Io(e) => Some(e),
        }
    }
}

/// Entrypoint: run the full generation pipeline according to config.
pub fn generate(config: &GenerateConfig) -> Result<GenerateReport, GenerateError> {
    info!("[GEN] Starting generation pipeline");

    if config.output_dir.exists() {
        if config.force {
            info!(path = %config.output_dir.display(), "[GEN] Removing existing output directory");
            fs::remove_dir_all(&config.output_dir)?;
        } else {
            error!(path = %config.output_dir.display(), "[GEN] Output directory already exists");
            return Err(GenerateError::OutputExists(config.output_dir.clone()));
        }
    }
    fs::create_dir_all(&config.output_dir)?;

    let dataset = load_dataset(&config.data_dir)?;

    let links = resolve(&dataset.manifest, &dataset.sections, &config.links);
    let titles = display_titles(&dataset.manifest, &dataset.sections);
    let ctx = RenderContext::new(&dataset.glossary, &links, &titles, &config.links);

    let mut report = GenerateReport {
        notes_written: Vec::new(),
        failures: Vec::new(),
        unresolved_refs: 0,
    };

    // Manifest entries without section text of their own become index notes,
    // so every link-map entry ends up backed by exactly one file.
    let section_uids: BTreeSet<&str> = dataset.sections.iter().map(|s| s.uid.as_str()).collect();
    for entry in &dataset.manifest {
        if section_uids.contains(entry.uid.as_str()) {
            continue;
        }
        let Some(note_path) = links.get(&entry.uid) else {
            continue;
        };
        let mut children: Vec<_> = dataset
            .manifest
            .iter()
            .filter(|e| e.chapter.as_deref() == Some(entry.uid.as_str()))
            .collect();
        children.sort_by_key(|e| e.order);
        let rendered = render_index_note(entry, &children, note_path, &ctx);
        record(&mut report, &entry.uid, note_path, &rendered.content, config);
    }

    for section in &dataset.sections {
        let Some(note_path) = links.get(&section.uid) else {
            continue;
        };
        let rendered = render_note(section, note_path, &ctx);
        report.unresolved_refs += rendered.unresolved.len();
        record(&mut report, &section.uid, note_path, &rendered.content, config);
    }

    if !report.notes_written.is_empty() {
        write_folder_readme(config, &mut report);
    }

    info!(
        written = report.notes_written.len(),
        failed = report.failures.len(),
        unresolved = report.unresolved_refs,
        "[GEN] Generation pipeline finished"
    );
    Ok(report)
}

fn record(
    report: &mut GenerateReport,
    uid: &str,
    note_path: &std::path::Path,
    content: &str,
    config: &GenerateConfig,
) {
    match write_note(&config.output_dir, note_path, content) {
        Ok(path) => report.notes_written.push(path),
        Err(error) => {
            error!(uid, error = %error, "[GEN] Failed to write note, continuing");
            report.failures.push(WriteFailure { uid: uid.to_string(), error });
        }
    }
}

fn write_folder_readme(config: &GenerateConfig, report: &mut GenerateReport) {
    let content = format!(
        "This folder contains the Vinaya of the Pāli Canon as a collection of \
         markdown notes generated from SuttaCentral data.\n\n\
         Generated on **{}**.\n\n\
         DO NOT MODIFY these files by hand; regenerate them instead.\n",
        chrono::Local::now().format("%Y-%m-%d")
    );
    match write_note(&config.output_dir, std::path::Path::new("README.md"), &content) {
        Ok(path) => report.notes_written.push(path),
        Err(error) => {
            error!(error = %error, "[GEN] Failed to write folder README");
            report.failures.push(WriteFailure { uid: "README.md".to_string(), error });
        }
    }
}
