//! Reads the fetched data artifacts from disk into typed in-memory records.
//!
//! The loader is all-or-nothing: either every artifact parses, or the run
//! aborts with a [`LoadError`] naming the artifact that failed. There is no
//! partial-success mode because the resolver needs the complete identifier
//! set before any note can be rendered.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// File name of the manifest artifact inside the data directory.
pub const MANIFEST_FILE: &str = "manifest.json";
/// File name of the glossary artifact (term → gloss map).
pub const GLOSSARY_FILE: &str = "glossary.json";
/// File name of the canonical-sections artifact.
pub const SECTIONS_FILE: &str = "vibhanga.json";

/// A structural unit of the Vinaya text, as listed in the manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Stable canonical identifier (e.g. `pli-tv-bu-vb-pc1`).
    pub uid: String,
    /// Display title (e.g. `Pācittiya 1`).
    pub title: String,
    /// Uid of the enclosing chapter/category, if any. Entries sharing a
    /// chapter are grouped into the same output subfolder.
    #[serde(default)]
    pub chapter: Option<String>,
    /// Position relative to siblings within the same chapter.
    #[serde(default)]
    pub order: u32,
}

/// A term with its short definition, used for inline annotation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlossaryEntry {
    pub term: String,
    pub gloss: String,
}

/// A unit of source text with embedded reference markers in its body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalSection {
    pub uid: String,
    /// Title override; when absent the manifest title (or the uid) is used.
    #[serde(default)]
    pub title: Option<String>,
    pub body: String,
    /// Explicitly declared references. Markers inside `body` are recognised
    /// regardless, so this may stay empty.
    #[serde(default)]
    pub refs: Vec<String>,
}

/// Everything one generation run needs, loaded once and then read-only.
#[derive(Debug)]
pub struct Dataset {
    pub manifest: Vec<ManifestEntry>,
    pub glossary: BTreeMap<String, GlossaryEntry>,
    pub sections: Vec<CanonicalSection>,
}

/// Fatal loader failure: the pipeline cannot proceed without a complete dataset.
#[derive(Debug)]
pub enum LoadError {
    Missing { artifact: &'static str, path: PathBuf },
    Io { artifact: &'static str, error: std::io::Error },
    Parse { artifact: &'static str, error: serde_json::Error },
}

impl std::fmt::Display for LoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadError::Missing { artifact, path } => {
                write!(f, "required artifact {} not found at {}", artifact, path.display())
            }
            LoadError::Io { artifact, error } => {
                write!(f, "failed to read artifact {}: {}", artifact, error)
            }
            LoadError::Parse { artifact, error } => {
                write!(f, "artifact {} is not valid JSON: {}", artifact, error)
            }
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LoadError::Missing { .. } => None,
            LoadError::Io { error, .. } => Some(error),
            LoadError::Parse { error, .. } => Some(error),
        }
    }
}

/// Loads all three artifacts from `data_dir`.
///
/// Collection sizes always equal the record counts of the source files: a
/// record that fails to deserialize fails the whole artifact rather than
/// being silently dropped.
pub fn load_dataset(data_dir: &Path) -> Result<Dataset, LoadError> {
    info!(data_dir = %data_dir.display(), "Loading dataset");

    let manifest: Vec<ManifestEntry> = read_artifact(data_dir, MANIFEST_FILE)?;
    let glosses: BTreeMap<String, String> = read_artifact(data_dir, GLOSSARY_FILE)?;
    let sections: Vec<CanonicalSection> = read_artifact(data_dir, SECTIONS_FILE)?;

    let glossary = glosses
        .into_iter()
        .map(|(term, gloss)| {
            let entry = GlossaryEntry { term: term.clone(), gloss };
            (term, entry)
        })
        .collect::<BTreeMap<_, _>>();

    info!(
        manifest_entries = manifest.len(),
        glossary_entries = glossary.len(),
        sections = sections.len(),
        "Dataset loaded"
    );

    Ok(Dataset { manifest, glossary, sections })
}

fn read_artifact<T: DeserializeOwned>(dir: &Path, artifact: &'static str) -> Result<T, LoadError> {
    let path = dir.join(artifact);
    if !path.exists() {
        error!(artifact, path = %path.display(), "Artifact missing from data directory");
        return Err(LoadError::Missing { artifact, path });
    }
    let content = fs::read_to_string(&path).map_err(|error| {
        error!(artifact, path = %path.display(), error = ?error, "Failed to read artifact");
        LoadError::Io { artifact, error }
    })?;
    serde_json::from_str(&content).map_err(|error| {
        error!(artifact, path = %path.display(), error = ?error, "Failed to parse artifact");
        LoadError::Parse { artifact, error }
    })
}
