//! Composes and writes one markdown note per canonical unit.
//!
//! Body text is included verbatim except for recognised reference markers:
//! a marker naming another unit becomes a relative markdown link, a marker
//! naming a glossary term becomes inline emphasis with a footnoted gloss,
//! and anything else passes through unchanged. A failed write is reported
//! per unit so one bad note never blocks the rest of the run.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path, PathBuf};

use regex::Regex;
use tracing::{debug, warn};

use crate::config::LinkPolicy;
use crate::loader::{CanonicalSection, GlossaryEntry, ManifestEntry};
use crate::resolver::LinkMap;

/// Shared, read-only inputs for all renderer invocations in a run.
pub struct RenderContext<'a> {
    pub glossary: &'a BTreeMap<String, GlossaryEntry>,
    pub links: &'a LinkMap,
    pub titles: &'a BTreeMap<String, String>,
    pub marker: Regex,
}

impl<'a> RenderContext<'a> {
    pub fn new(
        glossary: &'a BTreeMap<String, GlossaryEntry>,
        links: &'a LinkMap,
        titles: &'a BTreeMap<String, String>,
        policy: &LinkPolicy,
    ) -> Self {
        RenderContext {
            glossary,
            links,
            titles,
            marker: marker_regex(policy),
        }
    }
}

/// A rendered note plus the reference identifiers that resolved to nothing.
#[derive(Debug)]
pub struct RenderedNote {
    pub content: String,
    pub unresolved: Vec<String>,
}

/// Per-unit write failure. Recoverable: recorded and skipped, the run continues.
#[derive(Debug)]
pub enum WriteError {
    Io { path: PathBuf, error: std::io::Error },
}

impl std::fmt::Display for WriteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WriteError::Io { path, error } => {
                write!(f, "failed to write {}: {}", path.display(), error)
            }
        }
    }
}

impl std::error::Error for WriteError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            WriteError::Io { error, .. } => Some(error),
        }
    }
}

fn marker_regex(policy: &LinkPolicy) -> Regex {
    let pattern = format!(
        "{}\\s*(.+?)\\s*{}",
        regex::escape(&policy.open_marker),
        regex::escape(&policy.close_marker),
    );
    // Both halves are escaped literals, so the pattern is always valid.
    Regex::new(&pattern).expect("escaped marker pattern is valid")
}

/// Renders one canonical section to markdown.
///
/// `note_path` is the section's own relative output path from the link map;
/// links to other notes are made relative to its parent directory.
pub fn render_note(
    section: &CanonicalSection,
    note_path: &Path,
    ctx: &RenderContext<'_>,
) -> RenderedNote {
    let title = ctx
        .titles
        .get(&section.uid)
        .map(String::as_str)
        .or(section.title.as_deref())
        .unwrap_or(&section.uid);

    let mut footnotes: Vec<(String, String)> = Vec::new();
    let mut unresolved: Vec<String> = Vec::new();

    let body = ctx.marker.replace_all(&section.body, |caps: &regex::Captures<'_>| {
        let target = caps[1].trim();
        if let Some(dest) = ctx.links.get(target) {
            let text = ctx.titles.get(target).map(String::as_str).unwrap_or(target);
            format!("[{}]({})", text, relative_link(note_path, dest))
        } else if let Some(entry) = ctx.glossary.get(target) {
            footnotes.push((entry.term.clone(), entry.gloss.clone()));
            format!("*{}*[^{}]", entry.term, footnotes.len())
        } else {
            warn!(uid = %section.uid, reference = target, "Unresolved reference left as plain text");
            unresolved.push(target.to_string());
            caps[0].to_string()
        }
    });

    let mut content = format!(
        "---\naliases:\n  - {}\n---\n\n# {}\n\n{}\n",
        section.uid, title, body.trim_end()
    );

    if !footnotes.is_empty() {
        content.push_str("\n## Glossary\n");
        for (i, (term, gloss)) in footnotes.iter().enumerate() {
            content.push_str(&format!("\n[^{}]: **{}**: {}\n", i + 1, term, gloss));
        }
    }

    debug!(uid = %section.uid, unresolved = unresolved.len(), "Rendered note");
    RenderedNote { content, unresolved }
}

/// Renders an index note for a manifest entry that has no section text of
/// its own (typically a chapter), listing links to its children in order.
pub fn render_index_note(
    entry: &ManifestEntry,
    children: &[&ManifestEntry],
    note_path: &Path,
    ctx: &RenderContext<'_>,
) -> RenderedNote {
    let mut content = format!(
        "---\naliases:\n  - {}\n---\n\n# {}\n",
        entry.uid, entry.title
    );

    if !children.is_empty() {
        content.push('\n');
        for child in children {
            match ctx.links.get(&child.uid) {
                Some(dest) => content.push_str(&format!(
                    "- [{}]({})\n",
                    child.title,
                    relative_link(note_path, dest)
                )),
                None => content.push_str(&format!("- {}\n", child.title)),
            }
        }
    }

    RenderedNote { content, unresolved: Vec::new() }
}

/// Writes a rendered note under `output_dir` at its relative path, creating
/// parent directories as needed. Returns the absolute path written.
pub fn write_note(
    output_dir: &Path,
    rel_path: &Path,
    content: &str,
) -> Result<PathBuf, WriteError> {
    let path = output_dir.join(rel_path);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|error| WriteError::Io {
            path: parent.to_path_buf(),
            error,
        })?;
    }
    fs::write(&path, content).map_err(|error| WriteError::Io { path: path.clone(), error })?;
    debug!(path = %path.display(), "Wrote note");
    Ok(path)
}

/// Relative markdown link target from the note at `from` to the note at `to`.
/// Both paths are relative to the output root.
fn relative_link(from: &Path, to: &Path) -> String {
    let from_dir: Vec<Component<'_>> = from
        .parent()
        .unwrap_or_else(|| Path::new(""))
        .components()
        .collect();
    let to_comps: Vec<Component<'_>> = to.components().collect();

    let common = from_dir
        .iter()
        .zip(to_comps.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut parts: Vec<String> = vec!["..".to_string(); from_dir.len() - common];
    parts.extend(
        to_comps[common..]
            .iter()
            .map(|c| c.as_os_str().to_string_lossy().into_owned()),
    );
    parts.join("/")
}
