//! Assigns every canonical identifier a deterministic output path.
//!
//! Pure function of its inputs: no side effects, no I/O. The resulting
//! [`LinkMap`] is built once per run and shared read-only by all renderer
//! invocations.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use slug::slugify;
use tracing::debug;

use crate::config::LinkPolicy;
use crate::loader::{CanonicalSection, ManifestEntry};

/// Canonical identifier → relative output path of the note for that unit.
pub type LinkMap = BTreeMap<String, PathBuf>;

/// Builds the link map for all manifest entries and canonical sections.
///
/// Paths take the form `<chapter-slug>/<title-slug>.md`, or `<title-slug>.md`
/// for units without a chapter. Slugs are ASCII-folded (Pāli diacritics
/// included), so two distinct titles can normalise to the same path; the
/// later unit, in manifest order then section order, gets a numeric suffix
/// (`-2`, `-3`, …) joined by the policy's collision separator.
pub fn resolve(
    manifest: &[ManifestEntry],
    sections: &[CanonicalSection],
    policy: &LinkPolicy,
) -> LinkMap {
    let mut links = LinkMap::new();
    let mut taken: BTreeSet<PathBuf> = BTreeSet::new();

    let chapters: BTreeMap<&str, &str> = manifest
        .iter()
        .map(|e| (e.uid.as_str(), e.title.as_str()))
        .collect();

    for entry in manifest {
        let dir = entry
            .chapter
            .as_deref()
            .map(|c| chapter_dir(c, &chapters));
        assign(&mut links, &mut taken, &entry.uid, &entry.title, dir, policy);
    }

    for section in sections {
        if links.contains_key(&section.uid) {
            continue; // already placed via its manifest entry
        }
        let title = section.title.as_deref().unwrap_or(&section.uid);
        assign(&mut links, &mut taken, &section.uid, title, None, policy);
    }

    debug!(entries = links.len(), "Resolved link map");
    links
}

/// Display titles for link text, keyed by uid. Manifest titles win over
/// section titles; units known only by uid fall back to the uid itself.
pub fn display_titles(
    manifest: &[ManifestEntry],
    sections: &[CanonicalSection],
) -> BTreeMap<String, String> {
    let mut titles = BTreeMap::new();
    for section in sections {
        if let Some(title) = &section.title {
            titles.insert(section.uid.clone(), title.clone());
        }
    }
    for entry in manifest {
        titles.insert(entry.uid.clone(), entry.title.clone());
    }
    titles
}

fn chapter_dir(chapter: &str, chapters: &BTreeMap<&str, &str>) -> String {
    // A chapter reference is usually the uid of another manifest entry; fall
    // back to treating it as a display name when it is not.
    let name = chapters.get(chapter).copied().unwrap_or(chapter);
    let dir = slugify(name);
    if dir.is_empty() {
        slugify(chapter)
    } else {
        dir
    }
}

fn assign(
    links: &mut LinkMap,
    taken: &mut BTreeSet<PathBuf>,
    uid: &str,
    title: &str,
    dir: Option<String>,
    policy: &LinkPolicy,
) {
    let mut stem = slugify(title);
    if stem.is_empty() {
        stem = slugify(uid);
    }
    if stem.is_empty() {
        stem = "note".to_string();
    }

    let path_for = |stem: &str| -> PathBuf {
        let file = format!("{stem}.md");
        match &dir {
            Some(d) => PathBuf::from(d).join(file),
            None => PathBuf::from(file),
        }
    };

    let mut path = path_for(&stem);
    let mut n = 2u32;
    while taken.contains(&path) {
        path = path_for(&format!("{stem}{}{n}", policy.collision_separator));
        n += 1;
    }

    taken.insert(path.clone());
    links.insert(uid.to_string(), path);
}
