use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info};

/// Full configuration for one generation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateConfig {
    /// Directory holding the fetched data artifacts (manifest, glossary, sections).
    pub data_dir: PathBuf,
    /// Directory the markdown notes are written into.
    pub output_dir: PathBuf,
    /// Remove an existing output directory instead of refusing to run.
    #[serde(default)]
    pub force: bool,
    #[serde(default)]
    pub links: LinkPolicy,
}

impl GenerateConfig {
    pub fn trace_loaded(&self) {
        info!(
            data_dir = %self.data_dir.display(),
            output_dir = %self.output_dir.display(),
            force = self.force,
            "Loaded GenerateConfig"
        );
        debug!(?self, "GenerateConfig loaded (full debug)");
    }
}

/// Source-specific conventions for embedded references and path collisions.
///
/// The marker syntax and the collision-disambiguation rule vary between
/// upstream datasets, so both are policy rather than hard-coded behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkPolicy {
    /// Opening marker of an embedded reference in body text.
    #[serde(default = "default_open_marker")]
    pub open_marker: String,
    /// Closing marker of an embedded reference in body text.
    #[serde(default = "default_close_marker")]
    pub close_marker: String,
    /// Separator inserted before the numeric suffix when two units
    /// normalise to the same output path.
    #[serde(default = "default_collision_separator")]
    pub collision_separator: String,
}

fn default_open_marker() -> String {
    "[[".to_string()
}

fn default_close_marker() -> String {
    "]]".to_string()
}

fn default_collision_separator() -> String {
    "-".to_string()
}

impl Default for LinkPolicy {
    fn default() -> Self {
        LinkPolicy {
            open_marker: default_open_marker(),
            close_marker: default_close_marker(),
            collision_separator: default_collision_separator(),
        }
    }
}
