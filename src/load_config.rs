use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::Deserialize;
use tracing::{error, info};

use crate::config::{GenerateConfig, LinkPolicy};

/// Static YAML config file: every field optional, CLI arguments win.
#[derive(Deserialize, Default)]
struct StaticConfig {
    #[serde(default)]
    data_dir: Option<PathBuf>,
    #[serde(default)]
    output_dir: Option<PathBuf>,
    #[serde(default)]
    links: Option<LinkPolicy>,
}

/// Arguments taken from the command line, overriding the config file.
#[derive(Debug, Default)]
pub struct CliOverrides {
    pub output_dir: Option<PathBuf>,
    pub data_dir: Option<PathBuf>,
    pub force: bool,
}

/// Default output folder when neither the CLI nor the config file names one.
pub const DEFAULT_OUTPUT_DIR: &str = "Canon (Pali)";
/// Default data directory holding the fetched artifacts.
pub const DEFAULT_DATA_DIR: &str = "data";

/// Loads the optional YAML config file and merges it with CLI overrides
/// into a fully populated [`GenerateConfig`].
pub fn load_config(path: Option<&Path>, overrides: CliOverrides) -> Result<GenerateConfig> {
    let static_conf = match path {
        Some(path) => {
            info!(config_path = ?path, "Loading configuration from file");
            let content = match fs::read_to_string(path) {
                Ok(content) => content,
                Err(e) => {
                    error!(error = ?e, config_path = ?path, "Failed to read config file");
                    return Err(anyhow::anyhow!(
                        "Failed to read config file {:?}: {}",
                        path,
                        e
                    ));
                }
            };
            match serde_yaml::from_str::<StaticConfig>(&content) {
                Ok(conf) => {
                    info!(config_path = ?path, "Parsed config YAML successfully");
                    conf
                }
                Err(e) => {
                    error!(error = ?e, config_path = ?path, "Failed to parse config YAML");
                    return Err(anyhow::anyhow!("Failed to parse config YAML: {e}"));
                }
            }
        }
        None => StaticConfig::default(),
    };

    let config = GenerateConfig {
        data_dir: overrides
            .data_dir
            .or(static_conf.data_dir)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR)),
        output_dir: overrides
            .output_dir
            .or(static_conf.output_dir)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
        force: overrides.force,
        links: static_conf.links.unwrap_or_default(),
    };
    config.trace_loaded();
    Ok(config)
}
