//! vinaya-notes: generates the Pali Canon Vinaya folder of cross-linked
//! markdown notes from SuttaCentral data.
//!
//! Two subcommands: `fetch` pulls the menu tree and segmented texts from the
//! SuttaCentral API into a local data directory; `generate` runs the
//! load → resolve → render pipeline over that directory and writes one
//! markdown note per canonical unit.
//!
//! Exit codes: 0 on full success, 1 on a fatal load/fetch failure, 2 when
//! the run completed but one or more notes failed to write.

pub mod config;
pub mod fetch;
pub mod generate;
pub mod load_config;
pub mod loader;
pub mod renderer;
pub mod resolver;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;

use fetch::{fetch_dataset, FetchConfig, SuttaCentralClient};
use generate::generate;
use load_config::{load_config, CliOverrides, DEFAULT_DATA_DIR, DEFAULT_OUTPUT_DIR};

/// Exit code when the run completed but some notes failed to write.
pub const EXIT_PARTIAL_FAILURE: i32 = 2;

#[derive(Parser)]
#[clap(
    name = "vinaya-notes",
    version,
    about = "Generate the Pali Canon Vinaya folder of cross-linked markdown notes"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate the markdown notes folder from the local data directory
    Generate {
        /// Output directory for the generated notes
        #[clap(default_value = DEFAULT_OUTPUT_DIR)]
        outputdir: PathBuf,
        /// Path to an optional YAML policy/config file
        #[clap(long)]
        config: Option<PathBuf>,
        /// Data directory holding the fetched artifacts
        #[clap(long)]
        data_dir: Option<PathBuf>,
        /// Remove the output directory first if it already exists
        #[clap(long)]
        force: bool,
    },
    /// Fetch SuttaCentral data into the local data directory
    Fetch {
        /// Data directory to write the artifacts into
        #[clap(long, default_value = DEFAULT_DATA_DIR)]
        data_dir: PathBuf,
        /// Root menu uid to walk
        #[clap(long, default_value = "pli-tv-bu-vb")]
        uid: String,
    },
}

/// Extracted CLI logic entrypoint for integration tests and main().
///
/// Returns the process exit code on a completed run; fatal failures
/// (load/fetch errors) surface as `Err` and map to exit code 1 in main.
pub async fn run(cli: Cli) -> Result<i32> {
    info!("trace_initialised");

    match cli.command {
        Commands::Generate { outputdir, config, data_dir, force } => {
            let config = load_config(
                config.as_deref(),
                CliOverrides { output_dir: Some(outputdir), data_dir, force },
            )?;
            println!("Generating Vinaya notes...");
            match generate(&config) {
                Ok(report) => {
                    println!(
                        "Generation complete: {} notes written, {} failed, {} unresolved references.",
                        report.notes_written.len(),
                        report.failures.len(),
                        report.unresolved_refs
                    );
                    if report.failures.is_empty() {
                        Ok(0)
                    } else {
                        eprintln!("[ERROR] Some notes could not be written:");
                        for failure in &report.failures {
                            eprintln!("  {}: {}", failure.uid, failure.error);
                        }
                        Ok(EXIT_PARTIAL_FAILURE)
                    }
                }
                Err(e) => {
                    eprintln!("[ERROR] Generation failed: {}", e);
                    Err(anyhow::Error::new(e))
                }
            }
        }
        Commands::Fetch { data_dir, uid } => {
            let client = SuttaCentralClient::new(data_dir.join(".cache"));
            let config = FetchConfig { data_dir, root_uid: uid };
            println!("Fetching SuttaCentral data...");
            match fetch_dataset(&client, &config).await {
                Ok(report) => {
                    println!("Fetch complete.\nReport:");
                    println!("{:#?}", report);
                    Ok(0)
                }
                Err(e) => {
                    eprintln!("[ERROR] Fetch failed: {}", e);
                    Err(anyhow::Error::new(e))
                }
            }
        }
    }
}
