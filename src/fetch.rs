//! Fetches SuttaCentral data and converts it into the loader's artifacts.
//!
//! The menu API provides the rule categories and the rules inside each
//! category (the manifest); the bilara API provides the segmented text of
//! each rule (the canonical sections). Responses are cached on disk so a
//! re-run after a partial fetch skips the network entirely.
//!
//! The API is behind the [`TextApi`] trait so tests can substitute a mock
//! instead of a live endpoint.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::loader::{CanonicalSection, ManifestEntry, GLOSSARY_FILE, MANIFEST_FILE, SECTIONS_FILE};

const MENU_URL: &str = "https://suttacentral.net/api/menu/{uid}?language=en";
const BILARA_URL: &str = "https://suttacentral.net/api/bilarasuttas/{uid}/brahmali?lang=en";

/// Fetch configuration - which text tree to walk and where to put the artifacts.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub data_dir: PathBuf,
    /// Root uid of the menu tree (e.g. `pli-tv-bu-vb` for the bhikkhu Vibhaṅga).
    pub root_uid: String,
}

/// Fatal fetch failure. Same no-partial rule as the loader: either all
/// artifacts are produced or the subcommand fails.
#[derive(Debug)]
pub enum FetchError {
    Http(reqwest::Error),
    Io(std::io::Error),
    Parse(serde_json::Error),
    Api { uid: String, detail: String },
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        FetchError::Http(e)
    }
}

impl From<std::io::Error> for FetchError {
    fn from(e: std::io::Error) -> Self {
        FetchError::Io(e)
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(e: serde_json::Error) -> Self {
        FetchError::Parse(e)
    }
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchError::Http(e) => write!(f, "http request failed: {}", e),
            FetchError::Io(e) => write!(f, "io error: {}", e),
            FetchError::Parse(e) => write!(f, "response is not valid JSON: {}", e),
            FetchError::Api { uid, detail } => {
                write!(f, "unexpected API response for {}: {}", uid, detail)
            }
        }
    }
}

impl std::error::Error for FetchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FetchError::Http(e) => Some(e),
            FetchError::Io(e) => Some(e),
            FetchError::Parse(e) => Some(e),
            FetchError::Api { .. } => None,
        }
    }
}

/// Read access to the SuttaCentral text APIs.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait TextApi: Send + Sync {
    /// Menu entry for `uid`, including its direct children.
    async fn menu(&self, uid: &str) -> Result<Value, FetchError>;
    /// Segmented root/translation text of the unit at `uid`.
    async fn bilara_text(&self, uid: &str) -> Result<Value, FetchError>;
}

/// Live client with an on-disk response cache keyed by URL hash.
pub struct SuttaCentralClient {
    http: reqwest::Client,
    cache_dir: PathBuf,
}

impl SuttaCentralClient {
    pub fn new(cache_dir: PathBuf) -> Self {
        SuttaCentralClient {
            http: reqwest::Client::new(),
            cache_dir,
        }
    }

    /// File stem of the cache entry for `url`.
    pub fn cache_key(url: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(url.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    async fn cached_get(&self, url: &str) -> Result<Value, FetchError> {
        let cache_path = self.cache_dir.join(format!("{}.json", Self::cache_key(url)));
        if cache_path.exists() {
            debug!(url, cache = %cache_path.display(), "Cache hit");
            let content = fs::read_to_string(&cache_path)?;
            return Ok(serde_json::from_str(&content)?);
        }

        info!(url, "Fetching");
        let response = self.http.get(url).send().await?.error_for_status()?;
        let value: Value = response.json().await?;

        fs::create_dir_all(&self.cache_dir)?;
        fs::write(&cache_path, serde_json::to_string(&value)?)?;
        debug!(url, cache = %cache_path.display(), "Cached response");
        Ok(value)
    }
}

#[async_trait]
impl TextApi for SuttaCentralClient {
    async fn menu(&self, uid: &str) -> Result<Value, FetchError> {
        self.cached_get(&MENU_URL.replace("{uid}", uid)).await
    }

    async fn bilara_text(&self, uid: &str) -> Result<Value, FetchError> {
        self.cached_get(&BILARA_URL.replace("{uid}", uid)).await
    }
}

/// Summary of one fetch run.
#[derive(Debug)]
pub struct FetchReport {
    pub categories: usize,
    pub rules: usize,
    pub sections: usize,
}

/// Walks the menu tree under `root_uid` and writes the three loader
/// artifacts into the data directory.
///
/// An existing glossary artifact is left untouched; when none is present an
/// empty one is written so a generation run can proceed without the
/// companion glossary files.
pub async fn fetch_dataset<A>(api: &A, config: &FetchConfig) -> Result<FetchReport, FetchError>
where
    A: TextApi,
{
    info!(root = %config.root_uid, data_dir = %config.data_dir.display(), "[FETCH] Starting fetch");

    let categories = menu_children(api, &config.root_uid).await?;

    let mut manifest: Vec<ManifestEntry> = Vec::new();
    let mut sections: Vec<CanonicalSection> = Vec::new();

    for (i, category) in categories.iter().enumerate() {
        let (cat_uid, cat_title) = menu_item_parts(category, &config.root_uid)?;
        manifest.push(ManifestEntry {
            uid: cat_uid.clone(),
            title: cat_title.clone(),
            chapter: None,
            order: i as u32,
        });

        info!(category = %cat_title, "[FETCH] Fetching rules for category");
        let rules = menu_children(api, &cat_uid).await?;
        for (j, rule) in rules.iter().enumerate() {
            let (rule_uid, rule_title) = menu_item_parts(rule, &cat_uid)?;
            manifest.push(ManifestEntry {
                uid: rule_uid.clone(),
                title: rule_title.clone(),
                chapter: Some(cat_uid.clone()),
                order: j as u32,
            });

            let text = api.bilara_text(&rule_uid).await?;
            sections.push(section_from_bilara(&rule_uid, &rule_title, &text)?);
        }
    }

    fs::create_dir_all(&config.data_dir)?;
    write_artifact(&config.data_dir, MANIFEST_FILE, &manifest)?;
    write_artifact(&config.data_dir, SECTIONS_FILE, &sections)?;

    let glossary_path = config.data_dir.join(GLOSSARY_FILE);
    if !glossary_path.exists() {
        warn!(path = %glossary_path.display(), "[FETCH] No glossary artifact present, writing an empty one");
        let empty: BTreeMap<String, String> = BTreeMap::new();
        write_artifact(&config.data_dir, GLOSSARY_FILE, &empty)?;
    }

    let report = FetchReport {
        categories: categories.len(),
        rules: manifest.len() - categories.len(),
        sections: sections.len(),
    };
    info!(?report, "[FETCH] Fetch complete");
    Ok(report)
}

async fn menu_children<A: TextApi>(api: &A, uid: &str) -> Result<Vec<Value>, FetchError> {
    let menu = api.menu(uid).await?;
    menu.get(0)
        .and_then(|v| v.get("children"))
        .and_then(|v| v.as_array())
        .cloned()
        .ok_or_else(|| FetchError::Api {
            uid: uid.to_string(),
            detail: "menu response has no children array".to_string(),
        })
}

fn menu_item_parts(item: &Value, parent_uid: &str) -> Result<(String, String), FetchError> {
    let uid = item
        .get("uid")
        .and_then(|v| v.as_str())
        .ok_or_else(|| FetchError::Api {
            uid: parent_uid.to_string(),
            detail: "menu child is missing its uid".to_string(),
        })?;
    let title = [item.get("root_name"), item.get("translated_name")]
        .into_iter()
        .flatten()
        .filter_map(|v| v.as_str())
        .find(|s| !s.is_empty())
        .unwrap_or(uid);
    Ok((uid.to_string(), title.to_string()))
}

/// Flattens a bilara response into a section body: one paragraph per
/// segment of translation text, in `keys_order` order.
fn section_from_bilara(
    uid: &str,
    title: &str,
    text: &Value,
) -> Result<CanonicalSection, FetchError> {
    let keys_order = text
        .get("keys_order")
        .and_then(|v| v.as_array())
        .ok_or_else(|| FetchError::Api {
            uid: uid.to_string(),
            detail: "bilara response has no keys_order".to_string(),
        })?;
    let translations = text
        .get("translation_text")
        .and_then(|v| v.as_object())
        .ok_or_else(|| FetchError::Api {
            uid: uid.to_string(),
            detail: "bilara response has no translation_text".to_string(),
        })?;

    let mut body = String::new();
    for key in keys_order {
        let Some(key) = key.as_str() else { continue };
        let Some(line) = translations.get(key).and_then(|v| v.as_str()) else {
            continue;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if !body.is_empty() {
            body.push_str("\n\n");
        }
        body.push_str(line);
    }

    Ok(CanonicalSection {
        uid: uid.to_string(),
        title: Some(title.to_string()),
        body,
        refs: Vec::new(),
    })
}

fn write_artifact<T: serde::Serialize>(
    dir: &Path,
    name: &str,
    value: &T,
) -> Result<(), FetchError> {
    let path = dir.join(name);
    fs::write(&path, serde_json::to_string_pretty(value)?)?;
    info!(path = %path.display(), "[FETCH] Wrote artifact");
    Ok(())
}
