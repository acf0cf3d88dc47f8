//! File store reader over the seed vault and decision directories.
//!
//! Nothing is cached: every call reads the directory or file fresh. Only
//! files ending in `.yaml` or `.yml` participate.

pub mod document;

use std::io;
use std::path::{Component, Path, PathBuf};

use futures::future::join_all;
use thiserror::Error;

use crate::config::DashboardConfig;
use crate::models::{DecisionInfo, VaultInfo};

/// Errors from reading a single document.
///
/// Callers over HTTP collapse all of these into "not found"; the variants
/// exist so the cause can be logged.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid name: {0:?}")]
    InvalidName(String),

    #[error("no such document: {}", .0.display())]
    NotFound(PathBuf),

    #[error("document is empty: {}", .0.display())]
    Empty(PathBuf),

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

impl StoreError {
    /// True when nothing exists under the requested name, as opposed to a
    /// file that exists but could not be read or parsed.
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::InvalidName(_) | Self::NotFound(_))
    }
}

/// Strip a `.yaml` / `.yml` extension, or `None` if the name has neither.
pub fn strip_yaml_extension(file: &str) -> Option<&str> {
    file.strip_suffix(".yaml")
        .or_else(|| file.strip_suffix(".yml"))
}

pub fn is_yaml_file(file: &str) -> bool {
    strip_yaml_extension(file).is_some()
}

/// Vault names are word characters only.
pub fn is_valid_vault_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Decision ids may contain `/`-separated segments, but each one must be a
/// plain file or directory name, so the id stays inside the decision
/// directory. Drive prefixes and roots only count where the platform has them.
pub fn is_valid_decision_id(id: &str) -> bool {
    !id.is_empty()
        && !id.contains(['\\', '\0'])
        && id.split('/').all(|segment| {
            let mut components = Path::new(segment).components();
            matches!(
                (components.next(), components.next()),
                (Some(Component::Normal(_)), None)
            )
        })
}

#[derive(Debug, Clone)]
pub struct FileStore {
    seeds_dir: PathBuf,
    decisions_dir: PathBuf,
}

impl FileStore {
    pub fn new(seeds_dir: impl Into<PathBuf>, decisions_dir: impl Into<PathBuf>) -> Self {
        Self {
            seeds_dir: seeds_dir.into(),
            decisions_dir: decisions_dir.into(),
        }
    }

    pub fn from_config(config: &DashboardConfig) -> Self {
        Self::new(&config.seeds_dir, &config.decisions_dir)
    }

    // ============================================================
    // Vaults
    // ============================================================

    /// List vaults by name. An unreadable directory yields an empty list.
    pub async fn list_vaults(&self) -> Vec<VaultInfo> {
        list_yaml_files(&self.seeds_dir)
            .await
            .into_iter()
            .map(|file| VaultInfo {
                name: identity(&file).to_string(),
                file,
            })
            .collect()
    }

    pub async fn get_vault(&self, name: &str) -> Result<serde_json::Value, StoreError> {
        if !is_valid_vault_name(name) {
            return Err(StoreError::InvalidName(name.to_string()));
        }
        read_document(&self.seeds_dir, name).await
    }

    // ============================================================
    // Decisions
    // ============================================================

    /// List decisions newest first (descending file name). The first entry
    /// is flagged `latest`. Summaries of unparseable files are `None`.
    pub async fn list_decisions(&self) -> Vec<DecisionInfo> {
        let mut files = list_yaml_files(&self.decisions_dir).await;
        files.reverse();

        let summaries = join_all(files.iter().map(|file| async move {
            match read_file(&self.decisions_dir.join(file)).await {
                Ok(doc) => summary_of(&doc),
                Err(e) => {
                    tracing::warn!("Skipping summary for {}: {}", file, e);
                    None
                }
            }
        }))
        .await;

        files
            .into_iter()
            .zip(summaries)
            .enumerate()
            .map(|(index, (file, summary))| DecisionInfo {
                id: identity(&file).to_string(),
                file,
                summary,
                latest: index == 0,
            })
            .collect()
    }

    pub async fn get_decision(&self, id: &str) -> Result<serde_json::Value, StoreError> {
        if !is_valid_decision_id(id) {
            return Err(StoreError::InvalidName(id.to_string()));
        }
        read_document(&self.decisions_dir, id).await
    }
}

fn identity(file: &str) -> &str {
    strip_yaml_extension(file).unwrap_or(file)
}

fn summary_of(doc: &serde_json::Value) -> Option<String> {
    doc.get("summary")?.as_str().map(str::to_string)
}

/// YAML file names in `dir`, sorted ascending. Fails soft to empty.
async fn list_yaml_files(dir: &Path) -> Vec<String> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!("Cannot list {}: {}", dir.display(), e);
            return Vec::new();
        }
    };

    let mut files = Vec::new();
    loop {
        match entries.next_entry().await {
            Ok(Some(entry)) => {
                if entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false) {
                    continue;
                }
                if let Some(name) = entry.file_name().to_str() {
                    if is_yaml_file(name) {
                        files.push(name.to_string());
                    }
                }
            }
            Ok(None) => break,
            Err(e) => {
                tracing::warn!("Error while listing {}: {}", dir.display(), e);
                break;
            }
        }
    }

    files.sort();
    files
}

/// Read `<stem>.yaml`, falling back to `<stem>.yml`.
async fn read_document(dir: &Path, stem: &str) -> Result<serde_json::Value, StoreError> {
    let primary = dir.join(format!("{}.yaml", stem));
    match read_file(&primary).await {
        Err(StoreError::NotFound(_)) => {
            let fallback = dir.join(format!("{}.yml", stem));
            match read_file(&fallback).await {
                Err(StoreError::NotFound(_)) => Err(StoreError::NotFound(primary)),
                other => other,
            }
        }
        other => other,
    }
}

async fn read_file(path: &Path) -> Result<serde_json::Value, StoreError> {
    let text = match tokio::fs::read_to_string(path).await {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(StoreError::NotFound(path.to_path_buf()))
        }
        Err(source) => {
            return Err(StoreError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    if document::is_blank(&text) {
        return Err(StoreError::Empty(path.to_path_buf()));
    }

    let doc = document::parse(&text).map_err(|source| StoreError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    if doc.is_null() {
        return Err(StoreError::Empty(path.to_path_buf()));
    }
    Ok(doc)
}
