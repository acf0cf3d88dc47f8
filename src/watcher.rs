//! Filesystem watcher for the vault and decision directories.
//!
//! One `notify` watcher per directory, kept alive as long as the returned
//! [`ChangeWatcher`]. Events are not debounced: a burst of writes produces a
//! burst of identical change events, which consumers treat as cheap
//! invalidation hints.

use std::path::{Path, PathBuf};

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::models::{ChangeEvent, ChangeKind};
use crate::store::is_yaml_file;

/// Holds the active directory watches. Dropping it stops them.
pub struct ChangeWatcher {
    watches: Vec<(ChangeKind, PathBuf, RecommendedWatcher)>,
}

impl ChangeWatcher {
    /// Watch both directories, sending classified events to `sender`.
    ///
    /// A directory that cannot be watched is logged and skipped; the other
    /// one keeps working and the dashboard falls back to manual refresh.
    pub fn start(
        seeds_dir: &Path,
        decisions_dir: &Path,
        sender: mpsc::UnboundedSender<ChangeEvent>,
    ) -> Self {
        let mut watches = Vec::new();

        for (kind, dir) in [
            (ChangeKind::VaultUpdated, seeds_dir),
            (ChangeKind::DecisionUpdated, decisions_dir),
        ] {
            match watch_dir(dir, kind, sender.clone()) {
                Ok(watcher) => {
                    tracing::info!("Watching {} for {}", dir.display(), kind.as_str());
                    watches.push((kind, dir.to_path_buf(), watcher));
                }
                Err(e) => {
                    tracing::warn!(
                        "Could not watch {}: {} (live updates disabled for it)",
                        dir.display(),
                        e
                    );
                }
            }
        }

        Self { watches }
    }

    pub fn is_watching(&self, kind: ChangeKind) -> bool {
        self.watches.iter().any(|(k, _, _)| *k == kind)
    }

    pub fn watched_dirs(&self) -> impl Iterator<Item = &Path> {
        self.watches.iter().map(|(_, dir, _)| dir.as_path())
    }
}

fn watch_dir(
    dir: &Path,
    kind: ChangeKind,
    sender: mpsc::UnboundedSender<ChangeEvent>,
) -> notify::Result<RecommendedWatcher> {
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
        Ok(event) => {
            for change in classify(kind, &event) {
                tracing::info!(kind = kind.as_str(), file = %change.file, "File changed");
                if sender.send(change).is_err() {
                    return;
                }
            }
        }
        Err(e) => tracing::warn!("Watch error for {}: {}", kind.as_str(), e),
    })?;

    watcher.watch(dir, RecursiveMode::NonRecursive)?;
    Ok(watcher)
}

/// Turn a raw filesystem event into change events, keeping only
/// create/modify/remove events on YAML files.
pub fn classify(kind: ChangeKind, event: &Event) -> Vec<ChangeEvent> {
    let relevant = matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    );
    if !relevant {
        return Vec::new();
    }

    event
        .paths
        .iter()
        .filter_map(|path| path.file_name()?.to_str())
        .filter(|name| is_yaml_file(name))
        .map(|name| ChangeEvent::new(kind, name))
        .collect()
}
