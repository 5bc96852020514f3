//! File watcher that re-imports registered artifacts when they change.
//!
//! The watch registry file is itself watched: editing it (usually through
//! `import --watch`) triggers a reload that diffs the watch set instead of
//! rebuilding it, so unrelated subscriptions stay untouched.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use microcks_client::{ConnectOptions, MicrocksClient};
use microcks_shared::config::LocalConfig;
use microcks_shared::{MicrocksError, Result, WatchConfig, WatchEntry};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

#[derive(Debug)]
pub struct WatchManager {
    watcher: RecommendedWatcher,
    registry_path: PathBuf,
    config_path: PathBuf,
    options: ConnectOptions,
    /// Registered entries keyed by their normalized artifact path. Entries
    /// whose file cannot be watched stay in here so that a later reload
    /// retries them.
    entries: HashMap<PathBuf, WatchEntry>,
}

impl WatchManager {
    /// Sets up watches on the registry file and on every registered
    /// artifact. Returns the manager together with the event receiver that
    /// feeds [`WatchManager::run`]. Fails when the registry file does not
    /// exist yet.
    pub fn new(
        registry_path: PathBuf,
        config_path: PathBuf,
        options: ConnectOptions,
    ) -> Result<(Self, mpsc::Receiver<Event>)> {
        let registry_path = normalize_path(&registry_path);

        let (tx, rx) = mpsc::channel(100);
        let mut watcher =
            notify::recommended_watcher(move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if matches!(event.kind, EventKind::Modify(_)) {
                        let _ = tx.blocking_send(event);
                    }
                }
                Err(e) => warn!("watcher error: {e}"),
            })
            .map_err(|e| MicrocksError::Config(format!("cannot create file watcher: {e}")))?;

        watcher
            .watch(&registry_path, RecursiveMode::NonRecursive)
            .map_err(|e| {
                MicrocksError::Config(format!(
                    "cannot watch registry {}: {e} (import something with --watch first)",
                    registry_path.display()
                ))
            })?;

        let mut manager = WatchManager {
            watcher,
            registry_path,
            config_path,
            options,
            entries: HashMap::new(),
        };
        manager.reload()?;
        Ok((manager, rx))
    }

    /// Re-reads the registry and diffs the watch set against it: watches
    /// dropped from the file are removed, new ones added. A file that cannot
    /// be watched is logged and kept in the entry map.
    fn reload(&mut self) -> Result<()> {
        let registry = WatchConfig::read(&self.registry_path)?.unwrap_or_default();

        let mut incoming = HashMap::new();
        for entry in registry.entries {
            incoming.insert(normalize_path(Path::new(&entry.file_path)), entry);
        }

        for stale in self.entries.keys() {
            if !incoming.contains_key(stale) {
                debug!("unwatching {}", stale.display());
                let _ = self.watcher.unwatch(stale);
            }
        }

        for file in incoming.keys() {
            if !self.entries.contains_key(file) {
                debug!("watching {}", file.display());
                if let Err(e) = self.watcher.watch(file, RecursiveMode::NonRecursive) {
                    warn!("cannot watch file {}: {e}", file.display());
                }
            }
        }

        self.entries = incoming;
        Ok(())
    }

    /// Event loop. A write to the registry reloads the watch set, a write to
    /// an artifact spawns its re-import. Registry read errors propagate and
    /// stop the manager; everything else is logged and survived.
    pub async fn run(&mut self, mut events: mpsc::Receiver<Event>) -> Result<()> {
        while let Some(event) = events.recv().await {
            for path in &event.paths {
                let path = normalize_path(path);
                if path == self.registry_path {
                    info!("reloading watch registry");
                    self.reload()?;
                } else if let Some(entry) = self.entries.get(&path) {
                    let entry = entry.clone();
                    let config_path = self.config_path.clone();
                    let options = self.options.clone();
                    tokio::spawn(async move {
                        trigger_import(entry, &config_path, &options).await;
                    });
                }
            }
        }
        Ok(())
    }

    #[cfg(test)]
    fn watched_files(&self) -> Vec<PathBuf> {
        let mut files: Vec<_> = self.entries.keys().cloned().collect();
        files.sort();
        files
    }
}

/// Re-imports a changed artifact into every context it was registered in.
/// Failures are logged per context, one bad context does not block the rest.
async fn trigger_import(entry: WatchEntry, config_path: &Path, options: &ConnectOptions) {
    info!("re-importing changed file: {}", entry.file_path);

    for context in &entry.context {
        let client = match connect_for_context(context, config_path, options).await {
            Ok(client) => client,
            Err(e) => {
                warn!("cannot connect to Microcks in context '{context}': {e}");
                continue;
            }
        };

        match client
            .upload_artifact(Path::new(&entry.file_path), entry.main_artifact)
            .await
        {
            Ok(_) => info!(
                "successfully re-imported {} in context '{context}'",
                entry.file_path
            ),
            Err(e) => warn!("error re-importing {}: {e}", entry.file_path),
        }
    }
}

async fn connect_for_context(
    context: &str,
    config_path: &Path,
    options: &ConnectOptions,
) -> Result<MicrocksClient> {
    match LocalConfig::read(config_path)? {
        Some(mut local) => {
            MicrocksClient::from_context(&mut local, config_path, context, options).await
        }
        // Without a config file the context is taken as a bare server URL.
        None => MicrocksClient::new(context, options),
    }
}

/// Joins relative paths onto the working directory so that registry keys
/// and event paths compare equal regardless of how they were spelled.
fn normalize_path(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    match std::env::current_dir() {
        Ok(cwd) => cwd.join(path),
        Err(_) => path.to_path_buf(),
    }
}
