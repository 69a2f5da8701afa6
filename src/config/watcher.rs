//! Configuration file watcher for hot reload.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use arc_swap::ArcSwap;
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::loader::load_config;
use crate::config::schema::CoreConfig;

/// Watches a configuration file and sends every new valid version.
///
/// The parent directory is watched, not the file, so editors that save by
/// writing a temp file and renaming it over the original are picked up.
pub struct ConfigWatcher {
    path: PathBuf,
    update_tx: mpsc::UnboundedSender<CoreConfig>,
}

impl ConfigWatcher {
    /// Returns the watcher and the receiving end for reloaded configs.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<CoreConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        let watcher = Self {
            path: path.to_path_buf(),
            update_tx,
        };
        (watcher, update_rx)
    }

    /// Start watching. Dropping the returned watcher stops it.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."))
            .to_path_buf();
        let mut reloader = Reloader {
            path: self.path,
            tx: self.update_tx,
            last_sent: None,
        };
        let path = reloader.path.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if reloader.concerns(&event) => reloader.reload(),
                Ok(_) => {}
                Err(e) => tracing::error!(error = %e, "Config watch error"),
            },
            Config::default(),
        )?;
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?path, "Config watcher started");
        Ok(watcher)
    }
}

struct Reloader {
    path: PathBuf,
    tx: mpsc::UnboundedSender<CoreConfig>,
    last_sent: Option<CoreConfig>,
}

impl Reloader {
    fn concerns(&self, event: &Event) -> bool {
        (event.kind.is_modify() || event.kind.is_create())
            && event
                .paths
                .iter()
                .any(|p| p.file_name() == self.path.file_name())
    }

    fn reload(&mut self) {
        match load_config(&self.path) {
            Ok(config) if self.last_sent.as_ref() == Some(&config) => {}
            Ok(config) => {
                tracing::info!(path = ?self.path, "Config file changed, sending reload");
                self.last_sent = Some(config.clone());
                let _ = self.tx.send(config);
            }
            Err(e) => {
                tracing::warn!(path = ?self.path, error = %e, "Rejected config reload, keeping current");
            }
        }
    }
}

/// Live configuration shared across tasks.
#[derive(Clone)]
pub struct ConfigHandle {
    current: Arc<ArcSwap<CoreConfig>>,
}

impl ConfigHandle {
    pub fn new(config: CoreConfig) -> Self {
        Self {
            current: Arc::new(ArcSwap::from_pointee(config)),
        }
    }

    /// Snapshot of the configuration in effect right now.
    pub fn current(&self) -> Arc<CoreConfig> {
        self.current.load_full()
    }

    pub fn replace(&self, config: CoreConfig) {
        self.current.store(Arc::new(config));
    }

    /// Apply every update received on `updates` until the sender side closes.
    pub fn follow(&self, mut updates: mpsc::UnboundedReceiver<CoreConfig>) -> JoinHandle<()> {
        let handle = self.clone();
        tokio::spawn(async move {
            while let Some(config) = updates.recv().await {
                tracing::info!(
                    max_retries = config.retry.max_retries,
                    depth_limit = config.serializer.depth_limit,
                    "Applying reloaded configuration"
                );
                handle.replace(config);
            }
        })
    }
}

impl std::fmt::Debug for ConfigHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigHandle")
            .field("current", &self.current.load_full())
            .finish()
    }
}
