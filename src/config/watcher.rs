//! Hot reload of the configuration file.
//!
//! # Responsibilities
//! - Watch the directory holding the config file, so editors that replace
//!   the file on save are still seen
//! - Re-read and validate the file when it changes
//! - Forward configurations whose text differs from the last one sent
//!
//! # Design Decisions
//! - Rule compilation happens downstream; this module only checks the
//!   file parses and validates
//! - A file that fails to load never replaces the last good text, so
//!   reverting to it is a no-op

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::config::loader::{parse_config, ConfigError};
use crate::config::schema::ResolverConfig;

/// Decides whether the file on disk holds a new configuration.
#[derive(Debug)]
pub struct ReloadGate {
    path: PathBuf,
    applied: Option<String>,
}

impl ReloadGate {
    /// Start from the file's current text, which is assumed to be live.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            applied: fs::read_to_string(path).ok(),
        }
    }

    /// `None` when the text is unchanged since the last accepted load.
    pub fn check(&mut self) -> Option<Result<ResolverConfig, ConfigError>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) => return Some(Err(ConfigError::Io(e))),
        };
        if self.applied.as_deref() == Some(content.as_str()) {
            return None;
        }

        let result = parse_config(&content);
        if result.is_ok() {
            self.applied = Some(content);
        }
        Some(result)
    }

    fn concerns(&self, event: &Event) -> bool {
        let name = self.path.file_name();
        event.paths.iter().any(|p| p.file_name() == name)
    }
}

/// Sends a validated [`ResolverConfig`] whenever the file changes.
pub struct ConfigWatcher {
    gate: ReloadGate,
    update_tx: mpsc::UnboundedSender<ResolverConfig>,
}

impl ConfigWatcher {
    /// Returns the watcher and the receiving end of its updates.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<ResolverConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        let watcher = Self {
            gate: ReloadGate::new(path),
            update_tx,
        };
        (watcher, update_rx)
    }

    /// Start watching. Updates stop when the returned handle is dropped.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let Self { mut gate, update_tx } = self;
        let dir = match gate.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let path = gate.path.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| {
                let event = match res {
                    Ok(event) => event,
                    Err(e) => {
                        tracing::error!(error = %e, "Config watch error");
                        return;
                    }
                };
                if !(event.kind.is_modify() || event.kind.is_create()) || !gate.concerns(&event) {
                    return;
                }

                match gate.check() {
                    None => tracing::debug!("Config file touched without changes"),
                    Some(Ok(config)) => {
                        tracing::info!(
                            site_rules = config.rules.len(),
                            cp_rules = config.cp_rules.len(),
                            "Config file changed, reloading"
                        );
                        if update_tx.send(config).is_err() {
                            tracing::warn!("Config update dropped, server no longer listening");
                        }
                    }
                    Some(Err(e)) => {
                        tracing::error!(error = %e, "Config file rejected, keeping current rules");
                    }
                }
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&dir, RecursiveMode::NonRecursive)?;

        tracing::info!(path = %path.display(), "Config watcher started");
        Ok(watcher)
    }
}
