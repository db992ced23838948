//! File watching for the JSON store.
//!
//! The sync layer rewrites the store whenever the server pushes new data. Watching the
//! file lets the driving loop reload within one debounce period instead of waiting for
//! the next marker poll.

use anyhow::{Context, Result};
use notify::{
    Config as NotifyConfig, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher,
};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use std::thread;
use std::time::{Duration, Instant};

use crate::common::constants::STORE_WATCH_DEBOUNCE_MS;
use crate::common::utils::private_path;
use crate::io::signals::SignalMessage;

/// Watches the store file and sends [`SignalMessage::Reload`] when it changes.
pub struct StoreWatcher {
    signal_sender: Sender<SignalMessage>,
    store_path: PathBuf,
    debug_enabled: bool,
}

impl StoreWatcher {
    pub fn new(signal_sender: Sender<SignalMessage>, store_path: &Path, debug_enabled: bool) -> Self {
        Self {
            signal_sender,
            store_path: store_path.to_path_buf(),
            debug_enabled,
        }
    }

    /// Spawn the watcher thread.
    ///
    /// The parent directory is watched rather than the file itself, so atomic
    /// replacements (write to a temp file, rename over) are seen too.
    pub fn start(self) -> Result<()> {
        let Some(watch_dir) = self.store_path.parent().map(Path::to_path_buf) else {
            anyhow::bail!("Store path {} has no parent directory", private_path(&self.store_path));
        };
        if !watch_dir.is_dir() {
            std::fs::create_dir_all(&watch_dir).with_context(|| {
                format!("Failed to create store directory {}", private_path(&watch_dir))
            })?;
        }

        let (tx, rx) = std::sync::mpsc::channel();
        let mut watcher = RecommendedWatcher::new(
            move |res: Result<Event, notify::Error>| {
                if let Ok(event) = res {
                    match event.kind {
                        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_) => {
                            let _ = tx.send(event);
                        }
                        _ => {}
                    }
                }
            },
            NotifyConfig::default(),
        )
        .context("Failed to create store watcher")?;

        watcher
            .watch(&watch_dir, RecursiveMode::NonRecursive)
            .with_context(|| format!("Failed to watch directory: {}", private_path(&watch_dir)))?;

        if self.debug_enabled {
            log_pipe!();
            log_debug!("Watching store for changes: {}", private_path(&self.store_path));
        }

        let StoreWatcher {
            signal_sender,
            store_path,
            debug_enabled,
        } = self;

        thread::spawn(move || {
            // The watcher stops when dropped
            let _watcher = watcher;
            let debounce = Duration::from_millis(STORE_WATCH_DEBOUNCE_MS);
            let mut last_reload: Option<Instant> = None;

            for event in rx {
                if !event.paths.iter().any(|p| affects_store(p, &store_path)) {
                    continue;
                }

                if last_reload.is_some_and(|at| at.elapsed() < debounce) {
                    continue;
                }

                if debug_enabled {
                    log_pipe!();
                    log_debug!("Store change detected, requesting reload");
                }

                if signal_sender.send(SignalMessage::Reload).is_err() {
                    // Driving loop has gone away
                    break;
                }
                last_reload = Some(Instant::now());
            }
        });

        Ok(())
    }
}

/// Whether a filesystem event path concerns the store file.
///
/// Matches the file itself and editor/sync temp files derived from its name
/// (`schedule.json.tmp`, `.schedule.json.swp`).
fn affects_store(event_path: &Path, store_path: &Path) -> bool {
    if event_path == store_path {
        return true;
    }
    if event_path.parent() != store_path.parent() {
        return false;
    }
    match (
        event_path.file_name().and_then(OsStr::to_str),
        store_path.file_name().and_then(OsStr::to_str),
    ) {
        (Some(event_name), Some(store_name)) => {
            event_name.trim_start_matches('.').starts_with(store_name)
        }
        _ => false,
    }
}

/// Start watching `store_path` for changes.
pub fn start_store_watcher(
    signal_sender: Sender<SignalMessage>,
    store_path: &Path,
    debug_enabled: bool,
) -> Result<()> {
    StoreWatcher::new(signal_sender, store_path, debug_enabled).start()
}
