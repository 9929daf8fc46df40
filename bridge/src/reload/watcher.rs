//! File watching for script assets

use crate::config::{has_script_extension, BridgeConfig};
use crate::error::{BridgeError, BridgeResult};
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Watches a scripts directory and queues changed script paths
///
/// Changes are collected on a background thread and drained from the frame
/// loop with [`ScriptWatcher::poll_changes`].
pub struct ScriptWatcher {
    _watcher: RecommendedWatcher,
    root: PathBuf,
    changes: Receiver<PathBuf>,
    control_handle: Option<WatcherControlHandle>,
}

struct WatcherControlHandle {
    stop_sender: Sender<()>,
    thread_handle: thread::JoinHandle<()>,
}

/// Collects script paths and releases each once it has been quiet for `debounce`
struct EventFilter {
    extensions: Vec<String>,
    debounce: Duration,
    pending: HashMap<PathBuf, Instant>,
}

impl EventFilter {
    /// Note the script paths touched by `event`
    fn record(&mut self, event: &Event, now: Instant) {
        if !(event.kind.is_create() || event.kind.is_modify()) {
            return;
        }
        for path in &event.paths {
            if !has_script_extension(path, &self.extensions) {
                continue;
            }
            if self.pending.insert(path.clone(), now).is_some() {
                debug!(path = ?path, "Debouncing rapid file changes");
            }
        }
    }

    /// Paths whose last change is at least `debounce` old, in sorted order
    fn ready(&mut self, now: Instant) -> Vec<PathBuf> {
        let mut ready: Vec<PathBuf> = self
            .pending
            .iter()
            .filter(|(_, last)| now.duration_since(**last) >= self.debounce)
            .map(|(path, _)| path.clone())
            .collect();
        for path in &ready {
            self.pending.remove(path);
        }
        ready.sort();
        ready
    }
}

impl ScriptWatcher {
    pub fn new(
        root: impl AsRef<Path>,
        extensions: Vec<String>,
        recursive: bool,
        debounce: Duration,
    ) -> BridgeResult<Self> {
        let root = root.as_ref().to_path_buf();
        info!(path = ?root, "Creating script watcher");

        let (event_tx, event_rx) = mpsc::channel::<Event>();
        let (change_tx, change_rx) = mpsc::channel::<PathBuf>();
        let (stop_tx, stop_rx) = mpsc::channel::<()>();

        let mut watcher = RecommendedWatcher::new(
            move |res| match res {
                Ok(event) => {
                    if let Err(e) = event_tx.send(event) {
                        error!(error = %e, "Failed to send file event");
                    }
                }
                Err(e) => error!(error = %e, "File watcher error"),
            },
            Config::default(),
        )?;

        let mode = if recursive {
            RecursiveMode::Recursive
        } else {
            RecursiveMode::NonRecursive
        };
        watcher.watch(&root, mode)?;
        debug!(watch_path = ?root, recursive, "Started watching for script changes");

        let filter = EventFilter {
            extensions,
            debounce,
            pending: HashMap::new(),
        };
        let thread_handle = thread::spawn(move || {
            Self::event_loop(filter, event_rx, change_tx, stop_rx);
        });

        Ok(Self {
            _watcher: watcher,
            root,
            changes: change_rx,
            control_handle: Some(WatcherControlHandle {
                stop_sender: stop_tx,
                thread_handle,
            }),
        })
    }

    /// Watch the configured scripts directory
    pub fn from_config(config: &BridgeConfig) -> BridgeResult<Self> {
        Self::new(
            config.scripts_root(),
            config.script_extensions.clone(),
            config.scan_subdirectories,
            Duration::from_millis(config.watch.debounce_ms),
        )
    }

    fn event_loop(
        mut filter: EventFilter,
        event_rx: Receiver<Event>,
        change_tx: Sender<PathBuf>,
        stop_rx: Receiver<()>,
    ) {
        let tick = filter.debounce.clamp(Duration::from_millis(10), Duration::from_millis(100));
        loop {
            if stop_rx.try_recv().is_ok() {
                debug!("Script watcher received stop signal");
                break;
            }

            match event_rx.recv_timeout(tick) {
                Ok(event) => {
                    debug!(event_kind = ?event.kind, paths = ?event.paths, "File event");
                    filter.record(&event, Instant::now());
                }
                Err(mpsc::RecvTimeoutError::Timeout) => {}
                Err(mpsc::RecvTimeoutError::Disconnected) => {
                    debug!("Event channel disconnected, stopping watcher");
                    break;
                }
            }

            for path in filter.ready(Instant::now()) {
                debug!(path = ?path, "Script changed");
                if change_tx.send(path).is_err() {
                    debug!("Change receiver dropped, stopping watcher");
                    return;
                }
            }
        }

        info!("Script watcher event loop stopped");
    }

    /// Drain queued changes, each path once, in sorted order
    pub fn poll_changes(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = self.changes.try_iter().collect();
        paths.sort();
        paths.dedup();
        paths
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Stop the watcher thread and wait for it to finish
    pub fn stop(mut self) -> BridgeResult<()> {
        if let Some(control) = self.control_handle.take() {
            info!(path = ?self.root, "Stopping script watcher");

            if let Err(e) = control.stop_sender.send(()) {
                warn!(error = %e, "Failed to send stop signal to watcher thread");
            }

            if control.thread_handle.join().is_err() {
                return Err(BridgeError::InvalidState(
                    "script watcher thread panicked".into(),
                ));
            }

            info!("Script watcher stopped");
        }
        Ok(())
    }
}

impl Drop for ScriptWatcher {
    fn drop(&mut self) {
        if let Some(control) = self.control_handle.take() {
            warn!("ScriptWatcher dropped without calling stop() - forcing stop");
            let _ = control.stop_sender.send(());
        }
    }
}
