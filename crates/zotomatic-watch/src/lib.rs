mod error;
mod scan;
mod stability;

pub use error::WatcherError;
pub use scan::ScanStats;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use notify::{RecursiveMode, Watcher};
use notify_debouncer_full::{new_debouncer, DebounceEventResult};
use tokio_util::sync::CancellationToken;
use zotomatic_storage::StateStore;

/// Receives paths delivered by a [`PdfWatcher`], either during the initial
/// scan or from a steady-state filesystem event (`spec.md` §4.7).
pub trait PdfEventSink: Send + Sync {
    fn on_pdf_created(&self, path: PathBuf);

    /// Invoked exactly once, after the initial walk completes.
    fn on_initial_scan_complete(&self) {}
}

#[derive(Debug, Clone)]
pub struct PdfWatcherConfig {
    pub root: PathBuf,
    pub recursive: bool,
    pub glob_pattern: String,
    pub force: bool,
    pub stability_poll_interval: Duration,
    pub stability_required_polls: u32,
}

impl Default for PdfWatcherConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::new(),
            recursive: true,
            glob_pattern: "*.pdf".to_string(),
            force: false,
            stability_poll_interval: Duration::from_millis(200),
            stability_required_polls: 3,
        }
    }
}

/// Recursive scan plus steady-state filesystem event watcher over a PDF
/// library directory (`spec.md` §4.7, C7).
pub struct PdfWatcher {
    config: PdfWatcherConfig,
    store: Arc<StateStore>,
}

impl PdfWatcher {
    pub fn new(config: PdfWatcherConfig, store: Arc<StateStore>) -> Self {
        Self { config, store }
    }

    /// Runs the startup sequence then the steady-state event loop until
    /// `stop` is cancelled. Blocking — callers run this on a dedicated
    /// thread (e.g. `tokio::task::spawn_blocking`). The underlying
    /// filesystem subscription is a scoped resource: it is built locally and
    /// dropped on every return path from this function, including the `?`
    /// error paths (`spec.md` §4.7 lifecycle, §9 "scoped resources").
    pub fn run(&self, sink: Arc<dyn PdfEventSink>, stop: CancellationToken) -> Result<(), WatcherError> {
        let matcher = scan::build_matcher(&self.config.glob_pattern)?;

        let (tx, rx) = flume::unbounded();
        let mut debouncer = new_debouncer(Duration::from_millis(300), None, move |result: DebounceEventResult| {
            let _ = tx.send(result);
        })?;

        let mode = if self.config.recursive { RecursiveMode::Recursive } else { RecursiveMode::NonRecursive };
        debouncer.watcher().watch(&self.config.root, mode)?;

        let stats = scan::walk_and_deliver(
            &self.config.root,
            self.config.recursive,
            &matcher,
            &self.store,
            self.config.force,
            |path| sink.on_pdf_created(path),
        )?;
        tracing::info!(
            delivered = stats.delivered,
            skipped_by_state = stats.skipped_by_state,
            "initial PDF scan complete"
        );

        sink.on_initial_scan_complete();

        while !stop.is_cancelled() {
            match rx.recv_timeout(Duration::from_millis(250)) {
                Ok(Ok(events)) => {
                    for event in events {
                        for path in &event.paths {
                            if !matcher.is_match(path) {
                                continue;
                            }
                            self.handle_steady_state_path(path, &sink, &stop);
                        }
                    }
                }
                Ok(Err(errors)) => {
                    for error in errors {
                        tracing::warn!(%error, "filesystem watcher reported an error");
                    }
                }
                Err(flume::RecvTimeoutError::Timeout) => continue,
                Err(flume::RecvTimeoutError::Disconnected) => break,
            }
        }

        // `debouncer` drops here, tearing down the notify subscription.
        drop(debouncer);
        Ok(())
    }

    fn handle_steady_state_path(&self, path: &std::path::Path, sink: &Arc<dyn PdfEventSink>, stop: &CancellationToken) {
        match stability::wait_until_stable(path, self.config.stability_poll_interval, self.config.stability_required_polls, stop) {
            Ok(true) => {
                if let Err(error) = scan::deliver_if_changed(path, &self.store, false, |p| sink.on_pdf_created(p)) {
                    tracing::warn!(%error, path = %path.display(), "failed to record watcher-discovered PDF");
                }
            }
            Ok(false) => {}
            Err(error) => tracing::warn!(%error, path = %path.display(), "stability check failed"),
        }
    }
}
