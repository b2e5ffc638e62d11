use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use zotomatic_storage::StateStore;
use zotomatic_watch::{PdfEventSink, PdfWatcher, PdfWatcherConfig};

struct CollectingSink {
    delivered: Mutex<Vec<PathBuf>>,
    scan_complete: flume::Sender<()>,
}

impl PdfEventSink for CollectingSink {
    fn on_pdf_created(&self, path: PathBuf) {
        self.delivered.lock().unwrap().push(path);
    }

    fn on_initial_scan_complete(&self) {
        let _ = self.scan_complete.send(());
    }
}

#[test]
fn initial_scan_delivers_each_pdf_exactly_once_then_signals_completion() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("a.pdf"), b"one").unwrap();
    fs::write(dir.path().join("b.pdf"), b"two").unwrap();
    fs::write(dir.path().join("ignored.txt"), b"nope").unwrap();

    let store = Arc::new(StateStore::open_in_memory().unwrap());
    let config = PdfWatcherConfig { root: dir.path().to_path_buf(), ..Default::default() };
    let watcher = PdfWatcher::new(config, store);

    let (tx, rx) = flume::unbounded();
    let sink = Arc::new(CollectingSink { delivered: Mutex::new(Vec::new()), scan_complete: tx });
    let stop = CancellationToken::new();

    let handle = {
        let sink = sink.clone();
        let stop = stop.clone();
        std::thread::spawn(move || watcher.run(sink, stop))
    };

    rx.recv_timeout(Duration::from_secs(5)).expect("initial scan should complete");
    stop.cancel();
    handle.join().unwrap().unwrap();

    let delivered = sink.delivered.lock().unwrap();
    assert_eq!(delivered.len(), 2);
}

#[test]
fn a_second_scan_of_an_unchanged_tree_delivers_nothing() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("a.pdf"), b"one").unwrap();

    let store = Arc::new(StateStore::open_in_memory().unwrap());

    for expected_count in [1usize, 0] {
        let config = PdfWatcherConfig { root: dir.path().to_path_buf(), ..Default::default() };
        let watcher = PdfWatcher::new(config, store.clone());
        let (tx, rx) = flume::unbounded();
        let sink = Arc::new(CollectingSink { delivered: Mutex::new(Vec::new()), scan_complete: tx });
        let stop = CancellationToken::new();

        let handle = {
            let sink = sink.clone();
            let stop = stop.clone();
            std::thread::spawn(move || watcher.run(sink, stop))
        };

        rx.recv_timeout(Duration::from_secs(5)).expect("initial scan should complete");
        stop.cancel();
        handle.join().unwrap().unwrap();

        assert_eq!(sink.delivered.lock().unwrap().len(), expected_count);
    }
}
