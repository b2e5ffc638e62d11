use std::fs;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use globset::{Glob, GlobMatcher};
use zotomatic_core::FileState;
use zotomatic_storage::StateStore;

use crate::error::WatcherError;

pub fn build_matcher(pattern: &str) -> Result<GlobMatcher, WatcherError> {
    let glob = Glob::new(pattern).map_err(|source| WatcherError::InvalidGlob {
        pattern: pattern.to_string(),
        source,
    })?;
    Ok(glob.compile_matcher())
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ScanStats {
    pub delivered: usize,
    pub skipped_by_state: usize,
}

/// Recursive (or single-level) walk of `root`, delivering every `.pdf` not
/// already recorded at its current `(mtime_ns, size)` in C1 — the dedup
/// check `spec.md` §4.7 step 2 describes.
pub fn walk_and_deliver(
    root: &Path,
    recursive: bool,
    matcher: &GlobMatcher,
    store: &StateStore,
    force: bool,
    mut on_pdf: impl FnMut(PathBuf),
) -> Result<ScanStats, WatcherError> {
    let mut stats = ScanStats::default();
    let mut dirs = vec![root.to_path_buf()];

    while let Some(dir) = dirs.pop() {
        let entries = fs::read_dir(&dir).map_err(|source| WatcherError::ReadDir {
            path: dir.display().to_string(),
            source,
        })?;

        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(error) => {
                    tracing::warn!(%error, dir = %dir.display(), "failed to read directory entry");
                    continue;
                }
            };
            let path = entry.path();

            if path.is_dir() {
                if recursive {
                    dirs.push(path);
                }
                continue;
            }

            if !matcher.is_match(&path) {
                continue;
            }

            match deliver_if_changed(&path, store, force, &mut on_pdf) {
                Ok(true) => stats.delivered += 1,
                Ok(false) => stats.skipped_by_state += 1,
                Err(error) => tracing::warn!(%error, path = %path.display(), "failed to record PDF during scan"),
            }
        }
    }

    Ok(stats)
}

/// Compares `path`'s current `(mtime_ns, size)` against the stored
/// [`FileState`] row; if unchanged and `force` is false, returns `Ok(false)`
/// without calling `on_pdf`. Otherwise upserts the new state and invokes
/// `on_pdf`, returning `Ok(true)`.
pub fn deliver_if_changed(
    path: &Path,
    store: &StateStore,
    force: bool,
    mut on_pdf: impl FnMut(PathBuf),
) -> Result<bool, WatcherError> {
    let metadata = match fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(_) => return Ok(false),
    };
    let size = metadata.len() as i64;
    let mtime_ns = metadata
        .modified()
        .ok()
        .and_then(|m| m.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_nanos() as i64)
        .unwrap_or_default();

    if !force {
        if let Some(existing) = store.get_file(path)? {
            if existing.matches(mtime_ns, size) {
                return Ok(false);
            }
        }
    }

    let absolute = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    store.upsert_file(&FileState {
        file_path: absolute.clone(),
        mtime_ns,
        size,
        sha1: None,
        last_seen_at: now_unix_seconds(),
    })?;

    on_pdf(absolute);
    Ok(true)
}

fn now_unix_seconds() -> i64 {
    std::time::SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}
