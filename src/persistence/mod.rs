//! Score file persistence
//!
//! Features:
//! - Plain text, one score per line, no header
//! - Best-effort load (missing or unreadable file means no scores)
//! - Atomic replace on save (tmp file, then rename over the target)
//! - Asynchronous save through the background job queue

use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::highscores::TopKTracker;
use crate::jobs::BackgroundJobQueue;

/// A score file on disk paired with the tracker capacity used to read it
#[derive(Debug, Clone)]
pub struct ScoreFile {
    path: PathBuf,
    capacity: usize,
}

impl ScoreFile {
    pub fn new(path: impl Into<PathBuf>, capacity: usize) -> Self {
        Self {
            path: path.into(),
            capacity,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the tracker, falling back to an empty one on any failure
    pub fn load(&self) -> TopKTracker {
        match File::open(&self.path) {
            Ok(file) => {
                let tracker = TopKTracker::load(self.capacity, BufReader::new(file));
                log::info!(
                    "Loaded {} high scores from {}",
                    tracker.len(),
                    self.path.display()
                );
                tracker
            }
            Err(err) => {
                log::info!(
                    "No high scores at {} ({err}), starting fresh",
                    self.path.display()
                );
                TopKTracker::new(self.capacity)
            }
        }
    }

    /// Write the tracker's scores, replacing the file atomically
    pub fn save(&self, tracker: &TopKTracker) -> Result<()> {
        write_scores(&self.path, tracker)
    }

    /// Snapshot the tracker now and write it on the job queue's worker
    ///
    /// Returns false if the queue has already shut down. Write failures are
    /// logged by the worker; there is no acknowledgment path.
    pub fn save_async(&self, tracker: &TopKTracker, queue: &BackgroundJobQueue) -> bool {
        let snapshot = tracker.clone();
        let path = self.path.clone();
        queue.submit(move || match write_scores(&path, &snapshot) {
            Ok(()) => log::info!("High scores saved ({} entries)", snapshot.len()),
            Err(err) => log::warn!("High score save failed: {err}"),
        })
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

fn write_scores(path: &Path, tracker: &TopKTracker) -> Result<()> {
    let tmp = tmp_path(path);
    let file = File::create(&tmp).map_err(|e| Error::io(&tmp, e))?;
    let written = tracker
        .save(BufWriter::new(file))
        .map_err(|e| Error::io(&tmp, e))
        .and_then(|()| fs::rename(&tmp, path).map_err(|e| Error::io(path, e)));
    if written.is_err() {
        // Leave no half-written tmp file behind
        if let Err(err) = fs::remove_file(&tmp) {
            log::debug!("Could not remove {}: {err}", tmp.display());
        }
    }
    written
}
