//! Append-and-flush recorder for forwarded traffic.

use std::fs;
use std::path::{Path, PathBuf};

use super::types::Interaction;
use parking_lot::Mutex;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("failed to serialize interactions: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Captures interactions and persists them after every append.
///
/// The whole accumulated sequence is rewritten on each append via
/// write-to-temp-then-rename, so a reader opening the file at any time sees a
/// complete, parseable sequence. The append-and-flush path is one critical
/// section: concurrent forwarded requests serialize entirely through it.
pub struct Recorder {
    path: PathBuf,
    interactions: Mutex<Vec<Interaction>>,
}

impl Recorder {
    /// The in-process sequence starts empty each run; an existing file at
    /// `path` is overwritten on the first append.
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            interactions: Mutex::new(Vec::new()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.interactions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.interactions.lock().is_empty()
    }

    /// Append one interaction and flush the entire sequence to disk.
    ///
    /// On persistence failure the interaction stays in the in-memory
    /// sequence; the caller reports the error and keeps serving.
    pub fn record(&self, interaction: Interaction) -> Result<(), RecordError> {
        let mut interactions = self.interactions.lock();
        interactions.push(interaction);
        let json = serde_json::to_vec_pretty(&*interactions)?;

        // Temp file in the same directory so the rename stays on one
        // filesystem and is atomic.
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, &json).map_err(|source| RecordError::Io {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, &self.path).map_err(|source| RecordError::Io {
            path: self.path.clone(),
            source,
        })?;

        debug!(
            count = interactions.len(),
            path = %self.path.display(),
            "persisted interaction sequence"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::types::{RequestDetail, ResponseDetail};
    use chrono::Utc;

    fn interaction(url: &str) -> Interaction {
        Interaction {
            timestamp: Utc::now(),
            request: RequestDetail {
                method: "GET".to_string(),
                url: url.to_string(),
                headers: Default::default(),
                body: String::new(),
            },
            response: ResponseDetail {
                status: 200,
                headers: Default::default(),
                body: "ok".to_string(),
            },
            duration: "1ms".to_string(),
        }
    }

    #[test]
    fn test_record_appends_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("traffic.json");
        let recorder = Recorder::new(&path);

        recorder.record(interaction("http://a.test/1")).unwrap();
        recorder.record(interaction("http://a.test/2")).unwrap();
        recorder.record(interaction("http://a.test/3")).unwrap();
        assert_eq!(recorder.len(), 3);

        // The persisted file is complete and ordered after every append,
        // so re-reading it now is equivalent to re-reading after a crash.
        let data = fs::read_to_string(&path).unwrap();
        let parsed: Vec<Interaction> = serde_json::from_str(&data).unwrap();
        assert_eq!(parsed.len(), 3);
        let urls: Vec<_> = parsed.iter().map(|i| i.request.url.as_str()).collect();
        assert_eq!(
            urls,
            ["http://a.test/1", "http://a.test/2", "http://a.test/3"]
        );
    }

    #[test]
    fn test_file_parseable_after_each_append() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("traffic.json");
        let recorder = Recorder::new(&path);

        for n in 1..=3 {
            recorder.record(interaction("http://a.test/x")).unwrap();
            let data = fs::read_to_string(&path).unwrap();
            let parsed: Vec<Interaction> = serde_json::from_str(&data).unwrap();
            assert_eq!(parsed.len(), n);
        }
    }

    #[test]
    fn test_overwrites_stale_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("traffic.json");
        fs::write(&path, "stale garbage from a previous run").unwrap();

        let recorder = Recorder::new(&path);
        recorder.record(interaction("http://a.test/new")).unwrap();

        let data = fs::read_to_string(&path).unwrap();
        let parsed: Vec<Interaction> = serde_json::from_str(&data).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].request.url, "http://a.test/new");
    }

    #[test]
    fn test_persistence_failure_surfaced() {
        let recorder = Recorder::new("/nonexistent-dir/traffic.json");
        let err = recorder.record(interaction("http://a.test/1")).unwrap_err();
        assert!(matches!(err, RecordError::Io { .. }));
        // The in-memory copy still holds the interaction.
        assert_eq!(recorder.len(), 1);
    }
}
