//! File-backed audit log: one JSON object per line.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use crate::error::{EngineError, EngineResult};
use crate::models::AuditEntry;

use super::AuditLog;

#[derive(Debug)]
struct JsonlState {
    file: File,
    entries: Vec<AuditEntry>,
}

/// An audit log persisted as JSON lines.
///
/// Each batch is written with a single `write_all` followed by `sync_data`
/// before `append` returns. A failed write is truncated back to the last
/// committed batch. Existing entries are loaded on open and kept in memory
/// for queries.
#[derive(Debug)]
pub struct JsonlAuditLog {
    path: PathBuf,
    state: Mutex<JsonlState>,
}

impl JsonlAuditLog {
    /// Opens (or creates) the log at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> EngineResult<Self> {
        let path = path.as_ref().to_path_buf();
        let entries = Self::load_existing(&path)?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| write_failed(&path, e))?;

        tracing::info!(
            path = %path.display(),
            entries = entries.len(),
            "Opened audit log"
        );

        Ok(Self {
            path,
            state: Mutex::new(JsonlState { file, entries }),
        })
    }

    /// Returns the file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads every complete line. A trailing line without its newline is
    /// a batch that was never acknowledged; it is cut off before parsing.
    fn load_existing(path: &Path) -> EngineResult<Vec<AuditEntry>> {
        if !path.exists() {
            return Ok(Vec::new());
        }

        let content = std::fs::read_to_string(path).map_err(|e| write_failed(path, e))?;
        let complete = content.rfind('\n').map_or(0, |i| i + 1);
        if complete < content.len() {
            tracing::warn!(
                path = %path.display(),
                discarded_bytes = content.len() - complete,
                "Truncating torn audit log tail"
            );
            OpenOptions::new()
                .write(true)
                .open(path)
                .and_then(|file| file.set_len(complete as u64))
                .map_err(|e| write_failed(path, e))?;
        }

        let mut entries = Vec::new();
        for (index, line) in content[..complete].lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let entry: AuditEntry =
                serde_json::from_str(line).map_err(|e| EngineError::AuditWriteFailed {
                    message: format!("{} line {}: {}", path.display(), index + 1, e),
                })?;
            entries.push(entry);
        }
        Ok(entries)
    }
}

fn write_failed(path: &Path, error: impl std::fmt::Display) -> EngineError {
    EngineError::AuditWriteFailed {
        message: format!("{}: {}", path.display(), error),
    }
}

fn write_batch(file: &mut File, bytes: &[u8]) -> std::io::Result<()> {
    file.write_all(bytes)?;
    file.flush()?;
    file.sync_data()
}

impl AuditLog for JsonlAuditLog {
    fn append(&self, entries: Vec<AuditEntry>) -> EngineResult<Vec<AuditEntry>> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        let mut next = state.entries.len() as u64 + 1;
        let mut appended = Vec::with_capacity(entries.len());
        let mut buffer = String::new();
        for mut entry in entries {
            entry.sequence = next;
            next += 1;
            let line = serde_json::to_string(&entry).map_err(|e| write_failed(&self.path, e))?;
            buffer.push_str(&line);
            buffer.push('\n');
            appended.push(entry);
        }

        let file = &mut state.file;
        let committed = file
            .metadata()
            .map_err(|e| write_failed(&self.path, e))?
            .len();
        if let Err(e) = write_batch(file, buffer.as_bytes()) {
            if let Err(rollback) = file.set_len(committed) {
                tracing::error!(
                    path = %self.path.display(),
                    error = %rollback,
                    "Failed to roll back partial audit batch"
                );
            }
            return Err(write_failed(&self.path, e));
        }

        state.entries.extend(appended.iter().cloned());
        Ok(appended)
    }

    fn entries(&self) -> EngineResult<Vec<AuditEntry>> {
        Ok(self
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .clone())
    }
}
