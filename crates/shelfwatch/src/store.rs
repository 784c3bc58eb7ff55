//! Durable append-only log of monitoring results.
//!
//! The log is a JSON Lines file: one [`MonitoringResult`] per line, appended
//! and never rewritten. Writers are serialized through an async mutex and
//! each record goes out as a single complete line. Readers tolerate a missing
//! file and skip lines that fail to decode, such as a record torn by a crash.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind, SeekFrom};
use std::path::{Path, PathBuf};

use tokio::fs::OpenOptions;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::{MalformedRecordError, PersistenceError};
use crate::monitoring::MonitoringResult;
use crate::window::PreviousStateWindow;

#[derive(Debug, Default)]
struct WriterState {
    /// Whether the existing file tail has been checked for a torn record
    tail_checked: bool,
    /// Records appended through this store
    appended: u64,
}

/// File-backed result log
#[derive(Debug)]
pub struct SnapshotStore {
    path: PathBuf,
    writer: Mutex<WriterState>,
}

impl SnapshotStore {
    /// Create a store for the given log path; the file is created on first
    /// append
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self { path: path.as_ref().to_path_buf(), writer: Mutex::new(WriterState::default()) }
    }

    /// Returns the path of the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one result to the log.
    ///
    /// Returns the sequence number of the record among those appended through
    /// this store, which orders concurrent appends the same way the log does.
    pub async fn append(&self, result: &MonitoringResult) -> Result<u64, PersistenceError> {
        let mut line = serde_json::to_vec(result)?;
        line.push(b'\n');

        let mut state = self.writer.lock().await;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| PersistenceError::io(parent, e))?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| PersistenceError::io(&self.path, e))?;

        if !state.tail_checked {
            let torn = ends_with_torn_record(&mut file)
                .await
                .map_err(|e| PersistenceError::io(&self.path, e))?;
            if torn {
                warn!(
                    path = %self.path.display(),
                    "Result log ends with an incomplete record, starting a new line"
                );
                line.insert(0, b'\n');
            }
            state.tail_checked = true;
        }

        let written = async {
            file.write_all(&line).await?;
            file.flush().await
        }
        .await;

        if let Err(e) = written {
            // A partial write may have left a torn tail behind
            state.tail_checked = false;
            return Err(PersistenceError::io(&self.path, e));
        }

        state.appended += 1;
        debug!(target_id = %result.target_id, seq = state.appended, "Appended monitoring result");

        Ok(state.appended)
    }

    /// Iterate over every readable result in append order.
    ///
    /// Each call opens the log afresh, so the sequence can be restarted by
    /// calling this again. A missing log reads as empty.
    pub fn load_all(&self) -> Result<LogEntries, PersistenceError> {
        let reader = match File::open(&self.path) {
            Ok(file) => Some(BufReader::new(file)),
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => return Err(PersistenceError::io(&self.path, e)),
        };

        Ok(LogEntries { path: self.path.clone(), reader, line: 0, skipped: 0, buf: Vec::new() })
    }

    /// Rebuild the baseline window from the last `window_size` results
    pub fn load_window(&self, window_size: usize) -> Result<PreviousStateWindow, PersistenceError> {
        Ok(PreviousStateWindow::from_log(window_size, self.load_all()?))
    }

    /// Latest result per target among the last `window_size` results overall
    pub fn load_recent_by_target(
        &self,
        window_size: usize,
    ) -> Result<HashMap<String, MonitoringResult>, PersistenceError> {
        Ok(self.load_window(window_size)?.by_target())
    }
}

async fn ends_with_torn_record(file: &mut tokio::fs::File) -> std::io::Result<bool> {
    let len = file.metadata().await?.len();
    if len == 0 {
        return Ok(false);
    }

    file.seek(SeekFrom::End(-1)).await?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last).await?;

    Ok(last[0] != b'\n')
}

/// Lazy iterator over the records of a result log
pub struct LogEntries {
    path: PathBuf,
    reader: Option<BufReader<File>>,
    line: usize,
    skipped: usize,
    buf: Vec<u8>,
}

impl LogEntries {
    /// Number of malformed records skipped so far
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

impl Iterator for LogEntries {
    type Item = MonitoringResult;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let reader = self.reader.as_mut()?;
            self.buf.clear();

            match reader.read_until(b'\n', &mut self.buf) {
                Ok(0) => {
                    self.reader = None;
                    return None;
                }
                Ok(_) => {
                    self.line += 1;
                    let record = self.buf.trim_ascii();
                    if record.is_empty() {
                        continue;
                    }

                    match serde_json::from_slice::<MonitoringResult>(record) {
                        Ok(result) => return Some(result),
                        Err(source) => {
                            let error = MalformedRecordError { line: self.line, source };
                            warn!(path = %self.path.display(), "Skipping record: {}", error);
                            self.skipped += 1;
                        }
                    }
                }
                Err(e) => {
                    warn!(path = %self.path.display(), "Stopped reading result log: {}", e);
                    self.reader = None;
                    return None;
                }
            }
        }
    }
}
