// Copyright (c) The runrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{HistoryKey, HistoryOptions, HistoryStore, HistoryWindow, RunSummary};
use crate::errors::{HistoryError, HistoryReadError};
use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use std::{
    fs::{self, File, OpenOptions, TryLockError},
    io::{self, Write},
    thread,
    time::{Duration, Instant},
};

/// A [`HistoryStore`] keeping one JSON file per key in a directory.
///
/// Writers take an exclusive per-key lock file for the duration of the read-modify-write, so
/// concurrent invocations on the same machine don't lose updates. Files are replaced atomically,
/// so readers never see a partially-written window.
#[derive(Clone, Debug)]
pub struct FileHistoryStore {
    dir: Utf8PathBuf,
    options: HistoryOptions,
    read_only: bool,
    lock_timeout: Duration,
}

impl FileHistoryStore {
    /// Creates a store rooted at `dir`. The directory is created on first write.
    pub fn new(dir: impl Into<Utf8PathBuf>, options: HistoryOptions) -> Self {
        Self {
            dir: dir.into(),
            options,
            read_only: false,
            lock_timeout: LOCK_TIMEOUT,
        }
    }

    /// If set, [`HistoryStore::record`] computes the updated window without writing it.
    pub fn set_read_only(&mut self, read_only: bool) -> &mut Self {
        self.read_only = read_only;
        self
    }

    /// Returns the directory history files are stored in.
    pub fn dir(&self) -> &Utf8Path {
        &self.dir
    }

    /// Returns the path to the history file for `key`.
    pub fn history_path(&self, key: &HistoryKey) -> Utf8PathBuf {
        self.dir.join(format!("{}.json", key.file_stem()))
    }

    fn lock_path(&self, key: &HistoryKey) -> Utf8PathBuf {
        self.dir.join(format!("{}.lock", key.file_stem()))
    }

    /// Reads the window for `key`, reporting unreadable or corrupt files.
    ///
    /// A missing file is an empty window.
    pub fn try_read(&self, key: &HistoryKey) -> Result<HistoryWindow, HistoryReadError> {
        let path = self.history_path(key);
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                return Ok(HistoryWindow::default());
            }
            Err(error) => {
                return Err(HistoryReadError::Unreadable {
                    key: key.clone(),
                    path,
                    error,
                });
            }
        };

        let file: HistoryFile = serde_json::from_str(&contents).map_err(|error| {
            HistoryReadError::Corrupt {
                key: key.clone(),
                path: path.clone(),
                error,
            }
        })?;
        if &file.key != key {
            return Err(HistoryReadError::KeyMismatch {
                key: key.clone(),
                path,
                found: file.key,
            });
        }
        Ok(file.entries)
    }

    fn write(&self, key: &HistoryKey, window: &HistoryWindow) -> Result<(), HistoryError> {
        let path = self.history_path(key);
        let file = HistoryFile {
            key: key.clone(),
            entries: window.clone(),
        };

        atomicwrites::AtomicFile::new(&path, atomicwrites::AllowOverwrite)
            .write(|f| {
                serde_json::to_writer_pretty(&mut *f, &file)?;
                f.write_all(b"\n")?;
                Ok(())
            })
            .map_err(|error| HistoryError::Write {
                key: key.clone(),
                path,
                error,
            })
    }

    fn lock(&self, key: &HistoryKey) -> Result<File, HistoryError> {
        fs::create_dir_all(&self.dir).map_err(|error| HistoryError::DirCreate {
            dir: self.dir.clone(),
            error,
        })?;

        let lock_path = self.lock_path(key);
        let lock_file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)
            .map_err(|error| HistoryError::FileLock {
                key: key.clone(),
                path: lock_path.clone(),
                error,
            })?;
        acquire_lock_with_retry(&lock_file, key, &lock_path, self.lock_timeout)?;
        Ok(lock_file)
    }
}

impl HistoryStore for FileHistoryStore {
    fn record(&self, key: &HistoryKey, summary: RunSummary) -> Result<Vec<RunSummary>, HistoryError> {
        if self.read_only {
            let mut window = self.read(key);
            window.push_bounded(summary, self.options.max_entries);
            return Ok(window.recent(self.options.recent_entries).to_vec());
        }

        // Held until the end of this function.
        let _lock = self.lock(key)?;

        let mut window = self.read(key);
        window.push_bounded(summary, self.options.max_entries);
        self.write(key, &window)?;
        tracing::debug!(
            "recorded history for `{key}` ({} entries) in `{}`",
            window.len(),
            self.history_path(key),
        );

        Ok(window.recent(self.options.recent_entries).to_vec())
    }

    fn read(&self, key: &HistoryKey) -> HistoryWindow {
        match self.try_read(key) {
            Ok(window) => window,
            Err(error) => {
                let cause = std::error::Error::source(&error)
                    .map(|source| format!(": {source}"))
                    .unwrap_or_default();
                tracing::warn!("{error}{cause}, treating it as empty");
                HistoryWindow::default()
            }
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct HistoryFile {
    key: HistoryKey,
    entries: HistoryWindow,
}

const LOCK_TIMEOUT: Duration = Duration::from_secs(5);
const LOCK_RETRY_INTERVAL: Duration = Duration::from_millis(100);

/// Acquires an exclusive lock on `file`, retrying until `timeout` has elapsed.
fn acquire_lock_with_retry(
    file: &File,
    key: &HistoryKey,
    lock_path: &Utf8Path,
    timeout: Duration,
) -> Result<(), HistoryError> {
    let start = Instant::now();
    loop {
        match file.try_lock() {
            Ok(()) => return Ok(()),
            Err(TryLockError::WouldBlock) => {
                if start.elapsed() >= timeout {
                    return Err(HistoryError::FileLockTimeout {
                        key: key.clone(),
                        path: lock_path.to_owned(),
                        timeout,
                    });
                }
                thread::sleep(LOCK_RETRY_INTERVAL);
            }
            Err(TryLockError::Error(error)) => {
                return Err(HistoryError::FileLock {
                    key: key.clone(),
                    path: lock_path.to_owned(),
                    error,
                });
            }
        }
    }
}
