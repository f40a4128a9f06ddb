use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::{error, info, warn};

use crate::config::{CollisionPolicy, StoragePolicy};
use crate::error::StorageError;

/// Permission bits of stored files (rw-r--r--).
#[cfg(unix)]
const FILE_MODE: u32 = 0o644;

/// Result of opening a destination file.
#[derive(Debug)]
pub enum OpenOutcome {
    /// The file did not exist and was created.
    Created(OutputFile),
    /// The file existed and was truncated.
    Replaced(OutputFile),
    /// The file existed and the collision policy keeps it.
    Dropped,
}

/// How a completed transfer ended up in storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferOutcome {
    /// Every byte was written.
    Stored,
    /// A file with the same name was kept; the payload was thrown away.
    Dropped,
    /// The destination could not be opened; the payload was thrown away.
    Unstored,
    /// Writing failed part way; the file holds a prefix of the payload.
    Truncated,
}

/// Create every missing directory above `path`.
///
/// Existing directories are fine.
pub fn ensure_parent_dirs(path: &Path) -> Result<(), StorageError> {
    let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) else {
        return Ok(());
    };
    std::fs::create_dir_all(parent).map_err(|source| StorageError::CreateDirs {
        path: parent.to_path_buf(),
        source,
    })
}

/// Create `path` exclusively, applying `collision` if it already exists.
pub fn open_for_write(path: &Path, collision: CollisionPolicy) -> Result<OpenOutcome, StorageError> {
    match file_options(true).open(path) {
        Ok(file) => return Ok(OpenOutcome::Created(OutputFile::new(file, path))),
        Err(err) if err.kind() == ErrorKind::AlreadyExists => {}
        Err(source) => {
            return Err(StorageError::Open {
                path: path.to_path_buf(),
                source,
            })
        }
    }

    match collision {
        CollisionPolicy::Drop => Ok(OpenOutcome::Dropped),
        CollisionPolicy::Replace => file_options(false)
            .open(path)
            .map(|file| OpenOutcome::Replaced(OutputFile::new(file, path)))
            .map_err(|source| StorageError::Open {
                path: path.to_path_buf(),
                source,
            }),
    }
}

fn file_options(exclusive: bool) -> OpenOptions {
    let mut options = OpenOptions::new();
    options.write(true);
    if exclusive {
        options.create_new(true);
    } else {
        options.create(true).truncate(true);
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(FILE_MODE);
    }
    options
}

/// An open destination file.
#[derive(Debug)]
pub struct OutputFile {
    file: File,
    path: PathBuf,
}

impl OutputFile {
    fn new(file: File, path: &Path) -> Self {
        Self {
            file,
            path: path.to_path_buf(),
        }
    }

    /// Write all of `bytes`, retrying short and interrupted writes.
    pub fn append(&mut self, bytes: &[u8]) -> Result<usize, StorageError> {
        let mut offset = 0usize;
        while offset < bytes.len() {
            match self.file.write(&bytes[offset..]) {
                Ok(0) => {
                    return Err(self.write_error(std::io::Error::from(ErrorKind::WriteZero)));
                }
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(self.write_error(err)),
            }
        }
        Ok(offset)
    }

    /// Flush to disk and close.
    pub fn finalize(self) -> Result<(), StorageError> {
        self.file
            .sync_all()
            .map_err(|source| StorageError::Finalize {
                path: self.path.clone(),
                source,
            })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_error(&self, source: std::io::Error) -> StorageError {
        StorageError::Write {
            path: self.path.clone(),
            source,
        }
    }
}

enum SinkState {
    Writing(OutputFile),
    Dropped,
    Unstored,
    Truncated,
}

/// Destination of one transfer's payload.
///
/// Storage failures never stop the payload from being consumed; they only
/// change where the bytes go and how the transfer is reported.
pub(crate) struct PayloadSink {
    file_name: String,
    path: PathBuf,
    state: SinkState,
}

impl PayloadSink {
    pub(crate) fn open(file_name: String, path: PathBuf, policy: StoragePolicy) -> Self {
        if policy.create_missing_dirs {
            if let Err(err) = ensure_parent_dirs(&path) {
                error!(%file_name, path = %path.display(), %err, "cannot create storage directory");
            }
        }

        let state = match open_for_write(&path, policy.on_name_collision) {
            Ok(OpenOutcome::Created(file)) => SinkState::Writing(file),
            Ok(OpenOutcome::Replaced(file)) => {
                warn!(%file_name, path = %path.display(), "file already exists and will be replaced");
                SinkState::Writing(file)
            }
            Ok(OpenOutcome::Dropped) => {
                warn!(
                    %file_name,
                    path = %path.display(),
                    "file already exists, the incoming file will be dropped"
                );
                SinkState::Dropped
            }
            Err(err) => {
                error!(
                    %file_name,
                    path = %path.display(),
                    %err,
                    "the incoming file will be discarded"
                );
                SinkState::Unstored
            }
        };

        Self {
            file_name,
            path,
            state,
        }
    }

    pub(crate) fn file_name(&self) -> &str {
        &self.file_name
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// Store `bytes` if a file is open. A write error closes the file.
    pub(crate) fn write(&mut self, bytes: &[u8]) {
        let SinkState::Writing(file) = &mut self.state else {
            return;
        };
        if let Err(err) = file.append(bytes) {
            error!(
                file_name = %self.file_name,
                path = %self.path.display(),
                %err,
                "write failed, the file will be truncated"
            );
            self.state = SinkState::Truncated;
        }
    }

    /// Close the destination after the last payload byte and log the result.
    pub(crate) fn finish(self) -> TransferOutcome {
        let file_name = self.file_name;
        let path = self.path.display();
        match self.state {
            SinkState::Writing(file) => match file.finalize() {
                Ok(()) => {
                    info!(%file_name, %path, "successfully received file");
                    TransferOutcome::Stored
                }
                Err(err) => {
                    error!(%file_name, %path, %err, "received file may be incomplete on disk");
                    TransferOutcome::Truncated
                }
            },
            SinkState::Dropped => {
                warn!(%file_name, %path, "received file dropped");
                TransferOutcome::Dropped
            }
            SinkState::Unstored => {
                error!(%file_name, %path, "received file discarded, it could not be stored");
                TransferOutcome::Unstored
            }
            SinkState::Truncated => {
                error!(%file_name, %path, "received file truncated");
                TransferOutcome::Truncated
            }
        }
    }
}
