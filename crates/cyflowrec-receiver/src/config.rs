use std::path::{Path, PathBuf};
use std::time::Duration;

/// Silence that aborts a transfer once its first `[` arrived.
pub const DEFAULT_MESSAGE_TIMEOUT: Duration = Duration::from_millis(1000);

/// What to do when the destination file already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CollisionPolicy {
    /// Truncate the existing file and write the new content.
    #[default]
    Replace,
    /// Keep the existing file; the incoming payload is read and thrown away.
    Drop,
}

impl CollisionPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            CollisionPolicy::Replace => "replace",
            CollisionPolicy::Drop => "drop",
        }
    }
}

/// Storage commit rules, fixed for the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StoragePolicy {
    /// Create missing directories of the destination path.
    pub create_missing_dirs: bool,
    /// Rule applied on a name collision.
    pub on_name_collision: CollisionPolicy,
}

/// Configuration handed to a [`Session`](crate::Session) at construction.
#[derive(Debug, Clone)]
pub struct ReceiverConfig {
    /// Directory received files are stored under.
    pub storage_root: PathBuf,
    /// Storage commit rules.
    pub policy: StoragePolicy,
    /// Silence that aborts an in-flight transfer. Default: 1000 ms.
    pub message_timeout: Duration,
}

impl ReceiverConfig {
    /// Configuration with the default policy and timeout.
    pub fn new(storage_root: impl Into<PathBuf>) -> Self {
        Self {
            storage_root: storage_root.into(),
            policy: StoragePolicy::default(),
            message_timeout: DEFAULT_MESSAGE_TIMEOUT,
        }
    }

    pub fn with_policy(mut self, policy: StoragePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_message_timeout(mut self, timeout: Duration) -> Self {
        self.message_timeout = timeout;
        self
    }

    /// Destination of a received file.
    pub fn storage_path(&self, file_name: &str) -> PathBuf {
        self.storage_root.join(Path::new(file_name))
    }
}
