use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Kind of persisted entity, used in `NotFound` errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Item,
    Step,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entity::Item => write!(f, "Item"),
            Entity::Step => write!(f, "Step"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{entity} with ID {id} not found")]
    NotFound { entity: Entity, id: i64 },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

/// The assistant process could not be started or did not terminate normally.
#[derive(Debug, thiserror::Error)]
pub enum LaunchError {
    #[error("Failed to start assistant: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("Assistant I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Assistant was terminated by a signal")]
    Signal,

    /// Carries whatever the child printed before it was killed
    #[error("Assistant timed out after {}s and was killed", .after.as_secs())]
    TimedOut {
        after: Duration,
        stdout: String,
        stderr: String,
    },
}

impl LaunchError {
    /// Output captured before the failure as `(stdout, stderr)`; empty unless timed out.
    pub fn partial_output(&self) -> (&str, &str) {
        match self {
            LaunchError::TimedOut { stdout, stderr, .. } => (stdout.as_str(), stderr.as_str()),
            _ => ("", ""),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Unknown timezone: {0}")]
    UnknownTimezone(String),

    #[error("Could not determine the home directory")]
    NoHomeDirectory,
}

/// Failure of the single-item start operation
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Launch(#[from] LaunchError),
}
