use std::path::PathBuf;

use thiserror::Error;
use workbench_layout::LayoutError;

/// Errors raised by the navigation queue of a [`LayoutStore`](crate::LayoutStore).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    #[error("navigation queue is full ({max_pending} pending)")]
    QueueFull { max_pending: usize },
    #[error("navigation ticket {ticket} is not pending")]
    UnknownTicket { ticket: u64 },
}

/// Errors raised by a [`PerspectiveStorage`](crate::PerspectiveStorage) backend.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StorageError {
    #[error("storage backend unavailable: {reason}")]
    Unavailable { reason: String },
}

#[derive(Debug, Error)]
pub enum PerspectiveError {
    #[error("perspective {id} is not registered")]
    UnknownPerspective { id: String },
    #[error("perspective {id} is already registered")]
    DuplicatePerspective { id: String },
    #[error("no perspective is active")]
    NoActivePerspective,
    #[error("stored perspective is malformed: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error(transparent)]
    Layout(#[from] LayoutError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors that can occur when loading a [`WorkbenchConfig`](crate::WorkbenchConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("validation errors: {}", .0.join("; "))]
    Validation(Vec<String>),
}
