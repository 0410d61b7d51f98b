#![forbid(unsafe_code)]

//! Runtime around the workbench layout model.
//!
//! [`LayoutStore`] publishes immutable layouts to readers and serializes
//! writers through a navigation queue. [`Workbench`] adds perspectives
//! (reference layout plus user modifications) persisted through a
//! [`PerspectiveStorage`] backend, configured by [`WorkbenchConfig`].

pub mod config;
pub mod error;
pub mod perspective;
pub mod storage;
pub mod store;
pub mod workbench;

pub use config::{
    LayoutConfig, PanelConfig, StorageConfig, StoreConfig, WorkbenchConfig,
};
pub use error::{ConfigError, PerspectiveError, StorageError, StoreError};
pub use perspective::Perspective;
pub use storage::{InMemoryStorage, PerspectiveStorage};
pub use store::{
    DEFAULT_OUTCOME_CAPACITY, LayoutOp, LayoutStore, NavigationOutcome, NavigationTicket, TicketId,
};
pub use workbench::Workbench;
