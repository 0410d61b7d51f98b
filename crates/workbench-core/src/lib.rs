#![forbid(unsafe_code)]

//! Persistence primitives shared by the workbench layout crates.
//!
//! - [`codec`]: base64 `<json>//<version>` envelopes.
//! - [`stringify`]: JSON stringification with path-glob field exclusion.
//! - [`migration`]: ordered version migration chains.

pub mod codec;
pub mod migration;
pub mod stringify;

pub use codec::{CodecError, Envelope};
pub use migration::{MigrationChain, MigrationError, Migrator, StepError, migrate_value};
pub use stringify::{Exclusion, ExclusionContext, GlobError, StringifyOptions, stringify};
