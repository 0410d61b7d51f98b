#![forbid(unsafe_code)]

//! Version migration chains.
//!
//! A [`MigrationChain`] holds one [`Migrator`] per version step of a
//! persisted model. Migrating from version `n` to the chain's current
//! version applies the migrators registered for `n`, `n + 1`, ... in order,
//! each transforming the JSON text of one version into the next.
//!
//! The chain is checked for gaps before anything runs, so a missing step
//! fails fast with [`MigrationError::NullMigration`] instead of leaving the
//! payload half-migrated.

use std::collections::BTreeMap;
use std::fmt;

use serde_json::Value;
use thiserror::Error;

/// Failure raised by a single migrator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}")]
pub struct StepError {
    pub reason: String,
}

impl StepError {
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for StepError {
    fn from(error: serde_json::Error) -> Self {
        Self::new(error.to_string())
    }
}

/// Parse `json`, let `edit` transform it in place, and re-serialize.
pub fn migrate_value(
    json: &str,
    edit: impl FnOnce(&mut Value) -> Result<(), StepError>,
) -> Result<String, StepError> {
    let mut value = serde_json::from_str::<Value>(json)?;
    edit(&mut value)?;
    Ok(serde_json::to_string(&value)?)
}

/// Signature of a single migration step.
pub type MigrateFn = fn(&str) -> Result<String, StepError>;

/// Transforms JSON of version `from` into version `from + 1`.
#[derive(Clone, Copy)]
pub struct Migrator {
    pub from: u32,
    pub description: &'static str,
    pub migrate: MigrateFn,
}

impl fmt::Debug for Migrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Migrator")
            .field("from", &self.from)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// Errors raised while building or running a migration chain.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MigrationError {
    /// No migrator is registered for `version` in `chain`.
    #[error("{chain}: no migration registered from version {version}")]
    NullMigration { chain: String, version: u32 },
    /// The migrator for `version` rejected its input.
    #[error("{chain}: migration from version {version} failed: {reason}")]
    Malformed {
        chain: String,
        version: u32,
        reason: String,
    },
    /// Requested target precedes the source version.
    #[error("{chain}: cannot migrate backwards from version {from} to {to}")]
    Downgrade { chain: String, from: u32, to: u32 },
    /// Requested target is newer than the chain supports.
    #[error("{chain}: version {version} is newer than current version {current}")]
    UnsupportedVersion {
        chain: String,
        version: u32,
        current: u32,
    },
    #[error("{chain}: duplicate migrator registered from version {version}")]
    DuplicateMigrator { chain: String, version: u32 },
    #[error("{chain}: migrator from version {version} is outside 1..{current}")]
    MigratorOutOfRange {
        chain: String,
        version: u32,
        current: u32,
    },
}

/// Ordered set of migrators leading up to a current version.
#[derive(Debug, Clone)]
pub struct MigrationChain {
    name: String,
    current: u32,
    migrators: BTreeMap<u32, Migrator>,
}

impl MigrationChain {
    /// Build a chain. Migrators may be supplied in any order but each source
    /// version may be registered at most once and must precede `current`.
    pub fn new(
        name: impl Into<String>,
        current: u32,
        migrators: impl IntoIterator<Item = Migrator>,
    ) -> Result<Self, MigrationError> {
        let name = name.into();
        let mut by_version = BTreeMap::new();
        for migrator in migrators {
            if migrator.from == 0 || migrator.from >= current {
                return Err(MigrationError::MigratorOutOfRange {
                    chain: name,
                    version: migrator.from,
                    current,
                });
            }
            if by_version.insert(migrator.from, migrator).is_some() {
                return Err(MigrationError::DuplicateMigrator {
                    chain: name,
                    version: migrator.from,
                });
            }
        }
        Ok(Self {
            name,
            current,
            migrators: by_version,
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn current_version(&self) -> u32 {
        self.current
    }

    /// Migrate `json` from version `from` to the current version.
    pub fn migrate(&self, json: &str, from: u32) -> Result<String, MigrationError> {
        self.migrate_range(json, from, self.current)
    }

    /// Migrate `json` from version `from` to version `to`.
    pub fn migrate_range(&self, json: &str, from: u32, to: u32) -> Result<String, MigrationError> {
        if from > to {
            return Err(MigrationError::Downgrade {
                chain: self.name.clone(),
                from,
                to,
            });
        }
        if to > self.current {
            return Err(MigrationError::UnsupportedVersion {
                chain: self.name.clone(),
                version: to,
                current: self.current,
            });
        }
        if from == to {
            return Ok(json.to_owned());
        }
        if let Some(version) = (from..to).find(|v| !self.migrators.contains_key(v)) {
            return Err(MigrationError::NullMigration {
                chain: self.name.clone(),
                version,
            });
        }

        let mut current = json.to_owned();
        for migrator in self.migrators.range(from..to).map(|(_, m)| m) {
            current = (migrator.migrate)(&current).map_err(|error| MigrationError::Malformed {
                chain: self.name.clone(),
                version: migrator.from,
                reason: error.reason,
            })?;
            tracing::debug!(
                target: "workbench.migration",
                chain = %self.name,
                from = migrator.from,
                to = migrator.from + 1,
                step = migrator.description,
                "applied migration step"
            );
        }
        tracing::info!(
            target: "workbench.migration",
            chain = %self.name,
            from,
            to,
            "migrated payload"
        );
        Ok(current)
    }
}
