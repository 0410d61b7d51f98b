use thiserror::Error;
use workbench_core::{CodecError, MigrationError};

use crate::model::ElementId;

/// Structural violations detected by [`PartGrid::validate`](crate::PartGrid::validate).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GridModelError {
    #[error("grid has elements but no root")]
    MissingRoot,
    #[error("root element {root} not found")]
    RootNotFound { root: ElementId },
    #[error("root element {root} must not have parent {parent}")]
    RootHasParent { root: ElementId, parent: ElementId },
    #[error("element stored under {key} carries id {id}")]
    IdMismatch { key: ElementId, id: ElementId },
    #[error("element {element} references missing parent {parent}")]
    MissingParent {
        element: ElementId,
        parent: ElementId,
    },
    #[error("tree node {node} references missing child {child}")]
    MissingChild { node: ElementId, child: ElementId },
    #[error("tree node {node} cannot reference itself")]
    SelfReferentialNode { node: ElementId },
    #[error("tree node {node} references child {child} twice")]
    DuplicateChildren { node: ElementId, child: ElementId },
    #[error("element {child} has multiple parents: {first_parent} and {second_parent}")]
    MultipleParents {
        child: ElementId,
        first_parent: ElementId,
        second_parent: ElementId,
    },
    #[error("element {element} parent mismatch: expected {expected:?}, got {actual:?}")]
    ParentMismatch {
        element: ElementId,
        expected: Option<ElementId>,
        actual: Option<ElementId>,
    },
    #[error("tree node {node} has ratio {ratio} outside (0, 1)")]
    InvalidRatio { node: ElementId, ratio: f64 },
    #[error("cycle detected at element {element}")]
    CycleDetected { element: ElementId },
    #[error("element {element} is unreachable from root")]
    UnreachableElement { element: ElementId },
    #[error("non-empty grid has no active part")]
    NoActivePart,
    #[error("empty grid names active part {part}")]
    ActivePartInEmptyGrid { part: ElementId },
    #[error("active part {part} is not a part of this grid")]
    InvalidActivePart { part: ElementId },
    #[error("reference part {part} is not a part of this grid")]
    InvalidReferencePart { part: ElementId },
    #[error("part {part} activates view {view} which it does not contain")]
    DanglingActiveView { part: ElementId, view: String },
    #[error("view {view} occurs more than once")]
    DuplicateViewId { view: String },
}

/// Errors surfaced by layout mutation and (de)serialization.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LayoutError {
    /// A referenced part, tree node, view or activity does not exist.
    #[error("element {id} not found")]
    ElementNotFound { id: String },
    /// The id is already taken.
    #[error("id {id} already exists")]
    DuplicateId { id: String },
    /// The request contradicts itself or the model.
    #[error("invalid operation: {reason}")]
    InvalidOperation { reason: String },
    /// A persisted payload needs a migration step that does not exist.
    #[error("{chain}: no migration registered from version {version}")]
    NullMigration { chain: String, version: u32 },
    /// A persisted payload could not be turned into a valid model.
    #[error("cannot deserialize layout: {reason}")]
    GridDeserialize { reason: String },
    /// An operation produced a structurally invalid grid.
    #[error("grid invariant violated: {0}")]
    Corrupt(#[from] GridModelError),
    #[error("cannot serialize layout: {reason}")]
    Serialize { reason: String },
}

impl LayoutError {
    pub(crate) fn not_found(id: impl ToString) -> Self {
        Self::ElementNotFound { id: id.to_string() }
    }

    pub(crate) fn duplicate(id: impl ToString) -> Self {
        Self::DuplicateId { id: id.to_string() }
    }

    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidOperation {
            reason: reason.into(),
        }
    }

    pub(crate) fn deserialize(reason: impl ToString) -> Self {
        Self::GridDeserialize {
            reason: reason.to_string(),
        }
    }
}

impl From<MigrationError> for LayoutError {
    fn from(error: MigrationError) -> Self {
        match error {
            MigrationError::NullMigration { chain, version } => {
                Self::NullMigration { chain, version }
            }
            other => Self::deserialize(other),
        }
    }
}

impl From<CodecError> for LayoutError {
    fn from(error: CodecError) -> Self {
        Self::deserialize(error)
    }
}
