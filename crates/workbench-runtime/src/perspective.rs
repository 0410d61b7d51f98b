//! Perspectives: a named reference layout plus the user's modifications.

use serde::{Deserialize, Serialize};
use workbench_layout::{Layout, LayoutError, canonical_layout, deserialize_layout, serialize_layout};

use crate::error::PerspectiveError;

#[derive(Debug, Clone, PartialEq)]
pub struct Perspective {
    id: String,
    reference: Layout,
    user: Layout,
}

/// Storage form: both layouts as envelopes.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredPerspective {
    reference_layout: String,
    user_layout: String,
}

impl Perspective {
    /// A fresh perspective whose user layout is the reference layout.
    #[must_use]
    pub fn new(id: impl Into<String>, reference: Layout) -> Self {
        Self {
            id: id.into(),
            user: reference.clone(),
            reference,
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn reference(&self) -> &Layout {
        &self.reference
    }

    #[must_use]
    pub fn user(&self) -> &Layout {
        &self.user
    }

    #[must_use]
    pub fn with_user(mut self, user: Layout) -> Self {
        self.user = user;
        self
    }

    /// Whether the user layout differs from the reference layout, ignoring
    /// generated ids and transient state.
    pub fn is_modified(&self) -> Result<bool, LayoutError> {
        Ok(canonical_layout(&self.user)? != canonical_layout(&self.reference)?)
    }

    #[must_use]
    pub fn reset(&self) -> Self {
        Self {
            id: self.id.clone(),
            reference: self.reference.clone(),
            user: self.reference.clone(),
        }
    }

    pub fn to_storage(&self) -> Result<String, PerspectiveError> {
        let stored = StoredPerspective {
            reference_layout: serialize_layout(&self.reference)?,
            user_layout: serialize_layout(&self.user)?,
        };
        Ok(serde_json::to_string(&stored)?)
    }

    pub fn from_storage(id: impl Into<String>, stored: &str) -> Result<Self, PerspectiveError> {
        let stored: StoredPerspective = serde_json::from_str(stored)?;
        Ok(Self {
            id: id.into(),
            reference: deserialize_layout(&stored.reference_layout)?,
            user: deserialize_layout(&stored.user_layout)?,
        })
    }
}
