//! Ties configuration, the layout store, perspectives and storage together.

use std::collections::BTreeMap;
use std::sync::Arc;

use workbench_layout::{Layout, canonical_layout};

use crate::config::WorkbenchConfig;
use crate::error::{ConfigError, PerspectiveError};
use crate::perspective::Perspective;
use crate::storage::PerspectiveStorage;
use crate::store::{LayoutStore, TicketId};

pub struct Workbench<S> {
    config: WorkbenchConfig,
    store: Arc<LayoutStore>,
    storage: S,
    perspectives: BTreeMap<String, Perspective>,
    active: Option<String>,
}

impl<S: PerspectiveStorage> Workbench<S> {
    /// Validates `config` and publishes its initial layout.
    pub fn new(config: WorkbenchConfig, storage: S) -> Result<Self, ConfigError> {
        let config = config.validated()?;
        let store = LayoutStore::with_outcome_capacity(
            config.initial_layout(),
            config.store.max_pending,
            config.store.max_outcomes,
        );
        Ok(Self {
            config,
            store: Arc::new(store),
            storage,
            perspectives: BTreeMap::new(),
            active: None,
        })
    }

    #[must_use]
    pub fn config(&self) -> &WorkbenchConfig {
        &self.config
    }

    /// Shared handle for readers and navigating threads.
    #[must_use]
    pub fn store(&self) -> &Arc<LayoutStore> {
        &self.store
    }

    #[must_use]
    pub fn storage(&self) -> &S {
        &self.storage
    }

    #[must_use]
    pub fn layout(&self) -> Arc<Layout> {
        self.store.layout()
    }

    #[must_use]
    pub fn active_perspective_id(&self) -> Option<&str> {
        self.active.as_deref()
    }

    #[must_use]
    pub fn perspective(&self, id: &str) -> Option<&Perspective> {
        self.perspectives.get(id)
    }

    pub fn perspective_ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.perspectives.keys().map(String::as_str)
    }

    pub fn register_perspective(
        &mut self,
        id: impl Into<String>,
        reference: Layout,
    ) -> Result<(), PerspectiveError> {
        let id = id.into();
        if self.perspectives.contains_key(&id) {
            return Err(PerspectiveError::DuplicatePerspective { id });
        }
        tracing::info!(target: "workbench.perspective", perspective = %id, "perspective registered");
        let _ = self
            .perspectives
            .insert(id.clone(), Perspective::new(id, reference));
        Ok(())
    }

    /// Persist the active perspective, then publish the user layout of `id`.
    ///
    /// The persisted user layout of `id` is restored unless its reference
    /// layout no longer matches the registered one.
    pub fn switch_perspective(&mut self, id: &str) -> Result<TicketId, PerspectiveError> {
        let registered = self
            .perspectives
            .get(id)
            .ok_or_else(|| PerspectiveError::UnknownPerspective { id: id.to_owned() })?
            .clone();
        if self.active.is_some() {
            self.persist_active_perspective()?;
        }

        let perspective = match self.storage.load(&self.config.storage_key(id))? {
            Some(stored) => {
                let stored = Perspective::from_storage(id, &stored)?;
                if canonical_layout(stored.reference())? == canonical_layout(registered.reference())? {
                    registered.with_user(stored.user().clone())
                } else {
                    tracing::info!(
                        target: "workbench.perspective",
                        perspective = id,
                        "reference layout changed, discarding stored user layout"
                    );
                    registered
                }
            }
            None => registered,
        };

        let ticket = self
            .store
            .replace(format!("switch perspective {id}"), perspective.user().clone())?;
        let _ = self.perspectives.insert(id.to_owned(), perspective);
        self.active = Some(id.to_owned());
        tracing::info!(target: "workbench.perspective", perspective = id, "perspective switched");
        Ok(ticket)
    }

    /// Discard the user's modifications of the active perspective.
    pub fn reset_perspective(&mut self) -> Result<TicketId, PerspectiveError> {
        let id = self
            .active
            .clone()
            .ok_or(PerspectiveError::NoActivePerspective)?;
        let perspective = self
            .perspectives
            .get(&id)
            .ok_or_else(|| PerspectiveError::UnknownPerspective { id: id.clone() })?
            .reset();
        let ticket = self
            .store
            .replace(format!("reset perspective {id}"), perspective.user().clone())?;
        self.storage
            .store(&self.config.storage_key(&id), perspective.to_storage()?)?;
        let _ = self.perspectives.insert(id.clone(), perspective);
        tracing::info!(target: "workbench.perspective", perspective = %id, "perspective reset");
        Ok(ticket)
    }

    /// Record the published layout as the active perspective's user layout
    /// and write it to storage.
    pub fn persist_active_perspective(&mut self) -> Result<(), PerspectiveError> {
        let id = self
            .active
            .clone()
            .ok_or(PerspectiveError::NoActivePerspective)?;
        let perspective = self
            .perspectives
            .get(&id)
            .ok_or_else(|| PerspectiveError::UnknownPerspective { id: id.clone() })?
            .clone()
            .with_user(Layout::clone(&self.store.layout()));
        self.storage
            .store(&self.config.storage_key(&id), perspective.to_storage()?)?;
        let _ = self.perspectives.insert(id.clone(), perspective);
        tracing::info!(target: "workbench.perspective", perspective = %id, "perspective persisted");
        Ok(())
    }
}
