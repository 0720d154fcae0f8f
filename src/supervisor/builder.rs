//! This module provides the `SupervisorBuilder` for constructing a
//! `Supervisor`.

use std::sync::Arc;

use super::{Supervisor, SupervisorError};
use crate::{
    config::AppConfig, notification::Notifier, persistence::traits::StateStore,
    sources::SourceWatcher,
};

/// A builder for creating a `Supervisor` instance.
#[derive(Default)]
pub struct SupervisorBuilder {
    config: Option<AppConfig>,
    store: Option<Arc<dyn StateStore>>,
    notifier: Option<Arc<dyn Notifier>>,
    watchers: Vec<Arc<dyn SourceWatcher>>,
}

impl SupervisorBuilder {
    /// Creates a new, empty `SupervisorBuilder`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the application configuration for the `Supervisor`.
    pub fn config(mut self, config: AppConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Sets the state store for the `Supervisor`.
    pub fn store(mut self, store: Arc<dyn StateStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Sets the notifier for the `Supervisor`.
    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Sets the watchers the `Supervisor` sweeps over.
    pub fn watchers(mut self, watchers: Vec<Box<dyn SourceWatcher>>) -> Self {
        self.watchers = watchers.into_iter().map(Arc::from).collect();
        self
    }

    /// Assembles and validates the components to build a `Supervisor`.
    pub fn build(self) -> Result<Supervisor, SupervisorError> {
        let config = self.config.ok_or(SupervisorError::MissingConfig)?;
        let store = self.store.ok_or(SupervisorError::MissingStateStore)?;
        let notifier = self.notifier.ok_or(SupervisorError::MissingNotifier)?;
        if self.watchers.is_empty() {
            return Err(SupervisorError::MissingWatchers);
        }

        tracing::info!(watchers = self.watchers.len(), "Supervisor assembled.");
        Ok(Supervisor::new(config, store, notifier, self.watchers))
    }
}
