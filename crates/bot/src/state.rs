//! Application state shared across handlers.

use std::sync::Arc;

use pickem_core::PickemRepository;

use crate::slack::SlackClient;
use crate::store::LocationStore;

/// Application state shared across all handlers.
#[derive(Clone, Debug)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

#[derive(Debug)]
struct AppStateInner {
    slack: SlackClient,
    store: LocationStore,
    repository: PickemRepository,
}

impl AppState {
    /// Bundle the handler dependencies.
    #[must_use]
    pub fn new(slack: SlackClient, store: LocationStore, repository: PickemRepository) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                slack,
                store,
                repository,
            }),
        }
    }

    /// Slack Web API client.
    #[must_use]
    pub fn slack(&self) -> &SlackClient {
        &self.inner.slack
    }

    /// Where the state blob lives.
    #[must_use]
    pub fn store(&self) -> &LocationStore {
        &self.inner.store
    }

    /// Selection repository.
    #[must_use]
    pub fn repository(&self) -> &PickemRepository {
        &self.inner.repository
    }
}
