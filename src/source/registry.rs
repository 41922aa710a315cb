//! Source registry keyed by identity.
//!
//! The [`SourceRegistry`] keeps clients in registration order; lookups are by
//! identity only, the rest of the crate never branches on which site it is.

use std::sync::Arc;

use tracing::debug;

use super::{SourceClient, SourceError};

/// An ordered collection of source clients.
#[derive(Clone)]
pub struct SourceRegistry {
    clients: Vec<Arc<dyn SourceClient>>,
}

impl SourceRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            clients: Vec::new(),
        }
    }

    /// Registers a client. A client with the same name replaces the earlier one
    /// in place, keeping its list position.
    #[tracing::instrument(skip(self, client), fields(source_name))]
    pub fn register<C>(&mut self, client: C)
    where
        C: SourceClient + 'static,
    {
        self.register_shared(Arc::new(client));
    }

    /// Registers an already shared client.
    pub fn register_shared(&mut self, client: Arc<dyn SourceClient>) {
        tracing::Span::current().record("source_name", client.name());
        debug!(name = client.name(), "Registering source");
        if let Some(slot) = self.clients.iter_mut().find(|c| c.name() == client.name()) {
            *slot = client;
        } else {
            self.clients.push(client);
        }
    }

    /// Returns the client registered under `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn SourceClient>> {
        self.clients.iter().find(|c| c.name() == name).cloned()
    }

    /// Returns the client registered under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::UnknownSource`] listing the registered names.
    pub fn require(&self, name: &str) -> Result<Arc<dyn SourceClient>, SourceError> {
        self.get(name)
            .ok_or_else(|| SourceError::unknown_source(name, &self.names()))
    }

    /// Returns true if a client is registered under `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.clients.iter().any(|c| c.name() == name)
    }

    /// Registered identities in registration order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.clients.iter().map(|c| c.name()).collect()
    }

    /// Keeps only the clients whose name satisfies `keep`.
    pub fn retain(&mut self, mut keep: impl FnMut(&str) -> bool) {
        self.clients.retain(|client| keep(client.name()));
    }

    /// Returns the number of registered clients.
    #[must_use]
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    /// Returns true if no clients are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

impl std::fmt::Debug for SourceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceRegistry")
            .field("sources", &self.names())
            .finish()
    }
}

impl Default for SourceRegistry {
    fn default() -> Self {
        Self::new()
    }
}
