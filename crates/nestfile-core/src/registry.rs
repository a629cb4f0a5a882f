//! Provider registry
//!
//! Holds every registered [`ContainerProvider`] and picks the one that owns a
//! boundary candidate.

use crate::security::MAX_SIGNATURE_SPAN;
use crate::traits::ContainerProvider;
use crate::types::BoundaryProbe;
use std::sync::Arc;

/// Ordered collection of container providers
///
/// Registration order breaks priority ties: the provider registered first
/// wins among equal priorities.
#[derive(Debug, Clone, Default)]
pub struct ProviderRegistry {
    providers: Vec<Arc<dyn ContainerProvider>>,
}

impl ProviderRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a provider
    pub fn register(&mut self, provider: Arc<dyn ContainerProvider>) {
        tracing::debug!(provider = provider.identify(), "Registered container provider");
        self.providers.push(provider);
    }

    /// Builder form of [`register`](Self::register)
    pub fn with(mut self, provider: Arc<dyn ContainerProvider>) -> Self {
        self.register(provider);
        self
    }

    /// Providers in registration order
    pub fn providers(&self) -> &[Arc<dyn ContainerProvider>] {
        &self.providers
    }

    /// Look up a provider by its identifier
    pub fn find(&self, identify: &str) -> Option<&Arc<dyn ContainerProvider>> {
        self.providers.iter().find(|p| p.identify() == identify)
    }

    /// Number of registered providers
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// True if nothing is registered
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Head length needed to evaluate every provider's content signatures
    pub fn signature_span(&self) -> usize {
        self.providers
            .iter()
            .map(|p| p.signature_span())
            .max()
            .unwrap_or(0)
            .min(MAX_SIGNATURE_SPAN)
    }

    /// Highest-priority provider claiming the candidate, if any
    pub fn resolve(&self, probe: &BoundaryProbe<'_>) -> Option<Arc<dyn ContainerProvider>> {
        let mut best: Option<(i32, &Arc<dyn ContainerProvider>)> = None;

        for provider in &self.providers {
            if !provider.claims(probe) {
                continue;
            }
            let priority = provider.priority(probe.parent, probe.name);
            match best {
                Some((current, _)) if priority <= current => {}
                _ => best = Some((priority, provider)),
            }
        }

        if let Some((priority, provider)) = best {
            tracing::trace!(
                candidate = probe.path,
                provider = provider.identify(),
                priority,
                "Boundary claimed"
            );
        }

        best.map(|(_, provider)| Arc::clone(provider))
    }
}
