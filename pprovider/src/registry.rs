//! Static, priority-ordered provider registry with an `auto`/pinned preference.
//!
//! The registry is built once at startup and read-only afterwards: no runtime
//! re-ranking, no health-based reordering. `candidates` returns the attempt
//! order for one request.

use std::sync::Arc;

use crate::{ChatProvider, ProviderError, ProviderId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderCapability {
    /// Blocking completion only; streamed requests are served via `complete`.
    Completion,
    /// Incremental delivery supported (implies the blocking path as well).
    Streaming,
}

impl ProviderCapability {
    pub fn supports_streaming(self) -> bool {
        matches!(self, Self::Streaming)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderDescriptor {
    pub id: ProviderId,
    pub model: String,
    pub priority: u32,
    pub capability: ProviderCapability,
}

impl ProviderDescriptor {
    pub fn new(id: ProviderId, model: impl Into<String>, priority: u32) -> Self {
        Self {
            id,
            model: model.into(),
            priority,
            capability: ProviderCapability::Streaming,
        }
    }

    pub fn with_capability(mut self, capability: ProviderCapability) -> Self {
        self.capability = capability;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProviderPreference {
    #[default]
    Auto,
    Pinned(ProviderId),
}

#[derive(Clone, Debug)]
pub struct ProviderEntry {
    pub descriptor: ProviderDescriptor,
    pub client: Arc<dyn ChatProvider>,
}

#[derive(Debug)]
pub struct ProviderRegistry {
    entries: Vec<ProviderEntry>,
    preference: ProviderPreference,
}

impl ProviderRegistry {
    pub fn builder() -> ProviderRegistryBuilder {
        ProviderRegistryBuilder::default()
    }

    /// Ordered, non-empty attempt sequence for one request.
    ///
    /// A pinned preference moves the pinned provider to the front; the
    /// remaining entries keep their priority order as fallback. A pinned id
    /// with no registered entry degrades to the auto order.
    pub fn candidates(&self) -> Vec<ProviderEntry> {
        match self.preference {
            ProviderPreference::Auto => self.entries.clone(),
            ProviderPreference::Pinned(id) => {
                let (mut pinned, rest): (Vec<_>, Vec<_>) = self
                    .entries
                    .iter()
                    .cloned()
                    .partition(|entry| entry.descriptor.id == id);
                pinned.extend(rest);
                pinned
            }
        }
    }

    /// The provider that will serve the next request, for health reporting.
    pub fn selected(&self) -> Option<ProviderEntry> {
        self.candidates().into_iter().next()
    }

    pub fn preference(&self) -> ProviderPreference {
        self.preference
    }

    pub fn entries(&self) -> &[ProviderEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Default)]
pub struct ProviderRegistryBuilder {
    entries: Vec<ProviderEntry>,
    preference: ProviderPreference,
}

impl ProviderRegistryBuilder {
    pub fn register(mut self, descriptor: ProviderDescriptor, client: Arc<dyn ChatProvider>) -> Self {
        self.entries.push(ProviderEntry { descriptor, client });
        self
    }

    pub fn preference(mut self, preference: ProviderPreference) -> Self {
        self.preference = preference;
        self
    }

    pub fn build(mut self) -> Result<ProviderRegistry, ProviderError> {
        if self.entries.is_empty() {
            return Err(ProviderError::not_configured(
                "no provider holds valid credentials",
            ));
        }

        self.entries
            .sort_by(|a, b| b.descriptor.priority.cmp(&a.descriptor.priority));

        Ok(ProviderRegistry {
            entries: self.entries,
            preference: self.preference,
        })
    }
}
