//! Collector registry.
//!
//! Collectors are registered by an explicit call list at startup. Once the
//! registry is shared it is read-only; `register` needs `&mut self`, so it
//! cannot race with a scrape.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{info, info_span, warn, Span};

use super::{neo_collector, ontology_collector, Collector, CollectorError};
use crate::config::{CollectorSettings, CollectorsConfig};

/// Collectors registered with this flag run unless the operator opts out.
pub const DEFAULT_ENABLED: bool = true;
/// Collectors registered with this flag only run when the operator opts in.
pub const DEFAULT_DISABLED: bool = false;

/// Builds a collector instance.
pub type CollectorFactory = fn(&FactoryContext) -> Result<Arc<dyn Collector>, CollectorError>;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("collector '{0}' is already registered")]
    Duplicate(String),

    #[error("failed to create collector '{name}': {source}")]
    Factory {
        name: String,
        #[source]
        source: CollectorError,
    },
}

/// Everything a factory gets to build its collector: the operator's
/// settings, the RPC deadline and a span that scopes the collector's logs.
#[derive(Debug, Clone)]
pub struct FactoryContext {
    pub name: String,
    pub span: Span,
    pub settings: CollectorSettings,
    pub rpc_timeout: Duration,
}

impl FactoryContext {
    /// The configured endpoint, or `default` if the operator left it unset.
    pub fn rpc_endpoint<'a>(&'a self, default: &'a str) -> &'a str {
        self.settings.rpc.as_deref().unwrap_or(default)
    }
}

struct RegistryEntry {
    name: String,
    enabled_by_default: bool,
    factory: CollectorFactory,
}

#[derive(Default)]
pub struct CollectorRegistry {
    entries: Vec<RegistryEntry>,
}

impl CollectorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a collector. Registering a name twice is a configuration error.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        enabled_by_default: bool,
        factory: CollectorFactory,
    ) -> Result<(), RegistryError> {
        let name = name.into();
        if self.entries.iter().any(|entry| entry.name == name) {
            return Err(RegistryError::Duplicate(name));
        }
        self.entries.push(RegistryEntry {
            name,
            enabled_by_default,
            factory,
        });
        Ok(())
    }

    /// Registered names, in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.name.as_str())
    }

    /// Whether `name` is registered and resolves to enabled. An explicit
    /// `enabled` setting beats the registered default.
    pub fn is_enabled(&self, name: &str, config: &CollectorsConfig) -> bool {
        self.entries
            .iter()
            .find(|entry| entry.name == name)
            .map(|entry| resolve_enabled(entry, config))
            .unwrap_or(false)
    }

    /// Builds every enabled collector. Any factory failure aborts startup.
    pub fn instantiate(
        &self,
        config: &CollectorsConfig,
        rpc_timeout: Duration,
    ) -> Result<BTreeMap<String, Arc<dyn Collector>>, RegistryError> {
        for name in config.keys() {
            if !self.entries.iter().any(|entry| &entry.name == name) {
                warn!(collector = %name, "ignoring settings for unknown collector");
            }
        }

        let mut collectors = BTreeMap::new();
        for entry in &self.entries {
            if !resolve_enabled(entry, config) {
                info!(collector = %entry.name, "collector disabled");
                continue;
            }

            let ctx = FactoryContext {
                name: entry.name.clone(),
                span: info_span!("collector", collector = %entry.name),
                settings: config.get(&entry.name).cloned().unwrap_or_default(),
                rpc_timeout,
            };
            let collector = (entry.factory)(&ctx).map_err(|source| RegistryError::Factory {
                name: entry.name.clone(),
                source,
            })?;
            info!(collector = %entry.name, "collector enabled");
            collectors.insert(entry.name.clone(), collector);
        }
        Ok(collectors)
    }
}

fn resolve_enabled(entry: &RegistryEntry, config: &CollectorsConfig) -> bool {
    config
        .get(&entry.name)
        .and_then(|settings| settings.enabled)
        .unwrap_or(entry.enabled_by_default)
}

/// The registry with every collector this exporter ships.
pub fn default_registry() -> Result<CollectorRegistry, RegistryError> {
    let mut registry = CollectorRegistry::new();
    registry.register(
        neo_collector::NAME,
        DEFAULT_ENABLED,
        neo_collector::new_collector,
    )?;
    registry.register(
        ontology_collector::NAME,
        DEFAULT_ENABLED,
        ontology_collector::new_collector,
    )?;
    Ok(registry)
}
