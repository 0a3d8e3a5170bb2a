//! Provider registry: YAML-declared and code-declared providers merged
//! into one atomically replaceable snapshot.
//!
//! Ordering is stable: code drivers first in registration order, then
//! YAML providers in file and document order. A code driver replaces a
//! YAML descriptor of the same name (logged). `reload()` re-reads every
//! source and swaps the snapshot; readers in flight keep the snapshot
//! they started with.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use arc_swap::ArcSwap;
use tracing::{info, warn};

use crate::providers::{GenericProvider, Provider};
use crate::types::provider::ProviderSpec;

/// Descriptor document shipped with the crate.
const BUILTIN_YAML: &str = include_str!("../data/providers.yaml");

/// Where a YAML document comes from.
#[derive(Debug, Clone)]
enum ProviderSource {
    File(PathBuf),
    Inline { label: String, yaml: String },
}

struct Snapshot {
    ordered: Vec<Arc<dyn Provider>>,
    by_name: HashMap<String, Arc<dyn Provider>>,
}

/// Builder for a registry.
#[derive(Default)]
pub struct RegistryBuilder {
    sources: Vec<ProviderSource>,
    code: Vec<Arc<dyn Provider>>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the descriptor document shipped with the crate.
    pub fn with_builtin(self) -> Self {
        self.with_yaml("builtin", BUILTIN_YAML)
    }

    /// Add a YAML descriptor file, re-read on every reload.
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.sources.push(ProviderSource::File(path.into()));
        self
    }

    /// Add an inline YAML document.
    pub fn with_yaml(mut self, label: impl Into<String>, yaml: impl Into<String>) -> Self {
        self.sources.push(ProviderSource::Inline {
            label: label.into(),
            yaml: yaml.into(),
        });
        self
    }

    /// Register a code driver. Code drivers are ordered before YAML
    /// providers and override YAML descriptors of the same name.
    pub fn with_code_driver(mut self, driver: Arc<dyn Provider>) -> Self {
        self.code.push(driver);
        self
    }

    pub fn with_code_drivers(mut self, drivers: impl IntoIterator<Item = Arc<dyn Provider>>) -> Self {
        self.code.extend(drivers);
        self
    }

    pub fn build(self) -> Registry {
        let registry = Registry {
            sources: self.sources,
            code: self.code,
            snapshot: ArcSwap::from_pointee(Snapshot {
                ordered: Vec::new(),
                by_name: HashMap::new(),
            }),
        };
        registry.reload();
        registry
    }
}

/// The provider registry.
pub struct Registry {
    sources: Vec<ProviderSource>,
    code: Vec<Arc<dyn Provider>>,
    snapshot: ArcSwap<Snapshot>,
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Re-read all sources and atomically replace the provider set.
    /// Invalid documents and descriptors are logged and excluded; they
    /// never abort the load. Returns the provider count.
    pub fn reload(&self) -> usize {
        let mut ordered: Vec<Arc<dyn Provider>> = Vec::new();
        let mut by_name: HashMap<String, Arc<dyn Provider>> = HashMap::new();

        for driver in &self.code {
            let name = driver.name().to_string();
            if by_name.contains_key(&name) {
                warn!(provider = %name, "duplicate code driver ignored");
                continue;
            }
            ordered.push(Arc::clone(driver));
            by_name.insert(name, Arc::clone(driver));
        }

        for source in &self.sources {
            let (label, yaml) = match source {
                ProviderSource::Inline { label, yaml } => (label.clone(), yaml.clone()),
                ProviderSource::File(path) => match std::fs::read_to_string(path) {
                    Ok(yaml) => (path.display().to_string(), yaml),
                    Err(err) => {
                        warn!(path = %path.display(), error = %err, "skipping unreadable provider file");
                        continue;
                    }
                },
            };

            for spec in parse_document(&label, &yaml) {
                let name = spec.name.clone();
                if by_name.contains_key(&name) {
                    info!(provider = %name, source = %label, "code driver overrides YAML descriptor");
                    continue;
                }
                match GenericProvider::compile(spec) {
                    Ok(provider) => {
                        let provider: Arc<dyn Provider> = Arc::new(provider);
                        ordered.push(Arc::clone(&provider));
                        by_name.insert(name, provider);
                    }
                    Err(err) => {
                        warn!(provider = %name, source = %label, error = %err, "excluding provider");
                    }
                }
            }
        }

        let count = ordered.len();
        self.snapshot.store(Arc::new(Snapshot { ordered, by_name }));
        info!(providers = count, "registry loaded");
        count
    }

    /// The full provider list in registry order.
    pub fn providers(&self) -> Vec<Arc<dyn Provider>> {
        self.snapshot.load().ordered.clone()
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Provider>> {
        self.snapshot.load().by_name.get(name).cloned()
    }

    /// Resolve a requested subset in registry order. Unknown names are
    /// silently dropped; an empty subset means all providers.
    pub fn select(&self, subset: &[String]) -> Vec<Arc<dyn Provider>> {
        let snapshot = self.snapshot.load();
        if subset.is_empty() {
            return snapshot.ordered.clone();
        }
        snapshot
            .ordered
            .iter()
            .filter(|p| subset.iter().any(|name| name == p.name()))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.snapshot.load().ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Provider names in registry order.
    pub fn names(&self) -> Vec<String> {
        self.snapshot
            .load()
            .ordered
            .iter()
            .map(|p| p.name().to_string())
            .collect()
    }
}

/// Parse one YAML source into specs, preserving document and key order.
fn parse_document(label: &str, yaml: &str) -> Vec<ProviderSpec> {
    use serde::Deserialize;

    let mut specs = Vec::new();
    for document in serde_yaml::Deserializer::from_str(yaml) {
        let value = match serde_yaml::Value::deserialize(document) {
            Ok(value) => value,
            Err(err) => {
                warn!(source = %label, error = %err, "skipping malformed YAML document");
                continue;
            }
        };
        let mapping = match value {
            serde_yaml::Value::Mapping(mapping) => mapping,
            serde_yaml::Value::Null => continue,
            _ => {
                warn!(source = %label, "provider document is not a mapping");
                continue;
            }
        };
        for (key, value) in mapping {
            let name = match key.as_str() {
                Some(name) => name.to_string(),
                None => {
                    warn!(source = %label, "non-string provider name skipped");
                    continue;
                }
            };
            match serde_yaml::from_value::<ProviderSpec>(value) {
                Ok(mut spec) => {
                    spec.name = name;
                    specs.push(spec);
                }
                Err(err) => {
                    warn!(provider = %name, source = %label, error = %err, "invalid descriptor");
                }
            }
        }
    }
    specs
}
