//! Lazily loaded routing configuration.
//!
//! The model registry (`model_registry.yaml`) and routing policy
//! (`routing.yaml`) are read from the configured directory once per process
//! and cached for its lifetime (reload/invalidation is out of scope).  Any
//! failure class — missing file, empty file, YAML error, wrong shape —
//! degrades to an empty structure with a logged warning rather than
//! failing the request.  Registry entries are parsed one at a time so a
//! single malformed entry does not discard the pool.

use hx_gateway_core::{ModelDescriptor, ModelRegistry, RoutingPolicy};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tokio::sync::OnceCell;
use tracing::warn;

/// The two cached configuration documents.
#[derive(Debug, Clone, Default)]
pub struct Tables {
    pub registry: ModelRegistry,
    pub policy: RoutingPolicy,
}

/// Initialize-once holder for [`Tables`].
///
/// `OnceCell` guarantees a single load even under concurrent first access;
/// after that, reads are lock-free.
pub struct RoutingTables {
    cfg_dir: PathBuf,
    loaded: OnceCell<Tables>,
}

impl RoutingTables {
    pub fn new(cfg_dir: PathBuf) -> Self {
        Self {
            cfg_dir,
            loaded: OnceCell::new(),
        }
    }

    /// Pre-populated tables, bypassing the file load.  Used by tests and
    /// embedded deployments.
    pub fn preloaded(tables: Tables) -> Self {
        Self {
            cfg_dir: PathBuf::new(),
            loaded: OnceCell::new_with(Some(tables)),
        }
    }

    /// Get the cached tables, loading them on first use.
    pub async fn get(&self) -> &Tables {
        self.loaded
            .get_or_init(|| async {
                let registry = load_registry(&self.cfg_dir.join("model_registry.yaml")).await;
                let policy = load_policy(&self.cfg_dir.join("routing.yaml")).await;
                Tables { registry, policy }
            })
            .await
    }
}

async fn read_document(path: &Path) -> Option<String> {
    match tokio::fs::read_to_string(path).await {
        Ok(content) if content.trim().is_empty() => {
            warn!(path = %path.display(), "configuration file is empty");
            None
        }
        Ok(content) => Some(content),
        Err(err) => {
            warn!(path = %path.display(), error = %err, "configuration file unreadable");
            None
        }
    }
}

async fn load_registry(path: &Path) -> ModelRegistry {
    let Some(content) = read_document(path).await else {
        return ModelRegistry::default();
    };
    parse_registry(&content).unwrap_or_else(|err| {
        warn!(path = %path.display(), error = %err, "model registry is malformed");
        ModelRegistry::default()
    })
}

/// Parse the registry leniently: the document must be a mapping with a
/// `models` list, but each entry is converted independently and malformed
/// entries are skipped.
fn parse_registry(content: &str) -> Result<ModelRegistry, serde_yaml::Error> {
    #[derive(Deserialize)]
    struct RawRegistry {
        #[serde(default)]
        models: Vec<serde_yaml::Value>,
    }

    let raw: RawRegistry = serde_yaml::from_str(content)?;
    let mut models = Vec::with_capacity(raw.models.len());
    for entry in raw.models {
        match serde_yaml::from_value::<ModelDescriptor>(entry) {
            Ok(model) => models.push(model),
            Err(err) => warn!(error = %err, "skipping malformed model registry entry"),
        }
    }
    Ok(ModelRegistry { models })
}

async fn load_policy(path: &Path) -> RoutingPolicy {
    #[derive(Deserialize)]
    struct PolicyDoc {
        #[serde(default)]
        routing: RoutingPolicy,
    }

    let Some(content) = read_document(path).await else {
        return RoutingPolicy::default();
    };
    match serde_yaml::from_str::<PolicyDoc>(&content) {
        Ok(doc) => doc.routing,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "routing policy is malformed");
            RoutingPolicy::default()
        }
    }
}
