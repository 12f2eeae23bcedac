//! Named operation handlers and the bundles that extend them.
//!
//! Handlers are registered at startup (administrative operations) and by a
//! [`BundleLoader`] for every active operation bundle recorded in the store.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use sea_orm::DatabaseConnection;
use serde_json::Value;

use crate::errors::GateError;
use crate::storage::{self, BundleFilter, OperationBundle};

#[async_trait]
pub trait OperationHandler: Send + Sync {
    async fn call(&self, args: Value) -> Result<Value, GateError>;
}

#[async_trait]
impl<F, Fut> OperationHandler for F
where
    F: Fn(Value) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, GateError>> + Send,
{
    async fn call(&self, args: Value) -> Result<Value, GateError> {
        (self)(args).await
    }
}

pub type SharedHandler = Arc<dyn OperationHandler>;

#[derive(Default)]
pub struct OperationRegistry {
    handlers: DashMap<String, SharedHandler>,
}

impl OperationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` under `name`, replacing any previous handler.
    pub fn register<H>(&self, name: impl Into<String>, handler: H)
    where
        H: OperationHandler + 'static,
    {
        self.register_shared(name, Arc::new(handler));
    }

    pub fn register_shared(&self, name: impl Into<String>, handler: SharedHandler) {
        let name = name.into();
        if self.handlers.insert(name.clone(), handler).is_some() {
            tracing::warn!(operation = %name, "Replaced existing operation handler");
        }
    }

    pub fn get(&self, name: &str) -> Option<SharedHandler> {
        self.handlers.get(name).map(|h| Arc::clone(h.value()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handlers.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }
}

/// Produces the handlers contained in an operation bundle.
#[async_trait]
pub trait BundleLoader: Send + Sync {
    async fn load(&self, bundle: &OperationBundle)
        -> Result<Vec<(String, SharedHandler)>, GateError>;
}

/// Bundles compiled into the binary, keyed by bundle path.
#[derive(Default, Clone)]
pub struct BuiltinBundles {
    bundles: HashMap<String, Vec<(String, SharedHandler)>>,
}

impl BuiltinBundles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bundle(mut self, bundle_path: impl Into<String>, handlers: Vec<(String, SharedHandler)>) -> Self {
        self.bundles.insert(bundle_path.into(), handlers);
        self
    }
}

#[async_trait]
impl BundleLoader for BuiltinBundles {
    async fn load(
        &self,
        bundle: &OperationBundle,
    ) -> Result<Vec<(String, SharedHandler)>, GateError> {
        self.bundles
            .get(&bundle.bundle_path)
            .cloned()
            .ok_or_else(|| GateError::NotFound(format!("bundle `{}`", bundle.bundle_path)))
    }
}

/// Load one bundle and register its handlers.
pub async fn register_bundle<L>(
    registry: &OperationRegistry,
    loader: &L,
    bundle: &OperationBundle,
) -> Result<usize, GateError>
where
    L: BundleLoader + ?Sized,
{
    let handlers = loader.load(bundle).await?;
    let count = handlers.len();
    for (name, handler) in handlers {
        tracing::info!(operation = %name, bundle = %bundle.bundle_path, "Registered operation from bundle");
        registry.register_shared(name, handler);
    }
    Ok(count)
}

/// Record the configured bundles, then register every active bundle.
/// A bundle that fails to save or load is logged and skipped.
pub async fn sync_bundles<L>(
    db: &DatabaseConnection,
    registry: &OperationRegistry,
    loader: &L,
    configured: &HashMap<String, String>,
) -> Result<usize, GateError>
where
    L: BundleLoader + ?Sized,
{
    for (name, path) in configured {
        if let Err(e) = storage::save_bundle(db, name, path, true).await {
            tracing::error!(bundle = %name, %path, error = %e, "Bundle save error");
        }
    }

    let active = storage::list_bundles(
        db,
        BundleFilter {
            status: Some(true),
            ..Default::default()
        },
    )
    .await?;
    tracing::info!(bundles = active.len(), "Registering active operation bundles");

    let mut registered = 0;
    for bundle in &active {
        match register_bundle(registry, loader, bundle).await {
            Ok(_) => registered += 1,
            Err(e) => {
                tracing::error!(bundle = %bundle.name, path = %bundle.bundle_path, error = %e, "Bundle register error")
            }
        }
    }
    Ok(registered)
}
