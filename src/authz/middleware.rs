use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::authz::engine;
use crate::authz::errors::AuthzError;
use crate::authz::protocol;
use crate::authz::store::RuleStore;
use crate::authz::types::{AuthzFailure, Decision};
use crate::registry::OperationRegistry;

/// Inbound request as seen by the rules middleware.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestContext {
    /// Transport channel, e.g. "rest" or "wss"
    pub channel: String,
    /// Whether the payload arrived end-to-end encrypted
    #[serde(default)]
    pub encrypted: bool,
    #[serde(default)]
    pub payload: Option<Payload>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Payload {
    /// Caller phone identifier
    #[serde(default)]
    pub sender: Option<String>,
    /// Operation name
    #[serde(default)]
    pub process: Option<String>,
    #[serde(default)]
    pub body: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<AuthzFailure>,
}

impl RequestContext {
    pub fn failure(&self) -> Option<AuthzFailure> {
        self.payload.as_ref().and_then(|p| p.error)
    }
}

/// Per-request rule enforcement in front of the operation registry.
pub struct RulesMiddleware<S> {
    store: S,
    operations: Arc<OperationRegistry>,
}

impl<S: RuleStore> RulesMiddleware<S> {
    /// Fails when no operation registry is supplied.
    pub fn new(store: S, operations: Option<Arc<OperationRegistry>>) -> Result<Self, AuthzError> {
        let operations = operations.ok_or(AuthzError::MissingOperations)?;
        Ok(Self { store, operations })
    }

    pub fn operations(&self) -> &Arc<OperationRegistry> {
        &self.operations
    }

    /// Annotate `ctx` with the outcome of rule evaluation. A permitted request
    /// is returned unchanged.
    pub async fn authorize(&self, mut ctx: RequestContext) -> RequestContext {
        let protocol = protocol::classify(&ctx.channel, ctx.encrypted);

        let Some(payload) = ctx.payload.as_mut() else {
            return ctx;
        };

        let Some(phone) = payload.sender.clone().filter(|s| !s.is_empty()) else {
            payload.error = Some(AuthzFailure::MissingSender);
            return ctx;
        };

        let Some(operation) = payload.process.clone().filter(|s| !s.is_empty()) else {
            payload.error = Some(AuthzFailure::MissingOperation);
            return ctx;
        };

        let outcome = match self.store.get_user_by_identity(&phone).await {
            Ok(caller) => engine::evaluate(&self.store, &operation, caller.as_ref(), protocol).await,
            Err(e) => Err(AuthzError::from(e)),
        };

        match outcome {
            Ok(Decision::Permit) => {
                tracing::debug!(%operation, %protocol, "Request permitted");
            }
            Ok(Decision::Deny) => {
                tracing::info!(%operation, %protocol, sender = %phone, "Permission denied");
                payload.error = Some(AuthzFailure::PermissionDenied);
            }
            Err(e) => {
                tracing::error!(%operation, error = %e, "Rule evaluation failed");
                payload.error = Some(AuthzFailure::StoreUnavailable);
            }
        }
        ctx
    }
}
