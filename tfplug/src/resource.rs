//! Resource trait and request/response types

use crate::context::Context;
use crate::schema::Schema;
use crate::types::{Config, Diagnostics, DynamicValue, State};
use async_trait::async_trait;
use std::time::Duration;

/// Independent durations for each CRUD operation, enforced by the framework
/// around the handler invocation.
#[derive(Debug, Clone, Copy)]
pub struct Timeouts {
    pub create: Duration,
    pub read: Duration,
    pub update: Duration,
    pub delete: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            create: Duration::from_secs(30 * 60),
            read: Duration::from_secs(5 * 60),
            update: Duration::from_secs(30 * 60),
            delete: Duration::from_secs(30 * 60),
        }
    }
}

/// CRUD handler for one managed resource type.
///
/// Instances are created per request by the provider factory and already
/// hold their API clients; each invocation is independently sequential.
#[async_trait]
pub trait Resource: Send + Sync {
    /// MUST match the key used in the provider's resource registration.
    fn type_name(&self) -> &str;

    fn schema(&self) -> Schema;

    fn timeouts(&self) -> Timeouts {
        Timeouts::default()
    }

    /// Cross-attribute configuration checks, beyond the per-attribute
    /// validators the framework runs from the schema.
    async fn validate(&self, _ctx: Context, _request: ValidateResourceRequest)
        -> ValidateResourceResponse {
        ValidateResourceResponse {
            diagnostics: Diagnostics::new(),
        }
    }

    /// MUST populate every attribute in `new_state`, including computed ones.
    async fn create(&self, ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse;

    /// MUST return the accurate current state, or `None` when the remote
    /// resource no longer exists (which clears it from Terraform state).
    async fn read(&self, ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse;

    /// MUST apply every change from `planned_state`.
    async fn update(&self, ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse;

    async fn delete(&self, ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse;

    /// Called for `terraform import`. The default declines; resources that
    /// import by ID can delegate to
    /// [`crate::import::import_state_passthrough_id`].
    async fn import(&self, _ctx: Context, request: ImportResourceRequest) -> ImportResourceResponse {
        let mut diagnostics = Diagnostics::new();
        diagnostics.add_error(
            "resource does not support import",
            format!("cannot import id {:?}", request.id),
        );
        ImportResourceResponse {
            state: DynamicValue::null(),
            diagnostics,
        }
    }
}

pub struct ValidateResourceRequest {
    pub config: Config,
}

pub struct ValidateResourceResponse {
    pub diagnostics: Diagnostics,
}

pub struct CreateResourceRequest {
    pub config: Config,
    pub planned_state: DynamicValue,
}

pub struct CreateResourceResponse {
    pub new_state: State,
    pub diagnostics: Diagnostics,
}

pub struct ReadResourceRequest {
    pub current_state: State,
}

pub struct ReadResourceResponse {
    pub new_state: Option<State>,
    pub diagnostics: Diagnostics,
}

pub struct UpdateResourceRequest {
    pub prior_state: State,
    pub planned_state: DynamicValue,
    pub config: Config,
}

pub struct UpdateResourceResponse {
    pub new_state: State,
    pub diagnostics: Diagnostics,
}

pub struct DeleteResourceRequest {
    pub prior_state: State,
}

pub struct DeleteResourceResponse {
    pub diagnostics: Diagnostics,
}

pub struct ImportResourceRequest {
    pub id: String,
}

pub struct ImportResourceResponse {
    pub state: State,
    pub diagnostics: Diagnostics,
}
