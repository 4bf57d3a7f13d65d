//! DataSource trait and request/response types

use crate::context::Context;
use crate::schema::Schema;
use crate::types::{Config, Diagnostics, State};
use async_trait::async_trait;

/// Read-only lookup against the remote API.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// MUST match the key used in the provider's data source registration.
    fn type_name(&self) -> &str;

    fn schema(&self) -> Schema;

    /// MUST populate every attribute in `state`.
    async fn read(&self, ctx: Context, request: ReadDataSourceRequest) -> ReadDataSourceResponse;
}

pub struct ReadDataSourceRequest {
    pub config: Config,
}

pub struct ReadDataSourceResponse {
    pub state: State,
    pub diagnostics: Diagnostics,
}
