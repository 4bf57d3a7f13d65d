//! Provider trait
//!
//! Providers are factories: `configure` builds the API clients once, and
//! `create_resource`/`create_data_source` hand out handler instances that
//! already hold everything they need. The gRPC layer creates handlers on
//! demand per request, so no locking is required around resource state.

use crate::context::Context;
use crate::data_source::DataSource;
use crate::resource::Resource;
use crate::schema::Schema;
use crate::types::{Config, Diagnostics};
use crate::Result;
use async_trait::async_trait;
use std::collections::HashMap;

#[async_trait]
pub trait Provider: Send + Sync {
    /// Schema of the provider block itself.
    fn schema(&self) -> Schema;

    /// Called once, before any resource operation. Build API clients here.
    async fn configure(&mut self, ctx: Context, request: ConfigureProviderRequest)
        -> ConfigureProviderResponse;

    /// Instantiate a resource handler for the given Terraform type name.
    async fn create_resource(&self, type_name: &str) -> Result<Box<dyn Resource>>;

    /// Instantiate a data source handler for the given Terraform type name.
    async fn create_data_source(&self, type_name: &str) -> Result<Box<dyn DataSource>>;

    /// Schemas for every resource type, keyed by type name. Cache these.
    async fn resource_schemas(&self) -> HashMap<String, Schema>;

    /// Schemas for every data source type, keyed by type name. Cache these.
    async fn data_source_schemas(&self) -> HashMap<String, Schema>;
}

pub struct ConfigureProviderRequest {
    pub config: Config,
}

pub struct ConfigureProviderResponse {
    pub diagnostics: Diagnostics,
}
