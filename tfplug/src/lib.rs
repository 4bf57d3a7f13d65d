//! tfplug - Terraform Plugin Framework for Rust
//!
//! A framework for building Terraform providers in Rust, implementing the
//! Terraform Plugin Protocol v6.

// Core modules
pub mod context;
pub mod error;
pub mod schema;
pub mod types;
pub mod validator;

// Provider API modules
pub mod data_source;
pub mod provider;
pub mod resource;

// Helper modules
pub mod import;
pub mod poll;

// Framework implementation modules
pub mod grpc;
pub mod proto;
pub mod server;

// Re-exports for convenience
pub use context::Context;
pub use data_source::DataSource;
pub use error::{Result, TfplugError};
pub use import::import_state_passthrough_id;
pub use poll::StateChangeConf;
pub use provider::Provider;
pub use resource::{Resource, Timeouts};
pub use schema::{
    AttributeBuilder, AttributeType, Block, BlockBuilder, CaseDifference, DiffSuppress,
    NestedBlock, NestingMode, Schema, SchemaBuilder, SuppressFn,
};
pub use server::{serve, serve_default, ServerConfig};
pub use types::{
    AttributePath, Config, Diagnostic, DiagnosticSeverity, Diagnostics, Dynamic, DynamicValue,
    State,
};

// Convenience macro for main function
#[macro_export]
macro_rules! serve_provider {
    ($provider:expr) => {
        #[tokio::main]
        async fn main() -> $crate::Result<()> {
            $crate::serve($provider, $crate::ServerConfig::default()).await
        }
    };
    ($provider:expr, $config:expr) => {
        #[tokio::main]
        async fn main() -> $crate::Result<()> {
            $crate::serve($provider, $config).await
        }
    };
}
