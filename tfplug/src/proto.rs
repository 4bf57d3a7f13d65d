//! Generated Terraform Plugin Protocol v6 types
//!
//! The protobuf code is generated at build time by tonic-build from
//! `proto/tfplugin6.proto` and included here. RPC request/response types
//! live in snake_case modules (e.g. `plan_resource_change::Request`);
//! several message names collide with framework types, so always refer to
//! them through the `proto::` prefix.

include!(concat!(env!("OUT_DIR"), "/tfplugin6.rs"));

pub use provider_server::{Provider as ProviderService, ProviderServer};
