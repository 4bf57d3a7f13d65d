pub mod auth;
pub mod client;
pub mod error;
pub mod hdinsight;
pub mod trafficmanager;

pub use auth::Credential;
pub use client::{ArmClient, RetryConfig};
pub use error::ApiError;
