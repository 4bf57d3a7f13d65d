pub mod api;
pub mod clients;
pub mod data_sources;
pub mod location;
pub mod parse;
pub mod resources;

use crate::api::{ArmClient, Credential};
use crate::clients::Clients;
use async_trait::async_trait;
use std::collections::HashMap;
use tfplug::context::Context;
use tfplug::data_source::DataSource;
use tfplug::provider::{ConfigureProviderRequest, ConfigureProviderResponse, Provider};
use tfplug::resource::Resource;
use tfplug::schema::{AttributeBuilder, Schema, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostics};
use tfplug::Result;

pub const DEFAULT_ENDPOINT: &str = "https://management.azure.com";

pub struct AzureRmProvider {
    clients: Option<Clients>,
}

impl Default for AzureRmProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl AzureRmProvider {
    pub fn new() -> Self {
        Self { clients: None }
    }

    fn config_or_env(
        request: &ConfigureProviderRequest,
        attribute: &str,
        env_var: &str,
    ) -> Option<String> {
        request
            .config
            .get(&AttributePath::new(attribute))
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string())
            .or_else(|| std::env::var(env_var).ok().filter(|s| !s.is_empty()))
    }
}

#[async_trait]
impl Provider for AzureRmProvider {
    fn schema(&self) -> Schema {
        SchemaBuilder::new()
            .description("Azure Resource Manager provider configuration")
            .attribute(
                AttributeBuilder::string("subscription_id")
                    .optional()
                    .description("The Subscription ID which should be used (ARM_SUBSCRIPTION_ID)")
                    .build(),
            )
            .attribute(
                AttributeBuilder::string("client_id")
                    .optional()
                    .description("The Client ID of the Service Principal (ARM_CLIENT_ID)")
                    .build(),
            )
            .attribute(
                AttributeBuilder::string("client_secret")
                    .optional()
                    .sensitive()
                    .description("The Client Secret of the Service Principal (ARM_CLIENT_SECRET)")
                    .build(),
            )
            .attribute(
                AttributeBuilder::string("tenant_id")
                    .optional()
                    .description("The Tenant ID of the Service Principal (ARM_TENANT_ID)")
                    .build(),
            )
            .attribute(
                AttributeBuilder::string("endpoint")
                    .optional()
                    .description("The Resource Manager endpoint, for sovereign clouds (ARM_ENDPOINT)")
                    .build(),
            )
            .build()
    }

    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureProviderRequest,
    ) -> ConfigureProviderResponse {
        let mut diagnostics = Diagnostics::new();

        let subscription_id = Self::config_or_env(&request, "subscription_id", "ARM_SUBSCRIPTION_ID");
        let client_id = Self::config_or_env(&request, "client_id", "ARM_CLIENT_ID");
        let client_secret = Self::config_or_env(&request, "client_secret", "ARM_CLIENT_SECRET");
        let tenant_id = Self::config_or_env(&request, "tenant_id", "ARM_TENANT_ID");
        let endpoint = Self::config_or_env(&request, "endpoint", "ARM_ENDPOINT")
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());

        let mut require = |value: Option<String>, attribute: &str, env_var: &str| -> String {
            match value {
                Some(value) => value,
                None => {
                    diagnostics.add_error(
                        format!("{} is required (set in provider config or {} env var)", attribute, env_var),
                        String::new(),
                    );
                    String::new()
                }
            }
        };

        let subscription_id = require(subscription_id, "subscription_id", "ARM_SUBSCRIPTION_ID");
        let client_id = require(client_id, "client_id", "ARM_CLIENT_ID");
        let client_secret = require(client_secret, "client_secret", "ARM_CLIENT_SECRET");
        let tenant_id = require(tenant_id, "tenant_id", "ARM_TENANT_ID");

        if diagnostics.has_errors() {
            return ConfigureProviderResponse { diagnostics };
        }

        let credential = Credential::client_secret(
            client_id,
            client_secret,
            tenant_id,
            format!("{}/", endpoint.trim_end_matches('/')),
        );

        match ArmClient::new(&endpoint, &subscription_id, credential) {
            Ok(arm) => self.clients = Some(Clients::new(arm)),
            Err(e) => {
                diagnostics.add_error(format!("building Azure client: {}", e), String::new());
            }
        }

        ConfigureProviderResponse { diagnostics }
    }

    async fn create_resource(&self, type_name: &str) -> Result<Box<dyn Resource>> {
        let clients = self
            .clients
            .as_ref()
            .ok_or(tfplug::TfplugError::ProviderNotConfigured)?
            .clone();

        match type_name {
            "azurerm_hdinsight_hadoop_cluster" => Ok(Box::new(
                resources::hdinsight::HadoopClusterResource::new(clients),
            )),
            "azurerm_traffic_manager_profile" => Ok(Box::new(
                resources::trafficmanager::TrafficManagerProfileResource::new(clients),
            )),
            "azurerm_traffic_manager_endpoint" => Ok(Box::new(
                resources::trafficmanager::TrafficManagerEndpointResource::new(clients),
            )),
            other => Err(tfplug::TfplugError::ResourceNotFound(other.to_string())),
        }
    }

    async fn create_data_source(&self, type_name: &str) -> Result<Box<dyn DataSource>> {
        let clients = self
            .clients
            .as_ref()
            .ok_or(tfplug::TfplugError::ProviderNotConfigured)?
            .clone();

        match type_name {
            "azurerm_hdinsight_cluster" => Ok(Box::new(
                data_sources::HdinsightClusterDataSource::new(clients),
            )),
            other => Err(tfplug::TfplugError::DataSourceNotFound(other.to_string())),
        }
    }

    async fn resource_schemas(&self) -> HashMap<String, Schema> {
        HashMap::from([
            (
                "azurerm_hdinsight_hadoop_cluster".to_string(),
                resources::hdinsight::HadoopClusterResource::schema_static(),
            ),
            (
                "azurerm_traffic_manager_profile".to_string(),
                resources::trafficmanager::TrafficManagerProfileResource::schema_static(),
            ),
            (
                "azurerm_traffic_manager_endpoint".to_string(),
                resources::trafficmanager::TrafficManagerEndpointResource::schema_static(),
            ),
        ])
    }

    async fn data_source_schemas(&self) -> HashMap<String, Schema> {
        HashMap::from([(
            "azurerm_hdinsight_cluster".to_string(),
            data_sources::HdinsightClusterDataSource::schema_static(),
        )])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tfplug::types::DynamicValue;

    fn configure_request() -> ConfigureProviderRequest {
        ConfigureProviderRequest {
            config: DynamicValue::empty_object(),
        }
    }

    fn set_arm_env() {
        std::env::set_var("ARM_SUBSCRIPTION_ID", "00000000-0000-0000-0000-000000000000");
        std::env::set_var("ARM_CLIENT_ID", "11111111-1111-1111-1111-111111111111");
        std::env::set_var("ARM_CLIENT_SECRET", "secret");
        std::env::set_var("ARM_TENANT_ID", "22222222-2222-2222-2222-222222222222");
    }

    fn clear_arm_env() {
        for var in [
            "ARM_SUBSCRIPTION_ID",
            "ARM_CLIENT_ID",
            "ARM_CLIENT_SECRET",
            "ARM_TENANT_ID",
            "ARM_ENDPOINT",
        ] {
            std::env::remove_var(var);
        }
    }

    #[tokio::test]
    #[serial]
    async fn provider_configures_from_env_vars() {
        set_arm_env();

        let mut provider = AzureRmProvider::new();
        let response = provider.configure(Context::new(), configure_request()).await;

        assert!(response.diagnostics.errors.is_empty());
        assert!(provider.clients.is_some());

        clear_arm_env();
    }

    #[tokio::test]
    #[serial]
    async fn provider_configure_requires_subscription_id() {
        set_arm_env();
        std::env::remove_var("ARM_SUBSCRIPTION_ID");

        let mut provider = AzureRmProvider::new();
        let response = provider.configure(Context::new(), configure_request()).await;

        assert!(!response.diagnostics.errors.is_empty());
        assert!(response.diagnostics.errors[0]
            .summary
            .contains("subscription_id is required"));

        clear_arm_env();
    }

    #[tokio::test]
    #[serial]
    async fn provider_creates_registered_resources() {
        set_arm_env();

        let mut provider = AzureRmProvider::new();
        provider.configure(Context::new(), configure_request()).await;

        for type_name in [
            "azurerm_hdinsight_hadoop_cluster",
            "azurerm_traffic_manager_profile",
            "azurerm_traffic_manager_endpoint",
        ] {
            let resource = provider.create_resource(type_name).await;
            assert!(resource.is_ok(), "expected factory for {}", type_name);
            assert_eq!(resource.unwrap().type_name(), type_name);
        }

        assert!(provider.create_resource("azurerm_unknown").await.is_err());

        clear_arm_env();
    }

    #[tokio::test]
    #[serial]
    async fn provider_creates_registered_data_sources() {
        set_arm_env();

        let mut provider = AzureRmProvider::new();
        provider.configure(Context::new(), configure_request()).await;

        let data_source = provider.create_data_source("azurerm_hdinsight_cluster").await;
        assert!(data_source.is_ok());

        assert!(provider.create_data_source("azurerm_unknown").await.is_err());

        clear_arm_env();
    }

    #[tokio::test]
    async fn provider_rejects_factories_before_configure() {
        let provider = AzureRmProvider::new();

        let result = provider.create_resource("azurerm_traffic_manager_profile").await;
        assert!(matches!(
            result.err(),
            Some(tfplug::TfplugError::ProviderNotConfigured)
        ));
    }

    #[tokio::test]
    async fn schemas_cover_every_registered_type() {
        let provider = AzureRmProvider::new();

        let resource_schemas = provider.resource_schemas().await;
        assert!(resource_schemas.contains_key("azurerm_hdinsight_hadoop_cluster"));
        assert!(resource_schemas.contains_key("azurerm_traffic_manager_profile"));
        assert!(resource_schemas.contains_key("azurerm_traffic_manager_endpoint"));

        let data_source_schemas = provider.data_source_schemas().await;
        assert!(data_source_schemas.contains_key("azurerm_hdinsight_cluster"));
    }
}
