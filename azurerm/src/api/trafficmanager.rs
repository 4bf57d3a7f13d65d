//! Traffic Manager management API (2018-04-01)

use super::client::ArmClient;
use super::error::ApiError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const API_VERSION: &str = "2018-04-01";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Always "global"; Traffic Manager is not a regional service.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<HashMap<String, String>>,
    pub properties: ProfileProperties,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub traffic_routing_method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dns_config: Option<DnsConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monitor_config: Option<MonitorConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoints: Option<Vec<Endpoint>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DnsConfig {
    pub relative_name: String,
    pub ttl: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fqdn: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorConfig {
    pub protocol: String,
    pub port: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval_in_seconds: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_in_seconds: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tolerated_number_of_failures: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_headers: Option<Vec<MonitorCustomHeader>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_status_code_ranges: Option<Vec<StatusCodeRange>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorCustomHeader {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusCodeRange {
    pub min: i64,
    pub max: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Endpoint {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub endpoint_type: Option<String>,
    pub properties: EndpointProperties,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_resource_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint_location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_child_endpoints: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geo_mapping: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subnets: Option<Vec<EndpointSubnet>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_headers: Option<Vec<MonitorCustomHeader>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointSubnet {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<i64>,
}

fn profile_path(subscription_id: &str, resource_group: &str, name: &str) -> String {
    format!(
        "/subscriptions/{}/resourceGroups/{}/providers/Microsoft.Network/trafficManagerProfiles/{}",
        subscription_id, resource_group, name
    )
}

#[derive(Clone)]
pub struct ProfilesClient {
    arm: ArmClient,
}

impl ProfilesClient {
    pub fn new(arm: ArmClient) -> Self {
        Self { arm }
    }

    fn path(&self, resource_group: &str, name: &str) -> String {
        profile_path(self.arm.subscription_id(), resource_group, name)
    }

    /// PUT {profile} — create and update share the one call; no polling,
    /// profiles complete synchronously.
    pub async fn create_or_update(
        &self,
        resource_group: &str,
        name: &str,
        profile: &Profile,
    ) -> Result<Profile, ApiError> {
        self.arm
            .put(&self.path(resource_group, name), API_VERSION, profile)
            .await
    }

    pub async fn get(&self, resource_group: &str, name: &str) -> Result<Profile, ApiError> {
        self.arm.get(&self.path(resource_group, name), API_VERSION).await
    }

    pub async fn delete(&self, resource_group: &str, name: &str) -> Result<(), ApiError> {
        self.arm
            .delete(&self.path(resource_group, name), API_VERSION)
            .await
    }
}

/// Endpoints are child resources of a profile, addressed by endpoint type
/// (azureEndpoints / externalEndpoints / nestedEndpoints) plus name.
#[derive(Clone)]
pub struct EndpointsClient {
    arm: ArmClient,
}

impl EndpointsClient {
    pub fn new(arm: ArmClient) -> Self {
        Self { arm }
    }

    fn path(
        &self,
        resource_group: &str,
        profile_name: &str,
        endpoint_type: &str,
        name: &str,
    ) -> String {
        format!(
            "{}/{}/{}",
            profile_path(self.arm.subscription_id(), resource_group, profile_name),
            endpoint_type,
            name
        )
    }

    pub async fn create_or_update(
        &self,
        resource_group: &str,
        profile_name: &str,
        endpoint_type: &str,
        name: &str,
        endpoint: &Endpoint,
    ) -> Result<Endpoint, ApiError> {
        self.arm
            .put(
                &self.path(resource_group, profile_name, endpoint_type, name),
                API_VERSION,
                endpoint,
            )
            .await
    }

    pub async fn get(
        &self,
        resource_group: &str,
        profile_name: &str,
        endpoint_type: &str,
        name: &str,
    ) -> Result<Endpoint, ApiError> {
        self.arm
            .get(
                &self.path(resource_group, profile_name, endpoint_type, name),
                API_VERSION,
            )
            .await
    }

    pub async fn delete(
        &self,
        resource_group: &str,
        profile_name: &str,
        endpoint_type: &str,
        name: &str,
    ) -> Result<(), ApiError> {
        self.arm
            .delete(
                &self.path(resource_group, profile_name, endpoint_type, name),
                API_VERSION,
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::auth::Credential;
    use mockito::Server;

    fn test_arm_client(endpoint: String) -> ArmClient {
        ArmClient::new(
            &endpoint,
            "00000000-0000-0000-0000-000000000000",
            Credential::Static("test-token".to_string()),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn profile_round_trips_monitor_config() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock(
                "PUT",
                "/subscriptions/00000000-0000-0000-0000-000000000000/resourceGroups/rg1/providers/Microsoft.Network/trafficManagerProfiles/profile1",
            )
            .match_query(mockito::Matcher::Any)
            .with_body(
                r#"{
                    "id": "/subscriptions/00000000-0000-0000-0000-000000000000/resourceGroups/rg1/providers/Microsoft.Network/trafficManagerProfiles/profile1",
                    "name": "profile1",
                    "location": "global",
                    "properties": {
                        "profileStatus": "Enabled",
                        "trafficRoutingMethod": "Weighted",
                        "dnsConfig": {"relativeName": "profile1", "ttl": 100, "fqdn": "profile1.trafficmanager.net"},
                        "monitorConfig": {
                            "protocol": "HTTP",
                            "port": 80,
                            "path": "/",
                            "expectedStatusCodeRanges": [{"min": 100, "max": 101}]
                        }
                    }
                }"#,
            )
            .create_async()
            .await;

        let client = ProfilesClient::new(test_arm_client(server.url()));
        let profile = Profile {
            id: None,
            name: None,
            location: Some("global".to_string()),
            tags: None,
            properties: ProfileProperties {
                profile_status: Some("Enabled".to_string()),
                traffic_routing_method: Some("Weighted".to_string()),
                dns_config: Some(DnsConfig {
                    relative_name: "profile1".to_string(),
                    ttl: 100,
                    fqdn: None,
                }),
                monitor_config: Some(MonitorConfig {
                    protocol: "HTTP".to_string(),
                    port: 80,
                    path: Some("/".to_string()),
                    interval_in_seconds: None,
                    timeout_in_seconds: None,
                    tolerated_number_of_failures: None,
                    custom_headers: None,
                    expected_status_code_ranges: Some(vec![StatusCodeRange { min: 100, max: 101 }]),
                }),
                endpoints: None,
            },
        };

        let created = client.create_or_update("rg1", "profile1", &profile).await.unwrap();

        let dns = created.properties.dns_config.unwrap();
        assert_eq!(dns.fqdn.as_deref(), Some("profile1.trafficmanager.net"));
        let ranges = created
            .properties
            .monitor_config
            .unwrap()
            .expected_status_code_ranges
            .unwrap();
        assert_eq!(ranges[0].min, 100);
        assert_eq!(ranges[0].max, 101);
    }

    #[tokio::test]
    async fn endpoint_path_includes_endpoint_type() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock(
                "GET",
                "/subscriptions/00000000-0000-0000-0000-000000000000/resourceGroups/rg1/providers/Microsoft.Network/trafficManagerProfiles/profile1/externalEndpoints/endpoint1",
            )
            .match_query(mockito::Matcher::Any)
            .with_body(r#"{"name": "endpoint1", "properties": {"target": "www.example.com", "weight": 5}}"#)
            .create_async()
            .await;

        let client = EndpointsClient::new(test_arm_client(server.url()));
        let endpoint = client
            .get("rg1", "profile1", "externalEndpoints", "endpoint1")
            .await
            .unwrap();

        assert_eq!(endpoint.properties.target.as_deref(), Some("www.example.com"));
        mock.assert_async().await;
    }
}
