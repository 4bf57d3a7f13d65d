//! HDInsight management API (2018-06-01)
//!
//! DTOs mirror the ARM wire format; service clients wrap [`ArmClient`] with
//! the resource paths of the clusters, configurations, applications and
//! extensions endpoints.

use super::client::ArmClient;
use super::error::ApiError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const API_VERSION: &str = "2018-06-01";

// cluster states reported while provisioning; anything else (other than
// Running) during an edge-node apply is treated as a failure
pub const CLUSTER_STATE_RUNNING: &str = "Running";
pub const CLUSTER_STATE_ACCEPTED: &str = "Accepted";
pub const CLUSTER_STATE_AZURE_VM_CONFIGURATION: &str = "AzureVMConfiguration";
pub const CLUSTER_STATE_HDINSIGHT_CONFIGURATION: &str = "HdInsightConfiguration";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterCreateParametersExtended {
    pub location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<HashMap<String, String>>,
    pub properties: ClusterCreateProperties,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity: Option<ClusterIdentity>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterCreateProperties {
    pub cluster_version: String,
    pub os_type: String,
    pub tier: String,
    pub cluster_definition: ClusterDefinition,
    pub compute_profile: ComputeProfile,
    pub storage_profile: StorageProfile,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_properties: Option<NetworkProperties>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_supported_tls_version: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterDefinition {
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub component_version: Option<HashMap<String, String>>,
    /// Free-form configuration document: gateway credentials plus the
    /// metastore `*-site`/`*-env` maps.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub configurations: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComputeProfile {
    pub roles: Vec<Role>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_instance_count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_instance_count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub autoscale_configuration: Option<Autoscale>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hardware_profile: Option<HardwareProfile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub os_profile: Option<OsProfile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub virtual_network_profile: Option<VirtualNetworkProfile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_disks_groups: Option<Vec<DataDisksGroups>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HardwareProfile {
    pub vm_size: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OsProfile {
    pub linux_operating_system_profile: LinuxOperatingSystemProfile,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinuxOperatingSystemProfile {
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssh_profile: Option<SshProfile>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SshProfile {
    pub public_keys: Vec<SshPublicKey>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SshPublicKey {
    pub certificate_data: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VirtualNetworkProfile {
    pub id: String,
    pub subnet: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataDisksGroups {
    pub disks_per_node: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageProfile {
    // the wire name really is all lowercase
    pub storageaccounts: Vec<StorageAccount>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageAccount {
    pub name: String,
    pub is_default: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub msi_resource_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_system: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Autoscale {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capacity: Option<AutoscaleCapacity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recurrence: Option<AutoscaleRecurrence>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoscaleCapacity {
    pub min_instance_count: i64,
    pub max_instance_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoscaleRecurrence {
    pub time_zone: String,
    pub schedule: Vec<AutoscaleSchedule>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoscaleSchedule {
    pub days: Vec<String>,
    pub time_and_capacity: AutoscaleTimeAndCapacity,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoscaleTimeAndCapacity {
    pub time: String,
    pub min_instance_count: i64,
    pub max_instance_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterIdentity {
    pub r#type: String,
    pub user_assigned_identities: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkProperties {
    pub resource_provider_connection: String,
    pub private_link: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cluster {
    pub id: Option<String>,
    pub name: Option<String>,
    pub location: Option<String>,
    pub tags: Option<HashMap<String, String>>,
    pub properties: Option<ClusterGetProperties>,
    pub identity: Option<ClusterIdentity>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterGetProperties {
    pub cluster_version: Option<String>,
    pub os_type: Option<String>,
    pub tier: Option<String>,
    pub cluster_definition: Option<ClusterDefinition>,
    pub compute_profile: Option<ComputeProfile>,
    pub provisioning_state: Option<String>,
    pub cluster_state: Option<String>,
    pub connectivity_endpoints: Option<Vec<ConnectivityEndpoint>>,
    pub network_properties: Option<NetworkProperties>,
    pub min_supported_tls_version: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectivityEndpoint {
    pub name: Option<String>,
    pub protocol: Option<String>,
    pub location: Option<String>,
    pub port: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClusterPatchParameters {
    pub tags: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterResizeParameters {
    pub target_instance_count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct UpdateGatewaySettingsParameters {
    #[serde(rename = "restAuthCredential.isEnabled")]
    pub is_enabled: bool,
    #[serde(rename = "restAuthCredential.username")]
    pub username: String,
    #[serde(rename = "restAuthCredential.password")]
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClusterConfigurations {
    pub configurations: Option<HashMap<String, HashMap<String, String>>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub id: Option<String>,
    pub name: Option<String>,
    pub properties: ApplicationProperties,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationProperties {
    pub compute_profile: ComputeProfile,
    pub install_script_actions: Vec<RuntimeScriptAction>,
    pub application_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeScriptAction {
    pub name: String,
    pub uri: String,
    pub roles: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterMonitoringRequest {
    pub workspace_id: String,
    pub primary_key: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterMonitoringResponse {
    pub cluster_monitoring_enabled: Option<bool>,
    pub workspace_id: Option<String>,
}

fn cluster_path(subscription_id: &str, resource_group: &str, name: &str) -> String {
    format!(
        "/subscriptions/{}/resourceGroups/{}/providers/Microsoft.HDInsight/clusters/{}",
        subscription_id, resource_group, name
    )
}

/// Cluster CRUD plus the cluster-level actions (resize, gateway settings).
#[derive(Clone)]
pub struct ClustersClient {
    arm: ArmClient,
}

impl ClustersClient {
    pub fn new(arm: ArmClient) -> Self {
        Self { arm }
    }

    fn path(&self, resource_group: &str, name: &str) -> String {
        cluster_path(self.arm.subscription_id(), resource_group, name)
    }

    /// PUT {cluster}; waits for the create operation to finish.
    pub async fn create(
        &self,
        resource_group: &str,
        name: &str,
        parameters: &ClusterCreateParametersExtended,
    ) -> Result<Cluster, ApiError> {
        self.arm
            .put_and_wait(&self.path(resource_group, name), API_VERSION, parameters)
            .await
    }

    /// GET {cluster}
    pub async fn get(&self, resource_group: &str, name: &str) -> Result<Cluster, ApiError> {
        self.arm.get(&self.path(resource_group, name), API_VERSION).await
    }

    /// PATCH {cluster} — tags only
    pub async fn update(
        &self,
        resource_group: &str,
        name: &str,
        parameters: &ClusterPatchParameters,
    ) -> Result<Cluster, ApiError> {
        self.arm
            .patch(&self.path(resource_group, name), API_VERSION, parameters)
            .await
    }

    /// POST {cluster}/roles/workernode/resize
    pub async fn resize(
        &self,
        resource_group: &str,
        name: &str,
        parameters: &ClusterResizeParameters,
    ) -> Result<(), ApiError> {
        let path = format!("{}/roles/workernode/resize", self.path(resource_group, name));
        self.arm.post_and_wait(&path, API_VERSION, parameters).await
    }

    /// POST {cluster}/updateGatewaySettings
    pub async fn update_gateway_settings(
        &self,
        resource_group: &str,
        name: &str,
        parameters: &UpdateGatewaySettingsParameters,
    ) -> Result<(), ApiError> {
        let path = format!("{}/updateGatewaySettings", self.path(resource_group, name));
        self.arm.post_and_wait(&path, API_VERSION, parameters).await
    }

    /// DELETE {cluster}
    pub async fn delete(&self, resource_group: &str, name: &str) -> Result<(), ApiError> {
        self.arm
            .delete_and_wait(&self.path(resource_group, name), API_VERSION)
            .await
    }
}

/// Read access to the cluster configuration documents (gateway, metastores).
#[derive(Clone)]
pub struct ConfigurationsClient {
    arm: ArmClient,
}

impl ConfigurationsClient {
    pub fn new(arm: ArmClient) -> Self {
        Self { arm }
    }

    /// POST {cluster}/configurations
    pub async fn list(
        &self,
        resource_group: &str,
        cluster_name: &str,
    ) -> Result<HashMap<String, HashMap<String, String>>, ApiError> {
        let path = format!(
            "{}/configurations",
            cluster_path(self.arm.subscription_id(), resource_group, cluster_name)
        );
        let response: ClusterConfigurations = self
            .arm
            .post(&path, API_VERSION, &serde_json::json!({}))
            .await?;
        Ok(response.configurations.unwrap_or_default())
    }
}

/// Edge nodes are modelled as cluster applications.
#[derive(Clone)]
pub struct ApplicationsClient {
    arm: ArmClient,
}

impl ApplicationsClient {
    pub fn new(arm: ArmClient) -> Self {
        Self { arm }
    }

    fn path(&self, resource_group: &str, cluster_name: &str, name: &str) -> String {
        format!(
            "{}/applications/{}",
            cluster_path(self.arm.subscription_id(), resource_group, cluster_name),
            name
        )
    }

    pub async fn create(
        &self,
        resource_group: &str,
        cluster_name: &str,
        name: &str,
        application: &Application,
    ) -> Result<Application, ApiError> {
        self.arm
            .put_and_wait(
                &self.path(resource_group, cluster_name, name),
                API_VERSION,
                application,
            )
            .await
    }

    pub async fn get(
        &self,
        resource_group: &str,
        cluster_name: &str,
        name: &str,
    ) -> Result<Application, ApiError> {
        self.arm
            .get(&self.path(resource_group, cluster_name, name), API_VERSION)
            .await
    }

    pub async fn delete(
        &self,
        resource_group: &str,
        cluster_name: &str,
        name: &str,
    ) -> Result<(), ApiError> {
        self.arm
            .delete_and_wait(&self.path(resource_group, cluster_name, name), API_VERSION)
            .await
    }
}

/// Log Analytics monitoring extension.
#[derive(Clone)]
pub struct ExtensionsClient {
    arm: ArmClient,
}

impl ExtensionsClient {
    pub fn new(arm: ArmClient) -> Self {
        Self { arm }
    }

    fn path(&self, resource_group: &str, cluster_name: &str) -> String {
        format!(
            "{}/extensions/clustermonitoring",
            cluster_path(self.arm.subscription_id(), resource_group, cluster_name)
        )
    }

    pub async fn enable_monitoring(
        &self,
        resource_group: &str,
        cluster_name: &str,
        request: &ClusterMonitoringRequest,
    ) -> Result<(), ApiError> {
        let path = self.path(resource_group, cluster_name);
        self.arm.put_and_poll(&path, API_VERSION, request).await
    }

    pub async fn get_monitoring_status(
        &self,
        resource_group: &str,
        cluster_name: &str,
    ) -> Result<ClusterMonitoringResponse, ApiError> {
        self.arm
            .get(&self.path(resource_group, cluster_name), API_VERSION)
            .await
    }

    pub async fn disable_monitoring(
        &self,
        resource_group: &str,
        cluster_name: &str,
    ) -> Result<(), ApiError> {
        self.arm
            .delete_and_wait(&self.path(resource_group, cluster_name), API_VERSION)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::auth::Credential;
    use crate::api::client::RetryConfig;
    use mockito::Server;
    use std::time::Duration;

    fn test_arm_client(endpoint: String) -> ArmClient {
        ArmClient::with_config(
            &endpoint,
            "00000000-0000-0000-0000-000000000000",
            Credential::Static("test-token".to_string()),
            RetryConfig {
                lro_poll_interval: Duration::from_millis(5),
                ..Default::default()
            },
        )
        .unwrap()
    }

    #[tokio::test]
    async fn clusters_get_decodes_properties() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock(
                "GET",
                "/subscriptions/00000000-0000-0000-0000-000000000000/resourceGroups/rg1/providers/Microsoft.HDInsight/clusters/cluster1",
            )
            .match_query(mockito::Matcher::Any)
            .with_body(
                r#"{
                    "id": "/subscriptions/00000000-0000-0000-0000-000000000000/resourceGroups/rg1/providers/Microsoft.HDInsight/clusters/cluster1",
                    "name": "cluster1",
                    "location": "westeurope",
                    "properties": {
                        "clusterVersion": "3.6.1000.67",
                        "osType": "Linux",
                        "tier": "Standard",
                        "clusterState": "Running",
                        "connectivityEndpoints": [
                            {"name": "HTTPS", "protocol": "TCP", "location": "cluster1.azurehdinsight.net", "port": 443}
                        ]
                    }
                }"#,
            )
            .create_async()
            .await;

        let client = ClustersClient::new(test_arm_client(server.url()));
        let cluster = client.get("rg1", "cluster1").await.unwrap();

        let properties = cluster.properties.unwrap();
        assert_eq!(properties.tier.as_deref(), Some("Standard"));
        assert_eq!(properties.cluster_state.as_deref(), Some("Running"));
        assert_eq!(
            properties.connectivity_endpoints.unwrap()[0].location.as_deref(),
            Some("cluster1.azurehdinsight.net")
        );
    }

    #[tokio::test]
    async fn configurations_list_unwraps_envelope() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", mockito::Matcher::Any)
            .with_body(
                r#"{"configurations": {"gateway": {"restAuthCredential.isEnabled": "true", "restAuthCredential.username": "acctestuser"}}}"#,
            )
            .create_async()
            .await;

        let client = ConfigurationsClient::new(test_arm_client(server.url()));
        let configurations = client.list("rg1", "cluster1").await.unwrap();

        assert_eq!(
            configurations["gateway"]["restAuthCredential.username"],
            "acctestuser"
        );
    }

    #[tokio::test]
    async fn gateway_settings_parameters_use_dotted_keys() {
        let parameters = UpdateGatewaySettingsParameters {
            is_enabled: true,
            username: "acctestuser".to_string(),
            password: "Password!123".to_string(),
        };

        let encoded = serde_json::to_value(&parameters).unwrap();
        assert_eq!(encoded["restAuthCredential.isEnabled"], true);
        assert_eq!(encoded["restAuthCredential.username"], "acctestuser");
    }
}
