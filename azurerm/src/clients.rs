//! Service clients handed to resources and data sources
//!
//! Built once during provider configure and cloned into each handler.

use crate::api::hdinsight::{
    ApplicationsClient, ClustersClient, ConfigurationsClient, ExtensionsClient,
};
use crate::api::trafficmanager::{EndpointsClient, ProfilesClient};
use crate::api::ArmClient;

#[derive(Clone)]
pub struct Clients {
    pub subscription_id: String,
    pub hdinsight_clusters: ClustersClient,
    pub hdinsight_configurations: ConfigurationsClient,
    pub hdinsight_applications: ApplicationsClient,
    pub hdinsight_extensions: ExtensionsClient,
    pub traffic_manager_profiles: ProfilesClient,
    pub traffic_manager_endpoints: EndpointsClient,
}

impl Clients {
    pub fn new(arm: ArmClient) -> Self {
        Self {
            subscription_id: arm.subscription_id().to_string(),
            hdinsight_clusters: ClustersClient::new(arm.clone()),
            hdinsight_configurations: ConfigurationsClient::new(arm.clone()),
            hdinsight_applications: ApplicationsClient::new(arm.clone()),
            hdinsight_extensions: ExtensionsClient::new(arm.clone()),
            traffic_manager_profiles: ProfilesClient::new(arm.clone()),
            traffic_manager_endpoints: EndpointsClient::new(arm),
        }
    }
}
