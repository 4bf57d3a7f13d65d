//! The `azurerm_hdinsight_cluster` data source

use crate::clients::Clients;
use crate::location;
use crate::parse::ClusterId;
use crate::resources::hdinsight::schema as hdinsight_schema;
use async_trait::async_trait;
use std::collections::HashMap;
use tfplug::context::Context;
use tfplug::data_source::{DataSource, ReadDataSourceRequest, ReadDataSourceResponse};
use tfplug::schema::{AttributeBuilder, AttributeType, BlockBuilder, NestingMode, Schema, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostics, Dynamic, DynamicValue};

pub struct HdinsightClusterDataSource {
    clients: Clients,
}

impl HdinsightClusterDataSource {
    pub fn new(clients: Clients) -> Self {
        Self { clients }
    }

    pub fn schema_static() -> Schema {
        SchemaBuilder::new()
            .attribute(AttributeBuilder::string("id").computed().build())
            .attribute(AttributeBuilder::string("name").required().build())
            .attribute(
                AttributeBuilder::string("resource_group_name")
                    .required()
                    .build(),
            )
            .attribute(AttributeBuilder::string("location").computed().build())
            .attribute(AttributeBuilder::string("cluster_version").computed().build())
            .attribute(
                AttributeBuilder::new(
                    "component_versions",
                    AttributeType::Map(Box::new(AttributeType::String)),
                )
                .computed()
                .build(),
            )
            .attribute(AttributeBuilder::string("kind").computed().build())
            .attribute(AttributeBuilder::string("tier").computed().build())
            .attribute(AttributeBuilder::string("tls_min_version").computed().build())
            .attribute(AttributeBuilder::string("https_endpoint").computed().build())
            .attribute(AttributeBuilder::string("ssh_endpoint").computed().build())
            .attribute(
                AttributeBuilder::string("edge_ssh_endpoint")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::string("kafka_rest_proxy_endpoint")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("tags", AttributeType::Map(Box::new(AttributeType::String)))
                    .computed()
                    .build(),
            )
            .block(
                BlockBuilder::new()
                    .attribute(AttributeBuilder::bool("enabled").computed().build())
                    .attribute(AttributeBuilder::string("username").computed().build())
                    .attribute(
                        AttributeBuilder::string("password")
                            .computed()
                            .sensitive()
                            .build(),
                    )
                    .build_nested("gateway", NestingMode::List)
                    .build(),
            )
            .build()
    }
}

#[async_trait]
impl DataSource for HdinsightClusterDataSource {
    fn type_name(&self) -> &str {
        "azurerm_hdinsight_cluster"
    }

    fn schema(&self) -> Schema {
        Self::schema_static()
    }

    async fn read(&self, _ctx: Context, request: ReadDataSourceRequest) -> ReadDataSourceResponse {
        let mut diagnostics = Diagnostics::new();

        let name = request
            .config
            .get_string(&AttributePath::new("name"))
            .unwrap_or_default();
        let resource_group = request
            .config
            .get_string(&AttributePath::new("resource_group_name"))
            .unwrap_or_default();

        let cluster = match self
            .clients
            .hdinsight_clusters
            .get(&resource_group, &name)
            .await
        {
            Ok(cluster) => cluster,
            Err(e) if e.is_not_found() => {
                diagnostics.add_error(
                    format!(
                        "HDInsight Cluster {:?} was not found in Resource Group {:?}",
                        name, resource_group
                    ),
                    String::new(),
                );
                return ReadDataSourceResponse {
                    state: DynamicValue::null(),
                    diagnostics,
                };
            }
            Err(e) => {
                diagnostics.add_error(
                    format!("retrieving HDInsight Cluster {:?}: {}", name, e),
                    String::new(),
                );
                return ReadDataSourceResponse {
                    state: DynamicValue::null(),
                    diagnostics,
                };
            }
        };

        let configurations = match self
            .clients
            .hdinsight_configurations
            .list(&resource_group, &name)
            .await
        {
            Ok(configurations) => configurations,
            Err(e) => {
                diagnostics.add_error(
                    format!("retrieving configurations for HDInsight Cluster {:?}: {}", name, e),
                    String::new(),
                );
                return ReadDataSourceResponse {
                    state: DynamicValue::null(),
                    diagnostics,
                };
            }
        };

        let id = ClusterId::new(&self.clients.subscription_id, &resource_group, &name);

        let mut state: HashMap<String, Dynamic> = HashMap::new();
        state.insert("id".to_string(), Dynamic::String(id.id()));
        state.insert("name".to_string(), Dynamic::String(name));
        state.insert(
            "resource_group_name".to_string(),
            Dynamic::String(resource_group),
        );
        state.insert(
            "location".to_string(),
            Dynamic::String(location::normalize(
                cluster.location.as_deref().unwrap_or_default(),
            )),
        );
        state.insert(
            "tags".to_string(),
            hdinsight_schema::flatten_tags(cluster.tags.as_ref()),
        );

        let properties = cluster.properties.as_ref();
        state.insert(
            "cluster_version".to_string(),
            Dynamic::String(
                properties
                    .and_then(|p| p.cluster_version.clone())
                    .unwrap_or_default(),
            ),
        );
        state.insert(
            "tier".to_string(),
            Dynamic::String(properties.and_then(|p| p.tier.clone()).unwrap_or_default()),
        );
        state.insert(
            "tls_min_version".to_string(),
            Dynamic::String(
                properties
                    .and_then(|p| p.min_supported_tls_version.clone())
                    .unwrap_or_default(),
            ),
        );

        let definition = properties.and_then(|p| p.cluster_definition.as_ref());
        state.insert(
            "kind".to_string(),
            Dynamic::String(definition.map(|d| d.kind.clone()).unwrap_or_default()),
        );
        state.insert(
            "component_versions".to_string(),
            Dynamic::Map(
                definition
                    .and_then(|d| d.component_version.as_ref())
                    .map(|versions| {
                        versions
                            .iter()
                            .map(|(k, v)| (k.clone(), Dynamic::String(v.clone())))
                            .collect()
                    })
                    .unwrap_or_default(),
            ),
        );

        let empty = HashMap::new();
        let gateway_config = configurations.get("gateway").unwrap_or(&empty);
        state.insert(
            "gateway".to_string(),
            Dynamic::List(hdinsight_schema::flatten_gateway(gateway_config)),
        );

        let no_endpoints = Vec::new();
        let endpoints = properties
            .and_then(|p| p.connectivity_endpoints.as_ref())
            .unwrap_or(&no_endpoints);
        for (attribute, endpoint_name) in [
            ("https_endpoint", "HTTPS"),
            ("ssh_endpoint", "SSH"),
            ("edge_ssh_endpoint", "EDGESSH"),
            ("kafka_rest_proxy_endpoint", "KafkaRestProxyPublicEndpoint"),
        ] {
            state.insert(
                attribute.to_string(),
                Dynamic::String(hdinsight_schema::find_connectivity_endpoint(
                    endpoint_name,
                    endpoints,
                )),
            );
        }

        ReadDataSourceResponse {
            state: DynamicValue::new(Dynamic::Map(state)),
            diagnostics,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_inputs_are_required_and_outputs_computed() {
        let schema = HdinsightClusterDataSource::schema_static();

        assert!(schema.block.attribute("name").unwrap().required);
        assert!(schema.block.attribute("resource_group_name").unwrap().required);
        assert!(schema.block.attribute("kind").unwrap().computed);
        assert!(schema.block.attribute("https_endpoint").unwrap().computed);
    }
}
