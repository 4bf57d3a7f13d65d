//! The `azurerm_hdinsight_hadoop_cluster` resource

use crate::api::hdinsight::{
    Application, ApplicationProperties, ClusterCreateParametersExtended, ClusterCreateProperties,
    ClusterDefinition, ClusterPatchParameters, ClusterResizeParameters, ComputeProfile,
    HardwareProfile, Role, RuntimeScriptAction, StorageProfile, UpdateGatewaySettingsParameters,
    CLUSTER_STATE_ACCEPTED, CLUSTER_STATE_AZURE_VM_CONFIGURATION,
    CLUSTER_STATE_HDINSIGHT_CONFIGURATION, CLUSTER_STATE_RUNNING,
};
use crate::clients::Clients;
use crate::location;
use crate::parse::ClusterId;
use crate::resources::hdinsight::schema as hdinsight_schema;
use crate::resources::hdinsight::schema::NodeDefinition;
use crate::resources::hdinsight::validate;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tfplug::context::Context;
use tfplug::poll::{BoxError, StateChangeConf};
use tfplug::resource::{
    CreateResourceRequest, CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse,
    ImportResourceRequest, ImportResourceResponse, ReadResourceRequest, ReadResourceResponse,
    Resource, Timeouts, UpdateResourceRequest, UpdateResourceResponse, ValidateResourceRequest,
    ValidateResourceResponse,
};
use tfplug::schema::{
    AttributeBuilder, AttributeType, BlockBuilder, CaseDifference, NestingMode, Schema,
    SchemaBuilder, SuppressFn,
};
use tfplug::types::{AttributePath, Diagnostics, Dynamic, DynamicValue};
use tfplug::validator::{IntBetween, ValidateFn};

const KIND: &str = "Hadoop";
const COMPONENT: &str = "hadoop";

fn head_node_definition() -> NodeDefinition {
    NodeDefinition {
        fixed_min_instance_count: Some(2),
        fixed_target_instance_count: Some(2),
        ..Default::default()
    }
}

fn worker_node_definition() -> NodeDefinition {
    NodeDefinition {
        can_specify_instance_count: true,
        min_instance_count: 1,
        can_auto_scale_by_capacity: true,
        can_auto_scale_on_schedule: true,
        ..Default::default()
    }
}

fn zookeeper_node_definition() -> NodeDefinition {
    NodeDefinition {
        fixed_min_instance_count: Some(1),
        fixed_target_instance_count: Some(3),
        ..Default::default()
    }
}

pub struct HadoopClusterResource {
    clients: Clients,
}

impl HadoopClusterResource {
    pub fn new(clients: Clients) -> Self {
        Self { clients }
    }

    pub fn schema_static() -> Schema {
        SchemaBuilder::new()
            .attribute(AttributeBuilder::string("id").computed().build())
            .attribute(hdinsight_schema::schema_cluster_name())
            .attribute(
                AttributeBuilder::string("resource_group_name")
                    .required()
                    .force_new()
                    .build(),
            )
            .attribute(
                AttributeBuilder::string("location")
                    .required()
                    .force_new()
                    .diff_suppress(Arc::new(SuppressFn(location::diff_suppress)))
                    .build(),
            )
            .attribute(hdinsight_schema::schema_cluster_version())
            .attribute(hdinsight_schema::schema_tier())
            .attribute(hdinsight_schema::schema_tls_min_version())
            .attribute(
                AttributeBuilder::new("tags", AttributeType::Map(Box::new(AttributeType::String)))
                    .optional()
                    .build(),
            )
            .attribute(AttributeBuilder::string("https_endpoint").computed().build())
            .attribute(AttributeBuilder::string("ssh_endpoint").computed().build())
            .block(
                BlockBuilder::new()
                    .attribute(
                        AttributeBuilder::string(COMPONENT)
                            .required()
                            .force_new()
                            .build(),
                    )
                    .build_nested("component_version", NestingMode::List)
                    .min_items(1)
                    .max_items(1)
                    .build(),
            )
            .block(hdinsight_schema::schema_gateway())
            .block(hdinsight_schema::schema_storage_accounts())
            .block(hdinsight_schema::schema_storage_accounts_gen2())
            .block(
                BlockBuilder::new()
                    .block(hdinsight_schema::schema_node_definition(
                        "head_node",
                        &head_node_definition(),
                        true,
                    ))
                    .block(hdinsight_schema::schema_node_definition(
                        "worker_node",
                        &worker_node_definition(),
                        true,
                    ))
                    .block(hdinsight_schema::schema_node_definition(
                        "zookeeper_node",
                        &zookeeper_node_definition(),
                        true,
                    ))
                    .block(edge_node_block())
                    .build_nested("roles", NestingMode::List)
                    .min_items(1)
                    .max_items(1)
                    .build(),
            )
            .block(hdinsight_schema::schema_network())
            .block(hdinsight_schema::schema_metastores())
            .block(hdinsight_schema::schema_monitor())
            .build()
    }

    /// Reads the remote cluster and flattens it, merging the values the API
    /// never returns (passwords, SSH keys, VM sizes, storage keys) from
    /// `existing`.
    async fn read_state(
        &self,
        id: &ClusterId,
        existing: &DynamicValue,
    ) -> Result<Option<DynamicValue>, String> {
        let cluster = match self
            .clients
            .hdinsight_clusters
            .get(&id.resource_group, &id.name)
            .await
        {
            Ok(cluster) => cluster,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(format!("retrieving HDInsight Hadoop Cluster {:?}: {}", id.name, e)),
        };

        let configurations = self
            .clients
            .hdinsight_configurations
            .list(&id.resource_group, &id.name)
            .await
            .map_err(|e| {
                format!(
                    "retrieving configurations for HDInsight Hadoop Cluster {:?}: {}",
                    id.name, e
                )
            })?;

        let monitor = match self
            .clients
            .hdinsight_extensions
            .get_monitoring_status(&id.resource_group, &id.name)
            .await
        {
            Ok(monitor) => Some(monitor),
            Err(e) if e.is_not_found() => None,
            Err(e) => {
                return Err(format!(
                    "retrieving monitoring status for HDInsight Hadoop Cluster {:?}: {}",
                    id.name, e
                ))
            }
        };

        let mut state: HashMap<String, Dynamic> = HashMap::new();
        state.insert("id".to_string(), Dynamic::String(id.id()));
        state.insert("name".to_string(), Dynamic::String(id.name.clone()));
        state.insert(
            "resource_group_name".to_string(),
            Dynamic::String(id.resource_group.clone()),
        );
        state.insert(
            "location".to_string(),
            Dynamic::String(location::normalize(
                cluster.location.as_deref().unwrap_or_default(),
            )),
        );
        state.insert("tags".to_string(), hdinsight_schema::flatten_tags(cluster.tags.as_ref()));

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
        if let Some(tls) = properties.and_then(|p| p.min_supported_tls_version.clone()) {
            state.insert("tls_min_version".to_string(), Dynamic::String(tls));
        } else if let Some(tls) = existing.get(&AttributePath::new("tls_min_version")) {
            state.insert("tls_min_version".to_string(), tls.clone());
        }

        let component_versions = properties
            .and_then(|p| p.cluster_definition.as_ref())
            .and_then(|d| d.component_version.as_ref());
        state.insert(
            "component_version".to_string(),
            Dynamic::List(hdinsight_schema::flatten_component_version(
                component_versions,
                COMPONENT,
            )),
        );

        let empty = HashMap::new();
        let gateway_config = configurations.get("gateway").unwrap_or(&empty);
        state.insert(
            "gateway".to_string(),
            Dynamic::List(hdinsight_schema::flatten_gateway(gateway_config)),
        );
        state.insert(
            "metastores".to_string(),
            Dynamic::List(hdinsight_schema::flatten_metastores(&configurations)),
        );

        state.insert(
            "network".to_string(),
            Dynamic::List(hdinsight_schema::flatten_network(
                properties.and_then(|p| p.network_properties.as_ref()),
            )),
        );

        // storage account keys are never returned by the API
        for key in ["storage_account", "storage_account_gen2"] {
            let carried = existing
                .get(&AttributePath::new(key))
                .cloned()
                .unwrap_or(Dynamic::List(Vec::new()));
            state.insert(key.to_string(), carried);
        }

        let no_roles = Vec::new();
        let roles = properties
            .and_then(|p| p.compute_profile.as_ref())
            .map(|p| &p.roles)
            .unwrap_or(&no_roles);

        let existing_role = |name: &str| -> Vec<Dynamic> {
            existing
                .get(
                    &AttributePath::new("roles")
                        .index(0)
                        .attribute(name),
                )
                .and_then(|v| v.as_list())
                .map(|l| l.to_vec())
                .unwrap_or_default()
        };

        let mut flattened_roles: HashMap<String, Dynamic> = HashMap::new();
        flattened_roles.insert(
            "head_node".to_string(),
            Dynamic::List(hdinsight_schema::flatten_node_definition(
                hdinsight_schema::find_role(roles, "headnode"),
                &existing_role("head_node"),
                &head_node_definition(),
            )),
        );
        flattened_roles.insert(
            "worker_node".to_string(),
            Dynamic::List(hdinsight_schema::flatten_node_definition(
                hdinsight_schema::find_role(roles, "workernode"),
                &existing_role("worker_node"),
                &worker_node_definition(),
            )),
        );
        flattened_roles.insert(
            "zookeeper_node".to_string(),
            Dynamic::List(hdinsight_schema::flatten_node_definition(
                hdinsight_schema::find_role(roles, "zookeepernode"),
                &existing_role("zookeeper_node"),
                &zookeeper_node_definition(),
            )),
        );
        // the install script actions of an edge node are not returned by the
        // API, so the block is carried over from state as-is
        flattened_roles.insert("edge_node".to_string(), Dynamic::List(existing_role("edge_node")));
        state.insert(
            "roles".to_string(),
            Dynamic::List(vec![Dynamic::Map(flattened_roles)]),
        );

        let monitor_block = match monitor {
            Some(status) if status.cluster_monitoring_enabled.unwrap_or(false) => {
                vec![Dynamic::Map(HashMap::from([
                    (
                        "log_analytics_workspace_id".to_string(),
                        Dynamic::String(status.workspace_id.unwrap_or_default()),
                    ),
                    // the key is not returned; the schema suppresses the diff
                    ("primary_key".to_string(), Dynamic::String("*****".to_string())),
                ]))]
            }
            _ => Vec::new(),
        };
        state.insert("monitor".to_string(), Dynamic::List(monitor_block));

        let no_endpoints = Vec::new();
        let endpoints = properties
            .and_then(|p| p.connectivity_endpoints.as_ref())
            .unwrap_or(&no_endpoints);
        state.insert(
            "https_endpoint".to_string(),
            Dynamic::String(hdinsight_schema::find_connectivity_endpoint("HTTPS", endpoints)),
        );
        state.insert(
            "ssh_endpoint".to_string(),
            Dynamic::String(hdinsight_schema::find_connectivity_endpoint("SSH", endpoints)),
        );

        Ok(Some(DynamicValue::new(Dynamic::Map(state))))
    }

    /// Blocks until the cluster reports `Running` again, e.g. after an
    /// edge-node install or removal.
    async fn wait_for_ready(&self, ctx: &Context, id: &ClusterId) -> Result<(), String> {
        let clusters = self.clients.hdinsight_clusters.clone();
        let resource_group = id.resource_group.clone();
        let name = id.name.clone();

        let timeout = ctx
            .deadline()
            .map(|d| d.saturating_duration_since(Instant::now()))
            .unwrap_or(Duration::from_secs(60 * 60));

        let conf = StateChangeConf::<String> {
            pending: vec![
                CLUSTER_STATE_AZURE_VM_CONFIGURATION.to_string(),
                CLUSTER_STATE_ACCEPTED.to_string(),
                CLUSTER_STATE_HDINSIGHT_CONFIGURATION.to_string(),
            ],
            target: vec![CLUSTER_STATE_RUNNING.to_string()],
            refresh: Box::new(move || {
                let clusters = clusters.clone();
                let resource_group = resource_group.clone();
                let name = name.clone();
                Box::pin(async move {
                    let cluster = clusters
                        .get(&resource_group, &name)
                        .await
                        .map_err(|e| -> BoxError {
                            format!("issuing read request: {}", e).into()
                        })?;
                    let state = cluster
                        .properties
                        .and_then(|p| p.cluster_state)
                        .unwrap_or_default();
                    Ok((state.clone(), state))
                })
            }),
            timeout,
            delay: Duration::ZERO,
            poll_interval: Duration::from_secs(15),
        };

        conf.wait_for_state(ctx)
            .await
            .map(|_| ())
            .map_err(|e| format!("waiting for HDInsight Cluster {:?} to be ready: {}", id.name, e))
    }
}

fn edge_node_block() -> tfplug::schema::NestedBlock {
    BlockBuilder::new()
        .attribute(
            AttributeBuilder::number("target_instance_count")
                .required()
                .validator(Arc::new(IntBetween { min: 1, max: 25 }))
                .build(),
        )
        .attribute(
            AttributeBuilder::string("vm_size")
                .required()
                .force_new()
                .diff_suppress(Arc::new(CaseDifference))
                .validator(Arc::new(ValidateFn(validate::node_definition_vm_size)))
                .build(),
        )
        .block(
            BlockBuilder::new()
                .attribute(AttributeBuilder::string("name").required().force_new().build())
                .attribute(AttributeBuilder::string("uri").required().force_new().build())
                .build_nested("install_script_action", NestingMode::List)
                .min_items(1)
                .build(),
        )
        .build_nested("edge_node", NestingMode::List)
        .max_items(1)
        .build()
}

fn expand_edge_node(input: &[Dynamic]) -> Option<Application> {
    let vs = input.first().and_then(|v| v.as_map())?;

    let target_instance_count = vs
        .get("target_instance_count")
        .and_then(|v| v.as_i64())
        .unwrap_or(1);
    let vm_size = vs
        .get("vm_size")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();

    let install_script_actions = vs
        .get("install_script_action")
        .and_then(|v| v.as_list())
        .map(|actions| {
            actions
                .iter()
                .filter_map(|a| a.as_map())
                .map(|action| RuntimeScriptAction {
                    name: action
                        .get("name")
                        .and_then(|v| v.as_str())
                        .unwrap_or_default()
                        .to_string(),
                    uri: action
                        .get("uri")
                        .and_then(|v| v.as_str())
                        .unwrap_or_default()
                        .to_string(),
                    roles: vec!["edgenode".to_string()],
                })
                .collect()
        })
        .unwrap_or_default();

    Some(Application {
        id: None,
        name: None,
        properties: ApplicationProperties {
            compute_profile: ComputeProfile {
                roles: vec![Role {
                    name: "edgenode".to_string(),
                    min_instance_count: None,
                    target_instance_count: Some(target_instance_count),
                    autoscale_configuration: None,
                    hardware_profile: Some(HardwareProfile { vm_size }),
                    os_profile: None,
                    virtual_network_profile: None,
                    data_disks_groups: None,
                }],
            },
            install_script_actions,
            application_type: "CustomApplication".to_string(),
        },
    })
}

fn list_at(value: &DynamicValue, path: AttributePath) -> Vec<Dynamic> {
    value
        .get(&path)
        .and_then(|v| v.as_list())
        .map(|l| l.to_vec())
        .unwrap_or_default()
}

fn string_at(value: &DynamicValue, path: AttributePath) -> String {
    value
        .get(&path)
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string()
}

fn has_change(prior: &DynamicValue, planned: &DynamicValue, path: &AttributePath) -> bool {
    prior.get(path) != planned.get(path)
}

#[async_trait]
impl Resource for HadoopClusterResource {
    fn type_name(&self) -> &str {
        "azurerm_hdinsight_hadoop_cluster"
    }

    fn schema(&self) -> Schema {
        Self::schema_static()
    }

    fn timeouts(&self) -> Timeouts {
        Timeouts {
            create: Duration::from_secs(60 * 60),
            read: Duration::from_secs(5 * 60),
            update: Duration::from_secs(60 * 60),
            delete: Duration::from_secs(60 * 60),
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateResourceRequest,
    ) -> ValidateResourceResponse {
        let mut diagnostics = Diagnostics::new();

        // password and ssh_keys are mutually exclusive per node definition
        for node in ["head_node", "worker_node", "zookeeper_node"] {
            let path = AttributePath::new("roles").index(0).attribute(node).index(0);
            let password = request
                .config
                .get(&path.clone().attribute("password"))
                .and_then(|v| v.as_str())
                .unwrap_or_default();
            let ssh_keys = request
                .config
                .get(&path.clone().attribute("ssh_keys"))
                .and_then(|v| v.as_list())
                .map(|l| l.len())
                .unwrap_or(0);

            if !password.is_empty() && ssh_keys > 0 {
                diagnostics.add_attribute_error(
                    path.attribute("ssh_keys"),
                    format!("`password` and `ssh_keys` cannot both be set for `{}`", node),
                    String::new(),
                );
            }
        }

        ValidateResourceResponse { diagnostics }
    }

    async fn create(&self, ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        let mut diagnostics = Diagnostics::new();
        let config = &request.config;

        let name = string_at(config, AttributePath::new("name"));
        let resource_group = string_at(config, AttributePath::new("resource_group_name"));
        let id = ClusterId::new(&self.clients.subscription_id, &resource_group, &name);

        // an existing cluster has to be imported, not silently adopted
        match self.clients.hdinsight_clusters.get(&resource_group, &name).await {
            Ok(_) => {
                diagnostics.add_error(
                    format!(
                        "A resource with the ID {:?} already exists - to be managed via Terraform this resource needs to be imported into the State",
                        id.id()
                    ),
                    String::new(),
                );
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    diagnostics,
                };
            }
            Err(e) if e.is_not_found() => {}
            Err(e) => {
                diagnostics.add_error(
                    format!("checking for presence of existing HDInsight Hadoop Cluster {:?}: {}", name, e),
                    String::new(),
                );
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    diagnostics,
                };
            }
        }

        let mut configurations = match hdinsight_schema::expand_gateway(&list_at(
            config,
            AttributePath::new("gateway"),
        )) {
            serde_json::Value::Object(map) => map,
            _ => serde_json::Map::new(),
        };
        hdinsight_schema::expand_metastores(
            &list_at(config, AttributePath::new("metastores")),
            &mut configurations,
        );

        let (storage_accounts, identity) = match hdinsight_schema::expand_storage_accounts(
            &list_at(config, AttributePath::new("storage_account")),
            &list_at(config, AttributePath::new("storage_account_gen2")),
        ) {
            Ok(expanded) => expanded,
            Err(e) => {
                diagnostics.add_error(format!("expanding `storage_account`: {}", e), String::new());
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    diagnostics,
                };
            }
        };

        let roles_path = AttributePath::new("roles").index(0);
        let mut roles = Vec::new();
        for (node, definition) in [
            ("head_node", head_node_definition()),
            ("worker_node", worker_node_definition()),
            ("zookeeper_node", zookeeper_node_definition()),
        ] {
            let input = list_at(config, roles_path.clone().attribute(node));
            // API role names have no underscores
            let role_name = node.replace('_', "");
            match hdinsight_schema::expand_node_definition(&role_name, &input, &definition) {
                Ok(role) => roles.push(role),
                Err(e) => {
                    diagnostics.add_error(
                        format!("expanding `roles.0.{}`: {}", node, e),
                        String::new(),
                    );
                    return CreateResourceResponse {
                        new_state: request.planned_state,
                        diagnostics,
                    };
                }
            }
        }

        let tls_min_version = string_at(config, AttributePath::new("tls_min_version"));
        let parameters = ClusterCreateParametersExtended {
            location: string_at(config, AttributePath::new("location")),
            tags: hdinsight_schema::expand_tags(config.get(&AttributePath::new("tags"))),
            properties: ClusterCreateProperties {
                cluster_version: string_at(config, AttributePath::new("cluster_version")),
                os_type: "Linux".to_string(),
                tier: string_at(config, AttributePath::new("tier")),
                cluster_definition: ClusterDefinition {
                    kind: KIND.to_string(),
                    component_version: Some(hdinsight_schema::expand_component_version(
                        &list_at(config, AttributePath::new("component_version")),
                        COMPONENT,
                    )),
                    configurations: Some(serde_json::Value::Object(configurations)),
                },
                compute_profile: ComputeProfile { roles },
                storage_profile: StorageProfile {
                    storageaccounts: storage_accounts,
                },
                network_properties: hdinsight_schema::expand_network(&list_at(
                    config,
                    AttributePath::new("network"),
                )),
                min_supported_tls_version: if tls_min_version.is_empty() {
                    None
                } else {
                    Some(tls_min_version)
                },
            },
            identity,
        };

        if let Err(e) = self
            .clients
            .hdinsight_clusters
            .create(&resource_group, &name, &parameters)
            .await
        {
            diagnostics.add_error(
                format!("creating HDInsight Hadoop Cluster {:?} (Resource Group {:?}): {}", name, resource_group, e),
                String::new(),
            );
            return CreateResourceResponse {
                new_state: request.planned_state,
                diagnostics,
            };
        }

        // from here on the cluster exists; keep the ID in state even if a
        // follow-up step fails so the resource is tracked (and tainted)
        let mut partial_state = request.planned_state.clone();
        let _ = partial_state.set_string(&AttributePath::new("id"), id.id());
        let _ = partial_state.set_string(&AttributePath::new("https_endpoint"), String::new());
        let _ = partial_state.set_string(&AttributePath::new("ssh_endpoint"), String::new());

        let edge_node = list_at(config, roles_path.attribute("edge_node"));
        if let Some(application) = expand_edge_node(&edge_node) {
            if let Err(e) = self
                .clients
                .hdinsight_applications
                .create(&resource_group, &name, &name, &application)
                .await
            {
                diagnostics.add_error(
                    format!("creating edge node for HDInsight Hadoop Cluster {:?}: {}", name, e),
                    String::new(),
                );
                return CreateResourceResponse {
                    new_state: partial_state,
                    diagnostics,
                };
            }

            // the cluster leaves Running while the edge node installs
            if let Err(e) = self.wait_for_ready(&ctx, &id).await {
                diagnostics.add_error(e, String::new());
                return CreateResourceResponse {
                    new_state: partial_state,
                    diagnostics,
                };
            }
        }

        if let Some(monitor) =
            hdinsight_schema::expand_monitor(&list_at(config, AttributePath::new("monitor")))
        {
            if let Err(e) = self
                .clients
                .hdinsight_extensions
                .enable_monitoring(&resource_group, &name, &monitor)
                .await
            {
                diagnostics.add_error(
                    format!("enabling monitoring for HDInsight Hadoop Cluster {:?}: {}", name, e),
                    String::new(),
                );
                return CreateResourceResponse {
                    new_state: partial_state,
                    diagnostics,
                };
            }
        }

        match self.read_state(&id, config).await {
            Ok(Some(new_state)) => CreateResourceResponse {
                new_state,
                diagnostics,
            },
            Ok(None) => {
                diagnostics.add_error(
                    format!("HDInsight Hadoop Cluster {:?} was not found after creation", name),
                    String::new(),
                );
                CreateResourceResponse {
                    new_state: partial_state,
                    diagnostics,
                }
            }
            Err(e) => {
                diagnostics.add_error(e, String::new());
                CreateResourceResponse {
                    new_state: partial_state,
                    diagnostics,
                }
            }
        }
    }

    async fn read(&self, _ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let mut diagnostics = Diagnostics::new();
        let state = &request.current_state;

        let id = match ClusterId::parse(&string_at(state, AttributePath::new("id"))) {
            Ok(id) => id,
            Err(e) => {
                diagnostics.add_error(e.to_string(), String::new());
                return ReadResourceResponse {
                    new_state: None,
                    diagnostics,
                };
            }
        };

        match self.read_state(&id, state).await {
            Ok(new_state) => {
                if new_state.is_none() {
                    tracing::info!(
                        cluster = %id.name,
                        "HDInsight Hadoop Cluster was not found - removing from state"
                    );
                }
                ReadResourceResponse {
                    new_state,
                    diagnostics,
                }
            }
            Err(e) => {
                diagnostics.add_error(e, String::new());
                ReadResourceResponse {
                    new_state: None,
                    diagnostics,
                }
            }
        }
    }

    async fn update(&self, ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        let mut diagnostics = Diagnostics::new();
        let prior = &request.prior_state;
        let planned = &request.planned_state;

        let id = match ClusterId::parse(&string_at(prior, AttributePath::new("id"))) {
            Ok(id) => id,
            Err(e) => {
                diagnostics.add_error(e.to_string(), String::new());
                return UpdateResourceResponse {
                    new_state: request.planned_state,
                    diagnostics,
                };
            }
        };

        if has_change(prior, planned, &AttributePath::new("tags")) {
            let tags = hdinsight_schema::expand_tags(planned.get(&AttributePath::new("tags")))
                .unwrap_or_default();
            if let Err(e) = self
                .clients
                .hdinsight_clusters
                .update(&id.resource_group, &id.name, &ClusterPatchParameters { tags })
                .await
            {
                diagnostics.add_error(
                    format!("updating tags for HDInsight Hadoop Cluster {:?}: {}", id.name, e),
                    String::new(),
                );
                return UpdateResourceResponse {
                    new_state: request.planned_state,
                    diagnostics,
                };
            }
        }

        if has_change(prior, planned, &AttributePath::new("gateway")) {
            let gateway = list_at(planned, AttributePath::new("gateway"));
            let vs = gateway.first().and_then(|v| v.as_map());
            let parameters = UpdateGatewaySettingsParameters {
                is_enabled: true,
                username: vs
                    .and_then(|m| m.get("username"))
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string(),
                password: vs
                    .and_then(|m| m.get("password"))
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string(),
            };
            if let Err(e) = self
                .clients
                .hdinsight_clusters
                .update_gateway_settings(&id.resource_group, &id.name, &parameters)
                .await
            {
                diagnostics.add_error(
                    format!("updating gateway for HDInsight Hadoop Cluster {:?}: {}", id.name, e),
                    String::new(),
                );
                return UpdateResourceResponse {
                    new_state: request.planned_state,
                    diagnostics,
                };
            }
        }

        let worker_count_path = AttributePath::new("roles")
            .index(0)
            .attribute("worker_node")
            .index(0)
            .attribute("target_instance_count");
        if has_change(prior, planned, &worker_count_path) {
            let target_instance_count = planned
                .get(&worker_count_path)
                .and_then(|v| v.as_i64())
                .unwrap_or_default();
            if let Err(e) = self
                .clients
                .hdinsight_clusters
                .resize(
                    &id.resource_group,
                    &id.name,
                    &ClusterResizeParameters {
                        target_instance_count,
                    },
                )
                .await
            {
                diagnostics.add_error(
                    format!("resizing HDInsight Hadoop Cluster {:?}: {}", id.name, e),
                    String::new(),
                );
                return UpdateResourceResponse {
                    new_state: request.planned_state,
                    diagnostics,
                };
            }
        }

        let edge_node_path = AttributePath::new("roles").index(0).attribute("edge_node");
        if has_change(prior, planned, &edge_node_path) {
            // the application is replaced wholesale: remove the old one (if
            // any), then install the new one, waiting for the cluster to
            // settle after each step
            if !list_at(prior, edge_node_path.clone()).is_empty() {
                if let Err(e) = self
                    .clients
                    .hdinsight_applications
                    .delete(&id.resource_group, &id.name, &id.name)
                    .await
                {
                    diagnostics.add_error(
                        format!("deleting edge node for HDInsight Hadoop Cluster {:?}: {}", id.name, e),
                        String::new(),
                    );
                    return UpdateResourceResponse {
                        new_state: request.planned_state,
                        diagnostics,
                    };
                }
                if let Err(e) = self.wait_for_ready(&ctx, &id).await {
                    diagnostics.add_error(e, String::new());
                    return UpdateResourceResponse {
                        new_state: request.planned_state,
                        diagnostics,
                    };
                }
            }

            if let Some(application) = expand_edge_node(&list_at(planned, edge_node_path)) {
                if let Err(e) = self
                    .clients
                    .hdinsight_applications
                    .create(&id.resource_group, &id.name, &id.name, &application)
                    .await
                {
                    diagnostics.add_error(
                        format!("creating edge node for HDInsight Hadoop Cluster {:?}: {}", id.name, e),
                        String::new(),
                    );
                    return UpdateResourceResponse {
                        new_state: request.planned_state,
                        diagnostics,
                    };
                }
                if let Err(e) = self.wait_for_ready(&ctx, &id).await {
                    diagnostics.add_error(e, String::new());
                    return UpdateResourceResponse {
                        new_state: request.planned_state,
                        diagnostics,
                    };
                }
            }
        }

        if has_change(prior, planned, &AttributePath::new("monitor")) {
            let monitor =
                hdinsight_schema::expand_monitor(&list_at(planned, AttributePath::new("monitor")));
            let result = match monitor {
                Some(monitor) => {
                    self.clients
                        .hdinsight_extensions
                        .enable_monitoring(&id.resource_group, &id.name, &monitor)
                        .await
                }
                None => {
                    self.clients
                        .hdinsight_extensions
                        .disable_monitoring(&id.resource_group, &id.name)
                        .await
                }
            };
            if let Err(e) = result {
                diagnostics.add_error(
                    format!("updating monitoring for HDInsight Hadoop Cluster {:?}: {}", id.name, e),
                    String::new(),
                );
                return UpdateResourceResponse {
                    new_state: request.planned_state,
                    diagnostics,
                };
            }
        }

        match self.read_state(&id, planned).await {
            Ok(Some(new_state)) => UpdateResourceResponse {
                new_state,
                diagnostics,
            },
            Ok(None) => {
                diagnostics.add_error(
                    format!("HDInsight Hadoop Cluster {:?} was not found after update", id.name),
                    String::new(),
                );
                UpdateResourceResponse {
                    new_state: request.planned_state,
                    diagnostics,
                }
            }
            Err(e) => {
                diagnostics.add_error(e, String::new());
                UpdateResourceResponse {
                    new_state: request.planned_state,
                    diagnostics,
                }
            }
        }
    }

    async fn delete(&self, _ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        let mut diagnostics = Diagnostics::new();

        let id = match ClusterId::parse(&string_at(&request.prior_state, AttributePath::new("id"))) {
            Ok(id) => id,
            Err(e) => {
                diagnostics.add_error(e.to_string(), String::new());
                return DeleteResourceResponse { diagnostics };
            }
        };

        if let Err(e) = self
            .clients
            .hdinsight_clusters
            .delete(&id.resource_group, &id.name)
            .await
        {
            diagnostics.add_error(
                format!("deleting HDInsight Hadoop Cluster {:?} (Resource Group {:?}): {}", id.name, id.resource_group, e),
                String::new(),
            );
        }

        DeleteResourceResponse { diagnostics }
    }

    async fn import(&self, _ctx: Context, request: ImportResourceRequest) -> ImportResourceResponse {
        if let Err(e) = ClusterId::parse(&request.id) {
            let mut diagnostics = Diagnostics::new();
            diagnostics.add_error(e.to_string(), String::new());
            return ImportResourceResponse {
                state: DynamicValue::null(),
                diagnostics,
            };
        }
        tfplug::import::import_state_passthrough_id("id", &request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_has_expected_shape() {
        let schema = HadoopClusterResource::schema_static();

        assert!(schema.block.attribute("id").unwrap().computed);
        assert!(schema.block.attribute("name").unwrap().force_new);
        assert!(schema.block.attribute("https_endpoint").unwrap().computed);

        let roles = schema.block.block_type("roles").unwrap();
        assert_eq!(roles.min_items, 1);
        assert!(roles.block.block_type("head_node").is_some());
        assert!(roles.block.block_type("edge_node").is_some());

        let gateway = schema.block.block_type("gateway").unwrap();
        assert!(gateway.block.attribute("password").unwrap().sensitive);
    }

    #[test]
    fn edge_node_expands_to_custom_application() {
        let input = vec![Dynamic::Map(HashMap::from([
            ("target_instance_count".to_string(), Dynamic::Number(1.0)),
            (
                "vm_size".to_string(),
                Dynamic::String("Standard_D3_V2".to_string()),
            ),
            (
                "install_script_action".to_string(),
                Dynamic::List(vec![Dynamic::Map(HashMap::from([
                    (
                        "name".to_string(),
                        Dynamic::String("script1".to_string()),
                    ),
                    (
                        "uri".to_string(),
                        Dynamic::String(
                            "https://example.com/install.sh".to_string(),
                        ),
                    ),
                ]))]),
            ),
        ]))];

        let application = expand_edge_node(&input).unwrap();
        assert_eq!(application.properties.application_type, "CustomApplication");

        let role = &application.properties.compute_profile.roles[0];
        assert_eq!(role.name, "edgenode");
        assert_eq!(role.target_instance_count, Some(1));

        let action = &application.properties.install_script_actions[0];
        assert_eq!(action.name, "script1");
        assert_eq!(action.roles, vec!["edgenode".to_string()]);
    }

    #[test]
    fn empty_edge_node_expands_to_none() {
        assert!(expand_edge_node(&[]).is_none());
    }
}
