//! Shared schema builders and expand/flatten mappings for HDInsight clusters
//!
//! Every HDInsight cluster shape shares the same building blocks: gateway
//! credentials, storage accounts, external metastores, monitoring, network
//! rules and the per-role node definitions. The expand functions translate
//! the Terraform attribute maps into the ARM request structs; the flatten
//! functions translate API responses back, merging in the values the API
//! never returns (passwords, SSH keys, VM sizes).

use crate::api::hdinsight::{
    Autoscale, AutoscaleCapacity, AutoscaleRecurrence, AutoscaleSchedule, AutoscaleTimeAndCapacity,
    ClusterIdentity, ClusterMonitoringRequest, ConnectivityEndpoint, DataDisksGroups,
    HardwareProfile, LinuxOperatingSystemProfile, NetworkProperties, OsProfile, Role, SshProfile,
    SshPublicKey, StorageAccount, VirtualNetworkProfile,
};
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tfplug::schema::{
    Attribute, AttributeBuilder, AttributeType, BlockBuilder, CaseDifference, NestedBlock,
    NestingMode, SuppressFn,
};
use tfplug::types::Dynamic;
use tfplug::validator::{IntAtLeast, IntBetween, IsUuid, StringInSlice, StringIsNotEmpty,
    StringMatch, ValidateFn};

use super::validate;

pub const CONNECTION_INBOUND: &str = "Inbound";
pub const CONNECTION_OUTBOUND: &str = "Outbound";

const DAYS_OF_WEEK: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

// Azure masks secrets it returns as "*****"; a config equal to what the
// state already holds must not produce a diff.
fn suppress_masked_secret(_key: &str, old: &str, _new: &str) -> bool {
    old == "*****"
}

pub fn schema_cluster_name() -> Attribute {
    AttributeBuilder::string("name")
        .required()
        .force_new()
        .validator(Arc::new(ValidateFn(validate::hdinsight_name)))
        .build()
}

pub fn schema_tier() -> Attribute {
    AttributeBuilder::string("tier")
        .required()
        .force_new()
        .validator(Arc::new(StringInSlice::new(&["Standard", "Premium"], true)))
        .diff_suppress(Arc::new(CaseDifference))
        .build()
}

pub fn schema_tls_min_version() -> Attribute {
    AttributeBuilder::string("tls_min_version")
        .optional()
        .force_new()
        .validator(Arc::new(StringInSlice::new(&["1.0", "1.1", "1.2"], false)))
        .build()
}

pub fn schema_cluster_version() -> Attribute {
    AttributeBuilder::string("cluster_version")
        .required()
        .force_new()
        .validator(Arc::new(ValidateFn(validate::hdinsight_cluster_version)))
        .diff_suppress(Arc::new(SuppressFn(cluster_version_diff_suppress)))
        .build()
}

/// `3.6` gets converted to `3.6.1000.67` by the API, so compare just
/// major/minor when both are available.
pub fn cluster_version_diff_suppress(_key: &str, old: &str, new: &str) -> bool {
    let o: Vec<&str> = old.split('.').collect();
    let n: Vec<&str> = new.split('.').collect();

    if o.len() >= 2 && n.len() >= 2 {
        return o[0] == n[0] && o[1] == n[1];
    }

    false
}

fn gateway_enabled_validate(value: &Dynamic, _key: &str) -> (Vec<String>, Vec<String>) {
    let mut errors = Vec::new();
    if let Some(enabled) = value.as_bool() {
        if !enabled {
            errors.push(format!(
                "Only true is supported, because HDInsight doesn't support disabling gateway anymore. Provided value {}",
                enabled
            ));
        }
    }
    (Vec::new(), errors)
}

pub fn schema_gateway() -> NestedBlock {
    BlockBuilder::new()
        .attribute(
            AttributeBuilder::bool("enabled")
                .optional()
                .default_value(Dynamic::Bool(true))
                .deprecated()
                .description("HDInsight doesn't support disabling gateway anymore")
                .validator(Arc::new(ValidateFn(gateway_enabled_validate)))
                .build(),
        )
        // these are required since without them the API answers `500 bad request`
        .attribute(AttributeBuilder::string("username").required().force_new().build())
        .attribute(
            AttributeBuilder::string("password")
                .required()
                .sensitive()
                .diff_suppress(Arc::new(SuppressFn(suppress_masked_secret)))
                .build(),
        )
        .build_nested("gateway", NestingMode::List)
        .min_items(1)
        .max_items(1)
        .build()
}

fn external_metastore_block() -> BlockBuilder {
    BlockBuilder::new()
        .attribute(AttributeBuilder::string("server").required().force_new().build())
        .attribute(AttributeBuilder::string("database_name").required().force_new().build())
        .attribute(AttributeBuilder::string("username").required().force_new().build())
        .attribute(
            AttributeBuilder::string("password")
                .required()
                .force_new()
                .sensitive()
                .diff_suppress(Arc::new(SuppressFn(suppress_masked_secret)))
                .build(),
        )
}

pub fn schema_metastores() -> NestedBlock {
    BlockBuilder::new()
        .block(
            external_metastore_block()
                .build_nested("hive", NestingMode::List)
                .max_items(1)
                .build(),
        )
        .block(
            external_metastore_block()
                .build_nested("oozie", NestingMode::List)
                .max_items(1)
                .build(),
        )
        .block(
            external_metastore_block()
                .build_nested("ambari", NestingMode::List)
                .max_items(1)
                .build(),
        )
        .build_nested("metastores", NestingMode::List)
        .max_items(1)
        .build()
}

pub fn schema_monitor() -> NestedBlock {
    BlockBuilder::new()
        .attribute(
            AttributeBuilder::string("log_analytics_workspace_id")
                .required()
                .validator(Arc::new(IsUuid))
                .build(),
        )
        .attribute(
            AttributeBuilder::string("primary_key")
                .required()
                .sensitive()
                .validator(Arc::new(StringIsNotEmpty))
                // Azure doesn't return the key
                .diff_suppress(Arc::new(SuppressFn(suppress_masked_secret)))
                .build(),
        )
        .build_nested("monitor", NestingMode::List)
        .max_items(1)
        .build()
}

pub fn schema_network() -> NestedBlock {
    BlockBuilder::new()
        .attribute(
            AttributeBuilder::string("connection_direction")
                .optional()
                .force_new()
                .default_value(Dynamic::String(CONNECTION_INBOUND.to_string()))
                .validator(Arc::new(StringInSlice::new(
                    &[CONNECTION_INBOUND, CONNECTION_OUTBOUND],
                    false,
                )))
                .build(),
        )
        .attribute(
            AttributeBuilder::bool("private_link_enabled")
                .optional()
                .force_new()
                .default_value(Dynamic::Bool(false))
                .build(),
        )
        .build_nested("network", NestingMode::List)
        .max_items(1)
        .build()
}

pub fn schema_storage_accounts() -> NestedBlock {
    BlockBuilder::new()
        .attribute(
            AttributeBuilder::string("storage_account_key")
                .required()
                .force_new()
                .sensitive()
                .validator(Arc::new(StringIsNotEmpty))
                .build(),
        )
        .attribute(
            AttributeBuilder::string("storage_container_id")
                .required()
                .force_new()
                .validator(Arc::new(StringIsNotEmpty))
                .build(),
        )
        .attribute(AttributeBuilder::bool("is_default").required().force_new().build())
        .build_nested("storage_account", NestingMode::List)
        .build()
}

pub fn schema_storage_accounts_gen2() -> NestedBlock {
    BlockBuilder::new()
        .attribute(
            AttributeBuilder::string("storage_resource_id")
                .required()
                .force_new()
                .validator(Arc::new(StringIsNotEmpty))
                .build(),
        )
        .attribute(
            AttributeBuilder::string("filesystem_id")
                .required()
                .force_new()
                .validator(Arc::new(StringIsNotEmpty))
                .build(),
        )
        .attribute(
            AttributeBuilder::string("managed_identity_resource_id")
                .required()
                .force_new()
                .validator(Arc::new(StringIsNotEmpty))
                .build(),
        )
        .attribute(AttributeBuilder::bool("is_default").required().force_new().build())
        // HDInsight doesn't seem to allow more than one gen2 account
        .build_nested("storage_account_gen2", NestingMode::List)
        .max_items(1)
        .build()
}

/// Behavioural knobs for one role's schema and expansion.
#[derive(Debug, Clone, Default)]
pub struct NodeDefinition {
    pub can_specify_instance_count: bool,
    pub min_instance_count: i64,
    pub max_instance_count: Option<i64>,
    pub can_specify_disks: bool,
    pub max_number_of_disks_per_node: Option<i64>,
    pub fixed_min_instance_count: Option<i64>,
    pub fixed_target_instance_count: Option<i64>,
    pub can_auto_scale_by_capacity: bool,
    pub can_auto_scale_on_schedule: bool,
}

pub fn schema_node_definition(
    name: &str,
    definition: &NodeDefinition,
    required: bool,
) -> NestedBlock {
    let count_validator: Arc<dyn tfplug::validator::Validator> = match definition.max_instance_count
    {
        Some(max) => Arc::new(IntBetween {
            min: definition.min_instance_count,
            max,
        }),
        None => Arc::new(IntAtLeast {
            min: definition.min_instance_count,
        }),
    };

    let mut block = BlockBuilder::new()
        .attribute(
            AttributeBuilder::string("vm_size")
                .required()
                .force_new()
                .diff_suppress(Arc::new(CaseDifference))
                .validator(Arc::new(ValidateFn(validate::node_definition_vm_size)))
                .build(),
        )
        .attribute(AttributeBuilder::string("username").required().force_new().build())
        .attribute(
            AttributeBuilder::string("password")
                .optional()
                .force_new()
                .sensitive()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("ssh_keys", AttributeType::Set(Box::new(AttributeType::String)))
                .optional()
                .force_new()
                .build(),
        )
        .attribute(AttributeBuilder::string("subnet_id").optional().force_new().build())
        .attribute(
            AttributeBuilder::string("virtual_network_id")
                .optional()
                .force_new()
                .build(),
        );

    if definition.can_specify_instance_count {
        block = block
            .attribute(
                AttributeBuilder::number("min_instance_count")
                    .optional()
                    .computed()
                    .force_new()
                    .deprecated()
                    .description("this has been deprecated from the API and will be removed")
                    .validator(count_validator.clone())
                    .build(),
            )
            .attribute(
                AttributeBuilder::number("target_instance_count")
                    .required()
                    .validator(count_validator.clone())
                    .build(),
            );

        if definition.can_auto_scale_by_capacity || definition.can_auto_scale_on_schedule {
            let mut autoscale = BlockBuilder::new();

            if definition.can_auto_scale_by_capacity {
                autoscale = autoscale.block(
                    BlockBuilder::new()
                        .attribute(
                            AttributeBuilder::number("min_instance_count")
                                .required()
                                .validator(count_validator.clone())
                                .build(),
                        )
                        .attribute(
                            AttributeBuilder::number("max_instance_count")
                                .required()
                                .validator(count_validator.clone())
                                .build(),
                        )
                        .build_nested("capacity", NestingMode::List)
                        .max_items(1)
                        .build(),
                );
            }

            if definition.can_auto_scale_on_schedule {
                autoscale = autoscale.block(
                    BlockBuilder::new()
                        .attribute(AttributeBuilder::string("timezone").required().build())
                        .block(
                            BlockBuilder::new()
                                .attribute(
                                    AttributeBuilder::string("time")
                                        .required()
                                        .validator(Arc::new(StringMatch::new(
                                            "^([01][0-9]|[2][0-3]):([03][0])$",
                                            "Time of day must match the format HH:mm where HH is 00-23 and mm is 00 or 30",
                                        )))
                                        .build(),
                                )
                                .attribute(
                                    AttributeBuilder::new(
                                        "days",
                                        AttributeType::List(Box::new(AttributeType::String)),
                                    )
                                    .required()
                                    .validator(Arc::new(StringInSlice::new(&DAYS_OF_WEEK, false)))
                                    .build(),
                                )
                                .attribute(
                                    AttributeBuilder::number("target_instance_count")
                                        .required()
                                        .validator(count_validator.clone())
                                        .build(),
                                )
                                .build_nested("schedule", NestingMode::List)
                                .min_items(1)
                                .build(),
                        )
                        .build_nested("recurrence", NestingMode::List)
                        .max_items(1)
                        .build(),
                );
            }

            block = block.block(
                autoscale
                    .build_nested("autoscale", NestingMode::List)
                    .max_items(1)
                    .build(),
            );
        }
    }

    if definition.can_specify_disks {
        block = block.attribute(
            AttributeBuilder::number("number_of_disks_per_node")
                .required()
                .force_new()
                .validator(Arc::new(IntBetween {
                    min: 1,
                    max: definition.max_number_of_disks_per_node.unwrap_or(1),
                }))
                .build(),
        );
    }

    let mut nested = block.build_nested(name, NestingMode::List).max_items(1);
    if required {
        nested = nested.min_items(1);
    }
    nested.build()
}

// --- Dynamic helpers -------------------------------------------------------

fn item_map(input: &[Dynamic]) -> Option<&HashMap<String, Dynamic>> {
    input.first().and_then(|v| v.as_map())
}

fn get_string(map: &HashMap<String, Dynamic>, key: &str) -> String {
    map.get(key).and_then(|v| v.as_str()).unwrap_or_default().to_string()
}

fn get_bool(map: &HashMap<String, Dynamic>, key: &str) -> Option<bool> {
    map.get(key).and_then(|v| v.as_bool())
}

fn get_i64(map: &HashMap<String, Dynamic>, key: &str) -> Option<i64> {
    map.get(key).and_then(|v| v.as_i64())
}

fn get_list<'a>(map: &'a HashMap<String, Dynamic>, key: &str) -> &'a [Dynamic] {
    map.get(key).and_then(|v| v.as_list()).unwrap_or(&[])
}

fn config_value(config: &HashMap<String, String>, key: &str) -> String {
    config.get(key).cloned().unwrap_or_default()
}

// --- gateway ---------------------------------------------------------------

/// Builds the `gateway` entry of the cluster configuration document.
pub fn expand_gateway(input: &[Dynamic]) -> Value {
    let vs = match item_map(input) {
        Some(vs) => vs,
        None => return json!({}),
    };

    // admin username must be different from the SSH username
    let username = get_string(vs, "username");
    let password = get_string(vs, "password");

    json!({
        "gateway": {
            "restAuthCredential.isEnabled": true,
            "restAuthCredential.username": username,
            "restAuthCredential.password": password,
        }
    })
}

pub fn flatten_gateway(config: &HashMap<String, String>) -> Vec<Dynamic> {
    let username = config_value(config, "restAuthCredential.username");
    let password = config_value(config, "restAuthCredential.password");

    vec![Dynamic::Map(HashMap::from([
        ("enabled".to_string(), Dynamic::Bool(true)),
        ("username".to_string(), Dynamic::String(username)),
        ("password".to_string(), Dynamic::String(password)),
    ]))]
}

// --- metastores ------------------------------------------------------------

fn mssql_jdbc_url(server: &str, database: &str) -> String {
    format!(
        "jdbc:sqlserver://{};database={};encrypt=true;trustServerCertificate=true;create=false;loginTimeout=300",
        server, database
    )
}

pub fn expand_hive_metastore(input: &[Dynamic]) -> Option<Value> {
    let vs = item_map(input)?;

    let server = get_string(vs, "server");
    let database = get_string(vs, "database_name");
    let username = get_string(vs, "username");
    let password = get_string(vs, "password");

    Some(json!({
        "hive-site": {
            "javax.jdo.option.ConnectionDriverName": "com.microsoft.sqlserver.jdbc.SQLServerDriver",
            "javax.jdo.option.ConnectionURL": mssql_jdbc_url(&server, &database),
            "javax.jdo.option.ConnectionUserName": username,
            "javax.jdo.option.ConnectionPassword": password,
        },
        "hive-env": {
            "hive_database": "Existing MSSQL Server database with SQL authentication",
            "hive_database_name": database,
            "hive_database_type": "mssql",
            "hive_existing_mssql_server_database": database,
            "hive_existing_mssql_server_host": server,
            "hive_hostname": server,
        }
    }))
}

pub fn expand_oozie_metastore(input: &[Dynamic]) -> Option<Value> {
    let vs = item_map(input)?;

    let server = get_string(vs, "server");
    let database = get_string(vs, "database_name");
    let username = get_string(vs, "username");
    let password = get_string(vs, "password");

    Some(json!({
        "oozie-site": {
            "oozie.service.JPAService.jdbc.driver": "com.microsoft.sqlserver.jdbc.SQLServerDriver",
            "oozie.service.JPAService.jdbc.url": mssql_jdbc_url(&server, &database),
            "oozie.service.JPAService.jdbc.username": username,
            "oozie.service.JPAService.jdbc.password": password,
            "oozie.db.schema.name": "oozie",
        },
        "oozie-env": {
            "oozie_database": "Existing MSSQL Server database with SQL authentication",
            "oozie_database_name": database,
            "oozie_database_type": "mssql",
            "oozie_existing_mssql_server_database": database,
            "oozie_existing_mssql_server_host": server,
            "oozie_hostname": server,
        }
    }))
}

pub fn expand_ambari_metastore(input: &[Dynamic]) -> Option<Value> {
    let vs = item_map(input)?;

    let server = get_string(vs, "server");
    let database = get_string(vs, "database_name");
    let username = get_string(vs, "username");
    let password = get_string(vs, "password");

    Some(json!({
        "ambari-conf": {
            "database-server": server,
            "database-name": database,
            "database-user-name": username,
            "database-user-password": password,
        }
    }))
}

/// Merges the configured metastores into the cluster configuration document.
pub fn expand_metastores(input: &[Dynamic], configurations: &mut Map<String, Value>) {
    let vs = match item_map(input) {
        Some(vs) => vs,
        None => return,
    };

    let mut merge = |expanded: Option<Value>| {
        if let Some(Value::Object(entries)) = expanded {
            for (key, value) in entries {
                configurations.insert(key, value);
            }
        }
    };

    merge(expand_hive_metastore(get_list(vs, "hive")));
    merge(expand_oozie_metastore(get_list(vs, "oozie")));
    merge(expand_ambari_metastore(get_list(vs, "ambari")));
}

fn metastore_output(
    server: String,
    database: String,
    username: String,
    password: String,
) -> Option<Dynamic> {
    if server.is_empty() || database.is_empty() {
        return None;
    }

    Some(Dynamic::Map(HashMap::from([
        ("server".to_string(), Dynamic::String(server)),
        ("database_name".to_string(), Dynamic::String(database)),
        ("username".to_string(), Dynamic::String(username)),
        ("password".to_string(), Dynamic::String(password)),
    ])))
}

pub fn flatten_hive_metastore(
    env: &HashMap<String, String>,
    site: &HashMap<String, String>,
) -> Option<Dynamic> {
    metastore_output(
        config_value(env, "hive_hostname"),
        config_value(env, "hive_database_name"),
        config_value(site, "javax.jdo.option.ConnectionUserName"),
        config_value(site, "javax.jdo.option.ConnectionPassword"),
    )
}

pub fn flatten_oozie_metastore(
    env: &HashMap<String, String>,
    site: &HashMap<String, String>,
) -> Option<Dynamic> {
    metastore_output(
        config_value(env, "oozie_hostname"),
        config_value(env, "oozie_database_name"),
        config_value(site, "oozie.service.JPAService.jdbc.username"),
        config_value(site, "oozie.service.JPAService.jdbc.password"),
    )
}

pub fn flatten_ambari_metastore(conf: &HashMap<String, String>) -> Option<Dynamic> {
    metastore_output(
        config_value(conf, "database-server"),
        config_value(conf, "database-name"),
        config_value(conf, "database-user-name"),
        config_value(conf, "database-user-password"),
    )
}

/// Rebuilds the `metastores` block from the cluster configuration list.
pub fn flatten_metastores(
    configurations: &HashMap<String, HashMap<String, String>>,
) -> Vec<Dynamic> {
    let empty = HashMap::new();
    let lookup = |key: &str| configurations.get(key).unwrap_or(&empty);

    let mut block = HashMap::new();

    if let Some(hive) = flatten_hive_metastore(lookup("hive-env"), lookup("hive-site")) {
        block.insert("hive".to_string(), Dynamic::List(vec![hive]));
    }
    if let Some(oozie) = flatten_oozie_metastore(lookup("oozie-env"), lookup("oozie-site")) {
        block.insert("oozie".to_string(), Dynamic::List(vec![oozie]));
    }
    if let Some(ambari) = flatten_ambari_metastore(lookup("ambari-conf")) {
        block.insert("ambari".to_string(), Dynamic::List(vec![ambari]));
    }

    if block.is_empty() {
        return Vec::new();
    }

    vec![Dynamic::Map(block)]
}

// --- monitor ---------------------------------------------------------------

pub fn expand_monitor(input: &[Dynamic]) -> Option<ClusterMonitoringRequest> {
    let vs = item_map(input)?;

    Some(ClusterMonitoringRequest {
        workspace_id: get_string(vs, "log_analytics_workspace_id"),
        primary_key: get_string(vs, "primary_key"),
    })
}

// --- network ---------------------------------------------------------------

pub fn expand_network(input: &[Dynamic]) -> Option<NetworkProperties> {
    let vs = item_map(input)?;

    let connection_direction = match get_string(vs, "connection_direction").as_str() {
        CONNECTION_OUTBOUND => CONNECTION_OUTBOUND,
        _ => CONNECTION_INBOUND,
    };

    let private_link = if get_bool(vs, "private_link_enabled").unwrap_or(false) {
        "Enabled"
    } else {
        "Disabled"
    };

    Some(NetworkProperties {
        resource_provider_connection: connection_direction.to_string(),
        private_link: private_link.to_string(),
    })
}

pub fn flatten_network(input: Option<&NetworkProperties>) -> Vec<Dynamic> {
    let input = match input {
        Some(input) => input,
        None => return Vec::new(),
    };

    let connection_direction = if input.resource_provider_connection.is_empty() {
        CONNECTION_OUTBOUND.to_string()
    } else {
        input.resource_provider_connection.clone()
    };

    vec![Dynamic::Map(HashMap::from([
        (
            "connection_direction".to_string(),
            Dynamic::String(connection_direction),
        ),
        (
            "private_link_enabled".to_string(),
            Dynamic::Bool(input.private_link == "Enabled"),
        ),
    ]))]
}

// --- component versions ----------------------------------------------------

pub fn expand_component_version(input: &[Dynamic], component: &str) -> HashMap<String, String> {
    let mut versions = HashMap::new();
    if let Some(vs) = item_map(input) {
        versions.insert(component.to_string(), get_string(vs, component));
    }
    versions
}

pub fn flatten_component_version(
    versions: Option<&HashMap<String, String>>,
    component: &str,
) -> Vec<Dynamic> {
    let version = versions
        .and_then(|vs| vs.get(component))
        .cloned()
        .unwrap_or_default();

    vec![Dynamic::Map(HashMap::from([(
        component.to_string(),
        Dynamic::String(version),
    )]))]
}

// --- storage ---------------------------------------------------------------

/// Returns the storage accounts plus the cluster identity carrying any
/// user-assigned identities needed for Data Lake Gen2 access.
pub fn expand_storage_accounts(
    storage_accounts: &[Dynamic],
    gen2_storage_accounts: &[Dynamic],
) -> Result<(Vec<StorageAccount>, Option<ClusterIdentity>), String> {
    let mut results = Vec::new();
    let mut cluster_identity: Option<ClusterIdentity> = None;

    for vs in storage_accounts {
        let v = vs.as_map().ok_or("storage_account block is malformed")?;

        let storage_account_key = get_string(v, "storage_account_key");
        let storage_container_id = get_string(v, "storage_container_id");
        let is_default = get_bool(v, "is_default").unwrap_or(false);

        let uri = url::Url::parse(&storage_container_id)
            .map_err(|e| format!("parsing {:?}: {}", storage_container_id, e))?;

        results.push(StorageAccount {
            name: uri.host_str().unwrap_or_default().to_string(),
            container: Some(uri.path().trim_start_matches('/').to_string()),
            key: Some(storage_account_key),
            is_default,
            resource_id: None,
            msi_resource_id: None,
            file_system: None,
        });
    }

    for vs in gen2_storage_accounts {
        let v = vs.as_map().ok_or("storage_account_gen2 block is malformed")?;

        let filesystem_id = get_string(v, "filesystem_id");
        let storage_resource_id = get_string(v, "storage_resource_id");
        let managed_identity_resource_id = get_string(v, "managed_identity_resource_id");
        let is_default = get_bool(v, "is_default").unwrap_or(false);

        let uri = url::Url::parse(&filesystem_id)
            .map_err(|e| format!("parsing {:?}: {}", filesystem_id, e))?;

        let identity = cluster_identity.get_or_insert_with(|| ClusterIdentity {
            r#type: "UserAssigned".to_string(),
            user_assigned_identities: HashMap::new(),
        });

        // the API doesn't require client_id or principal_id here
        identity
            .user_assigned_identities
            .insert(managed_identity_resource_id.clone(), json!({}));

        results.push(StorageAccount {
            // https://account.dfs.core.windows.net/filesystem -> account.dfs.core.windows.net
            name: uri.host_str().unwrap_or_default().to_string(),
            container: None,
            key: None,
            is_default,
            resource_id: Some(storage_resource_id),
            msi_resource_id: Some(managed_identity_resource_id),
            // https://account.dfs.core.windows.net/filesystem -> filesystem
            file_system: Some(uri.path().trim_start_matches('/').to_string()),
        });
    }

    Ok((results, cluster_identity))
}

// --- node definitions ------------------------------------------------------

pub fn expand_node_definition(
    name: &str,
    input: &[Dynamic],
    definition: &NodeDefinition,
) -> Result<Role, String> {
    let v = item_map(input).ok_or_else(|| format!("`{}` block is missing", name))?;

    let vm_size = get_string(v, "vm_size");
    let username = get_string(v, "username");
    let password = get_string(v, "password");
    let virtual_network_id = get_string(v, "virtual_network_id");
    let subnet_id = get_string(v, "subnet_id");

    let virtual_network_specified = !virtual_network_id.is_empty();
    let subnet_specified = !subnet_id.is_empty();
    let virtual_network_profile = if virtual_network_specified && subnet_specified {
        Some(VirtualNetworkProfile {
            id: virtual_network_id,
            subnet: subnet_id,
        })
    } else if virtual_network_specified != subnet_specified {
        return Err("`virtual_network_id` and `subnet_id` must both either be set or empty!".to_string());
    } else {
        None
    };

    let mut linux_profile = LinuxOperatingSystemProfile {
        username,
        password: None,
        ssh_profile: None,
    };
    if !password.is_empty() {
        linux_profile.password = Some(password);
    } else {
        let ssh_keys: Vec<SshPublicKey> = get_list(v, "ssh_keys")
            .iter()
            .filter_map(|k| k.as_str())
            .map(|k| SshPublicKey {
                certificate_data: k.to_string(),
            })
            .collect();

        if ssh_keys.is_empty() {
            return Err("Either a `password` or `ssh_key` must be specified!".to_string());
        }

        linux_profile.ssh_profile = Some(SshProfile {
            public_keys: ssh_keys,
        });
    }

    let mut role = Role {
        name: name.to_string(),
        min_instance_count: None,
        target_instance_count: None,
        autoscale_configuration: None,
        hardware_profile: Some(HardwareProfile { vm_size }),
        os_profile: Some(OsProfile {
            linux_operating_system_profile: linux_profile,
        }),
        virtual_network_profile,
        data_disks_groups: None,
    };

    if definition.can_specify_instance_count {
        if let Some(min_instance_count) = get_i64(v, "min_instance_count") {
            if min_instance_count > 0 {
                role.min_instance_count = Some(min_instance_count);
            }
        }
        role.target_instance_count = get_i64(v, "target_instance_count");

        if definition.can_auto_scale_by_capacity || definition.can_auto_scale_on_schedule {
            role.autoscale_configuration = expand_autoscale(get_list(v, "autoscale"));
        }
    } else {
        role.min_instance_count = definition.fixed_min_instance_count;
        role.target_instance_count = definition.fixed_target_instance_count;
    }

    if definition.can_specify_disks {
        if let Some(number_of_disks_per_node) = get_i64(v, "number_of_disks_per_node") {
            if number_of_disks_per_node > 0 {
                role.data_disks_groups = Some(vec![DataDisksGroups {
                    disks_per_node: number_of_disks_per_node,
                }]);
            }
        }
    }

    Ok(role)
}

pub fn expand_autoscale(input: &[Dynamic]) -> Option<Autoscale> {
    let vs = item_map(input)?;

    if let Some(capacity) = expand_autoscale_capacity(get_list(vs, "capacity")) {
        return Some(Autoscale {
            capacity: Some(capacity),
            recurrence: None,
        });
    }

    if let Some(recurrence) = expand_autoscale_recurrence(get_list(vs, "recurrence")) {
        return Some(Autoscale {
            capacity: None,
            recurrence: Some(recurrence),
        });
    }

    None
}

fn expand_autoscale_capacity(input: &[Dynamic]) -> Option<AutoscaleCapacity> {
    let vs = item_map(input)?;

    Some(AutoscaleCapacity {
        min_instance_count: get_i64(vs, "min_instance_count").unwrap_or_default(),
        max_instance_count: get_i64(vs, "max_instance_count").unwrap_or_default(),
    })
}

fn expand_autoscale_recurrence(input: &[Dynamic]) -> Option<AutoscaleRecurrence> {
    let vs = item_map(input)?;

    let schedule = get_list(vs, "schedule")
        .iter()
        .filter_map(|v| v.as_map())
        .map(|val| {
            let target_instance_count = get_i64(val, "target_instance_count").unwrap_or_default();
            AutoscaleSchedule {
                days: get_list(val, "days")
                    .iter()
                    .filter_map(|d| d.as_str())
                    .map(|d| d.to_string())
                    .collect(),
                time_and_capacity: AutoscaleTimeAndCapacity {
                    time: get_string(val, "time"),
                    // the server always overrides max to equal min
                    min_instance_count: target_instance_count,
                    max_instance_count: target_instance_count,
                },
            }
        })
        .collect();

    Some(AutoscaleRecurrence {
        time_zone: get_string(vs, "timezone"),
        schedule,
    })
}

pub fn flatten_node_definition(
    input: Option<&Role>,
    existing: &[Dynamic],
    definition: &NodeDefinition,
) -> Vec<Dynamic> {
    let input = match input {
        Some(input) => input,
        None => return Vec::new(),
    };

    let mut output: HashMap<String, Dynamic> = HashMap::from([
        ("vm_size".to_string(), Dynamic::String(String::new())),
        ("username".to_string(), Dynamic::String(String::new())),
        ("password".to_string(), Dynamic::String(String::new())),
        ("ssh_keys".to_string(), Dynamic::List(Vec::new())),
        ("subnet_id".to_string(), Dynamic::String(String::new())),
        ("virtual_network_id".to_string(), Dynamic::String(String::new())),
    ]);

    if let Some(os_profile) = &input.os_profile {
        output.insert(
            "username".to_string(),
            Dynamic::String(os_profile.linux_operating_system_profile.username.clone()),
        );
    }

    // neither password / SSH keys are returned from the API, and the
    // returned VM size can be malformed ("small", "extralarge"), so carry
    // all three over from the existing state to avoid a spurious diff
    if let Some(existing_v) = item_map(existing) {
        output.insert(
            "password".to_string(),
            Dynamic::String(get_string(existing_v, "password")),
        );
        output.insert(
            "ssh_keys".to_string(),
            Dynamic::List(get_list(existing_v, "ssh_keys").to_vec()),
        );
        output.insert(
            "vm_size".to_string(),
            Dynamic::String(get_string(existing_v, "vm_size")),
        );
    }

    if let Some(profile) = &input.virtual_network_profile {
        output.insert(
            "virtual_network_id".to_string(),
            Dynamic::String(profile.id.clone()),
        );
        output.insert("subnet_id".to_string(), Dynamic::String(profile.subnet.clone()));
    }

    if definition.can_specify_instance_count {
        output.insert(
            "min_instance_count".to_string(),
            Dynamic::Number(input.min_instance_count.unwrap_or(0) as f64),
        );
        output.insert(
            "target_instance_count".to_string(),
            Dynamic::Number(input.target_instance_count.unwrap_or(0) as f64),
        );

        if definition.can_auto_scale_by_capacity || definition.can_auto_scale_on_schedule {
            let autoscale = flatten_autoscale(input.autoscale_configuration.as_ref());
            if !autoscale.is_empty() {
                output.insert("autoscale".to_string(), Dynamic::List(autoscale));
            }
        }
    }

    if definition.can_specify_disks {
        let disks = input
            .data_disks_groups
            .as_ref()
            .and_then(|groups| groups.first())
            .map(|group| group.disks_per_node)
            .unwrap_or(0);
        output.insert(
            "number_of_disks_per_node".to_string(),
            Dynamic::Number(disks as f64),
        );
    }

    vec![Dynamic::Map(output)]
}

pub fn flatten_autoscale(input: Option<&Autoscale>) -> Vec<Dynamic> {
    let input = match input {
        Some(input) => input,
        None => return Vec::new(),
    };

    let mut result = HashMap::new();

    if let Some(capacity) = &input.capacity {
        result.insert(
            "capacity".to_string(),
            Dynamic::List(vec![Dynamic::Map(HashMap::from([
                (
                    "min_instance_count".to_string(),
                    Dynamic::Number(capacity.min_instance_count as f64),
                ),
                (
                    "max_instance_count".to_string(),
                    Dynamic::Number(capacity.max_instance_count as f64),
                ),
            ]))]),
        );
    }

    if let Some(recurrence) = &input.recurrence {
        let schedules: Vec<Dynamic> = recurrence
            .schedule
            .iter()
            .map(|schedule| {
                Dynamic::Map(HashMap::from([
                    (
                        "days".to_string(),
                        Dynamic::List(
                            schedule
                                .days
                                .iter()
                                .map(|d| Dynamic::String(d.clone()))
                                .collect(),
                        ),
                    ),
                    // min / max are kept equal by the server
                    (
                        "target_instance_count".to_string(),
                        Dynamic::Number(schedule.time_and_capacity.min_instance_count as f64),
                    ),
                    (
                        "time".to_string(),
                        Dynamic::String(schedule.time_and_capacity.time.clone()),
                    ),
                ]))
            })
            .collect();

        result.insert(
            "recurrence".to_string(),
            Dynamic::List(vec![Dynamic::Map(HashMap::from([
                (
                    "timezone".to_string(),
                    Dynamic::String(recurrence.time_zone.clone()),
                ),
                ("schedule".to_string(), Dynamic::List(schedules)),
            ]))]),
        );
    }

    if result.is_empty() {
        return Vec::new();
    }

    vec![Dynamic::Map(result)]
}

// --- lookup helpers --------------------------------------------------------

pub fn find_role<'a>(roles: &'a [Role], name: &str) -> Option<&'a Role> {
    roles.iter().find(|role| role.name.eq_ignore_ascii_case(name))
}

pub fn find_connectivity_endpoint(name: &str, endpoints: &[ConnectivityEndpoint]) -> String {
    for endpoint in endpoints {
        match (&endpoint.name, &endpoint.location) {
            (Some(candidate), Some(location)) if candidate.eq_ignore_ascii_case(name) => {
                return location.clone();
            }
            _ => continue,
        }
    }

    String::new()
}

// --- tags ------------------------------------------------------------------

pub fn expand_tags(input: Option<&Dynamic>) -> Option<HashMap<String, String>> {
    let map = input?.as_map()?;
    Some(
        map.iter()
            .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
            .collect(),
    )
}

pub fn flatten_tags(input: Option<&HashMap<String, String>>) -> Dynamic {
    Dynamic::Map(
        input
            .map(|tags| {
                tags.iter()
                    .map(|(k, v)| (k.clone(), Dynamic::String(v.clone())))
                    .collect()
            })
            .unwrap_or_default(),
    )
}
