//! The `azurerm_traffic_manager_profile` resource

use crate::api::trafficmanager::{
    DnsConfig, MonitorConfig, MonitorCustomHeader, Profile, ProfileProperties, StatusCodeRange,
};
use crate::clients::Clients;
use crate::parse::TrafficManagerProfileId;
use crate::resources::trafficmanager::validate;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tfplug::context::Context;
use tfplug::resource::{
    CreateResourceRequest, CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse,
    ImportResourceRequest, ImportResourceResponse, ReadResourceRequest, ReadResourceResponse,
    Resource, UpdateResourceRequest, UpdateResourceResponse,
};
use tfplug::schema::{
    AttributeBuilder, AttributeType, BlockBuilder, CaseDifference, NestingMode, Schema,
    SchemaBuilder,
};
use tfplug::types::{AttributePath, Diagnostics, Dynamic, DynamicValue};
use tfplug::validator::{IntBetween, IntInSlice, StringInSlice, ValidateFn};

pub struct TrafficManagerProfileResource {
    clients: Clients,
}

impl TrafficManagerProfileResource {
    pub fn new(clients: Clients) -> Self {
        Self { clients }
    }

    pub fn schema_static() -> Schema {
        SchemaBuilder::new()
            .attribute(AttributeBuilder::string("id").computed().build())
            .attribute(AttributeBuilder::string("name").required().force_new().build())
            .attribute(
                AttributeBuilder::string("resource_group_name")
                    .required()
                    .force_new()
                    .build(),
            )
            .attribute(
                AttributeBuilder::string("profile_status")
                    .optional()
                    .computed()
                    .validator(Arc::new(StringInSlice::new(&["Enabled", "Disabled"], true)))
                    .diff_suppress(Arc::new(CaseDifference))
                    .build(),
            )
            .attribute(
                AttributeBuilder::string("traffic_routing_method")
                    .required()
                    .validator(Arc::new(StringInSlice::new(
                        &[
                            "Geographic",
                            "Weighted",
                            "Performance",
                            "Priority",
                            "MultiValue",
                            "Subnet",
                        ],
                        false,
                    )))
                    .build(),
            )
            .attribute(AttributeBuilder::string("fqdn").computed().build())
            .attribute(
                AttributeBuilder::new("tags", AttributeType::Map(Box::new(AttributeType::String)))
                    .optional()
                    .build(),
            )
            .block(
                BlockBuilder::new()
                    .attribute(
                        AttributeBuilder::string("relative_name")
                            .required()
                            .force_new()
                            .build(),
                    )
                    .attribute(
                        AttributeBuilder::number("ttl")
                            .required()
                            .validator(Arc::new(IntBetween {
                                min: 1,
                                max: 2_147_483_647,
                            }))
                            .build(),
                    )
                    .build_nested("dns_config", NestingMode::List)
                    .min_items(1)
                    .max_items(1)
                    .build(),
            )
            .block(
                BlockBuilder::new()
                    .attribute(
                        AttributeBuilder::string("protocol")
                            .required()
                            .validator(Arc::new(StringInSlice::new(&["HTTP", "HTTPS", "TCP"], true)))
                            .diff_suppress(Arc::new(CaseDifference))
                            .build(),
                    )
                    .attribute(
                        AttributeBuilder::number("port")
                            .required()
                            .validator(Arc::new(IntBetween { min: 1, max: 65535 }))
                            .build(),
                    )
                    .attribute(AttributeBuilder::string("path").optional().build())
                    .attribute(
                        AttributeBuilder::number("interval_in_seconds")
                            .optional()
                            .default_value(Dynamic::Number(30.0))
                            .validator(Arc::new(IntInSlice {
                                values: vec![10, 30],
                            }))
                            .build(),
                    )
                    .attribute(
                        AttributeBuilder::number("timeout_in_seconds")
                            .optional()
                            .default_value(Dynamic::Number(10.0))
                            .validator(Arc::new(IntBetween { min: 5, max: 10 }))
                            .build(),
                    )
                    .attribute(
                        AttributeBuilder::number("tolerated_number_of_failures")
                            .optional()
                            .default_value(Dynamic::Number(3.0))
                            .validator(Arc::new(IntBetween { min: 0, max: 9 }))
                            .build(),
                    )
                    .attribute(
                        AttributeBuilder::new(
                            "expected_status_code_ranges",
                            AttributeType::List(Box::new(AttributeType::String)),
                        )
                        .optional()
                        .validator(Arc::new(ValidateFn(validate_status_code_ranges)))
                        .build(),
                    )
                    .block(
                        BlockBuilder::new()
                            .attribute(AttributeBuilder::string("name").required().build())
                            .attribute(AttributeBuilder::string("value").required().build())
                            .build_nested("custom_header", NestingMode::List)
                            .build(),
                    )
                    .build_nested("monitor_config", NestingMode::List)
                    .min_items(1)
                    .max_items(1)
                    .build(),
            )
            .build()
    }

    fn flatten(&self, id: &TrafficManagerProfileId, profile: &Profile) -> DynamicValue {
        let mut state: HashMap<String, Dynamic> = HashMap::new();
        state.insert("id".to_string(), Dynamic::String(id.id()));
        state.insert("name".to_string(), Dynamic::String(id.name.clone()));
        state.insert(
            "resource_group_name".to_string(),
            Dynamic::String(id.resource_group.clone()),
        );

        let properties = &profile.properties;
        state.insert(
            "profile_status".to_string(),
            Dynamic::String(properties.profile_status.clone().unwrap_or_default()),
        );
        state.insert(
            "traffic_routing_method".to_string(),
            Dynamic::String(properties.traffic_routing_method.clone().unwrap_or_default()),
        );

        let mut fqdn = String::new();
        let dns_config = match &properties.dns_config {
            Some(dns) => {
                fqdn = dns.fqdn.clone().unwrap_or_default();
                vec![Dynamic::Map(HashMap::from([
                    (
                        "relative_name".to_string(),
                        Dynamic::String(dns.relative_name.clone()),
                    ),
                    ("ttl".to_string(), Dynamic::Number(dns.ttl as f64)),
                ]))]
            }
            None => Vec::new(),
        };
        state.insert("dns_config".to_string(), Dynamic::List(dns_config));
        state.insert("fqdn".to_string(), Dynamic::String(fqdn));

        let monitor_config = match &properties.monitor_config {
            Some(monitor) => {
                let mut block: HashMap<String, Dynamic> = HashMap::from([
                    (
                        "protocol".to_string(),
                        Dynamic::String(monitor.protocol.clone()),
                    ),
                    ("port".to_string(), Dynamic::Number(monitor.port as f64)),
                    (
                        "path".to_string(),
                        Dynamic::String(monitor.path.clone().unwrap_or_default()),
                    ),
                    (
                        "interval_in_seconds".to_string(),
                        Dynamic::Number(monitor.interval_in_seconds.unwrap_or(30) as f64),
                    ),
                    (
                        "timeout_in_seconds".to_string(),
                        Dynamic::Number(monitor.timeout_in_seconds.unwrap_or(10) as f64),
                    ),
                    (
                        "tolerated_number_of_failures".to_string(),
                        Dynamic::Number(monitor.tolerated_number_of_failures.unwrap_or(3) as f64),
                    ),
                ]);

                let ranges: Vec<Dynamic> = monitor
                    .expected_status_code_ranges
                    .as_deref()
                    .unwrap_or(&[])
                    .iter()
                    .map(|range| Dynamic::String(format!("{}-{}", range.min, range.max)))
                    .collect();
                if !ranges.is_empty() {
                    block.insert(
                        "expected_status_code_ranges".to_string(),
                        Dynamic::List(ranges),
                    );
                }

                let headers: Vec<Dynamic> = monitor
                    .custom_headers
                    .as_deref()
                    .unwrap_or(&[])
                    .iter()
                    .map(|header| {
                        Dynamic::Map(HashMap::from([
                            ("name".to_string(), Dynamic::String(header.name.clone())),
                            ("value".to_string(), Dynamic::String(header.value.clone())),
                        ]))
                    })
                    .collect();
                if !headers.is_empty() {
                    block.insert("custom_header".to_string(), Dynamic::List(headers));
                }

                vec![Dynamic::Map(block)]
            }
            None => Vec::new(),
        };
        state.insert("monitor_config".to_string(), Dynamic::List(monitor_config));

        state.insert(
            "tags".to_string(),
            crate::resources::hdinsight::schema::flatten_tags(profile.tags.as_ref()),
        );

        DynamicValue::new(Dynamic::Map(state))
    }
}

fn validate_status_code_ranges(value: &Dynamic, key: &str) -> (Vec<String>, Vec<String>) {
    let mut warnings = Vec::new();
    let mut errors = Vec::new();

    if let Some(items) = value.as_list() {
        for item in items {
            let (w, e) = validate::status_code_range(item, key);
            warnings.extend(w);
            errors.extend(e);
        }
        return (warnings, errors);
    }

    validate::status_code_range(value, key)
}

fn expand_profile(config: &DynamicValue) -> Profile {
    let string_at = |path: AttributePath| -> String {
        config
            .get(&path)
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string()
    };

    let dns = config
        .get(&AttributePath::new("dns_config").index(0))
        .and_then(|v| v.as_map())
        .map(|vs| DnsConfig {
            relative_name: vs
                .get("relative_name")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string(),
            ttl: vs.get("ttl").and_then(|v| v.as_i64()).unwrap_or(30),
            fqdn: None,
        });

    let monitor = config
        .get(&AttributePath::new("monitor_config").index(0))
        .and_then(|v| v.as_map())
        .map(|vs| {
            let ranges: Vec<StatusCodeRange> = vs
                .get("expected_status_code_ranges")
                .and_then(|v| v.as_list())
                .map(|items| {
                    items
                        .iter()
                        .filter_map(|v| v.as_str())
                        .filter_map(validate::parse_status_code_range)
                        .map(|(min, max)| StatusCodeRange { min, max })
                        .collect()
                })
                .unwrap_or_default();

            let headers: Vec<MonitorCustomHeader> = vs
                .get("custom_header")
                .and_then(|v| v.as_list())
                .map(|items| {
                    items
                        .iter()
                        .filter_map(|v| v.as_map())
                        .map(|header| MonitorCustomHeader {
                            name: header
                                .get("name")
                                .and_then(|v| v.as_str())
                                .unwrap_or_default()
                                .to_string(),
                            value: header
                                .get("value")
                                .and_then(|v| v.as_str())
                                .unwrap_or_default()
                                .to_string(),
                        })
                        .collect()
                })
                .unwrap_or_default();

            MonitorConfig {
                protocol: vs
                    .get("protocol")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string(),
                port: vs.get("port").and_then(|v| v.as_i64()).unwrap_or(80),
                path: vs
                    .get("path")
                    .and_then(|v| v.as_str())
                    .filter(|p| !p.is_empty())
                    .map(|p| p.to_string()),
                interval_in_seconds: vs.get("interval_in_seconds").and_then(|v| v.as_i64()),
                timeout_in_seconds: vs.get("timeout_in_seconds").and_then(|v| v.as_i64()),
                tolerated_number_of_failures: vs
                    .get("tolerated_number_of_failures")
                    .and_then(|v| v.as_i64()),
                custom_headers: if headers.is_empty() { None } else { Some(headers) },
                expected_status_code_ranges: if ranges.is_empty() { None } else { Some(ranges) },
            }
        });

    let profile_status = string_at(AttributePath::new("profile_status"));

    Profile {
        id: None,
        name: None,
        location: Some("global".to_string()),
        tags: crate::resources::hdinsight::schema::expand_tags(
            config.get(&AttributePath::new("tags")),
        ),
        properties: ProfileProperties {
            profile_status: if profile_status.is_empty() {
                Some("Enabled".to_string())
            } else {
                Some(profile_status)
            },
            traffic_routing_method: Some(string_at(AttributePath::new("traffic_routing_method"))),
            dns_config: dns,
            monitor_config: monitor,
            endpoints: None,
        },
    }
}

#[async_trait]
impl Resource for TrafficManagerProfileResource {
    fn type_name(&self) -> &str {
        "azurerm_traffic_manager_profile"
    }

    fn schema(&self) -> Schema {
        Self::schema_static()
    }

    async fn create(&self, _ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        let mut diagnostics = Diagnostics::new();
        let config = &request.config;

        let name = config
            .get_string(&AttributePath::new("name"))
            .unwrap_or_default();
        let resource_group = config
            .get_string(&AttributePath::new("resource_group_name"))
            .unwrap_or_default();
        let id = TrafficManagerProfileId::new(&self.clients.subscription_id, &resource_group, &name);

        match self
            .clients
            .traffic_manager_profiles
            .get(&resource_group, &name)
            .await
        {
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
                    format!("checking for presence of existing Traffic Manager Profile {:?}: {}", name, e),
                    String::new(),
                );
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    diagnostics,
                };
            }
        }

        let profile = expand_profile(config);
        let created = match self
            .clients
            .traffic_manager_profiles
            .create_or_update(&resource_group, &name, &profile)
            .await
        {
            Ok(created) => created,
            Err(e) => {
                diagnostics.add_error(
                    format!("creating Traffic Manager Profile {:?} (Resource Group {:?}): {}", name, resource_group, e),
                    String::new(),
                );
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    diagnostics,
                };
            }
        };

        CreateResourceResponse {
            new_state: self.flatten(&id, &created),
            diagnostics,
        }
    }

    async fn read(&self, _ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let mut diagnostics = Diagnostics::new();

        let raw_id = request
            .current_state
            .get_string(&AttributePath::new("id"))
            .unwrap_or_default();
        let id = match TrafficManagerProfileId::parse(&raw_id) {
            Ok(id) => id,
            Err(e) => {
                diagnostics.add_error(e.to_string(), String::new());
                return ReadResourceResponse {
                    new_state: None,
                    diagnostics,
                };
            }
        };

        match self
            .clients
            .traffic_manager_profiles
            .get(&id.resource_group, &id.name)
            .await
        {
            Ok(profile) => ReadResourceResponse {
                new_state: Some(self.flatten(&id, &profile)),
                diagnostics,
            },
            Err(e) if e.is_not_found() => {
                tracing::info!(
                    profile = %id.name,
                    "Traffic Manager Profile was not found - removing from state"
                );
                ReadResourceResponse {
                    new_state: None,
                    diagnostics,
                }
            }
            Err(e) => {
                diagnostics.add_error(
                    format!("retrieving Traffic Manager Profile {:?}: {}", id.name, e),
                    String::new(),
                );
                ReadResourceResponse {
                    new_state: None,
                    diagnostics,
                }
            }
        }
    }

    async fn update(&self, _ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        let mut diagnostics = Diagnostics::new();

        let raw_id = request
            .prior_state
            .get_string(&AttributePath::new("id"))
            .unwrap_or_default();
        let id = match TrafficManagerProfileId::parse(&raw_id) {
            Ok(id) => id,
            Err(e) => {
                diagnostics.add_error(e.to_string(), String::new());
                return UpdateResourceResponse {
                    new_state: request.planned_state,
                    diagnostics,
                };
            }
        };

        let profile = expand_profile(&request.planned_state);
        match self
            .clients
            .traffic_manager_profiles
            .create_or_update(&id.resource_group, &id.name, &profile)
            .await
        {
            Ok(updated) => UpdateResourceResponse {
                new_state: self.flatten(&id, &updated),
                diagnostics,
            },
            Err(e) => {
                diagnostics.add_error(
                    format!("updating Traffic Manager Profile {:?}: {}", id.name, e),
                    String::new(),
                );
                UpdateResourceResponse {
                    new_state: request.planned_state,
                    diagnostics,
                }
            }
        }
    }

    async fn delete(&self, _ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        let mut diagnostics = Diagnostics::new();

        let raw_id = request
            .prior_state
            .get_string(&AttributePath::new("id"))
            .unwrap_or_default();
        let id = match TrafficManagerProfileId::parse(&raw_id) {
            Ok(id) => id,
            Err(e) => {
                diagnostics.add_error(e.to_string(), String::new());
                return DeleteResourceResponse { diagnostics };
            }
        };

        if let Err(e) = self
            .clients
            .traffic_manager_profiles
            .delete(&id.resource_group, &id.name)
            .await
        {
            diagnostics.add_error(
                format!("deleting Traffic Manager Profile {:?}: {}", id.name, e),
                String::new(),
            );
        }

        DeleteResourceResponse { diagnostics }
    }

    async fn import(&self, _ctx: Context, request: ImportResourceRequest) -> ImportResourceResponse {
        if let Err(e) = TrafficManagerProfileId::parse(&request.id) {
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

    fn profile_config() -> DynamicValue {
        let mut config = DynamicValue::empty_object();
        config
            .set_string(&AttributePath::new("name"), "acctest-profile".to_string())
            .unwrap();
        config
            .set_string(&AttributePath::new("resource_group_name"), "rg1".to_string())
            .unwrap();
        config
            .set_string(
                &AttributePath::new("traffic_routing_method"),
                "Weighted".to_string(),
            )
            .unwrap();
        config
            .set_list(
                &AttributePath::new("dns_config"),
                vec![Dynamic::Map(HashMap::from([
                    (
                        "relative_name".to_string(),
                        Dynamic::String("acctest-profile".to_string()),
                    ),
                    ("ttl".to_string(), Dynamic::Number(100.0)),
                ]))],
            )
            .unwrap();
        config
            .set_list(
                &AttributePath::new("monitor_config"),
                vec![Dynamic::Map(HashMap::from([
                    ("protocol".to_string(), Dynamic::String("HTTP".to_string())),
                    ("port".to_string(), Dynamic::Number(80.0)),
                    ("path".to_string(), Dynamic::String("/".to_string())),
                    (
                        "expected_status_code_ranges".to_string(),
                        Dynamic::List(vec![Dynamic::String("100-101".to_string())]),
                    ),
                ]))],
            )
            .unwrap();
        config
    }

    #[test]
    fn expand_builds_global_profile() {
        let profile = expand_profile(&profile_config());

        assert_eq!(profile.location.as_deref(), Some("global"));
        assert_eq!(
            profile.properties.traffic_routing_method.as_deref(),
            Some("Weighted")
        );

        let dns = profile.properties.dns_config.unwrap();
        assert_eq!(dns.relative_name, "acctest-profile");
        assert_eq!(dns.ttl, 100);

        let monitor = profile.properties.monitor_config.unwrap();
        let ranges = monitor.expected_status_code_ranges.unwrap();
        assert_eq!(ranges[0].min, 100);
        assert_eq!(ranges[0].max, 101);
    }

    #[test]
    fn status_code_range_list_validation() {
        let (_, errors) = validate_status_code_ranges(
            &Dynamic::List(vec![
                Dynamic::String("100-101".to_string()),
                Dynamic::String("abc-101".to_string()),
            ]),
            "monitor_config.0.expected_status_code_ranges",
        );

        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn schema_requires_dns_and_monitor_blocks() {
        let schema = TrafficManagerProfileResource::schema_static();

        assert_eq!(schema.block.block_type("dns_config").unwrap().min_items, 1);
        assert_eq!(schema.block.block_type("monitor_config").unwrap().min_items, 1);
        assert!(schema.block.attribute("fqdn").unwrap().computed);
    }
}
