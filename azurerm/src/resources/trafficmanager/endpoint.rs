//! The `azurerm_traffic_manager_endpoint` resource

use crate::api::trafficmanager::{
    Endpoint, EndpointProperties, EndpointSubnet, MonitorCustomHeader,
};
use crate::clients::Clients;
use crate::location;
use crate::parse::TrafficManagerEndpointId;
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
    SchemaBuilder, SuppressFn,
};
use tfplug::types::{AttributePath, Diagnostics, Dynamic, DynamicValue};
use tfplug::validator::{IntBetween, StringInSlice};

pub struct TrafficManagerEndpointResource {
    clients: Clients,
}

impl TrafficManagerEndpointResource {
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
                AttributeBuilder::string("profile_name")
                    .required()
                    .force_new()
                    .build(),
            )
            .attribute(
                AttributeBuilder::string("type")
                    .required()
                    .force_new()
                    .validator(Arc::new(StringInSlice::new(
                        &["azureEndpoints", "nestedEndpoints", "externalEndpoints"],
                        false,
                    )))
                    .build(),
            )
            .attribute(AttributeBuilder::string("target").optional().computed().build())
            .attribute(AttributeBuilder::string("target_resource_id").optional().build())
            .attribute(
                AttributeBuilder::string("endpoint_status")
                    .optional()
                    .computed()
                    .validator(Arc::new(StringInSlice::new(&["Enabled", "Disabled"], true)))
                    .diff_suppress(Arc::new(CaseDifference))
                    .build(),
            )
            .attribute(
                AttributeBuilder::number("weight")
                    .optional()
                    .computed()
                    .validator(Arc::new(IntBetween { min: 1, max: 1000 }))
                    .build(),
            )
            .attribute(
                AttributeBuilder::number("priority")
                    .optional()
                    .computed()
                    .validator(Arc::new(IntBetween { min: 1, max: 1000 }))
                    .build(),
            )
            .attribute(
                AttributeBuilder::string("endpoint_location")
                    .optional()
                    .computed()
                    .diff_suppress(Arc::new(SuppressFn(location::diff_suppress)))
                    .build(),
            )
            .attribute(AttributeBuilder::number("min_child_endpoints").optional().build())
            .attribute(
                AttributeBuilder::new(
                    "geo_mappings",
                    AttributeType::List(Box::new(AttributeType::String)),
                )
                .optional()
                .build(),
            )
            .block(
                BlockBuilder::new()
                    .attribute(AttributeBuilder::string("first").required().build())
                    .attribute(AttributeBuilder::string("last").optional().build())
                    .attribute(AttributeBuilder::number("scope").optional().build())
                    .build_nested("subnet", NestingMode::List)
                    .build(),
            )
            .block(
                BlockBuilder::new()
                    .attribute(AttributeBuilder::string("name").required().build())
                    .attribute(AttributeBuilder::string("value").required().build())
                    .build_nested("custom_header", NestingMode::List)
                    .build(),
            )
            .build()
    }

    fn flatten(&self, id: &TrafficManagerEndpointId, endpoint: &Endpoint) -> DynamicValue {
        let mut state: HashMap<String, Dynamic> = HashMap::new();
        state.insert("id".to_string(), Dynamic::String(id.id()));
        state.insert("name".to_string(), Dynamic::String(id.name.clone()));
        state.insert(
            "resource_group_name".to_string(),
            Dynamic::String(id.resource_group.clone()),
        );
        state.insert(
            "profile_name".to_string(),
            Dynamic::String(id.profile_name.clone()),
        );
        state.insert("type".to_string(), Dynamic::String(id.endpoint_type.clone()));

        let properties = &endpoint.properties;
        state.insert(
            "target".to_string(),
            Dynamic::String(properties.target.clone().unwrap_or_default()),
        );
        state.insert(
            "target_resource_id".to_string(),
            Dynamic::String(properties.target_resource_id.clone().unwrap_or_default()),
        );
        state.insert(
            "endpoint_status".to_string(),
            Dynamic::String(properties.endpoint_status.clone().unwrap_or_default()),
        );
        state.insert(
            "weight".to_string(),
            Dynamic::Number(properties.weight.unwrap_or(0) as f64),
        );
        state.insert(
            "priority".to_string(),
            Dynamic::Number(properties.priority.unwrap_or(0) as f64),
        );
        state.insert(
            "endpoint_location".to_string(),
            Dynamic::String(location::normalize(
                properties.endpoint_location.as_deref().unwrap_or_default(),
            )),
        );
        if let Some(min_child_endpoints) = properties.min_child_endpoints {
            state.insert(
                "min_child_endpoints".to_string(),
                Dynamic::Number(min_child_endpoints as f64),
            );
        }
        state.insert(
            "geo_mappings".to_string(),
            Dynamic::List(
                properties
                    .geo_mapping
                    .as_deref()
                    .unwrap_or(&[])
                    .iter()
                    .map(|m| Dynamic::String(m.clone()))
                    .collect(),
            ),
        );
        state.insert(
            "subnet".to_string(),
            Dynamic::List(
                properties
                    .subnets
                    .as_deref()
                    .unwrap_or(&[])
                    .iter()
                    .map(|subnet| {
                        let mut block = HashMap::from([(
                            "first".to_string(),
                            Dynamic::String(subnet.first.clone().unwrap_or_default()),
                        )]);
                        if let Some(last) = &subnet.last {
                            block.insert("last".to_string(), Dynamic::String(last.clone()));
                        }
                        if let Some(scope) = subnet.scope {
                            block.insert("scope".to_string(), Dynamic::Number(scope as f64));
                        }
                        Dynamic::Map(block)
                    })
                    .collect(),
            ),
        );
        state.insert(
            "custom_header".to_string(),
            Dynamic::List(
                properties
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
                    .collect(),
            ),
        );

        DynamicValue::new(Dynamic::Map(state))
    }
}

fn expand_endpoint(config: &DynamicValue) -> Endpoint {
    let string_at = |path: AttributePath| -> Option<String> {
        config
            .get(&path)
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string())
    };
    let number_at = |path: AttributePath| -> Option<i64> { config.get(&path).and_then(|v| v.as_i64()) };

    let subnets: Vec<EndpointSubnet> = config
        .get(&AttributePath::new("subnet"))
        .and_then(|v| v.as_list())
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_map())
                .map(|subnet| EndpointSubnet {
                    first: subnet
                        .get("first")
                        .and_then(|v| v.as_str())
                        .map(|s| s.to_string()),
                    last: subnet
                        .get("last")
                        .and_then(|v| v.as_str())
                        .filter(|s| !s.is_empty())
                        .map(|s| s.to_string()),
                    scope: subnet.get("scope").and_then(|v| v.as_i64()),
                })
                .collect()
        })
        .unwrap_or_default();

    let custom_headers: Vec<MonitorCustomHeader> = config
        .get(&AttributePath::new("custom_header"))
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

    let geo_mappings: Vec<String> = config
        .get(&AttributePath::new("geo_mappings"))
        .and_then(|v| v.as_list())
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str())
                .map(|s| s.to_string())
                .collect()
        })
        .unwrap_or_default();

    Endpoint {
        id: None,
        name: None,
        endpoint_type: None,
        properties: EndpointProperties {
            target: string_at(AttributePath::new("target")),
            target_resource_id: string_at(AttributePath::new("target_resource_id")),
            endpoint_status: string_at(AttributePath::new("endpoint_status")),
            weight: number_at(AttributePath::new("weight")),
            priority: number_at(AttributePath::new("priority")),
            endpoint_location: string_at(AttributePath::new("endpoint_location")),
            min_child_endpoints: number_at(AttributePath::new("min_child_endpoints")),
            geo_mapping: if geo_mappings.is_empty() {
                None
            } else {
                Some(geo_mappings)
            },
            subnets: if subnets.is_empty() { None } else { Some(subnets) },
            custom_headers: if custom_headers.is_empty() {
                None
            } else {
                Some(custom_headers)
            },
        },
    }
}

#[async_trait]
impl Resource for TrafficManagerEndpointResource {
    fn type_name(&self) -> &str {
        "azurerm_traffic_manager_endpoint"
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
        let profile_name = config
            .get_string(&AttributePath::new("profile_name"))
            .unwrap_or_default();
        let endpoint_type = config
            .get_string(&AttributePath::new("type"))
            .unwrap_or_default();
        let id = TrafficManagerEndpointId::new(
            &self.clients.subscription_id,
            &resource_group,
            &profile_name,
            &endpoint_type,
            &name,
        );

        match self
            .clients
            .traffic_manager_endpoints
            .get(&resource_group, &profile_name, &endpoint_type, &name)
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
                    format!("checking for presence of existing Traffic Manager Endpoint {:?}: {}", name, e),
                    String::new(),
                );
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    diagnostics,
                };
            }
        }

        let endpoint = expand_endpoint(config);
        let created = match self
            .clients
            .traffic_manager_endpoints
            .create_or_update(&resource_group, &profile_name, &endpoint_type, &name, &endpoint)
            .await
        {
            Ok(created) => created,
            Err(e) => {
                diagnostics.add_error(
                    format!(
                        "creating Traffic Manager Endpoint {:?} (Profile {:?}, Resource Group {:?}): {}",
                        name, profile_name, resource_group, e
                    ),
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
        let id = match TrafficManagerEndpointId::parse(&raw_id) {
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
            .traffic_manager_endpoints
            .get(&id.resource_group, &id.profile_name, &id.endpoint_type, &id.name)
            .await
        {
            Ok(endpoint) => ReadResourceResponse {
                new_state: Some(self.flatten(&id, &endpoint)),
                diagnostics,
            },
            Err(e) if e.is_not_found() => {
                tracing::info!(
                    endpoint = %id.name,
                    "Traffic Manager Endpoint was not found - removing from state"
                );
                ReadResourceResponse {
                    new_state: None,
                    diagnostics,
                }
            }
            Err(e) => {
                diagnostics.add_error(
                    format!("retrieving Traffic Manager Endpoint {:?}: {}", id.name, e),
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
        let id = match TrafficManagerEndpointId::parse(&raw_id) {
            Ok(id) => id,
            Err(e) => {
                diagnostics.add_error(e.to_string(), String::new());
                return UpdateResourceResponse {
                    new_state: request.planned_state,
                    diagnostics,
                };
            }
        };

        let endpoint = expand_endpoint(&request.planned_state);
        match self
            .clients
            .traffic_manager_endpoints
            .create_or_update(
                &id.resource_group,
                &id.profile_name,
                &id.endpoint_type,
                &id.name,
                &endpoint,
            )
            .await
        {
            Ok(updated) => UpdateResourceResponse {
                new_state: self.flatten(&id, &updated),
                diagnostics,
            },
            Err(e) => {
                diagnostics.add_error(
                    format!("updating Traffic Manager Endpoint {:?}: {}", id.name, e),
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
        let id = match TrafficManagerEndpointId::parse(&raw_id) {
            Ok(id) => id,
            Err(e) => {
                diagnostics.add_error(e.to_string(), String::new());
                return DeleteResourceResponse { diagnostics };
            }
        };

        if let Err(e) = self
            .clients
            .traffic_manager_endpoints
            .delete(&id.resource_group, &id.profile_name, &id.endpoint_type, &id.name)
            .await
        {
            diagnostics.add_error(
                format!("deleting Traffic Manager Endpoint {:?}: {}", id.name, e),
                String::new(),
            );
        }

        DeleteResourceResponse { diagnostics }
    }

    async fn import(&self, _ctx: Context, request: ImportResourceRequest) -> ImportResourceResponse {
        if let Err(e) = TrafficManagerEndpointId::parse(&request.id) {
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
