//! gRPC service implementation
//!
//! Bridges the Terraform Plugin Protocol v6 onto the [`Provider`],
//! [`Resource`] and [`DataSource`] traits. The framework owns the generic
//! planning steps so providers only implement CRUD:
//!
//! 1. destroy plans pass through untouched
//! 2. static defaults fill absent optional attributes
//! 3. absent computed attributes are marked unknown
//! 4. diff suppression keeps the prior value when old/new are equivalent
//! 5. changed force-new attributes are reported as requires-replace
//!
//! Apply dispatches to create/update/delete with the resource's
//! per-operation timeout wrapped around the handler.

use crate::context::Context;
use crate::provider::{ConfigureProviderRequest, Provider};
use crate::proto;
use crate::resource;
use crate::schema::{Attribute, Block, NestingMode, Schema};
use crate::types::{
    AttributePath, AttributePathStep, Diagnostic, DiagnosticSeverity, Diagnostics, Dynamic,
    DynamicValue,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tonic::{Request, Response, Status};

pub struct GrpcProviderServer<P: Provider> {
    provider: Arc<RwLock<P>>,
}

impl<P: Provider> GrpcProviderServer<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider: Arc::new(RwLock::new(provider)),
        }
    }
}

// --- proto conversions -----------------------------------------------------

fn encode_dynamic(value: &DynamicValue) -> Result<proto::DynamicValue, Status> {
    let msgpack = value
        .encode_msgpack()
        .map_err(|e| Status::internal(e.to_string()))?;
    Ok(proto::DynamicValue {
        msgpack,
        json: Vec::new(),
    })
}

fn decode_dynamic(value: Option<&proto::DynamicValue>) -> Result<DynamicValue, Status> {
    match value {
        None => Ok(DynamicValue::null()),
        Some(dv) if !dv.msgpack.is_empty() => DynamicValue::decode_msgpack(&dv.msgpack)
            .map_err(|e| Status::invalid_argument(e.to_string())),
        Some(dv) if !dv.json.is_empty() => {
            DynamicValue::decode_json(&dv.json).map_err(|e| Status::invalid_argument(e.to_string()))
        }
        Some(_) => Ok(DynamicValue::null()),
    }
}

fn path_to_proto(path: &AttributePath) -> proto::AttributePath {
    proto::AttributePath {
        steps: path
            .steps
            .iter()
            .map(|step| proto::attribute_path::Step {
                selector: Some(match step {
                    AttributePathStep::AttributeName(name) => {
                        proto::attribute_path::step::Selector::AttributeName(name.clone())
                    }
                    AttributePathStep::ElementKeyString(key) => {
                        proto::attribute_path::step::Selector::ElementKeyString(key.clone())
                    }
                    AttributePathStep::ElementKeyInt(idx) => {
                        proto::attribute_path::step::Selector::ElementKeyInt(*idx)
                    }
                }),
            })
            .collect(),
    }
}

fn diagnostic_to_proto(diag: Diagnostic) -> proto::Diagnostic {
    proto::Diagnostic {
        severity: match diag.severity {
            DiagnosticSeverity::Error => proto::diagnostic::Severity::Error as i32,
            DiagnosticSeverity::Warning => proto::diagnostic::Severity::Warning as i32,
        },
        summary: diag.summary,
        detail: diag.detail,
        attribute: diag.attribute.as_ref().map(path_to_proto),
    }
}

fn diagnostics_to_proto(diags: Diagnostics) -> Vec<proto::Diagnostic> {
    diags.into_vec().into_iter().map(diagnostic_to_proto).collect()
}

fn attribute_to_proto(attr: &Attribute) -> proto::schema::Attribute {
    proto::schema::Attribute {
        name: attr.name.clone(),
        r#type: attr.r#type.to_wire_json(),
        description: attr.description.clone(),
        required: attr.required,
        optional: attr.optional,
        computed: attr.computed,
        sensitive: attr.sensitive,
        description_kind: proto::StringKind::Plain as i32,
        deprecated: attr.deprecated,
    }
}

fn block_to_proto(block: &Block, version: i64) -> proto::schema::Block {
    proto::schema::Block {
        version,
        attributes: block.attributes.iter().map(attribute_to_proto).collect(),
        block_types: block
            .block_types
            .iter()
            .map(|nested| proto::schema::NestedBlock {
                type_name: nested.type_name.clone(),
                block: Some(block_to_proto(&nested.block, version)),
                nesting: match nested.nesting {
                    NestingMode::Single => proto::schema::nested_block::NestingMode::Single as i32,
                    NestingMode::List => proto::schema::nested_block::NestingMode::List as i32,
                    NestingMode::Set => proto::schema::nested_block::NestingMode::Set as i32,
                },
                min_items: nested.min_items,
                max_items: nested.max_items,
            })
            .collect(),
        description: block.description.clone(),
        description_kind: proto::StringKind::Plain as i32,
        deprecated: false,
    }
}

fn schema_to_proto(schema: &Schema) -> proto::Schema {
    proto::Schema {
        version: schema.version,
        block: Some(block_to_proto(&schema.block, schema.version)),
    }
}

// --- framework plan logic --------------------------------------------------

fn plan_object(
    block: &Block,
    prior: Option<&HashMap<String, Dynamic>>,
    planned: &mut HashMap<String, Dynamic>,
    path: &AttributePath,
    requires_replace: &mut Vec<AttributePath>,
) {
    for attr in &block.attributes {
        let attr_path = path.clone().attribute(&attr.name);
        let prior_value = prior.and_then(|m| m.get(&attr.name));
        let absent = planned
            .get(&attr.name)
            .map(|v| v.is_null())
            .unwrap_or(true);

        if absent {
            if let Some(default) = &attr.default {
                planned.insert(attr.name.clone(), default.clone());
            } else if attr.computed {
                match prior_value {
                    Some(v) if !v.is_null() => {
                        planned.insert(attr.name.clone(), v.clone());
                    }
                    _ => {
                        planned.insert(attr.name.clone(), Dynamic::Unknown);
                    }
                }
            }
        }

        if let (Some(suppress), Some(old)) = (&attr.diff_suppress, prior_value) {
            let suppressed = match (old.as_str(), planned.get(&attr.name).and_then(|v| v.as_str()))
            {
                (Some(old_s), Some(new_s)) => {
                    suppress.suppress(&attr_path.to_string(), old_s, new_s)
                }
                _ => false,
            };
            if suppressed {
                planned.insert(attr.name.clone(), old.clone());
            }
        }

        if attr.force_new && prior.is_some() {
            let new_value = planned.get(&attr.name);
            let changed = match (prior_value, new_value) {
                (_, Some(Dynamic::Unknown)) => false,
                (Some(old), Some(new)) => old != new,
                (Some(old), None) => !old.is_null(),
                (None, Some(new)) => !new.is_null(),
                (None, None) => false,
            };
            if changed {
                requires_replace.push(attr_path);
            }
        }
    }

    for nested in &block.block_types {
        let nested_path = path.clone().attribute(&nested.type_name);
        let prior_value = prior.and_then(|m| m.get(&nested.type_name));

        if nested.force_new && prior.is_some() {
            let new_value = planned.get(&nested.type_name);
            let changed = match (prior_value, new_value) {
                (Some(old), Some(new)) => old != new,
                (Some(old), None) => !old.is_null(),
                (None, Some(new)) => !new.is_null(),
                (None, None) => false,
            };
            if changed {
                requires_replace.push(nested_path.clone());
            }
        }

        // recurse element-wise so defaults, computed markers and diff
        // suppression apply inside block items too
        match planned.get_mut(&nested.type_name) {
            Some(Dynamic::List(items)) => {
                let prior_items = prior_value.and_then(|v| v.as_list());
                for (idx, item) in items.iter_mut().enumerate() {
                    if let Dynamic::Map(item_map) = item {
                        let prior_item = prior_items
                            .and_then(|l| l.get(idx))
                            .and_then(|v| v.as_map());
                        plan_object(
                            &nested.block,
                            prior_item,
                            item_map,
                            &nested_path.clone().index(idx as i64),
                            requires_replace,
                        );
                    }
                }
            }
            Some(Dynamic::Map(item_map)) => {
                plan_object(
                    &nested.block,
                    prior_value.and_then(|v| v.as_map()),
                    item_map,
                    &nested_path,
                    requires_replace,
                );
            }
            _ => {}
        }
    }
}

fn plan_resource(
    schema: &Schema,
    prior: &DynamicValue,
    proposed: &DynamicValue,
) -> (DynamicValue, Vec<AttributePath>) {
    // destroy plan
    if proposed.is_null() {
        return (DynamicValue::null(), Vec::new());
    }

    let mut planned = proposed.clone();
    let mut requires_replace = Vec::new();

    if let Dynamic::Map(planned_map) = &mut planned.value {
        let prior_map = if prior.is_null() {
            None
        } else {
            prior.value.as_map()
        };
        plan_object(
            &schema.block,
            prior_map,
            planned_map,
            &AttributePath::root(),
            &mut requires_replace,
        );
    }

    (planned, requires_replace)
}

// --- schema-driven config validation ---------------------------------------

fn validate_object(block: &Block, object: &HashMap<String, Dynamic>, path: &AttributePath, diags: &mut Diagnostics) {
    for attr in &block.attributes {
        let attr_path = path.clone().attribute(&attr.name);
        let value = object.get(&attr.name);

        match value {
            None | Some(Dynamic::Null) => {
                if attr.required {
                    diags.add_attribute_error(
                        attr_path,
                        format!("missing required attribute '{}'", attr.name),
                        String::new(),
                    );
                }
            }
            Some(Dynamic::Unknown) => {}
            Some(value) => {
                for validator in &attr.validators {
                    validator.validate(value, &attr_path.to_string(), diags);
                }
            }
        }
    }

    for nested in &block.block_types {
        let nested_path = path.clone().attribute(&nested.type_name);
        let items: Vec<&HashMap<String, Dynamic>> = match object.get(&nested.type_name) {
            Some(Dynamic::List(items)) => items.iter().filter_map(|i| i.as_map()).collect(),
            Some(Dynamic::Map(item)) => vec![item],
            _ => Vec::new(),
        };

        if (items.len() as i64) < nested.min_items {
            diags.add_attribute_error(
                nested_path.clone(),
                format!(
                    "insufficient '{}' blocks: at least {} required",
                    nested.type_name, nested.min_items
                ),
                String::new(),
            );
        }
        if nested.max_items > 0 && (items.len() as i64) > nested.max_items {
            diags.add_attribute_error(
                nested_path.clone(),
                format!(
                    "too many '{}' blocks: at most {} allowed",
                    nested.type_name, nested.max_items
                ),
                String::new(),
            );
        }

        for (idx, item) in items.into_iter().enumerate() {
            validate_object(&nested.block, item, &nested_path.clone().index(idx as i64), diags);
        }
    }
}

fn validate_config(schema: &Schema, config: &DynamicValue, diags: &mut Diagnostics) {
    if let Some(object) = config.value.as_map() {
        validate_object(&schema.block, object, &AttributePath::root(), diags);
    }
}

// --- timeout handling ------------------------------------------------------

async fn with_timeout<F, T>(duration: Duration, operation: &str, fut: F) -> Result<T, Status>
where
    F: std::future::Future<Output = T>,
{
    tokio::time::timeout(duration, fut)
        .await
        .map_err(|_| Status::deadline_exceeded(format!("{} timed out after {:?}", operation, duration)))
}

// --- service implementation ------------------------------------------------

#[tonic::async_trait]
impl<P: Provider + 'static> proto::ProviderService for GrpcProviderServer<P> {
    async fn get_provider_schema(
        &self,
        _request: Request<proto::get_provider_schema::Request>,
    ) -> Result<Response<proto::get_provider_schema::Response>, Status> {
        let provider = self.provider.read().await;

        let resource_schemas = provider
            .resource_schemas()
            .await
            .iter()
            .map(|(name, schema)| (name.clone(), schema_to_proto(schema)))
            .collect();

        let data_source_schemas = provider
            .data_source_schemas()
            .await
            .iter()
            .map(|(name, schema)| (name.clone(), schema_to_proto(schema)))
            .collect();

        Ok(Response::new(proto::get_provider_schema::Response {
            provider: Some(schema_to_proto(&provider.schema())),
            resource_schemas,
            data_source_schemas,
            diagnostics: Vec::new(),
            provider_meta: None,
            server_capabilities: Some(proto::ServerCapabilities {
                plan_destroy: false,
                get_provider_schema_optional: false,
                move_resource_state: false,
            }),
        }))
    }

    async fn validate_provider_config(
        &self,
        request: Request<proto::validate_provider_config::Request>,
    ) -> Result<Response<proto::validate_provider_config::Response>, Status> {
        let request = request.into_inner();
        let config = decode_dynamic(request.config.as_ref())?;

        let provider = self.provider.read().await;
        let mut diags = Diagnostics::new();
        validate_config(&provider.schema(), &config, &mut diags);

        Ok(Response::new(proto::validate_provider_config::Response {
            diagnostics: diagnostics_to_proto(diags),
        }))
    }

    async fn validate_resource_config(
        &self,
        request: Request<proto::validate_resource_config::Request>,
    ) -> Result<Response<proto::validate_resource_config::Response>, Status> {
        let request = request.into_inner();
        let config = decode_dynamic(request.config.as_ref())?;

        let provider = self.provider.read().await;
        let mut diags = Diagnostics::new();

        match provider.resource_schemas().await.get(&request.type_name) {
            Some(schema) => validate_config(schema, &config, &mut diags),
            None => {
                return Err(Status::invalid_argument(format!(
                    "unknown resource type {}",
                    request.type_name
                )))
            }
        }

        // resource-level cross-attribute checks need a configured provider;
        // before configure only the schema validators run
        if let Ok(resource) = provider.create_resource(&request.type_name).await {
            let response = resource
                .validate(
                    Context::new(),
                    resource::ValidateResourceRequest { config },
                )
                .await;
            diags.extend(response.diagnostics);
        }

        Ok(Response::new(proto::validate_resource_config::Response {
            diagnostics: diagnostics_to_proto(diags),
        }))
    }

    async fn validate_data_resource_config(
        &self,
        request: Request<proto::validate_data_resource_config::Request>,
    ) -> Result<Response<proto::validate_data_resource_config::Response>, Status> {
        let request = request.into_inner();
        let config = decode_dynamic(request.config.as_ref())?;

        let provider = self.provider.read().await;
        let mut diags = Diagnostics::new();

        match provider.data_source_schemas().await.get(&request.type_name) {
            Some(schema) => validate_config(schema, &config, &mut diags),
            None => {
                return Err(Status::invalid_argument(format!(
                    "unknown data source type {}",
                    request.type_name
                )))
            }
        }

        Ok(Response::new(proto::validate_data_resource_config::Response {
            diagnostics: diagnostics_to_proto(diags),
        }))
    }

    async fn upgrade_resource_state(
        &self,
        request: Request<proto::upgrade_resource_state::Request>,
    ) -> Result<Response<proto::upgrade_resource_state::Response>, Status> {
        let request = request.into_inner();

        let provider = self.provider.read().await;
        let schemas = provider.resource_schemas().await;
        let schema = schemas
            .get(&request.type_name)
            .ok_or_else(|| Status::invalid_argument(format!("unknown resource type {}", request.type_name)))?;

        let raw = request
            .raw_state
            .ok_or_else(|| Status::invalid_argument("missing raw state"))?;
        let state = DynamicValue::decode_json(&raw.json)
            .map_err(|e| Status::invalid_argument(e.to_string()))?;

        let mut diags = Diagnostics::new();
        if request.version != schema.version {
            diags.add_error(
                format!(
                    "cannot upgrade {} state from schema version {} to {}",
                    request.type_name, request.version, schema.version
                ),
                "no upgrade path is implemented for this resource",
            );
        }

        Ok(Response::new(proto::upgrade_resource_state::Response {
            upgraded_state: Some(encode_dynamic(&state)?),
            diagnostics: diagnostics_to_proto(diags),
        }))
    }

    async fn configure_provider(
        &self,
        request: Request<proto::configure_provider::Request>,
    ) -> Result<Response<proto::configure_provider::Response>, Status> {
        let request = request.into_inner();
        let config = decode_dynamic(request.config.as_ref())?;

        let mut provider = self.provider.write().await;
        let response = provider
            .configure(Context::new(), ConfigureProviderRequest { config })
            .await;

        Ok(Response::new(proto::configure_provider::Response {
            diagnostics: diagnostics_to_proto(response.diagnostics),
        }))
    }

    async fn read_resource(
        &self,
        request: Request<proto::read_resource::Request>,
    ) -> Result<Response<proto::read_resource::Response>, Status> {
        let request = request.into_inner();
        let current_state = decode_dynamic(request.current_state.as_ref())?;

        let provider = self.provider.read().await;
        let resource = provider
            .create_resource(&request.type_name)
            .await
            .map_err(|e| Status::failed_precondition(e.to_string()))?;

        let timeout = resource.timeouts().read;
        let ctx = Context::new().with_timeout(timeout);
        let response = with_timeout(
            timeout,
            "reading resource",
            resource.read(ctx, resource::ReadResourceRequest { current_state }),
        )
        .await?;

        let new_state = match response.new_state {
            Some(state) => state,
            None => DynamicValue::null(),
        };

        Ok(Response::new(proto::read_resource::Response {
            new_state: Some(encode_dynamic(&new_state)?),
            diagnostics: diagnostics_to_proto(response.diagnostics),
            private: request.private,
        }))
    }

    async fn plan_resource_change(
        &self,
        request: Request<proto::plan_resource_change::Request>,
    ) -> Result<Response<proto::plan_resource_change::Response>, Status> {
        let request = request.into_inner();
        let prior_state = decode_dynamic(request.prior_state.as_ref())?;
        let proposed_new_state = decode_dynamic(request.proposed_new_state.as_ref())?;

        let provider = self.provider.read().await;
        let schemas = provider.resource_schemas().await;
        let schema = schemas
            .get(&request.type_name)
            .ok_or_else(|| Status::invalid_argument(format!("unknown resource type {}", request.type_name)))?;

        let (planned_state, requires_replace) =
            plan_resource(schema, &prior_state, &proposed_new_state);

        Ok(Response::new(proto::plan_resource_change::Response {
            planned_state: Some(encode_dynamic(&planned_state)?),
            requires_replace: requires_replace.iter().map(path_to_proto).collect(),
            planned_private: request.prior_private,
            diagnostics: Vec::new(),
        }))
    }

    async fn apply_resource_change(
        &self,
        request: Request<proto::apply_resource_change::Request>,
    ) -> Result<Response<proto::apply_resource_change::Response>, Status> {
        let request = request.into_inner();
        let prior_state = decode_dynamic(request.prior_state.as_ref())?;
        let planned_state = decode_dynamic(request.planned_state.as_ref())?;
        let config = decode_dynamic(request.config.as_ref())?;

        let provider = self.provider.read().await;
        let resource = provider
            .create_resource(&request.type_name)
            .await
            .map_err(|e| Status::failed_precondition(e.to_string()))?;
        let timeouts = resource.timeouts();

        let (new_state, diagnostics) = if prior_state.is_null() {
            let ctx = Context::new().with_timeout(timeouts.create);
            let response = with_timeout(
                timeouts.create,
                "creating resource",
                resource.create(
                    ctx,
                    resource::CreateResourceRequest {
                        config,
                        planned_state,
                    },
                ),
            )
            .await?;
            (response.new_state, response.diagnostics)
        } else if planned_state.is_null() {
            let ctx = Context::new().with_timeout(timeouts.delete);
            let response = with_timeout(
                timeouts.delete,
                "deleting resource",
                resource.delete(ctx, resource::DeleteResourceRequest { prior_state }),
            )
            .await?;
            (DynamicValue::null(), response.diagnostics)
        } else {
            let ctx = Context::new().with_timeout(timeouts.update);
            let response = with_timeout(
                timeouts.update,
                "updating resource",
                resource.update(
                    ctx,
                    resource::UpdateResourceRequest {
                        prior_state,
                        planned_state,
                        config,
                    },
                ),
            )
            .await?;
            (response.new_state, response.diagnostics)
        };

        Ok(Response::new(proto::apply_resource_change::Response {
            new_state: Some(encode_dynamic(&new_state)?),
            private: request.planned_private,
            diagnostics: diagnostics_to_proto(diagnostics),
        }))
    }

    async fn import_resource_state(
        &self,
        request: Request<proto::import_resource_state::Request>,
    ) -> Result<Response<proto::import_resource_state::Response>, Status> {
        let request = request.into_inner();

        let provider = self.provider.read().await;
        let resource = provider
            .create_resource(&request.type_name)
            .await
            .map_err(|e| Status::failed_precondition(e.to_string()))?;

        let response = resource
            .import(
                Context::new(),
                resource::ImportResourceRequest {
                    id: request.id.clone(),
                },
            )
            .await;

        let imported = if response.diagnostics.has_errors() {
            Vec::new()
        } else {
            vec![proto::import_resource_state::ImportedResource {
                type_name: request.type_name,
                state: Some(encode_dynamic(&response.state)?),
                private: Vec::new(),
            }]
        };

        Ok(Response::new(proto::import_resource_state::Response {
            imported_resources: imported,
            diagnostics: diagnostics_to_proto(response.diagnostics),
        }))
    }

    async fn read_data_source(
        &self,
        request: Request<proto::read_data_source::Request>,
    ) -> Result<Response<proto::read_data_source::Response>, Status> {
        let request = request.into_inner();
        let config = decode_dynamic(request.config.as_ref())?;

        let provider = self.provider.read().await;
        let data_source = provider
            .create_data_source(&request.type_name)
            .await
            .map_err(|e| Status::failed_precondition(e.to_string()))?;

        let response = data_source
            .read(
                Context::new(),
                crate::data_source::ReadDataSourceRequest { config },
            )
            .await;

        Ok(Response::new(proto::read_data_source::Response {
            state: Some(encode_dynamic(&response.state)?),
            diagnostics: diagnostics_to_proto(response.diagnostics),
        }))
    }

    async fn stop_provider(
        &self,
        _request: Request<proto::stop_provider::Request>,
    ) -> Result<Response<proto::stop_provider::Response>, Status> {
        Ok(Response::new(proto::stop_provider::Response {
            error: String::new(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{AttributeBuilder, BlockBuilder, SchemaBuilder, SuppressFn};
    use std::sync::Arc as StdArc;

    fn test_schema() -> Schema {
        SchemaBuilder::new()
            .attribute(AttributeBuilder::string("id").computed().build())
            .attribute(AttributeBuilder::string("name").required().force_new().build())
            .attribute(
                AttributeBuilder::string("tier")
                    .optional()
                    .default_value(Dynamic::String("Standard".to_string()))
                    .build(),
            )
            .attribute(
                AttributeBuilder::string("cluster_version")
                    .required()
                    .force_new()
                    .diff_suppress(StdArc::new(SuppressFn(|_, old, new| {
                        old.split('.').next() == new.split('.').next()
                    })))
                    .build(),
            )
            .build()
    }

    fn object(entries: &[(&str, Dynamic)]) -> DynamicValue {
        let map: HashMap<String, Dynamic> = entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        DynamicValue::new(Dynamic::Map(map))
    }

    #[test]
    fn destroy_plan_passes_through() {
        let prior = object(&[("name", Dynamic::String("a".into()))]);
        let (planned, replace) = plan_resource(&test_schema(), &prior, &DynamicValue::null());

        assert!(planned.is_null());
        assert!(replace.is_empty());
    }

    #[test]
    fn plan_applies_default_and_marks_computed_unknown() {
        let proposed = object(&[
            ("name", Dynamic::String("a".into())),
            ("cluster_version", Dynamic::String("4.0".into())),
        ]);
        let (planned, _) = plan_resource(&test_schema(), &DynamicValue::null(), &proposed);

        assert_eq!(
            planned.get(&AttributePath::new("tier")),
            Some(&Dynamic::String("Standard".into()))
        );
        assert_eq!(
            planned.get(&AttributePath::new("id")),
            Some(&Dynamic::Unknown)
        );
    }

    #[test]
    fn plan_suppresses_equivalent_versions() {
        let prior = object(&[
            ("id", Dynamic::String("x".into())),
            ("name", Dynamic::String("a".into())),
            ("tier", Dynamic::String("Standard".into())),
            ("cluster_version", Dynamic::String("3.1000.67".into())),
        ]);
        let proposed = object(&[
            ("id", Dynamic::String("x".into())),
            ("name", Dynamic::String("a".into())),
            ("tier", Dynamic::String("Standard".into())),
            ("cluster_version", Dynamic::String("3.6".into())),
        ]);

        let (planned, replace) = plan_resource(&test_schema(), &prior, &proposed);

        assert_eq!(
            planned.get(&AttributePath::new("cluster_version")),
            Some(&Dynamic::String("3.1000.67".into()))
        );
        assert!(replace.is_empty());
    }

    #[test]
    fn plan_flags_changed_force_new_attribute() {
        let prior = object(&[
            ("id", Dynamic::String("x".into())),
            ("name", Dynamic::String("a".into())),
            ("tier", Dynamic::String("Standard".into())),
            ("cluster_version", Dynamic::String("4.0".into())),
        ]);
        let proposed = object(&[
            ("id", Dynamic::String("x".into())),
            ("name", Dynamic::String("b".into())),
            ("tier", Dynamic::String("Standard".into())),
            ("cluster_version", Dynamic::String("4.0".into())),
        ]);

        let (_, replace) = plan_resource(&test_schema(), &prior, &proposed);

        assert_eq!(replace.len(), 1);
        assert_eq!(replace[0].to_string(), "name");
    }

    #[test]
    fn validate_reports_missing_required_and_block_counts() {
        let schema = SchemaBuilder::new()
            .attribute(AttributeBuilder::string("name").required().build())
            .block(
                BlockBuilder::new()
                    .attribute(AttributeBuilder::string("username").required().build())
                    .build_nested("gateway", NestingMode::List)
                    .min_items(1)
                    .max_items(1)
                    .build(),
            )
            .build();

        let mut diags = Diagnostics::new();
        validate_config(&schema, &object(&[]), &mut diags);

        assert_eq!(diags.errors.len(), 2);
    }

    #[test]
    fn validate_recurses_into_blocks() {
        let schema = SchemaBuilder::new()
            .block(
                BlockBuilder::new()
                    .attribute(AttributeBuilder::string("username").required().build())
                    .build_nested("gateway", NestingMode::List)
                    .min_items(1)
                    .max_items(1)
                    .build(),
            )
            .build();

        let config = object(&[(
            "gateway",
            Dynamic::List(vec![Dynamic::Map(HashMap::new())]),
        )]);

        let mut diags = Diagnostics::new();
        validate_config(&schema, &config, &mut diags);

        assert_eq!(diags.errors.len(), 1);
        assert!(diags.errors[0].summary.contains("username"));
    }
}
