//! End-to-end framework test: a minimal in-memory provider driven through
//! the gRPC service surface, covering schema retrieval, validation,
//! planning and the full apply lifecycle.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tfplug::context::Context;
use tfplug::data_source::{DataSource, ReadDataSourceRequest, ReadDataSourceResponse};
use tfplug::grpc::GrpcProviderServer;
use tfplug::provider::{ConfigureProviderRequest, ConfigureProviderResponse, Provider};
use tfplug::proto;
use tfplug::proto::ProviderService;
use tfplug::resource::{
    CreateResourceRequest, CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse,
    ReadResourceRequest, ReadResourceResponse, Resource, UpdateResourceRequest,
    UpdateResourceResponse,
};
use tfplug::schema::{AttributeBuilder, Schema, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostics, Dynamic, DynamicValue};
use tfplug::validator::StringIsNotEmpty;
use tonic::Request;

type Store = Arc<Mutex<HashMap<String, String>>>;

struct WidgetResource {
    store: Store,
}

fn widget_schema() -> Schema {
    SchemaBuilder::new()
        .attribute(AttributeBuilder::string("id").computed().build())
        .attribute(
            AttributeBuilder::string("name")
                .required()
                .force_new()
                .validator(Arc::new(StringIsNotEmpty))
                .build(),
        )
        .attribute(
            AttributeBuilder::string("color")
                .optional()
                .default_value(Dynamic::String("blue".to_string()))
                .build(),
        )
        .build()
}

#[async_trait]
impl Resource for WidgetResource {
    fn type_name(&self) -> &str {
        "test_widget"
    }

    fn schema(&self) -> Schema {
        widget_schema()
    }

    async fn create(&self, _ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        let name = request
            .config
            .get_string(&AttributePath::new("name"))
            .unwrap_or_default();
        let color = request
            .planned_state
            .get_string(&AttributePath::new("color"))
            .unwrap_or_default();

        self.store.lock().unwrap().insert(name.clone(), color.clone());

        let mut new_state = DynamicValue::empty_object();
        new_state
            .set_string(&AttributePath::new("id"), format!("widget-{}", name))
            .unwrap();
        new_state.set_string(&AttributePath::new("name"), name).unwrap();
        new_state.set_string(&AttributePath::new("color"), color).unwrap();

        CreateResourceResponse {
            new_state,
            diagnostics: Diagnostics::new(),
        }
    }

    async fn read(&self, _ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let name = request
            .current_state
            .get_string(&AttributePath::new("name"))
            .unwrap_or_default();

        let new_state = self.store.lock().unwrap().get(&name).map(|color| {
            let mut state = request.current_state.clone();
            state
                .set_string(&AttributePath::new("color"), color.clone())
                .unwrap();
            state
        });

        ReadResourceResponse {
            new_state,
            diagnostics: Diagnostics::new(),
        }
    }

    async fn update(&self, _ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        let name = request
            .planned_state
            .get_string(&AttributePath::new("name"))
            .unwrap_or_default();
        let color = request
            .planned_state
            .get_string(&AttributePath::new("color"))
            .unwrap_or_default();

        self.store.lock().unwrap().insert(name, color);

        UpdateResourceResponse {
            new_state: request.planned_state,
            diagnostics: Diagnostics::new(),
        }
    }

    async fn delete(&self, _ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        let name = request
            .prior_state
            .get_string(&AttributePath::new("name"))
            .unwrap_or_default();
        self.store.lock().unwrap().remove(&name);

        DeleteResourceResponse {
            diagnostics: Diagnostics::new(),
        }
    }
}

struct WidgetDataSource {
    store: Store,
}

#[async_trait]
impl DataSource for WidgetDataSource {
    fn type_name(&self) -> &str {
        "test_widget_lookup"
    }

    fn schema(&self) -> Schema {
        SchemaBuilder::new()
            .attribute(AttributeBuilder::string("name").required().build())
            .attribute(AttributeBuilder::string("color").computed().build())
            .build()
    }

    async fn read(&self, _ctx: Context, request: ReadDataSourceRequest) -> ReadDataSourceResponse {
        let name = request
            .config
            .get_string(&AttributePath::new("name"))
            .unwrap_or_default();
        let color = self
            .store
            .lock()
            .unwrap()
            .get(&name)
            .cloned()
            .unwrap_or_default();

        let mut state = DynamicValue::empty_object();
        state.set_string(&AttributePath::new("name"), name).unwrap();
        state.set_string(&AttributePath::new("color"), color).unwrap();

        ReadDataSourceResponse {
            state,
            diagnostics: Diagnostics::new(),
        }
    }
}

struct TestProvider {
    store: Store,
}

impl TestProvider {
    fn new() -> Self {
        Self {
            store: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

#[async_trait]
impl Provider for TestProvider {
    fn schema(&self) -> Schema {
        SchemaBuilder::new()
            .attribute(AttributeBuilder::string("api_token").optional().sensitive().build())
            .build()
    }

    async fn configure(
        &mut self,
        _ctx: Context,
        _request: ConfigureProviderRequest,
    ) -> ConfigureProviderResponse {
        ConfigureProviderResponse {
            diagnostics: Diagnostics::new(),
        }
    }

    async fn create_resource(&self, type_name: &str) -> tfplug::Result<Box<dyn Resource>> {
        match type_name {
            "test_widget" => Ok(Box::new(WidgetResource {
                store: self.store.clone(),
            })),
            other => Err(tfplug::TfplugError::ResourceNotFound(other.to_string())),
        }
    }

    async fn create_data_source(&self, type_name: &str) -> tfplug::Result<Box<dyn DataSource>> {
        match type_name {
            "test_widget_lookup" => Ok(Box::new(WidgetDataSource {
                store: self.store.clone(),
            })),
            other => Err(tfplug::TfplugError::DataSourceNotFound(other.to_string())),
        }
    }

    async fn resource_schemas(&self) -> HashMap<String, Schema> {
        HashMap::from([("test_widget".to_string(), widget_schema())])
    }

    async fn data_source_schemas(&self) -> HashMap<String, Schema> {
        HashMap::from([(
            "test_widget_lookup".to_string(),
            WidgetDataSource {
                store: self.store.clone(),
            }
            .schema(),
        )])
    }
}

fn encode(value: &DynamicValue) -> Option<proto::DynamicValue> {
    Some(proto::DynamicValue {
        msgpack: value.encode_msgpack().unwrap(),
        json: Vec::new(),
    })
}

fn decode(value: Option<proto::DynamicValue>) -> DynamicValue {
    DynamicValue::decode_msgpack(&value.unwrap().msgpack).unwrap()
}

fn widget_config(name: &str) -> DynamicValue {
    let mut config = DynamicValue::empty_object();
    config
        .set_string(&AttributePath::new("name"), name.to_string())
        .unwrap();
    config
}

#[tokio::test]
async fn provider_schema_lists_resources_and_data_sources() {
    let server = GrpcProviderServer::new(TestProvider::new());

    let response = server
        .get_provider_schema(Request::new(proto::get_provider_schema::Request {}))
        .await
        .unwrap()
        .into_inner();

    assert!(response.resource_schemas.contains_key("test_widget"));
    assert!(response.data_source_schemas.contains_key("test_widget_lookup"));
    assert!(response.provider.is_some());
}

#[tokio::test]
async fn validate_reports_missing_required_attribute() {
    let server = GrpcProviderServer::new(TestProvider::new());

    let response = server
        .validate_resource_config(Request::new(proto::validate_resource_config::Request {
            type_name: "test_widget".to_string(),
            config: encode(&DynamicValue::empty_object()),
            client_capabilities: None,
        }))
        .await
        .unwrap()
        .into_inner();

    assert_eq!(response.diagnostics.len(), 1);
    assert!(response.diagnostics[0].summary.contains("name"));
}

#[tokio::test]
async fn plan_fills_defaults_and_marks_computed_unknown() {
    let server = GrpcProviderServer::new(TestProvider::new());

    let config = widget_config("one");
    let response = server
        .plan_resource_change(Request::new(proto::plan_resource_change::Request {
            type_name: "test_widget".to_string(),
            prior_state: encode(&DynamicValue::null()),
            proposed_new_state: encode(&config),
            config: encode(&config),
            prior_private: Vec::new(),
            provider_meta: None,
            client_capabilities: None,
        }))
        .await
        .unwrap()
        .into_inner();

    let planned = decode(response.planned_state);
    assert_eq!(
        planned.get(&AttributePath::new("color")),
        Some(&Dynamic::String("blue".to_string()))
    );
    assert_eq!(planned.get(&AttributePath::new("id")), Some(&Dynamic::Unknown));
}

#[tokio::test]
async fn plan_flags_force_new_changes_for_replacement() {
    let server = GrpcProviderServer::new(TestProvider::new());

    let mut prior = widget_config("one");
    prior
        .set_string(&AttributePath::new("id"), "widget-one".to_string())
        .unwrap();
    prior
        .set_string(&AttributePath::new("color"), "blue".to_string())
        .unwrap();

    let mut proposed = prior.clone();
    proposed
        .set_string(&AttributePath::new("name"), "two".to_string())
        .unwrap();

    let response = server
        .plan_resource_change(Request::new(proto::plan_resource_change::Request {
            type_name: "test_widget".to_string(),
            prior_state: encode(&prior),
            proposed_new_state: encode(&proposed),
            config: encode(&proposed),
            prior_private: Vec::new(),
            provider_meta: None,
            client_capabilities: None,
        }))
        .await
        .unwrap()
        .into_inner();

    assert_eq!(response.requires_replace.len(), 1);
}

#[tokio::test]
async fn apply_create_read_delete_lifecycle() {
    let server = GrpcProviderServer::new(TestProvider::new());

    server
        .configure_provider(Request::new(proto::configure_provider::Request {
            terraform_version: "1.9.0".to_string(),
            config: encode(&DynamicValue::empty_object()),
            client_capabilities: None,
        }))
        .await
        .unwrap();

    let config = widget_config("one");
    let mut planned = config.clone();
    planned
        .set_string(&AttributePath::new("color"), "green".to_string())
        .unwrap();

    // create
    let created = server
        .apply_resource_change(Request::new(proto::apply_resource_change::Request {
            type_name: "test_widget".to_string(),
            prior_state: encode(&DynamicValue::null()),
            planned_state: encode(&planned),
            config: encode(&config),
            planned_private: Vec::new(),
            provider_meta: None,
        }))
        .await
        .unwrap()
        .into_inner();

    assert!(created.diagnostics.is_empty());
    let state = decode(created.new_state);
    assert_eq!(
        state.get_string(&AttributePath::new("id")).unwrap(),
        "widget-one"
    );

    // read
    let read = server
        .read_resource(Request::new(proto::read_resource::Request {
            type_name: "test_widget".to_string(),
            current_state: encode(&state),
            private: Vec::new(),
            provider_meta: None,
            client_capabilities: None,
        }))
        .await
        .unwrap()
        .into_inner();

    let read_state = decode(read.new_state);
    assert_eq!(
        read_state.get_string(&AttributePath::new("color")).unwrap(),
        "green"
    );

    // data source sees the stored widget
    let looked_up = server
        .read_data_source(Request::new(proto::read_data_source::Request {
            type_name: "test_widget_lookup".to_string(),
            config: encode(&widget_config("one")),
            provider_meta: None,
            client_capabilities: None,
        }))
        .await
        .unwrap()
        .into_inner();

    let lookup_state = decode(looked_up.state);
    assert_eq!(
        lookup_state.get_string(&AttributePath::new("color")).unwrap(),
        "green"
    );

    // delete
    let deleted = server
        .apply_resource_change(Request::new(proto::apply_resource_change::Request {
            type_name: "test_widget".to_string(),
            prior_state: encode(&state),
            planned_state: encode(&DynamicValue::null()),
            config: encode(&DynamicValue::null()),
            planned_private: Vec::new(),
            provider_meta: None,
        }))
        .await
        .unwrap()
        .into_inner();

    assert!(deleted.diagnostics.is_empty());

    // a follow-up read returns no state
    let read_after_delete = server
        .read_resource(Request::new(proto::read_resource::Request {
            type_name: "test_widget".to_string(),
            current_state: encode(&state),
            private: Vec::new(),
            provider_meta: None,
            client_capabilities: None,
        }))
        .await
        .unwrap()
        .into_inner();

    let cleared = decode(read_after_delete.new_state);
    assert!(cleared.is_null());
}
