//! Integration tests for the Traffic Manager profile and endpoint
//! resources, driven against a mock ARM endpoint.

use azurerm::api::{ArmClient, Credential, RetryConfig};
use azurerm::clients::Clients;
use azurerm::resources::trafficmanager::{
    TrafficManagerEndpointResource, TrafficManagerProfileResource,
};
use mockito::{Matcher, Server};
use serde_json::json;
use std::collections::HashMap;
use std::time::Duration;
use tfplug::context::Context;
use tfplug::resource::{
    CreateResourceRequest, DeleteResourceRequest, ReadResourceRequest, Resource,
    UpdateResourceRequest,
};
use tfplug::types::{AttributePath, Dynamic, DynamicValue};

const SUBSCRIPTION: &str = "00000000-0000-0000-0000-000000000000";
const PROFILE_PATH: &str = "/subscriptions/00000000-0000-0000-0000-000000000000/resourceGroups/rg1/providers/Microsoft.Network/trafficManagerProfiles/acctest-profile";

fn test_clients(endpoint: String) -> Clients {
    let retry = RetryConfig {
        max_retries: 0,
        initial_backoff_ms: 1,
        max_backoff_ms: 5,
        lro_poll_interval: Duration::from_millis(5),
        ..Default::default()
    };
    let arm = ArmClient::with_config(
        &endpoint,
        SUBSCRIPTION,
        Credential::Static("test-token".to_string()),
        retry,
    )
    .unwrap();
    Clients::new(arm)
}

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

fn profile_body(ttl: i64) -> String {
    json!({
        "id": PROFILE_PATH,
        "name": "acctest-profile",
        "location": "global",
        "properties": {
            "profileStatus": "Enabled",
            "trafficRoutingMethod": "Weighted",
            "dnsConfig": {
                "relativeName": "acctest-profile",
                "ttl": ttl,
                "fqdn": "acctest-profile.trafficmanager.net"
            },
            "monitorConfig": {
                "protocol": "HTTP",
                "port": 80,
                "path": "/",
                "intervalInSeconds": 30,
                "timeoutInSeconds": 10,
                "toleratedNumberOfFailures": 3,
                "expectedStatusCodeRanges": [{"min": 100, "max": 101}]
            }
        }
    })
    .to_string()
}

#[tokio::test]
async fn profile_create_puts_global_profile_and_flattens_response() {
    let mut server = Server::new_async().await;

    let _mock = server
        .mock("GET", PROFILE_PATH)
        .match_query(Matcher::Any)
        .with_status(404)
        .with_body(r#"{"error":{"code":"ResourceNotFound"}}"#)
        .create_async()
        .await;

    let put = server
        .mock("PUT", PROFILE_PATH)
        .match_query(Matcher::Any)
        .match_body(Matcher::PartialJson(json!({
            "location": "global",
            "properties": {
                "trafficRoutingMethod": "Weighted",
                "dnsConfig": {"relativeName": "acctest-profile", "ttl": 100},
                "monitorConfig": {
                    "protocol": "HTTP",
                    "port": 80,
                    "expectedStatusCodeRanges": [{"min": 100, "max": 101}]
                }
            }
        })))
        .with_body(profile_body(100))
        .create_async()
        .await;

    let resource = TrafficManagerProfileResource::new(test_clients(server.url()));
    let config = profile_config();
    let response = resource
        .create(
            Context::new(),
            CreateResourceRequest {
                planned_state: config.clone(),
                config,
            },
        )
        .await;

    put.assert_async().await;
    assert!(
        response.diagnostics.errors.is_empty(),
        "unexpected errors: {:?}",
        response.diagnostics.errors
    );

    let state = response.new_state;
    assert_eq!(
        state.get_string(&AttributePath::new("fqdn")).unwrap(),
        "acctest-profile.trafficmanager.net"
    );
    assert_eq!(
        state
            .get_string(
                &AttributePath::new("monitor_config")
                    .index(0)
                    .attribute("expected_status_code_ranges")
                    .index(0)
            )
            .unwrap(),
        "100-101"
    );
    assert!(state
        .get_string(&AttributePath::new("id"))
        .unwrap()
        .ends_with("trafficManagerProfiles/acctest-profile"));
}

#[tokio::test]
async fn profile_read_clears_state_when_gone() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", PROFILE_PATH)
        .match_query(Matcher::Any)
        .with_status(404)
        .with_body(r#"{"error":{"code":"ResourceNotFound"}}"#)
        .create_async()
        .await;

    let mut state = profile_config();
    state
        .set_string(&AttributePath::new("id"), PROFILE_PATH.to_string())
        .unwrap();

    let resource = TrafficManagerProfileResource::new(test_clients(server.url()));
    let response = resource
        .read(Context::new(), ReadResourceRequest { current_state: state })
        .await;

    assert!(response.diagnostics.errors.is_empty());
    assert!(response.new_state.is_none());
}

#[tokio::test]
async fn profile_update_puts_the_full_profile() {
    let mut server = Server::new_async().await;

    let put = server
        .mock("PUT", PROFILE_PATH)
        .match_query(Matcher::Any)
        .match_body(Matcher::PartialJson(json!({
            "properties": {"dnsConfig": {"ttl": 300}}
        })))
        .with_body(profile_body(300))
        .create_async()
        .await;

    let mut prior = profile_config();
    prior
        .set_string(&AttributePath::new("id"), PROFILE_PATH.to_string())
        .unwrap();

    let mut planned = prior.clone();
    planned
        .set_number(
            &AttributePath::new("dns_config").index(0).attribute("ttl"),
            300.0,
        )
        .unwrap();

    let resource = TrafficManagerProfileResource::new(test_clients(server.url()));
    let response = resource
        .update(
            Context::new(),
            UpdateResourceRequest {
                prior_state: prior,
                planned_state: planned.clone(),
                config: planned,
            },
        )
        .await;

    put.assert_async().await;
    assert!(response.diagnostics.errors.is_empty());
    assert_eq!(
        response
            .new_state
            .get_number(&AttributePath::new("dns_config").index(0).attribute("ttl"))
            .unwrap(),
        300.0
    );
}

fn endpoint_path() -> String {
    format!("{}/externalEndpoints/acctest-endpoint", PROFILE_PATH)
}

fn endpoint_config() -> DynamicValue {
    let mut config = DynamicValue::empty_object();
    config
        .set_string(&AttributePath::new("name"), "acctest-endpoint".to_string())
        .unwrap();
    config
        .set_string(&AttributePath::new("resource_group_name"), "rg1".to_string())
        .unwrap();
    config
        .set_string(
            &AttributePath::new("profile_name"),
            "acctest-profile".to_string(),
        )
        .unwrap();
    config
        .set_string(&AttributePath::new("type"), "externalEndpoints".to_string())
        .unwrap();
    config
        .set_string(&AttributePath::new("target"), "www.example.com".to_string())
        .unwrap();
    config
        .set_number(&AttributePath::new("weight"), 5.0)
        .unwrap();
    config
}

#[tokio::test]
async fn endpoint_create_flattens_computed_values() {
    let mut server = Server::new_async().await;

    let _mock = server
        .mock("GET", endpoint_path().as_str())
        .match_query(Matcher::Any)
        .with_status(404)
        .with_body(r#"{"error":{"code":"ResourceNotFound"}}"#)
        .create_async()
        .await;

    let put = server
        .mock("PUT", endpoint_path().as_str())
        .match_query(Matcher::Any)
        .match_body(Matcher::PartialJson(json!({
            "properties": {"target": "www.example.com", "weight": 5}
        })))
        .with_body(
            json!({
                "id": endpoint_path(),
                "name": "acctest-endpoint",
                "type": "Microsoft.Network/trafficManagerProfiles/externalEndpoints",
                "properties": {
                    "target": "www.example.com",
                    "endpointStatus": "Enabled",
                    "weight": 5,
                    "priority": 1
                }
            })
            .to_string(),
        )
        .create_async()
        .await;

    let resource = TrafficManagerEndpointResource::new(test_clients(server.url()));
    let config = endpoint_config();
    let response = resource
        .create(
            Context::new(),
            CreateResourceRequest {
                planned_state: config.clone(),
                config,
            },
        )
        .await;

    put.assert_async().await;
    assert!(
        response.diagnostics.errors.is_empty(),
        "unexpected errors: {:?}",
        response.diagnostics.errors
    );

    let state = response.new_state;
    assert_eq!(
        state.get_string(&AttributePath::new("endpoint_status")).unwrap(),
        "Enabled"
    );
    // the API assigned a priority we never configured
    assert_eq!(
        state.get_number(&AttributePath::new("priority")).unwrap(),
        1.0
    );
    assert_eq!(state.get_string(&AttributePath::new("id")).unwrap(), endpoint_path());
}

#[tokio::test]
async fn endpoint_delete_tolerates_missing_endpoint() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("DELETE", endpoint_path().as_str())
        .match_query(Matcher::Any)
        .with_status(404)
        .with_body(r#"{"error":{"code":"ResourceNotFound"}}"#)
        .create_async()
        .await;

    let mut state = endpoint_config();
    state
        .set_string(&AttributePath::new("id"), endpoint_path())
        .unwrap();

    let resource = TrafficManagerEndpointResource::new(test_clients(server.url()));
    let response = resource
        .delete(Context::new(), DeleteResourceRequest { prior_state: state })
        .await;

    assert!(response.diagnostics.errors.is_empty());
}
