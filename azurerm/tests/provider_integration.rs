//! Provider-level integration tests: factory wiring, config validation
//! hooks, import, and the HDInsight cluster data source.

use azurerm::api::{ArmClient, Credential, RetryConfig};
use azurerm::clients::Clients;
use azurerm::data_sources::HdinsightClusterDataSource;
use azurerm::resources::hdinsight::HadoopClusterResource;
use mockito::{Matcher, Server};
use std::collections::HashMap;
use std::time::Duration;
use tfplug::context::Context;
use tfplug::data_source::{DataSource, ReadDataSourceRequest};
use tfplug::resource::{ImportResourceRequest, Resource, ValidateResourceRequest};
use tfplug::types::{AttributePath, Dynamic, DynamicValue};

const SUBSCRIPTION: &str = "00000000-0000-0000-0000-000000000000";

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

#[tokio::test]
async fn hadoop_validate_rejects_password_combined_with_ssh_keys() {
    let resource = HadoopClusterResource::new(test_clients("http://localhost:1".to_string()));

    let mut config = DynamicValue::empty_object();
    config
        .set_list(
            &AttributePath::new("roles"),
            vec![Dynamic::Map(HashMap::from([(
                "worker_node".to_string(),
                Dynamic::List(vec![Dynamic::Map(HashMap::from([
                    (
                        "password".to_string(),
                        Dynamic::String("AccTestvdSC4daf986!".to_string()),
                    ),
                    (
                        "ssh_keys".to_string(),
                        Dynamic::List(vec![Dynamic::String("ssh-rsa AAAAB3Nz...".to_string())]),
                    ),
                ]))]),
            )]))],
        )
        .unwrap();

    let response = resource
        .validate(Context::new(), ValidateResourceRequest { config })
        .await;

    assert_eq!(response.diagnostics.errors.len(), 1);
    assert!(response.diagnostics.errors[0]
        .summary
        .contains("cannot both be set"));
}

#[tokio::test]
async fn hadoop_import_passes_the_id_through() {
    let resource = HadoopClusterResource::new(test_clients("http://localhost:1".to_string()));

    let id = format!(
        "/subscriptions/{}/resourceGroups/rg1/providers/Microsoft.HDInsight/clusters/acctesthdi",
        SUBSCRIPTION
    );
    let response = resource
        .import(Context::new(), ImportResourceRequest { id: id.clone() })
        .await;

    assert!(response.diagnostics.errors.is_empty());
    assert_eq!(
        response.state.get_string(&AttributePath::new("id")).unwrap(),
        id
    );
}

#[tokio::test]
async fn hadoop_import_rejects_malformed_ids() {
    let resource = HadoopClusterResource::new(test_clients("http://localhost:1".to_string()));

    let response = resource
        .import(
            Context::new(),
            ImportResourceRequest {
                id: "not-a-resource-id".to_string(),
            },
        )
        .await;

    assert!(!response.diagnostics.errors.is_empty());
}

#[tokio::test]
async fn data_source_reads_cluster_details() {
    let mut server = Server::new_async().await;
    let cluster_path = format!(
        "/subscriptions/{}/resourceGroups/rg1/providers/Microsoft.HDInsight/clusters/acctesthdi",
        SUBSCRIPTION
    );

    let _mock = server
        .mock("GET", cluster_path.as_str())
        .match_query(Matcher::Any)
        .with_body(
            r#"{
                "name": "acctesthdi",
                "location": "West Europe",
                "tags": {"env": "test"},
                "properties": {
                    "clusterVersion": "3.6.1000.67",
                    "tier": "Standard",
                    "minSupportedTlsVersion": "1.2",
                    "clusterDefinition": {"kind": "Hadoop", "componentVersion": {"hadoop": "2.7"}},
                    "connectivityEndpoints": [
                        {"name": "HTTPS", "protocol": "TCP", "location": "acctesthdi.azurehdinsight.net", "port": 443}
                    ]
                }
            }"#,
        )
        .create_async()
        .await;
    let _mock = server
        .mock("POST", format!("{}/configurations", cluster_path).as_str())
        .match_query(Matcher::Any)
        .with_body(
            r#"{"configurations": {"gateway": {"restAuthCredential.isEnabled": "true", "restAuthCredential.username": "acctestuser", "restAuthCredential.password": "TerrAform123!"}}}"#,
        )
        .create_async()
        .await;

    let data_source = HdinsightClusterDataSource::new(test_clients(server.url()));

    let mut config = DynamicValue::empty_object();
    config
        .set_string(&AttributePath::new("name"), "acctesthdi".to_string())
        .unwrap();
    config
        .set_string(&AttributePath::new("resource_group_name"), "rg1".to_string())
        .unwrap();

    let response = data_source
        .read(Context::new(), ReadDataSourceRequest { config })
        .await;

    assert!(
        response.diagnostics.errors.is_empty(),
        "unexpected errors: {:?}",
        response.diagnostics.errors
    );

    let state = response.state;
    assert_eq!(state.get_string(&AttributePath::new("kind")).unwrap(), "Hadoop");
    assert_eq!(state.get_string(&AttributePath::new("tier")).unwrap(), "Standard");
    assert_eq!(
        state.get_string(&AttributePath::new("location")).unwrap(),
        "westeurope"
    );
    assert_eq!(
        state
            .get_string(&AttributePath::new("https_endpoint"))
            .unwrap(),
        "acctesthdi.azurehdinsight.net"
    );
    assert_eq!(
        state
            .get_string(&AttributePath::new("gateway").index(0).attribute("username"))
            .unwrap(),
        "acctestuser"
    );
}

#[tokio::test]
async fn data_source_errors_when_cluster_is_missing() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", Matcher::Any)
        .with_status(404)
        .with_body(r#"{"error":{"code":"ResourceNotFound"}}"#)
        .create_async()
        .await;

    let data_source = HdinsightClusterDataSource::new(test_clients(server.url()));

    let mut config = DynamicValue::empty_object();
    config
        .set_string(&AttributePath::new("name"), "missing".to_string())
        .unwrap();
    config
        .set_string(&AttributePath::new("resource_group_name"), "rg1".to_string())
        .unwrap();

    let response = data_source
        .read(Context::new(), ReadDataSourceRequest { config })
        .await;

    assert!(!response.diagnostics.errors.is_empty());
    assert!(response.diagnostics.errors[0].summary.contains("was not found"));
}
