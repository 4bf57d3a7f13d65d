use azurerm::AzureRmProvider;
use tfplug::ServerConfig;

#[tokio::main]
async fn main() -> tfplug::Result<()> {
    // stdout carries the plugin handshake, so logs go to stderr
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(tracing::Level::INFO)
        .init();

    let mut config = ServerConfig::default();
    if let Ok(cert_path) = std::env::var("TFPLUG_CERT_PATH") {
        config = config.with_cert_path(cert_path.into());
    }
    if let Ok(key_path) = std::env::var("TFPLUG_KEY_PATH") {
        config = config.with_key_path(key_path.into());
    }

    tfplug::serve(AzureRmProvider::new(), config).await
}
