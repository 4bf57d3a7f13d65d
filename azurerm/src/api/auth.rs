//! Azure Active Directory authentication
//!
//! ARM requests carry a bearer token obtained through the AAD
//! client-credentials grant. Tokens are cached and refreshed shortly before
//! expiry. Tests use [`Credential::Static`] to bypass AAD entirely.

use super::error::ApiError;
use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

const DEFAULT_AUTHORITY: &str = "https://login.microsoftonline.com";

// refresh this long before the token actually expires
const EXPIRY_MARGIN: Duration = Duration::from_secs(5 * 60);

#[derive(Clone)]
pub enum Credential {
    /// Service principal client-credentials flow.
    ClientSecret(Arc<ClientSecretCredential>),
    /// Fixed token, no refresh. Test use only.
    Static(String),
}

impl Credential {
    pub fn client_secret(
        client_id: String,
        client_secret: String,
        tenant_id: String,
        resource: String,
    ) -> Self {
        Credential::ClientSecret(Arc::new(ClientSecretCredential {
            client_id,
            client_secret,
            tenant_id,
            resource,
            authority: DEFAULT_AUTHORITY.to_string(),
            http: reqwest::Client::new(),
            cached: RwLock::new(None),
        }))
    }

    pub async fn token(&self) -> Result<String, ApiError> {
        match self {
            Credential::Static(token) => Ok(token.clone()),
            Credential::ClientSecret(cred) => cred.token().await,
        }
    }
}

pub struct ClientSecretCredential {
    client_id: String,
    client_secret: String,
    tenant_id: String,
    /// Audience for the token, e.g. `https://management.azure.com/`
    resource: String,
    authority: String,
    http: reqwest::Client,
    cached: RwLock<Option<CachedToken>>,
}

struct CachedToken {
    token: String,
    expires_at: Instant,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

impl ClientSecretCredential {
    async fn token(&self) -> Result<String, ApiError> {
        {
            let cached = self.cached.read().await;
            if let Some(entry) = cached.as_ref() {
                if entry.expires_at > Instant::now() + EXPIRY_MARGIN {
                    return Ok(entry.token.clone());
                }
            }
        }

        let url = format!("{}/{}/oauth2/token", self.authority, self.tenant_id);
        tracing::debug!(tenant_id = %self.tenant_id, "requesting AAD token");

        let response = self
            .http
            .post(&url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", &self.client_id),
                ("client_secret", &self.client_secret),
                ("resource", &self.resource),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Auth(format!(
                "token endpoint returned {}: {}",
                status, body
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| ApiError::Auth(format!("failed to decode token response: {}", e)))?;

        let mut cached = self.cached.write().await;
        *cached = Some(CachedToken {
            token: token.access_token.clone(),
            expires_at: Instant::now() + Duration::from_secs(token.expires_in),
        });

        Ok(token.access_token)
    }
}
