//! Azure Key Vault backend using the REST API
//!
//! A session is one client-credentials token from Azure AD plus the vault's
//! base URI. Listing follows `nextLink` pages until the service stops
//! returning one.

use crate::{AuthConfig, VaultBackend, VaultError, VaultSession};
use async_trait::async_trait;
use reqwest::{Client, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

/// Azure AD authority used to issue tokens.
pub const DEFAULT_AUTHORITY_HOST: &str = "https://login.microsoftonline.com";

/// OAuth2 scope granting access to Key Vault data.
pub const KEY_VAULT_SCOPE: &str = "https://vault.azure.net/.default";

/// Key Vault REST API version.
pub const API_VERSION: &str = "7.4";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SecretListResponse {
    #[serde(default)]
    value: Vec<SecretItem>,
    #[serde(rename = "nextLink", default)]
    next_link: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SecretItem {
    id: String,
}

#[derive(Debug, Deserialize)]
struct SecretBundle {
    #[serde(default)]
    value: Option<String>,
}

#[derive(Debug, Deserialize)]
struct KeyVaultErrorResponse {
    error: KeyVaultErrorDetail,
}

#[derive(Debug, Deserialize)]
struct KeyVaultErrorDetail {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Azure Key Vault backend.
///
/// Each [`connect`](VaultBackend::connect) requests a new token with the
/// service principal's client credentials.
#[derive(Debug, Clone)]
pub struct AzureKeyVault {
    http: Client,
    authority_host: String,
}

impl AzureKeyVault {
    /// Create a backend against the public Azure cloud.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Transport`] if the HTTP client cannot be built
    /// (TLS backend initialization failure).
    pub fn new() -> Result<Self, VaultError> {
        let http = Client::builder()
            .user_agent(concat!("kvsettings/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| VaultError::Transport {
                url: DEFAULT_AUTHORITY_HOST.to_string(),
                message: format!("Failed to create HTTP client: {e}"),
            })?;

        Ok(Self::with_client(http))
    }

    /// Create a backend around an existing HTTP client.
    #[must_use]
    pub fn with_client(http: Client) -> Self {
        Self {
            http,
            authority_host: DEFAULT_AUTHORITY_HOST.to_string(),
        }
    }

    /// Use a different Azure AD authority (sovereign clouds, local test servers).
    #[must_use]
    pub fn with_authority_host(mut self, host: impl Into<String>) -> Self {
        self.authority_host = host.into();
        self
    }

    /// Azure AD authority tokens are requested from
    #[must_use]
    pub fn authority_host(&self) -> &str {
        &self.authority_host
    }

    fn token_url(&self, tenant_id: &str) -> String {
        format!(
            "{}/{tenant_id}/oauth2/v2.0/token",
            self.authority_host.trim_end_matches('/')
        )
    }

    /// Request an access token for the vault scope
    async fn acquire_token(&self, auth: &AuthConfig) -> Result<SecretString, VaultError> {
        let url = self.token_url(auth.tenant_id());
        tracing::debug!(%url, client_id = auth.client_id(), "Requesting vault access token");

        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", auth.client_id()),
            ("client_secret", auth.app_secret().expose_secret()),
            ("scope", KEY_VAULT_SCOPE),
        ];

        let response = self
            .http
            .post(&url)
            .form(&form)
            .send()
            .await
            .map_err(|e| VaultError::Authentication {
                tenant_id: auth.tenant_id().to_string(),
                message: format!("Token request failed: {e}"),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let message = match response.json::<TokenErrorResponse>().await {
                Ok(body) => match body.error_description {
                    Some(desc) => format!("{}: {desc}", body.error),
                    None => body.error,
                },
                Err(_) => format!("HTTP {status}"),
            };
            return Err(VaultError::Authentication {
                tenant_id: auth.tenant_id().to_string(),
                message,
            });
        }

        let token: TokenResponse =
            response.json().await.map_err(|e| VaultError::Authentication {
                tenant_id: auth.tenant_id().to_string(),
                message: format!("Invalid token response: {e}"),
            })?;

        Ok(SecretString::from(token.access_token))
    }
}

#[async_trait]
impl VaultBackend for AzureKeyVault {
    async fn connect(&self, auth: &AuthConfig) -> Result<Box<dyn VaultSession>, VaultError> {
        let token = self.acquire_token(auth).await?;
        Ok(Box::new(AzureSession {
            http: self.http.clone(),
            vault_uri: auth.vault_uri().trim_end_matches('/').to_string(),
            token,
        }))
    }

    fn provider_name(&self) -> &'static str {
        "azure"
    }
}

/// Key Vault secret names are 1-127 characters of `[0-9A-Za-z-]`
fn is_valid_secret_name(name: &str) -> bool {
    (1..=127).contains(&name.len())
        && name.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-')
}

/// One authenticated Key Vault client
struct AzureSession {
    http: Client,
    vault_uri: String,
    token: SecretString,
}

impl AzureSession {
    async fn get(&self, url: &str) -> Result<Response, VaultError> {
        tracing::debug!(%url, "Vault request");

        let response = self
            .http
            .get(url)
            .bearer_auth(self.token.expose_secret())
            .send()
            .await
            .map_err(|e| VaultError::Transport {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let message = match response.json::<KeyVaultErrorResponse>().await {
            Ok(body) => match (body.error.code, body.error.message) {
                (Some(code), Some(message)) => format!("{code}: {message}"),
                (Some(text), None) | (None, Some(text)) => text,
                (None, None) => status.to_string(),
            },
            Err(_) => status.to_string(),
        };

        Err(VaultError::Status {
            url: url.to_string(),
            status: status.as_u16(),
            message,
        })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, VaultError> {
        self.get(url)
            .await?
            .json()
            .await
            .map_err(|e| VaultError::InvalidResponse {
                url: url.to_string(),
                message: e.to_string(),
            })
    }
}

#[async_trait]
impl VaultSession for AzureSession {
    async fn list_secret_ids(&self) -> Result<Vec<String>, VaultError> {
        let mut ids = Vec::new();
        let mut next = Some(format!(
            "{}/secrets?api-version={API_VERSION}",
            self.vault_uri
        ));

        while let Some(url) = next {
            let page: SecretListResponse = self.get_json(&url).await?;
            ids.extend(page.value.into_iter().map(|item| item.id));
            next = page
                .next_link
                .filter(|link| !link.is_empty() && *link != url);
        }

        Ok(ids)
    }

    async fn get_secret(&self, name: &str) -> Result<String, VaultError> {
        if !is_valid_secret_name(name) {
            return Err(VaultError::InvalidName {
                name: name.to_string(),
            });
        }

        let url = format!(
            "{}/secrets/{name}?api-version={API_VERSION}",
            self.vault_uri
        );
        let bundle: SecretBundle = self.get_json(&url).await?;
        Ok(bundle.value.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_url_default_authority() {
        let backend = AzureKeyVault::with_client(Client::new());
        assert_eq!(
            backend.token_url("tenant-1"),
            "https://login.microsoftonline.com/tenant-1/oauth2/v2.0/token"
        );
    }

    #[test]
    fn test_token_url_custom_authority_trailing_slash() {
        let backend =
            AzureKeyVault::with_client(Client::new()).with_authority_host("http://127.0.0.1:9/");
        assert_eq!(
            backend.token_url("t"),
            "http://127.0.0.1:9/t/oauth2/v2.0/token"
        );
    }

    #[test]
    fn test_list_response_without_next_link() {
        let page: SecretListResponse = serde_json::from_str(
            r#"{"value":[{"id":"https://kv.vault.azure.net/secrets/a","attributes":{"enabled":true}}]}"#,
        )
        .unwrap();
        assert_eq!(page.value.len(), 1);
        assert!(page.next_link.is_none());
    }

    #[test]
    fn test_secret_bundle_without_value() {
        let bundle: SecretBundle = serde_json::from_str(r#"{"id":"x"}"#).unwrap();
        assert!(bundle.value.is_none());
    }

    #[test]
    fn test_secret_name_validation() {
        assert!(is_valid_secret_name("db-url"));
        assert!(is_valid_secret_name("Key2"));
        assert!(!is_valid_secret_name(""));
        assert!(!is_valid_secret_name("a/b"));
        assert!(!is_valid_secret_name("db_url"));
        assert!(!is_valid_secret_name("a?api-version=1"));
        assert!(!is_valid_secret_name("a#b"));
        assert!(!is_valid_secret_name(&"a".repeat(128)));
    }

    #[test]
    fn test_provider_name() {
        let backend = AzureKeyVault::with_client(Client::new());
        assert_eq!(backend.provider_name(), "azure");
    }
}
