//! Vault credentials and where they come from

use crate::SettingsError;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Relative path of the private credentials file used when none is given.
pub const DEFAULT_SETTINGS_FILE: &str = "../_private/keyvault-cft-vault.json";

/// Field names of the credential bundle, as spelled in the credentials file.
///
/// These are never exposed as settings.
pub const AUTH_FIELDS: [&str; 4] = ["client_id", "app_secret", "tenant_id", "key_vault_uri"];

const FILENAME_KEY: &str = "filename";
const VAULT_URI_ALIAS: &str = "vault_uri";

/// Service principal credentials for one vault.
///
/// Immutable once constructed. The app secret is redacted from `Debug`.
#[derive(Clone)]
pub struct AuthConfig {
    client_id: String,
    app_secret: SecretString,
    tenant_id: String,
    vault_uri: String,
}

impl AuthConfig {
    /// Create credentials from explicit values
    #[must_use]
    pub fn new(
        client_id: impl Into<String>,
        app_secret: impl Into<String>,
        tenant_id: impl Into<String>,
        vault_uri: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            app_secret: SecretString::from(app_secret.into()),
            tenant_id: tenant_id.into(),
            vault_uri: vault_uri.into(),
        }
    }

    /// Read credentials from a JSON file holding
    /// `client_id`, `app_secret`, `tenant_id` and `key_vault_uri`.
    ///
    /// Other keys in the file are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::ReadFile`] if the file cannot be read and
    /// [`SettingsError::ParseFile`] if it is not JSON or lacks a field.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| SettingsError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;

        let file: CredentialsFile =
            serde_json::from_str(&contents).map_err(|source| SettingsError::ParseFile {
                path: path.to_path_buf(),
                source,
            })?;

        tracing::debug!(path = %path.display(), "Loaded vault credentials file");
        Ok(file.into())
    }

    /// Azure AD application (client) ID
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Application secret
    #[must_use]
    pub const fn app_secret(&self) -> &SecretString {
        &self.app_secret
    }

    /// Azure AD tenant ID
    #[must_use]
    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    /// Vault base URI, e.g. `https://name.vault.azure.net/`
    #[must_use]
    pub fn vault_uri(&self) -> &str {
        &self.vault_uri
    }
}

impl PartialEq for AuthConfig {
    fn eq(&self, other: &Self) -> bool {
        self.client_id == other.client_id
            && self.tenant_id == other.tenant_id
            && self.vault_uri == other.vault_uri
            && self.app_secret.expose_secret() == other.app_secret.expose_secret()
    }
}

impl Eq for AuthConfig {}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("client_id", &self.client_id)
            .field("app_secret", &"[REDACTED]")
            .field("tenant_id", &self.tenant_id)
            .field("vault_uri", &self.vault_uri)
            .finish()
    }
}

/// On-disk shape of the credentials file
#[derive(Deserialize)]
struct CredentialsFile {
    client_id: String,
    app_secret: String,
    tenant_id: String,
    key_vault_uri: String,
}

impl From<CredentialsFile> for AuthConfig {
    fn from(file: CredentialsFile) -> Self {
        Self::new(
            file.client_id,
            file.app_secret,
            file.tenant_id,
            file.key_vault_uri,
        )
    }
}

/// Where the loader takes its credentials from.
///
/// The two shapes are mutually exclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingsSource {
    /// A JSON credentials file
    File(PathBuf),
    /// Credentials given directly
    Explicit(AuthConfig),
}

impl SettingsSource {
    /// Credentials from a JSON file
    ///
    /// The given path is read as is; [`DEFAULT_SETTINGS_FILE`] is only a
    /// default for callers that have no path of their own.
    #[must_use]
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::File(path.into())
    }

    /// Credentials given directly
    #[must_use]
    pub fn explicit(
        client_id: impl Into<String>,
        app_secret: impl Into<String>,
        tenant_id: impl Into<String>,
        vault_uri: impl Into<String>,
    ) -> Self {
        Self::Explicit(AuthConfig::new(client_id, app_secret, tenant_id, vault_uri))
    }

    /// Build a source from a keyword set.
    ///
    /// Accepts exactly `{filename}` or exactly
    /// `{client_id, app_secret, tenant_id, key_vault_uri}` (`vault_uri` is
    /// accepted in place of `key_vault_uri`). A repeated keyword keeps its
    /// last value.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::InvalidSource`] for any other keyword set,
    /// including missing or extra keywords.
    pub fn from_keywords<I, K, V>(keywords: I) -> Result<Self, SettingsError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut keywords: BTreeMap<String, String> = keywords
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();

        let invalid = |keywords: &BTreeMap<String, String>| SettingsError::InvalidSource {
            keys: keywords.keys().cloned().collect::<Vec<_>>().join(", "),
        };

        if keywords.len() == 1 {
            return keywords
                .remove(FILENAME_KEY)
                .map(|path| Self::File(PathBuf::from(path)))
                .ok_or_else(|| invalid(&keywords));
        }

        if keywords.len() != AUTH_FIELDS.len() {
            return Err(invalid(&keywords));
        }

        let uri_key = if keywords.contains_key(VAULT_URI_ALIAS) {
            VAULT_URI_ALIAS
        } else {
            AUTH_FIELDS[3]
        };
        let expected = [AUTH_FIELDS[0], AUTH_FIELDS[1], AUTH_FIELDS[2], uri_key];
        if !expected.iter().all(|key| keywords.contains_key(*key)) {
            return Err(invalid(&keywords));
        }

        let mut take = |key: &str| keywords.remove(key).unwrap_or_default();
        let client_id = take(AUTH_FIELDS[0]);
        let app_secret = take(AUTH_FIELDS[1]);
        let tenant_id = take(AUTH_FIELDS[2]);
        let vault_uri = take(uri_key);

        Ok(Self::explicit(client_id, app_secret, tenant_id, vault_uri))
    }

    /// Produce the credentials, reading the file if needed.
    ///
    /// # Errors
    ///
    /// Propagates file read and parse errors from [`AuthConfig::from_file`].
    pub fn resolve(&self) -> Result<AuthConfig, SettingsError> {
        match self {
            Self::File(path) => AuthConfig::from_file(path),
            Self::Explicit(auth) => Ok(auth.clone()),
        }
    }
}
