//! Azure Key Vault settings loader
//!
//! Authenticates to a vault with a service principal, lists every secret it
//! holds, fetches each current value and exposes the results as a read-only
//! [`KeyVaultSettings`] map keyed by attribute-safe names (`foo-bar` becomes
//! `foo_bar`).
//!
//! # Loading settings
//!
//! ```ignore
//! use kvsettings::{AzureKeyVault, KeyVaultSettings, SettingsSource};
//!
//! let source = SettingsSource::file("../_private/keyvault-cft-vault.json");
//! let settings = KeyVaultSettings::load(&source, AzureKeyVault::new()?).await?;
//!
//! if let Some(url) = settings.get("database_url") {
//!     connect(url);
//! }
//! println!("{settings}");
//! ```
//!
//! Vault failures never abort a load: an unreadable listing produces an empty
//! settings object and an unreadable secret produces an empty string. Use the
//! `try_*` operations on [`SettingsLoader`] when the failure itself matters.

mod auth;
pub mod backends;
mod loader;
mod settings;
mod types;

pub use auth::{AUTH_FIELDS, AuthConfig, DEFAULT_SETTINGS_FILE, SettingsSource};
pub use backends::AzureKeyVault;
pub use loader::SettingsLoader;
pub use settings::KeyVaultSettings;
pub use types::{SecretRecord, SecureSecret, normalize_name, secret_name_from_id};

use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;

/// Configuration errors raised while building a loader
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The keyword set matches neither recognized source shape
    #[error(
        "Invalid settings source [{keys}]: expected `filename` or exactly `client_id`, `app_secret`, `tenant_id`, `key_vault_uri`"
    )]
    InvalidSource {
        /// Sorted, comma separated keywords that were supplied
        keys: String,
    },

    /// Credentials file could not be read
    #[error("Failed to read credentials file '{}': {source}", path.display())]
    ReadFile {
        /// Path that was read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Credentials file is not valid JSON or lacks a required field
    #[error("Invalid credentials file '{}': {source}", path.display())]
    ParseFile {
        /// Path that was parsed
        path: PathBuf,
        /// Underlying JSON error
        #[source]
        source: serde_json::Error,
    },
}

/// Coarse classification of a [`VaultError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VaultErrorKind {
    /// The secret or vault does not exist (HTTP 404)
    NotFound,
    /// The principal lacks permission (HTTP 401/403)
    AccessDenied,
    /// Token acquisition failed
    Authentication,
    /// The request never produced a response
    Transport,
    /// The service answered with a body that could not be understood
    InvalidResponse,
    /// Any other non-success status
    Service,
}

/// Errors from a single vault operation
#[derive(Debug, Clone, Error)]
pub enum VaultError {
    /// Token acquisition for the service principal failed
    #[error("Failed to authenticate to tenant '{tenant_id}': {message}")]
    Authentication {
        /// Tenant the token was requested from
        tenant_id: String,
        /// Error message from the identity provider
        message: String,
    },

    /// The HTTP request failed before a response arrived
    #[error("Request to {url} failed: {message}")]
    Transport {
        /// Requested URL
        url: String,
        /// Error message from the HTTP client
        message: String,
    },

    /// The vault answered with a non-success status
    #[error("Vault returned HTTP {status} for {url}: {message}")]
    Status {
        /// Requested URL
        url: String,
        /// HTTP status code
        status: u16,
        /// Error message from the vault, or the status reason
        message: String,
    },

    /// The secret name cannot exist in a Key Vault
    #[error("Invalid secret name '{name}': only ASCII letters, digits and '-' are allowed")]
    InvalidName {
        /// Rejected name
        name: String,
    },

    /// The vault answered with an unexpected body
    #[error("Unexpected response from {url}: {message}")]
    InvalidResponse {
        /// Requested URL
        url: String,
        /// Decoding error
        message: String,
    },
}

impl VaultError {
    /// Classify this error
    #[must_use]
    pub const fn kind(&self) -> VaultErrorKind {
        match self {
            Self::Authentication { .. } => VaultErrorKind::Authentication,
            Self::Transport { .. } => VaultErrorKind::Transport,
            Self::InvalidResponse { .. } => VaultErrorKind::InvalidResponse,
            Self::InvalidName { .. } => VaultErrorKind::NotFound,
            Self::Status { status: 404, .. } => VaultErrorKind::NotFound,
            Self::Status {
                status: 401 | 403, ..
            } => VaultErrorKind::AccessDenied,
            Self::Status { .. } => VaultErrorKind::Service,
        }
    }
}

/// A secret store that can be opened with an [`AuthConfig`].
///
/// Every call to [`connect`](VaultBackend::connect) authenticates afresh and
/// returns an independent session; the loader never reuses one session across
/// operations.
#[async_trait]
pub trait VaultBackend: Send + Sync {
    /// Authenticate and open a new session against `auth.vault_uri()`.
    async fn connect(&self, auth: &AuthConfig) -> Result<Box<dyn VaultSession>, VaultError>;

    /// Provider identifier used in log fields.
    fn provider_name(&self) -> &'static str;
}

/// An authenticated client for one vault
#[async_trait]
pub trait VaultSession: Send + Sync {
    /// List the identifiers of every secret in the vault.
    ///
    /// Identifiers are path-like (`https://name.vault.azure.net/secrets/foo-bar`);
    /// the trailing segment is the secret name.
    async fn list_secret_ids(&self) -> Result<Vec<String>, VaultError>;

    /// Fetch the current value of the secret called `name`.
    async fn get_secret(&self, name: &str) -> Result<String, VaultError>;
}
