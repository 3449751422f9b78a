//! Vault backend implementations
//!
//! - [`AzureKeyVault`] - Azure Key Vault over its REST API

mod azure;

pub use azure::{API_VERSION, AzureKeyVault, DEFAULT_AUTHORITY_HOST, KEY_VAULT_SCOPE};
