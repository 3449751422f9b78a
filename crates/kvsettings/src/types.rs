//! Secret values and naming
//!
//! - [`SecureSecret`]: a `secrecy::SecretString` wrapper that redacts itself in
//!   `Debug`/`Display` and zeroes its memory on drop
//! - [`SecretRecord`]: one loaded secret under its attribute-safe name

use secrecy::{ExposeSecret, SecretString};

/// A secret value with automatic memory zeroing on drop.
///
/// Debug and Display output show `[REDACTED]`; call [`expose`](Self::expose)
/// to read the value.
#[derive(Clone)]
pub struct SecureSecret {
    inner: SecretString,
}

impl SecureSecret {
    /// Move `value` into secure storage.
    #[must_use]
    pub fn new(value: String) -> Self {
        Self {
            inner: SecretString::from(value),
        }
    }

    /// The empty value stored for secrets that could not be fetched.
    #[must_use]
    pub fn empty() -> Self {
        Self::new(String::new())
    }

    /// Expose the secret value for use.
    #[must_use]
    pub fn expose(&self) -> &str {
        self.inner.expose_secret()
    }

    /// Length of the value without exposing it.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.expose_secret().len()
    }

    /// Whether the value is empty (including failed fetches).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.expose_secret().is_empty()
    }
}

impl From<String> for SecureSecret {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl std::fmt::Debug for SecureSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl std::fmt::Display for SecureSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[REDACTED]")
    }
}

/// Short secret name from a vault identifier.
///
/// Identifiers look like `https://name.vault.azure.net/secrets/foo-bar`; the
/// trailing path segment is the name. Trailing slashes are ignored.
#[must_use]
pub fn secret_name_from_id(id: &str) -> &str {
    id.trim_end_matches('/').rsplit('/').next().unwrap_or(id)
}

/// Attribute-safe form of a secret name: hyphens become underscores.
#[must_use]
pub fn normalize_name(name: &str) -> String {
    name.replace('-', "_")
}

/// A loaded secret under its normalized name
#[derive(Debug, Clone)]
pub struct SecretRecord {
    /// Normalized (underscore) name
    pub name: String,
    /// Secret value, empty when the fetch failed
    pub value: SecureSecret,
}

impl SecretRecord {
    /// Build a record from a vault name (`foo-bar`), normalizing it.
    #[must_use]
    pub fn new(vault_name: &str, value: SecureSecret) -> Self {
        Self {
            name: normalize_name(vault_name),
            value,
        }
    }
}
