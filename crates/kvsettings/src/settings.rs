//! The loaded, read-only settings object

use crate::{
    AuthConfig, SecretRecord, SecureSecret, SettingsError, SettingsLoader, SettingsSource,
    VaultBackend,
};
use std::collections::BTreeMap;

/// Every secret of one vault, keyed by attribute-safe name.
///
/// Built once by [`KeyVaultSettings::load`] and read-only afterwards. The
/// credentials used to load it are retained but never appear among the
/// settings, in `Debug` output, or in the `Display` summary.
///
/// # Example
///
/// ```ignore
/// let settings = KeyVaultSettings::load(&source, AzureKeyVault::new()?).await?;
/// let conn = settings.get("db_connection_string").unwrap_or_default();
/// ```
#[derive(Clone)]
pub struct KeyVaultSettings {
    auth: AuthConfig,
    values: BTreeMap<String, SecureSecret>,
}

impl KeyVaultSettings {
    /// Resolve credentials from `source`, then list and fetch every secret.
    ///
    /// Vault failures do not fail the load; see [`SettingsLoader::load`].
    ///
    /// # Errors
    ///
    /// Returns a [`SettingsError`] if the credentials cannot be resolved.
    pub async fn load<B: VaultBackend>(
        source: &SettingsSource,
        backend: B,
    ) -> Result<Self, SettingsError> {
        Ok(SettingsLoader::new(source, backend)?.load().await)
    }

    /// Assemble settings from already loaded records.
    ///
    /// A record whose normalized name repeats an earlier one replaces it.
    #[must_use]
    pub fn from_records(auth: AuthConfig, records: impl IntoIterator<Item = SecretRecord>) -> Self {
        let values = records
            .into_iter()
            .map(|record| (record.name, record.value))
            .collect();
        Self { auth, values }
    }

    /// Value of the setting `name` (underscore form)
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(SecureSecret::expose)
    }

    /// The setting `name` as a [`SecureSecret`]
    #[must_use]
    pub fn get_secret(&self, name: &str) -> Option<&SecureSecret> {
        self.values.get(name)
    }

    /// Whether a setting called `name` was loaded
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Setting names in sorted order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Settings in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &SecureSecret)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of settings
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no settings were loaded
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// URI of the vault the settings came from
    #[must_use]
    pub fn vault_uri(&self) -> &str {
        self.auth.vault_uri()
    }

    /// Credentials the settings were loaded with
    #[must_use]
    pub const fn auth(&self) -> &AuthConfig {
        &self.auth
    }
}

impl std::fmt::Display for KeyVaultSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "KeyVaultSettings {} settings: ", self.vault_uri())?;
        for (i, name) in self.names().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(name)?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for KeyVaultSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyVaultSettings")
            .field("vault_uri", &self.vault_uri())
            .field("count", &self.values.len())
            .field("names", &self.values.keys().collect::<Vec<_>>())
            .finish()
    }
}
