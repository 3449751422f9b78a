//! The two-step retrieval protocol: list secret names, then fetch each value

use crate::{
    AuthConfig, KeyVaultSettings, SecretRecord, SecureSecret, SettingsError, SettingsSource,
    VaultBackend, VaultError, secret_name_from_id,
};
use std::collections::BTreeMap;

/// Loads secrets from one vault with fixed credentials.
///
/// Every operation opens its own authenticated session through the backend.
/// The lenient operations ([`list_secret_names`](Self::list_secret_names),
/// [`fetch_secret`](Self::fetch_secret),
/// [`fetch_all_secrets`](Self::fetch_all_secrets)) never fail: vault errors are
/// logged and replaced by an empty list or an empty string.
#[derive(Debug)]
pub struct SettingsLoader<B> {
    auth: AuthConfig,
    backend: B,
}

impl<B: VaultBackend> SettingsLoader<B> {
    /// Build a loader from a credential source.
    ///
    /// # Errors
    ///
    /// Returns a [`SettingsError`] if the source's credentials file cannot be
    /// read or parsed.
    pub fn new(source: &SettingsSource, backend: B) -> Result<Self, SettingsError> {
        Ok(Self::with_auth(source.resolve()?, backend))
    }

    /// Build a loader from credentials already in hand.
    #[must_use]
    pub const fn with_auth(auth: AuthConfig, backend: B) -> Self {
        Self { auth, backend }
    }

    /// Credentials this loader authenticates with
    #[must_use]
    pub const fn auth(&self) -> &AuthConfig {
        &self.auth
    }

    /// List secret names, surfacing vault errors.
    ///
    /// Names are the trailing segments of the vault identifiers, unnormalized.
    ///
    /// # Errors
    ///
    /// Returns the [`VaultError`] from authentication or listing.
    pub async fn try_list_secret_names(&self) -> Result<Vec<String>, VaultError> {
        let session = self.backend.connect(&self.auth).await?;
        let ids = session.list_secret_ids().await?;
        Ok(ids
            .iter()
            .map(|id| secret_name_from_id(id).to_string())
            .collect())
    }

    /// List secret names; empty when the vault cannot be listed.
    pub async fn list_secret_names(&self) -> Vec<String> {
        match self.try_list_secret_names().await {
            Ok(names) => names,
            Err(e) => {
                tracing::warn!(
                    provider = self.backend.provider_name(),
                    vault = self.auth.vault_uri(),
                    error = %e,
                    "Failed to list vault secrets, continuing with none"
                );
                Vec::new()
            }
        }
    }

    /// Fetch one secret's current value, surfacing vault errors.
    ///
    /// # Errors
    ///
    /// Returns the [`VaultError`] from authentication or the fetch.
    pub async fn try_fetch_secret(&self, name: &str) -> Result<String, VaultError> {
        let session = self.backend.connect(&self.auth).await?;
        session.get_secret(name).await
    }

    /// Fetch one secret's current value; empty string on any vault error.
    pub async fn fetch_secret(&self, name: &str) -> String {
        self.try_fetch_secret(name)
            .await
            .unwrap_or_else(|e| self.swallow(name, &e))
    }

    /// Fetch every named secret in order over a single session.
    ///
    /// Every name appears in the result exactly once. Names whose fetch
    /// failed, or all names if authentication failed, map to an empty value.
    pub async fn fetch_all_secrets<S: AsRef<str>>(
        &self,
        names: &[S],
    ) -> BTreeMap<String, SecureSecret> {
        let mut values = BTreeMap::new();

        let session = match self.backend.connect(&self.auth).await {
            Ok(session) => Some(session),
            Err(e) => {
                tracing::warn!(
                    provider = self.backend.provider_name(),
                    vault = self.auth.vault_uri(),
                    error = %e,
                    "Failed to open vault session, every secret will be empty"
                );
                None
            }
        };

        for name in names {
            let name = name.as_ref();
            let value = match &session {
                Some(session) => session
                    .get_secret(name)
                    .await
                    .unwrap_or_else(|e| self.swallow(name, &e)),
                None => String::new(),
            };
            values.insert(name.to_string(), SecureSecret::new(value));
        }

        values
    }

    /// List and fetch everything, producing the settings object.
    pub async fn load(self) -> KeyVaultSettings {
        let names = self.list_secret_names().await;
        let values = self.fetch_all_secrets(names.as_slice()).await;

        let records = values
            .into_iter()
            .map(|(name, value)| SecretRecord::new(&name, value));
        let settings = KeyVaultSettings::from_records(self.auth, records);

        tracing::info!(
            vault = settings.vault_uri(),
            count = settings.len(),
            empty = settings.iter().filter(|(_, v)| v.is_empty()).count(),
            "Loaded vault settings"
        );
        settings
    }

    fn swallow(&self, name: &str, error: &VaultError) -> String {
        tracing::warn!(
            provider = self.backend.provider_name(),
            secret = name,
            kind = ?error.kind(),
            error = %error,
            "Failed to fetch vault secret, using empty value"
        );
        String::new()
    }
}
