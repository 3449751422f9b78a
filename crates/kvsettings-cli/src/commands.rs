//! Command execution

use crate::cli::{CliError, Commands};
use kvsettings::{AzureKeyVault, KeyVaultSettings, SettingsSource};
use std::io::Write;

/// Load the vault described by `source` and run `command` against it.
pub async fn execute(
    command: &Commands,
    source: &SettingsSource,
    authority_host: &str,
    out: &mut impl Write,
) -> Result<(), CliError> {
    let backend = AzureKeyVault::new()?.with_authority_host(authority_host);
    let settings = KeyVaultSettings::load(source, backend).await?;
    render(command, &settings, out)
}

/// Write the output of `command` for already loaded settings.
pub fn render(
    command: &Commands,
    settings: &KeyVaultSettings,
    out: &mut impl Write,
) -> Result<(), CliError> {
    match command {
        Commands::Show => writeln!(out, "{settings}")?,
        Commands::Get { name } => {
            let value = settings
                .get(name)
                .ok_or_else(|| CliError::MissingSetting {
                    name: name.clone(),
                    vault_uri: settings.vault_uri().to_string(),
                })?;
            writeln!(out, "{value}")?;
        }
    }
    Ok(())
}
