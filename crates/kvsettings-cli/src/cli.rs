use clap::{Args, Parser, Subcommand};
use kvsettings::backends::DEFAULT_AUTHORITY_HOST;
use kvsettings::{DEFAULT_SETTINGS_FILE, SettingsError, SettingsSource};
use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Requested setting was not loaded
pub const EXIT_MISSING: i32 = 1;
/// Credential source or configuration error
pub const EXIT_CONFIG: i32 = 2;
/// Output or other unexpected error
pub const EXIT_OTHER: i32 = 3;

/// CLI-specific error types with exit code mapping
#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    /// Credentials could not be assembled (exit code 2)
    #[error(transparent)]
    #[diagnostic(
        code(kvsettings::cli::config),
        help(
            "Pass either --file PATH or all of --client-id, --app-secret, --tenant-id and --vault-uri"
        )
    )]
    Config(#[from] SettingsError),

    /// The vault backend could not be created (exit code 3)
    #[error("Failed to initialize vault client: {0}")]
    #[diagnostic(code(kvsettings::cli::backend))]
    Backend(#[from] kvsettings::VaultError),

    /// `get` named a setting that is not in the vault (exit code 1)
    #[error("No setting named '{name}' in {vault_uri}")]
    #[diagnostic(
        code(kvsettings::cli::missing_setting),
        help("Setting names use underscores in place of hyphens; run `kvsettings show` to list them")
    )]
    MissingSetting {
        /// Requested name
        name: String,
        /// Vault that was loaded
        vault_uri: String,
    },

    /// Writing to stdout failed (exit code 3)
    #[error("Failed to write output: {0}")]
    #[diagnostic(code(kvsettings::cli::output))]
    Output(#[from] std::io::Error),
}

impl CliError {
    /// Process exit code for this error
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => EXIT_CONFIG,
            Self::MissingSetting { .. } => EXIT_MISSING,
            Self::Backend(_) | Self::Output(_) => EXIT_OTHER,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "kvsettings")]
#[command(about = "Load every secret in an Azure Key Vault as a settings object")]
#[command(long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[command(flatten)]
    pub credentials: CredentialArgs,

    #[arg(
        long,
        env = "KVSETTINGS_AUTHORITY_HOST",
        global = true,
        help = "Azure AD authority used to request tokens",
        default_value = DEFAULT_AUTHORITY_HOST
    )]
    pub authority_host: String,

    #[arg(
        short = 'l',
        long,
        global = true,
        help = "Set logging level",
        default_value = "warn",
        value_enum
    )]
    pub level: crate::tracing::LogLevel,

    #[arg(long, global = true, help = "Output logs in JSON format")]
    pub json: bool,
}

/// Where credentials come from: a file, or all four values
#[derive(Args, Debug, Default)]
pub struct CredentialArgs {
    #[arg(
        short = 'f',
        long,
        global = true,
        env = "KVSETTINGS_FILE",
        help = "JSON credentials file [default: ../_private/keyvault-cft-vault.json]"
    )]
    pub file: Option<PathBuf>,

    #[arg(long, global = true, env = "KVSETTINGS_CLIENT_ID", help = "Azure AD application (client) ID")]
    pub client_id: Option<String>,

    #[arg(
        long,
        global = true,
        env = "KVSETTINGS_APP_SECRET",
        hide_env_values = true,
        help = "Azure AD application secret"
    )]
    pub app_secret: Option<String>,

    #[arg(long, global = true, env = "KVSETTINGS_TENANT_ID", help = "Azure AD tenant ID")]
    pub tenant_id: Option<String>,

    #[arg(long, global = true, env = "KVSETTINGS_VAULT_URI", help = "Key Vault URI")]
    pub vault_uri: Option<String>,
}

impl CredentialArgs {
    /// Build the settings source from whichever arguments were given.
    ///
    /// With no arguments at all the default credentials file is used. Any
    /// other combination must match one source shape exactly.
    pub fn source(&self) -> Result<SettingsSource, SettingsError> {
        let mut keywords = Vec::new();
        if let Some(file) = &self.file {
            keywords.push(("filename", file.to_string_lossy().into_owned()));
        }
        let credentials = [
            ("client_id", &self.client_id),
            ("app_secret", &self.app_secret),
            ("tenant_id", &self.tenant_id),
            ("key_vault_uri", &self.vault_uri),
        ];
        for (key, value) in credentials {
            if let Some(value) = value {
                keywords.push((key, value.clone()));
            }
        }

        if keywords.is_empty() {
            return Ok(SettingsSource::file(DEFAULT_SETTINGS_FILE));
        }
        SettingsSource::from_keywords(keywords)
    }
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    #[command(about = "Print the vault URI and the sorted setting names (default)")]
    Show,
    #[command(about = "Print the value of one setting")]
    Get {
        #[arg(help = "Setting name, with underscores in place of hyphens")]
        name: String,
    },
}
