mod cli;
mod commands;
mod tracing;

use crate::cli::{Cli, CliError, Commands};
use crate::tracing::{TracingConfig, TracingFormat};
use clap::Parser;

#[tokio::main]
#[allow(clippy::print_stderr)]
async fn main() {
    if let Err(error) = run().await {
        let code = error.exit_code();
        eprintln!("{:?}", miette::Report::new(error));
        std::process::exit(code);
    }
}

#[allow(clippy::print_stderr)]
async fn run() -> Result<(), CliError> {
    let cli = Cli::parse();

    let tracing_config = TracingConfig {
        format: if cli.json {
            TracingFormat::Json
        } else {
            TracingFormat::Dev
        },
        level: cli.level.into(),
    };
    if let Err(e) = crate::tracing::init_tracing(tracing_config) {
        eprintln!("{e:?}");
    }

    let source = cli.credentials.source()?;
    let command = cli.command.unwrap_or(Commands::Show);

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    commands::execute(&command, &source, &cli.authority_host, &mut out).await
}
