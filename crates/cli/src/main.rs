use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use catalog_app::modules::books::models::BookInput;
use catalog_kernel::settings::Settings;
use clap::{Parser, Subcommand};

/// Operator tool for the book catalog service
#[derive(Debug, Parser)]
#[command(name = "catalog", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP server
    Serve {
        /// Override the configured bind host
        #[arg(long)]
        host: Option<String>,
        /// Override the configured port
        #[arg(long)]
        port: Option<u16>,
    },
    /// Print the effective settings as JSON
    Config,
    /// Check a JSON book payload against the catalog's field rules
    Validate {
        /// File holding the payload, or `-` for stdin
        file: PathBuf,
    },
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    match cli.command {
        Command::Serve { host, port } => {
            let mut settings = load_settings()?;
            if let Some(host) = host {
                settings.server.host = host;
            }
            if let Some(port) = port {
                settings.server.port = port;
            }
            catalog_telemetry::init(&settings.telemetry)?;

            let runtime = tokio::runtime::Runtime::new().context("failed to start tokio runtime")?;
            runtime.block_on(catalog_app::run(settings))?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Config => {
            let settings = load_settings()?;
            let rendered =
                serde_json::to_string_pretty(&settings).context("failed to render settings")?;
            println!("{rendered}");
            Ok(ExitCode::SUCCESS)
        }
        Command::Validate { file } => {
            let raw = read_payload(&file)?;
            let input: BookInput = serde_json::from_str(&raw)
                .with_context(|| format!("{} is not a JSON book payload", file.display()))?;

            let violations = input.validate();
            if violations.is_empty() {
                println!("valid");
                Ok(ExitCode::SUCCESS)
            } else {
                for violation in &violations {
                    println!("{violation}");
                }
                tracing::debug!(count = violations.len(), "payload rejected");
                Ok(ExitCode::FAILURE)
            }
        }
    }
}

fn load_settings() -> anyhow::Result<Settings> {
    Settings::load().with_context(|| "failed to load catalog settings")
}

fn read_payload(file: &Path) -> anyhow::Result<String> {
    if file.as_os_str() == "-" {
        let mut raw = String::new();
        std::io::stdin()
            .read_to_string(&mut raw)
            .context("failed to read payload from stdin")?;
        return Ok(raw);
    }
    std::fs::read_to_string(file).with_context(|| format!("failed to read {}", file.display()))
}
