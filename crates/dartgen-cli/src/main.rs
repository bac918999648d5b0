//! dartgen CLI entrypoint
//! Parses command-line arguments and dispatches to the core generator.

// Internal imports (std, crate)
use std::path::PathBuf;

// External imports (alphabetized)
use anyhow::{Context, bail};
use clap::{ArgAction, Parser};
use dartgen_core::{Config, EnvelopeKey, GenerationReport};
use tracing_subscriber::EnvFilter;

const USAGE_HINT: &str = "Usage: dartgen generate --input_path=<dir> \
[--apis=get_v1/users,post_v1/users] [--replace=true|false] [--output_path=<dir>] \
[--wrapped_by=data|results|result] [--config=<file.yaml|file.toml>] [--template_dir=<dir>]";

#[derive(Parser)]
#[command(name = "dartgen")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Generate Dart models, enums and API methods from an OpenAPI document
    Generate {
        /// Directory containing the OpenAPI JSON document
        #[arg(long = "input_path")]
        input_path: Option<PathBuf>,
        /// Comma-separated `{method}_{path}` keys to generate (default: all)
        ///
        /// Example: --apis=get_v1/users,post_v1/users
        #[arg(long = "apis", value_delimiter = ',')]
        apis: Vec<String>,
        /// Replace previously generated methods instead of appending
        #[arg(long, action = ArgAction::Set, num_args = 0..=1, default_missing_value = "true")]
        replace: Option<bool>,
        /// Write every generated file under this root instead of the project
        #[arg(long = "output_path")]
        output_path: Option<PathBuf>,
        /// Envelope key the API nests payloads under
        #[arg(long = "wrapped_by", value_enum)]
        wrapped_by: Option<EnvelopeKey>,
        /// YAML or TOML file with project layout overrides
        #[arg(long)]
        config: Option<PathBuf>,
        /// Directory with template overrides
        /// (model.dart.tera, enum.dart.tera, api_method.dart.tera)
        #[arg(long = "template_dir")]
        template_dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        eprintln!("Error: {err:#}");
        eprintln!("{USAGE_HINT}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Generate {
            input_path,
            apis,
            replace,
            output_path,
            wrapped_by,
            config,
            template_dir,
        } => {
            let mut resolved = match &config {
                Some(path) => Config::from_file(path)
                    .await
                    .with_context(|| format!("Failed to load config {}", path.display()))?,
                None => Config::default(),
            };

            // CLI flags take precedence over the config file
            if let Some(input_path) = input_path {
                resolved.input_path = input_path;
            }
            if resolved.input_path.as_os_str().is_empty() {
                bail!("--input_path is required");
            }
            if !apis.is_empty() {
                resolved.apis = apis
                    .into_iter()
                    .map(|api| api.trim().to_string())
                    .filter(|api| !api.is_empty())
                    .collect();
            }
            if let Some(replace) = replace {
                resolved.replace = replace;
            }
            if output_path.is_some() {
                resolved.output_path = output_path;
            }
            if let Some(wrapped_by) = wrapped_by {
                resolved.wrapped_by = wrapped_by;
            }
            if template_dir.is_some() {
                resolved.template_dir = template_dir;
            }
            tracing::debug!(?resolved, "Resolved configuration");

            let report = dartgen_core::generate(&resolved)
                .await
                .context("Generation failed")?;
            print_report(&report, &resolved);
        }
    }
    Ok(())
}

fn print_report(report: &GenerationReport, config: &Config) {
    println!(
        "Generated {} API method(s) into {}",
        report.methods,
        report.service_file.display()
    );
    println!("  models:         {}", report.models);
    println!("  request models: {}", report.requests);
    println!("  enums:          {}", report.enums);
    println!(
        "Note: every generated method calls {}. Endpoints that do not need authentication \
must be switched to the unauthenticated client by hand.",
        config.layout.api_client
    );
}
