//! ExifTool Supervisor - run batches against a resident exiftool.

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use exiftool_supervisor::config::{ConfigError, SettingsLoader};
use exiftool_supervisor::{ExifTool, ExifToolBuilder, ExifToolError, Metadata, TracingLogger};

#[derive(Parser)]
#[command(
    name = "exiftool-supervisor",
    about = "Drive a resident exiftool in stay-open batch mode",
    version
)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// exiftool executable name or path.
    #[arg(long, global = true)]
    executable: Option<String>,

    /// exiftool `-config` file; pass an empty string to skip the default config.
    #[arg(long, global = true)]
    config_file: Option<PathBuf>,

    /// Replace the common args (repeatable).
    #[arg(long = "common-arg", global = true, allow_hyphen_values = true)]
    common_args: Vec<String>,

    /// Settings file to load instead of the default search paths.
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one batch and print its raw output.
    Exec {
        /// Parameters passed to exiftool, one per line.
        #[arg(trailing_var_arg = true, allow_hyphen_values = true, required = true)]
        params: Vec<String>,
    },
    /// Run one batch with `-j` and pretty-print the parsed JSON.
    Json {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true, required = true)]
        params: Vec<String>,
    },
    /// Print the exiftool version.
    Version,
    /// Print selected tags (or all metadata) for files.
    Meta {
        /// Files to read.
        #[arg(required = true)]
        files: Vec<String>,
        /// Tag to read (repeatable); all tags when omitted.
        #[arg(short, long = "tag")]
        tags: Vec<String>,
    },
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    ExifTool(#[from] ExifToolError),
    #[error("Failed to write output: {0}")]
    Output(#[from] std::io::Error),
    #[error("Failed to encode JSON: {0}")]
    Json(#[from] serde_json::Error),
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn build_tool(cli: &Cli) -> Result<ExifTool, CliError> {
    let loader = match &cli.settings {
        Some(path) => SettingsLoader::with_path(path.clone()),
        None => SettingsLoader::new(),
    };
    let settings = loader.load()?;

    let mut builder = ExifToolBuilder::from_settings(&settings).logger(TracingLogger);
    if let Some(executable) = &cli.executable {
        builder = builder.executable(executable);
    }
    if let Some(config_file) = &cli.config_file {
        builder = builder.config_file(config_file);
    }
    if !cli.common_args.is_empty() {
        builder = builder.common_args(cli.common_args.clone());
    }
    Ok(builder.build()?)
}

async fn dispatch(tool: &mut ExifTool, command: Commands) -> Result<u8, CliError> {
    match command {
        Commands::Exec { params } => {
            let result = tool.run(params).await?;
            std::io::stdout().lock().write_all(&result.stdout)?;
            std::io::stderr().lock().write_all(&result.stderr)?;
            Ok(u8::try_from(result.status).unwrap_or(1))
        }
        Commands::Json { params } => {
            let records = tool.execute_json(params).await?;
            print_json(&records)?;
            Ok(0)
        }
        Commands::Version => {
            writeln!(std::io::stdout().lock(), "{}", tool.version()?)?;
            Ok(0)
        }
        Commands::Meta { files, tags } => {
            let tags: Vec<&str> = tags.iter().map(String::as_str).collect();
            let records = tool.get_tags(files, &tags, &[]).await?;
            print_json(&records)?;
            Ok(0)
        }
    }
}

fn print_json(records: &[Metadata]) -> Result<(), CliError> {
    let mut out = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut out, records)?;
    writeln!(out)?;
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut tool = match build_tool(&cli) {
        Ok(tool) => tool,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = tool.start().await {
        eprintln!("Error: {e}");
        return ExitCode::FAILURE;
    }

    let outcome = dispatch(&mut tool, cli.command).await;

    if let Err(e) = tool.terminate().await {
        tracing::warn!(error = %e, "Failed to terminate exiftool cleanly");
    }

    match outcome {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
