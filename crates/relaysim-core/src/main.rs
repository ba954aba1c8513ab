//! relaysim CLI
//!
//! Run protection-relay test scenarios against the device simulator.
//!
//! ```bash
//! relaysim run basic_activation fault_injection --save
//! relaysim --scenarios-dir ./scenarios list
//! relaysim serve < requests.jsonl
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use relaysim_core::api::{handle_line, ApiState};
use relaysim_core::config::{ConfigError, HarnessConfig};
use relaysim_core::report::{self, ReportError};
use relaysim_loader::LoadError;
use relaysim_runner::RunStatus;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Protection relay scenario runner
#[derive(Parser, Debug)]
#[command(name = "relaysim")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Harness configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding scenario documents
    #[arg(long, global = true)]
    scenarios_dir: Option<PathBuf>,

    /// Directory for saved reports
    #[arg(long, global = true)]
    reports_dir: Option<PathBuf>,

    /// Default log filter; RUST_LOG takes precedence
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run scenarios in order on one device
    Run {
        /// Scenario names, with or without extension
        #[arg(required = true)]
        scenarios: Vec<String>,

        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Write JSON and text reports to the reports directory
        #[arg(long)]
        save: bool,
    },
    /// List available scenarios
    List,
    /// Check that a scenario file loads and validates
    Validate { file: PathBuf },
    /// Print the status of a fresh device as JSON
    Status,
    /// Serve JSON-RPC requests over stdin/stdout, one per line
    Serve,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Report(#[from] ReportError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            error!(error = %e, "relaysim failed");
            eprintln!("error: {e}");
            ExitCode::from(2)
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode, CliError> {
    let mut config = match &cli.config {
        Some(path) => HarnessConfig::from_toml_file(path)?,
        None => HarnessConfig::default(),
    };
    if let Some(dir) = cli.scenarios_dir {
        config.scenarios_dir = dir;
    }
    if let Some(dir) = cli.reports_dir {
        config.reports_dir = dir;
    }

    match cli.command {
        Command::Run {
            scenarios,
            format,
            save,
        } => run_scenarios(&config, &scenarios, format, save),
        Command::List => {
            for info in config.catalog().list() {
                println!("{:<32} {:<28} {}", info.filename, info.name, info.description);
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Validate { file } => {
            if config.catalog().validate_file(&file) {
                println!("{}: valid", file.display());
                Ok(ExitCode::SUCCESS)
            } else {
                println!("{}: invalid", file.display());
                Ok(ExitCode::FAILURE)
            }
        }
        Command::Status => {
            let status = config.device().get_status();
            println!("{}", serde_json::to_string_pretty(&status)?);
            Ok(ExitCode::SUCCESS)
        }
        Command::Serve => serve(config),
    }
}

fn run_scenarios(
    config: &HarnessConfig,
    names: &[String],
    format: OutputFormat,
    save: bool,
) -> Result<ExitCode, CliError> {
    let catalog = config.catalog();
    let scenarios = names
        .iter()
        .map(|name| catalog.load(name))
        .collect::<Result<Vec<_>, _>>()?;

    let results = config.runner().run_batch(&scenarios);

    match format {
        OutputFormat::Text => {
            for result in &results {
                println!("{}\n", report::text_summary(result));
            }
            if results.len() > 1 {
                println!("{}", report::batch_summary(&results));
            }
        }
        OutputFormat::Json => {
            let reports = results
                .iter()
                .map(report::json_report)
                .collect::<Result<Vec<_>, _>>()?;
            println!("{}", serde_json::to_string_pretty(&reports)?);
        }
    }

    if save {
        for result in &results {
            report::write_json_report(&config.reports_dir, result)?;
            report::write_text_report(&config.reports_dir, result)?;
        }
    }

    let all_passed = results
        .iter()
        .all(|r| r.overall_status() == RunStatus::Passed);
    Ok(if all_passed {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn serve(config: HarnessConfig) -> Result<ExitCode, CliError> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(serve_stdio(Arc::new(ApiState::new(config))))?;
    Ok(ExitCode::SUCCESS)
}

async fn serve_stdio(state: Arc<ApiState>) -> Result<(), CliError> {
    info!(scenarios_dir = %state.config.scenarios_dir.display(), "serving JSON-RPC on stdio");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        // runs block on simulated device delays
        let state = Arc::clone(&state);
        let response = tokio::task::spawn_blocking(move || handle_line(&line, &state))
            .await
            .map_err(std::io::Error::other)?;
        stdout.write_all(format!("{response}\n").as_bytes()).await?;
        stdout.flush().await?;
    }
    Ok(())
}
