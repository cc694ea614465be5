pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use ragdeck_core::config::{AppConfig, LoadOptions, LogFormat};

#[derive(Debug, Parser)]
#[command(
    name = "ragdeck",
    about = "Ragdeck operator CLI",
    long_about = "Inspect module flow configuration, validate statuses, replay wizard sessions, and manage stored entities.",
    after_help = "Examples:\n  ragdeck flow --module pipeline --flow rag\n  ragdeck wizard --module pipeline --flow rag --script session.json\n  ragdeck doctor --json"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Path to a ragdeck.toml config file")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "List configured modules with their flow types, statuses and states")]
    Modules,
    #[command(about = "Show the resolved step sequence for a module flow")]
    Flow {
        #[arg(long)]
        module: String,
        #[arg(long)]
        flow: String,
        #[arg(long, help = "Include disabled steps, sorted by order")]
        all: bool,
    },
    #[command(about = "Check whether a status key is configured for a module")]
    CheckStatus {
        #[arg(long)]
        module: String,
        #[arg(long)]
        status: String,
    },
    #[command(about = "Check whether a state key is configured for a module")]
    CheckState {
        #[arg(long)]
        module: String,
        #[arg(long)]
        state: String,
    },
    #[command(about = "Replay a scripted wizard session and persist the result on completion")]
    Wizard {
        #[arg(long)]
        module: String,
        #[arg(long)]
        flow: String,
        #[arg(long, help = "JSON file holding a list of wizard actions")]
        script: PathBuf,
        #[arg(long, default_value = "pipeline", help = "Entity type created on completion")]
        kind: String,
        #[arg(long, help = "Initial status stamped on the created entity")]
        status: Option<String>,
        #[arg(long, help = "Initial state stamped on the created entity")]
        state: Option<String>,
    },
    #[command(about = "List stored entities of one type")]
    Entities {
        #[arg(long)]
        kind: String,
    },
    #[command(about = "Update a pipeline's status or state, rejecting unconfigured keys")]
    SetPipelineStatus {
        #[arg(long)]
        id: String,
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        state: Option<String>,
    },
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
    #[command(about = "Validate config, module catalog and data directory readiness")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let options = LoadOptions {
        require_file: cli.config.is_some(),
        config_path: cli.config,
        ..LoadOptions::default()
    };

    if let Ok(config) = AppConfig::load(options.clone()) {
        init_logging(&config);
    }

    let result = match cli.command {
        Command::Modules => commands::catalog::modules(&options),
        Command::Flow { module, flow, all } => {
            commands::catalog::flow(&options, &module, &flow, all)
        }
        Command::CheckStatus { module, status } => {
            commands::catalog::check_status(&options, &module, &status)
        }
        Command::CheckState { module, state } => {
            commands::catalog::check_state(&options, &module, &state)
        }
        Command::Wizard { module, flow, script, kind, status, state } => {
            commands::wizard::run(
                &options,
                commands::wizard::WizardArgs { module, flow, script, kind, status, state },
            )
        }
        Command::Entities { kind } => commands::entities::list(&options, &kind),
        Command::SetPipelineStatus { id, status, state } => {
            commands::entities::set_pipeline_status(&options, &id, status, state)
        }
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run(&options) }
        }
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(&options, json) }
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

/// Logs go to stderr so stdout carries only command output.
fn init_logging(config: &AppConfig) {
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(log_level)
        .with_writer(std::io::stderr);

    let _ = match config.logging.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}
