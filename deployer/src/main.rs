//! botdeploy - Entry Point
//!
//! Provisions the resources of a bot environment and deploys the bot to it.

use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use botdeploy::app::options::DeploymentConfig;
use botdeploy::app::run::{run, Command, RunOptions};
use botdeploy::deploy::orchestrator::DeployOptions;
use botdeploy::deploy::progress::{ConsoleSink, ProgressSink, TracingSink};
use botdeploy::filesys::file::File;
use botdeploy::logs::{init_logging, LogLevel, LogOptions};
use botdeploy::storage::settings::ToolSettings;
use botdeploy::utils::version_info;

use tracing::{error, info};

const TOOL_SETTINGS_FILE: &str = "deployer.json";

#[tokio::main]
async fn main() -> ExitCode {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();
    let mut cli_args: HashMap<String, String> = HashMap::new();

    for arg in args.iter().skip(1) {
        if let Some((key, value)) = arg.split_once('=') {
            // Handle --key=value format
            let clean_key = key.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), value.to_string());
        } else if arg.starts_with("--") {
            // Handle standalone flags like --version
            let clean_key = arg.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), "true".to_string());
        }
    }

    // Print version and exit
    let version = version_info();
    if cli_args.contains_key("version") {
        match serde_json::to_string_pretty(&version) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("Failed to serialize version info: {e}"),
        }
        return ExitCode::SUCCESS;
    }

    let Some(command) = parse_command(&cli_args) else {
        eprintln!("{}", usage());
        return ExitCode::FAILURE;
    };

    let project_dir = cli_args
        .get("project")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));

    // Retrieve the tool settings, falling back to defaults
    let settings_file = File::new(project_dir.join(TOOL_SETTINGS_FILE));
    let settings = if settings_file.exists().await {
        match settings_file.read_json::<ToolSettings>().await {
            Ok(settings) => settings,
            Err(e) => {
                eprintln!("Unable to read {}: {}", TOOL_SETTINGS_FILE, e);
                return ExitCode::FAILURE;
            }
        }
    } else {
        ToolSettings::default()
    };

    // Initialize logging
    let log_level = match cli_args.get("log-level") {
        Some(level) => match level.parse::<LogLevel>() {
            Ok(level) => level,
            Err(e) => {
                eprintln!("{e}");
                return ExitCode::FAILURE;
            }
        },
        None => settings.log_level.clone(),
    };
    let log_options = LogOptions {
        log_level,
        json_format: settings.json_logs,
        log_dir: settings.log_dir.as_ref().map(PathBuf::from),
    };
    let _log_guard = match init_logging(log_options) {
        Ok(guard) => guard,
        Err(e) => {
            println!("Failed to initialize logging: {e}");
            None
        }
    };

    let Some(name) = cli_args.get("name").cloned() else {
        error!("--name is required");
        return ExitCode::FAILURE;
    };
    let options = RunOptions {
        command,
        name,
        environment: cli_args
            .get("environment")
            .cloned()
            .unwrap_or_else(|| "dev".to_string()),
        location: cli_args
            .get("location")
            .cloned()
            .unwrap_or_else(|| "westus".to_string()),
        app_password: cli_args.get("app-password").cloned(),
        deploy: DeployOptions {
            luis_authoring_key: cli_args.get("luis-authoring-key").cloned(),
            luis_authoring_region: cli_args.get("luis-authoring-region").cloned(),
            bot_path: cli_args.get("bot-path").map(PathBuf::from),
            language: cli_args.get("language").cloned(),
        },
    };

    let config = match DeploymentConfig::from_env(&project_dir, &settings) {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    // JSON logs already carry every progress event
    let sink: Arc<dyn ProgressSink> = if settings.json_logs {
        Arc::new(TracingSink)
    } else {
        Arc::new(ConsoleSink)
    };

    info!("Running botdeploy {} ({})", version.version, version.git_hash);
    match run(config, options, sink, await_shutdown_signal()).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("botdeploy failed: {e}");
            ExitCode::FAILURE
        }
    }
}

fn parse_command(cli_args: &HashMap<String, String>) -> Option<Command> {
    if cli_args.contains_key("create-and-deploy") {
        Some(Command::CreateAndDeploy)
    } else if cli_args.contains_key("create") {
        Some(Command::Create)
    } else if cli_args.contains_key("deploy") {
        Some(Command::Deploy)
    } else if cli_args.contains_key("status") {
        Some(Command::Status)
    } else {
        None
    }
}

fn usage() -> &'static str {
    "usage: botdeploy --create|--deploy|--create-and-deploy|--status --name=<bot> \
     [--environment=dev] [--location=westus] [--app-password=...] \
     [--luis-authoring-key=...] [--luis-authoring-region=...] [--bot-path=...] \
     [--language=en-us] [--project=.] [--log-level=info]"
}

async fn await_shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Ctrl+C received, shutting down..."),
        Err(e) => error!("Failed to listen for Ctrl+C: {}", e),
    }
}
