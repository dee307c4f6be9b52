pub mod backend;
mod commands;
pub mod config;
pub mod deployment;
pub mod error;
pub mod gate;
pub mod orchestrator;
mod paths;
pub mod plugin;
pub mod stack;
pub mod status;
pub mod validation;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{AppState, InstallTarget};
use config::load_config;
pub use error::{AppError, ErrorKind, Result};

#[derive(Parser)]
#[command(name = "rollup-console")]
#[command(about = "Provision and operate Thanos rollup stacks", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List all stacks
    List,

    /// Show a stack with its actions and plugins
    Show { stack_id: String },

    /// Show deployment steps of a stack
    Steps { stack_id: String },

    /// Create a stack from a TOML or JSON request file
    Create {
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Destroy a stack
    Destroy { stack_id: String },

    /// Resume a stopped, failed or terminated stack
    Resume { stack_id: String },

    /// Stop a deploying stack
    Stop { stack_id: String },

    /// Point an active stack at new L1 endpoints
    Update {
        stack_id: String,
        #[arg(long)]
        l1_rpc_url: String,
        #[arg(long)]
        l1_beacon_url: String,
    },

    /// List installable and installed plugins of a stack
    Plugins { stack_id: String },

    /// Install a plugin on a stack
    Install {
        stack_id: String,
        #[command(subcommand)]
        target: InstallTarget,
    },

    /// Install a terminated plugin again with its previous settings
    Reinstall { stack_id: String, plugin_type: String },

    /// Uninstall a plugin from a stack
    Uninstall { stack_id: String, plugin_type: String },

    /// Console settings
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Print the current settings
    Show,
    /// Save the backend base URL after checking that it answers
    SetApiUrl { url: String },
    /// Save the request timeout in seconds
    SetTimeout { secs: u64 },
}

fn init_logging(verbose: bool, configured_level: &str) {
    let level = if verbose { "debug" } else { configured_level };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            init_logging(cli.verbose, "info");
            log::error!("Failed to load config: {}", e);
            return report(&e, cli.json);
        }
    };
    init_logging(cli.verbose, &config.log_level);
    let json_output = cli.json || config.json_output;

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => return report(&AppError::from(e), json_output),
    };

    let result = runtime.block_on(async {
        let state = AppState::new(&config, json_output)?;
        dispatch(cli.command, &state).await
    });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => report(&e, json_output),
    }
}

async fn dispatch(command: Commands, state: &AppState) -> Result<()> {
    match command {
        Commands::List => commands::list_stacks(state).await,
        Commands::Show { stack_id } => commands::show_stack(state, &stack_id).await,
        Commands::Steps { stack_id } => commands::show_steps(state, &stack_id).await,
        Commands::Create { file } => commands::create_stack(state, &file).await,
        Commands::Destroy { stack_id } => commands::destroy_stack(state, &stack_id).await,
        Commands::Resume { stack_id } => commands::resume_stack(state, &stack_id).await,
        Commands::Stop { stack_id } => commands::stop_stack(state, &stack_id).await,
        Commands::Update {
            stack_id,
            l1_rpc_url,
            l1_beacon_url,
        } => commands::update_stack(state, &stack_id, l1_rpc_url, l1_beacon_url).await,
        Commands::Plugins { stack_id } => commands::list_plugins(state, &stack_id).await,
        Commands::Install { stack_id, target } => {
            commands::install_plugin(state, &stack_id, target).await
        }
        Commands::Reinstall {
            stack_id,
            plugin_type,
        } => commands::reinstall_plugin(state, &stack_id, &plugin_type).await,
        Commands::Uninstall {
            stack_id,
            plugin_type,
        } => commands::uninstall_plugin(state, &stack_id, &plugin_type).await,
        Commands::Config { command } => match command {
            ConfigCommand::Show => commands::show_config(state.json_output),
            ConfigCommand::SetApiUrl { url } => commands::save_api_base_url(url).await,
            ConfigCommand::SetTimeout { secs } => commands::save_request_timeout(secs),
        },
    }
}

fn report(error: &AppError, json_output: bool) -> ExitCode {
    if json_output {
        match serde_json::to_string(error) {
            Ok(out) => println!("{}", out),
            Err(_) => eprintln!("Error: {}", error),
        }
    } else {
        eprintln!("Error: {}", error);
    }
    ExitCode::FAILURE
}
