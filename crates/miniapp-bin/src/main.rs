//! Notes mini-app client core - session bootstrap and backend access from the command line.

mod app;
mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use credential_store::Theme;
use miniapp_config_and_utils::{init_logging, Config, Paths};

/// Notes mini-app command-line interface.
#[derive(Parser)]
#[command(name = "notes-miniapp")]
#[command(about = "Notes mini-app client: identity bootstrap, session and backend checks")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error). Defaults to the configured level
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// Base directory for runtime files (config, credentials, logs). Defaults to ~/.notes-miniapp
    #[arg(long, global = true)]
    base_dir: Option<PathBuf>,

    /// Backend base URL, overriding the configuration
    #[arg(long, global = true, env = "MINIAPP_API_URL")]
    api_url: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Establish a session from host identity data
    Bootstrap {
        /// Raw identity blob as the host SDK would expose it
        #[arg(long)]
        init_data: Option<String>,

        /// Launch URL whose query string may carry identity fields
        #[arg(long)]
        launch_url: Option<String>,

        /// Wait for a cross-origin message (read as lines from stdin) until the timeout
        #[arg(long)]
        wait: bool,
    },
    /// Log in with an explicit username and identifier
    Login {
        #[arg(long)]
        username: String,

        #[arg(long)]
        uuid: String,

        /// Skip the register call
        #[arg(long)]
        no_register: bool,
    },
    /// Remove the stored session credential
    Logout,
    /// Show session state, the current user and the shell view
    Status {
        /// Route to resolve the shell view for
        #[arg(long, default_value = "/")]
        route: String,
    },
    /// Probe the backend once
    Health,
    /// Follow backend connectivity and print shell view changes
    Watch {
        #[arg(long, default_value = "/")]
        route: String,
    },
    /// Show or set the theme preference
    Theme {
        /// light or dark
        value: Option<Theme>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let paths = match cli.base_dir {
        Some(base) => Paths::with_base_dir(base),
        None => Paths::new()?,
    };
    let mut config = Config::load(&paths)?;
    if let Some(api_url) = cli.api_url {
        config.api_url = api_url;
        config.validate()?;
    }

    let level = cli.log_level.unwrap_or_else(|| config.log_level.clone());
    init_logging(&level, &paths.log_file());

    let app = app::App::open(config, paths)?;

    match cli.command {
        Commands::Bootstrap {
            init_data,
            launch_url,
            wait,
        } => commands::bootstrap(&app, init_data, launch_url, wait).await?,
        Commands::Login {
            username,
            uuid,
            no_register,
        } => commands::login(&app, &username, &uuid, !no_register).await?,
        Commands::Logout => commands::logout(&app)?,
        Commands::Status { route } => commands::status(&app, &route).await?,
        Commands::Health => commands::health(&app).await?,
        Commands::Watch { route } => commands::watch(&app, &route).await?,
        Commands::Theme { value } => commands::theme(&app, value)?,
    }

    Ok(())
}
