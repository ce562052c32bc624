//! Command-line interface parsing and handling
//!
//! This module handles parsing command-line arguments and executing the appropriate commands.

pub mod chat;
pub mod history;
pub mod model_list;

use std::env;
use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::api::gateway::GatewayClient;
use crate::cli::chat::run_chat;
use crate::cli::history::run_history;
use crate::cli::model_list::list_models;
use crate::core::app::{App, AppError, AppInit};
use crate::core::config::data::{path_display, AppConfig, Settings};
use crate::core::config::io::AppPaths;
use crate::core::constants::{API_KEY_ENV, BASE_URL_ENV};

#[derive(Parser)]
#[command(name = "routechat", version)]
#[command(about = "A terminal chat client for models behind an OpenAI-compatible gateway")]
#[command(
    long_about = "routechat talks to every model an OpenRouter-style gateway exposes. \
Conversations are saved after each answer and the newest one is reopened on start.\n\n\
Environment Variables:\n\
  OPENROUTER_API_KEY    API key used when the config has none\n\
  OPENROUTER_BASE_URL   Gateway base URL (defaults to https://openrouter.ai/api/v1)\n\
  RUST_LOG              Log filter; overrides --log-level\n\n\
Type /help inside the chat for the list of commands."
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Keep the config, settings and chat history under this directory
    #[arg(long, global = true, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Log level used when RUST_LOG is not set (logs go to stderr)
    #[arg(long, global = true, value_name = "LEVEL", default_value = "warn")]
    pub log_level: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the chat (default)
    Chat,
    /// List the model catalog with pricing and context sizes
    Models,
    /// Browse saved chats
    History {
        #[command(subcommand)]
        action: Option<HistoryAction>,
    },
    /// Delete the configuration file
    ResetConfig,
}

#[derive(Subcommand)]
pub enum HistoryAction {
    /// List saved chats, newest first (default)
    List,
    /// Print a saved chat
    Show { id: String },
    /// Delete one saved chat
    Delete { id: String },
    /// Delete every saved chat
    Clear,
}

fn init_tracing(level: &str) {
    let fallback = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or(fallback))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

pub fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    init_tracing(&args.log_level);
    tokio::runtime::Runtime::new()?.block_on(async_main(args))
}

fn resolve_paths(args: &Args) -> Result<(AppPaths, Settings), Box<dyn Error>> {
    let paths = AppPaths::resolve(args.data_dir.as_deref())?;
    let settings = Settings::load_from_path(&paths.settings_file)?;
    let paths = paths.with_chat_dir(settings.chat_dir.as_deref());
    Ok((paths, settings))
}

fn open_app(paths: AppPaths, settings: Settings) -> Result<App, Box<dyn Error>> {
    let base_url = settings.resolve_base_url(env::var(BASE_URL_ENV).ok());
    let gateway = GatewayClient::new(
        base_url,
        settings.attribution(),
        settings.request_timeout(),
    )?;
    Ok(App::open(
        Arc::new(gateway),
        AppInit {
            paths,
            settings,
            env_api_key: env::var(API_KEY_ENV).ok(),
        },
    ))
}

fn print_credential_help(paths: &AppPaths) {
    eprintln!("❌ No API key configured.");
    eprintln!();
    eprintln!("Quick fixes:");
    eprintln!("  export {API_KEY_ENV}=\"your-api-key\"   # then run routechat again");
    eprintln!(
        "  or set \"api_key\" in {}",
        path_display(&paths.config_file)
    );
}

async fn async_main(args: Args) -> Result<(), Box<dyn Error>> {
    let (paths, settings) = resolve_paths(&args)?;

    let result = match args.command.unwrap_or(Commands::Chat) {
        Commands::Chat => {
            let mut app = open_app(paths.clone(), settings)?;
            run_chat(&mut app).await
        }
        Commands::Models => {
            let mut app = open_app(paths.clone(), settings)?;
            list_models(&mut app).await
        }
        Commands::History { action } => {
            let app = open_app(paths.clone(), settings)?;
            run_history(&app, action.unwrap_or(HistoryAction::List))
        }
        Commands::ResetConfig => {
            if AppConfig::reset(&paths.config_file)? {
                println!("✅ Deleted {}", path_display(&paths.config_file));
            } else {
                println!("No config at {}", path_display(&paths.config_file));
            }
            Ok(())
        }
    };

    if let Err(err) = &result {
        if matches!(err.downcast_ref::<AppError>(), Some(AppError::MissingCredential)) {
            print_credential_help(&paths);
            std::process::exit(2);
        }
    }
    result
}
