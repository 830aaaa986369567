//! Command-line interface parsing and handling
//!
//! This module handles parsing command-line arguments and executing the appropriate commands.

pub mod say;
pub mod settings;

use std::error::Error;
use std::io;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::auth::AuthManager;
use crate::cli::say::run_say;
use crate::cli::settings::{apply_set, apply_unset};
use crate::core::app::{self, AppInitConfig};
use crate::core::config::Config;
use crate::core::providers::{resolve_session, ProviderResolutionError, ProviderSession};
use crate::core::session::EXIT_COMMAND;

pub const LOG_ENV: &str = "DRAWBOT_LOG";

#[derive(Parser)]
#[command(name = "drawbot")]
#[command(about = "A terminal chatbot that can draw pictures for you")]
#[command(
    long_about = "drawbot is a line-oriented chat client for OpenAI-compatible APIs. \
When you ask for a picture, the model calls an image generation tool and \
drawbot prints the resulting image URL alongside the reply.\n\n\
Authentication:\n\
  Use 'drawbot auth' to store an API key in your system keyring.\n\n\
Environment Variables:\n\
  OPENAI_API_KEY    Your OpenAI API key (takes precedence over the keyring)\n\
  OPENAI_BASE_URL   Custom API base URL (optional, defaults to https://api.openai.com/v1)\n\
  DRAWBOT_LOG       Diagnostic log filter, e.g. 'drawbot=debug' (written to stderr)\n\n\
Type /exit or press Ctrl+D to leave the chat."
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Chat model to use (defaults to the configured model)
    #[arg(short = 'm', long, global = true, value_name = "MODEL")]
    pub model: Option<String>,

    /// Append a transcript of the conversation to this file
    #[arg(short = 'l', long, global = true, value_name = "FILE")]
    pub log: Option<PathBuf>,

    /// Read and write configuration from this file instead of the default location
    #[arg(short = 'c', long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Print debug diagnostics to stderr
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the interactive chat (default)
    Chat,
    /// Send a single prompt and print the reply
    Say {
        /// Prompt text; multiple words are joined with spaces
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        prompt: Vec<String>,
    },
    /// Store an API key in the system keyring
    Auth,
    /// Remove the stored API key
    Deauth,
    /// Set configuration values, or print them when no value is given
    Set {
        /// Configuration key to set
        key: String,
        /// Value to set for the key (can be multiple words)
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        value: Option<Vec<String>>,
    },
    /// Unset configuration values
    Unset {
        /// Configuration key to unset
        key: String,
    },
}

pub fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    init_tracing(args.verbose);

    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?
        .block_on(async_main(args))
}

fn init_tracing(verbose: bool) {
    let default_directive = if verbose { "drawbot=debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

async fn async_main(args: Args) -> Result<(), Box<dyn Error>> {
    let config_path = match args.config {
        Some(path) => path,
        None => Config::default_path()?,
    };

    match args.command.unwrap_or(Commands::Chat) {
        Commands::Chat => {
            let config = Config::load_from_path(&config_path)?;
            let provider = resolve_or_exit(&config);
            let model = app::resolve_model(args.model.as_deref(), &config);
            let mut session = app::new_session(
                AppInitConfig {
                    model: args.model,
                    log_file: args.log,
                },
                &config,
                &provider,
            )?;

            eprintln!("🚀 drawbot using {model} at {}", provider.base_url);
            eprintln!("💡 Type {EXIT_COMMAND} or press Ctrl+D to quit");
            let stdin = io::stdin();
            session.run(stdin.lock(), io::stdout()).await?;
            Ok(())
        }
        Commands::Say { prompt } => {
            let config = Config::load_from_path(&config_path)?;
            let provider = resolve_or_exit(&config);
            run_say(
                prompt,
                AppInitConfig {
                    model: args.model,
                    log_file: args.log,
                },
                &config,
                &provider,
            )
            .await
        }
        Commands::Auth => {
            let auth_manager = AuthManager::new();
            if let Err(e) = auth_manager.interactive_auth() {
                eprintln!("❌ Authentication failed: {e}");
                std::process::exit(1);
            }
            Ok(())
        }
        Commands::Deauth => {
            let auth_manager = AuthManager::new();
            if let Err(e) = auth_manager.interactive_deauth() {
                eprintln!("❌ Deauthentication failed: {e}");
                std::process::exit(1);
            }
            Ok(())
        }
        Commands::Set { key, value } => {
            let mut config = Config::load_from_path(&config_path)?;
            let value = value.unwrap_or_default();
            if value.is_empty() {
                config.print_all(&config_path);
                return Ok(());
            }
            match apply_set(&mut config, &key, &value) {
                Ok(message) => {
                    config.save_to_path(&config_path)?;
                    println!("{message}");
                    Ok(())
                }
                Err(err) => {
                    err.print();
                    std::process::exit(1);
                }
            }
        }
        Commands::Unset { key } => {
            let mut config = Config::load_from_path(&config_path)?;
            match apply_unset(&mut config, &key) {
                Ok(message) => {
                    config.save_to_path(&config_path)?;
                    println!("{message}");
                    Ok(())
                }
                Err(err) => {
                    err.print();
                    std::process::exit(1);
                }
            }
        }
    }
}

fn resolve_or_exit(config: &Config) -> ProviderSession {
    match resolve_session(&AuthManager::new(), config) {
        Ok(session) => session,
        Err(err) => report_resolution_error(&err),
    }
}

fn report_resolution_error(err: &ProviderResolutionError) -> ! {
    eprintln!("{err}");
    let fixes = err.quick_fixes();
    if !fixes.is_empty() {
        eprintln!();
        eprintln!("💡 Quick fixes:");
        for fix in fixes {
            eprintln!("  • {fix}");
        }
    }
    std::process::exit(err.exit_code());
}
