//! Any Business service binary.
//!
//! Loads the configuration from the environment (and an optional dotenv
//! file), serves the application and exits once the server has stopped.

use std::path::PathBuf;
use std::process::ExitCode;

use any_business::config::DEFAULT_CONFIG_NAME;
use any_business::lifecycle::{startup, StartupOptions};
use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "any-business", version, about = "Any Business HTTP service")]
struct Args {
    /// Dotenv file loaded before reading the environment.
    #[arg(long, default_value = ".env")]
    env_file: PathBuf,

    /// Name the configuration is registered under.
    #[arg(long, default_value = DEFAULT_CONFIG_NAME)]
    config_name: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let options = StartupOptions {
        env_file: args.env_file,
        config_name: args.config_name,
    };

    match startup::run(options).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Service terminated");
            eprintln!("any-business: {e}");
            ExitCode::FAILURE
        }
    }
}
