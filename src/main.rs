use std::io::Read;
use std::sync::{Arc, RwLock};

use anyhow::{bail, Context};
use clap::Parser;
use homedir::my_home;
use inquire::error::InquireResult;

mod app;
mod cli;
mod config;
mod semantic;
mod sensors;
mod storage;
#[cfg(test)]
mod tests;
mod validate;
mod web;

use config::Config;

/// Resolve the data directory: $SENSORD_BASE_PATH or ~/.local/share/sensord.
fn base_path() -> anyhow::Result<String> {
    if let Ok(path) = std::env::var("SENSORD_BASE_PATH") {
        return Ok(path);
    }

    let home = my_home()
        .context("could not determine home directory")?
        .context("home directory path is empty")?;
    Ok(format!("{}/.local/share/sensord", home.to_string_lossy()))
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sensord=info,tower_http=info".into()),
        )
        .init();

    let args = cli::Args::parse();

    let base_path = base_path()?;
    let config = Arc::new(RwLock::new(Config::load_with(&base_path)?));
    let app = Arc::new(app::App::new(config.clone()));

    match args.command {
        cli::Command::Daemon { listen } => {
            let listen_addr = listen.unwrap_or_else(|| config.read().unwrap().listen_addr.clone());
            app.init_model();
            web::start_daemon(app, listen_addr);
            Ok(())
        }

        cli::Command::Create { name_id, text } => {
            let text = match text {
                Some(text) => text,
                None => {
                    let mut buffer = String::new();
                    std::io::stdin()
                        .read_to_string(&mut buffer)
                        .context("failed to read sensor text from stdin")?;
                    buffer
                }
            };

            let paragraphs_count = app.create_sensor(&name_id, &text)?;
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({
                    "message": "Text sensor created",
                    "paragraphs_count": paragraphs_count,
                }))
                .unwrap()
            );
            Ok(())
        }

        cli::Command::Check { name_id, text } => {
            let result = app.check_similarity(&name_id, &text)?;
            println!("{}", serde_json::to_string_pretty(&result).unwrap());
            Ok(())
        }

        cli::Command::List => {
            let listing = app.list_sensors();
            println!("{}", serde_json::to_string_pretty(&listing).unwrap());
            Ok(())
        }

        cli::Command::Delete { name_id, yes } => {
            if !yes {
                match inquire::prompt_confirmation(format!(
                    "Are you sure you want to delete sensor '{name_id}'?"
                )) {
                    InquireResult::Ok(true) => {}
                    InquireResult::Ok(false) => return Ok(()),
                    InquireResult::Err(err) => bail!("An error occurred: {}", err),
                }
            }

            let removed = app.delete_sensor(&name_id)?;
            if removed {
                println!("Text sensor '{}' deleted", name_id.trim());
            } else {
                println!("Text sensor '{}' was not present", name_id.trim());
            }
            Ok(())
        }
    }
}
