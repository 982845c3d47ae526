//! Configuration view and validation commands: `productviz config`.

use anyhow::Result;

use super::super::ConfigCommands;
use crate::Cli;

fn print_sections(toml: &productviz::config::VizToml) {
    println!("[history]");
    println!("  max_size = {}", toml.history.max_size);
    println!("  max_payload_bytes = {}", toml.history.max_payload_bytes);
    println!();
    println!("[progress]");
    println!("  tick_interval_ms = {}", toml.progress.tick_interval_ms);
    println!("  success_settle_ms = {}", toml.progress.success_settle_ms);
    println!("  error_settle_ms = {}", toml.progress.error_settle_ms);
    println!();
    println!("[generator]");
    println!("  model = \"{}\"", toml.generator.model);
    println!("  endpoint = \"{}\"", toml.generator.endpoint);
    println!("  api_key_env = \"{}\"", toml.generator.api_key_env);
    println!("  timeout_secs = {}", toml.generator.timeout_secs);
    println!();
    println!("[source]");
    println!("  max_source_bytes = {}", toml.source.max_source_bytes);
    println!();
}

pub fn cmd_config(
    cli: &Cli,
    project_dir: &std::path::Path,
    command: Option<ConfigCommands>,
) -> Result<()> {
    use productviz::config::{VizConfig, VizToml};
    use productviz::init::{CONFIG_FILE, get_viz_dir};

    let viz_dir = get_viz_dir(project_dir);
    let config_path = viz_dir.join(CONFIG_FILE);

    match command {
        None | Some(ConfigCommands::Show) => {
            println!();
            println!("productviz Configuration");
            println!("=======================");
            println!();

            if config_path.exists() {
                println!("Config file: {}", config_path.display());
                println!();
                print_sections(&VizToml::load(&config_path)?);

                // Effective values after env/CLI layering
                println!("Effective values (with env/CLI overrides):");
                let config = VizConfig::with_cli_args(
                    project_dir.to_path_buf(),
                    cli.verbose,
                    cli.max_history,
                )?;
                println!("  max_history = {}", config.max_history());
                println!("  model = \"{}\"", config.model());
                println!(
                    "  api_key = {}",
                    if config.api_key().is_some() {
                        "set"
                    } else {
                        "not set"
                    }
                );
                println!();
            } else {
                println!("No productviz.toml found at {}", config_path.display());
                println!();
                println!("Using default configuration:");
                print_sections(&VizToml::default());
                println!("Run 'productviz config init' to create a productviz.toml file.");
                println!();
            }
        }
        Some(ConfigCommands::Validate) => {
            println!();
            println!("Validating configuration...");
            println!();

            if !config_path.exists() {
                println!("No productviz.toml found. Using defaults (valid).");
                return Ok(());
            }

            let toml = VizToml::load(&config_path)?;
            let warnings = toml.validate();

            if warnings.is_empty() {
                println!("Configuration is valid.");
            } else {
                println!("Configuration warnings:");
                for warning in warnings {
                    println!("  - {}", warning);
                }
            }
            println!();
        }
        Some(ConfigCommands::Init) => {
            if config_path.exists() {
                println!(
                    "productviz.toml already exists at {}",
                    config_path.display()
                );
                println!("Delete it first if you want to recreate it.");
                return Ok(());
            }

            if !viz_dir.exists() {
                std::fs::create_dir_all(&viz_dir)?;
            }

            VizToml::default().save(&config_path)?;

            println!("Created productviz.toml at {}", config_path.display());
            println!();
            println!("You can now customize:");
            println!("  - [history] max_size, max_payload_bytes");
            println!("  - [generator] model, endpoint, api_key_env");
            println!("  - [progress] tick and settle timings");
            println!();
        }
    }

    Ok(())
}
