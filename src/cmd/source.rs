//! Base source image commands: `productviz source`.

use anyhow::{Context, Result};
use console::style;
use std::path::Path;

use super::super::SourceCommands;
use super::open_workspace;
use crate::Cli;
use productviz::source::{BaseSource, load_source_file};
use productviz::ui::icons::{CHECK, WARN};

pub async fn cmd_source(cli: &Cli, project_dir: &Path, command: SourceCommands) -> Result<()> {
    let ws = open_workspace(cli, project_dir)?;
    let source = BaseSource::load_from(&ws.store)
        .await
        .context("Failed to read stored source image")?;

    match command {
        SourceCommands::Set { file } => {
            let payload = load_source_file(&file, ws.config.toml.source.max_source_bytes)
                .await
                .with_context(|| format!("Cannot use {} as source image", file.display()))?;
            let mime = payload.mime_type.clone();
            let size = payload.decode().map(|b| b.len()).unwrap_or(0);

            if source.set_persisted(&ws.store, payload).await {
                println!(
                    "{} Source image set: {} ({}, {} bytes)",
                    CHECK,
                    style(file.display()).cyan(),
                    mime,
                    size
                );
            } else {
                println!(
                    "{} Source image loaded but could not be saved for later sessions.",
                    WARN
                );
            }
        }
        SourceCommands::Show => match source.get() {
            Some(payload) => {
                let size = payload.decode().map(|b| b.len()).unwrap_or(0);
                println!("Source image: {} ({} bytes)", payload.mime_type, size);
            }
            None => {
                println!("No source image set.");
                println!("Run 'productviz source set <file>' to choose one.");
            }
        },
        SourceCommands::Clear => {
            source
                .clear_persisted(&ws.store)
                .await
                .context("Failed to clear source image")?;
            println!("Source image cleared.");
        }
    }

    Ok(())
}
