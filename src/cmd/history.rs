//! History commands: `productviz history`.

use anyhow::{Context, Result, bail};
use console::style;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::super::HistoryCommands;
use super::open_workspace;
use crate::Cli;
use productviz::history::{HistoryCache, LoadReport};
use productviz::store::ArtifactStore;
use productviz::ui::icons::{CHECK, TRASH, WARN};
use productviz::ui::{format_artifact_line, short_id};
use productviz_common::Artifact;

#[derive(Serialize)]
struct ArtifactSummary<'a> {
    id: &'a str,
    kind: &'a str,
    prompt: &'a str,
    created_at: String,
    mime_type: &'a str,
    encoded_bytes: usize,
}

impl<'a> From<&'a Artifact> for ArtifactSummary<'a> {
    fn from(a: &'a Artifact) -> Self {
        Self {
            id: &a.id,
            kind: a.kind.as_str(),
            prompt: &a.prompt,
            created_at: a.created_at.to_rfc3339(),
            mime_type: &a.payload.mime_type,
            encoded_bytes: a.payload.encoded_len(),
        }
    }
}

/// Find an artifact by full id or unique id prefix.
fn resolve<'a>(history: &'a [Artifact], id: &str) -> Result<&'a Artifact> {
    if let Some(exact) = history.iter().find(|a| a.id == id) {
        return Ok(exact);
    }
    let matches: Vec<&Artifact> = history.iter().filter(|a| a.id.starts_with(id)).collect();
    match matches.as_slice() {
        [one] => Ok(*one),
        [] => bail!("No artifact matches '{}'", id),
        _ => bail!("'{}' matches {} artifacts; use a longer id", id, matches.len()),
    }
}

pub async fn cmd_history(cli: &Cli, project_dir: &Path, command: HistoryCommands) -> Result<()> {
    let ws = open_workspace(cli, project_dir)?;
    let store: Arc<dyn ArtifactStore> = ws.store.clone();
    let history = HistoryCache::new(store, ws.config.max_history());

    if let LoadReport::Degraded(message) = history.load().await {
        eprintln!("{} History unavailable: {}", WARN, message);
    }
    let artifacts = history.snapshot().await;

    match command {
        HistoryCommands::List { json } => {
            if json {
                let summaries: Vec<ArtifactSummary> = artifacts.iter().map(Into::into).collect();
                println!("{}", serde_json::to_string_pretty(&summaries)?);
            } else if artifacts.is_empty() {
                println!("No artifacts in history.");
            } else {
                println!();
                println!(
                    "{} ({}/{}, newest first)",
                    style("History").bold(),
                    artifacts.len(),
                    history.max_size()
                );
                println!();
                for (i, artifact) in artifacts.iter().enumerate() {
                    println!("  {}", format_artifact_line(i, artifact));
                }
                println!();
            }
        }
        HistoryCommands::Remove { id, yes } => {
            let artifact = resolve(&artifacts, &id)?;

            if !yes {
                use dialoguer::Confirm;
                let confirm = Confirm::new()
                    .with_prompt(format!("Delete artifact {}?", short_id(&artifact.id)))
                    .default(false)
                    .interact()
                    .unwrap_or(false);

                if !confirm {
                    println!("Deletion cancelled.");
                    return Ok(());
                }
            }

            history
                .remove(&artifact.id)
                .await
                .context("Failed to delete artifact")?;
            println!("{} Deleted {}", TRASH, style(&artifact.id).cyan());
        }
        HistoryCommands::Export { id, out } => {
            let artifact = resolve(&artifacts, &id)?;
            let target = export_path(&ws.config.viz_dir, artifact, out);
            let bytes = artifact
                .payload
                .decode()
                .context("Stored image data is not valid base64")?;
            if let Some(parent) = target.parent()
                && !parent.as_os_str().is_empty()
            {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            std::fs::write(&target, &bytes)
                .with_context(|| format!("Failed to write {}", target.display()))?;
            println!(
                "{} Exported {} to {}",
                CHECK,
                short_id(&artifact.id),
                target.display()
            );
        }
    }

    history.settle_evictions().await;
    Ok(())
}

/// Where to write an export: a file path as given, or `<id>.<ext>` inside a
/// directory (default `.productviz/exports/`).
fn export_path(viz_dir: &Path, artifact: &Artifact, out: Option<PathBuf>) -> PathBuf {
    let file_name = format!("{}.{}", artifact.id, artifact.payload.extension());
    match out {
        Some(path) if path.is_dir() => path.join(file_name),
        Some(path) => path,
        None => viz_dir.join("exports").join(file_name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use productviz_common::{ArtifactKind, ImagePayload};

    fn artifact(id: &str) -> Artifact {
        let mut a = Artifact::new(ImagePayload::new("image/jpeg", "AA=="), "p", ArtifactKind::Edit);
        a.id = id.to_string();
        a
    }

    #[test]
    fn test_resolve_exact_and_prefix() {
        let history = vec![artifact("abc123"), artifact("abd456")];
        assert_eq!(resolve(&history, "abc123").unwrap().id, "abc123");
        assert_eq!(resolve(&history, "abd").unwrap().id, "abd456");
        assert!(resolve(&history, "ab").is_err());
        assert!(resolve(&history, "zzz").is_err());
    }

    #[test]
    fn test_export_path_defaults_to_exports_dir() {
        let a = artifact("abc123");
        let path = export_path(Path::new("/tmp/.productviz"), &a, None);
        assert_eq!(path, PathBuf::from("/tmp/.productviz/exports/abc123.jpg"));
        let explicit = export_path(Path::new("/x"), &a, Some(PathBuf::from("out/mug.jpg")));
        assert_eq!(explicit, PathBuf::from("out/mug.jpg"));
    }
}
