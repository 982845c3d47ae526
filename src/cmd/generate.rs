//! Generation commands: `productviz generate`.

use anyhow::{Context, Result, bail};
use console::style;
use std::path::Path;
use std::sync::Arc;

use super::super::GenerateCommands;
use super::open_workspace;
use crate::Cli;
use productviz::errors::OrchestratorError;
use productviz::generator::{GeminiGenerator, ImageGenerator};
use productviz::history::LoadReport;
use productviz::orchestrator::Orchestrator;
use productviz::scenarios::find_scenario;
use productviz::source::BaseSource;
use productviz::store::ArtifactStore;
use productviz::ui::GenerationUI;
use productviz::ui::progress::truncate;
use productviz::ui::icons::WARN;

pub async fn cmd_generate(cli: &Cli, project_dir: &Path, command: GenerateCommands) -> Result<()> {
    let ws = open_workspace(cli, project_dir)?;
    let source = Arc::new(
        BaseSource::load_from(&ws.store)
            .await
            .context("Failed to read stored source image")?,
    );

    let (label, from_latest) = match &command {
        GenerateCommands::Scenario { id } => {
            let scenario = find_scenario(id)
                .ok_or_else(|| OrchestratorError::UnknownScenario(id.clone()))?;
            (format!("{} {}", scenario.icon, scenario.label), false)
        }
        GenerateCommands::Edit {
            prompt,
            from_latest,
        } => (truncate(prompt, 40), *from_latest),
    };

    // Check the source before demanding an API key.
    if !source.is_set() && !from_latest {
        return Err(OrchestratorError::NoSourceConfigured.into());
    }

    let generator: Arc<dyn ImageGenerator> = Arc::new(
        GeminiGenerator::from_config(&ws.config).context("Cannot reach the image generator")?,
    );
    let store: Arc<dyn ArtifactStore> = ws.store.clone();
    let orch = Orchestrator::with_store(
        store,
        generator,
        source,
        ws.config.orchestrator_settings(),
    );

    if let LoadReport::Degraded(message) = orch.start().await {
        eprintln!("{} History unavailable, starting empty: {}", WARN, message);
    }
    if from_latest && orch.history().is_empty().await && !orch.source().is_set() {
        return Err(OrchestratorError::NoSourceConfigured.into());
    }

    let ui = Arc::new(GenerationUI::new(&label, cli.verbose));
    let follower = Arc::clone(&ui).follow(orch.subscribe());

    let run = async {
        match &command {
            GenerateCommands::Scenario { id } => orch.generate_scenario(id).await,
            GenerateCommands::Edit {
                prompt,
                from_latest,
            } => orch.generate_custom(prompt, *from_latest).await,
        }
    };

    let outcome = tokio::select! {
        result = run => Some(result),
        _ = tokio::signal::ctrl_c() => None,
    };
    follower.abort();

    let result = match outcome {
        Some(result) => result,
        None => {
            ui.finish_error("Interrupted");
            orch.shutdown().await;
            bail!("Generation interrupted");
        }
    };

    match result {
        Ok(artifact) => {
            ui.finish_success(&artifact);
            let history = orch.history();
            println!(
                "Saved {} to history ({}/{}).",
                style(&artifact.id).cyan(),
                history.len().await,
                history.max_size()
            );
            orch.shutdown().await;
            Ok(())
        }
        Err(e) => {
            ui.finish_error(&e.to_string());
            orch.shutdown().await;
            Err(e).context("Generation failed")
        }
    }
}
