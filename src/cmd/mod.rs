//! CLI command implementations.
//!
//! Each submodule owns one or more related `Commands` variants:
//!
//! | Module      | Commands handled                      |
//! |-------------|---------------------------------------|
//! | `project`   | `Init`, `Scenarios`, `Suggestions`    |
//! | `source`    | `Source`                              |
//! | `generate`  | `Generate`                            |
//! | `history`   | `History`                             |
//! | `config`    | `Config`                              |

pub mod config;
pub mod generate;
pub mod history;
pub mod project;
pub mod source;

pub use config::cmd_config;
pub use generate::cmd_generate;
pub use history::cmd_history;
pub use project::{cmd_init, cmd_scenarios, cmd_suggestions};
pub use source::cmd_source;

use anyhow::{Context, Result, bail};
use std::path::Path;
use std::sync::Arc;

use productviz::config::VizConfig;
use productviz::init::is_initialized;
use productviz::store::SqliteArtifactStore;

use crate::Cli;

/// An initialized project with its store open.
pub struct Workspace {
    pub config: VizConfig,
    pub store: Arc<SqliteArtifactStore>,
}

/// Load configuration and open the artifact store for an initialized project.
pub fn open_workspace(cli: &Cli, project_dir: &Path) -> Result<Workspace> {
    if !is_initialized(project_dir) {
        bail!(
            "Not a productviz project: {}. Run 'productviz init' first.",
            project_dir.display()
        );
    }

    let config =
        VizConfig::with_cli_args(project_dir.to_path_buf(), cli.verbose, cli.max_history)?;
    for warning in config.validate() {
        tracing::warn!("config: {}", warning);
    }

    let store = SqliteArtifactStore::open(&config.database_file(), config.max_payload_bytes())
        .with_context(|| {
            format!(
                "Failed to open artifact store at {}",
                config.database_file().display()
            )
        })?;

    Ok(Workspace {
        config,
        store: Arc::new(store),
    })
}
