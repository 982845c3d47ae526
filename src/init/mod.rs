//! Initialization module for productviz projects.
//!
//! `productviz init` creates the `.productviz/` directory in a project:
//!
//! ```text
//! .productviz/
//! ├── productviz.toml  # Configuration (defaults written on first init)
//! ├── history.db       # Artifact store (created on first open)
//! ├── logs/            # Rolling tracing logs
//! └── exports/         # Default target for `history export`
//! ```

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::config::VizToml;

/// The name of the productviz data directory.
pub const VIZ_DIR: &str = ".productviz";
/// Configuration file name inside [`VIZ_DIR`].
pub const CONFIG_FILE: &str = "productviz.toml";
/// SQLite database file name inside [`VIZ_DIR`].
pub const DATABASE_FILE: &str = "history.db";

/// Result of initializing a project.
#[derive(Debug)]
pub struct InitResult {
    /// Path to the .productviz directory
    pub viz_dir: PathBuf,
    /// Whether the directory was newly created (false if it already existed)
    pub created: bool,
}

/// Initialize productviz in the given directory.
///
/// Existing files are never overwritten; a partial layout is completed.
pub fn init_project(project_dir: &Path) -> Result<InitResult> {
    let viz_dir = get_viz_dir(project_dir);

    let created = !viz_dir.exists();
    if created {
        std::fs::create_dir_all(&viz_dir)
            .with_context(|| format!("Failed to create directory: {}", viz_dir.display()))?;
    }
    ensure_directory_structure(&viz_dir)?;

    Ok(InitResult { viz_dir, created })
}

/// Ensure all required subdirectories and files exist.
fn ensure_directory_structure(viz_dir: &Path) -> Result<()> {
    for sub in ["logs", "exports"] {
        let path = viz_dir.join(sub);
        std::fs::create_dir_all(&path)
            .with_context(|| format!("Failed to create {} directory: {}", sub, path.display()))?;
    }

    let config_file = viz_dir.join(CONFIG_FILE);
    if !config_file.exists() {
        VizToml::default().save(&config_file)?;
    }

    Ok(())
}

/// Check if a project is already initialized.
pub fn is_initialized(project_dir: &Path) -> bool {
    get_viz_dir(project_dir).exists()
}

/// Get the path to the productviz directory for a project.
pub fn get_viz_dir(project_dir: &Path) -> PathBuf {
    project_dir.join(VIZ_DIR)
}
