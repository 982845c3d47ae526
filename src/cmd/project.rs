//! Project initialization and catalog listing commands.

use anyhow::{Context, Result};
use console::style;

pub fn cmd_init(project_dir: &std::path::Path) -> Result<()> {
    use productviz::init::{DATABASE_FILE, init_project, is_initialized};
    use productviz::store::SqliteArtifactStore;

    let was_initialized = is_initialized(project_dir);

    let result = init_project(project_dir)?;

    // Create the database up front so a broken location fails here, not mid-generation.
    let db_path = result.viz_dir.join(DATABASE_FILE);
    SqliteArtifactStore::open(&db_path, None)
        .with_context(|| format!("Failed to create database at {}", db_path.display()))?;

    if result.created {
        println!(
            "Initialized productviz project at {}",
            result.viz_dir.display()
        );
        println!();
        println!("Created directory structure:");
        println!("  .productviz/");
        println!("  ├── productviz.toml  # Configuration (use `productviz config show`)");
        println!("  ├── history.db       # Generated artifact history");
        println!("  ├── logs/            # Debug logs");
        println!("  └── exports/         # Exported images");
        println!();
        println!("Next steps:");
        println!("  1. Export GEMINI_API_KEY (or add it to .env)");
        println!("  2. Run `productviz source set <image>` to choose a product image");
        println!("  3. Run `productviz scenarios` and `productviz generate scenario <id>`");
    } else if was_initialized {
        println!(
            "productviz project already initialized at {}",
            result.viz_dir.display()
        );
        println!("Directory structure verified.");
    }

    Ok(())
}

pub fn cmd_scenarios() -> Result<()> {
    use productviz::scenarios::SCENARIOS;

    println!();
    println!("{}", style("Marketing scenarios").bold());
    println!();
    for scenario in SCENARIOS {
        println!(
            "  {} {:<14} {}",
            scenario.icon,
            style(scenario.id).cyan(),
            scenario.label
        );
    }
    println!();
    println!("Run `productviz generate scenario <id>` to generate one.");
    Ok(())
}

pub fn cmd_suggestions() -> Result<()> {
    use productviz::scenarios::EDIT_SUGGESTIONS;

    println!();
    println!("{}", style("Edit suggestions").bold());
    println!();
    for suggestion in EDIT_SUGGESTIONS {
        println!("  - {}", suggestion);
    }
    println!();
    println!("Run `productviz generate edit \"<prompt>\"` with any instruction.");
    Ok(())
}
