//! Config command - configuration management

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::args::{ConfigArgs, ConfigCommands};
use crate::config::AppConfig;

pub async fn execute(args: ConfigArgs) -> Result<()> {
    match args.command {
        ConfigCommands::Init { path, force } => init_config(path, force).await,
    }
}

async fn init_config(path: PathBuf, force: bool) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "Config file already exists: {}. Use --force to overwrite.",
            path.display()
        );
    }

    // Create parent directories if needed
    let parent = path.parent().filter(|p| !p.as_os_str().is_empty());
    if let Some(parent) = parent {
        if !parent.exists() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
    }

    fs::write(&path, AppConfig::example_toml())
        .with_context(|| format!("Failed to write config file: {}", path.display()))?;
    println!("Created config file: {}", path.display());

    let pool_path = parent.unwrap_or(Path::new(".")).join("posts.toml");
    if pool_path.exists() && !force {
        println!("Keeping existing content pool: {}", pool_path.display());
    } else {
        fs::write(&pool_path, AppConfig::example_pool_toml())
            .with_context(|| format!("Failed to write content pool: {}", pool_path.display()))?;
        println!("Created content pool: {}", pool_path.display());
    }

    println!();
    println!("Next steps:");
    println!("  1. Enable the platforms you use and put their credentials in .env");
    println!("  2. Add your own posts to {}", pool_path.display());
    println!("  3. Run 'social-daemon doctor' to validate your setup");
    println!("  4. Run 'social-daemon run --dry-run --once' to test");

    Ok(())
}
