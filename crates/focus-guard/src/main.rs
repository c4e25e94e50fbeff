//! FocusGuard - Main Entry Point

use focus_guard::{init_logging, run, Settings, DEFAULT_CONFIG_FILE};
use std::path::PathBuf;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

    let settings = Settings::load(&config_path)?;
    init_logging(&settings.logging)?;

    info!("=== FocusGuard v{} ===", env!("CARGO_PKG_VERSION"));
    info!("Settings: {}", config_path.display());

    let summary = run(settings).await?;

    println!("{}", "-".repeat(50));
    println!("{}", summary);
    println!("{}", "-".repeat(50));

    Ok(())
}
