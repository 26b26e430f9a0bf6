mod script;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use pixpad_config::AppConfig;
use pixpad_core::{Document, PixelFormat};
use pixpad_mod_history::{HistoryConfig, UndoManager};

/// Headless pixel-art sprite editor: replays a JSON command script on a new
/// sprite and reports the resulting undo history.
#[derive(Parser, Debug)]
#[command(name = "pixpad", version, about)]
struct Cli {
    /// JSON command script to run.
    script: PathBuf,

    /// Config file to use instead of `pixpad.json` next to the executable.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Sprite width in pixels (defaults to the configured width).
    #[arg(long)]
    width: Option<u32>,

    /// Sprite height in pixels (defaults to the configured height).
    #[arg(long)]
    height: Option<u32>,

    /// Color mode: rgb, grayscale or indexed.
    #[arg(long)]
    mode: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("Starting pixpad");

    let config_path = cli.config.clone().unwrap_or_else(AppConfig::config_path);
    let config = AppConfig::load_or_create(&config_path);

    let mut doc = new_document(&cli, &config)?;
    let mut history = UndoManager::new(HistoryConfig::from(&config));

    let commands = script::load(&cli.script)?;
    let stats = script::run(&commands, &mut doc, &mut history)?;
    tracing::info!(
        "Ran {} commands ({} applied, {} undone, {} redone)",
        commands.len(),
        stats.applied,
        stats.undone,
        stats.redone
    );

    println!("{}", script::history_summary(&history));
    Ok(())
}

fn new_document(cli: &Cli, config: &AppConfig) -> Result<Document> {
    let mode = cli.mode.as_deref().unwrap_or(&config.default_color_mode);
    let format =
        PixelFormat::from_name(mode).with_context(|| format!("unknown color mode {mode:?}"))?;
    let width = cli.width.unwrap_or(config.default_sprite_width);
    let height = cli.height.unwrap_or(config.default_sprite_height);
    if width == 0 || height == 0 {
        anyhow::bail!("sprite size must be positive, got {width}x{height}");
    }
    Document::with_layer(format, width, height, config.default_frame_duration_ms)
        .context("Failed to create sprite")
}
