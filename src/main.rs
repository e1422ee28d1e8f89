mod app;

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use eframe::egui;

use pinmap::config::{MapConfig, DEFAULT_CONFIG_FILE};
use pinmap::persistence;
use pinmap::PinStore;

#[derive(Parser)]
#[command(name = "pinmap", about = "Place, edit and export pins on a large map image")]
struct Cli {
    /// Map settings (image, pin file, overlay layers)
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,
    /// Pin file to load, overriding the config
    #[arg(long)]
    pins: Option<PathBuf>,
    /// Map image, overriding the config
    image: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Rewrite a pin file with normalized links and colors
    Normalize {
        input: PathBuf,
        /// Write here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn normalize(input: PathBuf, output: Option<PathBuf>) -> Result<()> {
    let records = persistence::load_pins(&input)?;
    let mut store = PinStore::new();
    store.replace_all(records.into_iter().map(|r| r.into_parts()));
    match output {
        Some(path) => persistence::save_pins(&path, store.list())?,
        None => {
            let json = persistence::pins_to_json(store.list())?;
            writeln!(std::io::stdout(), "{json}").context("writing to stdout")?;
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    if let Some(Command::Normalize { input, output }) = cli.command {
        return normalize(input, output);
    }

    let mut config = MapConfig::load(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    if let Some(pins) = cli.pins {
        config.pins = pins;
    }
    if let Some(image) = cli.image {
        config.image = image;
    }

    let app = app::MapApp::new(config);
    let title = app.title();
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 800.0])
            .with_title(&title),
        ..Default::default()
    };

    eframe::run_native(&title, options, Box::new(move |_cc| Ok(Box::new(app))))
        .map_err(|err| anyhow::anyhow!("failed to run eframe: {err}"))
}
