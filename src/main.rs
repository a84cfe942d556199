use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use eframe::egui;
use mighty_dice::app::DashboardApp;
use mighty_dice::config::DashboardConfig;
use mighty_dice::state::AppState;

/// Dice roll dashboard for the Mighty Nein campaign.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// JSON config file (dataset, roster, logo, rolling window).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Roll table to load (.csv, .json or .parquet). Overrides the config.
    #[arg(short, long)]
    data: Option<PathBuf>,

    /// Write the default views as JSON to this file and exit without a window.
    #[arg(long, value_name = "FILE")]
    export: Option<PathBuf>,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = match &cli.config {
        Some(path) => DashboardConfig::load(path)?,
        None => DashboardConfig::default(),
    };
    if let Some(data) = cli.data {
        config = config.with_dataset(data);
    }

    // A dataset that cannot be read stops startup before any window opens.
    let dataset_path = config.dataset.clone();
    let mut state = AppState::new(config);
    state.open(&dataset_path)?;

    if let Some(out) = cli.export {
        state.export(&out)?;
        return Ok(());
    }

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 900.0])
            .with_min_inner_size([700.0, 500.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Mighty Dice – Campaign Roll Dashboard",
        options,
        Box::new(|cc| {
            // Install image loaders so egui can render the logo.
            egui_extras::install_image_loaders(&cc.egui_ctx);
            Ok(Box::new(DashboardApp::new(state)))
        }),
    )
    .map_err(|e| anyhow::anyhow!("window failed: {e}"))
}
