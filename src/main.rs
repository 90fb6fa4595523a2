use std::path::PathBuf;

use clap::Parser;
use egui::Vec2;

use pitview::ui::PitviewApp;
use pitview::ui::config::AppConfig;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Directory holding the archived session data (catalog indexes, driver
    /// lists, CarData/LapCount streams). Defaults to the last used folder.
    #[arg(short, long)]
    data: Option<PathBuf>,

    /// Year preselected on startup.
    #[arg(short, long)]
    year: Option<String>,
}

fn main() {
    #[cfg(debug_assertions)]
    colog::init();

    let cli = Args::parse();
    ctrlc::set_handler(move || {
        println!("Exiting...");
        std::process::exit(0);
    })
    .expect("Could not set Ctrl-C handler");

    let mut app_config = AppConfig::from_local_file().unwrap_or_default();
    if let Some(data_dir) = cli.data {
        app_config.data_dir = Some(data_dir);
    }
    if let Some(year) = cli.year {
        app_config.preferred_year = year;
    }

    let mut native_options = eframe::NativeOptions::default();
    native_options.viewport = native_options
        .viewport
        .with_inner_size(Vec2::new(1100., 800.));

    eframe::run_native(
        "Pitview",
        native_options,
        Box::new(|cc| Ok(Box::new(PitviewApp::new(app_config, cc)))),
    )
    .expect("could not start app");
}
