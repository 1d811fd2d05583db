mod ui;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use egui::Vec2;
use log::info;

use pitwall::provider::{OpenF1Provider, SessionProvider};
use ui::DashboardApp;
use ui::config::AppConfig;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Override the session data API base URL
    #[arg(long)]
    base_url: Option<String>,

    /// Override the session cache TTL in seconds
    #[arg(long)]
    cache_ttl: Option<u64>,
}

fn main() {
    #[cfg(debug_assertions)]
    colog::init();

    let args = Args::parse();
    ctrlc::set_handler(move || {
        println!("Exiting...");
        std::process::exit(0);
    })
    .expect("Could not set Ctrl-C handler");

    let mut app_config = AppConfig::from_local_file().unwrap_or_default();
    if let Some(base_url) = args.base_url {
        app_config.provider_base_url = base_url;
    }
    if let Some(cache_ttl) = args.cache_ttl {
        app_config.session_cache_ttl_s = cache_ttl;
    }
    info!(
        "Using session data API at {} (cache TTL {:?})",
        app_config.provider_base_url,
        Duration::from_secs(app_config.session_cache_ttl_s)
    );

    let provider: Arc<dyn SessionProvider> = Arc::new(
        OpenF1Provider::new(app_config.provider_base_url.clone())
            .expect("Could not build the session data client"),
    );

    let window_position = app_config.window_position.clone();
    let mut native_options = eframe::NativeOptions::default();
    native_options.viewport = native_options
        .viewport
        .with_inner_size(Vec2::new(1280., 800.))
        .with_position(window_position);

    eframe::run_native(
        "Pitwall",
        native_options,
        Box::new(|cc| Ok(Box::new(DashboardApp::new(provider, app_config, cc)))),
    )
    .expect("could not start app");
}
