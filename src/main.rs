use log::{error, info};
use mimalloc::MiMalloc;
use std::net::{IpAddr, TcpListener};
use std::path::PathBuf;
use std::sync::Arc;

use photo_collage::config::Config;
use photo_collage::layout::LayoutPreset;
use photo_collage::routes::build_routes;
use photo_collage::storage::LocalResultStore;
use photo_collage::warp_helpers::AppState;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let config = Config::from_env()?;
    let host: IpAddr = config.host.parse()?;
    let port = config.port;

    info!("Starting photo collage server on {}:{}", host, port);
    info!("Results path: {}", config.results_path);
    info!("Assets path: {}", config.assets_path);
    info!("Max upload size: {} MB", config.max_upload_mb);

    if !is_port_available(host, port) {
        error!("Port {} is already in use", port);
        error!(
            "You can check what's using the port with: lsof -i :{}",
            port
        );
        return Err(format!("Port {} is already in use", port).into());
    }

    let state = initialize_state(&config)?;

    let routes = build_routes(state);

    info!(
        "Server started successfully, listening on http://{}:{}",
        host, port
    );

    warp::serve(routes).run((host, port)).await;

    Ok(())
}

fn is_port_available(host: IpAddr, port: u16) -> bool {
    TcpListener::bind((host, port)).is_ok()
}

/// Checks presets and assets up front so a broken deployment never starts.
fn initialize_state(config: &Config) -> Result<AppState, Box<dyn std::error::Error>> {
    for preset in [LayoutPreset::Collage, LayoutPreset::Mockup] {
        preset
            .config()
            .validate()
            .map_err(|e| format!("Preset '{}' is invalid: {}", preset, e))?;
    }

    let settings = config.render_settings();
    let assets = settings.load_assets()?;
    info!(
        "Loaded logo {}x{} and signature {}x{}",
        assets.logo.width(),
        assets.logo.height(),
        assets.signature.width(),
        assets.signature.height()
    );

    let store = LocalResultStore::new(
        PathBuf::from(&config.results_path),
        config.public_base_url.clone(),
    )?;

    Ok(AppState {
        settings,
        store: Arc::new(store),
    })
}
