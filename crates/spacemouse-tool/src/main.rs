//! Headless diagnostic host.
//!
//! Starts the device daemon for this platform with the camera controller
//! attached to an in-memory scene, and logs what happens until Ctrl-C.
//!
//! ```text
//! RUST_LOG=spacemouse_tool=trace,spacemouse_daemon=debug spacemouse-tool [config.toml]
//! ```
//!
//! Without an argument the platform config file is used; a missing file means
//! built-in defaults, which are then written there for editing.  `RUST_LOG`
//! overrides `[daemon] log_level`.
//!
//! On Windows the message-pump backend needs a window and a message loop,
//! which this binary does not have, so it will start but see no events there.

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use spacemouse_daemon::infrastructure::storage::config::{
    config_file_path, load_config, load_config_from, save_config, AppConfig,
};
use spacemouse_daemon::{BackendKind, Daemon};
use spacemouse_tool::infrastructure::headless::HeadlessScene;
use spacemouse_tool::SpaceMouseTool;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let explicit_path = std::env::args_os().nth(1);
    let loaded = match &explicit_path {
        Some(path) => load_config_from(path.as_ref()),
        None => load_config(),
    };
    let (config, config_error) = match loaded {
        Ok(config) => (config, None),
        Err(e) => (AppConfig::default(), Some(e)),
    };

    // Initialise structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.daemon.log_level)),
        )
        .init();

    match config_error {
        Some(e) => warn!("using default configuration: {e}"),
        None if explicit_path.is_none() => write_config_if_missing(&config),
        None => {}
    }
    info!("SpaceMouse diagnostic host starting");

    let daemon = Daemon::new(&config.daemon);
    if daemon.backend_kind() == BackendKind::MessagePump {
        info!("no window in headless mode; raw input events will not arrive");
    }
    let tool = SpaceMouseTool::new(daemon, HeadlessScene::new(), &config.controller);

    if !tool.on_engine_created(None) {
        warn!("continuing without a 3D mouse");
    }

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl-C")?;
    info!("shutdown signal received");

    tool.on_application_shutdown();
    Ok(())
}

fn write_config_if_missing(config: &AppConfig) {
    let Ok(path) = config_file_path() else {
        return;
    };
    if path.exists() {
        return;
    }
    match save_config(config) {
        Ok(()) => info!(path = %path.display(), "wrote default configuration"),
        Err(e) => warn!("could not write default configuration: {e}"),
    }
}
