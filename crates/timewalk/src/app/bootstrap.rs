use std::env;
use std::path::PathBuf;

use tracing::info;
use tracing_subscriber::EnvFilter;

use super::config::{load_demo_config, DemoConfig, CONFIG_ENV_VAR};
use super::scenario::{build_scenario, Scenario};

pub(crate) struct AppWiring {
    pub(crate) config: DemoConfig,
    pub(crate) scenario: Scenario,
}

pub(crate) fn build_app() -> Result<AppWiring, String> {
    init_tracing();
    info!("=== Timewalk Startup ===");

    let config_path = config_path_from_env();
    let config = load_demo_config(config_path.as_deref())?;
    info!(
        config_path = ?config_path,
        frames = config.frames,
        frame_ms = config.frame_ms,
        target_tps = config.loop_config.target_tps,
        speed = config.follower.speed,
        "config_loaded"
    );

    let scenario = build_scenario(&config)?;
    Ok(AppWiring { config, scenario })
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

fn config_path_from_env() -> Option<PathBuf> {
    env::var_os(CONFIG_ENV_VAR)
        .filter(|raw| !raw.is_empty())
        .map(PathBuf::from)
}
