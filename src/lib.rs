pub mod types;
pub mod config;
pub mod entry_rows;
pub mod roster;
pub mod draw;
pub mod reveal;
pub mod display;
pub mod source;
pub mod presentation;
pub mod server;

use config::*;
use presentation::{Presentation, StageSettings};
use types::AppConfig;

use std::fs;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

// ── Entry point ────────────────────────────────────────────────────────

pub fn run() {
    load_env_file();

    // Initialize tracing with daily-rolled file output
    let logs_dir = repo_root().join("logs");
    fs::create_dir_all(&logs_dir).ok();
    let file_appender = tracing_appender::rolling::daily(&logs_dir, "raffle.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(non_blocking)
        .with_ansi(false)
        .init();
    info!("Raffle stage starting");

    let config = match load_config_inner() {
        Ok(config) => config,
        Err(e) => {
            error!("{e}; falling back to defaults");
            apply_env_defaults(AppConfig::default())
        }
    };
    log_env_warnings(&config);
    if !config_path().is_file() {
        match save_config_inner(AppConfig::default()) {
            Ok(_) => info!("wrote default config to {}", config_path().display()),
            Err(e) => warn!("could not write default config: {e}"),
        }
    }

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("failed to start async runtime: {e}");
            return;
        }
    };

    let settings = StageSettings::from_config(&config);
    info!(
        source = %settings.source.describe(),
        winners = settings.counts.winners,
        alternates = settings.counts.alternates,
        policy = ?settings.loading_policy,
        "presentation configured"
    );
    let presentation = Presentation::new(settings);
    let static_dir = resolve_static_dir(&config);

    runtime.block_on(server::start_presentation_server(
        presentation,
        static_dir,
        &config.bind_addr,
    ));
    info!("Raffle stage stopped");
}
