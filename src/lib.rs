pub mod backend; // Collaborator seam: HTTP + in-memory
pub mod checklist; // Raw checklist → canonical, similarity enrichment
pub mod config;
pub mod dashboard;
pub mod error;
pub mod models;
pub mod monitor;
pub mod pipeline; // Phase catalogue + live status tracking
pub mod registry; // Polled case list
pub mod session;
pub mod view;

pub use dashboard::Dashboard;
pub use error::DashboardError;

use std::path::PathBuf;

use tracing_subscriber::EnvFilter;

/// Entry point of the `chargesheet-monitor` binary.
pub fn run() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} monitor starting v{}", config::APP_NAME, config::APP_VERSION);

    let config = config::DashboardConfig::from_env();
    let files: Vec<PathBuf> = std::env::args_os().skip(1).map(PathBuf::from).collect();

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!(error = %e, "Failed to start async runtime");
            std::process::exit(1);
        }
    };

    if let Err(e) = runtime.block_on(monitor::run(config, files)) {
        tracing::error!(error = %e, "Monitor stopped");
        std::process::exit(1);
    }
}
