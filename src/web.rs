#![cfg(not(tarpaulin_include))]

use expense_dashboard::{DashboardConfig, app};

/// Main entry point for the dashboard server
///
/// Reads the configuration from the environment once, then serves the
/// dashboard and the proxy endpoints until the process is stopped.
///
/// # Environment
/// * `API_BASE` - Backend the proxy endpoints forward to
/// * `NEXT_PUBLIC_API_BASE` - Reporting API for reads (defaults to `API_BASE`)
/// * `ADMIN_TOKEN` - Credential attached to sync and reconciliation requests
/// * `DASHBOARD_ADDR` - Bind address (default `127.0.0.1:3000`)
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = DashboardConfig::from_env();
    log::debug!("Starting with {:?}", config);

    app::run(config).await
}
