use std::path::PathBuf;

use anyhow::Result;
use chrono::Utc;
use clap::Parser;
use tracing::{info, warn};

use wp_change_tracker::chat::{Notifier, WebhookNotifier};
use wp_change_tracker::config::load_config;
use wp_change_tracker::database::MySqlConnector;
use wp_change_tracker::report::ReportWriter;
use wp_change_tracker::tracker::{ChangeTracker, RunClock};

/// Report recent WordPress activity by privileged users.
#[derive(Parser, Debug)]
#[command(name = "wp-change-tracker", version, about, long_about = None)]
struct Cli {
    /// Path to the key=value settings file
    #[arg(long, env = "WP_TRACKER_CONFIG", default_value = "config/wp-deployment.conf")]
    config: PathBuf,

    /// Directory receiving the CSV and JSON artifacts
    #[arg(long, env = "WP_TRACKER_LOG_DIR", default_value = "logs")]
    log_dir: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let cfg = load_config(&cli.config)?;
    info!(
        environments = cfg.environments.len(),
        roles = ?cfg.allowed_roles,
        "Loaded configuration from {}",
        cli.config.display()
    );

    let notifier = match &cfg.webhook_url {
        Some(url) => match WebhookNotifier::new(url.clone(), cfg.webhook_timeout) {
            Ok(n) => Some(n),
            Err(e) => {
                warn!("Notifications disabled: {:#}", e);
                None
            }
        },
        None => {
            warn!("No webhook defined (GOOGLE_CHAT_WEBHOOK missing in config). Notifications disabled.");
            None
        }
    };

    let connector = MySqlConnector::new(cfg.connect_timeout, cfg.query_timeout);
    let writer = ReportWriter::new(cli.log_dir);
    let tracker = ChangeTracker::new(
        &cfg,
        &connector,
        &writer,
        notifier.as_ref().map(|n| n as &dyn Notifier),
    );

    let summary = tracker.run(&RunClock::now()).await;

    info!(
        reported = summary.reported_count(),
        attempted = summary.outcomes.len(),
        "Change tracking completed"
    );
    info!("Completed at: {}", Utc::now().format("%Y-%m-%d %H:%M:%S"));
    Ok(())
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
