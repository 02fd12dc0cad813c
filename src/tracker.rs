use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use tracing::{error, info, warn};

use crate::chat::{ChangeNotice, Notifier};
use crate::collector::{ChangeCollector, Extraction};
use crate::database::Connector;
use crate::report::{ReportWriter, RunArtifact};
use crate::roles::resolve_privileged_users;
use crate::types::{Config, Environment};

pub const LOOKBACK_HOURS: i64 = 24;

/// Fixed time reference for a whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunClock {
    pub started_at: DateTime<Utc>,
}

impl RunClock {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self { started_at }
    }

    pub fn now() -> Self {
        Self::new(Utc::now())
    }

    pub fn threshold(&self) -> NaiveDateTime {
        (self.started_at - Duration::hours(LOOKBACK_HOURS)).naive_utc()
    }

    pub fn run_label(&self) -> String {
        self.started_at.format("%Y-%m-%d_%H-%M-%S").to_string()
    }
}

/// How processing of one environment ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvironmentOutcome {
    ConnectFailed,
    RoleQueryFailed,
    NoQualifyingUsers,
    ActivityQueryFailed,
    NoChanges,
    WriteFailed,
    Reported {
        count: usize,
        artifact: RunArtifact,
        notified: bool,
    },
}

#[derive(Debug, Default)]
pub struct RunSummary {
    pub outcomes: Vec<(String, EnvironmentOutcome)>,
}

impl RunSummary {
    pub fn outcome(&self, label: &str) -> Option<&EnvironmentOutcome> {
        self.outcomes
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, o)| o)
    }

    /// Number of environments that produced artifacts
    pub fn reported_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, o)| matches!(o, EnvironmentOutcome::Reported { .. }))
            .count()
    }
}

/// Drives role resolution, extraction, reporting and notification for every
/// configured environment, one at a time.
pub struct ChangeTracker<'a> {
    config: &'a Config,
    connector: &'a dyn Connector,
    writer: &'a ReportWriter,
    notifier: Option<&'a dyn Notifier>,
}

impl<'a> ChangeTracker<'a> {
    pub fn new(
        config: &'a Config,
        connector: &'a dyn Connector,
        writer: &'a ReportWriter,
        notifier: Option<&'a dyn Notifier>,
    ) -> Self {
        Self {
            config,
            connector,
            writer,
            notifier,
        }
    }

    pub async fn run(&self, clock: &RunClock) -> RunSummary {
        info!("Tracking changes since: {}", clock.threshold());
        let mut summary = RunSummary::default();
        for env in &self.config.environments {
            let outcome = self.track_environment(env, clock).await;
            summary.outcomes.push((env.label.clone(), outcome));
        }
        summary
    }

    async fn track_environment(&self, env: &Environment, clock: &RunClock) -> EnvironmentOutcome {
        let label = env.label.as_str();
        info!("Connecting to {} database...", label);
        let mut store = match self.connector.connect(env).await {
            Ok(store) => store,
            Err(e) => {
                error!("Connection to {} failed: {}", label, e);
                return EnvironmentOutcome::ConnectFailed;
            }
        };

        let user_ids = match resolve_privileged_users(
            store.as_mut(),
            &env.usermeta_table(),
            &self.config.allowed_roles,
        )
        .await
        {
            Ok(ids) => ids,
            Err(e) => {
                warn!("Could not query usermeta table for {}: {}", label, e);
                store.close().await;
                return EnvironmentOutcome::RoleQueryFailed;
            }
        };

        if user_ids.is_empty() {
            warn!("No matching users in {}, skipping", label);
            store.close().await;
            return EnvironmentOutcome::NoQualifyingUsers;
        }
        info!("Tracking users in {}: {:?}", label, user_ids);

        let collector = ChangeCollector::new(env, clock.threshold());
        let extraction = collector.collect(store.as_mut(), &user_ids).await;
        store.close().await;

        let records = match extraction {
            Ok(Extraction::Changes(records)) => records,
            Ok(Extraction::NoChanges) => {
                info!("No changes found in {} since {}", label, clock.threshold());
                return EnvironmentOutcome::NoChanges;
            }
            Err(e) => {
                warn!("Could not query activity log for {}: {}", label, e);
                return EnvironmentOutcome::ActivityQueryFailed;
            }
        };

        let artifact = match self.writer.write(label, &clock.run_label(), &records) {
            Ok(artifact) => artifact,
            Err(e) => {
                error!("Failed to save {} log: {}", label, e);
                return EnvironmentOutcome::WriteFailed;
            }
        };
        info!(
            "{} log(s) saved -> {}",
            records.len(),
            artifact.csv_path.display()
        );

        let notified = match self.notifier {
            Some(notifier) => {
                let notice = ChangeNotice {
                    label: label.to_string(),
                    count: records.len(),
                    file_name: artifact.file_name(),
                    at: Utc::now(),
                };
                match notifier.notify(&notice).await {
                    Ok(()) => true,
                    Err(e) => {
                        warn!("Notification for {} not delivered: {}", label, e);
                        false
                    }
                }
            }
            None => false,
        };

        EnvironmentOutcome::Reported {
            count: records.len(),
            artifact,
            notified,
        }
    }
}
