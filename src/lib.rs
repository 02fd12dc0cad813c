// Public modules
pub mod types;
pub mod error;
pub mod config;
pub mod parsing;
pub mod roles;
pub mod database;
pub mod collector;
pub mod report;
pub mod chat;
pub mod tracker;

// Re-export commonly used items
pub use types::*;
pub use error::{TrackerError, TrackerResult};
pub use config::{load_config, load_config_with, KeyValueFile, MockSettings, SettingsProvider};
pub use parsing::{decode_role_value, unserialize, PhpValue, RoleValue};
pub use roles::{qualifying_users, resolve_privileged_users};
pub use database::{ActivityStore, Connector, MySqlConnector};
pub use collector::{ChangeCollector, Extraction};
pub use report::{ReportWriter, RunArtifact};
pub use chat::{build_chat_payload, ChangeNotice, Notifier, WebhookNotifier};
pub use tracker::{ChangeTracker, EnvironmentOutcome, RunClock, RunSummary};
