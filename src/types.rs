use std::fmt;
use std::time::Duration;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone)]
pub struct Config {
    pub environments: Vec<Environment>,
    pub webhook_url: Option<String>,
    pub allowed_roles: Vec<String>,
    pub connect_timeout: Duration,
    pub query_timeout: Duration,
    pub webhook_timeout: Duration,
}

/// One tracked WordPress database.
#[derive(Clone, PartialEq, Eq)]
pub struct Environment {
    pub label: String,
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
    pub table_prefix: String,
}

impl Environment {
    pub fn usermeta_table(&self) -> String {
        format!("{}usermeta", self.table_prefix)
    }

    pub fn stream_table(&self) -> String {
        format!("{}stream", self.table_prefix)
    }
}

// Keeps credentials out of log lines.
impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment")
            .field("label", &self.label)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"****")
            .field("table_prefix", &self.table_prefix)
            .finish()
    }
}

/// A `*_capabilities` row from the user metadata table.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct CapabilityRow {
    pub user_id: u64,
    pub meta_value: Option<String>,
}

/// A single entry of the activity log. Field order is the artifact column order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ActivityRecord {
    #[serde(with = "created_format")]
    pub created: NaiveDateTime,
    pub user_id: u64,
    pub summary: String,
    pub action: String,
    pub context: String,
}

pub const ACTIVITY_COLUMNS: [&str; 5] = ["created", "user_id", "summary", "action", "context"];

mod created_format {
    use chrono::NaiveDateTime;
    use serde::{self, Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%d %H:%M:%S";

    pub fn serialize<S>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&s, FORMAT).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Serialize)]
pub struct ChatPayload {
    pub text: String,
}
