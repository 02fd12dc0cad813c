use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use crate::error::{TrackerError, TrackerResult};
use crate::types::{Config, Environment};

pub const DEFAULT_ENVIRONMENTS: &str = "live,dev";
pub const DEFAULT_ALLOWED_ROLES: &str = "administrator,editor,group_leader,0";
pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 3306;
pub const DEFAULT_TABLE_PREFIX: &str = "wp_";

/// Trait for abstracting settings lookup
pub trait SettingsProvider {
    fn get_var(&self, key: &str) -> Option<String>;
}

/// Settings parsed from a flat `KEY=value` file
#[derive(Debug, Default, Clone)]
pub struct KeyValueFile {
    vars: HashMap<String, String>,
}

impl KeyValueFile {
    pub fn open(path: &Path) -> TrackerResult<Self> {
        if !path.is_file() {
            return Err(TrackerError::ConfigMissing(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path).map_err(|source| TrackerError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content).map_err(|(line, detail)| TrackerError::ConfigParse {
            path: path.to_path_buf(),
            line,
            detail,
        })
    }

    /// Parses INI-style content. Section headers are accepted but do not namespace keys.
    pub fn parse(content: &str) -> Result<Self, (usize, String)> {
        let mut vars = HashMap::new();
        for (idx, raw) in content.lines().enumerate() {
            let line_number = idx + 1;
            let trimmed = raw.trim();
            if trimmed.is_empty() || trimmed.starts_with(';') || trimmed.starts_with('#') {
                continue;
            }
            if trimmed.starts_with('[') && trimmed.ends_with(']') {
                continue;
            }
            let Some(eq_pos) = trimmed.find('=') else {
                return Err((line_number, format!("expected KEY=value, got: {trimmed}")));
            };
            let key = trimmed[..eq_pos].trim();
            if key.is_empty() {
                return Err((line_number, "empty key".to_string()));
            }
            let value = strip_quotes(trimmed[eq_pos + 1..].trim());
            vars.insert(key.to_string(), value);
        }
        Ok(Self { vars })
    }
}

impl SettingsProvider for KeyValueFile {
    fn get_var(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }
}

/// Mock implementation for testing
#[derive(Debug, Default)]
pub struct MockSettings {
    vars: HashMap<String, String>,
}

impl MockSettings {
    pub fn new() -> Self {
        Self {
            vars: HashMap::new(),
        }
    }

    pub fn set_var<K, V>(&mut self, key: K, value: V) -> &mut Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.vars.insert(key.into(), value.into());
        self
    }

    pub fn with_var<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.set_var(key, value);
        self
    }
}

impl SettingsProvider for MockSettings {
    fn get_var(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }
}

fn strip_quotes(s: &str) -> String {
    let bytes = s.as_bytes();
    if bytes.len() >= 2 {
        let first = bytes[0];
        let last = bytes[bytes.len() - 1];
        if (first == b'"' && last == b'"') || (first == b'\'' && last == b'\'') {
            return s[1..s.len() - 1].to_string();
        }
    }
    s.to_string()
}

pub fn load_config(path: &Path) -> TrackerResult<Config> {
    let file = KeyValueFile::open(path)?;
    Ok(load_config_with(&file))
}

/// Builds the run configuration. Missing keys fall back to defaults; bad
/// credentials surface later at connect time.
pub fn load_config_with<S: SettingsProvider>(settings: &S) -> Config {
    let labels = split_list(
        &settings
            .get_var("ENVIRONMENTS")
            .unwrap_or_else(|| DEFAULT_ENVIRONMENTS.to_string()),
    );
    let environments = labels
        .into_iter()
        .map(|label| environment_for(settings, label))
        .collect();

    let webhook_url = settings
        .get_var("GOOGLE_CHAT_WEBHOOK")
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());

    let allowed_roles = split_list(
        &settings
            .get_var("ALLOWED_ROLES")
            .unwrap_or_else(|| DEFAULT_ALLOWED_ROLES.to_string()),
    );

    Config {
        environments,
        webhook_url,
        allowed_roles,
        connect_timeout: seconds(settings, "DB_CONNECT_TIMEOUT_SECS", 10),
        query_timeout: seconds(settings, "DB_QUERY_TIMEOUT_SECS", 30),
        webhook_timeout: seconds(settings, "WEBHOOK_TIMEOUT_SECS", 15),
    }
}

fn environment_for<S: SettingsProvider>(settings: &S, label: String) -> Environment {
    let key = |suffix: &str| format!("{}_DB_{}", label.to_uppercase(), suffix);
    Environment {
        host: settings
            .get_var(&key("HOST"))
            .unwrap_or_else(|| DEFAULT_HOST.to_string()),
        port: settings
            .get_var(&key("PORT"))
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(DEFAULT_PORT),
        database: settings.get_var(&key("NAME")).unwrap_or_default(),
        user: settings.get_var(&key("USER")).unwrap_or_default(),
        password: settings.get_var(&key("PASS")).unwrap_or_default(),
        table_prefix: settings
            .get_var(&key("PREFIX"))
            .unwrap_or_else(|| DEFAULT_TABLE_PREFIX.to_string()),
        label,
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn seconds<S: SettingsProvider>(settings: &S, key: &str, default: u64) -> Duration {
    let secs = settings
        .get_var(key)
        .and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(default);
    Duration::from_secs(secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = load_config_with(&MockSettings::new());

        let labels: Vec<&str> = config.environments.iter().map(|e| e.label.as_str()).collect();
        assert_eq!(labels, vec!["live", "dev"]);
        for env in &config.environments {
            assert_eq!(env.host, "localhost");
            assert_eq!(env.port, 3306);
            assert_eq!(env.database, "");
            assert_eq!(env.user, "");
            assert_eq!(env.password, "");
            assert_eq!(env.table_prefix, "wp_");
        }
        assert_eq!(config.webhook_url, None);
        assert_eq!(
            config.allowed_roles,
            vec!["administrator", "editor", "group_leader", "0"]
        );
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert_eq!(config.query_timeout, Duration::from_secs(30));
        assert_eq!(config.webhook_timeout, Duration::from_secs(15));
    }

    #[test]
    fn test_config_per_environment_keys() {
        let settings = MockSettings::new()
            .with_var("LIVE_DB_HOST", "db.live.internal")
            .with_var("LIVE_DB_PORT", "3307")
            .with_var("LIVE_DB_NAME", "wordpress")
            .with_var("LIVE_DB_USER", "tracker")
            .with_var("LIVE_DB_PASS", "s3cret")
            .with_var("LIVE_DB_PREFIX", "site_")
            .with_var("DEV_DB_PORT", "not-a-port")
            .with_var("GOOGLE_CHAT_WEBHOOK", "https://chat.googleapis.com/v1/spaces/x");

        let config = load_config_with(&settings);

        let live = &config.environments[0];
        assert_eq!(live.host, "db.live.internal");
        assert_eq!(live.port, 3307);
        assert_eq!(live.database, "wordpress");
        assert_eq!(live.user, "tracker");
        assert_eq!(live.password, "s3cret");
        assert_eq!(live.usermeta_table(), "site_usermeta");
        assert_eq!(live.stream_table(), "site_stream");

        let dev = &config.environments[1];
        assert_eq!(dev.port, 3306);
        assert_eq!(dev.table_prefix, "wp_");
        assert_eq!(
            config.webhook_url.as_deref(),
            Some("https://chat.googleapis.com/v1/spaces/x")
        );
    }

    #[test]
    fn test_config_custom_environments() {
        let settings = MockSettings::new()
            .with_var("ENVIRONMENTS", " live , staging ,, dev ")
            .with_var("STAGING_DB_NAME", "wp_staging");

        let config = load_config_with(&settings);
        let labels: Vec<&str> = config.environments.iter().map(|e| e.label.as_str()).collect();
        assert_eq!(labels, vec!["live", "staging", "dev"]);
        assert_eq!(config.environments[1].database, "wp_staging");
    }

    #[test]
    fn test_blank_webhook_disables_notifications() {
        let settings = MockSettings::new().with_var("GOOGLE_CHAT_WEBHOOK", "   ");
        assert_eq!(load_config_with(&settings).webhook_url, None);
    }

    #[test]
    fn test_invalid_timeouts_fall_back() {
        let settings = MockSettings::new()
            .with_var("DB_CONNECT_TIMEOUT_SECS", "soon")
            .with_var("WEBHOOK_TIMEOUT_SECS", "0")
            .with_var("DB_QUERY_TIMEOUT_SECS", "5");

        let config = load_config_with(&settings);
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert_eq!(config.webhook_timeout, Duration::from_secs(15));
        assert_eq!(config.query_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_parse_ini_content() {
        let content = "\
; deployment settings
[database]
LIVE_DB_HOST = db.example.com
LIVE_DB_PASS = \"p@ss=word\"
# comment
DEV_DB_USER='dev'

GOOGLE_CHAT_WEBHOOK=
";
        let file = KeyValueFile::parse(content).unwrap();
        assert_eq!(file.get_var("LIVE_DB_HOST").as_deref(), Some("db.example.com"));
        assert_eq!(file.get_var("LIVE_DB_PASS").as_deref(), Some("p@ss=word"));
        assert_eq!(file.get_var("DEV_DB_USER").as_deref(), Some("dev"));
        assert_eq!(file.get_var("GOOGLE_CHAT_WEBHOOK").as_deref(), Some(""));
        assert_eq!(file.get_var("database"), None);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let err = KeyValueFile::parse("LIVE_DB_HOST=x\nnot a setting\n").unwrap_err();
        assert_eq!(err.0, 2);

        let err = KeyValueFile::parse("=value").unwrap_err();
        assert!(err.1.contains("empty key"));
    }

    #[test]
    fn test_load_config_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.conf");
        let err = load_config(&path).unwrap_err();
        assert!(matches!(err, TrackerError::ConfigMissing(_)));
        assert!(err.to_string().contains("absent.conf"));
    }

    #[test]
    fn test_load_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wp-deployment.conf");
        std::fs::write(&path, "LIVE_DB_NAME=wordpress\nALLOWED_ROLES=administrator\n").unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.environments[0].database, "wordpress");
        assert_eq!(config.allowed_roles, vec!["administrator"]);
    }
}
