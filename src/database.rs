use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection};
use sqlx::{ConnectOptions, Connection};
use tracing::{debug, warn};

use crate::error::{TrackerError, TrackerResult};
use crate::types::{ActivityRecord, CapabilityRow, Environment};

/// Opens a connection to one environment's database.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, env: &Environment) -> TrackerResult<Box<dyn ActivityStore>>;
}

/// The two reads the tracker needs from a WordPress database.
#[async_trait]
pub trait ActivityStore: Send {
    /// All `*_capabilities` rows from the user metadata table.
    async fn capability_rows(&mut self, usermeta_table: &str) -> TrackerResult<Vec<CapabilityRow>>;

    /// Activity by `user_ids` at or after `since`, oldest first.
    async fn activity_since(
        &mut self,
        stream_table: &str,
        user_ids: &[u64],
        since: NaiveDateTime,
    ) -> TrackerResult<Vec<ActivityRecord>>;

    async fn close(self: Box<Self>);
}

pub struct MySqlConnector {
    connect_timeout: Duration,
    query_timeout: Duration,
}

impl MySqlConnector {
    pub fn new(connect_timeout: Duration, query_timeout: Duration) -> Self {
        Self {
            connect_timeout,
            query_timeout,
        }
    }
}

#[async_trait]
impl Connector for MySqlConnector {
    async fn connect(&self, env: &Environment) -> TrackerResult<Box<dyn ActivityStore>> {
        debug!(
            label = %env.label,
            host = %env.host,
            port = env.port,
            database = %env.database,
            "Connecting to MySQL"
        );
        let options = MySqlConnectOptions::new()
            .host(&env.host)
            .port(env.port)
            .username(&env.user)
            .password(&env.password)
            .database(&env.database);

        let conn = bounded("connect", self.connect_timeout, options.connect())
            .await?
            .map_err(|source| TrackerError::Connect {
                label: env.label.clone(),
                source,
            })?;

        Ok(Box::new(MySqlActivityStore {
            conn,
            query_timeout: self.query_timeout,
        }))
    }
}

pub struct MySqlActivityStore {
    conn: MySqlConnection,
    query_timeout: Duration,
}

#[async_trait]
impl ActivityStore for MySqlActivityStore {
    async fn capability_rows(&mut self, usermeta_table: &str) -> TrackerResult<Vec<CapabilityRow>> {
        let sql = format!(
            "SELECT CAST(user_id AS UNSIGNED) AS user_id, meta_value \
             FROM {} WHERE meta_key LIKE ?",
            quote_identifier(usermeta_table)
        );
        let query = sqlx::query_as::<_, CapabilityRow>(&sql)
            .bind("%\\_capabilities")
            .fetch_all(&mut self.conn);

        bounded("usermeta query", self.query_timeout, query)
            .await?
            .map_err(|source| TrackerError::Query {
                table: usermeta_table.to_string(),
                source,
            })
    }

    async fn activity_since(
        &mut self,
        stream_table: &str,
        user_ids: &[u64],
        since: NaiveDateTime,
    ) -> TrackerResult<Vec<ActivityRecord>> {
        let sql = activity_sql(stream_table, user_ids.len());
        let mut query = sqlx::query_as::<_, ActivityRecord>(&sql);
        for id in user_ids {
            query = query.bind(*id);
        }
        let query = query.bind(since).fetch_all(&mut self.conn);

        bounded("stream query", self.query_timeout, query)
            .await?
            .map_err(|source| TrackerError::Query {
                table: stream_table.to_string(),
                source,
            })
    }

    async fn close(self: Box<Self>) {
        let store = *self;
        match bounded("close", store.query_timeout, store.conn.close()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("Error closing connection: {}", e),
            Err(e) => warn!("Connection dropped without clean close: {}", e),
        }
    }
}

fn activity_sql(stream_table: &str, id_count: usize) -> String {
    let placeholders = vec!["?"; id_count].join(", ");
    format!(
        "SELECT created, CAST(user_id AS UNSIGNED) AS user_id, summary, action, context \
         FROM {} WHERE user_id IN ({}) AND created >= ? ORDER BY created ASC",
        quote_identifier(stream_table),
        placeholders
    )
}

// Table names come from config, so they are quoted rather than trusted.
fn quote_identifier(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

async fn bounded<F, T>(operation: &'static str, after: Duration, fut: F) -> TrackerResult<T>
where
    F: Future<Output = T>,
{
    tokio::time::timeout(after, fut)
        .await
        .map_err(|_| TrackerError::Timeout { operation, after })
}
