use std::time::Duration;

use composer_core::config::RedisSettings;
use composer_core::{ComposerError, ComposerResult};
use redis::aio::ConnectionManager;
use redis::{Client, FromRedisValue, Script};
use tokio::time::{sleep, timeout};
use tracing::{debug, error, warn};

/// Shared multiplexed connection with reconnect-on-failure.
#[derive(Clone)]
pub struct RedisConnectionManager {
    connection: ConnectionManager,
    settings: RedisSettings,
}

impl RedisConnectionManager {
    pub async fn new(settings: RedisSettings) -> ComposerResult<Self> {
        let client = Client::open(settings.url.as_str()).map_err(|e| {
            ComposerError::ClusterStore(format!("failed to create Redis client: {e}"))
        })?;

        let connection = Self::connect_with_retry(&client, &settings).await?;
        let manager = Self {
            connection,
            settings,
        };
        manager.ping().await?;
        debug!(redis.url = %manager.settings.url, "connected to Redis");
        Ok(manager)
    }

    async fn connect_with_retry(
        client: &Client,
        settings: &RedisSettings,
    ) -> ComposerResult<ConnectionManager> {
        let connect_timeout = Duration::from_secs(settings.connection_timeout_seconds);
        let mut last_error = String::from("no connection attempt made");

        for attempt in 1..=settings.max_retry_attempts {
            match timeout(connect_timeout, ConnectionManager::new(client.clone())).await {
                Ok(Ok(connection)) => {
                    if attempt > 1 {
                        debug!(attempt, "reconnected to Redis");
                    }
                    return Ok(connection);
                }
                Ok(Err(e)) => last_error = e.to_string(),
                Err(_) => last_error = format!("timed out after {connect_timeout:?}"),
            }

            if attempt < settings.max_retry_attempts {
                warn!(
                    "failed to connect to Redis (attempt {}/{}): {}. Retrying in {}s",
                    attempt, settings.max_retry_attempts, last_error, settings.retry_delay_seconds
                );
                sleep(Duration::from_secs(settings.retry_delay_seconds)).await;
            }
        }

        let message = format!(
            "failed to connect to Redis after {} attempts: {last_error}",
            settings.max_retry_attempts
        );
        error!("{message}");
        Err(ComposerError::ClusterStore(message))
    }

    pub async fn ping(&self) -> ComposerResult<()> {
        let response: String = self.execute(&mut redis::cmd("PING")).await?;
        if response == "PONG" {
            Ok(())
        } else {
            Err(ComposerError::ClusterStore(format!(
                "unexpected PING response: {response}"
            )))
        }
    }

    pub async fn execute<T: FromRedisValue>(&self, cmd: &mut redis::Cmd) -> ComposerResult<T> {
        let mut connection = self.connection.clone();
        cmd.query_async(&mut connection)
            .await
            .map_err(|e| ComposerError::ClusterStore(format!("Redis command failed: {e}")))
    }

    pub async fn run_script<T: FromRedisValue>(
        &self,
        script: &Script,
        keys: &[&str],
        args: &[&str],
    ) -> ComposerResult<T> {
        let mut invocation = script.prepare_invoke();
        for key in keys {
            invocation.key(*key);
        }
        for arg in args {
            invocation.arg(*arg);
        }
        let mut connection = self.connection.clone();
        invocation
            .invoke_async(&mut connection)
            .await
            .map_err(|e| ComposerError::ClusterStore(format!("Redis script failed: {e}")))
    }

    pub fn key(&self, kind: &str, name: &str) -> String {
        format!("{}:{kind}:{name}", self.settings.key_prefix)
    }
}
