//! Redis backed [`Store`].

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use tracing::info;
use url::Url;

use crate::cache::Store;
use crate::error::BoxError;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(4);

/// Connection settings for [`RedisStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedisConfig {
    /// `host:port` of the server.
    pub address: String,
    /// Password, if the server requires one.
    pub password: Option<String>,
    /// Logical database index.
    pub db: i64,
}

impl RedisConfig {
    /// Reads `REDIS_ADDR` (required), `REDIS_PASSWORD` and `REDIS_DB`.
    pub fn from_env() -> Result<Self, BoxError> {
        let address =
            std::env::var("REDIS_ADDR").map_err(|_| "missing required env var REDIS_ADDR")?;
        let password = std::env::var("REDIS_PASSWORD")
            .ok()
            .filter(|p| !p.is_empty());
        let db = match std::env::var("REDIS_DB") {
            Ok(value) if !value.is_empty() => value
                .parse()
                .map_err(|_| format!("invalid REDIS_DB value {:?}", value))?,
            _ => 0,
        };

        Ok(Self {
            address,
            password,
            db,
        })
    }

    /// Connection URL, password percent-encoded.
    pub fn url(&self) -> Result<Url, BoxError> {
        let mut url = Url::parse(&format!("redis://{}", self.address))?;
        url.set_password(self.password.as_deref())
            .map_err(|_| "redis address cannot carry a password")?;
        url.set_path(&self.db.to_string());
        Ok(url)
    }
}

/// Store writing entries with `SET ... EX` so Redis owns expiry.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
}

impl RedisStore {
    /// Connects and pings the server, failing if it does not answer in time.
    pub async fn connect(config: &RedisConfig) -> Result<Self, BoxError> {
        let client = redis::Client::open(config.url()?.as_str())?;

        let mut conn = tokio::time::timeout(CONNECT_TIMEOUT, ConnectionManager::new(client))
            .await
            .map_err(|_| "timed out connecting to redis")??;

        let _: String = tokio::time::timeout(
            CONNECT_TIMEOUT,
            redis::cmd("PING").query_async::<_, String>(&mut conn),
        )
        .await
        .map_err(|_| "timed out pinging redis")??;

        info!(address = %config.address, db = config.db, "connected to redis");
        Ok(Self { conn })
    }

    /// Wraps an existing connection manager.
    pub fn from_manager(conn: ConnectionManager) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl Store for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, BoxError> {
        let mut conn = self.conn.clone();
        let value = redis::cmd("GET")
            .arg(key)
            .query_async::<_, Option<Vec<u8>>>(&mut conn)
            .await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), BoxError> {
        let mut conn = self.conn.clone();
        redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("EX")
            .arg(ttl.as_secs().max(1))
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }
}
