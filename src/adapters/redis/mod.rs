use crate::error::Result;
use async_trait::async_trait;

#[async_trait]
pub trait Cache: Send + Sync + std::fmt::Debug + 'static {
    /// Sends `PING` and returns the server's reply.
    ///
    /// # Errors
    /// Returns `AppError::Cache` if the command fails.
    async fn ping(&self) -> Result<String>;
}

#[derive(Clone, Debug)]
pub struct RedisCache {
    connection: redis::aio::ConnectionManager,
}

impl RedisCache {
    /// Opens a managed connection to Redis.
    ///
    /// # Errors
    /// Returns an error if the URL is invalid or the initial connection fails.
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url)?;
        let connection = client.get_connection_manager().await?;
        Ok(Self { connection })
    }
}

#[async_trait]
impl Cache for RedisCache {
    #[tracing::instrument(level = "debug", skip(self), err)]
    async fn ping(&self) -> Result<String> {
        let mut conn = self.connection.clone();
        let reply = redis::cmd("PING").query_async::<String>(&mut conn).await?;
        Ok(reply)
    }
}
