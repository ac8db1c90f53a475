use crate::error::Result;
use async_trait::async_trait;

pub mod s3;

pub use s3::S3Storage;

#[async_trait]
pub trait ObjectStorage: Send + Sync + std::fmt::Debug + 'static {
    /// Confirms the configured bucket exists and is reachable with the current credentials.
    ///
    /// # Errors
    /// Returns `AppError::Storage` if the bucket cannot be reached.
    async fn head_bucket(&self) -> Result<()>;
}
