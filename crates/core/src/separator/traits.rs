//! Trait definitions for the separator module.

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::error::SeparationError;
use super::types::{SeparationOutput, SeparationProgress, SeparationRequest};

/// A source-separation backend.
#[async_trait]
pub trait Separator: Send + Sync {
    /// Returns the name of this separator implementation.
    fn name(&self) -> &str;

    /// Separates one track into stems under `request.work_dir`.
    ///
    /// Progress updates are best-effort; a full or dropped channel does not
    /// affect the separation. Cancelling `cancel` terminates the underlying
    /// process and yields `SeparationError::Cancelled`.
    async fn separate(
        &self,
        request: SeparationRequest,
        progress_tx: Option<mpsc::Sender<SeparationProgress>>,
        cancel: CancellationToken,
    ) -> Result<SeparationOutput, SeparationError>;

    /// Validates that the backend is installed.
    async fn validate(&self) -> Result<(), SeparationError>;
}
