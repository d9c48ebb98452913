//! Per-invocation context: correlation id and cancellation.

use crate::Error;
use std::future::Future;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Context passed to every handler invocation.
///
/// Cloning shares the cancellation token, so cancelling any clone aborts
/// the in-flight request, including a stream that is waiting on the network.
#[derive(Debug, Clone)]
pub struct InvokeContext {
    request_id: Uuid,
    cancel: CancellationToken,
}

impl InvokeContext {
    /// Create a context with a fresh request id and its own cancellation token.
    pub fn new() -> Self {
        Self::with_cancellation(CancellationToken::new())
    }

    /// Create a context observing an existing token (e.g. a child of a server-wide token).
    pub fn with_cancellation(cancel: CancellationToken) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            cancel,
        }
    }

    /// Correlation id used in logs and as a fallback response id.
    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Request cancellation of the invocation.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Run `fut`, abandoning it with [`Error::Cancelled`] if the context is cancelled first.
    pub async fn guard<F, T>(&self, fut: F) -> Result<T, Error>
    where
        F: Future<Output = Result<T, Error>>,
    {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(Error::Cancelled),
            result = fut => result,
        }
    }
}

impl Default for InvokeContext {
    fn default() -> Self {
        Self::new()
    }
}
