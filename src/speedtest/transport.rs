//! The capability the orchestrator needs from a network client.
//!
//! Cancellation is expressed by dropping the returned future. Streaming
//! calls additionally receive the phase deadline so an implementation can
//! stop on its own and report [`TransferOutcome::Cancelled`].

use super::error::TransportError;
use bytes::Bytes;
use std::future::Future;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;

/// How a streamed transfer ended when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferOutcome {
    Completed,
    /// Stopped at the deadline. Not an error.
    Cancelled,
}

/// Sender half used to report instantaneous transfer rates in bytes per second.
pub type ProgressSender = mpsc::Sender<f64>;

pub trait Transport: Send + Sync + 'static {
    /// One lightweight round trip; resolves to its wall-clock duration.
    fn probe(&self) -> impl Future<Output = Result<Duration, TransportError>> + Send;

    /// Fetches a resource of about `size_hint` bytes.
    fn stream_download(
        &self,
        deadline: Instant,
        size_hint: u64,
        progress: ProgressSender,
    ) -> impl Future<Output = Result<TransferOutcome, TransportError>> + Send;

    fn stream_upload(
        &self,
        deadline: Instant,
        payload: Bytes,
        progress: ProgressSender,
    ) -> impl Future<Output = Result<TransferOutcome, TransportError>> + Send;
}

impl<T: Transport> Transport for std::sync::Arc<T> {
    fn probe(&self) -> impl Future<Output = Result<Duration, TransportError>> + Send {
        (**self).probe()
    }

    fn stream_download(
        &self,
        deadline: Instant,
        size_hint: u64,
        progress: ProgressSender,
    ) -> impl Future<Output = Result<TransferOutcome, TransportError>> + Send {
        (**self).stream_download(deadline, size_hint, progress)
    }

    fn stream_upload(
        &self,
        deadline: Instant,
        payload: Bytes,
        progress: ProgressSender,
    ) -> impl Future<Output = Result<TransferOutcome, TransportError>> + Send {
        (**self).stream_upload(deadline, payload, progress)
    }
}
