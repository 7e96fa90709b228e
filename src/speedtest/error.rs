use thiserror::Error;

/// Failure reported by a [`Transport`](super::transport::Transport).
///
/// Cancellation is never an error; it is reported as
/// [`TransferOutcome::Cancelled`](super::transport::TransferOutcome).
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected status: {0}")]
    Status(reqwest::StatusCode),
    #[error("transport error: {0}")]
    Other(String),
}

#[derive(Debug, Error)]
pub enum SpeedTestError {
    #[error("insufficient ping samples: {usable} usable, at least 4 required")]
    InsufficientPingSamples { usable: usize },
    #[error("insufficient samples: {found} found, at least {needed} required")]
    InsufficientSamples { needed: usize, found: usize },
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("payload generation failed: {0}")]
    Payload(#[from] tokio::task::JoinError),
    #[error("a test is already running")]
    AlreadyRunning,
}

pub type SpeedTestResult<T> = Result<T, SpeedTestError>;
