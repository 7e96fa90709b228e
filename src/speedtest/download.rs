use super::error::TransportError;
use super::http::RateMeter;
use super::transport::{ProgressSender, TransferOutcome};
use futures::StreamExt;
use tokio::time::{self, Instant};

/// Sends `request` and streams the response body, reporting byte rates until
/// the body ends or `deadline` passes.
pub(crate) async fn stream(
    request: reqwest::RequestBuilder,
    deadline: Instant,
    progress: ProgressSender,
) -> Result<TransferOutcome, TransportError> {
    let response = match time::timeout_at(deadline, request.send()).await {
        Ok(response) => response?,
        Err(_) => return Ok(TransferOutcome::Cancelled),
    };
    if !response.status().is_success() {
        return Err(TransportError::Status(response.status()));
    }

    let mut stream = response.bytes_stream();
    let mut meter = RateMeter::new();

    loop {
        let chunk = match time::timeout_at(deadline, stream.next()).await {
            Err(_) => return Ok(TransferOutcome::Cancelled),
            Ok(None) => break,
            Ok(Some(chunk)) => chunk?,
        };

        if let Some(rate) = meter.record(chunk.len() as u64) {
            if progress.send(rate).await.is_err() {
                // Nobody is listening anymore.
                return Ok(TransferOutcome::Cancelled);
            }
        }
    }

    Ok(TransferOutcome::Completed)
}
