use super::error::TransportError;
use super::http::RateMeter;
use super::transport::{ProgressSender, TransferOutcome};
use bytes::Bytes;
use futures::StreamExt;
use tokio::time::{self, Instant};

const CHUNK_SIZE: usize = 1_000_000; // 1MB chunks

/// Posts `payload` to `url` as a streamed body, reporting the rate at which
/// chunks are handed to the connection.
pub(crate) async fn stream(
    client: &reqwest::Client,
    url: &str,
    deadline: Instant,
    payload: Bytes,
    progress: ProgressSender,
) -> Result<TransferOutcome, TransportError> {
    let len = payload.len();
    let mut meter = RateMeter::new();

    let chunks = futures::stream::iter((0..len).step_by(CHUNK_SIZE))
        .map(move |start| payload.slice(start..(start + CHUNK_SIZE).min(len)))
        .map(move |chunk| {
            if let Some(rate) = meter.record(chunk.len() as u64) {
                // Dropped when the buffer is full.
                let _ = progress.try_send(rate);
            }
            Ok::<Bytes, std::io::Error>(chunk)
        });

    let request = client
        .post(url)
        .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
        .header(reqwest::header::CONTENT_LENGTH, len)
        .body(reqwest::Body::wrap_stream(chunks))
        .send();

    let response = match time::timeout_at(deadline, request).await {
        Ok(response) => response?,
        Err(_) => return Ok(TransferOutcome::Cancelled),
    };
    if !response.status().is_success() {
        return Err(TransportError::Status(response.status()));
    }

    Ok(TransferOutcome::Completed)
}
