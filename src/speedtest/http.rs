use super::error::TransportError;
use super::transport::{ProgressSender, TransferOutcome, Transport};
use super::{download, ping, upload};
use crate::settings::Endpoints;
use bytes::Bytes;
use std::time::Duration;
use tokio::time::Instant;

/// Minimum spacing between two rate samples.
const SAMPLE_INTERVAL: Duration = Duration::from_millis(100);

/// [`Transport`] over HTTP, speaking the Cloudflare `__down` / `__up` routes.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    endpoints: Endpoints,
}

impl HttpTransport {
    pub fn new(endpoints: Endpoints) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self { client, endpoints })
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }
}

impl Transport for HttpTransport {
    async fn probe(&self) -> Result<Duration, TransportError> {
        ping::probe(&self.client, &self.endpoints.probe_url).await
    }

    async fn stream_download(
        &self,
        deadline: Instant,
        size_hint: u64,
        progress: ProgressSender,
    ) -> Result<TransferOutcome, TransportError> {
        let request = self
            .client
            .get(&self.endpoints.download_url)
            .query(&[("bytes", size_hint)]);
        download::stream(request, deadline, progress).await
    }

    async fn stream_upload(
        &self,
        deadline: Instant,
        payload: Bytes,
        progress: ProgressSender,
    ) -> Result<TransferOutcome, TransportError> {
        upload::stream(&self.client, &self.endpoints.upload_url, deadline, payload, progress).await
    }
}

/// Turns a running byte count into instantaneous byte rates.
#[derive(Debug)]
pub(crate) struct RateMeter {
    transferred: u64,
    last_transferred: u64,
    last_update: Instant,
}

impl RateMeter {
    pub(crate) fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    fn starting_at(now: Instant) -> Self {
        Self {
            transferred: 0,
            last_transferred: 0,
            last_update: now,
        }
    }

    /// Adds `bytes` and returns a rate in bytes per second once at least
    /// [`SAMPLE_INTERVAL`] has passed since the previous sample.
    pub(crate) fn record(&mut self, bytes: u64) -> Option<f64> {
        self.record_at(bytes, Instant::now())
    }

    fn record_at(&mut self, bytes: u64, now: Instant) -> Option<f64> {
        self.transferred += bytes;
        let interval = now.duration_since(self.last_update);
        if interval < SAMPLE_INTERVAL {
            return None;
        }

        let delta = self.transferred - self.last_transferred;
        let rate = delta as f64 / interval.as_secs_f64();
        self.last_update = now;
        self.last_transferred = self.transferred;
        Some(rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meter_waits_for_interval() {
        let start = Instant::now();
        let mut meter = RateMeter::starting_at(start);
        assert_eq!(meter.record_at(1_000, start + Duration::from_millis(50)), None);

        let rate = meter
            .record_at(1_000, start + Duration::from_millis(200))
            .unwrap();
        assert!((rate - 10_000.0).abs() < 1e-6);
    }

    #[test]
    fn meter_measures_since_last_sample() {
        let start = Instant::now();
        let mut meter = RateMeter::starting_at(start);
        meter.record_at(500, start + Duration::from_millis(100));
        let rate = meter
            .record_at(2_000, start + Duration::from_millis(600))
            .unwrap();
        assert!((rate - 4_000.0).abs() < 1e-6);
    }
}
