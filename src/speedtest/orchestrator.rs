//! Sequences the ping, download and upload phases of a run and publishes
//! every state change as a fresh [`TestSnapshot`].
//!
//! A run is driven by a single task. Transports report progress over a
//! bounded channel that this task drains, so only the run task ever writes
//! the sample buffers or replaces the snapshot.

use super::error::{SpeedTestError, SpeedTestResult};
use super::ping::{self, PingSummary};
use super::transport::{TransferOutcome, Transport};
use super::units::{self, Measurement};
use super::{payload, stats, Direction, PhaseStatus, TestSnapshot};
use crate::settings::TestConfiguration;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::{self, JoinHandle};
use tokio::time::{self, Instant};
use tracing::{debug, error, info, warn};

const PROGRESS_BUFFER: usize = 64;

/// Raw samples of one run. Discarded when the run ends.
#[derive(Debug, Default)]
struct SampleBuffer {
    ping: Vec<f64>,
    download: Vec<f64>,
    upload: Vec<f64>,
}

impl SampleBuffer {
    fn rates_mut(&mut self, direction: Direction) -> &mut Vec<f64> {
        match direction {
            Direction::Download => &mut self.download,
            Direction::Upload => &mut self.upload,
        }
    }
}

pub struct SpeedTest<T> {
    transport: T,
    config: TestConfiguration,
    snapshot: watch::Sender<TestSnapshot>,
}

impl<T: Transport> SpeedTest<T> {
    pub fn new(transport: T, config: TestConfiguration) -> Self {
        let (snapshot, _) = watch::channel(TestSnapshot::default());
        Self {
            transport,
            config,
            snapshot,
        }
    }

    pub fn config(&self) -> &TestConfiguration {
        &self.config
    }

    pub fn subscribe(&self) -> watch::Receiver<TestSnapshot> {
        self.snapshot.subscribe()
    }

    pub fn snapshot(&self) -> TestSnapshot {
        self.snapshot.borrow().clone()
    }

    /// Starts a run in the background. Returns `None`, leaving the current
    /// run untouched, when one is already active.
    pub fn start_test(self: &Arc<Self>) -> Option<JoinHandle<TestSnapshot>> {
        if !self.try_begin() {
            return None;
        }
        let this = Arc::clone(self);
        Some(tokio::spawn(async move { this.execute().await }))
    }

    /// Runs a full test on the current task and returns the terminal
    /// snapshot. Failures of the run itself end up in the snapshot; the only
    /// error returned here is [`SpeedTestError::AlreadyRunning`].
    pub async fn run_test(&self) -> SpeedTestResult<TestSnapshot> {
        if !self.try_begin() {
            return Err(SpeedTestError::AlreadyRunning);
        }
        Ok(self.execute().await)
    }

    /// Atomically claims the run slot and resets the snapshot.
    fn try_begin(&self) -> bool {
        let claimed = self.snapshot.send_if_modified(|current| {
            if current.is_running {
                return false;
            }
            *current = TestSnapshot {
                sequence: current.sequence + 1,
                is_running: true,
                ..TestSnapshot::default()
            };
            true
        });

        if !claimed {
            warn!("please wait for the previous test to complete");
        }
        claimed
    }

    async fn execute(&self) -> TestSnapshot {
        let mut samples = SampleBuffer::default();

        match self.run_phases(&mut samples).await {
            Ok(snapshot) => {
                info!(
                    ping = %snapshot.ping,
                    jitter = %snapshot.jitter,
                    download = %snapshot.download_speed,
                    upload = %snapshot.upload_speed,
                    "speed test completed"
                );
                snapshot
            }
            Err(err) => {
                error!(error = %err, "speed test failed");
                self.publish(|s| {
                    s.is_error = true;
                    s.is_running = false;
                    s.is_completed = true;
                })
            }
        }
    }

    /// Returns the terminal snapshot, which is also the last one this run
    /// publishes. Once it is out the run slot is free again.
    async fn run_phases(&self, samples: &mut SampleBuffer) -> SpeedTestResult<TestSnapshot> {
        let summary = self.ping_phase(samples).await?;
        info!(ping_ms = summary.ping_ms, jitter_ms = summary.jitter_ms, "ping phase done");
        self.publish(|s| {
            s.ping = Measurement::millis(summary.ping_ms);
            s.jitter = Measurement::millis(summary.jitter_ms);
            s.ping_status = PhaseStatus::Completed;
            s.download_status = PhaseStatus::Running;
        });

        self.transfer_phase(Direction::Download, samples).await?;
        self.publish(|s| {
            s.download_status = PhaseStatus::Completed;
            s.upload_status = PhaseStatus::Running;
        });

        self.transfer_phase(Direction::Upload, samples).await?;
        Ok(self.publish(|s| {
            s.upload_status = PhaseStatus::Completed;
            s.is_error = false;
            s.is_running = false;
            s.is_completed = true;
        }))
    }

    /// Probes strictly one after another so no probe competes with another.
    async fn ping_phase(&self, samples: &mut SampleBuffer) -> SpeedTestResult<PingSummary> {
        self.publish(|s| s.ping_status = PhaseStatus::Running);

        for attempt in 0..self.config.ping_frequency() {
            match self.transport.probe().await {
                Ok(elapsed) => samples.ping.push(elapsed.as_secs_f64() * 1000.0),
                Err(err) => {
                    debug!(attempt, error = %err, "probe failed");
                    samples.ping.push(0.0);
                }
            }
        }

        ping::summarize(&samples.ping)
    }

    async fn transfer_phase(
        &self,
        direction: Direction,
        samples: &mut SampleBuffer,
    ) -> SpeedTestResult<()> {
        let payload = match direction {
            Direction::Download => None,
            Direction::Upload => {
                let size = self.config.upload_size_bytes();
                Some(task::spawn_blocking(move || payload::generate(size)).await?)
            }
        };

        let deadline = Instant::now() + self.config.test_duration();
        let (progress_tx, mut progress_rx) = mpsc::channel(PROGRESS_BUFFER);
        let rates = samples.rates_mut(direction);

        let mut transfer = Box::pin(async {
            match payload {
                None => {
                    self.transport
                        .stream_download(deadline, self.config.download_size_bytes(), progress_tx)
                        .await
                }
                Some(payload) => {
                    self.transport
                        .stream_upload(deadline, payload, progress_tx)
                        .await
                }
            }
        });
        let expiry = time::sleep_until(deadline);
        tokio::pin!(expiry);

        let outcome = loop {
            tokio::select! {
                biased;
                Some(byte_rate) = progress_rx.recv() => {
                    self.record_progress(direction, rates, byte_rate);
                }
                result = &mut transfer => break result?,
                () = &mut expiry => break TransferOutcome::Cancelled,
            }
        };
        drop(transfer);

        // Rates posted before the transfer stopped still count.
        while let Ok(byte_rate) = progress_rx.try_recv() {
            self.record_progress(direction, rates, byte_rate);
        }

        match outcome {
            TransferOutcome::Completed => {
                info!(%direction, samples = rates.len(), "transfer finished")
            }
            TransferOutcome::Cancelled => {
                info!(%direction, samples = rates.len(), "transfer stopped at deadline")
            }
        }

        let rate = stats::trimmed_mean_rate(rates)?;
        let speed = units::normalize(rate, self.config.speed_unit());
        info!(%direction, %speed, "throughput");
        self.publish(|s| *direction.speed_mut(s) = speed);

        Ok(())
    }

    fn record_progress(&self, direction: Direction, rates: &mut Vec<f64>, byte_rate: f64) {
        let bit_rate = byte_rate * 8.0;
        rates.push(bit_rate);

        let speed = units::normalize(bit_rate, self.config.speed_unit());
        debug!(%direction, %speed, "progress");
        self.publish(|s| *direction.speed_mut(s) = speed);
    }

    /// Replaces the snapshot with an updated copy and returns that copy.
    fn publish(&self, update: impl FnOnce(&mut TestSnapshot)) -> TestSnapshot {
        let mut next = self.snapshot.borrow().clone();
        update(&mut next);
        next.sequence += 1;
        self.snapshot.send_replace(next.clone());
        next
    }
}
