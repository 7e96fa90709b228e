pub mod download;
pub mod error;
pub mod http;
pub mod orchestrator;
pub mod payload;
pub mod ping;
pub mod stats;
pub mod transport;
pub mod units;
pub mod upload;

pub use error::{SpeedTestError, SpeedTestResult, TransportError};
pub use http::HttpTransport;
pub use orchestrator::SpeedTest;
pub use transport::{ProgressSender, TransferOutcome, Transport};
pub use units::{Measurement, Unit};

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PhaseStatus {
    #[default]
    Stale,
    Running,
    Completed,
}

impl fmt::Display for PhaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PhaseStatus::Stale => write!(f, "stale"),
            PhaseStatus::Running => write!(f, "running"),
            PhaseStatus::Completed => write!(f, "completed"),
        }
    }
}

/// Which way a throughput phase moves data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Download,
    Upload,
}

impl Direction {
    pub(crate) fn speed_mut(self, snapshot: &mut TestSnapshot) -> &mut Measurement {
        match self {
            Direction::Download => &mut snapshot.download_speed,
            Direction::Upload => &mut snapshot.upload_speed,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Download => write!(f, "download"),
            Direction::Upload => write!(f, "upload"),
        }
    }
}

/// Coarse position of a run, derived from a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestPhase {
    Idle,
    Ping,
    Download,
    Upload,
    Complete,
    Failed,
}

/// Full observable state of a run at one instant.
///
/// `sequence` increases by one on every published replacement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestSnapshot {
    pub sequence: u64,
    pub ping: Measurement,
    pub jitter: Measurement,
    pub download_speed: Measurement,
    pub upload_speed: Measurement,
    pub ping_status: PhaseStatus,
    pub download_status: PhaseStatus,
    pub upload_status: PhaseStatus,
    pub is_running: bool,
    pub is_error: bool,
    pub is_completed: bool,
}

impl Default for TestSnapshot {
    fn default() -> Self {
        Self {
            sequence: 0,
            ping: Measurement::millis(0.0),
            jitter: Measurement::millis(0.0),
            download_speed: Measurement::zero_rate(),
            upload_speed: Measurement::zero_rate(),
            ping_status: PhaseStatus::Stale,
            download_status: PhaseStatus::Stale,
            upload_status: PhaseStatus::Stale,
            is_running: false,
            is_error: false,
            is_completed: false,
        }
    }
}

impl TestSnapshot {
    pub fn phase(&self) -> TestPhase {
        if self.is_error {
            TestPhase::Failed
        } else if self.is_completed {
            TestPhase::Complete
        } else if self.upload_status == PhaseStatus::Running {
            TestPhase::Upload
        } else if self.download_status == PhaseStatus::Running {
            TestPhase::Download
        } else if self.is_running {
            TestPhase::Ping
        } else {
            TestPhase::Idle
        }
    }
}
