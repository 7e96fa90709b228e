use clap::ValueEnum;
use serde::Serialize;
use std::fmt;
use std::time::Duration;

pub const PING_FREQUENCY_RANGE: (u32, u32) = (5, 10);
pub const TEST_DURATION_RANGE: (u32, u32) = (15, 60);

const DEFAULT_PING_FREQUENCY: u32 = 10;
const DEFAULT_TEST_DURATION_SECS: u32 = 20;

pub const DEFAULT_SERVER: &str = "https://speed.cloudflare.com";
const DEFAULT_DOWNLOAD_BYTES: u64 = 1_000_000_000;
const DEFAULT_UPLOAD_BYTES: usize = 1_000_000_000;

/// Display unit for throughput measurements.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeedUnit {
    /// Mbps at or above one megabit per second, Kbps below.
    #[default]
    Auto,
    Kbps,
    Mbps,
}

impl SpeedUnit {
    pub fn next(self) -> Self {
        match self {
            SpeedUnit::Auto => SpeedUnit::Kbps,
            SpeedUnit::Kbps => SpeedUnit::Mbps,
            SpeedUnit::Mbps => SpeedUnit::Auto,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            SpeedUnit::Auto => SpeedUnit::Mbps,
            SpeedUnit::Kbps => SpeedUnit::Auto,
            SpeedUnit::Mbps => SpeedUnit::Kbps,
        }
    }
}

impl fmt::Display for SpeedUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpeedUnit::Auto => write!(f, "auto"),
            SpeedUnit::Kbps => write!(f, "Kbps"),
            SpeedUnit::Mbps => write!(f, "Mbps"),
        }
    }
}

/// Immutable parameters of a test run.
///
/// Out-of-range values are clamped to the nearest bound at construction,
/// never rejected. An explicit `0` therefore lands on the lower bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TestConfiguration {
    ping_frequency: u32,
    test_duration_secs: u32,
    speed_unit: SpeedUnit,
    download_size_bytes: u64,
    upload_size_bytes: usize,
}

impl Default for TestConfiguration {
    fn default() -> Self {
        Self::new(
            DEFAULT_PING_FREQUENCY,
            DEFAULT_TEST_DURATION_SECS,
            SpeedUnit::default(),
        )
    }
}

impl TestConfiguration {
    pub fn new(ping_frequency: u32, test_duration_secs: u32, speed_unit: SpeedUnit) -> Self {
        Self {
            ping_frequency: PING_FREQUENCY_RANGE.0,
            test_duration_secs: TEST_DURATION_RANGE.0,
            speed_unit,
            download_size_bytes: DEFAULT_DOWNLOAD_BYTES,
            upload_size_bytes: DEFAULT_UPLOAD_BYTES,
        }
        .with_ping_frequency(ping_frequency)
        .with_test_duration_secs(test_duration_secs)
    }

    pub fn ping_frequency(&self) -> u32 {
        self.ping_frequency
    }

    pub fn test_duration_secs(&self) -> u32 {
        self.test_duration_secs
    }

    pub fn test_duration(&self) -> Duration {
        Duration::from_secs(u64::from(self.test_duration_secs))
    }

    pub fn speed_unit(&self) -> SpeedUnit {
        self.speed_unit
    }

    /// Size of the resource requested during the download phase.
    pub fn download_size_bytes(&self) -> u64 {
        self.download_size_bytes
    }

    /// Size of the body sent during the upload phase.
    pub fn upload_size_bytes(&self) -> usize {
        self.upload_size_bytes
    }

    pub fn with_ping_frequency(self, ping_frequency: u32) -> Self {
        Self {
            ping_frequency: ping_frequency.clamp(PING_FREQUENCY_RANGE.0, PING_FREQUENCY_RANGE.1),
            ..self
        }
    }

    pub fn with_test_duration_secs(self, test_duration_secs: u32) -> Self {
        Self {
            test_duration_secs: test_duration_secs
                .clamp(TEST_DURATION_RANGE.0, TEST_DURATION_RANGE.1),
            ..self
        }
    }

    pub fn with_speed_unit(self, speed_unit: SpeedUnit) -> Self {
        Self { speed_unit, ..self }
    }

    pub fn with_download_size_bytes(self, download_size_bytes: u64) -> Self {
        Self {
            download_size_bytes,
            ..self
        }
    }

    pub fn with_upload_size_bytes(self, upload_size_bytes: usize) -> Self {
        Self {
            upload_size_bytes,
            ..self
        }
    }
}

/// Where the HTTP transport sends its probe, download and upload requests.
///
/// The download route takes the requested size as a `bytes` query parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub probe_url: String,
    pub download_url: String,
    pub upload_url: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self::for_server(DEFAULT_SERVER)
    }
}

impl Endpoints {
    /// Builds the Cloudflare-style `__down` / `__up` routes under `server`.
    pub fn for_server(server: &str) -> Self {
        let base = server.trim_end_matches('/');
        Self {
            probe_url: format!("{base}/__down?bytes=0"),
            download_url: format!("{base}/__down"),
            upload_url: format!("{base}/__up"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsField {
    PingFrequency,
    TestDuration,
    SpeedUnit,
}

impl SettingsField {
    pub fn next(self) -> Self {
        match self {
            SettingsField::PingFrequency => SettingsField::TestDuration,
            SettingsField::TestDuration => SettingsField::SpeedUnit,
            SettingsField::SpeedUnit => SettingsField::PingFrequency,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            SettingsField::PingFrequency => SettingsField::SpeedUnit,
            SettingsField::TestDuration => SettingsField::PingFrequency,
            SettingsField::SpeedUnit => SettingsField::TestDuration,
        }
    }
}
