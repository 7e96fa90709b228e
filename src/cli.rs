use std::path::PathBuf;

use clap::Parser;

use crate::settings::{Endpoints, SpeedUnit, TestConfiguration, DEFAULT_SERVER};

#[derive(Debug, Parser)]
#[command(name = "pathspeed", about = "Measure latency, jitter and throughput to a speed test server")]
pub struct Args {
    /// Number of latency probes, clamped to 5..=10.
    #[arg(long, env = "PATHSPEED_PING_FREQUENCY")]
    pub ping_frequency: Option<u32>,
    /// Seconds allowed for each of the download and upload phases, clamped to 15..=60.
    #[arg(long = "duration", env = "PATHSPEED_DURATION")]
    pub duration_secs: Option<u32>,
    #[arg(long, env = "PATHSPEED_UNIT", value_enum, default_value_t = SpeedUnit::Auto)]
    pub unit: SpeedUnit,
    /// Bytes requested from the server during the download phase.
    #[arg(long, env = "PATHSPEED_DOWNLOAD_BYTES")]
    pub download_bytes: Option<u64>,
    /// Bytes sent to the server during the upload phase.
    #[arg(long, env = "PATHSPEED_UPLOAD_BYTES")]
    pub upload_bytes: Option<usize>,
    #[arg(long, env = "PATHSPEED_SERVER", default_value = DEFAULT_SERVER)]
    pub server: String,
    /// Print progress lines instead of drawing the terminal UI.
    #[arg(long)]
    pub headless: bool,
    /// Print the final snapshot as JSON (headless only).
    #[arg(long, requires = "headless")]
    pub json: bool,
    #[arg(long, env = "PATHSPEED_LOG_FILE")]
    pub log_file: Option<PathBuf>,
}

impl Args {
    pub fn test_configuration(&self) -> TestConfiguration {
        let mut config = TestConfiguration::default().with_speed_unit(self.unit);
        if let Some(ping_frequency) = self.ping_frequency {
            config = config.with_ping_frequency(ping_frequency);
        }
        if let Some(duration_secs) = self.duration_secs {
            config = config.with_test_duration_secs(duration_secs);
        }
        if let Some(bytes) = self.download_bytes {
            config = config.with_download_size_bytes(bytes);
        }
        if let Some(bytes) = self.upload_bytes {
            config = config.with_upload_size_bytes(bytes);
        }
        config
    }

    pub fn endpoints(&self) -> Endpoints {
        Endpoints::for_server(&self.server)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_values_use_defaults() {
        let args = Args::try_parse_from(["pathspeed"]).unwrap();
        assert_eq!(args.test_configuration(), TestConfiguration::default());
        assert_eq!(args.endpoints(), Endpoints::default());
        assert!(!args.headless);
    }

    #[test]
    fn explicit_values_are_clamped() {
        let args = Args::try_parse_from([
            "pathspeed",
            "--ping-frequency",
            "0",
            "--duration",
            "90",
            "--unit",
            "mbps",
        ])
        .unwrap();
        let config = args.test_configuration();
        assert_eq!(config.ping_frequency(), 5);
        assert_eq!(config.test_duration_secs(), 60);
        assert_eq!(config.speed_unit(), SpeedUnit::Mbps);
    }

    #[test]
    fn transfer_sizes_override_defaults() {
        let args = Args::try_parse_from([
            "pathspeed",
            "--download-bytes",
            "25000000",
            "--upload-bytes",
            "10000000",
        ])
        .unwrap();
        let config = args.test_configuration();
        assert_eq!(config.download_size_bytes(), 25_000_000);
        assert_eq!(config.upload_size_bytes(), 10_000_000);
    }

    #[test]
    fn json_requires_headless() {
        assert!(Args::try_parse_from(["pathspeed", "--json"]).is_err());
        let args = Args::try_parse_from(["pathspeed", "--headless", "--json"]).unwrap();
        assert!(args.json);
    }

    #[test]
    fn server_override() {
        let args = Args::try_parse_from(["pathspeed", "--server", "http://127.0.0.1:9000"]).unwrap();
        assert_eq!(args.endpoints().upload_url, "http://127.0.0.1:9000/__up");
    }
}
