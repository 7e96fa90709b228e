use super::error::{SpeedTestError, SpeedTestResult, TransportError};
use super::stats;
use std::time::{Duration, Instant};

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Fewest usable samples that still give a meaningful ping and jitter.
pub const MIN_PING_SAMPLES: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PingSummary {
    pub ping_ms: f64,
    pub jitter_ms: f64,
}

/// Drops failed probes (recorded as `0`) and then the first surviving
/// sample, which carries connection setup cost.
pub fn usable_samples(raw: &[f64]) -> Vec<f64> {
    raw.iter().copied().filter(|ms| *ms != 0.0).skip(1).collect()
}

pub fn summarize(raw: &[f64]) -> SpeedTestResult<PingSummary> {
    let samples = usable_samples(raw);
    if samples.len() < MIN_PING_SAMPLES {
        return Err(SpeedTestError::InsufficientPingSamples {
            usable: samples.len(),
        });
    }

    Ok(PingSummary {
        ping_ms: stats::round2(stats::min(&samples)?),
        jitter_ms: stats::jitter(&samples)?,
    })
}

pub(crate) async fn probe(client: &reqwest::Client, url: &str) -> Result<Duration, TransportError> {
    let start = Instant::now();
    let response = client.get(url).timeout(PROBE_TIMEOUT).send().await?;
    let elapsed = start.elapsed();

    if !response.status().is_success() {
        return Err(TransportError::Status(response.status()));
    }
    Ok(elapsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filters_failures_then_skips_first() {
        let raw = [0.0, 30.0, 25.0, 0.0, 27.0];
        assert_eq!(usable_samples(&raw), vec![25.0, 27.0]);
    }

    #[test]
    fn summarizes_mixed_samples() {
        let raw = [50.0, 52.0, 0.0, 48.0, 51.0, 49.0, 53.0, 50.0, 52.0, 51.0];
        let summary = summarize(&raw).unwrap();
        assert_eq!(summary.ping_ms, 48.0);
        assert_eq!(summary.jitter_ms, 2.71);
    }

    #[test]
    fn too_few_usable_samples() {
        // five probes, two failed, first survivor dropped: two left
        let raw = [20.0, 0.0, 21.0, 0.0, 22.0];
        assert!(matches!(
            summarize(&raw),
            Err(SpeedTestError::InsufficientPingSamples { usable: 2 })
        ));
    }

    #[test]
    fn identical_samples_have_no_jitter_signal() {
        let raw = [10.0; 6];
        assert!(matches!(
            summarize(&raw),
            Err(SpeedTestError::InsufficientSamples { .. })
        ));
    }
}
