//! Pure statistics over raw sample buffers.

use super::error::{SpeedTestError, SpeedTestResult};

/// Percentage of leading samples discarded as connection ramp-up.
const WARMUP_TRIM_PERCENT: usize = 22;

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Mean of the samples after dropping the leading `ceil(n * 22%)`, rounded
/// to two decimals.
pub fn trimmed_mean_rate(samples: &[f64]) -> SpeedTestResult<f64> {
    let skip = (samples.len() * WARMUP_TRIM_PERCENT).div_ceil(100);
    let kept = &samples[skip.min(samples.len())..];
    if kept.is_empty() {
        return Err(SpeedTestError::InsufficientSamples {
            needed: 1,
            found: kept.len(),
        });
    }

    let mean = kept.iter().sum::<f64>() / kept.len() as f64;
    Ok(round2(mean))
}

/// Mean absolute difference between consecutive samples, ignoring zero
/// differences, rounded half away from zero to two decimals.
pub fn jitter(samples: &[f64]) -> SpeedTestResult<f64> {
    let deltas: Vec<f64> = samples
        .windows(2)
        .map(|pair| (pair[1] - pair[0]).abs())
        .filter(|delta| *delta != 0.0)
        .collect();

    if deltas.len() < 2 {
        return Err(SpeedTestError::InsufficientSamples {
            needed: 2,
            found: deltas.len(),
        });
    }

    let mean = deltas.iter().sum::<f64>() / deltas.len() as f64;
    Ok(((mean + f64::EPSILON) * 100.0).round() / 100.0)
}

pub fn min(samples: &[f64]) -> SpeedTestResult<f64> {
    samples
        .iter()
        .copied()
        .reduce(f64::min)
        .ok_or(SpeedTestError::InsufficientSamples { needed: 1, found: 0 })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trimmed_mean_drops_leading_22_percent() {
        // ceil(10 * 0.22) = 3 dropped, mean of 4..=10 is 7
        let samples: Vec<f64> = (1..=10).map(f64::from).collect();
        assert_eq!(trimmed_mean_rate(&samples).unwrap(), 7.0);
    }

    #[test]
    fn trimmed_mean_rounds_to_two_decimals() {
        let samples = [1000.0, 1.0, 2.0, 2.0];
        // drop 1, mean of [1, 2, 2] = 1.666...
        assert_eq!(trimmed_mean_rate(&samples).unwrap(), 1.67);
    }

    #[test]
    fn trimmed_mean_of_three_keeps_last_two() {
        assert_eq!(trimmed_mean_rate(&[100.0, 200.0, 300.0]).unwrap(), 250.0);
    }

    #[test]
    fn trimmed_mean_fails_when_nothing_survives() {
        assert!(matches!(
            trimmed_mean_rate(&[42.0]),
            Err(SpeedTestError::InsufficientSamples { found: 0, .. })
        ));
        assert!(trimmed_mean_rate(&[]).is_err());
    }

    #[test]
    fn jitter_skips_zero_deltas() {
        assert_eq!(jitter(&[10.0, 12.0, 12.0, 15.0]).unwrap(), 2.5);
    }

    #[test]
    fn jitter_rounds_to_two_decimals() {
        // deltas 4,3,2,4,3,2,1 -> 19 / 7
        let samples = [52.0, 48.0, 51.0, 49.0, 53.0, 50.0, 52.0, 51.0];
        assert_eq!(jitter(&samples).unwrap(), 2.71);
    }

    #[test]
    fn jitter_needs_two_nonzero_deltas() {
        assert!(jitter(&[10.0, 12.0]).is_err());
        assert!(jitter(&[10.0, 10.0, 10.0, 12.0]).is_err());
        assert!(matches!(
            jitter(&[5.0]),
            Err(SpeedTestError::InsufficientSamples { needed: 2, found: 0 })
        ));
    }

    #[test]
    fn min_picks_smallest_and_rejects_empty() {
        assert_eq!(min(&[3.5, 1.25, 9.0]).unwrap(), 1.25);
        assert!(min(&[]).is_err());
    }
}
