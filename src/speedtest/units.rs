use super::stats::round2;
use crate::settings::SpeedUnit;
use serde::Serialize;
use std::fmt;

const BITS_PER_KILOBIT: f64 = 1_000.0;
const BITS_PER_MEGABIT: f64 = 1_000_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Unit {
    #[serde(rename = "ms")]
    Millis,
    Kbps,
    Mbps,
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unit::Millis => write!(f, "ms"),
            Unit::Kbps => write!(f, "Kbps"),
            Unit::Mbps => write!(f, "Mbps"),
        }
    }
}

/// A value paired with the unit it is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Measurement {
    pub value: f64,
    pub unit: Unit,
}

impl Measurement {
    pub fn millis(value: f64) -> Self {
        Self {
            value,
            unit: Unit::Millis,
        }
    }

    pub fn zero_rate() -> Self {
        Self {
            value: 0.0,
            unit: Unit::Kbps,
        }
    }
}

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2} {}", self.value, self.unit)
    }
}

/// Converts a bit rate into the requested display unit, rounded to two
/// decimals. `Auto` switches to Mbps at exactly one megabit per second.
pub fn normalize(bits_per_second: f64, mode: SpeedUnit) -> Measurement {
    let unit = match mode {
        SpeedUnit::Mbps => Unit::Mbps,
        SpeedUnit::Kbps => Unit::Kbps,
        SpeedUnit::Auto if bits_per_second >= BITS_PER_MEGABIT => Unit::Mbps,
        SpeedUnit::Auto => Unit::Kbps,
    };

    let divisor = match unit {
        Unit::Mbps => BITS_PER_MEGABIT,
        _ => BITS_PER_KILOBIT,
    };

    Measurement {
        value: round2(bits_per_second / divisor),
        unit,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_units() {
        assert_eq!(
            normalize(500_000.0, SpeedUnit::Kbps),
            Measurement { value: 500.0, unit: Unit::Kbps }
        );
        assert_eq!(
            normalize(500_000.0, SpeedUnit::Mbps),
            Measurement { value: 0.5, unit: Unit::Mbps }
        );
    }

    #[test]
    fn auto_switches_at_one_megabit() {
        assert_eq!(
            normalize(2_000_000.0, SpeedUnit::Auto),
            Measurement { value: 2.0, unit: Unit::Mbps }
        );
        assert_eq!(normalize(1_000_000.0, SpeedUnit::Auto).unit, Unit::Mbps);

        let below = normalize(999_999.0, SpeedUnit::Auto);
        assert_eq!(below.unit, Unit::Kbps);
        assert!((below.value - 1000.0).abs() < 0.01);
    }

    #[test]
    fn zero_and_negative_rates_stay_in_kbps() {
        assert_eq!(normalize(0.0, SpeedUnit::Auto), Measurement::zero_rate());
        let negative = normalize(-2_500.0, SpeedUnit::Auto);
        assert_eq!(negative.unit, Unit::Kbps);
        assert_eq!(negative.value, -2.5);
    }

    #[test]
    fn measurement_display() {
        assert_eq!(Measurement::millis(12.5).to_string(), "12.50 ms");
        assert_eq!(normalize(123_456_789.0, SpeedUnit::Mbps).to_string(), "123.46 Mbps");
    }
}
