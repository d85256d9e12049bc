//! Blink rate in Hz and the derived toggle interval.
//!
//! A full blink cycle is one "on" phase plus one "off" phase, so the timer
//! fires twice per cycle: every `1 / (2 × rate)` seconds.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Slowest supported rate.
pub const MIN_RATE_HZ: f64 = 0.5;

/// Fastest supported rate.
pub const MAX_RATE_HZ: f64 = 5.0;

/// Rate used when nothing else is configured.
pub const DEFAULT_RATE_HZ: f64 = 1.0;

/// Granularity of the rate control.
pub const RATE_STEP_HZ: f64 = 0.1;

#[derive(Debug, Clone, PartialEq)]
pub enum RateError {
    /// NaN or infinite input.
    NotFinite,
    /// Finite but outside `[MIN_RATE_HZ, MAX_RATE_HZ]`.
    OutOfRange(f64),
    /// String could not be parsed as a number.
    Parse(String),
}

impl fmt::Display for RateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RateError::NotFinite => write!(f, "Blink rate must be a finite number"),
            RateError::OutOfRange(hz) => write!(
                f,
                "Blink rate {hz} Hz is out of range ({MIN_RATE_HZ}-{MAX_RATE_HZ} Hz)"
            ),
            RateError::Parse(s) => write!(f, "Invalid blink rate: {s}"),
        }
    }
}

impl std::error::Error for RateError {}

/// A validated blink frequency.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct BlinkRate(f64);

impl BlinkRate {
    /// Validate a rate in Hz.
    pub fn new(hz: f64) -> Result<Self, RateError> {
        if !hz.is_finite() {
            return Err(RateError::NotFinite);
        }
        if !(MIN_RATE_HZ..=MAX_RATE_HZ).contains(&hz) {
            return Err(RateError::OutOfRange(hz));
        }
        Ok(BlinkRate(hz))
    }

    /// Clamp any input into the supported range. NaN falls back to the default.
    pub fn clamped(hz: f64) -> Self {
        if hz.is_nan() {
            return Self::default();
        }
        BlinkRate(hz.clamp(MIN_RATE_HZ, MAX_RATE_HZ))
    }

    /// Round to the nearest 0.1 Hz step, staying in range.
    pub fn snapped(self) -> Self {
        // Divide by the whole step count so 0.7 stays 0.7, not 0.7000000000000001
        let steps_per_hz = (1.0 / RATE_STEP_HZ).round();
        Self::clamped((self.0 * steps_per_hz).round() / steps_per_hz)
    }

    pub fn hz(self) -> f64 {
        self.0
    }

    /// Interval between two successive toggles.
    pub fn half_period(self) -> Duration {
        Duration::from_secs_f64(1.0 / (2.0 * self.0))
    }
}

impl Default for BlinkRate {
    fn default() -> Self {
        BlinkRate(DEFAULT_RATE_HZ)
    }
}

impl fmt::Display for BlinkRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1} Hz", self.0)
    }
}

impl FromStr for BlinkRate {
    type Err = RateError;

    /// Accepts `"2"`, `"2.5"`, `"2.5Hz"`, `"2.5 hz"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let number = s
            .strip_suffix("Hz")
            .or_else(|| s.strip_suffix("hz"))
            .or_else(|| s.strip_suffix("HZ"))
            .unwrap_or(s)
            .trim();
        let hz: f64 = number
            .parse()
            .map_err(|_| RateError::Parse(s.to_string()))?;
        Self::new(hz)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn half_period_at_one_hz() {
        let rate = BlinkRate::new(1.0).unwrap();
        assert_eq!(rate.half_period(), Duration::from_millis(500));
    }

    #[test]
    fn half_period_at_bounds() {
        assert_eq!(
            BlinkRate::new(5.0).unwrap().half_period(),
            Duration::from_millis(100)
        );
        assert_eq!(
            BlinkRate::new(0.5).unwrap().half_period(),
            Duration::from_secs(1)
        );
    }

    #[test]
    fn half_period_across_slider_steps() {
        // Every 0.1 Hz step from 0.5 to 5.0
        for step in 5..=50 {
            let hz = step as f64 / 10.0;
            let rate = BlinkRate::new(hz).unwrap();
            let expected = 1.0 / (2.0 * hz);
            let got = rate.half_period().as_secs_f64();
            assert!(
                (got - expected).abs() < 1e-9,
                "rate {hz}: expected {expected}, got {got}"
            );
        }
    }

    #[test]
    fn rejects_out_of_range() {
        assert_eq!(BlinkRate::new(0.0), Err(RateError::OutOfRange(0.0)));
        assert_eq!(BlinkRate::new(-1.0), Err(RateError::OutOfRange(-1.0)));
        assert_eq!(BlinkRate::new(5.01), Err(RateError::OutOfRange(5.01)));
    }

    #[test]
    fn rejects_non_finite() {
        assert_eq!(BlinkRate::new(f64::NAN), Err(RateError::NotFinite));
        assert_eq!(BlinkRate::new(f64::INFINITY), Err(RateError::NotFinite));
    }

    #[test]
    fn clamped_pulls_into_range() {
        assert_eq!(BlinkRate::clamped(0.0).hz(), MIN_RATE_HZ);
        assert_eq!(BlinkRate::clamped(99.0).hz(), MAX_RATE_HZ);
        assert_eq!(BlinkRate::clamped(2.0).hz(), 2.0);
        assert_eq!(BlinkRate::clamped(f64::NAN).hz(), DEFAULT_RATE_HZ);
    }

    #[test]
    fn snapped_rounds_to_step() {
        let rate = BlinkRate::new(1.26).unwrap().snapped();
        assert!((rate.hz() - 1.3).abs() < 1e-9);
        assert_eq!(BlinkRate::new(0.74).unwrap().snapped().hz(), 0.7);
        assert_eq!(BlinkRate::new(4.98).unwrap().snapped().hz(), 5.0);
    }

    #[test]
    fn default_is_one_hz() {
        assert_eq!(BlinkRate::default().hz(), 1.0);
    }

    #[test]
    fn display_one_decimal() {
        assert_eq!(BlinkRate::new(2.5).unwrap().to_string(), "2.5 Hz");
        assert_eq!(BlinkRate::default().to_string(), "1.0 Hz");
    }

    #[test]
    fn parse_plain_and_suffixed() {
        assert_eq!("2".parse::<BlinkRate>().unwrap().hz(), 2.0);
        assert_eq!("2.5Hz".parse::<BlinkRate>().unwrap().hz(), 2.5);
        assert_eq!(" 3 hz ".parse::<BlinkRate>().unwrap().hz(), 3.0);
    }

    #[test]
    fn parse_rejects_garbage_and_range() {
        assert!(matches!(
            "fast".parse::<BlinkRate>(),
            Err(RateError::Parse(_))
        ));
        assert!(matches!(
            "10".parse::<BlinkRate>(),
            Err(RateError::OutOfRange(_))
        ));
    }
}
