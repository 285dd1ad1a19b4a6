//! Timing and illumination settings for acquisition runs

use clap::Args;
use std::time::Duration;

/// Configuration for reference capture and automatic measurement runs
#[derive(Args, Debug, Clone, PartialEq)]
pub struct AcquisitionConfig {
    /// Wait after selecting a filter during reference capture, in seconds
    #[arg(long, default_value_t = 1.0)]
    pub reference_settle_secs: f64,

    /// Wait after selecting a filter during a measurement run, in seconds
    #[arg(long, default_value_t = 1.5)]
    pub run_settle_secs: f64,

    /// Wait after each measurement capture, in seconds
    #[arg(long, default_value_t = 0.3)]
    pub post_capture_secs: f64,

    /// Wait after homing the stage for reference capture, in seconds
    #[arg(long, default_value_t = 0.5)]
    pub home_delay_secs: f64,

    /// Wait after switching the illumination on, in seconds
    #[arg(long, default_value_t = 1.0)]
    pub warmup_secs: f64,

    /// Illumination level (1-10)
    #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u8).range(1..=10))]
    pub led_intensity: u8,

    /// Interval between stage position polls, in milliseconds
    #[arg(long, default_value_t = 100)]
    pub poll_interval_ms: u64,

    /// Longest wait for the stage to report its target, in seconds
    #[arg(long, default_value_t = 60.0)]
    pub position_timeout_secs: f64,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            reference_settle_secs: 1.0,
            run_settle_secs: 1.5,
            post_capture_secs: 0.3,
            home_delay_secs: 0.5,
            warmup_secs: 1.0,
            led_intensity: 10,
            poll_interval_ms: 100,
            position_timeout_secs: 60.0,
        }
    }
}

impl AcquisitionConfig {
    /// All waits zeroed, for simulated hardware.
    pub fn immediate() -> Self {
        Self {
            reference_settle_secs: 0.0,
            run_settle_secs: 0.0,
            post_capture_secs: 0.0,
            home_delay_secs: 0.0,
            warmup_secs: 0.0,
            poll_interval_ms: 0,
            ..Self::default()
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn position_timeout(&self) -> Duration {
        secs(self.position_timeout_secs)
    }
}

/// Duration from seconds, treating negative or non-finite values as zero.
pub(crate) fn secs(value: f64) -> Duration {
    if value.is_finite() && value > 0.0 {
        Duration::from_secs_f64(value)
    } else {
        Duration::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use clap::Parser;

    #[derive(Parser)]
    struct Cli {
        #[command(flatten)]
        acquisition: AcquisitionConfig,
    }

    #[test]
    fn test_default_config() {
        let config = AcquisitionConfig::default();

        assert_abs_diff_eq!(config.reference_settle_secs, 1.0, epsilon = f64::EPSILON);
        assert_abs_diff_eq!(config.run_settle_secs, 1.5, epsilon = f64::EPSILON);
        assert_abs_diff_eq!(config.post_capture_secs, 0.3, epsilon = f64::EPSILON);
        assert_abs_diff_eq!(config.home_delay_secs, 0.5, epsilon = f64::EPSILON);
        assert_abs_diff_eq!(config.warmup_secs, 1.0, epsilon = f64::EPSILON);
        assert_eq!(config.led_intensity, 10);
        assert_eq!(config.poll_interval(), Duration::from_millis(100));
        assert_eq!(config.position_timeout(), Duration::from_secs(60));
    }

    #[test]
    fn test_cli_defaults_match_default() {
        let cli = Cli::parse_from(["bench"]);
        assert_eq!(cli.acquisition, AcquisitionConfig::default());
    }

    #[test]
    fn test_cli_rejects_intensity_out_of_range() {
        assert!(Cli::try_parse_from(["bench", "--led-intensity", "11"]).is_err());
        assert!(Cli::try_parse_from(["bench", "--led-intensity", "0"]).is_err());
    }

    #[test]
    fn test_secs_clamps_invalid() {
        assert_eq!(secs(-1.0), Duration::ZERO);
        assert_eq!(secs(f64::NAN), Duration::ZERO);
        assert_eq!(secs(0.25), Duration::from_millis(250));
    }
}
