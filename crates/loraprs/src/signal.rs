//! Signal report annotation and automatic frequency correction.

use std::fmt;

use loraprs_core::error::Result;
use loraprs_core::format_freq_mhz;
use loraprs_core::radio::RadioEndpoint;
use loraprs_core::types::SignalMetrics;

/// Reception quality of one packet, rendered as an APRS comment.
///
/// # Example
///
/// ```
/// use loraprs::signal::SignalReport;
/// use loraprs_core::SignalMetrics;
///
/// let report = SignalReport::from_metrics(&SignalMetrics {
///     snr_db: -3.0,
///     rssi_dbm: -80.0,
///     freq_error_hz: 150,
/// });
/// assert_eq!(report.to_string(), "rssi: -83.00dBm, snr: -3.00dB, err: 150Hz");
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalReport {
    /// RSSI reduced by the SNR deficit when the SNR is negative.
    pub effective_rssi_dbm: f32,
    pub snr_db: f32,
    pub freq_error_hz: i64,
}

impl SignalReport {
    pub fn from_metrics(metrics: &SignalMetrics) -> Self {
        let effective_rssi_dbm = if metrics.snr_db < 0.0 {
            metrics.rssi_dbm + metrics.snr_db
        } else {
            metrics.rssi_dbm
        };
        Self {
            effective_rssi_dbm,
            snr_db: metrics.snr_db,
            freq_error_hz: metrics.freq_error_hz,
        }
    }
}

impl fmt::Display for SignalReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "rssi: {:.2}dBm, snr: {:.2}dB, err: {}Hz",
            self.effective_rssi_dbm, self.snr_db, self.freq_error_hz
        )
    }
}

/// Integrating center-frequency correction.
///
/// Each received packet's measured error is subtracted from the radio's
/// current frequency, so corrections accumulate across packets.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrequencyCorrector;

impl FrequencyCorrector {
    pub fn new() -> Self {
        Self
    }

    /// The frequency `current_hz` corrected by `error_hz`, clamped to the
    /// `u64` range.
    pub fn correct(&self, current_hz: u64, error_hz: i64) -> u64 {
        let corrected = i128::from(current_hz) - i128::from(error_hz);
        corrected.clamp(0, i128::from(u64::MAX)) as u64
    }

    /// Retune `radio` by the error in `metrics`.
    ///
    /// Returns the new frequency, or `None` when there was nothing to
    /// correct.
    pub async fn apply(
        &self,
        radio: &mut dyn RadioEndpoint,
        metrics: &SignalMetrics,
    ) -> Result<Option<u64>> {
        if metrics.freq_error_hz == 0 {
            return Ok(None);
        }

        let current = radio.frequency();
        let corrected = self.correct(current, metrics.freq_error_hz);
        radio.set_frequency(corrected).await?;

        tracing::debug!(
            error_hz = metrics.freq_error_hz,
            from = %format_freq_mhz(current),
            to = %format_freq_mhz(corrected),
            "Corrected center frequency"
        );
        Ok(Some(corrected))
    }
}
