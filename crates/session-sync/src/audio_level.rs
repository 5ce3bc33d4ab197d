//! Microphone level meter.
//!
//! Maps byte frequency samples from an audio analyser to a 0..=10 level for
//! the local volume indicator.

/// Highest level reported.
pub const MAX_LEVEL: u8 = 10;

/// Root mean square of the samples; 0 for empty input.
#[must_use]
pub fn root_mean_square(samples: &[u8]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f64 = samples.iter().map(|&s| f64::from(s).powi(2)).sum();
    // usize to f64 conversion is exact for realistic analyser buffer sizes
    #[allow(clippy::cast_precision_loss)]
    let len = samples.len() as f64;
    (sum / len).sqrt()
}

/// Level for one analyser frame: `ceil(10 * log2(rms) / 8)`, clamped to
/// `0..=MAX_LEVEL`.
///
/// The value is clamped before the cast, so the cast is exact.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn level_from_samples(samples: &[u8]) -> u8 {
    let rms = root_mean_square(samples);
    if rms <= 0.0 {
        return 0;
    }
    let level = (10.0 * rms.log2() / 8.0).ceil();
    level.clamp(0.0, f64::from(MAX_LEVEL)) as u8
}

/// Reports the level only when it changes.
#[derive(Debug, Default)]
pub struct AudioLevelMeter {
    last: Option<u8>,
}

impl AudioLevelMeter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one analyser frame. Returns the new level if it changed.
    pub fn observe(&mut self, samples: &[u8]) -> Option<u8> {
        self.update(level_from_samples(samples))
    }

    /// The track is no longer live; drop the indicator to 0.
    pub fn finish(&mut self) -> Option<u8> {
        self.update(0)
    }

    /// Last reported level.
    #[must_use]
    pub fn level(&self) -> u8 {
        self.last.unwrap_or(0)
    }

    fn update(&mut self, level: u8) -> Option<u8> {
        if self.last == Some(level) {
            return None;
        }
        self.last = Some(level);
        Some(level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_silence_is_level_zero() {
        assert_eq!(level_from_samples(&[]), 0);
        assert_eq!(level_from_samples(&[0; 128]), 0);
        // rms below 1 has a negative log
        assert_eq!(level_from_samples(&[1, 0, 0, 0]), 0);
    }

    #[test]
    fn test_full_scale_is_max_level() {
        assert_eq!(level_from_samples(&[255; 64]), MAX_LEVEL);
    }

    #[test]
    fn test_level_formula() {
        // rms 16 -> log2 = 4 -> ceil(40 / 8) = 5
        assert_eq!(level_from_samples(&[16; 32]), 5);
        // rms 2 -> log2 = 1 -> ceil(10 / 8) = 2
        assert_eq!(level_from_samples(&[2; 32]), 2);
    }

    #[test]
    fn test_root_mean_square() {
        let rms = root_mean_square(&[3, 4, 3, 4]);
        assert!((rms - 3.535_533_9).abs() < 1e-6);
    }

    #[test]
    fn test_meter_reports_only_changes() {
        let mut meter = AudioLevelMeter::new();

        assert_eq!(meter.observe(&[16; 8]), Some(5));
        assert_eq!(meter.observe(&[16; 8]), None);
        assert_eq!(meter.observe(&[255; 8]), Some(10));
        assert_eq!(meter.finish(), Some(0));
        assert_eq!(meter.finish(), None);
        assert_eq!(meter.level(), 0);
    }

    #[test]
    fn test_first_silent_frame_is_reported() {
        let mut meter = AudioLevelMeter::new();
        assert_eq!(meter.observe(&[0; 8]), Some(0));
    }
}
