use thiserror::Error;

use crate::loop_region::Boundary;

pub const DEFAULT_IN_THRESHOLD: f32 = 0.01;
pub const DEFAULT_OUT_THRESHOLD: f32 = 0.01;

/// Editors accept whole percentages in this range.
pub const MIN_PERCENT: u32 = 1;
pub const MAX_PERCENT: u32 = 99;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ThresholdError {
    #[error("'{0}' is not a whole percentage")]
    NotANumber(String),
    #[error("threshold {0}% is outside 1..=99")]
    OutOfRange(u32),
}

/// Amplitude levels separating silence from signal at each end of the file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SilenceThreshold {
    in_threshold: f32,
    out_threshold: f32,
}

impl Default for SilenceThreshold {
    fn default() -> Self {
        Self {
            in_threshold: DEFAULT_IN_THRESHOLD,
            out_threshold: DEFAULT_OUT_THRESHOLD,
        }
    }
}

impl SilenceThreshold {
    pub fn new(in_threshold: f32, out_threshold: f32) -> Self {
        Self {
            in_threshold,
            out_threshold,
        }
    }

    pub fn in_threshold(&self) -> f32 {
        self.in_threshold
    }

    pub fn out_threshold(&self) -> f32 {
        self.out_threshold
    }

    pub fn get(&self, boundary: Boundary) -> f32 {
        match boundary {
            Boundary::In => self.in_threshold,
            Boundary::Out => self.out_threshold,
        }
    }

    pub fn set(&mut self, boundary: Boundary, value: f32) {
        match boundary {
            Boundary::In => self.in_threshold = value,
            Boundary::Out => self.out_threshold = value,
        }
    }

    pub fn percent(&self, boundary: Boundary) -> u32 {
        (self.get(boundary) * 100.0).round() as u32
    }

    /// Applies a whole percentage typed into one of the threshold editors.
    ///
    /// On error the stored value is left as it was.
    pub fn apply_percentage_text(
        &mut self,
        boundary: Boundary,
        text: &str,
    ) -> Result<f32, ThresholdError> {
        let percent: u32 = text
            .trim()
            .parse()
            .map_err(|_| ThresholdError::NotANumber(text.to_string()))?;
        if !(MIN_PERCENT..=MAX_PERCENT).contains(&percent) {
            return Err(ThresholdError::OutOfRange(percent));
        }
        let normalized = percent as f32 / 100.0;
        self.set(boundary, normalized);
        Ok(normalized)
    }
}

/// The UI side of the two threshold editors.
pub trait ThresholdEditor {
    fn set_enabled(&mut self, enabled: bool);

    fn show_percent(&mut self, _boundary: Boundary, _percent: u32) {}
}
