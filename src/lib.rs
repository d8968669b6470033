pub mod audio;
pub mod controls;
pub mod i18n;
pub mod loop_region;
pub mod playback;
pub mod player;
pub mod presenter;
pub mod scanner;
pub mod session;
pub mod source;
pub mod threshold;
pub mod timecode;
pub mod worker;

use threshold::SilenceThreshold;

#[derive(Clone, Debug)]
pub struct AnalysisSettings {
    pub chunk_size: usize, // Frames read per call during chunked scans
    pub max_channels: usize,
    pub max_single_read: u64, // Largest whole-file read a single call can address
    pub max_scan_length: u64, // Longest source a chunked scan will accept
    pub tail_ms: u32,         // Added after the last loud frame when placing the out point
    pub thresholds: SilenceThreshold,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            chunk_size: scanner::DEFAULT_CHUNK_SIZE,
            max_channels: scanner::MAX_CHANNELS,
            max_single_read: i32::MAX as u64,
            max_scan_length: i64::MAX as u64,
            tail_ms: 50,
            thresholds: SilenceThreshold::default(),
        }
    }
}

impl AnalysisSettings {
    pub fn tail_frames(&self, sample_rate: u32) -> u64 {
        sample_rate as u64 * self.tail_ms as u64 / 1000
    }
}
