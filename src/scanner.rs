//! Chunked search for the first and last non-silent frame of a source.
//!
//! Only one chunk is resident at a time, so peak memory is
//! `chunk_size * channels` floats however long the source is.

use std::io;
use std::ops::Range;

use thiserror::Error;

use crate::source::{ChunkBuffer, SampleSource};

pub const DEFAULT_CHUNK_SIZE: usize = 65536;
pub const MAX_CHANNELS: usize = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanDirection {
    /// From frame 0 towards the end, looking for where sound starts.
    Forward,
    /// From the last frame towards 0, looking for where sound stops.
    Backward,
}

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("unsupported channel count: {0}")]
    UnsupportedChannels(usize),
    #[error("failed to read {len} frames at {start}: {source}")]
    ReadFailure {
        start: u64,
        len: usize,
        #[source]
        source: io::Error,
    },
}

/// Lazy sequence of frame ranges covering `[0, length)` in scan order.
///
/// Every range except possibly the last one in scan order holds exactly
/// `chunk_size` frames. Cloning gives an independent restart.
#[derive(Debug, Clone)]
pub struct ChunkPlan {
    direction: ScanDirection,
    chunk_size: u64,
    length: u64,
    cursor: u64,
}

impl ChunkPlan {
    pub fn new(length: u64, chunk_size: usize, direction: ScanDirection) -> Self {
        let cursor = match direction {
            ScanDirection::Forward => 0,
            ScanDirection::Backward => length,
        };
        Self {
            direction,
            chunk_size: chunk_size.max(1) as u64,
            length,
            cursor,
        }
    }
}

impl Iterator for ChunkPlan {
    type Item = Range<u64>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.direction {
            ScanDirection::Forward => {
                if self.cursor >= self.length {
                    return None;
                }
                let n = self.chunk_size.min(self.length - self.cursor);
                let range = self.cursor..self.cursor + n;
                self.cursor += n;
                Some(range)
            }
            ScanDirection::Backward => {
                if self.cursor == 0 {
                    return None;
                }
                let n = self.chunk_size.min(self.cursor);
                let range = self.cursor - n..self.cursor;
                self.cursor -= n;
                Some(range)
            }
        }
    }
}

/// First frame in `buffer[..len]` where any channel exceeds `threshold`.
pub fn first_signal_in(buffer: &ChunkBuffer, len: usize, threshold: f32) -> Option<usize> {
    (0..len.min(buffer.num_frames())).find(|&i| buffer.frame_exceeds(i, threshold))
}

/// Last frame in `buffer[..len]` where any channel exceeds `threshold`.
pub fn last_signal_in(buffer: &ChunkBuffer, len: usize, threshold: f32) -> Option<usize> {
    (0..len.min(buffer.num_frames()))
        .rev()
        .find(|&i| buffer.frame_exceeds(i, threshold))
}

#[derive(Debug, Clone)]
pub struct SilenceBoundaryScanner {
    chunk_size: usize,
    max_channels: usize,
}

impl Default for SilenceBoundaryScanner {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE)
    }
}

impl SilenceBoundaryScanner {
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            max_channels: MAX_CHANNELS,
        }
    }

    pub fn with_max_channels(mut self, max_channels: usize) -> Self {
        self.max_channels = max_channels;
        self
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn find_first_signal<S: SampleSource + ?Sized>(
        &self,
        source: &mut S,
        threshold: f32,
    ) -> Result<Option<u64>, ScanError> {
        self.scan(source, threshold, ScanDirection::Forward)
    }

    pub fn find_last_signal<S: SampleSource + ?Sized>(
        &self,
        source: &mut S,
        threshold: f32,
    ) -> Result<Option<u64>, ScanError> {
        self.scan(source, threshold, ScanDirection::Backward)
    }

    /// Returns the boundary frame, or `None` when the whole source is silent.
    ///
    /// A failed read ends the scan on the spot; nothing already in the buffer
    /// is examined afterwards.
    pub fn scan<S: SampleSource + ?Sized>(
        &self,
        source: &mut S,
        threshold: f32,
        direction: ScanDirection,
    ) -> Result<Option<u64>, ScanError> {
        let channels = source.channel_count();
        if channels == 0 || channels > self.max_channels {
            return Err(ScanError::UnsupportedChannels(channels));
        }

        let length = source.length_in_samples();
        if length <= 0 {
            return Ok(None);
        }

        // No chunk is ever longer than the source.
        let frames = (self.chunk_size as u64).min(length as u64) as usize;
        let mut buffer = ChunkBuffer::new(channels, frames);

        for range in ChunkPlan::new(length as u64, self.chunk_size, direction) {
            let num_this_time = (range.end - range.start) as usize;

            buffer.clear();
            source
                .read(&mut buffer, 0, num_this_time, range.start)
                .map_err(|source| ScanError::ReadFailure {
                    start: range.start,
                    len: num_this_time,
                    source,
                })?;

            let hit = match direction {
                ScanDirection::Forward => first_signal_in(&buffer, num_this_time, threshold),
                ScanDirection::Backward => last_signal_in(&buffer, num_this_time, threshold),
            };

            if let Some(offset) = hit {
                let boundary = range.start + offset as u64;
                log::debug!("{:?} scan hit signal at frame {}", direction, boundary);
                return Ok(Some(boundary));
            }
        }

        Ok(None)
    }
}
