use std::collections::TryReserveError;
use std::io;

/// Planar float buffer, one `Vec` per channel.
#[derive(Clone, Debug, Default)]
pub struct ChunkBuffer {
    channels: Vec<Vec<f32>>,
    frames: usize,
}

impl ChunkBuffer {
    pub fn new(num_channels: usize, frames: usize) -> Self {
        Self {
            channels: vec![vec![0.0; frames]; num_channels],
            frames,
        }
    }

    /// Allocates without aborting the process when the request cannot be met.
    pub fn try_new(num_channels: usize, frames: usize) -> Result<Self, TryReserveError> {
        let mut channels = Vec::new();
        channels.try_reserve_exact(num_channels)?;
        for _ in 0..num_channels {
            let mut data: Vec<f32> = Vec::new();
            data.try_reserve_exact(frames)?;
            data.resize(frames, 0.0);
            channels.push(data);
        }
        Ok(Self { channels, frames })
    }

    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    pub fn num_frames(&self) -> usize {
        self.frames
    }

    pub fn clear(&mut self) {
        for ch in &mut self.channels {
            ch.fill(0.0);
        }
    }

    pub fn channel(&self, ch: usize) -> &[f32] {
        &self.channels[ch]
    }

    pub fn channel_mut(&mut self, ch: usize) -> &mut [f32] {
        &mut self.channels[ch]
    }

    /// True if any channel at `frame` is strictly louder than `threshold`.
    pub fn frame_exceeds(&self, frame: usize, threshold: f32) -> bool {
        self.channels
            .iter()
            .any(|ch| exceeds_threshold(ch[frame], threshold))
    }
}

/// Samples exactly at the threshold still count as silence.
#[inline]
pub fn exceeds_threshold(sample: f32, threshold: f32) -> bool {
    sample.abs() > threshold
}

/// Random-access reader over decoded audio. Positions are frame indices.
pub trait SampleSource {
    /// Total frames. Broken or empty readers may report zero or a negative value.
    fn length_in_samples(&self) -> i64;

    fn channel_count(&self) -> usize;

    fn sample_rate(&self) -> u32;

    /// Reads `num_samples` frames starting at `start_sample` into
    /// `dest[.., dest_offset..dest_offset + num_samples]`.
    ///
    /// Frames past the end of the source are written as zeros. Any error
    /// leaves the destination contents unspecified.
    fn read(
        &mut self,
        dest: &mut ChunkBuffer,
        dest_offset: usize,
        num_samples: usize,
        start_sample: u64,
    ) -> io::Result<()>;
}

impl<S: SampleSource + ?Sized> SampleSource for &mut S {
    fn length_in_samples(&self) -> i64 {
        (**self).length_in_samples()
    }

    fn channel_count(&self) -> usize {
        (**self).channel_count()
    }

    fn sample_rate(&self) -> u32 {
        (**self).sample_rate()
    }

    fn read(
        &mut self,
        dest: &mut ChunkBuffer,
        dest_offset: usize,
        num_samples: usize,
        start_sample: u64,
    ) -> io::Result<()> {
        (**self).read(dest, dest_offset, num_samples, start_sample)
    }
}

impl<S: SampleSource + ?Sized> SampleSource for Box<S> {
    fn length_in_samples(&self) -> i64 {
        (**self).length_in_samples()
    }

    fn channel_count(&self) -> usize {
        (**self).channel_count()
    }

    fn sample_rate(&self) -> u32 {
        (**self).sample_rate()
    }

    fn read(
        &mut self,
        dest: &mut ChunkBuffer,
        dest_offset: usize,
        num_samples: usize,
        start_sample: u64,
    ) -> io::Result<()> {
        (**self).read(dest, dest_offset, num_samples, start_sample)
    }
}

pub(crate) fn check_destination(
    dest: &ChunkBuffer,
    dest_offset: usize,
    num_samples: usize,
) -> io::Result<()> {
    match dest_offset.checked_add(num_samples) {
        Some(end) if end <= dest.num_frames() => Ok(()),
        _ => Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!(
                "destination holds {} frames, cannot write {} at offset {}",
                dest.num_frames(),
                num_samples,
                dest_offset
            ),
        )),
    }
}
