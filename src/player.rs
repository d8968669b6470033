use std::time::Duration;

use rodio::source::SeekError;
use rodio::{Sink, Source};

use crate::audio::AudioData;
use crate::loop_region::LoopRegion;
use crate::playback::Transport;

/// Plays `data` and jumps back to loop-in whenever the cursor reaches loop-out.
///
/// An unset loop-in means the start of the file, an unset loop-out its end.
pub struct LoopingSource {
    data: AudioData,
    start: usize, // Interleaved sample index
    end: usize,
    cursor: usize,
    loop_count: u32,
    max_loops: Option<u32>, // None means infinite
}

impl LoopingSource {
    pub fn new(data: AudioData, region: LoopRegion, max_loops: Option<u32>) -> Self {
        let channels = data.channels.max(1) as usize;
        let frames = data.frames() as u64;
        let to_sample = |frame: u64| (frame.min(frames) as usize) * channels;
        let start = to_sample(region.loop_in().unwrap_or(0));
        let end = to_sample(region.loop_out().unwrap_or(frames));
        Self {
            data,
            start,
            end,
            cursor: 0,
            loop_count: 0,
            max_loops,
        }
    }
}

impl Iterator for LoopingSource {
    type Item = f32;

    fn next(&mut self) -> Option<Self::Item> {
        let should_loop = match self.max_loops {
            Some(max) => self.loop_count < max,
            None => true,
        };

        // An empty region would spin without producing audio.
        if should_loop && self.end > self.start && self.cursor == self.end {
            self.cursor = self.start;
            self.loop_count += 1;
        }

        let sample = *self.data.samples.get(self.cursor)?;
        self.cursor += 1;
        Some(sample)
    }
}

impl Source for LoopingSource {
    fn current_frame_len(&self) -> Option<usize> {
        None
    }

    fn channels(&self) -> u16 {
        self.data.channels
    }

    fn sample_rate(&self) -> u32 {
        self.data.sample_rate
    }

    fn total_duration(&self) -> Option<Duration> {
        None
    }

    /// Moves the cursor to the frame at `pos`, clamped to the end of the data.
    fn try_seek(&mut self, pos: Duration) -> Result<(), SeekError> {
        let channels = self.data.channels.max(1) as usize;
        let frame = (pos.as_secs_f64() * self.data.sample_rate as f64) as usize;
        self.cursor = frame.min(self.data.frames()) * channels;
        Ok(())
    }
}

/// [`Transport`] over a rodio [`Sink`].
pub struct RodioTransport {
    sink: Sink,
}

impl RodioTransport {
    pub fn new(sink: Sink) -> Self {
        Self { sink }
    }

    pub fn sink(&self) -> &Sink {
        &self.sink
    }
}

impl Transport for RodioTransport {
    fn is_playing(&self) -> bool {
        !self.sink.is_paused() && !self.sink.empty()
    }

    fn pause(&self) {
        self.sink.pause();
    }

    fn resume(&self) {
        self.sink.play();
    }

    fn current_position(&self) -> Duration {
        self.sink.get_pos()
    }

    fn seek(&self, position: Duration) {
        if let Err(e) = self.sink.try_seek(position) {
            log::warn!("seek to {:?} failed: {}", position, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(frames: usize, channels: u16) -> AudioData {
        AudioData {
            samples: (0..frames * channels as usize).map(|i| i as f32).collect(),
            sample_rate: 1000,
            channels,
        }
    }

    #[test]
    fn jumps_back_at_loop_out() {
        let mut region = LoopRegion::new();
        region.set_loop_in(2);
        region.set_loop_out(4);
        let played: Vec<f32> = LoopingSource::new(ramp(6, 1), region, Some(2)).collect();
        assert_eq!(played, vec![0., 1., 2., 3., 2., 3., 2., 3., 4., 5.]);
    }

    #[test]
    fn loop_points_are_frames_not_samples() {
        let mut region = LoopRegion::new();
        region.set_loop_in(1);
        region.set_loop_out(2);
        let played: Vec<f32> = LoopingSource::new(ramp(3, 2), region, Some(1)).collect();
        assert_eq!(played, vec![0., 1., 2., 3., 2., 3., 4., 5.]);
    }

    #[test]
    fn empty_region_plays_straight_through() {
        let mut region = LoopRegion::new();
        region.set_loop_in(3);
        region.set_loop_out(3);
        let played: Vec<f32> = LoopingSource::new(ramp(5, 1), region, None).collect();
        assert_eq!(played.len(), 5);
    }

    #[test]
    fn seek_moves_cursor_to_frame() {
        let mut source = LoopingSource::new(ramp(10, 2), LoopRegion::new(), None);
        source.try_seek(Duration::from_millis(4)).unwrap();
        assert_eq!(source.next(), Some(8.0));
        assert_eq!(source.next(), Some(9.0));
    }

    #[test]
    fn seek_past_end_is_clamped() {
        let mut region = LoopRegion::new();
        region.set_loop_out(5);
        let mut source = LoopingSource::new(ramp(10, 1), region, Some(0));
        source.try_seek(Duration::from_secs(3)).unwrap();
        assert_eq!(source.next(), None);
    }

    #[test]
    fn seek_then_loop_jumps_back_to_loop_in() {
        let mut region = LoopRegion::new();
        region.set_loop_in(1);
        region.set_loop_out(3);
        let mut source = LoopingSource::new(ramp(6, 1), region, Some(1));
        source.try_seek(Duration::from_millis(2)).unwrap();
        let played: Vec<f32> = source.collect();
        assert_eq!(played, vec![2., 1., 2., 3., 4., 5.]);
    }

    #[test]
    fn sink_transport_reports_pause_state() {
        let (sink, _queue) = Sink::new_idle();
        let transport = RodioTransport::new(sink);
        assert!(!transport.is_playing());

        transport
            .sink()
            .append(LoopingSource::new(ramp(100, 1), LoopRegion::new(), Some(0)));
        assert!(transport.is_playing());
        transport.pause();
        assert!(!transport.is_playing());
        transport.resume();
        assert!(transport.is_playing());
    }
}
