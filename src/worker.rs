//! Runs a silence analysis pass with playback paused around it.

use std::collections::TryReserveError;
use std::fmt;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver};
use thiserror::Error;

use crate::playback::{PlaybackCoordinator, Transport};
use crate::scanner::{first_signal_in, last_signal_in, ScanError, SilenceBoundaryScanner};
use crate::source::{ChunkBuffer, SampleSource};
use crate::threshold::SilenceThreshold;
use crate::timecode::frames_to_seconds;
use crate::AnalysisSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisKind {
    DetectIn,
    DetectOut,
    FullFile,
}

impl fmt::Display for AnalysisKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisKind::DetectIn => write!(f, "In"),
            AnalysisKind::DetectOut => write!(f, "Out"),
            AnalysisKind::FullFile => write!(f, "In/Out"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AnalysisRequest {
    pub kind: AnalysisKind,
    pub thresholds: SilenceThreshold,
    /// Move the play head to a newly found in point before resuming.
    pub seek_to_start: bool,
}

impl AnalysisRequest {
    pub fn new(kind: AnalysisKind, thresholds: SilenceThreshold) -> Self {
        Self {
            kind,
            thresholds,
            seek_to_start: false,
        }
    }

    pub fn seek_to_start(mut self, seek: bool) -> Self {
        self.seek_to_start = seek;
        self
    }
}

/// Boundaries found by one pass. `None` means that end is silent throughout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisOutcome {
    pub kind: AnalysisKind,
    pub start: Option<u64>,
    pub end: Option<u64>,
    pub length: u64,
    pub sample_rate: u32,
}

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("audio length is zero")]
    ZeroLengthAudio,
    #[error("audio of {length} frames exceeds the {limit} frame limit")]
    AudioTooLarge { length: u64, limit: u64 },
    #[error("not enough memory to hold {length} frames")]
    AllocationFailure {
        length: u64,
        #[source]
        source: TryReserveError,
    },
    #[error("read failed at frame {start}: {source}")]
    ReadFailure {
        start: u64,
        #[source]
        source: io::Error,
    },
    #[error("unsupported channel count: {0}")]
    UnsupportedChannels(usize),
}

impl AnalysisError {
    /// Key into [`crate::i18n`] for the user-facing status line.
    pub fn status_key(&self) -> &'static str {
        match self {
            AnalysisError::ZeroLengthAudio => "zero_length",
            AnalysisError::AudioTooLarge { .. } => "too_large",
            AnalysisError::AllocationFailure { .. } => "out_of_memory",
            AnalysisError::ReadFailure { .. } => "read_failure",
            AnalysisError::UnsupportedChannels(_) => "bad_channels",
        }
    }
}

impl From<ScanError> for AnalysisError {
    fn from(err: ScanError) -> Self {
        match err {
            ScanError::UnsupportedChannels(n) => AnalysisError::UnsupportedChannels(n),
            ScanError::ReadFailure { start, source, .. } => {
                AnalysisError::ReadFailure { start, source }
            }
        }
    }
}

pub type AnalysisResult = Result<AnalysisOutcome, AnalysisError>;

pub struct SilenceAnalysisWorker {
    settings: AnalysisSettings,
    scanner: SilenceBoundaryScanner,
    busy: AtomicBool,
}

impl Default for SilenceAnalysisWorker {
    fn default() -> Self {
        Self::new(AnalysisSettings::default())
    }
}

impl SilenceAnalysisWorker {
    pub fn new(settings: AnalysisSettings) -> Self {
        let scanner =
            SilenceBoundaryScanner::new(settings.chunk_size).with_max_channels(settings.max_channels);
        Self {
            settings,
            scanner,
            busy: AtomicBool::new(false),
        }
    }

    pub fn settings(&self) -> &AnalysisSettings {
        &self.settings
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    pub fn detect_in<S, T>(&self, source: &mut S, transport: &T, threshold: f32) -> AnalysisResult
    where
        S: SampleSource + ?Sized,
        T: Transport + ?Sized,
    {
        let thresholds = SilenceThreshold::new(threshold, self.settings.thresholds.out_threshold());
        self.analyze(
            source,
            transport,
            &AnalysisRequest::new(AnalysisKind::DetectIn, thresholds),
        )
    }

    pub fn detect_out<S, T>(&self, source: &mut S, transport: &T, threshold: f32) -> AnalysisResult
    where
        S: SampleSource + ?Sized,
        T: Transport + ?Sized,
    {
        let thresholds = SilenceThreshold::new(self.settings.thresholds.in_threshold(), threshold);
        self.analyze(
            source,
            transport,
            &AnalysisRequest::new(AnalysisKind::DetectOut, thresholds),
        )
    }

    pub fn analyze_full_file<S, T>(
        &self,
        source: &mut S,
        transport: &T,
        thresholds: SilenceThreshold,
    ) -> AnalysisResult
    where
        S: SampleSource + ?Sized,
        T: Transport + ?Sized,
    {
        self.analyze(
            source,
            transport,
            &AnalysisRequest::new(AnalysisKind::FullFile, thresholds),
        )
    }

    /// Pauses playback, runs the pass, and resumes playback if it was running.
    ///
    /// The resume happens on every return path, including errors.
    pub fn analyze<S, T>(&self, source: &mut S, transport: &T, request: &AnalysisRequest) -> AnalysisResult
    where
        S: SampleSource + ?Sized,
        T: Transport + ?Sized,
    {
        let playback = PlaybackCoordinator::pause_if_playing(transport);

        let outcome = self.run_pass(source, request).map_err(|err| {
            log::warn!("{} silence detection failed: {}", request.kind, err);
            err
        })?;

        if request.seek_to_start {
            if let Some(start) = outcome.start {
                let seconds = frames_to_seconds(start, outcome.sample_rate);
                playback.transport().seek(Duration::from_secs_f64(seconds));
            }
        }

        playback.resume_if_was_playing();
        Ok(outcome)
    }

    fn run_pass<S>(&self, source: &mut S, request: &AnalysisRequest) -> AnalysisResult
    where
        S: SampleSource + ?Sized,
    {
        let length = source.length_in_samples();
        log::info!(
            "scanning {} samples for {} silence boundary",
            length,
            request.kind
        );
        if length <= 0 {
            return Err(AnalysisError::ZeroLengthAudio);
        }
        let length = length as u64;

        let limit = match request.kind {
            AnalysisKind::FullFile => self.settings.max_single_read,
            AnalysisKind::DetectIn | AnalysisKind::DetectOut => self.settings.max_scan_length,
        };
        if length > limit {
            return Err(AnalysisError::AudioTooLarge { length, limit });
        }

        let sample_rate = source.sample_rate();
        let mut outcome = AnalysisOutcome {
            kind: request.kind,
            start: None,
            end: None,
            length,
            sample_rate,
        };

        match request.kind {
            AnalysisKind::DetectIn => {
                outcome.start = self
                    .scanner
                    .find_first_signal(source, request.thresholds.in_threshold())?;
            }
            AnalysisKind::DetectOut => {
                outcome.end = self
                    .scanner
                    .find_last_signal(source, request.thresholds.out_threshold())?
                    .map(|frame| self.with_tail(frame, length, sample_rate));
            }
            AnalysisKind::FullFile => {
                let (start, end) = self.scan_whole_file(source, length, &request.thresholds)?;
                outcome.start = start;
                outcome.end = end.map(|frame| self.with_tail(frame, length, sample_rate));
            }
        }

        Ok(outcome)
    }

    /// Materializes the whole file in one buffer and searches both ends.
    fn scan_whole_file<S>(
        &self,
        source: &mut S,
        length: u64,
        thresholds: &SilenceThreshold,
    ) -> Result<(Option<u64>, Option<u64>), AnalysisError>
    where
        S: SampleSource + ?Sized,
    {
        let channels = source.channel_count();
        if channels == 0 || channels > self.settings.max_channels {
            return Err(AnalysisError::UnsupportedChannels(channels));
        }

        let frames = usize::try_from(length).map_err(|_| AnalysisError::AudioTooLarge {
            length,
            limit: usize::MAX as u64,
        })?;

        let mut buffer = ChunkBuffer::try_new(channels, frames)
            .map_err(|source| AnalysisError::AllocationFailure { length, source })?;

        source
            .read(&mut buffer, 0, frames, 0)
            .map_err(|source| AnalysisError::ReadFailure { start: 0, source })?;

        let start = first_signal_in(&buffer, frames, thresholds.in_threshold()).map(|f| f as u64);
        let end = last_signal_in(&buffer, frames, thresholds.out_threshold()).map(|f| f as u64);
        Ok((start, end))
    }

    fn with_tail(&self, frame: u64, length: u64, sample_rate: u32) -> u64 {
        frame
            .saturating_add(self.settings.tail_frames(sample_rate))
            .min(length)
    }

    /// Runs [`analyze`](Self::analyze) on a background thread.
    ///
    /// Returns `None` if another analysis is still running or the thread
    /// could not be started. The receiver yields exactly one result.
    pub fn start_analysis<S, T>(
        self: &Arc<Self>,
        mut source: S,
        transport: Arc<T>,
        request: AnalysisRequest,
    ) -> Option<Receiver<AnalysisResult>>
    where
        S: SampleSource + Send + 'static,
        T: Transport + Send + Sync + ?Sized + 'static,
    {
        if self
            .busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            log::warn!("silence analysis already running, ignoring {} request", request.kind);
            return None;
        }

        let (sender, receiver) = bounded(1);
        let worker = Arc::clone(self);

        let spawned = thread::Builder::new()
            .name("silence-worker".into())
            .spawn(move || {
                let result = worker.analyze(&mut source, &*transport, &request);
                worker.busy.store(false, Ordering::SeqCst);
                sender.send(result).ok();
            });

        match spawned {
            Ok(_) => Some(receiver),
            Err(e) => {
                log::error!("failed to start silence worker: {}", e);
                self.busy.store(false, Ordering::SeqCst);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::test_support::MockTransport;
    use crate::scanner::test_support::FnSource;

    fn worker_with_chunk(chunk_size: usize) -> SilenceAnalysisWorker {
        SilenceAnalysisWorker::new(AnalysisSettings {
            chunk_size,
            tail_ms: 0,
            ..Default::default()
        })
    }

    #[test]
    fn detect_in_end_to_end() {
        let worker = worker_with_chunk(100);
        let transport = MockTransport::playing();
        let mut src = FnSource::new(1000, |i| if i < 250 { 0.05 } else { 0.5 });

        let outcome = worker.detect_in(&mut src, &transport, 0.1).unwrap();

        assert_eq!(outcome.start, Some(250));
        assert_eq!(outcome.end, None);
        assert_eq!(transport.pauses(), 1);
        assert_eq!(transport.resumes(), 1);
        assert!(transport.is_playing_now());
    }

    #[test]
    fn zero_and_negative_lengths_never_read() {
        for length in [0i64, -1, -44100] {
            for playing in [true, false] {
                let worker = worker_with_chunk(100);
                let transport = if playing {
                    MockTransport::playing()
                } else {
                    MockTransport::default()
                };
                let mut src = FnSource::new(length, |_| 1.0);

                let err = worker.detect_out(&mut src, &transport, 0.1).unwrap_err();

                assert!(matches!(err, AnalysisError::ZeroLengthAudio));
                assert!(src.reads.is_empty());
                assert_eq!(transport.is_playing_now(), playing);
                assert_eq!(transport.resumes(), usize::from(playing));
            }
        }
    }

    #[test]
    fn read_failure_resumes_and_emits_nothing() {
        let worker = worker_with_chunk(100);
        let transport = MockTransport::playing();
        let mut src = FnSource::new(1000, |_| 0.0);
        src.fail_on_read.insert(2);
        src.poison_on_failure = Some(1.0);

        let err = worker.detect_in(&mut src, &transport, 0.1).unwrap_err();

        assert!(matches!(err, AnalysisError::ReadFailure { start: 200, .. }));
        assert_eq!(err.status_key(), "read_failure");
        assert_eq!(transport.resumes(), 1);
    }

    #[test]
    fn stopped_transport_is_never_resumed() {
        let worker = worker_with_chunk(100);
        let transport = MockTransport::default();
        let mut src = FnSource::new(300, |i| if i == 7 { 1.0 } else { 0.0 });
        worker.detect_in(&mut src, &transport, 0.1).unwrap();
        assert_eq!(transport.pauses(), 0);
        assert_eq!(transport.resumes(), 0);
    }

    #[test]
    fn out_point_gets_clamped_tail() {
        let worker = SilenceAnalysisWorker::new(AnalysisSettings {
            chunk_size: 64,
            tail_ms: 50,
            ..Default::default()
        });
        let transport = MockTransport::default();
        // FnSource runs at 1000 Hz, so the tail is 50 frames.
        let mut src = FnSource::new(1000, |i| if i == 500 || i == 990 { 0.8 } else { 0.0 });
        let outcome = worker.detect_out(&mut src, &transport, 0.1).unwrap();
        assert_eq!(outcome.end, Some(1000));

        let mut src = FnSource::new(1000, |i| if i == 500 { 0.8 } else { 0.0 });
        let outcome = worker.detect_out(&mut src, &transport, 0.1).unwrap();
        assert_eq!(outcome.end, Some(550));
    }

    #[test]
    fn full_file_finds_both_ends_in_one_read() {
        let worker = worker_with_chunk(16);
        let transport = MockTransport::playing();
        let mut src = FnSource::new(400, |i| if (120..=300).contains(&i) { 0.3 } else { 0.0 });

        let outcome = worker
            .analyze_full_file(&mut src, &transport, SilenceThreshold::new(0.1, 0.1))
            .unwrap();

        assert_eq!(outcome.start, Some(120));
        assert_eq!(outcome.end, Some(300));
        assert_eq!(src.reads, vec![0..400]);
        assert_eq!(transport.resumes(), 1);
    }

    #[test]
    fn full_file_rejects_lengths_beyond_single_read() {
        let worker = SilenceAnalysisWorker::new(AnalysisSettings {
            max_single_read: 1000,
            ..Default::default()
        });
        let transport = MockTransport::playing();
        let mut src = FnSource::new(1001, |_| 0.0);

        let err = worker
            .analyze_full_file(&mut src, &transport, SilenceThreshold::default())
            .unwrap_err();

        assert!(matches!(err, AnalysisError::AudioTooLarge { length: 1001, limit: 1000 }));
        assert!(src.reads.is_empty());
        assert_eq!(transport.resumes(), 1);
    }

    #[test]
    fn full_file_allocation_failure_is_distinct() {
        let worker = SilenceAnalysisWorker::new(AnalysisSettings {
            max_single_read: u64::MAX,
            ..Default::default()
        });
        let transport = MockTransport::playing();
        // 2^62 frames of f32 cannot be described by a valid allocation.
        let mut src = FnSource::new(1i64 << 62, |_| 0.0);

        let err = worker
            .analyze_full_file(&mut src, &transport, SilenceThreshold::default())
            .unwrap_err();

        assert!(matches!(err, AnalysisError::AllocationFailure { .. }));
        assert_eq!(err.status_key(), "out_of_memory");
        assert!(src.reads.is_empty());
        assert_eq!(transport.resumes(), 1);
    }

    #[test]
    fn chunked_scans_accept_lengths_beyond_single_read() {
        let worker = SilenceAnalysisWorker::new(AnalysisSettings {
            chunk_size: 100,
            max_single_read: 10,
            ..Default::default()
        });
        let transport = MockTransport::default();
        let mut src = FnSource::new(500, |i| if i == 321 { 1.0 } else { 0.0 });
        let outcome = worker.detect_in(&mut src, &transport, 0.5).unwrap();
        assert_eq!(outcome.start, Some(321));
    }

    #[test]
    fn chunked_scan_limit_is_enforced() {
        let worker = SilenceAnalysisWorker::new(AnalysisSettings {
            max_scan_length: 99,
            ..Default::default()
        });
        let transport = MockTransport::playing();
        let mut src = FnSource::new(100, |_| 1.0);
        let err = worker.detect_in(&mut src, &transport, 0.1).unwrap_err();
        assert_eq!(err.status_key(), "too_large");
        assert_eq!(transport.resumes(), 1);
    }

    #[test]
    fn seek_happens_before_resume_when_requested() {
        let worker = worker_with_chunk(50);
        let transport = MockTransport::playing();
        let mut src = FnSource::new(1000, |i| if i >= 400 { 1.0 } else { 0.0 });
        let request = AnalysisRequest::new(AnalysisKind::DetectIn, SilenceThreshold::new(0.5, 0.5))
            .seek_to_start(true);

        worker.analyze(&mut src, &transport, &request).unwrap();

        assert_eq!(transport.current_position(), Duration::from_millis(400));
        assert_eq!(transport.calls(), vec!["pause", "seek", "resume"]);
    }

    #[test]
    fn no_seek_without_an_in_point() {
        let worker = worker_with_chunk(50);
        let transport = MockTransport::playing();
        let mut src = FnSource::new(1000, |_| 0.0);
        let request = AnalysisRequest::new(AnalysisKind::DetectIn, SilenceThreshold::default())
            .seek_to_start(true);

        let outcome = worker.analyze(&mut src, &transport, &request).unwrap();

        assert_eq!(outcome.start, None);
        assert_eq!(transport.calls(), vec!["pause", "resume"]);
    }

    #[test]
    fn full_file_read_failure_resumes_once() {
        let worker = worker_with_chunk(16);
        let transport = MockTransport::playing();
        let mut src = FnSource::new(400, |_| 1.0);
        src.fail_on_read.insert(0);
        let request = AnalysisRequest::new(AnalysisKind::FullFile, SilenceThreshold::default())
            .seek_to_start(true);

        let err = worker.analyze(&mut src, &transport, &request).unwrap_err();

        assert!(matches!(err, AnalysisError::ReadFailure { start: 0, .. }));
        assert_eq!(src.reads, vec![0..400]);
        assert_eq!(transport.calls(), vec!["pause", "resume"]);
        assert!(transport.is_playing_now());
    }

    #[test]
    fn background_analysis_reports_once_and_clears_busy() {
        let worker = Arc::new(worker_with_chunk(100));
        let transport = Arc::new(MockTransport::playing());
        let src = FnSource::new(1000, |i| if i < 250 { 0.05 } else { 0.5 });
        let request = AnalysisRequest::new(AnalysisKind::DetectIn, SilenceThreshold::new(0.1, 0.1));

        let rx = worker
            .start_analysis(src, Arc::clone(&transport), request)
            .expect("worker idle");
        let outcome = rx.recv().unwrap().unwrap();

        assert_eq!(outcome.start, Some(250));
        assert!(!worker.is_busy());
        assert_eq!(transport.resumes(), 1);
    }

    #[test]
    fn busy_worker_rejects_second_request() {
        let worker = Arc::new(worker_with_chunk(100));
        worker.busy.store(true, Ordering::SeqCst);
        let transport = Arc::new(MockTransport::default());
        let request = AnalysisRequest::new(AnalysisKind::DetectOut, SilenceThreshold::default());
        assert!(worker
            .start_analysis(FnSource::new(10, |_| 0.0), transport, request)
            .is_none());
    }
}
