use anyhow::{Context, Result};
use symphonia::core::audio::{AudioBufferRef, Signal};
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::{MediaSource, MediaSourceStream};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;

use crate::source::{check_destination, ChunkBuffer, SampleSource};

#[derive(Clone, Debug)]
pub struct AudioData {
    pub samples: Vec<f32>, // Interleaved samples
    pub sample_rate: u32,
    pub channels: u16,
}

impl AudioData {
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            return 0;
        }
        self.samples.len() / self.channels as usize
    }
}

impl SampleSource for AudioData {
    fn length_in_samples(&self) -> i64 {
        self.frames() as i64
    }

    fn channel_count(&self) -> usize {
        self.channels as usize
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn read(
        &mut self,
        dest: &mut ChunkBuffer,
        dest_offset: usize,
        num_samples: usize,
        start_sample: u64,
    ) -> io::Result<()> {
        check_destination(dest, dest_offset, num_samples)?;
        let channels = self.channels as usize;
        let frames = self.frames() as u64;
        let copy_channels = channels.min(dest.num_channels());

        for i in 0..num_samples {
            let src = start_sample.saturating_add(i as u64);
            for ch in 0..copy_channels {
                dest.channel_mut(ch)[dest_offset + i] = if src < frames {
                    self.samples[src as usize * channels + ch]
                } else {
                    0.0
                };
            }
        }
        Ok(())
    }
}

// Core loading function that takes a generic MediaSource
pub fn load_audio_from_source(source: Box<dyn MediaSource>, hint: &Hint) -> Result<AudioData> {
    let mss = MediaSourceStream::new(source, Default::default());

    let meta_opts: MetadataOptions = Default::default();
    let fmt_opts: FormatOptions = Default::default();

    let mut probed = symphonia::default::get_probe()
        .format(hint, mss, &fmt_opts, &meta_opts)
        .context("unsupported format")?;

    let mut format = probed.format;
    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .context("no supported audio track")?;

    let dec_opts: DecoderOptions = Default::default();
    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &dec_opts)
        .context("unsupported codec")?;

    let track_id = track.id;
    let mut samples: Vec<f32> = Vec::new();
    let mut sample_rate = 0;
    let mut channels = 0;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(Error::IoError(_)) => break,
            Err(Error::ResetRequired) => break,
            Err(_) => break,
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                if sample_rate == 0 {
                    let spec = decoded.spec();
                    sample_rate = spec.rate;
                    channels = spec.channels.count() as u16;
                }
                append_interleaved(&decoded, &mut samples);
            }
            Err(Error::DecodeError(e)) => log::debug!("skipping undecodable packet: {}", e),
            Err(_) => break,
        }
    }

    log::debug!(
        "decoded {} samples, {} Hz, {} channel(s)",
        samples.len(),
        sample_rate,
        channels
    );

    Ok(AudioData {
        samples,
        sample_rate,
        channels,
    })
}

macro_rules! push_frames {
    ($buf:expr, $out:expr, $conv:expr) => {{
        let n_channels = $buf.spec().channels.count();
        for i in 0..$buf.frames() {
            for c in 0..n_channels {
                $out.push($conv($buf.chan(c)[i]));
            }
        }
    }};
}

fn append_interleaved(decoded: &AudioBufferRef<'_>, samples: &mut Vec<f32>) {
    match decoded {
        AudioBufferRef::F32(buf) => push_frames!(buf, samples, |s: f32| s),
        AudioBufferRef::F64(buf) => push_frames!(buf, samples, |s: f64| s as f32),
        AudioBufferRef::U8(buf) => push_frames!(buf, samples, |s: u8| (s as f32 / 128.0) - 1.0),
        AudioBufferRef::U16(buf) => {
            push_frames!(buf, samples, |s: u16| (s as f32 / 32768.0) - 1.0)
        }
        AudioBufferRef::U24(buf) => push_frames!(buf, samples, |s: symphonia::core::sample::u24| {
            (s.0 as f32 / 8388608.0) - 1.0
        }),
        AudioBufferRef::U32(buf) => {
            push_frames!(buf, samples, |s: u32| (s as f32 / 2147483648.0) - 1.0)
        }
        AudioBufferRef::S8(buf) => push_frames!(buf, samples, |s: i8| s as f32 / 128.0),
        AudioBufferRef::S16(buf) => push_frames!(buf, samples, |s: i16| s as f32 / 32768.0),
        AudioBufferRef::S24(buf) => push_frames!(buf, samples, |s: symphonia::core::sample::i24| {
            s.0 as f32 / 8388608.0
        }),
        AudioBufferRef::S32(buf) => {
            push_frames!(buf, samples, |s: i32| s as f32 / 2147483648.0)
        }
    }
}

pub fn load_audio_file<P: AsRef<Path>>(path: P) -> Result<AudioData> {
    let src = File::open(&path).context("failed to open audio file")?;

    let mut hint = Hint::new();
    if let Some(ext) = path.as_ref().extension() {
        if let Some(ext_str) = ext.to_str() {
            hint.with_extension(ext_str);
        }
    }

    load_audio_from_source(Box::new(src), &hint)
}

/// Streams frames straight from a WAV file, one chunk per `read` call.
pub struct WavFileSource {
    reader: hound::WavReader<BufReader<File>>,
    spec: hound::WavSpec,
    frames: u32,
}

impl WavFileSource {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = hound::WavReader::open(path.as_ref())
            .with_context(|| format!("failed to open WAV file {:?}", path.as_ref()))?;
        let spec = reader.spec();
        let frames = reader.duration();
        Ok(Self {
            reader,
            spec,
            frames,
        })
    }

    /// Decodes `frames` frames at the reader position straight into `dest`.
    fn read_into(
        &mut self,
        dest: &mut ChunkBuffer,
        dest_offset: usize,
        frames: usize,
    ) -> io::Result<()> {
        let channels = self.spec.channels as usize;
        let copy_channels = channels.min(dest.num_channels());
        let wanted = frames * channels;
        let mut written = 0;

        let mut store = |index: usize, value: f32| {
            let ch = index % channels;
            if ch < copy_channels {
                dest.channel_mut(ch)[dest_offset + index / channels] = value;
            }
        };

        match self.spec.sample_format {
            hound::SampleFormat::Float => {
                for s in self.reader.samples::<f32>().take(wanted) {
                    store(written, s.map_err(hound_to_io)?);
                    written += 1;
                }
            }
            hound::SampleFormat::Int => {
                let scale = (1i64 << (self.spec.bits_per_sample.saturating_sub(1))) as f32;
                for s in self.reader.samples::<i32>().take(wanted) {
                    store(written, s.map_err(hound_to_io)? as f32 / scale);
                    written += 1;
                }
            }
        }

        if written < wanted {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("expected {} samples, got {}", wanted, written),
            ));
        }
        Ok(())
    }
}

impl SampleSource for WavFileSource {
    fn length_in_samples(&self) -> i64 {
        self.frames as i64
    }

    fn channel_count(&self) -> usize {
        self.spec.channels as usize
    }

    fn sample_rate(&self) -> u32 {
        self.spec.sample_rate
    }

    fn read(
        &mut self,
        dest: &mut ChunkBuffer,
        dest_offset: usize,
        num_samples: usize,
        start_sample: u64,
    ) -> io::Result<()> {
        check_destination(dest, dest_offset, num_samples)?;
        let copy_channels = (self.spec.channels as usize).min(dest.num_channels());

        let available = (self.frames as u64).saturating_sub(start_sample);
        let to_read = available.min(num_samples as u64) as usize;

        if to_read > 0 {
            // start_sample < frames here, so it fits in u32
            self.reader.seek(start_sample as u32)?;
            self.read_into(dest, dest_offset, to_read)?;
        }

        for ch in 0..copy_channels {
            dest.channel_mut(ch)[dest_offset + to_read..dest_offset + num_samples].fill(0.0);
        }
        Ok(())
    }
}

fn hound_to_io(err: hound::Error) -> io::Error {
    match err {
        hound::Error::IoError(e) => e,
        other => io::Error::new(io::ErrorKind::InvalidData, other),
    }
}

/// WAV files are streamed, anything else is decoded into memory first.
pub fn open_source<P: AsRef<Path>>(path: P) -> Result<Box<dyn SampleSource + Send>> {
    let is_wav = path
        .as_ref()
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("wav"))
        .unwrap_or(false);

    if is_wav {
        Ok(Box::new(WavFileSource::open(path)?))
    } else {
        Ok(Box::new(load_audio_file(path)?))
    }
}
