use anyhow::{Context, Result};
use auto_cutloop::audio;
use auto_cutloop::scanner::{ChunkPlan, ScanDirection, DEFAULT_CHUNK_SIZE};
use auto_cutloop::source::{ChunkBuffer, SampleSource};
use auto_cutloop::timecode::{format_time, frames_to_seconds};

// Prints every chunk a scan would visit with its peak level, for checking thresholds by eye.
fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let path = args.next().context("usage: debug_scan <file> [chunk_size]")?;
    let chunk_size = match args.next() {
        Some(s) => s.parse().context("chunk_size must be a number")?,
        None => DEFAULT_CHUNK_SIZE,
    };

    println!("Loading file: {}", path);
    let mut source = audio::open_source(&path)?;
    let length = source.length_in_samples();
    let sample_rate = source.sample_rate();
    let channels = source.channel_count();
    println!(
        "Sample Rate: {}, Channels: {}, Frames: {}",
        sample_rate, channels, length
    );
    if length <= 0 {
        println!("Nothing to scan.");
        return Ok(());
    }

    let mut buffer = ChunkBuffer::new(channels, chunk_size.min(length as usize));
    for range in ChunkPlan::new(length as u64, chunk_size, ScanDirection::Forward) {
        let len = (range.end - range.start) as usize;
        buffer.clear();
        source.read(&mut buffer, 0, len, range.start)?;

        let peak = (0..channels)
            .flat_map(|ch| buffer.channel(ch)[..len].iter())
            .fold(0.0f32, |acc, s| acc.max(s.abs()));
        println!(
            "{} {:>10}..{:<10} peak {:.4} ({:>3}%)",
            format_time(frames_to_seconds(range.start, sample_rate)),
            range.start,
            range.end,
            peak,
            (peak * 100.0).round() as u32
        );
    }

    Ok(())
}
