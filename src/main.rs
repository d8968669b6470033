use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use auto_cutloop::i18n::{self, t, Language};
use auto_cutloop::loop_region::Boundary;
use auto_cutloop::player::{LoopingSource, RodioTransport};
use auto_cutloop::presenter::LoopEditor;
use auto_cutloop::session::CutSession;
use auto_cutloop::source::SampleSource;
use auto_cutloop::threshold::{SilenceThreshold, ThresholdEditor};
use auto_cutloop::worker::{AnalysisKind, SilenceAnalysisWorker};
use auto_cutloop::{audio, AnalysisSettings};
use clap::{Parser, ValueEnum};
use rodio::{OutputStream, Sink};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Mode {
    /// Leading silence only
    In,
    /// Trailing silence only
    Out,
    /// Both ends from one whole-file read
    Full,
    /// Leading then trailing, each scanned in chunks
    Both,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Lang {
    En,
    Zh,
}

#[derive(Parser)]
#[command(author, version, about = "Finds loop points by trimming silence", long_about = None)]
struct Cli {
    input: PathBuf,
    /// Loop-in threshold, percent of full scale (1-99)
    #[arg(long)]
    in_threshold: Option<String>,
    /// Loop-out threshold, percent of full scale (1-99)
    #[arg(long)]
    out_threshold: Option<String>,
    /// Frames per read while scanning
    #[arg(long, default_value_t = auto_cutloop::scanner::DEFAULT_CHUNK_SIZE)]
    chunk_size: usize,
    #[arg(short, long, value_enum, default_value_t = Mode::Both)]
    mode: Mode,
    /// Play the detected loop after analysis
    #[arg(short, long)]
    play: bool,
    #[arg(short, long)]
    loops: Option<u32>,
    #[arg(long, value_enum, default_value_t = Lang::En)]
    lang: Lang,
}

struct ConsoleLoopEditor;

impl LoopEditor for ConsoleLoopEditor {
    fn show_position(&mut self, boundary: Boundary, text: &str) {
        log::debug!("loop {:?}: {}", boundary, text);
    }

    fn show_loop_length(&mut self, text: &str) {
        log::debug!("loop length: {}", text);
    }
}

struct ConsoleThresholdEditor;

impl ThresholdEditor for ConsoleThresholdEditor {
    fn set_enabled(&mut self, enabled: bool) {
        log::trace!("threshold editors enabled: {}", enabled);
    }

    fn show_percent(&mut self, boundary: Boundary, percent: u32) {
        log::debug!("{:?} threshold: {}%", boundary, percent);
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    i18n::set_language(match cli.lang {
        Lang::En => Language::En,
        Lang::Zh => Language::Zh,
    });

    println!("{} {:?}", t("loading"), cli.input);
    let source = audio::open_source(&cli.input)?;
    let length = source.length_in_samples().max(0) as u64;
    let sample_rate = source.sample_rate();
    println!(
        "Sample rate: {}, Channels: {}, Frames: {}",
        sample_rate,
        source.channel_count(),
        length
    );

    let settings = AnalysisSettings {
        chunk_size: cli.chunk_size.max(1),
        ..Default::default()
    };
    let mut session = CutSession::new(
        ConsoleLoopEditor,
        ConsoleThresholdEditor,
        SilenceThreshold::default(),
    );
    session.set_cut_mode(true);
    session.on_file_loaded(length, sample_rate);
    if let Some(text) = &cli.in_threshold {
        session.apply_threshold_text(Boundary::In, text);
    }
    if let Some(text) = &cli.out_threshold {
        session.apply_threshold_text(Boundary::Out, text);
    }

    // Without playback an idle sink stands in, so analysis never pauses anything.
    let output = if cli.play {
        Some(OutputStream::try_default().context("no audio output device")?)
    } else {
        None
    };
    let sink = match &output {
        Some((_stream, handle)) => Sink::try_new(handle)?,
        None => Sink::new_idle().0,
    };
    let transport = Arc::new(RodioTransport::new(sink));

    let kinds: &[AnalysisKind] = match cli.mode {
        Mode::In => &[AnalysisKind::DetectIn],
        Mode::Out => &[AnalysisKind::DetectOut],
        Mode::Full => &[AnalysisKind::FullFile],
        Mode::Both => &[AnalysisKind::DetectIn, AnalysisKind::DetectOut],
    };

    let worker = Arc::new(SilenceAnalysisWorker::new(settings));
    let mut source = Some(source);
    for &kind in kinds {
        // Chunked modes reopen the file so each pass owns its reader.
        let pass_source = match source.take() {
            Some(s) => s,
            None => audio::open_source(&cli.input)?,
        };
        println!("{}", t("scanning"));
        let receiver = worker
            .start_analysis(pass_source, Arc::clone(&transport), session.request(kind))
            .ok_or_else(|| anyhow!(t("busy")))?;
        let result = receiver
            .recv()
            .context("silence worker exited without a result")?;
        session.apply_analysis(&result);
    }

    for line in session.status() {
        println!("{}", line);
    }
    let presenter = session.presenter();
    let region = presenter.region();
    println!(
        "Loop in: {} ({:?})",
        presenter.position_text(Boundary::In),
        region.loop_in()
    );
    println!(
        "Loop out: {} ({:?})",
        presenter.position_text(Boundary::Out),
        region.loop_out()
    );

    if cli.play {
        let audio_data = audio::load_audio_file(&cli.input)?;
        let sink = transport.sink();
        sink.clear();
        sink.append(LoopingSource::new(audio_data, region, cli.loops));
        sink.play();
        println!("{}", t("playing"));
        sink.sleep_until_end();
    }

    Ok(())
}
