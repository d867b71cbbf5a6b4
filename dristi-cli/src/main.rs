// Dristi command line: narrates a camera feed for visually-impaired users.
// Frames come from a directory of images; commands are read from stdin, one
// key per line (an empty line is the space key).

use anyhow::{anyhow, Context};
use clap::Parser;
use dristi_core::{AnalyzerEndpoints, AnalyzerKind, DristiConfig};
use dristi_eye::remote::{RemoteDepthEstimator, RemoteDetector, RemoteSceneClassifier};
use dristi_eye::{AnalyzerAdapter, ImageSequenceSource};
use dristi_narrator::Session;
use dristi_spk::{SpeechChannel, SpeechConfig, TtsBackend};
use std::io::{self, BufRead};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

const INITIALIZING: &str = "Initializing Dristi. Please wait.";

#[derive(Parser, Debug)]
#[command(name = "dristi")]
#[command(about = "Dristi - spoken descriptions of a live camera feed", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file (JSON or TOML)
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Directory of frames replayed as the camera
    #[arg(long)]
    frames: Option<PathBuf>,

    /// Replay the frame directory in a loop
    #[arg(long = "loop")]
    loop_frames: bool,

    /// Frames per second
    #[arg(long)]
    frame_rate: Option<u32>,

    /// Object detection endpoint
    #[arg(long)]
    detector_url: Option<String>,

    /// Depth estimation endpoint
    #[arg(long)]
    depth_url: Option<String>,

    /// Scene classification endpoint
    #[arg(long)]
    scene_url: Option<String>,

    /// Run depth estimation
    #[arg(long)]
    depth: bool,

    /// Start with auto-narration on
    #[arg(long)]
    auto: bool,

    /// Seconds between automatic descriptions
    #[arg(long)]
    auto_interval: Option<u64>,

    /// Print utterances instead of speaking them
    #[arg(long)]
    console_speech: bool,

    /// Log utterances only
    #[arg(long)]
    mute: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long)]
    log_level: Option<String>,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

impl Cli {
    /// Flags override the file and the environment
    fn apply(&self, config: &mut DristiConfig, speech: &mut SpeechConfig) {
        if let Some(frames) = &self.frames {
            config.camera.source = Some(frames.clone());
        }
        if self.loop_frames {
            config.camera.loop_source = true;
        }
        if let Some(rate) = self.frame_rate {
            config.camera.frame_rate = rate;
        }
        if let Some(url) = &self.detector_url {
            config.analyzers.detector_url = Some(url.clone());
        }
        if let Some(url) = &self.depth_url {
            config.analyzers.depth_url = Some(url.clone());
        }
        if let Some(url) = &self.scene_url {
            config.analyzers.scene_url = Some(url.clone());
        }
        if self.depth {
            config.cadence.enable_depth = true;
        }
        if self.auto {
            config.narration.auto_narrate = true;
        }
        if let Some(secs) = self.auto_interval {
            config.narration.auto_interval_secs = secs;
        }
        if let Some(level) = &self.log_level {
            config.log_level = Some(level.clone());
        }

        if self.console_speech {
            speech.engine = TtsBackend::Console;
        }
        if self.mute {
            speech.enabled = false;
        }
    }
}

/// Default config location, e.g. ~/.config/dristi/config.toml
fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir()
        .map(|dir| dir.join("dristi").join("config.toml"))
        .filter(|path| path.exists())
}

fn load_config(path: Option<&Path>) -> anyhow::Result<(DristiConfig, SpeechConfig)> {
    let path = match path.map(Path::to_path_buf).or_else(default_config_path) {
        Some(path) => path,
        None => return Ok((DristiConfig::default(), SpeechConfig::default())),
    };

    let content =
        std::fs::read_to_string(&path).with_context(|| format!("Failed to read config file {:?}", path))?;
    let config = DristiConfig::from_str(&content).with_context(|| format!("Invalid config file {:?}", path))?;
    let speech = SpeechConfig::from_document(&content)?;
    Ok((config, speech))
}

fn init_logging(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Adapters for the configured endpoints. Kinds without an endpoint are
/// left out and the scheduler disables them.
fn build_adapters(endpoints: &AnalyzerEndpoints) -> Vec<AnalyzerAdapter> {
    let timeout = Duration::from_secs(endpoints.timeout_secs);
    let mut adapters = Vec::new();

    if let Some(url) = &endpoints.detector_url {
        adapters.push(AnalyzerAdapter::from_init(
            AnalyzerKind::Objects,
            RemoteDetector::new(url, timeout, endpoints.min_confidence),
            |detector| AnalyzerAdapter::objects(Arc::new(detector)),
        ));
    }
    if let Some(url) = &endpoints.depth_url {
        adapters.push(AnalyzerAdapter::from_init(
            AnalyzerKind::Depth,
            RemoteDepthEstimator::new(url, timeout),
            |estimator| AnalyzerAdapter::depth(Arc::new(estimator)),
        ));
    }
    if let Some(url) = &endpoints.scene_url {
        adapters.push(AnalyzerAdapter::from_init(
            AnalyzerKind::Scene,
            RemoteSceneClassifier::new(url, timeout),
            |classifier| AnalyzerAdapter::scene(Arc::new(classifier)),
        ));
    }

    adapters
}

/// Key code for one line of input
fn command_code(line: &str) -> char {
    line.trim_end_matches(&['\r', '\n'][..])
        .chars()
        .next()
        .map(|c| c.to_ascii_lowercase())
        .unwrap_or(' ')
}

/// Read commands from stdin on a plain thread; the channel closes on EOF
fn spawn_command_reader() -> mpsc::Receiver<char> {
    let (tx, rx) = mpsc::channel(16);

    std::thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    warn!("Failed to read command input: {}", e);
                    break;
                }
            };
            if tx.blocking_send(command_code(&line)).is_err() {
                break;
            }
        }
        debug!("Command reader finished");
    });

    rx
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let (mut config, mut speech_config) = load_config(cli.config.as_deref())?;
    config.apply_env();
    cli.apply(&mut config, &mut speech_config);

    init_logging(config.log_level.as_deref().unwrap_or("info"), cli.json_logs);

    config.validate().map_err(|e| anyhow!("Invalid configuration: {}", e))?;
    speech_config
        .validate()
        .map_err(|e| anyhow!("Invalid speech configuration: {}", e))?;

    let speech = Arc::new(SpeechChannel::from_config(&speech_config));
    speech.say_and_wait(INITIALIZING).await?;

    let adapters = build_adapters(&config.analyzers);

    let frames = config
        .camera
        .source
        .clone()
        .ok_or_else(|| anyhow!("No frame source configured; pass --frames <dir>"))?;
    let mut source = ImageSequenceSource::open(&frames, &config.camera)?;

    let mut session = Session::new(&config, adapters, speech.clone())?
        .with_flush_timeout(Duration::from_millis(speech_config.flush_timeout_ms));

    info!("Commands: space=describe h=hazards l=location o=objects p=people r=repeat c=surroundings a=auto q=quit");

    match session.run(&mut source, spawn_command_reader()).await {
        Ok(end) => {
            info!("Dristi stopped after {} frames", end.frames);
            Ok(())
        }
        Err(e) => {
            error!("Session failed: {}", e);
            Err(e.into())
        }
    }
}
