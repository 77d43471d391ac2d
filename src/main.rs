use std::fs;
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use crossbeam_channel::Receiver;
use tracing::{info, warn};

use recon_stream::io::{RecordedCaptureDevice, RecordingWriter};
use recon_stream::{
    CaptureSession, ClientEvent, CollectorKind, PollOutcome, ReconstructionClient, Role,
    SessionConfig,
};

#[derive(Parser)]
#[command(name = "recon_stream")]
#[command(about = "Stream captured keyframes to a reconstruction server")]
#[command(version)]
struct Cli {
    /// Recorded capture directory with a frames.csv index (host only).
    #[arg(long)]
    recording: Option<PathBuf>,

    /// Session config (JSON). Flags below override it.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Server websocket URL.
    #[arg(long)]
    url: Option<String>,

    #[arg(long)]
    scene: Option<String>,

    #[arg(long, value_enum)]
    role: Option<CliRole>,

    /// Collector preset.
    #[arg(long, value_enum)]
    collector: Option<CliCollector>,

    /// Replay rate of the recording.
    #[arg(long, default_value = "10.0")]
    fps: f32,

    /// How long to keep the connection open after the recording ends.
    #[arg(long, default_value = "10")]
    linger_secs: u64,

    /// Directory to write received meshes to (GLB).
    #[arg(long)]
    out: Option<PathBuf>,

    /// Also save every accepted keyframe as a new recording (host only).
    #[arg(long)]
    record: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum CliRole {
    Host,
    Visitor,
}

#[derive(Clone, Copy, ValueEnum)]
enum CliCollector {
    NeuralRecon,
    Slam3r,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = session_config(&cli)?;
    if let Some(out) = &cli.out {
        fs::create_dir_all(out).with_context(|| format!("Failed to create {}", out.display()))?;
    }

    match config.role {
        Role::Host => run_host(&cli, config),
        Role::Visitor => run_visitor(&cli, config),
    }
}

fn session_config(cli: &Cli) -> Result<SessionConfig> {
    let mut config = match &cli.config {
        Some(path) => SessionConfig::from_json_file(path)?,
        None => SessionConfig::default(),
    };
    if let Some(url) = &cli.url {
        config.client.server_url = url.clone();
    }
    if let Some(scene) = &cli.scene {
        config.scene = scene.clone();
    }
    if let Some(role) = cli.role {
        config.role = match role {
            CliRole::Host => Role::Host,
            CliRole::Visitor => Role::Visitor,
        };
    }
    if let Some(collector) = cli.collector {
        let kind = match collector {
            CliCollector::NeuralRecon => CollectorKind::NeuralRecon,
            CliCollector::Slam3r => CollectorKind::Slam3r,
        };
        config.collector = kind.config();
    }
    config.validate()?;
    Ok(config)
}

/// Time between replayed frames.
fn replay_period(fps: f32) -> Result<Duration> {
    if !(fps.is_finite() && fps > 0.0) {
        bail!("--fps must be a positive number, got {}", fps);
    }
    Duration::try_from_secs_f32(1.0 / fps).with_context(|| format!("--fps {} is out of range", fps))
}

fn run_host(cli: &Cli, config: SessionConfig) -> Result<()> {
    let Some(recording) = &cli.recording else {
        bail!("host sessions need --recording");
    };
    let period = replay_period(cli.fps)?;

    let device = RecordedCaptureDevice::open(recording)
        .with_context(|| format!("Failed to open recording {}", recording.display()))?;
    info!("Loaded {} frames from {}", device.len(), recording.display());

    let mut session = CaptureSession::new(config, device);
    if let Some(dir) = &cli.record {
        session.set_recorder(Some(RecordingWriter::create(dir)?));
    }
    let printer = spawn_event_logger(session.client().subscribe(), cli.out.clone());
    session.start();

    let mut queued = 0usize;
    loop {
        let tick = Instant::now();
        if session.poll() == PollOutcome::FragmentQueued {
            queued += 1;
        }
        if !session.device_mut().advance() {
            break;
        }
        thread::sleep(period.saturating_sub(tick.elapsed()));
    }
    info!("Recording finished, {} fragments queued", queued);

    let deadline = Instant::now() + Duration::from_secs(cli.linger_secs);
    while Instant::now() < deadline {
        thread::sleep(Duration::from_millis(100));
        if session.client().queued_len() == 0 && cli.out.is_none() {
            break;
        }
    }
    let left = session.client().queued_len();
    if left > 0 {
        warn!("{} fragments still queued at exit", left);
    }

    session.shutdown();
    drop(session);
    let _ = printer.join();
    Ok(())
}

fn run_visitor(cli: &Cli, config: SessionConfig) -> Result<()> {
    let client = ReconstructionClient::websocket(config.client);
    let printer = spawn_event_logger(client.subscribe(), cli.out.clone());
    client.connect(Role::Visitor, config.scene);

    thread::sleep(Duration::from_secs(cli.linger_secs));

    client.disconnect();
    drop(client);
    let _ = printer.join();
    Ok(())
}

/// Log client events until the client goes away; save meshes to `out`.
fn spawn_event_logger(events: Receiver<ClientEvent>, out: Option<PathBuf>) -> JoinHandle<()> {
    thread::spawn(move || {
        let mut received = 0usize;
        for event in events {
            match event {
                ClientEvent::Connected => info!("Connected"),
                ClientEvent::Disconnected => info!("Disconnected"),
                ClientEvent::ConnectionFailed(reason) => warn!("Connection failed: {}", reason),
                ClientEvent::ModelsAvailable(models) => info!("Available models: {}", models.join(", ")),
                ClientEvent::DecodeFailed(err) => warn!("Undecodable message: {}", err),
                ClientEvent::ModelResult(result) => {
                    received += 1;
                    info!(
                        "Mesh #{} for '{}' ({} bytes, point cloud: {})",
                        received,
                        result.scene(),
                        result.glb().len(),
                        result.is_point_cloud()
                    );
                    if let Some(dir) = &out {
                        let path = dir.join(format!("{}_{:04}.glb", result.scene(), received));
                        if let Err(e) = save_glb(&path, result.glb()) {
                            warn!("{:#}", e);
                        }
                    }
                }
            }
        }
    })
}

fn save_glb(path: &Path, glb: &[u8]) -> Result<()> {
    fs::write(path, glb).with_context(|| format!("Failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replay_period() {
        assert_eq!(replay_period(4.0).unwrap(), Duration::from_millis(250));
        assert!(replay_period(0.0).is_err());
        assert!(replay_period(-5.0).is_err());
        assert!(replay_period(f32::NAN).is_err());
        assert!(replay_period(f32::INFINITY).is_err());
        // 1 / 1e-39 overflows to infinity.
        assert!(replay_period(1e-39).is_err());
    }
}
