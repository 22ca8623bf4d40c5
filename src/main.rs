mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;

use cli::Cli;
use pointillism::audio::analysis::{Analyzer, AnalyzerConfig};
use pointillism::audio::clip::AudioSource;
use pointillism::audio::decode::decode_clip;
use pointillism::config::{self, Config};
use pointillism::playback::buffer::{PointBuffer, PointData};
use pointillism::playback::loudness::PiecewiseCurve;
use pointillism::playback::transport::SteppedTransport;
use pointillism::playback::visualizer::Visualizer;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let mut cli = Cli::parse();

    // Load config: explicit --config path, or auto-detect pointillism.toml / global config
    let config_path = cli.config.clone().or_else(|| {
        let local = std::path::PathBuf::from("pointillism.toml");
        if local.exists() {
            return Some(local);
        }
        if let Some(home) = dirs::home_dir() {
            let xdg = home.join(".config").join("pointillism").join("config.toml");
            if xdg.exists() {
                return Some(xdg);
            }
        }
        if let Some(config_dir) = dirs::config_dir() {
            let platform = config_dir.join("pointillism").join("config.toml");
            if platform.exists() {
                return Some(platform);
            }
        }
        None
    });
    let mut cfg = Config::default();
    if let Some(ref path) = config_path {
        if let Some(loaded) = config::load_config(path) {
            log::info!("Loaded config from {}", path.display());
            cfg = loaded;
        } else {
            log::warn!("Failed to load config from {}", path.display());
        }
    }

    // Merge: config values apply only when CLI is at its default
    if cli.fps == 60 { cli.fps = cfg.playback.fps; }
    if cli.max_points == 512 { cli.max_points = cfg.playback.max_points; }
    if cli.top.is_none() { cli.top = cfg.playback.top_points; }
    let mut analyzer_config = AnalyzerConfig::from(&cfg.analysis);
    if let Some(order) = cli.channel_order { analyzer_config.channel_order = order; }
    if let Some(axes) = cli.axes { analyzer_config.axes = axes; }
    if let Some(policy) = cli.low_energy { analyzer_config.low_energy = policy; }
    let curve = if cli.flat { PiecewiseCurve::flat() } else { cfg.loudness.curve() };

    let input = cli.input.as_ref().context("Input audio file is required")?;
    if !input.exists() {
        anyhow::bail!("Input file not found: {}", input.display());
    }
    if cli.fps == 0 {
        anyhow::bail!("--fps must be positive");
    }

    log::info!("pointillism - ambisonic point-cloud analysis");
    log::info!("Input: {}", input.display());
    log::info!(
        "Analysis: frame={} hop={} order={:?} axes={:?} low_energy={:?}",
        analyzer_config.frame_size,
        analyzer_config.hop_size,
        analyzer_config.channel_order,
        analyzer_config.axes,
        analyzer_config.low_energy
    );

    // 1. Decode audio
    log::info!("Decoding audio...");
    let clip = Arc::new(decode_clip(input)?);

    // 2. Analyze on the worker thread
    let analyzer = Analyzer::new(analyzer_config)?;
    let mut visualizer = Visualizer::new(analyzer, Box::new(curve)).with_top_points(cli.top);
    visualizer
        .load_clip(Arc::clone(&clip))
        .context("Failed to start analysis thread")?;
    visualizer
        .finish_loading()
        .with_context(|| format!("Failed to analyze {}", input.display()))?;

    // 3. Simulated playback, one tick per visual frame
    let end = match cli.duration {
        Some(d) => (cli.start + d).min(clip.duration()),
        None => clip.duration(),
    };
    let mut transport = SteppedTransport::new(cli.fps as f64, end);
    transport.seek(cli.start);
    transport.play();

    let total_ticks = ((end - transport.current_time()).max(0.0) * cli.fps as f64).ceil() as u64;
    let pb = ProgressBar::new(total_ticks);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} ticks ({eta} remaining)")?
            .progress_chars("=>-"),
    );

    let mut buffer = PointBuffer::new(cli.max_points);
    let mut stats = TickStats::default();
    let mut next_report = transport.current_time().floor() + 1.0;

    loop {
        let count = visualizer.tick(&transport, &mut buffer);
        stats.add(buffer.points());
        pb.inc(1);

        let now = transport.current_time();
        if now >= next_report {
            stats.report(now, count);
            stats = TickStats::default();
            next_report += 1.0;
        }

        if !transport.advance() {
            break;
        }
    }

    pb.finish_with_message("Playback complete");
    log::info!("Done.");
    Ok(())
}

/// Per-second aggregate of what the renderer would have drawn.
#[derive(Default)]
struct TickStats {
    ticks: usize,
    points: usize,
    energy: f32,
    direction: [f32; 3],
}

impl TickStats {
    fn add(&mut self, points: &[PointData]) {
        self.ticks += 1;
        self.points += points.len();
        for p in points {
            self.energy += p.energy;
            self.direction[0] += p.x * p.energy;
            self.direction[1] += p.y * p.energy;
            self.direction[2] += p.z * p.energy;
        }
    }

    fn report(&self, time: f64, last_count: usize) {
        if self.ticks == 0 {
            return;
        }
        let mean_energy = if self.points > 0 { self.energy / self.points as f32 } else { 0.0 };
        let [x, y, z] = self.direction;
        let len = (x * x + y * y + z * z).sqrt();
        let dominant = if len > 1e-6 { [x / len, y / len, z / len] } else { [0.0; 3] };
        log::info!(
            "t={:6.2}s points/tick={:6.1} (last {:3}) mean_energy={:7.3} dominant=({:+.2}, {:+.2}, {:+.2})",
            time,
            self.points as f32 / self.ticks as f32,
            last_count,
            mean_energy,
            dominant[0],
            dominant[1],
            dominant[2]
        );
    }
}
