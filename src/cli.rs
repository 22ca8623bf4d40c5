use clap::Parser;
use std::path::PathBuf;

use pointillism::audio::analysis::{AxisConvention, ChannelOrder, LowEnergyPolicy};

#[derive(Parser, Debug)]
#[command(
    name = "pointillism",
    about = "Directional point-cloud analysis of first-order ambisonic recordings"
)]
pub struct Cli {
    /// Input B-format file (WAV, AMB, FLAC)
    pub input: Option<PathBuf>,

    /// Config file (defaults to ./pointillism.toml or the user config dir)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Visual ticks per second during simulated playback
    #[arg(long, default_value_t = 60)]
    pub fps: u32,

    /// Channel layout: fuma, ambix, or four indices for W,X,Y,Z (e.g. 0,3,1,2)
    #[arg(long)]
    pub channel_order: Option<ChannelOrder>,

    /// Output axes: ambisonic (x front, z up) or yup (y up, z forward)
    #[arg(long)]
    pub axes: Option<AxisConvention>,

    /// Quiet bins: skip them or clamp them up to the energy floor
    #[arg(long)]
    pub low_energy: Option<LowEnergyPolicy>,

    /// Capacity of the renderer point buffer
    #[arg(long, default_value_t = 512)]
    pub max_points: usize,

    /// Keep only the N loudest points per tick
    #[arg(long)]
    pub top: Option<usize>,

    /// Use a flat loudness curve instead of the equal-loudness one
    #[arg(long)]
    pub flat: bool,

    /// Playback start (seconds)
    #[arg(long, default_value_t = 0.0)]
    pub start: f64,

    /// Playback length (seconds); defaults to the rest of the clip
    #[arg(long)]
    pub duration: Option<f64>,
}
