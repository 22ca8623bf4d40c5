use serde::Deserialize;
use std::path::PathBuf;

use crate::audio::analysis::{
    AnalyzerConfig, AxisConvention, ChannelOrder, LowEnergyPolicy, ENERGY_CEILING, ENERGY_FLOOR,
    FRAME_SIZE, HOP_SIZE,
};
use crate::playback::loudness::PiecewiseCurve;

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub playback: PlaybackConfig,
    #[serde(default)]
    pub loudness: LoudnessConfig,
}

#[derive(Debug, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default = "default_frame_size")]
    pub frame_size: usize,
    #[serde(default = "default_hop_size")]
    pub hop_size: usize,
    #[serde(default = "default_channel_order")]
    pub channel_order: ChannelOrder,
    #[serde(default = "default_axes")]
    pub axes: AxisConvention,
    #[serde(default = "default_low_energy")]
    pub low_energy: LowEnergyPolicy,
    #[serde(default = "default_clamp_energy")]
    pub clamp_energy: bool,
    #[serde(default = "default_energy_floor")]
    pub energy_floor: f32,
    #[serde(default = "default_energy_ceiling")]
    pub energy_ceiling: f32,
}

#[derive(Debug, Deserialize)]
pub struct PlaybackConfig {
    #[serde(default = "default_fps")]
    pub fps: u32,
    #[serde(default = "default_max_points")]
    pub max_points: usize,
    #[serde(default)]
    pub top_points: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoudnessConfig {
    /// Unit gain everywhere; overrides `points`
    #[serde(default)]
    pub flat: bool,
    /// `[log10 Hz, gain]` control points
    #[serde(default)]
    pub points: Option<PiecewiseCurve>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            frame_size: default_frame_size(),
            hop_size: default_hop_size(),
            channel_order: default_channel_order(),
            axes: default_axes(),
            low_energy: default_low_energy(),
            clamp_energy: default_clamp_energy(),
            energy_floor: default_energy_floor(),
            energy_ceiling: default_energy_ceiling(),
        }
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            fps: default_fps(),
            max_points: default_max_points(),
            top_points: None,
        }
    }
}

impl From<&AnalysisConfig> for AnalyzerConfig {
    fn from(cfg: &AnalysisConfig) -> Self {
        Self {
            frame_size: cfg.frame_size,
            hop_size: cfg.hop_size,
            channel_order: cfg.channel_order,
            axes: cfg.axes,
            low_energy: cfg.low_energy,
            clamp_energy: cfg.clamp_energy,
            energy_floor: cfg.energy_floor,
            energy_ceiling: cfg.energy_ceiling,
        }
    }
}

impl LoudnessConfig {
    pub fn curve(&self) -> PiecewiseCurve {
        if self.flat {
            PiecewiseCurve::flat()
        } else {
            self.points.clone().unwrap_or_default()
        }
    }
}

fn default_frame_size() -> usize { FRAME_SIZE }
fn default_hop_size() -> usize { HOP_SIZE }
fn default_channel_order() -> ChannelOrder { ChannelOrder::Fuma }
fn default_axes() -> AxisConvention { AxisConvention::Ambisonic }
fn default_low_energy() -> LowEnergyPolicy { LowEnergyPolicy::Skip }
fn default_clamp_energy() -> bool { true }
fn default_energy_floor() -> f32 { ENERGY_FLOOR }
fn default_energy_ceiling() -> f32 { ENERGY_CEILING }
fn default_fps() -> u32 { 60 }
fn default_max_points() -> usize { FRAME_SIZE / 2 }

pub fn load_config(path: &PathBuf) -> Option<Config> {
    let content = std::fs::read_to_string(path).ok()?;
    parse_config(&content)
}

fn parse_config(content: &str) -> Option<Config> {
    match toml::from_str(content) {
        Ok(cfg) => Some(cfg),
        Err(e) => {
            log::warn!("Invalid config: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::loudness::LoudnessCurve;

    #[test]
    fn empty_file_uses_defaults() {
        let cfg = parse_config("").unwrap();
        assert_eq!(AnalyzerConfig::from(&cfg.analysis), AnalyzerConfig::default());
        assert_eq!(cfg.playback.fps, 60);
        assert_eq!(cfg.playback.max_points, 512);
        assert_eq!(cfg.loudness.curve(), PiecewiseCurve::equal_loudness());
    }

    #[test]
    fn parses_all_sections() {
        let cfg = parse_config(
            r#"
            [analysis]
            hop_size = 256
            channel_order = "ambix"
            axes = "yup"
            low_energy = "clamp"
            clamp_energy = false

            [playback]
            fps = 30
            top_points = 50

            [loudness]
            points = [[2.0, 0.5], [4.0, 1.5]]
            "#,
        )
        .unwrap();

        assert_eq!(cfg.analysis.frame_size, 1024);
        assert_eq!(cfg.analysis.hop_size, 256);
        assert_eq!(cfg.analysis.channel_order, ChannelOrder::Ambix);
        assert_eq!(cfg.analysis.axes, AxisConvention::Yup);
        assert_eq!(cfg.analysis.low_energy, LowEnergyPolicy::Clamp);
        assert!(!cfg.analysis.clamp_energy);
        assert_eq!(cfg.playback.fps, 30);
        assert_eq!(cfg.playback.top_points, Some(50));
        assert!((cfg.loudness.curve().evaluate(3.0) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn custom_channel_order_table() {
        let cfg = parse_config(
            r#"
            [analysis]
            channel_order = { custom = [0, 2, 3, 1] }
            "#,
        )
        .unwrap();
        assert_eq!(cfg.analysis.channel_order, ChannelOrder::Custom([0, 2, 3, 1]));
    }

    #[test]
    fn flat_overrides_points() {
        let cfg = parse_config(
            r#"
            [loudness]
            flat = true
            points = [[2.0, 0.5]]
            "#,
        )
        .unwrap();
        assert_eq!(cfg.loudness.curve(), PiecewiseCurve::flat());
    }

    #[test]
    fn malformed_config_is_rejected() {
        assert!(parse_config("[analysis]\nframe_size = \"big\"").is_none());
    }
}
