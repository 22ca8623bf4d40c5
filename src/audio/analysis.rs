use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rayon::prelude::*;
use rustfft::{num_complex::Complex, Fft, FftPlanner};
use serde::Deserialize;

use super::clip::AmbisonicClip;
use super::features::{AnalysisFrame, AnalysisResult, SoundPoint};
use crate::error::AnalysisError;

pub const FRAME_SIZE: usize = 1024;
pub const HOP_SIZE: usize = 512;
pub const ENERGY_FLOOR: f32 = 0.01;
pub const ENERGY_CEILING: f32 = 100.0;

/// Smallest |Re W| used as a divisor.
const MIN_DIVISOR: f32 = 1e-6;
/// Directions shorter than this before normalization are dropped.
const MIN_DIRECTION_LENGTH: f32 = 1e-6;

/// Where W, X, Y and Z live in the interleaved clip.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelOrder {
    /// W, X, Y, Z
    Fuma,
    /// ACN: W, Y, Z, X
    Ambix,
    /// Explicit channel index for W, X, Y, Z
    Custom([usize; 4]),
}

impl ChannelOrder {
    /// Channel indices for W, X, Y, Z.
    pub fn indices(&self) -> [usize; 4] {
        match self {
            ChannelOrder::Fuma => [0, 1, 2, 3],
            ChannelOrder::Ambix => [0, 3, 1, 2],
            ChannelOrder::Custom(idx) => *idx,
        }
    }
}

impl FromStr for ChannelOrder {
    type Err = String;

    /// Accepts `fuma`, `ambix`, or four comma separated indices (`0,3,1,2`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fuma" => Ok(ChannelOrder::Fuma),
            "ambix" | "acn" => Ok(ChannelOrder::Ambix),
            other => {
                let parsed: Vec<usize> = other
                    .split(',')
                    .map(|p| p.trim().parse::<usize>())
                    .collect::<Result<_, _>>()
                    .map_err(|e| format!("bad channel index in '{}': {}", s, e))?;
                let idx: [usize; 4] = parsed
                    .try_into()
                    .map_err(|_| format!("expected 4 channel indices, got '{}'", s))?;
                Ok(ChannelOrder::Custom(idx))
            }
        }
    }
}

/// Coordinate frame the emitted directions are expressed in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AxisConvention {
    /// x = front, y = left, z = up
    Ambisonic,
    /// x = right (-Y), y = up (Z), z = forward (X)
    Yup,
}

impl AxisConvention {
    pub fn apply(&self, [x, y, z]: [f32; 3]) -> [f32; 3] {
        match self {
            AxisConvention::Ambisonic => [x, y, z],
            AxisConvention::Yup => [-y, z, x],
        }
    }
}

impl FromStr for AxisConvention {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ambisonic" => Ok(AxisConvention::Ambisonic),
            "yup" | "y-up" => Ok(AxisConvention::Yup),
            other => Err(format!("unknown axis convention '{}'", other)),
        }
    }
}

/// What happens to bins whose W magnitude is under the energy floor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LowEnergyPolicy {
    /// Leave the slot empty
    Skip,
    /// Raise the energy to the floor and keep the point
    Clamp,
}

impl FromStr for LowEnergyPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "skip" => Ok(LowEnergyPolicy::Skip),
            "clamp" => Ok(LowEnergyPolicy::Clamp),
            other => Err(format!("unknown low-energy policy '{}'", other)),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct AnalyzerConfig {
    pub frame_size: usize,
    pub hop_size: usize,
    pub channel_order: ChannelOrder,
    pub axes: AxisConvention,
    pub low_energy: LowEnergyPolicy,
    /// Clamp emitted energies to `[energy_floor, energy_ceiling]`
    pub clamp_energy: bool,
    pub energy_floor: f32,
    pub energy_ceiling: f32,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            frame_size: FRAME_SIZE,
            hop_size: HOP_SIZE,
            channel_order: ChannelOrder::Fuma,
            axes: AxisConvention::Ambisonic,
            low_energy: LowEnergyPolicy::Skip,
            clamp_energy: true,
            energy_floor: ENERGY_FLOOR,
            energy_ceiling: ENERGY_CEILING,
        }
    }
}

impl AnalyzerConfig {
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.frame_size < 4 || !self.frame_size.is_power_of_two() {
            return Err(AnalysisError::InvalidConfig(format!(
                "frame size must be a power of two >= 4, got {}",
                self.frame_size
            )));
        }
        if self.hop_size == 0 || self.hop_size > self.frame_size {
            return Err(AnalysisError::InvalidConfig(format!(
                "hop size must be in 1..={}, got {}",
                self.frame_size, self.hop_size
            )));
        }
        if !(self.energy_floor > 0.0 && self.energy_floor <= self.energy_ceiling) {
            return Err(AnalysisError::InvalidConfig(format!(
                "energy range [{}, {}] is empty",
                self.energy_floor, self.energy_ceiling
            )));
        }
        Ok(())
    }
}

/// The four B-format signals, peak-normalized.
struct BFormat {
    w: Vec<f32>,
    x: Vec<f32>,
    y: Vec<f32>,
    z: Vec<f32>,
}

impl BFormat {
    fn from_clip(clip: &AmbisonicClip, order: ChannelOrder) -> Self {
        let [w, x, y, z] = order.indices();
        Self {
            w: clip.channel(w),
            x: clip.channel(x),
            y: clip.channel(y),
            z: clip.channel(z),
        }
    }

    fn len(&self) -> usize {
        self.w.len()
    }

    /// Scale all four channels into [-1, 1] if any sample exceeds it.
    /// Returns the peak before scaling.
    fn normalize_peak(&mut self) -> f32 {
        let peak = [&self.w, &self.x, &self.y, &self.z]
            .iter()
            .flat_map(|ch| ch.iter())
            .map(|s| s.abs())
            .fold(0.0f32, f32::max);

        if peak > 1.0 {
            log::info!("Normalizing B-format channels (peak was {:.3})", peak);
            for ch in [&mut self.w, &mut self.x, &mut self.y, &mut self.z] {
                ch.iter_mut().for_each(|s| *s /= peak);
            }
        }
        peak
    }
}

/// Short-time directional analysis of a B-format clip.
pub struct Analyzer {
    config: AnalyzerConfig,
    window: Vec<f32>,
    fft: Arc<dyn Fft<f32>>,
}

impl Analyzer {
    pub fn new(config: AnalyzerConfig) -> Result<Self, AnalysisError> {
        config.validate()?;
        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(config.frame_size);
        let window = hann_window(config.frame_size);
        Ok(Self { config, window, fft })
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    pub fn analyze(&self, clip: &AmbisonicClip) -> Result<AnalysisResult, AnalysisError> {
        self.analyze_cancellable(clip, &AtomicBool::new(false))
    }

    /// Like [`Analyzer::analyze`], but gives up with `Cancelled` once `cancel`
    /// is raised. The flag is checked before every frame.
    pub fn analyze_cancellable(
        &self,
        clip: &AmbisonicClip,
        cancel: &AtomicBool,
    ) -> Result<AnalysisResult, AnalysisError> {
        if clip.channels < 4 {
            return Err(AnalysisError::InsufficientChannels {
                found: clip.channels,
            });
        }
        if let Some(&bad) = self
            .config
            .channel_order
            .indices()
            .iter()
            .find(|&&i| i >= clip.channels)
        {
            return Err(AnalysisError::InvalidConfig(format!(
                "channel index {} out of range for a {}-channel clip",
                bad, clip.channels
            )));
        }

        let frame_size = self.config.frame_size;
        let hop_size = self.config.hop_size;
        let total = clip.frames();
        let frame_count = total.saturating_sub(frame_size) / hop_size;
        if total < frame_size || frame_count == 0 {
            return Err(AnalysisError::EmptyClip {
                samples: total,
                frame_size,
            });
        }

        log::info!(
            "Pass 1: De-interleave {} channels ({:?}), {} samples @ {}Hz",
            clip.channels,
            self.config.channel_order,
            total,
            clip.sample_rate
        );
        let mut channels = BFormat::from_clip(clip, self.config.channel_order);
        channels.normalize_peak();
        debug_assert_eq!(channels.len(), total);

        log::info!("Pass 2: Per-frame FFT + DOA ({} frames)...", frame_count);
        let frames = (0..frame_count)
            .into_par_iter()
            .map(|idx| {
                if cancel.load(Ordering::Relaxed) {
                    return Err(AnalysisError::Cancelled);
                }
                Ok(self.analyze_frame(&channels, idx * hop_size, clip.sample_rate))
            })
            .collect::<Result<Vec<AnalysisFrame>, AnalysisError>>()?;

        let result = AnalysisResult {
            frames,
            frame_count,
            sample_rate: clip.sample_rate,
            frame_size,
            hop_size,
        };

        log::info!(
            "Analysis: frames={}, points={}, duration={:.2}s",
            result.frame_count,
            result.emitted_points(),
            result.duration()
        );

        Ok(result)
    }

    fn analyze_frame(&self, channels: &BFormat, start: usize, sample_rate: u32) -> AnalysisFrame {
        let n = self.config.frame_size;
        let spectrum = |signal: &[f32]| -> Vec<Complex<f32>> {
            let mut buffer: Vec<Complex<f32>> = signal[start..start + n]
                .iter()
                .zip(&self.window)
                .map(|(&s, &w)| Complex::new(s * w, 0.0))
                .collect();
            self.fft.process(&mut buffer);
            buffer
        };

        let w = spectrum(&channels.w);
        let x = spectrum(&channels.x);
        let y = spectrum(&channels.y);
        let z = spectrum(&channels.z);

        let half = n / 2;
        let mut frame = AnalysisFrame::with_slots(half);

        // Bin 0 (DC) and bin n/2 (Nyquist) are never emitted
        for bin in 1..half {
            let frequency = bin as f32 * sample_rate as f32 / n as f32;
            if let Some(point) = self.locate(w[bin], [x[bin].re, y[bin].re, z[bin].re], frequency) {
                frame.points[bin] = point;
            }
        }

        frame
    }

    /// Direction of arrival from the ratio of real parts X/W, Y/W, Z/W.
    /// This approximates the active intensity vector and ignores phase.
    fn locate(&self, w: Complex<f32>, xyz_re: [f32; 3], frequency: f32) -> Option<SoundPoint> {
        let cfg = &self.config;

        let mut energy = w.norm();
        if energy < cfg.energy_floor {
            match cfg.low_energy {
                LowEnergyPolicy::Skip => return None,
                LowEnergyPolicy::Clamp => energy = cfg.energy_floor,
            }
        }

        let divisor = if w.re.abs() < MIN_DIVISOR {
            MIN_DIVISOR.copysign(w.re)
        } else {
            w.re
        };

        let dir = xyz_re.map(|c| c / divisor);
        if dir.iter().any(|c| c.is_nan()) {
            return None;
        }

        let length = dir.iter().map(|c| c * c).sum::<f32>().sqrt();
        if !length.is_finite() || length < MIN_DIRECTION_LENGTH {
            return None;
        }

        if cfg.clamp_energy {
            energy = energy.clamp(cfg.energy_floor, cfg.energy_ceiling);
        }

        Some(SoundPoint {
            energy,
            direction: cfg.axes.apply(dir.map(|c| c / length)),
            frequency,
        })
    }
}

/// Periodic Hann window.
pub fn hann_window(size: usize) -> Vec<f32> {
    (0..size)
        .map(|i| 0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / size as f32).cos()))
        .collect()
}
