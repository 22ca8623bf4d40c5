//! Directional point-cloud analysis of first-order ambisonic (B-format) audio.
//!
//! [`audio::analysis::Analyzer`] turns a whole clip into per-hop frames of
//! sound points (direction, energy, frequency). [`playback::sampler::Sampler`]
//! picks the frame for a playback time, and [`playback::visualizer::Visualizer`]
//! drives both from a transport into a renderer's [`playback::buffer::PointBuffer`].

pub mod audio;
pub mod config;
pub mod error;
pub mod playback;

pub use audio::analysis::{Analyzer, AnalyzerConfig};
pub use audio::features::{AnalysisFrame, AnalysisResult, SoundPoint};
pub use error::AnalysisError;
