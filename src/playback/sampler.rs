use std::sync::Arc;

use super::loudness::{log_frequency, LoudnessCurve};
use crate::audio::features::{AnalysisFrame, AnalysisResult, EMPTY_FRAME};

/// Lifecycle of the sampler's binding to an analysis.
#[derive(Clone, Debug, Default)]
pub enum SamplerState {
    /// No analysis bound; every lookup misses
    #[default]
    Idle,
    /// A complete analysis is bound
    Ready(Arc<AnalysisResult>),
}

/// Maps playback time onto analysis frames.
#[derive(Debug, Default)]
pub struct Sampler {
    state: SamplerState,
}

impl Sampler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &SamplerState {
        &self.state
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, SamplerState::Ready(_))
    }

    /// Bind a finished analysis. The previous one, if any, is dropped.
    pub fn bind(&mut self, result: Arc<AnalysisResult>) {
        log::info!(
            "Sampler ready: {} frames, hop={} @ {}Hz",
            result.frame_count,
            result.hop_size,
            result.sample_rate
        );
        self.state = SamplerState::Ready(result);
    }

    pub fn unbind(&mut self) {
        self.state = SamplerState::Idle;
    }

    /// Frame index for `time` (seconds), if it lands inside the bound analysis.
    pub fn frame_index(&self, time: f64) -> Option<usize> {
        let SamplerState::Ready(result) = &self.state else {
            return None;
        };
        if !time.is_finite() || time < 0.0 || result.frame_count == 0 {
            return None;
        }
        let index = (time * result.sample_rate as f64 / result.hop_size as f64).floor() as usize;
        (index < result.frame_count).then_some(index)
    }

    /// The frame whose hop starts at or before `time`, or the empty frame on
    /// any miss.
    pub fn frame_at(&self, time: f64) -> &AnalysisFrame {
        match (&self.state, self.frame_index(time)) {
            (SamplerState::Ready(result), Some(index)) => match result.frames.get(index) {
                Some(frame) => frame,
                None => {
                    log::debug!("frame_at({:.3}s): frame {} missing from result", time, index);
                    &EMPTY_FRAME
                }
            },
            (SamplerState::Idle, _) => {
                log::trace!("frame_at({:.3}s): no analysis bound", time);
                &EMPTY_FRAME
            }
            (SamplerState::Ready(_), None) => {
                log::debug!("frame_at({:.3}s): outside analysed range", time);
                &EMPTY_FRAME
            }
        }
    }
}

/// A point ready for the renderer, with loudness-weighted energy.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderablePoint {
    pub direction: [f32; 3],
    pub energy: f32,
    pub frequency: f32,
}

/// Weight every emitted point of `frame` by `curve` at its clamped log-frequency.
pub fn renderable_points(frame: &AnalysisFrame, curve: &dyn LoudnessCurve) -> Vec<RenderablePoint> {
    frame
        .emitted()
        .map(|p| RenderablePoint {
            direction: p.direction,
            energy: p.energy * curve.evaluate(log_frequency(p.frequency)),
            frequency: p.frequency,
        })
        .collect()
}

/// Keep the `n` loudest points, loudest first.
pub fn top_points(mut points: Vec<RenderablePoint>, n: usize) -> Vec<RenderablePoint> {
    points.sort_by(|a, b| b.energy.total_cmp(&a.energy));
    points.truncate(n);
    points
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::features::SoundPoint;
    use crate::playback::loudness::PiecewiseCurve;

    fn point(energy: f32, frequency: f32) -> SoundPoint {
        SoundPoint {
            energy,
            direction: [0.0, 0.0, 1.0],
            frequency,
        }
    }

    fn result(frame_count: usize) -> Arc<AnalysisResult> {
        let frames = (0..frame_count)
            .map(|i| {
                let mut frame = AnalysisFrame::with_slots(4);
                frame.points[1] = point(i as f32 + 1.0, 100.0);
                frame
            })
            .collect();
        Arc::new(AnalysisResult {
            frames,
            frame_count,
            sample_rate: 1000,
            frame_size: 8,
            hop_size: 100,
        })
    }

    #[test]
    fn idle_sampler_returns_empty_frame() {
        let sampler = Sampler::new();
        assert!(!sampler.is_ready());
        assert!(sampler.frame_at(0.0).is_empty());
        assert!(sampler.frame_at(1.5).is_empty());
    }

    #[test]
    fn maps_time_to_preceding_hop() {
        let mut sampler = Sampler::new();
        sampler.bind(result(10));
        // 100 samples per hop at 1kHz = 0.1s
        assert_eq!(sampler.frame_index(0.0), Some(0));
        assert_eq!(sampler.frame_index(0.099), Some(0));
        assert_eq!(sampler.frame_index(0.25), Some(2));
        assert_eq!(sampler.frame_at(0.95).points[1].energy, 10.0);
    }

    #[test]
    fn out_of_range_times_miss() {
        let mut sampler = Sampler::new();
        sampler.bind(result(10));
        for t in [-0.01, -5.0, 1.0, 42.0, f64::NAN, f64::INFINITY] {
            assert_eq!(sampler.frame_index(t), None);
            assert!(sampler.frame_at(t).is_empty());
        }
    }

    #[test]
    fn zero_frame_result_misses() {
        let mut sampler = Sampler::new();
        sampler.bind(result(0));
        assert!(sampler.frame_at(0.0).is_empty());
    }

    #[test]
    fn short_frame_list_misses_instead_of_panicking() {
        let mut sampler = Sampler::new();
        let mut short = (*result(2)).clone();
        short.frame_count = 5;
        sampler.bind(Arc::new(short));
        assert!(!sampler.frame_at(0.15).is_empty());
        assert!(sampler.frame_at(0.35).is_empty());
        assert!(sampler.frame_at(0.45).is_empty());
    }

    #[test]
    fn unbind_drops_stale_frames() {
        let mut sampler = Sampler::new();
        sampler.bind(result(3));
        assert!(!sampler.frame_at(0.1).is_empty());
        sampler.unbind();
        assert!(sampler.frame_at(0.1).is_empty());
    }

    #[test]
    fn flat_curve_keeps_energy() {
        let mut frame = AnalysisFrame::with_slots(6);
        frame.points[1] = point(2.5, 30.0);
        frame.points[4] = point(0.7, 25000.0);
        let points = renderable_points(&frame, &PiecewiseCurve::flat());
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].energy, 2.5);
        assert_eq!(points[1].energy, 0.7);
        // stored frequency is reported unclamped
        assert_eq!(points[1].frequency, 25000.0);
    }

    #[test]
    fn curve_applied_at_clamped_frequency() {
        let curve = PiecewiseCurve::new(vec![(50f32.log10(), 0.5), (20000f32.log10(), 2.0)]);
        let mut frame = AnalysisFrame::with_slots(4);
        frame.points[1] = point(1.0, 10.0);
        frame.points[2] = point(1.0, 30000.0);
        let points = renderable_points(&frame, &curve);
        assert!((points[0].energy - 0.5).abs() < 1e-6);
        assert!((points[1].energy - 2.0).abs() < 1e-6);
    }

    #[test]
    fn empty_slots_are_not_rendered() {
        let frame = AnalysisFrame::with_slots(16);
        assert!(renderable_points(&frame, &PiecewiseCurve::flat()).is_empty());
        assert!(renderable_points(&EMPTY_FRAME, &PiecewiseCurve::flat()).is_empty());
    }

    #[test]
    fn top_points_sorts_loudest_first() {
        let make = |energy| RenderablePoint {
            direction: [1.0, 0.0, 0.0],
            energy,
            frequency: 440.0,
        };
        let top = top_points(vec![make(0.2), make(3.0), make(1.0), make(0.5)], 2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].energy, 3.0);
        assert_eq!(top[1].energy, 1.0);
    }
}
