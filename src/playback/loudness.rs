//! Perceptual loudness weighting applied to analysed energies at sampling time.

use serde::Deserialize;

/// Lowest frequency fed to a loudness curve (Hz)
pub const MIN_FREQUENCY: f32 = 50.0;
/// Highest frequency fed to a loudness curve (Hz)
pub const MAX_FREQUENCY: f32 = 20000.0;

/// Maps `log10(frequency)` to an energy multiplier.
pub trait LoudnessCurve {
    fn evaluate(&self, log_frequency: f32) -> f32;
}

/// Piecewise-linear curve over `(log10 Hz, gain)` control points.
///
/// Values are held flat beyond the first and last control point.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(from = "Vec<(f32, f32)>")]
pub struct PiecewiseCurve {
    points: Vec<(f32, f32)>,
}

impl PiecewiseCurve {
    pub fn new(mut points: Vec<(f32, f32)>) -> Self {
        points.retain(|(x, y)| x.is_finite() && y.is_finite());
        points.sort_by(|a, b| a.0.total_cmp(&b.0));
        Self { points }
    }

    /// Unit gain everywhere.
    pub fn flat() -> Self {
        Self::new(vec![(0.0, 1.0)])
    }

    /// Rough inverse of the 40-phon equal-loudness contour: low and very
    /// high bins are attenuated, the 2-5 kHz region is boosted slightly.
    pub fn equal_loudness() -> Self {
        Self::new(vec![
            (1.699, 0.35), // 50 Hz
            (2.0, 0.55),   // 100 Hz
            (2.5, 0.85),   // ~316 Hz
            (3.0, 1.0),    // 1 kHz
            (3.5, 1.15),   // ~3.2 kHz
            (3.9, 0.95),   // ~8 kHz
            (4.301, 0.5),  // 20 kHz
        ])
    }

    pub fn points(&self) -> &[(f32, f32)] {
        &self.points
    }
}

impl From<Vec<(f32, f32)>> for PiecewiseCurve {
    fn from(points: Vec<(f32, f32)>) -> Self {
        Self::new(points)
    }
}

impl Default for PiecewiseCurve {
    fn default() -> Self {
        Self::equal_loudness()
    }
}

impl LoudnessCurve for PiecewiseCurve {
    fn evaluate(&self, log_frequency: f32) -> f32 {
        let Some(&(first_x, first_y)) = self.points.first() else {
            return 1.0;
        };
        if log_frequency <= first_x {
            return first_y;
        }

        let idx = self.points.partition_point(|&(x, _)| x <= log_frequency);
        if idx >= self.points.len() {
            return self.points[self.points.len() - 1].1;
        }

        let (x0, y0) = self.points[idx - 1];
        let (x1, y1) = self.points[idx];
        let span = x1 - x0;
        if span <= f32::EPSILON {
            return y1;
        }
        y0 + (y1 - y0) * (log_frequency - x0) / span
    }
}

/// `log10` of the frequency after clamping it into the audible range.
pub fn log_frequency(frequency: f32) -> f32 {
    frequency.clamp(MIN_FREQUENCY, MAX_FREQUENCY).log10()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_curve_is_unity() {
        let curve = PiecewiseCurve::flat();
        for f in [50.0, 440.0, 12000.0, 20000.0] {
            assert_eq!(curve.evaluate(log_frequency(f)), 1.0);
        }
    }

    #[test]
    fn interpolates_between_points() {
        let curve = PiecewiseCurve::new(vec![(3.0, 2.0), (2.0, 1.0)]);
        assert!((curve.evaluate(2.5) - 1.5).abs() < 1e-6);
        assert_eq!(curve.evaluate(1.0), 1.0);
        assert_eq!(curve.evaluate(5.0), 2.0);
    }

    #[test]
    fn empty_curve_passes_energy_through() {
        let curve = PiecewiseCurve::new(vec![(f32::NAN, 3.0)]);
        assert!(curve.points().is_empty());
        assert_eq!(curve.evaluate(3.0), 1.0);
    }

    #[test]
    fn frequency_is_clamped_before_log() {
        assert!((log_frequency(10.0) - MIN_FREQUENCY.log10()).abs() < 1e-6);
        assert!((log_frequency(30000.0) - MAX_FREQUENCY.log10()).abs() < 1e-6);
        assert!((log_frequency(1000.0) - 3.0).abs() < 1e-6);
    }

    #[test]
    fn equal_loudness_peaks_in_presence_range() {
        let curve = PiecewiseCurve::equal_loudness();
        let low = curve.evaluate(log_frequency(50.0));
        let mid = curve.evaluate(log_frequency(3000.0));
        let high = curve.evaluate(log_frequency(20000.0));
        assert!(mid > low && mid > high);
    }
}
