/// One directional sound component at a single frequency bin.
///
/// A default (all zero) point marks a bin that was skipped during analysis.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SoundPoint {
    /// Magnitude of the W spectrum at this bin
    pub energy: f32,
    /// Unit direction of arrival, zero for skipped bins
    pub direction: [f32; 3],
    /// Bin centre frequency (Hz)
    pub frequency: f32,
}

impl SoundPoint {
    pub fn is_empty(&self) -> bool {
        self.energy == 0.0
    }
}

/// Per-hop output of the analyzer: one slot per frequency bin, indexed by bin
/// number. Slot 0 (DC) is always empty.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AnalysisFrame {
    /// `frame_size / 2` slots, empty for skipped bins
    pub points: Vec<SoundPoint>,
}

/// Returned by lookups that miss (no result bound, time out of range).
pub static EMPTY_FRAME: AnalysisFrame = AnalysisFrame { points: Vec::new() };

impl AnalysisFrame {
    pub fn with_slots(slots: usize) -> Self {
        Self {
            points: vec![SoundPoint::default(); slots],
        }
    }

    /// True for the zero-slot frame handed out on lookup misses.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Slots that carry an emitted point.
    pub fn emitted(&self) -> impl Iterator<Item = &SoundPoint> {
        self.points.iter().filter(|p| !p.is_empty())
    }
}

/// The whole-clip analysis, immutable once built.
#[derive(Clone, Debug, PartialEq)]
pub struct AnalysisResult {
    /// One frame per hop, in time order
    pub frames: Vec<AnalysisFrame>,
    /// Number of hops analysed
    pub frame_count: usize,
    /// Sample rate of the source clip (Hz)
    pub sample_rate: u32,
    /// FFT length in samples
    pub frame_size: usize,
    /// Samples between consecutive frames
    pub hop_size: usize,
}

impl AnalysisResult {
    /// Time span covered by the analysed hops (seconds).
    pub fn duration(&self) -> f64 {
        (self.frame_count * self.hop_size) as f64 / self.sample_rate as f64
    }

    pub fn emitted_points(&self) -> usize {
        self.frames.iter().map(|f| f.emitted().count()).sum()
    }
}
