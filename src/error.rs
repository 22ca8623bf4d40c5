use thiserror::Error;

/// Failures that stop an analysis pass. Numeric degeneracies inside a frame
/// (silent bins, near-zero W, NaN directions) are absorbed locally and never
/// show up here.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    #[error("first-order ambisonics needs at least 4 channels, clip has {found}")]
    InsufficientChannels { found: usize },

    #[error("clip has {samples} samples per channel, too short for one {frame_size}-sample frame")]
    EmptyClip { samples: usize, frame_size: usize },

    #[error("invalid analysis config: {0}")]
    InvalidConfig(String),

    #[error("analysis cancelled")]
    Cancelled,
}
