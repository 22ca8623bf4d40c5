/// Interleaved multi-channel audio as handed over by the audio subsystem.
#[derive(Clone, Debug)]
pub struct AmbisonicClip {
    pub samples: Vec<f32>,
    pub channels: usize,
    pub sample_rate: u32,
}

impl AmbisonicClip {
    pub fn new(samples: Vec<f32>, channels: usize, sample_rate: u32) -> Self {
        Self {
            samples,
            channels,
            sample_rate,
        }
    }

    /// Samples per channel.
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            0
        } else {
            self.samples.len() / self.channels
        }
    }

    pub fn duration(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }

    /// Copy one channel out of the interleaved buffer.
    pub fn channel(&self, index: usize) -> Vec<f32> {
        self.samples
            .chunks_exact(self.channels)
            .map(|frame| frame[index])
            .collect()
    }
}

/// Playback transport the visualizer follows.
pub trait AudioSource {
    /// Current playback position (seconds).
    fn current_time(&self) -> f64;
    fn is_playing(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_deinterleaves() {
        let clip = AmbisonicClip::new(vec![0.0, 1.0, 2.0, 3.0, 10.0, 11.0, 12.0, 13.0], 4, 48000);
        assert_eq!(clip.frames(), 2);
        assert_eq!(clip.channel(0), vec![0.0, 10.0]);
        assert_eq!(clip.channel(3), vec![3.0, 13.0]);
    }

    #[test]
    fn duration_from_frames() {
        let clip = AmbisonicClip::new(vec![0.0; 4 * 24000], 4, 48000);
        assert!((clip.duration() - 0.5).abs() < 1e-9);
    }
}
