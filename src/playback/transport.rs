use crate::audio::clip::AudioSource;

/// Offline stand-in for a playback transport: time only moves when
/// [`SteppedTransport::advance`] is called, one visual tick at a time.
#[derive(Clone, Debug)]
pub struct SteppedTransport {
    time: f64,
    step: f64,
    duration: f64,
    playing: bool,
}

impl SteppedTransport {
    pub fn new(fps: f64, duration: f64) -> Self {
        Self {
            time: 0.0,
            step: 1.0 / fps,
            duration,
            playing: false,
        }
    }

    pub fn play(&mut self) {
        self.playing = true;
    }

    pub fn pause(&mut self) {
        self.playing = false;
    }

    pub fn seek(&mut self, time: f64) {
        self.time = time.clamp(0.0, self.duration);
    }

    /// Move forward one tick. Stops playback once the end is reached.
    pub fn advance(&mut self) -> bool {
        if !self.playing {
            return false;
        }
        self.time += self.step;
        if self.time >= self.duration {
            self.time = self.duration;
            self.playing = false;
        }
        self.playing
    }
}

impl AudioSource for SteppedTransport {
    fn current_time(&self) -> f64 {
        self.time
    }

    fn is_playing(&self) -> bool {
        self.playing
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advances_by_frame_period() {
        let mut t = SteppedTransport::new(10.0, 1.0);
        assert!(!t.advance());
        t.play();
        assert!(t.advance());
        assert!((t.current_time() - 0.1).abs() < 1e-9);
    }

    #[test]
    fn stops_at_end() {
        let mut t = SteppedTransport::new(2.0, 1.0);
        t.play();
        assert!(t.advance());
        assert!(!t.advance());
        assert!(!t.is_playing());
        assert_eq!(t.current_time(), 1.0);
    }

    #[test]
    fn seek_is_clamped() {
        let mut t = SteppedTransport::new(30.0, 2.0);
        t.seek(5.0);
        assert_eq!(t.current_time(), 2.0);
        t.seek(-1.0);
        assert_eq!(t.current_time(), 0.0);
    }
}
