use std::sync::Arc;

use super::buffer::PointBuffer;
use super::loudness::LoudnessCurve;
use super::sampler::{renderable_points, top_points, Sampler};
use super::worker::{AnalysisWorker, WorkerEvent};
use crate::audio::analysis::Analyzer;
use crate::audio::clip::{AmbisonicClip, AudioSource};
use crate::audio::features::AnalysisResult;
use crate::error::AnalysisError;

/// Glue between a playback transport, the analysis worker and a renderer's
/// point buffer.
pub struct Visualizer {
    worker: AnalysisWorker,
    sampler: Sampler,
    curve: Box<dyn LoudnessCurve>,
    top_points: Option<usize>,
    last_error: Option<AnalysisError>,
}

impl Visualizer {
    pub fn new(analyzer: Analyzer, curve: Box<dyn LoudnessCurve>) -> Self {
        Self {
            worker: AnalysisWorker::new(analyzer),
            sampler: Sampler::new(),
            curve,
            top_points: None,
            last_error: None,
        }
    }

    /// Only hand the `n` loudest points to the renderer each tick.
    pub fn with_top_points(mut self, n: Option<usize>) -> Self {
        self.top_points = n;
        self
    }

    pub fn sampler(&self) -> &Sampler {
        &self.sampler
    }

    pub fn is_analyzing(&self) -> bool {
        self.worker.is_busy()
    }

    /// Failure of the most recent analysis, cleared by the next load.
    pub fn last_error(&self) -> Option<&AnalysisError> {
        self.last_error.as_ref()
    }

    /// Switch to a new clip. Lookups return empty frames until its analysis
    /// lands on a later [`Visualizer::tick`] or [`Visualizer::finish_loading`].
    pub fn load_clip(&mut self, clip: Arc<AmbisonicClip>) -> std::io::Result<()> {
        self.sampler.unbind();
        self.last_error = None;
        self.worker.submit(clip)?;
        Ok(())
    }

    /// Analyse `clip` on the calling thread and bind the result.
    pub fn load_clip_blocking(
        &mut self,
        clip: &AmbisonicClip,
    ) -> Result<Arc<AnalysisResult>, AnalysisError> {
        self.worker.cancel();
        self.sampler.unbind();
        self.last_error = None;
        let result = Arc::new(self.worker.analyzer().analyze(clip)?);
        self.sampler.bind(Arc::clone(&result));
        Ok(result)
    }

    /// Block until the pending background analysis is bound or has failed.
    pub fn finish_loading(&mut self) -> Result<(), AnalysisError> {
        if let Some(event) = self.worker.wait() {
            self.apply(event);
        }
        match &self.last_error {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }

    /// One visual update: pick the frame for the source's current time and
    /// write its points into `buffer`. Leaves the buffer untouched while the
    /// source is paused, and empties it while no analysis is bound. Returns
    /// the number of valid points in the buffer.
    pub fn tick(&mut self, source: &dyn AudioSource, buffer: &mut PointBuffer) -> usize {
        if let Some(event) = self.worker.poll() {
            self.apply(event);
        }

        if !self.sampler.is_ready() {
            buffer.clear();
            return 0;
        }

        if !source.is_playing() {
            return buffer.count();
        }

        let frame = self.sampler.frame_at(source.current_time());
        let mut points = renderable_points(frame, self.curve.as_ref());
        if let Some(n) = self.top_points {
            points = top_points(points, n);
        }
        buffer.write(&points)
    }

    fn apply(&mut self, event: WorkerEvent) {
        match event {
            WorkerEvent::Ready(result) => self.sampler.bind(result),
            WorkerEvent::Failed(e) => self.last_error = Some(e),
        }
    }
}
