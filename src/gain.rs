use nih_plug::prelude::{Smoother, SmoothingStyle};
use nih_plug::util::db_to_gain;

/// Time it takes the applied gain to reach a new target
pub(crate) const GAIN_SMOOTHING_MS: f32 = 50.0;

/// Multiplies a block by a gain that ramps linearly towards its target, so gain changes don't
/// click. A new target always starts from the gain currently applied, so consecutive samples never
/// jump by more than one ramp step even when the target moves every block.
pub(crate) struct GainStage {
    smoother: Smoother<f32>,
    sample_rate: f32,
    /// linear gain the smoother is heading towards
    target: f32,
}

impl Default for GainStage {
    fn default() -> Self {
        Self::new()
    }
}

impl GainStage {
    pub(crate) fn new() -> Self {
        let smoother = Smoother::new(SmoothingStyle::Linear(GAIN_SMOOTHING_MS));
        smoother.reset(1.0);
        Self {
            smoother,
            sample_rate: 0.0,
            target: 1.0,
        }
    }

    /// Snaps to the current target, any ramp in progress is dropped
    pub(crate) fn prepare(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.reset();
    }

    pub(crate) fn reset(&mut self) {
        self.smoother.reset(self.target);
    }

    pub(crate) fn set_gain_db(&mut self, db: f32) {
        let target = db_to_gain(db);
        // retargeting to the same value would stretch the ramp that is already running
        if target == self.target {
            return;
        }

        self.target = target;
        self.smoother.set_target(self.sample_rate, target);
    }

    /// The gain applied to the last processed frame
    #[cfg(test)]
    pub(crate) fn current_gain(&self) -> f32 {
        self.smoother.previous_value()
    }

    pub(crate) fn is_ramping(&self) -> bool {
        self.smoother.is_smoothing()
    }

    pub(crate) fn process(&mut self, block: &mut [&mut [f32]]) {
        let frames = block.first().map_or(0, |ch| ch.len());

        // don't burn a multiply per sample when we're sitting at unity
        if !self.is_ramping() && self.target == 1.0 {
            return;
        }

        for frame in 0..frames {
            let gain = self.smoother.next();
            for channel in block.iter_mut() {
                channel[frame] *= gain;
            }
        }
    }
}
