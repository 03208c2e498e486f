use nih_plug::util::{db_to_gain, gain_to_db};

use crate::{buffer::BandBuffer, params::BandSnapshot};

/// One-pole coefficient for a time constant. The 0 to 1 step response is 63.2% of the way there
/// after `ms` milliseconds.
fn time_constant(ms: f32, sample_rate: f32) -> f32 {
    (-1.0 / (ms / 1000.0 * sample_rate)).exp()
}

/// Feed-forward compressor for one band. Levels are tracked per channel with a peak envelope
/// follower, and a hard-knee gain computer turns the envelope into gain reduction for every sample.
///
/// Solo and mute are routing decisions, they are left to the mixer.
pub(crate) struct CompressorBand {
    sample_rate: f32,
    /// linear peak envelope, one per channel
    envelopes: Vec<f32>,

    attack_ms: f32,
    release_ms: f32,
    attack_coeff: f32,
    release_coeff: f32,

    /// deepest reduction applied during the last block, positive dB
    gain_reduction_db: f32,
}

impl Default for CompressorBand {
    fn default() -> Self {
        Self {
            // these fields are not initialised here, see `prepare()` for the actual values
            sample_rate: 0.0,
            envelopes: Vec::new(),
            attack_ms: 0.0,
            release_ms: 0.0,
            attack_coeff: 0.0,
            release_coeff: 0.0,
            gain_reduction_db: 0.0,
        }
    }
}

impl CompressorBand {
    pub(crate) fn prepare(&mut self, sample_rate: f32, num_channels: usize) {
        self.sample_rate = sample_rate;
        self.envelopes = vec![0.0; num_channels];
        // force the coefficients to be recomputed for the new sample rate
        self.attack_ms = 0.0;
        self.release_ms = 0.0;
        self.gain_reduction_db = 0.0;
    }

    pub(crate) fn reset(&mut self) {
        self.envelopes.fill(0.0);
        self.gain_reduction_db = 0.0;
    }

    pub(crate) fn gain_reduction_db(&self) -> f32 {
        self.gain_reduction_db
    }

    fn update_timing(&mut self, attack_ms: f32, release_ms: f32) {
        if attack_ms != self.attack_ms {
            self.attack_ms = attack_ms;
            self.attack_coeff = time_constant(attack_ms, self.sample_rate);
        }
        if release_ms != self.release_ms {
            self.release_ms = release_ms;
            self.release_coeff = time_constant(release_ms, self.sample_rate);
        }
    }

    pub(crate) fn process(&mut self, band: &mut BandBuffer, params: &BandSnapshot) {
        if params.bypass {
            self.gain_reduction_db = 0.0;
            return;
        }

        self.update_timing(params.attack_ms, params.release_ms);

        let attack = self.attack_coeff;
        let release = self.release_coeff;
        let threshold_db = params.threshold_db;
        // the fraction of the overshoot that gets removed
        let slope = 1.0 - params.ratio.recip();

        let mut deepest = 0.0f32;
        for (samples, envelope) in band.iter_channels_mut().zip(self.envelopes.iter_mut()) {
            for sample in samples.iter_mut() {
                let level = sample.abs();
                let coeff = if level > *envelope { attack } else { release };
                *envelope = level + coeff * (*envelope - level);

                let envelope_db = gain_to_db(*envelope);
                if envelope_db > threshold_db {
                    let reduction_db = (envelope_db - threshold_db) * slope;
                    *sample *= db_to_gain(-reduction_db);
                    deepest = deepest.max(reduction_db);
                }
            }
        }

        self.gain_reduction_db = deepest;
    }
}
