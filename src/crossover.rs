use nih_plug::nih_debug_assert;

use crate::{
    biquad::{BiquadState, CookbookHP, CookbookLP, Precision, SecondOrder, C},
    buffer::BandBuffer,
};

/// Q of each Butterworth section, two of these in series make one Linkwitz-Riley filter
const BUTTERWORTH_Q: Precision = C::FRAC_1_SQRT_2;

/// Cutoffs are kept under this fraction of the sample rate so the sections stay stable at low
/// sample rates
const MAX_CUTOFF_RATIO: Precision = 0.49;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FilterType {
    Lowpass,
    Highpass,
    /// The sum of the lowpass and highpass outputs. Has the same phase response as an LR4 split at
    /// the same cutoff, with a flat magnitude response.
    Allpass,
}

/// A 4th order (24 dB/octave) Linkwitz-Riley filter, built from two cascaded Butterworth sections
/// per path. Keeps separate history for every channel.
pub(crate) struct LinkwitzRiley {
    kind: FilterType,
    /// requested cutoff, before clamping to the sample rate
    cutoff: Precision,
    sr: Precision,
    lpf: SecondOrder<CookbookLP>,
    hpf: SecondOrder<CookbookHP>,
    lp_states: Vec<[BiquadState; 2]>,
    hp_states: Vec<[BiquadState; 2]>,
}

impl LinkwitzRiley {
    pub(crate) fn new(kind: FilterType, cutoff: Precision, sample_rate: Precision) -> Self {
        let f = Self::clamp_cutoff(cutoff, sample_rate);
        Self {
            kind,
            cutoff,
            sr: sample_rate,
            lpf: SecondOrder::new(f, BUTTERWORTH_Q, sample_rate),
            hpf: SecondOrder::new(f, BUTTERWORTH_Q, sample_rate),
            lp_states: Vec::new(),
            hp_states: Vec::new(),
        }
    }

    fn clamp_cutoff(cutoff: Precision, sr: Precision) -> Precision {
        cutoff.min(sr * MAX_CUTOFF_RATIO)
    }

    /// Allocates history for `num_channels` channels and clears it
    pub(crate) fn prepare(&mut self, sample_rate: Precision, num_channels: usize) {
        self.sr = sample_rate;
        self.lpf.set_sample_rate(sample_rate);
        self.hpf.set_sample_rate(sample_rate);
        self.set_cutoff(self.cutoff);

        self.lp_states = vec![Default::default(); num_channels];
        self.hp_states = vec![Default::default(); num_channels];
    }

    pub(crate) fn reset(&mut self) {
        self.lp_states
            .iter_mut()
            .chain(self.hp_states.iter_mut())
            .flatten()
            .for_each(BiquadState::reset);
    }

    pub(crate) fn set_cutoff(&mut self, cutoff: Precision) {
        self.cutoff = cutoff;
        let f = Self::clamp_cutoff(cutoff, self.sr);
        self.lpf.set_frequency(f);
        self.hpf.set_frequency(f);
    }

    #[inline]
    fn lowpass(&mut self, channel: usize, x: Precision) -> Precision {
        let [s1, s2] = &mut self.lp_states[channel];
        self.lpf.process_sample(s2, self.lpf.process_sample(s1, x))
    }

    #[inline]
    fn highpass(&mut self, channel: usize, x: Precision) -> Precision {
        let [s1, s2] = &mut self.hp_states[channel];
        self.hpf.process_sample(s2, self.hpf.process_sample(s1, x))
    }

    #[inline]
    pub(crate) fn process_sample(&mut self, channel: usize, x: Precision) -> Precision {
        match self.kind {
            FilterType::Lowpass => self.lowpass(channel, x),
            FilterType::Highpass => self.highpass(channel, x),
            FilterType::Allpass => self.lowpass(channel, x) + self.highpass(channel, x),
        }
    }

    pub(crate) fn process_block(&mut self, channel: usize, samples: &mut [f32]) {
        for sample in samples.iter_mut() {
            *sample = self.process_sample(channel, *sample as Precision) as f32;
        }
    }
}

/// Splits a block into low, mid and high bands.
///
/// ```text
/// input ─┬─ LP(f1) ── AP(f2) ─────────────── low
///        └─ HP(f1) ─┬─ LP(f2) ────────────── mid
///                   └─ HP(f2) ────────────── high
/// ```
///
/// The allpass on the low path matches the phase shift the other two paths pick up at `f2`, so the
/// three bands sum to the input with a flat magnitude response.
pub(crate) struct CrossoverNetwork {
    low_mid: f32,
    mid_high: f32,
    lpf1: LinkwitzRiley,
    apf2: LinkwitzRiley,
    hpf1: LinkwitzRiley,
    lpf2: LinkwitzRiley,
    hpf2: LinkwitzRiley,
}

impl CrossoverNetwork {
    pub(crate) fn new(low_mid: f32, mid_high: f32, sample_rate: f32) -> Self {
        let f1 = low_mid as Precision;
        let f2 = mid_high as Precision;
        let sr = sample_rate as Precision;
        Self {
            low_mid,
            mid_high,
            lpf1: LinkwitzRiley::new(FilterType::Lowpass, f1, sr),
            apf2: LinkwitzRiley::new(FilterType::Allpass, f2, sr),
            hpf1: LinkwitzRiley::new(FilterType::Highpass, f1, sr),
            lpf2: LinkwitzRiley::new(FilterType::Lowpass, f2, sr),
            hpf2: LinkwitzRiley::new(FilterType::Highpass, f2, sr),
        }
    }

    fn stages_mut(&mut self) -> [&mut LinkwitzRiley; 5] {
        [
            &mut self.lpf1,
            &mut self.apf2,
            &mut self.hpf1,
            &mut self.lpf2,
            &mut self.hpf2,
        ]
    }

    pub(crate) fn prepare(&mut self, sample_rate: f32, num_channels: usize) {
        for stage in self.stages_mut() {
            stage.prepare(sample_rate as Precision, num_channels);
        }
    }

    pub(crate) fn reset(&mut self) {
        for stage in self.stages_mut() {
            stage.reset();
        }
    }

    #[cfg(test)]
    pub(crate) fn frequencies(&self) -> (f32, f32) {
        (self.low_mid, self.mid_high)
    }

    /// Update both cutoffs. Coefficients are only recomputed for a cutoff that actually changed,
    /// the filter history is kept either way.
    pub(crate) fn set_frequencies(&mut self, low_mid: f32, mid_high: f32) {
        nih_debug_assert!(
            low_mid < mid_high,
            "low-mid crossover must be below mid-high crossover"
        );

        if low_mid != self.low_mid {
            self.low_mid = low_mid;
            self.lpf1.set_cutoff(low_mid as Precision);
            self.hpf1.set_cutoff(low_mid as Precision);
        }
        if mid_high != self.mid_high {
            self.mid_high = mid_high;
            self.apf2.set_cutoff(mid_high as Precision);
            self.lpf2.set_cutoff(mid_high as Precision);
            self.hpf2.set_cutoff(mid_high as Precision);
        }
    }

    /// Split `input` into the three band buffers, ordered low, mid, high
    pub(crate) fn split(&mut self, input: &[&mut [f32]], bands: &mut [BandBuffer; 3]) {
        let [low, mid, high] = bands;

        low.copy_from(input);
        mid.copy_from(input);

        for channel in 0..low.num_channels() {
            let samples = low.channel_mut(channel);
            self.lpf1.process_block(channel, samples);
            self.apf2.process_block(channel, samples);

            self.hpf1.process_block(channel, mid.channel_mut(channel));
        }

        // mid and high share the highpass at f1
        high.copy_from_band(mid);

        for channel in 0..mid.num_channels() {
            self.lpf2.process_block(channel, mid.channel_mut(channel));
            self.hpf2.process_block(channel, high.channel_mut(channel));
        }
    }
}
