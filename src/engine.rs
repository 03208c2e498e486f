use nih_plug::{nih_debug_assert, nih_log};
use std::sync::Arc;
use thiserror::Error;

use crate::{
    buffer::BandBuffer,
    compressor::CompressorBand,
    crossover::CrossoverNetwork,
    gain::GainStage,
    mixer::BandMixer,
    params::{Band, MultibandParams, ParamSource},
};

/// Most channels a single engine will process
pub const MAX_CHANNELS: usize = 8;

const MIN_SAMPLE_RATE: f32 = 8_000.0;
const MAX_SAMPLE_RATE: f32 = 768_000.0;

/// Placeholder used until `prepare()` supplies the real sample rate
const PLACEHOLDER_SAMPLE_RATE: f32 = 44_100.0;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("sample rate must be between {min} and {max} Hz, got {0}", min = MIN_SAMPLE_RATE, max = MAX_SAMPLE_RATE)]
    InvalidSampleRate(f32),
    #[error("maximum block size must be at least one frame, got {0}")]
    InvalidBlockSize(usize),
    #[error("channel count must be between 1 and {max}, got {0}", max = MAX_CHANNELS)]
    InvalidChannelCount(usize),
}

/// The fixed audio configuration the engine is prepared for
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProcessSpec {
    pub sample_rate: f32,
    pub max_block_size: usize,
    pub num_channels: usize,
}

impl ProcessSpec {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.sample_rate.is_finite()
            || !(MIN_SAMPLE_RATE..=MAX_SAMPLE_RATE).contains(&self.sample_rate)
        {
            return Err(ConfigError::InvalidSampleRate(self.sample_rate));
        }
        if self.max_block_size == 0 {
            return Err(ConfigError::InvalidBlockSize(self.max_block_size));
        }
        if !(1..=MAX_CHANNELS).contains(&self.num_channels) {
            return Err(ConfigError::InvalidChannelCount(self.num_channels));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum EngineState {
    Unconfigured,
    Configured(ProcessSpec),
}

/// The three-band compressor. Reads its parameters from a shared [`ParamSource`] once per block,
/// then runs input gain, the crossover, one compressor per band, the mixer and output gain over
/// the host's buffer in place.
///
/// `prepare()` must be called before `process()`, and again whenever the sample rate, maximum
/// block size or channel count changes. `process()` never allocates or locks.
pub struct MultibandEngine<P: ParamSource = MultibandParams> {
    params: Arc<P>,
    state: EngineState,

    input_gain: GainStage,
    output_gain: GainStage,
    crossover: CrossoverNetwork,
    compressors: [CompressorBand; 3],
    bands: [BandBuffer; 3],
}

impl Default for MultibandEngine<MultibandParams> {
    fn default() -> Self {
        Self::new(Arc::new(MultibandParams::default()))
    }
}

impl<P: ParamSource> MultibandEngine<P> {
    pub fn new(params: Arc<P>) -> Self {
        let snapshot = params.snapshot();
        Self {
            params,
            state: EngineState::Unconfigured,
            input_gain: GainStage::new(),
            output_gain: GainStage::new(),
            crossover: CrossoverNetwork::new(
                snapshot.low_mid_hz,
                snapshot.mid_high_hz,
                PLACEHOLDER_SAMPLE_RATE,
            ),
            compressors: Default::default(),
            bands: Default::default(),
        }
    }

    pub fn params(&self) -> &Arc<P> {
        &self.params
    }

    /// Size every buffer and clear all filter and envelope history. On error nothing is changed,
    /// an engine that was already prepared stays prepared with its old configuration.
    pub fn prepare(
        &mut self,
        sample_rate: f32,
        max_block_size: usize,
        num_channels: usize,
    ) -> Result<(), ConfigError> {
        let spec = ProcessSpec {
            sample_rate,
            max_block_size,
            num_channels,
        };
        spec.validate()?;

        let snapshot = self.params.snapshot();

        self.crossover
            .set_frequencies(snapshot.low_mid_hz, snapshot.mid_high_hz);
        self.crossover.prepare(sample_rate, num_channels);

        for (compressor, band) in self.compressors.iter_mut().zip(self.bands.iter_mut()) {
            compressor.prepare(sample_rate, num_channels);
            band.allocate(num_channels, max_block_size);
        }

        // start at the current gains instead of ramping up from the last configuration
        self.input_gain.set_gain_db(snapshot.gain_in_db);
        self.input_gain.prepare(sample_rate);
        self.output_gain.set_gain_db(snapshot.gain_out_db);
        self.output_gain.prepare(sample_rate);

        self.state = EngineState::Configured(spec);
        nih_log!(
            "multiband engine prepared: {sample_rate} Hz, {max_block_size} frames, {num_channels} channels"
        );

        Ok(())
    }

    /// Clear filter and envelope history without changing the configuration
    pub fn reset(&mut self) {
        self.crossover.reset();
        for compressor in self.compressors.iter_mut() {
            compressor.reset();
        }
        self.input_gain.reset();
        self.output_gain.reset();
    }

    pub fn is_prepared(&self) -> bool {
        matches!(self.state, EngineState::Configured(_))
    }

    pub fn spec(&self) -> Option<ProcessSpec> {
        match self.state {
            EngineState::Configured(spec) => Some(spec),
            EngineState::Unconfigured => None,
        }
    }

    /// Deepest gain reduction applied to `band` during the last block, in positive dB
    pub fn gain_reduction_db(&self, band: Band) -> f32 {
        self.compressors[band.index()].gain_reduction_db()
    }

    /// Process one block in place. `block` holds one slice per channel, all of the same length.
    ///
    /// # Panics
    ///
    /// When called before `prepare()`, with a different channel count than the engine was prepared
    /// for, or with more frames than the prepared maximum block size.
    pub fn process(&mut self, block: &mut [&mut [f32]]) {
        let spec = match self.state {
            EngineState::Configured(spec) => spec,
            EngineState::Unconfigured => panic!("process() called before prepare()"),
        };

        assert_eq!(
            block.len(),
            spec.num_channels,
            "engine was prepared for {} channels",
            spec.num_channels
        );
        let frames = block.first().map_or(0, |ch| ch.len());
        assert!(
            frames <= spec.max_block_size,
            "block of {frames} frames exceeds the prepared maximum of {}",
            spec.max_block_size
        );
        nih_debug_assert!(block.iter().all(|ch| ch.len() == frames));

        if frames == 0 {
            return;
        }

        let snapshot = self.params.snapshot();
        self.input_gain.set_gain_db(snapshot.gain_in_db);
        self.output_gain.set_gain_db(snapshot.gain_out_db);
        self.crossover
            .set_frequencies(snapshot.low_mid_hz, snapshot.mid_high_hz);

        self.input_gain.process(block);
        self.crossover.split(block, &mut self.bands);
        for ((compressor, band), band_params) in self
            .compressors
            .iter_mut()
            .zip(self.bands.iter_mut())
            .zip(snapshot.bands.iter())
        {
            compressor.process(band, band_params);
        }
        BandMixer::combine(&self.bands, &snapshot.bands, block);
        self.output_gain.process(block);
    }
}
