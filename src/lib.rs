mod biquad;
mod buffer;
mod compressor;
mod crossover;
mod engine;
mod gain;
mod mixer;
mod parameter_formatters;
mod params;

pub use engine::{ConfigError, MultibandEngine, ProcessSpec, MAX_CHANNELS};
pub use params::{
    nearest_ratio_index, Band, BandParam, BandParams, BandSnapshot, MultibandParams, ParamId,
    ParamKind, ParamRegistry, ParamSnapshot, ParamSource, ParamSpec, PARAM_COUNT, RATIOS,
};

use nih_plug::params::internals::ParamPtr;
use nih_plug::prelude::*;
use parameter_formatters::{s2v_f32_db, s2v_f32_ms, v2s_f32_db_signed, v2s_f32_ms};
use std::sync::Arc;

/// The plugin shell around [`MultibandEngine`]. The host owns the parameters (and their
/// persistence), this only forwards the lifecycle calls.
pub struct MultibandCompressor {
    params: Arc<PluginParams>,
    engine: MultibandEngine<PluginParams>,
}

impl Default for MultibandCompressor {
    fn default() -> Self {
        let params = Arc::new(PluginParams::new(&ParamRegistry::new()));
        Self {
            engine: MultibandEngine::new(params.clone()),
            params,
        }
    }
}

#[derive(Enum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ratio {
    #[id = "1"]
    #[name = "1:1"]
    R1,
    #[id = "1.5"]
    #[name = "1.5:1"]
    R1_5,
    #[id = "2"]
    #[name = "2:1"]
    R2,
    #[id = "3"]
    #[name = "3:1"]
    R3,
    #[id = "4"]
    #[name = "4:1"]
    R4,
    #[id = "5"]
    #[name = "5:1"]
    R5,
    #[id = "6"]
    #[name = "6:1"]
    R6,
    #[id = "7"]
    #[name = "7:1"]
    R7,
    #[id = "8"]
    #[name = "8:1"]
    R8,
    #[id = "10"]
    #[name = "10:1"]
    R10,
    #[id = "15"]
    #[name = "15:1"]
    R15,
    #[id = "20"]
    #[name = "20:1"]
    R20,
    #[id = "50"]
    #[name = "50:1"]
    R50,
    #[id = "100"]
    #[name = "100:1"]
    R100,
}

impl Ratio {
    pub fn value(self) -> f32 {
        RATIOS[self.to_index()]
    }
}

/// One band's host-facing parameters. Host IDs come from the registry, see the [`Params`] impl
/// on [`PluginParams`].
pub struct BandPluginParams {
    pub threshold: FloatParam,
    pub attack: FloatParam,
    pub release: FloatParam,
    pub ratio: EnumParam<Ratio>,
    pub bypass: BoolParam,
    pub solo: BoolParam,
    pub mute: BoolParam,
}

pub struct PluginParams {
    /// Supplies the stable string IDs hosts persist values under
    registry: ParamRegistry,

    pub gain_in: FloatParam,
    pub gain_out: FloatParam,

    pub low_mid_crossover: FloatParam,
    pub mid_high_crossover: FloatParam,

    /// Low, mid and high, in that order
    pub bands: [BandPluginParams; 3],
}

/// Builds a float parameter from its registry entry. `skew` of `None` gives a linear range. The
/// value formatters add the unit.
fn float_param(spec: &ParamSpec, skew: Option<f32>) -> FloatParam {
    let ParamKind::Float { range, default, .. } = &spec.kind else {
        panic!("{} is not a float parameter", spec.id);
    };

    let (min, max) = (*range.start(), *range.end());
    let range = match skew {
        Some(factor) => FloatRange::Skewed {
            min,
            max,
            factor: FloatRange::skew_factor(factor),
        },
        None => FloatRange::Linear { min, max },
    };

    FloatParam::new(spec.name.clone(), *default, range)
}

fn bool_param(spec: &ParamSpec) -> BoolParam {
    let default = matches!(spec.kind, ParamKind::Bool { default: true });
    BoolParam::new(spec.name.clone(), default)
}

impl BandPluginParams {
    fn new(registry: &ParamRegistry, band: Band) -> Self {
        let spec = |p| registry.spec(ParamId::Band(band, p));

        let ratio_spec = spec(BandParam::Ratio);
        let default_ratio = match ratio_spec.kind {
            ParamKind::Choice { default_index, .. } => Ratio::from_index(default_index),
            _ => Ratio::R3,
        };

        Self {
            threshold: float_param(spec(BandParam::Threshold), None)
                .with_value_to_string(v2s_f32_db_signed(1))
                .with_string_to_value(s2v_f32_db()),
            // these settings are similar to FabFilter Pro-C's attack and release
            attack: float_param(spec(BandParam::Attack), Some(-1.6))
                .with_value_to_string(v2s_f32_ms(1))
                .with_string_to_value(s2v_f32_ms()),
            release: float_param(spec(BandParam::Release), Some(-1.6))
                .with_value_to_string(v2s_f32_ms(1))
                .with_string_to_value(s2v_f32_ms()),
            ratio: EnumParam::new(ratio_spec.name.clone(), default_ratio),
            bypass: bool_param(spec(BandParam::Bypass)),
            solo: bool_param(spec(BandParam::Solo)),
            mute: bool_param(spec(BandParam::Mute)),
        }
    }

    fn snapshot(&self) -> BandSnapshot {
        BandSnapshot {
            threshold_db: self.threshold.value(),
            attack_ms: self.attack.value(),
            release_ms: self.release.value(),
            ratio: self.ratio.value().value(),
            bypass: self.bypass.value(),
            solo: self.solo.value(),
            mute: self.mute.value(),
        }
    }
}

impl PluginParams {
    pub fn new(registry: &ParamRegistry) -> Self {
        Self {
            gain_in: float_param(registry.spec(ParamId::GainIn), None)
                .with_value_to_string(v2s_f32_db_signed(1))
                .with_string_to_value(s2v_f32_db()),
            gain_out: float_param(registry.spec(ParamId::GainOut), None)
                .with_value_to_string(v2s_f32_db_signed(1))
                .with_string_to_value(s2v_f32_db()),

            low_mid_crossover: float_param(registry.spec(ParamId::LowMidCrossover), Some(-2.0))
                .with_value_to_string(formatters::v2s_f32_hz_then_khz(3))
                .with_string_to_value(formatters::s2v_f32_hz_then_khz()),
            mid_high_crossover: float_param(registry.spec(ParamId::MidHighCrossover), Some(-2.0))
                .with_value_to_string(formatters::v2s_f32_hz_then_khz(3))
                .with_string_to_value(formatters::s2v_f32_hz_then_khz()),

            bands: Band::ALL.map(|band| BandPluginParams::new(registry, band)),

            registry: registry.clone(),
        }
    }

    fn param_ptr(&self, param: ParamId) -> ParamPtr {
        match param {
            ParamId::GainIn => self.gain_in.as_ptr(),
            ParamId::GainOut => self.gain_out.as_ptr(),
            ParamId::LowMidCrossover => self.low_mid_crossover.as_ptr(),
            ParamId::MidHighCrossover => self.mid_high_crossover.as_ptr(),
            ParamId::Band(band, p) => {
                let band = &self.bands[band.index()];
                match p {
                    BandParam::Threshold => band.threshold.as_ptr(),
                    BandParam::Attack => band.attack.as_ptr(),
                    BandParam::Release => band.release.as_ptr(),
                    BandParam::Ratio => band.ratio.as_ptr(),
                    BandParam::Bypass => band.bypass.as_ptr(),
                    BandParam::Solo => band.solo.as_ptr(),
                    BandParam::Mute => band.mute.as_ptr(),
                }
            }
        }
    }
}

// SAFETY: every pointer refers to a field of `self`, and the plugin only hands out `self` behind
// an `Arc` that outlives the wrapper's use of the map.
unsafe impl Params for PluginParams {
    fn param_map(&self) -> Vec<(String, ParamPtr, String)> {
        self.registry
            .iter()
            .map(|spec| {
                let group = match spec.param {
                    ParamId::Band(band, _) => format!("{} Band", band.name()),
                    _ => String::new(),
                };
                (spec.id.clone(), self.param_ptr(spec.param), group)
            })
            .collect()
    }
}

impl ParamSource for PluginParams {
    fn snapshot(&self) -> ParamSnapshot {
        ParamSnapshot {
            gain_in_db: self.gain_in.value(),
            gain_out_db: self.gain_out.value(),
            low_mid_hz: self.low_mid_crossover.value(),
            mid_high_hz: self.mid_high_crossover.value(),
            bands: [
                self.bands[0].snapshot(),
                self.bands[1].snapshot(),
                self.bands[2].snapshot(),
            ],
        }
    }
}

impl Plugin for MultibandCompressor {
    const NAME: &'static str = "Tribus";
    const VENDOR: &'static str = "James Walker";
    const URL: &'static str = env!("CARGO_PKG_HOMEPAGE");
    const EMAIL: &'static str = "your@email.com";

    const VERSION: &'static str = env!("CARGO_PKG_VERSION");

    const AUDIO_IO_LAYOUTS: &'static [AudioIOLayout] = &[
        AudioIOLayout {
            main_input_channels: NonZeroU32::new(2),
            main_output_channels: NonZeroU32::new(2),

            aux_input_ports: &[],
            aux_output_ports: &[],

            names: PortNames::const_default(),
        },
        AudioIOLayout {
            main_input_channels: NonZeroU32::new(1),
            main_output_channels: NonZeroU32::new(1),

            aux_input_ports: &[],
            aux_output_ports: &[],

            names: PortNames::const_default(),
        },
    ];

    const MIDI_INPUT: MidiConfig = MidiConfig::None;
    const MIDI_OUTPUT: MidiConfig = MidiConfig::None;

    const SAMPLE_ACCURATE_AUTOMATION: bool = true;

    type SysExMessage = ();
    type BackgroundTask = ();

    fn params(&self) -> Arc<dyn Params> {
        self.params.clone()
    }

    fn initialize(
        &mut self,
        audio_io_layout: &AudioIOLayout,
        buffer_config: &BufferConfig,
        _context: &mut impl InitContext<Self>,
    ) -> bool {
        let num_channels = audio_io_layout
            .main_output_channels
            .map_or(0, NonZeroU32::get) as usize;

        match self.engine.prepare(
            buffer_config.sample_rate,
            buffer_config.max_buffer_size as usize,
            num_channels,
        ) {
            Ok(()) => true,
            Err(err) => {
                nih_error!("cannot initialise the multiband engine: {err}");
                false
            }
        }
    }

    fn reset(&mut self) {
        self.engine.reset();
    }

    fn process(
        &mut self,
        buffer: &mut Buffer,
        _aux: &mut AuxiliaryBuffers,
        _ctx: &mut impl ProcessContext<Self>,
    ) -> ProcessStatus {
        self.engine.process(buffer.as_slice());

        ProcessStatus::Normal
    }
}

impl ClapPlugin for MultibandCompressor {
    const CLAP_ID: &'static str = "com.sai-audio.tribus";
    const CLAP_DESCRIPTION: Option<&'static str> = Some("A three-band multiband compressor");
    const CLAP_MANUAL_URL: Option<&'static str> = None;
    const CLAP_SUPPORT_URL: Option<&'static str> = None;

    const CLAP_FEATURES: &'static [ClapFeature] = &[
        ClapFeature::AudioEffect,
        ClapFeature::Stereo,
        ClapFeature::Mono,
        ClapFeature::Compressor,
    ];
}

impl Vst3Plugin for MultibandCompressor {
    const VST3_CLASS_ID: [u8; 16] = *b"TribusMbCompJW01";

    const VST3_SUBCATEGORIES: &'static [Vst3SubCategory] =
        &[Vst3SubCategory::Fx, Vst3SubCategory::Dynamics];
}

nih_export_clap!(MultibandCompressor);
nih_export_vst3!(MultibandCompressor);
