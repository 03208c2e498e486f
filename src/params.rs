//! Parameter identities, ranges and the lock-free parameter store.
//!
//! The store is written by a control thread and read once per block by the audio thread. Every
//! parameter is a single scalar atomic, so a read never sees half of a write. A snapshot taken
//! while the control thread is busy may mix old and new values of different parameters, which is
//! fine for audio.

use portable_atomic::{AtomicBool, AtomicF32, AtomicU8, Ordering};
use std::ops::RangeInclusive;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Band {
    Low,
    Mid,
    High,
}

impl Band {
    /// All bands, ordered by frequency
    pub const ALL: [Band; 3] = [Band::Low, Band::Mid, Band::High];

    pub const fn index(self) -> usize {
        match self {
            Band::Low => 0,
            Band::Mid => 1,
            Band::High => 2,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Band::Low => "Low",
            Band::Mid => "Mid",
            Band::High => "High",
        }
    }
}

/// The only ratios the compressors accept. Ratios are never interpolated between these.
pub const RATIOS: [f32; 14] = [
    1.0, 1.5, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 10.0, 15.0, 20.0, 50.0, 100.0,
];

pub const GAIN_RANGE_DB: RangeInclusive<f32> = -24.0..=24.0;
pub const THRESHOLD_RANGE_DB: RangeInclusive<f32> = -60.0..=12.0;
pub const ATTACK_RANGE_MS: RangeInclusive<f32> = 5.0..=500.0;
pub const RELEASE_RANGE_MS: RangeInclusive<f32> = 5.0..=500.0;
// the two crossover ranges don't overlap, which keeps low-mid below mid-high
pub const LOW_MID_RANGE_HZ: RangeInclusive<f32> = 20.0..=999.0;
pub const MID_HIGH_RANGE_HZ: RangeInclusive<f32> = 1000.0..=20000.0;

pub const DEFAULT_GAIN_DB: f32 = 0.0;
pub const DEFAULT_THRESHOLD_DB: f32 = 0.0;
pub const DEFAULT_ATTACK_MS: f32 = 50.0;
pub const DEFAULT_RELEASE_MS: f32 = 250.0;
/// 3:1
pub const DEFAULT_RATIO_INDEX: usize = 3;
pub const DEFAULT_LOW_MID_HZ: f32 = 500.0;
pub const DEFAULT_MID_HIGH_HZ: f32 = 2000.0;

/// Index of the entry in [`RATIOS`] closest to `ratio`
pub fn nearest_ratio_index(ratio: f32) -> usize {
    RATIOS
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| (*a - ratio).abs().total_cmp(&(*b - ratio).abs()))
        .map_or(DEFAULT_RATIO_INDEX, |(idx, _)| idx)
}

fn clamp_to(range: &RangeInclusive<f32>, value: f32) -> f32 {
    value.clamp(*range.start(), *range.end())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BandParam {
    Threshold,
    Attack,
    Release,
    Ratio,
    Bypass,
    Solo,
    Mute,
}

impl BandParam {
    pub const ALL: [BandParam; 7] = [
        BandParam::Threshold,
        BandParam::Attack,
        BandParam::Release,
        BandParam::Ratio,
        BandParam::Bypass,
        BandParam::Solo,
        BandParam::Mute,
    ];

    const fn label(self) -> &'static str {
        match self {
            BandParam::Threshold => "Threshold",
            BandParam::Attack => "Attack",
            BandParam::Release => "Release",
            BandParam::Ratio => "Ratio",
            BandParam::Bypass => "Bypass",
            BandParam::Solo => "Solo",
            BandParam::Mute => "Mute",
        }
    }
}

/// Identifies one parameter of the processor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamId {
    GainIn,
    GainOut,
    LowMidCrossover,
    MidHighCrossover,
    Band(Band, BandParam),
}

pub const PARAM_COUNT: usize = 4 + Band::ALL.len() * BandParam::ALL.len();

impl ParamId {
    pub fn all() -> impl Iterator<Item = ParamId> {
        [
            ParamId::GainIn,
            ParamId::GainOut,
            ParamId::LowMidCrossover,
            ParamId::MidHighCrossover,
        ]
        .into_iter()
        .chain(
            Band::ALL
                .into_iter()
                .flat_map(|band| BandParam::ALL.into_iter().map(move |p| ParamId::Band(band, p))),
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParamKind {
    Float {
        range: RangeInclusive<f32>,
        default: f32,
    },
    Choice {
        choices: &'static [f32],
        default_index: usize,
    },
    Bool {
        default: bool,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParamSpec {
    pub param: ParamId,
    /// Stable string ID, used by hosts to persist the value
    pub id: String,
    /// Human readable name
    pub name: String,
    pub kind: ParamKind,
}

impl ParamSpec {
    fn new(param: ParamId) -> Self {
        let (id, name) = match param {
            ParamId::GainIn => ("Gain_In".to_owned(), "Gain In".to_owned()),
            ParamId::GainOut => ("Gain_Out".to_owned(), "Gain Out".to_owned()),
            ParamId::LowMidCrossover => (
                "Low_Mid_Crossover_Freq".to_owned(),
                "Low-Mid Crossover Freq".to_owned(),
            ),
            ParamId::MidHighCrossover => (
                "Mid_High_Crossover_Freq".to_owned(),
                "Mid-High Crossover Freq".to_owned(),
            ),
            ParamId::Band(band, p) => (
                format!("{}_{}_Band", p.label(), band.name()),
                format!("{} {} Band", p.label(), band.name()),
            ),
        };

        let kind = match param {
            ParamId::GainIn | ParamId::GainOut => ParamKind::Float {
                range: GAIN_RANGE_DB,
                default: DEFAULT_GAIN_DB,
            },
            ParamId::LowMidCrossover => ParamKind::Float {
                range: LOW_MID_RANGE_HZ,
                default: DEFAULT_LOW_MID_HZ,
            },
            ParamId::MidHighCrossover => ParamKind::Float {
                range: MID_HIGH_RANGE_HZ,
                default: DEFAULT_MID_HIGH_HZ,
            },
            ParamId::Band(_, BandParam::Threshold) => ParamKind::Float {
                range: THRESHOLD_RANGE_DB,
                default: DEFAULT_THRESHOLD_DB,
            },
            ParamId::Band(_, BandParam::Attack) => ParamKind::Float {
                range: ATTACK_RANGE_MS,
                default: DEFAULT_ATTACK_MS,
            },
            ParamId::Band(_, BandParam::Release) => ParamKind::Float {
                range: RELEASE_RANGE_MS,
                default: DEFAULT_RELEASE_MS,
            },
            ParamId::Band(_, BandParam::Ratio) => ParamKind::Choice {
                choices: &RATIOS,
                default_index: DEFAULT_RATIO_INDEX,
            },
            ParamId::Band(_, BandParam::Bypass | BandParam::Solo | BandParam::Mute) => {
                ParamKind::Bool { default: false }
            }
        };

        Self {
            param,
            id,
            name,
            kind,
        }
    }

    /// The default as a plain value, in the same representation [`MultibandParams::get`] uses
    pub fn default_value(&self) -> f32 {
        match &self.kind {
            ParamKind::Float { default, .. } => *default,
            ParamKind::Choice {
                choices,
                default_index,
            } => choices[*default_index],
            ParamKind::Bool { default } => *default as u8 as f32,
        }
    }
}

/// Table describing every parameter. Built once when the processor is set up, then passed by
/// reference to whatever needs names, IDs or ranges.
#[derive(Debug, Clone)]
pub struct ParamRegistry {
    specs: Vec<ParamSpec>,
}

impl Default for ParamRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ParamRegistry {
    pub fn new() -> Self {
        Self {
            specs: ParamId::all().map(ParamSpec::new).collect(),
        }
    }

    pub fn spec(&self, param: ParamId) -> &ParamSpec {
        // `specs` is built from `ParamId::all()`, so every ID has an entry
        self.specs
            .iter()
            .find(|spec| spec.param == param)
            .unwrap_or_else(|| unreachable!("{param:?} missing from registry"))
    }

    /// Find a parameter by its string ID
    pub fn lookup(&self, id: &str) -> Option<ParamId> {
        self.specs
            .iter()
            .find(|spec| spec.id == id)
            .map(|spec| spec.param)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ParamSpec> {
        self.specs.iter()
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

/// One consistent read of a band's parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandSnapshot {
    pub threshold_db: f32,
    pub attack_ms: f32,
    pub release_ms: f32,
    pub ratio: f32,
    pub bypass: bool,
    pub solo: bool,
    pub mute: bool,
}

impl Default for BandSnapshot {
    fn default() -> Self {
        Self {
            threshold_db: DEFAULT_THRESHOLD_DB,
            attack_ms: DEFAULT_ATTACK_MS,
            release_ms: DEFAULT_RELEASE_MS,
            ratio: RATIOS[DEFAULT_RATIO_INDEX],
            bypass: false,
            solo: false,
            mute: false,
        }
    }
}

/// Every parameter value, read once at the start of a block
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamSnapshot {
    pub gain_in_db: f32,
    pub gain_out_db: f32,
    pub low_mid_hz: f32,
    pub mid_high_hz: f32,
    pub bands: [BandSnapshot; 3],
}

impl Default for ParamSnapshot {
    fn default() -> Self {
        Self {
            gain_in_db: DEFAULT_GAIN_DB,
            gain_out_db: DEFAULT_GAIN_DB,
            low_mid_hz: DEFAULT_LOW_MID_HZ,
            mid_high_hz: DEFAULT_MID_HIGH_HZ,
            bands: Default::default(),
        }
    }
}

impl ParamSnapshot {
    pub fn band(&self, band: Band) -> &BandSnapshot {
        &self.bands[band.index()]
    }
}

/// Anything the engine can read live parameter values from
pub trait ParamSource: Send + Sync {
    /// Read every parameter. Must not block or allocate, this is called on the audio thread.
    fn snapshot(&self) -> ParamSnapshot;
}

/// A single band's parameters in the store
#[derive(Debug)]
pub struct BandParams {
    threshold_db: AtomicF32,
    attack_ms: AtomicF32,
    release_ms: AtomicF32,
    ratio_index: AtomicU8,
    bypass: AtomicBool,
    solo: AtomicBool,
    mute: AtomicBool,
}

/// Writes a clamped float, NaN is dropped
fn store_clamped(atomic: &AtomicF32, range: &RangeInclusive<f32>, value: f32) {
    if value.is_nan() {
        return;
    }
    atomic.store(clamp_to(range, value), Ordering::Relaxed);
}

impl BandParams {
    fn from_registry(registry: &ParamRegistry, band: Band) -> Self {
        let default = |p| registry.spec(ParamId::Band(band, p)).default_value();
        Self {
            threshold_db: AtomicF32::new(default(BandParam::Threshold)),
            attack_ms: AtomicF32::new(default(BandParam::Attack)),
            release_ms: AtomicF32::new(default(BandParam::Release)),
            ratio_index: AtomicU8::new(nearest_ratio_index(default(BandParam::Ratio)) as u8),
            bypass: AtomicBool::new(default(BandParam::Bypass) >= 0.5),
            solo: AtomicBool::new(default(BandParam::Solo) >= 0.5),
            mute: AtomicBool::new(default(BandParam::Mute) >= 0.5),
        }
    }

    pub fn threshold_db(&self) -> f32 {
        self.threshold_db.load(Ordering::Relaxed)
    }

    pub fn set_threshold_db(&self, db: f32) {
        store_clamped(&self.threshold_db, &THRESHOLD_RANGE_DB, db);
    }

    pub fn attack_ms(&self) -> f32 {
        self.attack_ms.load(Ordering::Relaxed)
    }

    pub fn set_attack_ms(&self, ms: f32) {
        store_clamped(&self.attack_ms, &ATTACK_RANGE_MS, ms);
    }

    pub fn release_ms(&self) -> f32 {
        self.release_ms.load(Ordering::Relaxed)
    }

    pub fn set_release_ms(&self, ms: f32) {
        store_clamped(&self.release_ms, &RELEASE_RANGE_MS, ms);
    }

    pub fn ratio_index(&self) -> usize {
        self.ratio_index.load(Ordering::Relaxed) as usize
    }

    pub fn ratio(&self) -> f32 {
        RATIOS[self.ratio_index()]
    }

    /// Clamped to the last entry of [`RATIOS`]
    pub fn set_ratio_index(&self, index: usize) {
        let index = index.min(RATIOS.len() - 1);
        self.ratio_index.store(index as u8, Ordering::Relaxed);
    }

    /// Snaps to the nearest entry of [`RATIOS`]
    pub fn set_ratio(&self, ratio: f32) {
        if ratio.is_nan() {
            return;
        }
        self.set_ratio_index(nearest_ratio_index(ratio));
    }

    pub fn bypass(&self) -> bool {
        self.bypass.load(Ordering::Relaxed)
    }

    pub fn set_bypass(&self, bypass: bool) {
        self.bypass.store(bypass, Ordering::Relaxed);
    }

    pub fn solo(&self) -> bool {
        self.solo.load(Ordering::Relaxed)
    }

    pub fn set_solo(&self, solo: bool) {
        self.solo.store(solo, Ordering::Relaxed);
    }

    pub fn mute(&self) -> bool {
        self.mute.load(Ordering::Relaxed)
    }

    pub fn set_mute(&self, mute: bool) {
        self.mute.store(mute, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> BandSnapshot {
        BandSnapshot {
            threshold_db: self.threshold_db(),
            attack_ms: self.attack_ms(),
            release_ms: self.release_ms(),
            ratio: self.ratio(),
            bypass: self.bypass(),
            solo: self.solo(),
            mute: self.mute(),
        }
    }
}

/// The lock-free parameter store. Share it as an `Arc` between the control thread (setters) and
/// the engine (snapshots). Setters clamp to the parameter's range, they never fail.
#[derive(Debug)]
pub struct MultibandParams {
    gain_in_db: AtomicF32,
    gain_out_db: AtomicF32,
    low_mid_hz: AtomicF32,
    mid_high_hz: AtomicF32,
    bands: [BandParams; 3],
}

impl Default for MultibandParams {
    fn default() -> Self {
        Self::from_registry(&ParamRegistry::new())
    }
}

impl MultibandParams {
    /// Creates a store with every parameter at the registry's default
    pub fn from_registry(registry: &ParamRegistry) -> Self {
        let default = |p| registry.spec(p).default_value();
        Self {
            gain_in_db: AtomicF32::new(default(ParamId::GainIn)),
            gain_out_db: AtomicF32::new(default(ParamId::GainOut)),
            low_mid_hz: AtomicF32::new(default(ParamId::LowMidCrossover)),
            mid_high_hz: AtomicF32::new(default(ParamId::MidHighCrossover)),
            bands: Band::ALL.map(|band| BandParams::from_registry(registry, band)),
        }
    }

    pub fn band(&self, band: Band) -> &BandParams {
        &self.bands[band.index()]
    }

    pub fn gain_in_db(&self) -> f32 {
        self.gain_in_db.load(Ordering::Relaxed)
    }

    pub fn set_gain_in_db(&self, db: f32) {
        store_clamped(&self.gain_in_db, &GAIN_RANGE_DB, db);
    }

    pub fn gain_out_db(&self) -> f32 {
        self.gain_out_db.load(Ordering::Relaxed)
    }

    pub fn set_gain_out_db(&self, db: f32) {
        store_clamped(&self.gain_out_db, &GAIN_RANGE_DB, db);
    }

    pub fn low_mid_crossover_hz(&self) -> f32 {
        self.low_mid_hz.load(Ordering::Relaxed)
    }

    pub fn set_low_mid_crossover_hz(&self, hz: f32) {
        store_clamped(&self.low_mid_hz, &LOW_MID_RANGE_HZ, hz);
    }

    pub fn mid_high_crossover_hz(&self) -> f32 {
        self.mid_high_hz.load(Ordering::Relaxed)
    }

    pub fn set_mid_high_crossover_hz(&self, hz: f32) {
        store_clamped(&self.mid_high_hz, &MID_HIGH_RANGE_HZ, hz);
    }

    /// Set any parameter from a plain value. Booleans are `>= 0.5`, ratios snap to the nearest
    /// allowed value.
    pub fn set(&self, param: ParamId, value: f32) {
        if value.is_nan() {
            return;
        }

        match param {
            ParamId::GainIn => self.set_gain_in_db(value),
            ParamId::GainOut => self.set_gain_out_db(value),
            ParamId::LowMidCrossover => self.set_low_mid_crossover_hz(value),
            ParamId::MidHighCrossover => self.set_mid_high_crossover_hz(value),
            ParamId::Band(band, p) => {
                let band = self.band(band);
                match p {
                    BandParam::Threshold => band.set_threshold_db(value),
                    BandParam::Attack => band.set_attack_ms(value),
                    BandParam::Release => band.set_release_ms(value),
                    BandParam::Ratio => band.set_ratio(value),
                    BandParam::Bypass => band.set_bypass(value >= 0.5),
                    BandParam::Solo => band.set_solo(value >= 0.5),
                    BandParam::Mute => band.set_mute(value >= 0.5),
                }
            }
        }
    }

    /// Read any parameter as a plain value, the inverse of [`set`](Self::set)
    pub fn get(&self, param: ParamId) -> f32 {
        match param {
            ParamId::GainIn => self.gain_in_db(),
            ParamId::GainOut => self.gain_out_db(),
            ParamId::LowMidCrossover => self.low_mid_crossover_hz(),
            ParamId::MidHighCrossover => self.mid_high_crossover_hz(),
            ParamId::Band(band, p) => {
                let band = self.band(band);
                match p {
                    BandParam::Threshold => band.threshold_db(),
                    BandParam::Attack => band.attack_ms(),
                    BandParam::Release => band.release_ms(),
                    BandParam::Ratio => band.ratio(),
                    BandParam::Bypass => band.bypass() as u8 as f32,
                    BandParam::Solo => band.solo() as u8 as f32,
                    BandParam::Mute => band.mute() as u8 as f32,
                }
            }
        }
    }
}

impl ParamSource for MultibandParams {
    fn snapshot(&self) -> ParamSnapshot {
        ParamSnapshot {
            gain_in_db: self.gain_in_db(),
            gain_out_db: self.gain_out_db(),
            low_mid_hz: self.low_mid_crossover_hz(),
            mid_high_hz: self.mid_high_crossover_hz(),
            bands: [
                self.bands[0].snapshot(),
                self.bands[1].snapshot(),
                self.bands[2].snapshot(),
            ],
        }
    }
}
