use arrayvec::ArrayVec;

use crate::{
    buffer::BandBuffer,
    params::{Band, BandSnapshot},
};

/// Sums the band buffers back into the host block, honouring solo and mute
pub(crate) struct BandMixer;

impl BandMixer {
    /// The bands that end up in the output. If anything is soloed, only soloed bands play and mute
    /// is ignored. Otherwise every band that isn't muted plays.
    pub(crate) fn contributing(routing: &[BandSnapshot; 3]) -> ArrayVec<Band, 3> {
        let any_solo = routing.iter().any(|band| band.solo);

        Band::ALL
            .into_iter()
            .filter(|band| {
                let flags = &routing[band.index()];
                if any_solo {
                    flags.solo
                } else {
                    !flags.mute
                }
            })
            .collect()
    }

    /// Overwrites `output` with the sum of the contributing bands. No normalisation is applied.
    pub(crate) fn combine(
        bands: &[BandBuffer; 3],
        routing: &[BandSnapshot; 3],
        output: &mut [&mut [f32]],
    ) {
        for channel in output.iter_mut() {
            channel.fill(0.0);
        }

        for band in Self::contributing(routing) {
            let source = &bands[band.index()];
            debug_assert_eq!(source.num_channels(), output.len());

            for (channel_idx, channel) in output.iter_mut().enumerate() {
                for (out, sample) in channel.iter_mut().zip(source.channel(channel_idx)) {
                    *out += *sample;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn routing(solo: [bool; 3], mute: [bool; 3]) -> [BandSnapshot; 3] {
        [0, 1, 2].map(|idx| BandSnapshot {
            solo: solo[idx],
            mute: mute[idx],
            ..Default::default()
        })
    }

    /// Low band is all 1.0, mid is 10.0 and high is 100.0, so every combination sums to a unique
    /// value
    fn bands() -> [BandBuffer; 3] {
        let mut bands: [BandBuffer; 3] = Default::default();
        for (band, value) in bands.iter_mut().zip([1.0, 10.0, 100.0]) {
            band.allocate(2, 8);
            let mut left = [value; 8];
            let mut right = [value; 8];
            let block: [&mut [f32]; 2] = [&mut left, &mut right];
            band.copy_from(&block);
        }
        bands
    }

    fn mix(solo: [bool; 3], mute: [bool; 3]) -> f32 {
        let bands = bands();
        let mut left = [f32::NAN; 8];
        let mut right = [f32::NAN; 8];
        let mut output: [&mut [f32]; 2] = [&mut left, &mut right];
        BandMixer::combine(&bands, &routing(solo, mute), &mut output);

        assert!(left.iter().chain(right.iter()).all(|&x| x == left[0]));
        left[0]
    }

    mod contributing {
        use super::*;

        #[test]
        fn everything_plays_by_default() {
            let bands = BandMixer::contributing(&routing([false; 3], [false; 3]));
            assert_eq!(bands.as_slice(), &Band::ALL);
        }

        #[test]
        fn solo_beats_mute() {
            let bands = BandMixer::contributing(&routing([false, true, false], [true, true, false]));
            assert_eq!(bands.as_slice(), &[Band::Mid]);
        }

        #[test]
        fn several_solos() {
            let bands = BandMixer::contributing(&routing([true, false, true], [false; 3]));
            assert_eq!(bands.as_slice(), &[Band::Low, Band::High]);
        }
    }

    mod combine {
        use super::*;

        #[test]
        fn sums_all_bands() {
            assert_eq!(mix([false; 3], [false; 3]), 111.0);
        }

        #[test]
        fn solo_isolates_band() {
            // high is muted but not soloed, so it's excluded along with low
            assert_eq!(mix([false, true, false], [false, false, true]), 10.0);
        }

        #[test]
        fn soloed_and_muted_band_still_plays() {
            assert_eq!(mix([true, false, false], [true, false, false]), 1.0);
        }

        #[test]
        fn mute_excludes_band() {
            assert_eq!(mix([false; 3], [false, true, false]), 101.0);
        }

        #[test]
        fn all_muted_is_silence() {
            assert_eq!(mix([false; 3], [true; 3]), 0.0);
        }
    }
}
