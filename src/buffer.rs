/// A planar multichannel buffer that is sized once during `prepare()` and then only ever has its
/// logical length changed. Used for the three band buffers the crossover writes into.
#[derive(Debug, Default)]
pub(crate) struct BandBuffer {
    channels: Vec<Vec<f32>>,
    /// number of valid frames in the current block
    len: usize,
}

impl BandBuffer {
    /// (Re)allocate storage. This is the only method that allocates, so it must not be called from
    /// the audio thread.
    pub(crate) fn allocate(&mut self, num_channels: usize, capacity: usize) {
        self.channels = vec![vec![0.0; capacity]; num_channels];
        self.len = 0;
    }

    pub(crate) fn num_channels(&self) -> usize {
        self.channels.len()
    }

    pub(crate) fn capacity(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    /// Copy a host block into this buffer, the block length becomes this buffer's length
    pub(crate) fn copy_from(&mut self, block: &[&mut [f32]]) {
        debug_assert_eq!(block.len(), self.num_channels());

        let frames = block.first().map_or(0, |ch| ch.len());
        assert!(
            frames <= self.capacity(),
            "block of {frames} frames exceeds buffer capacity {}",
            self.capacity()
        );

        for (dst, src) in self.channels.iter_mut().zip(block.iter()) {
            dst[..frames].copy_from_slice(src);
        }
        self.len = frames;
    }

    /// Copy another band buffer of the same shape into this one
    pub(crate) fn copy_from_band(&mut self, other: &BandBuffer) {
        debug_assert_eq!(other.num_channels(), self.num_channels());
        debug_assert!(other.len <= self.capacity());

        for (dst, src) in self.channels.iter_mut().zip(other.channels.iter()) {
            dst[..other.len].copy_from_slice(&src[..other.len]);
        }
        self.len = other.len;
    }

    pub(crate) fn channel(&self, channel: usize) -> &[f32] {
        &self.channels[channel][..self.len]
    }

    pub(crate) fn channel_mut(&mut self, channel: usize) -> &mut [f32] {
        &mut self.channels[channel][..self.len]
    }

    pub(crate) fn iter_channels_mut(&mut self) -> impl Iterator<Item = &mut [f32]> {
        let len = self.len;
        self.channels.iter_mut().map(move |ch| &mut ch[..len])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocate_sets_shape() {
        let mut buf = BandBuffer::default();
        buf.allocate(2, 64);
        assert_eq!(buf.num_channels(), 2);
        assert_eq!(buf.capacity(), 64);
        assert_eq!(buf.len(), 0);
    }

    #[test]
    fn copy_from_tracks_block_length() {
        let mut buf = BandBuffer::default();
        buf.allocate(2, 8);

        let mut left = [1.0, 2.0, 3.0];
        let mut right = [4.0, 5.0, 6.0];
        let block: [&mut [f32]; 2] = [&mut left, &mut right];
        buf.copy_from(&block);

        assert_eq!(buf.len(), 3);
        assert_eq!(buf.channel(0), &[1.0, 2.0, 3.0]);
        assert_eq!(buf.channel(1), &[4.0, 5.0, 6.0]);
        // capacity is untouched
        assert_eq!(buf.capacity(), 8);
    }

    #[test]
    fn copy_from_band_copies_valid_frames() {
        let mut a = BandBuffer::default();
        let mut b = BandBuffer::default();
        a.allocate(1, 4);
        b.allocate(1, 4);

        let mut samples = [0.5, -0.5];
        let block: [&mut [f32]; 1] = [&mut samples];
        a.copy_from(&block);
        b.copy_from_band(&a);

        assert_eq!(b.len(), 2);
        assert_eq!(b.channel(0), &[0.5, -0.5]);
    }

    #[test]
    #[should_panic]
    fn oversized_block_panics() {
        let mut buf = BandBuffer::default();
        buf.allocate(1, 2);

        let mut samples = [0.0; 3];
        let block: [&mut [f32]; 1] = [&mut samples];
        buf.copy_from(&block);
    }
}
