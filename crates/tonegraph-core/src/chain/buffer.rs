//! Per-node stereo block storage used by the renderer.

/// Two equally sized channel buffers.
#[derive(Debug, Clone, Default)]
pub(crate) struct StereoBuffer {
    pub(crate) left: Vec<f32>,
    pub(crate) right: Vec<f32>,
}

impl StereoBuffer {
    pub(crate) fn new(block_size: usize) -> Self {
        Self {
            left: vec![0.0; block_size],
            right: vec![0.0; block_size],
        }
    }

    /// Resizes both channels and zeroes them.
    pub(crate) fn resize(&mut self, block_size: usize) {
        self.left.clear();
        self.left.resize(block_size, 0.0);
        self.right.clear();
        self.right.resize(block_size, 0.0);
    }

    /// Zeroes the first `len` samples of each channel.
    pub(crate) fn clear(&mut self, len: usize) {
        self.left[..len].fill(0.0);
        self.right[..len].fill(0.0);
    }

    /// Overwrites the head of each channel with the given slices.
    pub(crate) fn copy_from(&mut self, left: &[f32], right: &[f32]) {
        self.left[..left.len()].copy_from_slice(left);
        self.right[..right.len()].copy_from_slice(right);
    }

    /// Adds the first `len` samples of `other` into this buffer.
    pub(crate) fn accumulate(&mut self, other: &StereoBuffer, len: usize) {
        for (dst, src) in self.left[..len].iter_mut().zip(&other.left[..len]) {
            *dst += *src;
        }
        for (dst, src) in self.right[..len].iter_mut().zip(&other.right[..len]) {
            *dst += *src;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulate_sums_prefix_only() {
        let mut a = StereoBuffer::new(4);
        let mut b = StereoBuffer::new(4);
        b.copy_from(&[1.0; 4], &[2.0; 4]);
        a.accumulate(&b, 2);
        a.accumulate(&b, 2);
        assert_eq!(a.left, [2.0, 2.0, 0.0, 0.0]);
        assert_eq!(a.right, [4.0, 4.0, 0.0, 0.0]);
        a.clear(1);
        assert_eq!(a.left, [0.0, 2.0, 0.0, 0.0]);
    }

    #[test]
    fn resize_zeroes() {
        let mut a = StereoBuffer::new(2);
        a.copy_from(&[1.0, 1.0], &[1.0, 1.0]);
        a.resize(3);
        assert_eq!(a.left, [0.0; 3]);
    }
}
