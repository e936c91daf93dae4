//! Polyphase IIR oversampling around numerically sensitive solvers.
//!
//! [`Oversampler`] runs a block through cascaded 2x half-band stages, hands the
//! high-rate buffer to a closure (the wrapped solver), then decimates back in
//! place. Each stage is a Regalia–Mitra half-band filter split into two
//! parallel allpass branches, so the filtering runs at the lower rate of each
//! stage.
//!
//! Whether a node oversamples at all is decided by an [`OversamplingPolicy`]:
//! each circuit model states the session rate below which its solver needs the
//! extra headroom. Above that rate the node calls its solver directly and the
//! oversampler is never touched.
//!
//! # Example
//!
//! ```rust
//! use tonegraph_core::{Oversampler, OversamplingRatio};
//!
//! let mut os = Oversampler::new();
//! os.prepare(OversamplingRatio::X2, 64);
//!
//! let mut block = [0.25f32; 64];
//! os.process(&mut block, |hi_rate| {
//!     assert_eq!(hi_rate.len(), 128);
//!     for s in hi_rate.iter_mut() {
//!         *s = s.clamp(-0.1, 0.1);
//!     }
//! });
//! ```

/// Branch A allpass coefficients (elliptic half-band, ~100 dB design).
const BRANCH_A: [f64; 3] = [
    0.036_681_502_163_648,
    0.248_030_921_580_110,
    0.643_184_620_136_480,
];

/// Branch B allpass coefficients.
const BRANCH_B: [f64; 3] = [
    0.110_377_634_768_680,
    0.420_399_304_190_880,
    0.854_640_112_701_920,
];

/// Oversampling factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum OversamplingRatio {
    /// 2x, one half-band stage.
    #[default]
    X2,
    /// 4x, two stages.
    X4,
    /// 8x, three stages.
    X8,
}

impl OversamplingRatio {
    /// Integer factor.
    pub fn factor(self) -> usize {
        1 << self.stages()
    }

    /// Number of cascaded 2x stages.
    pub fn stages(self) -> usize {
        match self {
            Self::X2 => 1,
            Self::X4 => 2,
            Self::X8 => 3,
        }
    }

    /// Parses a factor (2, 4 or 8).
    pub fn from_factor(factor: usize) -> Option<Self> {
        match factor {
            2 => Some(Self::X2),
            4 => Some(Self::X4),
            8 => Some(Self::X8),
            _ => None,
        }
    }
}

/// When a circuit model needs to oversample.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OversamplingPolicy {
    /// Session rates strictly below this engage the oversampler. 0 disables it.
    pub below_sample_rate: f32,
    /// Ratio used when engaged.
    pub ratio: OversamplingRatio,
}

impl OversamplingPolicy {
    /// Never oversample.
    pub const fn disabled() -> Self {
        Self {
            below_sample_rate: 0.0,
            ratio: OversamplingRatio::X2,
        }
    }

    /// Oversample by `ratio` whenever the session rate is below `threshold`.
    pub const fn below(threshold: f32, ratio: OversamplingRatio) -> Self {
        Self {
            below_sample_rate: threshold,
            ratio,
        }
    }

    /// Whether the oversampler should run at `sample_rate`.
    pub fn engages(&self, sample_rate: f32) -> bool {
        sample_rate < self.below_sample_rate
    }

    /// Rate the solver runs at for a given session rate.
    pub fn solver_rate(&self, sample_rate: f32) -> f32 {
        if self.engages(sample_rate) {
            sample_rate * self.ratio.factor() as f32
        } else {
            sample_rate
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct AllpassBranch {
    coeffs: [f64; 3],
    state: [f64; 3],
}

impl AllpassBranch {
    fn new(coeffs: [f64; 3]) -> Self {
        Self {
            coeffs,
            state: [0.0; 3],
        }
    }

    /// Cascade of first-order sections y = (a + z^-1) / (1 + a z^-1).
    #[inline]
    fn process(&mut self, x: f64) -> f64 {
        let mut y = x;
        for (a, s) in self.coeffs.iter().zip(self.state.iter_mut()) {
            let out = a * y + *s;
            *s = y - a * out;
            y = out;
        }
        y
    }

    fn reset(&mut self) {
        self.state = [0.0; 3];
    }
}

/// One 2x interpolation/decimation stage.
#[derive(Debug, Clone, Copy)]
struct HalfBandStage {
    up_a: AllpassBranch,
    up_b: AllpassBranch,
    down_a: AllpassBranch,
    down_b: AllpassBranch,
    down_delay: f64,
}

impl HalfBandStage {
    fn new() -> Self {
        Self {
            up_a: AllpassBranch::new(BRANCH_A),
            up_b: AllpassBranch::new(BRANCH_B),
            down_a: AllpassBranch::new(BRANCH_A),
            down_b: AllpassBranch::new(BRANCH_B),
            down_delay: 0.0,
        }
    }

    fn upsample(&mut self, input: &[f32], output: &mut [f32]) {
        debug_assert!(output.len() >= input.len() * 2);
        for (x, pair) in input.iter().zip(output.chunks_exact_mut(2)) {
            let x = f64::from(*x);
            pair[0] = self.up_a.process(x) as f32;
            pair[1] = self.up_b.process(x) as f32;
        }
    }

    fn downsample(&mut self, input: &[f32], output: &mut [f32]) {
        debug_assert!(input.len() >= output.len() * 2);
        for (out, pair) in output.iter_mut().zip(input.chunks_exact(2)) {
            let a = self.down_a.process(f64::from(pair[0]));
            let b = self.down_b.process(f64::from(pair[1]));
            *out = ((a + self.down_delay) * 0.5) as f32;
            self.down_delay = b;
        }
    }

    fn reset(&mut self) {
        self.up_a.reset();
        self.up_b.reset();
        self.down_a.reset();
        self.down_b.reset();
        self.down_delay = 0.0;
    }
}

/// Mono up/down sampling pipeline. Use one per channel.
#[derive(Debug, Clone, Default)]
pub struct Oversampler {
    ratio: OversamplingRatio,
    stages: Vec<HalfBandStage>,
    /// `buffers[k]` holds the signal at `2^(k+1)` times the base rate.
    buffers: Vec<Vec<f32>>,
    block_size: usize,
}

impl Oversampler {
    /// Creates an unprepared oversampler. Call [`prepare`](Self::prepare) before use.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates stage filters and buffers for `ratio` and blocks of up to
    /// `block_size` base-rate samples. Clears all filter state.
    pub fn prepare(&mut self, ratio: OversamplingRatio, block_size: usize) {
        self.ratio = ratio;
        self.block_size = block_size;
        let stages = ratio.stages();
        self.stages = vec![HalfBandStage::new(); stages];
        self.buffers = (0..stages)
            .map(|k| vec![0.0; block_size << (k + 1)])
            .collect();
    }

    /// Configured ratio.
    pub fn ratio(&self) -> OversamplingRatio {
        self.ratio
    }

    /// Largest base-rate block accepted by [`process`](Self::process).
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Upsamples `block`, runs `solver` on the high-rate samples, and writes
    /// the decimated result back into `block`.
    ///
    /// Blocks longer than the prepared size are handled in prepared-size
    /// chunks. Does nothing when unprepared.
    pub fn process<F>(&mut self, block: &mut [f32], mut solver: F)
    where
        F: FnMut(&mut [f32]),
    {
        if self.stages.is_empty() || self.block_size == 0 {
            return;
        }
        let chunk_size = self.block_size;
        for chunk in block.chunks_mut(chunk_size) {
            self.process_chunk(chunk, &mut solver);
        }
    }

    fn process_chunk<F>(&mut self, chunk: &mut [f32], solver: &mut F)
    where
        F: FnMut(&mut [f32]),
    {
        let n = chunk.len();
        let last = self.stages.len() - 1;

        self.stages[0].upsample(chunk, &mut self.buffers[0][..n * 2]);
        for k in 1..=last {
            let (lower, upper) = self.buffers.split_at_mut(k);
            let len = n << k;
            self.stages[k].upsample(&lower[k - 1][..len], &mut upper[0][..len * 2]);
        }

        solver(&mut self.buffers[last][..n << (last + 1)]);

        for k in (1..=last).rev() {
            let (lower, upper) = self.buffers.split_at_mut(k);
            let len = n << k;
            self.stages[k].downsample(&upper[0][..len * 2], &mut lower[k - 1][..len]);
        }
        self.stages[0].downsample(&self.buffers[0][..n * 2], chunk);
    }

    /// Clears all filter state, keeping the allocation.
    pub fn reset(&mut self) {
        for stage in &mut self.stages {
            stage.reset();
        }
        for buf in &mut self.buffers {
            buf.fill(0.0);
        }
    }
}
