//! WAV reading and writing as separate left/right channels.

use hound::{SampleFormat, WavReader, WavWriter};
use std::path::Path;

/// Channel count, rate and depth of a WAV file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavSpec {
    /// 1 = mono, 2 = stereo. Files with more channels are read as stereo.
    pub channels: u16,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Bit depth per sample. 32 is written as float, anything else as PCM.
    pub bits_per_sample: u16,
}

impl From<WavSpec> for hound::WavSpec {
    fn from(spec: WavSpec) -> Self {
        hound::WavSpec {
            channels: spec.channels,
            sample_rate: spec.sample_rate,
            bits_per_sample: spec.bits_per_sample,
            sample_format: if spec.bits_per_sample == 32 {
                SampleFormat::Float
            } else {
                SampleFormat::Int
            },
        }
    }
}

/// Two equally long channels.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Stereo {
    /// Left channel.
    pub left: Vec<f32>,
    /// Right channel.
    pub right: Vec<f32>,
}

impl Stereo {
    /// Number of frames.
    pub fn len(&self) -> usize {
        self.left.len()
    }

    /// Whether there are no frames.
    pub fn is_empty(&self) -> bool {
        self.left.is_empty()
    }
}

/// Reads a WAV file. Mono is duplicated to both channels; channels past the
/// second are ignored. `spec.channels` keeps the file's own count.
pub fn read_wav_stereo(path: impl AsRef<Path>) -> hound::Result<(Stereo, WavSpec)> {
    let reader = WavReader::open(path)?;
    let hound_spec = reader.spec();
    let spec = WavSpec {
        channels: hound_spec.channels,
        sample_rate: hound_spec.sample_rate,
        bits_per_sample: hound_spec.bits_per_sample,
    };

    let interleaved: Vec<f32> = match hound_spec.sample_format {
        SampleFormat::Float => reader.into_samples::<f32>().collect::<Result<_, _>>()?,
        SampleFormat::Int => {
            let max_val = (1i64 << (hound_spec.bits_per_sample - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max_val))
                .collect::<Result<_, _>>()?
        }
    };

    let channels = usize::from(spec.channels.max(1));
    let frames = interleaved.len() / channels;
    let mut stereo = Stereo {
        left: Vec::with_capacity(frames),
        right: Vec::with_capacity(frames),
    };
    for frame in interleaved.chunks_exact(channels) {
        stereo.left.push(frame[0]);
        stereo.right.push(frame.get(1).copied().unwrap_or(frame[0]));
    }
    Ok((stereo, spec))
}

/// Writes `samples` with `spec`. A mono spec writes the left channel only.
pub fn write_wav_stereo(
    path: impl AsRef<Path>,
    samples: &Stereo,
    spec: WavSpec,
) -> hound::Result<()> {
    let spec = WavSpec {
        channels: spec.channels.clamp(1, 2),
        ..spec
    };
    let mut writer = WavWriter::create(path, spec.into())?;
    let stereo = spec.channels == 2;

    if spec.bits_per_sample == 32 {
        for (&l, &r) in samples.left.iter().zip(&samples.right) {
            writer.write_sample(l)?;
            if stereo {
                writer.write_sample(r)?;
            }
        }
    } else {
        let max_val = (1i64 << (spec.bits_per_sample - 1)) as f32;
        let quantize = |s: f32| (s * max_val).clamp(-max_val, max_val - 1.0) as i32;
        for (&l, &r) in samples.left.iter().zip(&samples.right) {
            writer.write_sample(quantize(l))?;
            if stereo {
                writer.write_sample(quantize(r))?;
            }
        }
    }

    writer.finalize()
}
