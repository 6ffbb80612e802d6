//! WAV decoding, normalization and artifact writing.

use crate::defaults::SAMPLE_RATE;
use crate::error::{Result, VoiceLoopError};
use std::io::Read;
use std::path::Path;

/// Synthesized or decoded audio in floating point, normalized to [-1.0, 1.0].
#[derive(Debug, Clone, PartialEq)]
pub struct Waveform {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl Waveform {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Duration in seconds.
    pub fn duration_secs(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / self.sample_rate as f32
    }
}

/// Decode any PCM/float WAV into mono 16-bit samples at the given rate.
pub fn decode_mono<R: Read>(reader: R, target_rate: u32) -> Result<Vec<i16>> {
    let mut wav_reader = hound::WavReader::new(reader).map_err(|e| VoiceLoopError::AudioFormat {
        message: format!("Failed to parse WAV file: {}", e),
    })?;

    let spec = wav_reader.spec();
    let raw_samples = decode_samples(&mut wav_reader)?;
    let mono_samples = downmix(raw_samples, spec.channels);

    Ok(resample(&mono_samples, spec.sample_rate, target_rate))
}

/// Read a WAV file as mono 16kHz samples, the format Whisper expects.
pub fn read_mono_16k(path: &Path) -> Result<Vec<i16>> {
    let file = std::fs::File::open(path)?;
    decode_mono(std::io::BufReader::new(file), SAMPLE_RATE)
}

/// Duration of a WAV file in seconds, read from its header.
pub fn duration_secs(path: &Path) -> Result<f32> {
    let reader = hound::WavReader::open(path).map_err(|e| VoiceLoopError::AudioFormat {
        message: format!("Failed to open {}: {}", path.display(), e),
    })?;
    let spec = reader.spec();
    if spec.sample_rate == 0 {
        return Err(VoiceLoopError::AudioFormat {
            message: format!("{} declares a zero sample rate", path.display()),
        });
    }
    Ok(reader.duration() as f32 / spec.sample_rate as f32)
}

/// Write mono 16-bit PCM samples.
pub fn write_pcm16(path: &Path, samples: &[i16], sample_rate: u32) -> Result<()> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).map_err(|e| wav_write_error(path, e))?;
    for &sample in samples {
        writer
            .write_sample(sample)
            .map_err(|e| wav_write_error(path, e))?;
    }
    writer.finalize().map_err(|e| wav_write_error(path, e))
}

/// Write a waveform as a 16-bit PCM mono WAV file.
pub fn write_waveform(path: &Path, waveform: &Waveform) -> Result<()> {
    let samples: Vec<i16> = waveform.samples.iter().copied().map(f32_to_i16).collect();
    write_pcm16(path, &samples, waveform.sample_rate)
}

/// Read a WAV file into a floating point waveform at its native rate.
pub fn read_waveform(path: &Path) -> Result<Waveform> {
    let mut reader = hound::WavReader::open(path).map_err(|e| VoiceLoopError::AudioFormat {
        message: format!("Failed to open {}: {}", path.display(), e),
    })?;
    let spec = reader.spec();
    let mono = downmix(decode_samples(&mut reader)?, spec.channels);
    Ok(Waveform::new(
        mono.into_iter().map(i16_to_f32).collect(),
        spec.sample_rate,
    ))
}

fn wav_write_error(path: &Path, e: hound::Error) -> VoiceLoopError {
    VoiceLoopError::Artifact {
        message: format!("Failed to write {}: {}", path.display(), e),
    }
}

fn decode_samples<R: Read>(reader: &mut hound::WavReader<R>) -> Result<Vec<i16>> {
    let spec = reader.spec();
    let decoded: std::result::Result<Vec<i16>, hound::Error> = match spec.sample_format {
        hound::SampleFormat::Float => reader.samples::<f32>().map(|s| s.map(f32_to_i16)).collect(),
        hound::SampleFormat::Int if spec.bits_per_sample <= 16 => reader.samples::<i16>().collect(),
        hound::SampleFormat::Int => {
            let shift = spec.bits_per_sample - 16;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| (v >> shift) as i16))
                .collect()
        }
    };

    decoded.map_err(|e| VoiceLoopError::AudioFormat {
        message: format!("Failed to read WAV samples: {}", e),
    })
}

/// Average interleaved channels into one.
fn downmix(samples: Vec<i16>, channels: u16) -> Vec<i16> {
    if channels <= 1 {
        return samples;
    }
    samples
        .chunks_exact(channels as usize)
        .map(|frame| {
            let sum: i32 = frame.iter().map(|&s| s as i32).sum();
            (sum / channels as i32) as i16
        })
        .collect()
}

/// Simple linear interpolation resampling.
fn resample(samples: &[i16], from_rate: u32, to_rate: u32) -> Vec<i16> {
    if from_rate == to_rate || samples.is_empty() {
        return samples.to_vec();
    }

    let ratio = from_rate as f64 / to_rate as f64;
    let output_len = (samples.len() as f64 / ratio).ceil() as usize;

    (0..output_len)
        .map(|i| {
            let source_pos = i as f64 * ratio;
            let source_idx = (source_pos.floor() as usize).min(samples.len() - 1);
            let fraction = source_pos - source_idx as f64;

            if source_idx + 1 >= samples.len() {
                samples[source_idx]
            } else {
                let left = samples[source_idx] as f64;
                let right = samples[source_idx + 1] as f64;
                (left + (right - left) * fraction) as i16
            }
        })
        .collect()
}

fn f32_to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16
}

fn i16_to_f32(sample: i16) -> f32 {
    sample as f32 / 32768.0
}
