//! WAV container encoding and decoding
//!
//! The backend decodes plain 16-bit PCM with the canonical 44-byte RIFF
//! header, so that is the only layout produced here. Float samples are
//! scaled asymmetrically on the way in: negative values by 32768 and
//! positive ones by 32767, truncating toward zero, so that the full
//! [-1.0, 1.0] range maps onto the full i16 range.

use std::io::Cursor;

use crate::{Error, Result};

/// Decoded PCM audio together with its stream parameters
#[derive(Debug, Clone)]
pub struct AudioClip {
    /// Interleaved float samples in [-1.0, 1.0]
    pub samples: Vec<f32>,

    /// Samples per second per channel
    pub sample_rate: u32,

    /// Interleaved channel count
    pub channels: u16,
}

/// Scale one float sample to the wire representation
#[allow(clippy::cast_possible_truncation)]
fn sample_to_i16(sample: f32) -> i16 {
    let s = sample.clamp(-1.0, 1.0);
    if s < 0.0 {
        (s * 32768.0) as i16
    } else {
        (s * 32767.0) as i16
    }
}

/// Encode interleaved float PCM into a 16-bit WAV container
///
/// A zero-sample input yields a valid, header-only 44-byte file.
///
/// # Errors
///
/// Returns an error if the container cannot be written, which for an
/// in-memory buffer means a sample count overflow.
pub fn encode(samples: &[f32], sample_rate: u32, channels: u16) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    let mut writer =
        hound::WavWriter::new(&mut cursor, spec).map_err(|e| Error::Audio(e.to_string()))?;
    for &sample in samples {
        writer
            .write_sample(sample_to_i16(sample))
            .map_err(|e| Error::Audio(e.to_string()))?;
    }
    writer
        .finalize()
        .map_err(|e| Error::Audio(e.to_string()))?;

    Ok(cursor.into_inner())
}

/// Decode a 16-bit PCM WAV file back into float samples
///
/// # Errors
///
/// Returns an error for malformed containers and for sample formats
/// other than 16-bit integer PCM.
pub fn decode(bytes: &[u8]) -> Result<AudioClip> {
    let mut reader =
        hound::WavReader::new(Cursor::new(bytes)).map_err(|e| Error::Audio(e.to_string()))?;
    let spec = reader.spec();

    if spec.sample_format != hound::SampleFormat::Int || spec.bits_per_sample != 16 {
        return Err(Error::Audio(format!(
            "unsupported wav format: {} bits per sample",
            spec.bits_per_sample
        )));
    }

    let samples = reader
        .samples::<i16>()
        .map(|s| s.map(|v| f32::from(v) / 32768.0))
        .collect::<std::result::Result<Vec<f32>, hound::Error>>()
        .map_err(|e| Error::Audio(e.to_string()))?;

    Ok(AudioClip {
        samples,
        sample_rate: spec.sample_rate,
        channels: spec.channels,
    })
}
