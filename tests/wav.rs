//! WAV codec properties: canonical header layout, sample scaling, and
//! round-trip fidelity

use salam_face::audio::wav;

mod common;
use common::sine_samples;

fn le16(bytes: &[u8], at: usize) -> u16 {
    u16::from_le_bytes(bytes[at..at + 2].try_into().unwrap())
}

fn le32(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes(bytes[at..at + 4].try_into().unwrap())
}

#[test]
fn header_matches_the_canonical_44_byte_layout() {
    let samples = vec![0.25_f32; 7];
    let bytes = wav::encode(&samples, 22_050, 1).unwrap();
    let data_len = 7 * 2;

    assert_eq!(&bytes[0..4], b"RIFF");
    assert_eq!(le32(&bytes, 4), 36 + data_len);
    assert_eq!(&bytes[8..12], b"WAVE");
    assert_eq!(&bytes[12..16], b"fmt ");
    assert_eq!(le32(&bytes, 16), 16); // fmt chunk size
    assert_eq!(le16(&bytes, 20), 1); // linear PCM
    assert_eq!(le16(&bytes, 22), 1); // channels
    assert_eq!(le32(&bytes, 24), 22_050); // sample rate
    assert_eq!(le32(&bytes, 28), 22_050 * 2); // byte rate
    assert_eq!(le16(&bytes, 32), 2); // block align
    assert_eq!(le16(&bytes, 34), 16); // bits per sample
    assert_eq!(&bytes[36..40], b"data");
    assert_eq!(le32(&bytes, 40), data_len);
    assert_eq!(bytes.len(), 44 + data_len as usize);
}

#[test]
fn stereo_header_scales_byte_rate_and_block_align() {
    let bytes = wav::encode(&[0.0; 8], 16_000, 2).unwrap();

    assert_eq!(le16(&bytes, 22), 2); // channels
    assert_eq!(le32(&bytes, 28), 16_000 * 2 * 2); // byte rate
    assert_eq!(le16(&bytes, 32), 4); // block align
    assert_eq!(le32(&bytes, 40), 16); // data bytes
}

#[test]
fn output_length_is_header_plus_two_bytes_per_sample() {
    for count in [0_usize, 1, 100, 16_000] {
        let samples = vec![0.1_f32; count];
        let bytes = wav::encode(&samples, 16_000, 1).unwrap();
        assert_eq!(bytes.len(), 44 + count * 2, "for {count} samples");
    }
}

#[test]
fn extremes_use_the_full_i16_range() {
    let bytes = wav::encode(&[-1.0, 1.0, 0.0], 16_000, 1).unwrap();
    let data: Vec<i16> = bytes[44..]
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    assert_eq!(data, vec![-32768, 32767, 0]);
}

#[test]
fn out_of_range_samples_are_clamped() {
    let bytes = wav::encode(&[-7.0, 3.5], 16_000, 1).unwrap();
    let data: Vec<i16> = bytes[44..]
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    assert_eq!(data, vec![-32768, 32767]);
}

#[test]
fn zero_samples_encode_to_a_valid_empty_file() {
    let bytes = wav::encode(&[], 16_000, 1).unwrap();
    assert_eq!(bytes.len(), 44);
    assert_eq!(le32(&bytes, 4), 36);
    assert_eq!(le32(&bytes, 40), 0);

    let clip = wav::decode(&bytes).unwrap();
    assert!(clip.samples.is_empty());
}

#[test]
fn sine_round_trips_within_quantization_error() {
    let original = sine_samples(440.0, 0.25, 0.5, 16_000);
    let bytes = wav::encode(&original, 16_000, 1).unwrap();
    let clip = wav::decode(&bytes).unwrap();

    assert_eq!(clip.sample_rate, 16_000);
    assert_eq!(clip.channels, 1);
    assert_eq!(clip.samples.len(), original.len());
    for (a, b) in original.iter().zip(&clip.samples) {
        assert!((a - b).abs() <= 1.5 / 32768.0, "{a} vs {b}");
    }
}

#[test]
fn garbage_bytes_fail_to_decode() {
    assert!(wav::decode(b"definitely not a wav file").is_err());
    assert!(wav::decode(&[]).is_err());
}
