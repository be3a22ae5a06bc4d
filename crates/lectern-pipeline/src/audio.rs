//! Audio byte helpers: concatenation and duration measurement.
//!
//! MP3 and raw PCM streams concatenate byte-wise. WAV carries a header per
//! file, so chunks are decoded and re-muxed into a single file with `hound`.

use std::io::Cursor;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use lectern_core::AudioFormat;

use crate::error::{PipelineError, PipelineResult};

/// Join the audio of one region, in order. Empty parts are skipped.
pub fn concat(format: AudioFormat, parts: &[Vec<u8>]) -> PipelineResult<Vec<u8>> {
    let parts: Vec<&[u8]> = parts
        .iter()
        .map(Vec::as_slice)
        .filter(|p| !p.is_empty())
        .collect();

    match format {
        AudioFormat::Mp3 | AudioFormat::Pcm => Ok(parts.concat()),
        AudioFormat::Wav => concat_wav(&parts),
    }
}

fn concat_wav(parts: &[&[u8]]) -> PipelineResult<Vec<u8>> {
    let readers = parts
        .iter()
        .map(|p| WavReader::new(Cursor::new(*p)))
        .collect::<Result<Vec<_>, _>>()?;

    let Some(spec) = readers.first().map(WavReader::spec) else {
        return Ok(Vec::new());
    };
    if let Some(other) = readers.iter().map(WavReader::spec).find(|s| *s != spec) {
        return Err(PipelineError::IncompatibleAudio(format!(
            "{} vs {}",
            describe(spec),
            describe(other)
        )));
    }

    let mut out = Vec::new();
    let mut writer = WavWriter::new(Cursor::new(&mut out), spec)?;
    for reader in readers {
        match spec.sample_format {
            SampleFormat::Float => {
                for sample in reader.into_samples::<f32>() {
                    writer.write_sample(sample?)?;
                }
            }
            SampleFormat::Int => {
                for sample in reader.into_samples::<i32>() {
                    writer.write_sample(sample?)?;
                }
            }
        }
    }
    writer.finalize()?;
    Ok(out)
}

fn describe(spec: WavSpec) -> String {
    format!(
        "{} Hz/{} ch/{}-bit",
        spec.sample_rate, spec.channels, spec.bits_per_sample
    )
}

/// Measure playback length of encoded audio in milliseconds.
///
/// `sample_rate` is only consulted for headerless PCM (16-bit mono).
/// Returns `0` when the bytes cannot be understood.
pub fn measure_duration_ms(bytes: &[u8], format: AudioFormat, sample_rate: u32) -> u64 {
    match format {
        AudioFormat::Pcm => {
            if sample_rate == 0 {
                return 0;
            }
            (bytes.len() as u64 / 2) * 1_000 / u64::from(sample_rate)
        }
        AudioFormat::Wav => WavReader::new(Cursor::new(bytes)).map_or(0, |reader| {
            let rate = u64::from(reader.spec().sample_rate);
            if rate == 0 {
                0
            } else {
                u64::from(reader.duration()) * 1_000 / rate
            }
        }),
        AudioFormat::Mp3 => mp3_duration_us(bytes) / 1_000,
    }
}

// ── MP3 frame walking ──────────────────────────────────────────────

const MPEG1_L3_BITRATES: [u32; 15] = [
    0, 32, 40, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320,
];
const MPEG2_L3_BITRATES: [u32; 15] = [0, 8, 16, 24, 32, 40, 48, 56, 64, 80, 96, 112, 128, 144, 160];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FrameHeader {
    sample_rate: u32,
    samples: u32,
    length: usize,
}

/// Decode a Layer III frame header. Free-format and reserved values are rejected.
fn parse_frame_header(h: [u8; 4]) -> Option<FrameHeader> {
    if h[0] != 0xFF || h[1] & 0xE0 != 0xE0 {
        return None;
    }
    let version = (h[1] >> 3) & 0b11;
    let layer = (h[1] >> 1) & 0b11;
    if layer != 0b01 || version == 0b01 {
        return None;
    }

    let bitrate_index = usize::from(h[2] >> 4);
    let rate_index = usize::from((h[2] >> 2) & 0b11);
    if bitrate_index == 0 || bitrate_index == 15 || rate_index == 3 {
        return None;
    }
    let padding = u32::from((h[2] >> 1) & 1);

    let (bitrates, rates, samples, factor): (&[u32; 15], [u32; 3], u32, u32) = match version {
        0b11 => (&MPEG1_L3_BITRATES, [44_100, 48_000, 32_000], 1152, 144),
        0b10 => (&MPEG2_L3_BITRATES, [22_050, 24_000, 16_000], 576, 72),
        _ => (&MPEG2_L3_BITRATES, [11_025, 12_000, 8_000], 576, 72),
    };
    let sample_rate = rates[rate_index];
    let bitrate = bitrates[bitrate_index] * 1_000;
    let length = (factor * bitrate / sample_rate + padding) as usize;

    Some(FrameHeader {
        sample_rate,
        samples,
        length,
    })
}

/// Size of a leading ID3v2 tag, if present.
fn id3v2_len(bytes: &[u8]) -> usize {
    if bytes.len() < 10 || &bytes[..3] != b"ID3" {
        return 0;
    }
    let size = bytes[6..10]
        .iter()
        .fold(0usize, |acc, b| (acc << 7) | usize::from(b & 0x7F));
    let footer = if bytes[5] & 0x10 != 0 { 10 } else { 0 };
    10 + size + footer
}

/// Sum of frame durations in microseconds; garbage between frames is skipped.
fn mp3_duration_us(bytes: &[u8]) -> u64 {
    let mut pos = id3v2_len(bytes);
    let mut total = 0u64;
    while pos + 4 <= bytes.len() {
        let header = [bytes[pos], bytes[pos + 1], bytes[pos + 2], bytes[pos + 3]];
        match parse_frame_header(header) {
            Some(frame) if pos + frame.length <= bytes.len() => {
                total += u64::from(frame.samples) * 1_000_000 / u64::from(frame.sample_rate);
                pos += frame.length;
            }
            Some(_) => break,
            None => pos += 1,
        }
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mp3_frames(count: usize) -> Vec<u8> {
        // MPEG-1 Layer III, 128 kbps, 44.1 kHz, no padding: 417-byte frames.
        let mut frame = vec![0u8; 417];
        frame[..4].copy_from_slice(&[0xFF, 0xFB, 0x90, 0x00]);
        frame.repeat(count)
    }

    fn wav(samples: &[i16], sample_rate: u32) -> Vec<u8> {
        let spec = WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut out = Vec::new();
        let mut writer = WavWriter::new(Cursor::new(&mut out), spec).unwrap();
        for &s in samples {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();
        out
    }

    #[test]
    fn test_frame_header() {
        let h = parse_frame_header([0xFF, 0xFB, 0x90, 0x00]).unwrap();
        assert_eq!(h.sample_rate, 44_100);
        assert_eq!(h.samples, 1152);
        assert_eq!(h.length, 417);

        let padded = parse_frame_header([0xFF, 0xFB, 0x92, 0x00]).unwrap();
        assert_eq!(padded.length, 418);

        assert!(parse_frame_header([0xFF, 0xFB, 0xF0, 0x00]).is_none());
        assert!(parse_frame_header([0x00, 0xFB, 0x90, 0x00]).is_none());
    }

    #[test]
    fn test_mp3_duration() {
        assert_eq!(measure_duration_ms(&mp3_frames(10), AudioFormat::Mp3, 0), 261);
    }

    #[test]
    fn test_mp3_duration_skips_id3_and_garbage() {
        let mut bytes = b"ID3\x04\x00\x00\x00\x00\x00\x05hello".to_vec();
        bytes.extend_from_slice(b"junk");
        bytes.extend(mp3_frames(10));
        assert_eq!(measure_duration_ms(&bytes, AudioFormat::Mp3, 0), 261);
    }

    #[test]
    fn test_unknown_bytes_measure_zero() {
        assert_eq!(measure_duration_ms(b"not audio", AudioFormat::Mp3, 0), 0);
        assert_eq!(measure_duration_ms(b"not audio", AudioFormat::Wav, 0), 0);
    }

    #[test]
    fn test_pcm_duration() {
        let one_second = vec![0u8; 48_000];
        assert_eq!(measure_duration_ms(&one_second, AudioFormat::Pcm, 24_000), 1_000);
        assert_eq!(measure_duration_ms(&one_second, AudioFormat::Pcm, 0), 0);
    }

    #[test]
    fn test_concat_mp3_is_bytewise() {
        let parts = vec![vec![1, 2], Vec::new(), vec![3]];
        assert_eq!(concat(AudioFormat::Mp3, &parts).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_concat_wav_remuxes() {
        let a = wav(&[1; 8_000], 8_000);
        let b = wav(&[2; 4_000], 8_000);
        let joined = concat(AudioFormat::Wav, &[a, b]).unwrap();

        let reader = WavReader::new(Cursor::new(joined.as_slice())).unwrap();
        assert_eq!(reader.duration(), 12_000);
        assert_eq!(measure_duration_ms(&joined, AudioFormat::Wav, 0), 1_500);
    }

    #[test]
    fn test_concat_wav_rejects_mixed_rates() {
        let parts = vec![wav(&[0; 10], 8_000), wav(&[0; 10], 16_000)];
        assert!(matches!(
            concat(AudioFormat::Wav, &parts),
            Err(PipelineError::IncompatibleAudio(_))
        ));
    }

    #[test]
    fn test_concat_nothing() {
        assert!(concat(AudioFormat::Wav, &[]).unwrap().is_empty());
    }
}
