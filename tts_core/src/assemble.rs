//! Waveform assembly: cross-faded concatenation of per-chunk segments.
//!
//! Naive concatenation puts an audible click at every chunk boundary, so
//! adjacent segments are overlapped and blended with a linear fade. The
//! result is one seamless mono track, padded with trailing silence up to a
//! configured floor because some players misbehave on very short clips.

use crate::backend::SynthesizedSegment;
use crate::error::TtsError;

/// Output container format. The pipeline is single-channel 16-bit PCM WAV
/// end to end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    Wav,
}

impl AudioFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            AudioFormat::Wav => "wav",
        }
    }
}

/// The assembled output track.
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub duration_seconds: f32,
    pub format: AudioFormat,
}

/// Stitch ordered segments into one track.
///
/// At each internal boundary the trailing `cross_fade_duration` seconds of
/// the left segment overlap the leading samples of the right segment with
/// a linear blend; the fade is clamped to the shorter adjoining segment.
/// Output shorter than `min_target_duration` is padded with trailing
/// silence, never truncated or stretched.
pub fn assemble(
    segments: &[SynthesizedSegment],
    cross_fade_duration: f32,
    min_target_duration: f32,
) -> Result<AssembledAudio, TtsError> {
    let first = segments
        .first()
        .ok_or_else(|| TtsError::InvalidInput("no segments to assemble".to_string()))?;
    let sample_rate = first.sample_rate;
    for seg in &segments[1..] {
        if seg.sample_rate != sample_rate {
            return Err(TtsError::FormatMismatch { expected: sample_rate, found: seg.sample_rate });
        }
    }

    let fade_samples = (cross_fade_duration * sample_rate as f32) as usize;
    let mut out = first.samples.clone();
    // Clamp each fade to the adjoining segments only: a boundary fade must
    // never reach back past a short previous segment into earlier audio.
    let mut prev_len = first.samples.len();
    for seg in &segments[1..] {
        let fade = fade_samples.min(prev_len).min(seg.samples.len());
        prev_len = seg.samples.len();
        if fade == 0 {
            out.extend_from_slice(&seg.samples);
            continue;
        }
        let start = out.len() - fade;
        let denom = (fade - 1).max(1) as f32;
        for i in 0..fade {
            let t = i as f32 / denom;
            out[start + i] = out[start + i] * (1.0 - t) + seg.samples[i] * t;
        }
        out.extend_from_slice(&seg.samples[fade..]);
    }

    let floor = (min_target_duration * sample_rate as f32).ceil() as usize;
    if out.len() < floor {
        out.resize(floor, 0.0);
    }

    let duration_seconds = out.len() as f32 / sample_rate as f32;
    Ok(AssembledAudio { samples: out, sample_rate, duration_seconds, format: AudioFormat::Wav })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: u32 = 16_000;

    fn seg(index: usize, secs: f32, level: f32) -> SynthesizedSegment {
        let n = (secs * SR as f32) as usize;
        SynthesizedSegment::new(index, vec![level; n], SR)
    }

    #[test]
    fn test_empty_segment_list_rejected() {
        assert!(matches!(assemble(&[], 0.1, 1.0), Err(TtsError::InvalidInput(_))));
    }

    #[test]
    fn test_overlap_subtracted_from_duration() {
        // 1.0s + 1.5s with a 0.1s fade overlaps once: 2.4s total.
        let segments = [seg(0, 1.0, 0.5), seg(1, 1.5, 0.5)];
        let audio = assemble(&segments, 0.1, 0.0).unwrap();
        assert_eq!(audio.samples.len(), (2.4 * SR as f32) as usize);
        assert!((audio.duration_seconds - 2.4).abs() < 1e-4);
    }

    #[test]
    fn test_short_output_padded_to_floor() {
        // 0.3s padded with 0.7s of trailing silence.
        let segments = [seg(0, 0.3, 0.5)];
        let audio = assemble(&segments, 0.1, 1.0).unwrap();
        assert_eq!(audio.samples.len(), SR as usize);
        assert!((audio.duration_seconds - 1.0).abs() < 1e-4);
        // The tail really is silence.
        let voiced = (0.3 * SR as f32) as usize;
        assert!(audio.samples[voiced..].iter().all(|&s| s == 0.0));
        assert_eq!(audio.samples[0], 0.5);
    }

    #[test]
    fn test_fade_region_blends_monotonically() {
        let segments = [seg(0, 1.0, 1.0), seg(1, 1.0, 0.0)];
        let audio = assemble(&segments, 0.1, 0.0).unwrap();
        let fade = (0.1 * SR as f32) as usize;
        let start = SR as usize - fade;
        // Edges of the faded region match the unfaded segment levels.
        assert!((audio.samples[start] - 1.0).abs() < 1e-3);
        assert!(audio.samples[start + fade - 1].abs() < 1e-3);
        // The blend decreases monotonically from left level to right level.
        for w in audio.samples[start..start + fade].windows(2) {
            assert!(w[1] <= w[0] + 1e-6);
        }
        // No discontinuity where the fade hands over to the right segment.
        assert!(audio.samples[start + fade].abs() < 1e-3);
    }

    #[test]
    fn test_fade_clamped_to_short_segment() {
        // Right segment is 0.05s, shorter than the 0.1s fade window.
        let segments = [seg(0, 1.0, 0.5), seg(1, 0.05, 0.5)];
        let audio = assemble(&segments, 0.1, 0.0).unwrap();
        // The whole right segment is consumed by the clamped fade.
        assert_eq!(audio.samples.len(), SR as usize);
    }

    #[test]
    fn test_short_middle_segment_bounds_both_fades() {
        // A 0.05s segment between two 1.0s ones: both boundary fades clamp
        // to the 0.05s neighbour, and the second fade must not reach back
        // past it into the first segment.
        let segments = [seg(0, 1.0, 1.0), seg(1, 0.05, 0.5), seg(2, 1.0, 0.0)];
        let audio = assemble(&segments, 0.1, 0.0).unwrap();

        // Each boundary subtracts one clamped 0.05s fade: 1.95s total.
        assert_eq!(audio.samples.len(), (1.95 * SR as f32) as usize);
        // Segment 0 outside its own fade window is untouched.
        let first_fade = (0.05 * SR as f32) as usize;
        let untouched = SR as usize - first_fade;
        assert!(audio.samples[..untouched].iter().all(|&s| s == 1.0));
    }

    #[test]
    fn test_zero_fade_is_plain_concatenation() {
        let segments = [seg(0, 0.5, 0.25), seg(1, 0.5, 0.75)];
        let audio = assemble(&segments, 0.0, 0.0).unwrap();
        assert_eq!(audio.samples.len(), SR as usize);
        assert_eq!(audio.samples[0], 0.25);
        assert_eq!(*audio.samples.last().unwrap(), 0.75);
    }

    #[test]
    fn test_sample_rate_mismatch_is_fatal() {
        let a = SynthesizedSegment::new(0, vec![0.0; 1000], 16_000);
        let b = SynthesizedSegment::new(1, vec![0.0; 1000], 24_000);
        match assemble(&[a, b], 0.1, 0.0) {
            Err(TtsError::FormatMismatch { expected, found }) => {
                assert_eq!(expected, 16_000);
                assert_eq!(found, 24_000);
            }
            other => panic!("expected FormatMismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_three_segments_fade_at_every_boundary() {
        let segments = [seg(0, 1.0, 0.5), seg(1, 1.0, 0.5), seg(2, 1.0, 0.5)];
        let audio = assemble(&segments, 0.1, 0.0).unwrap();
        // Two internal boundaries, each subtracting one fade window.
        assert_eq!(audio.samples.len(), (2.8 * SR as f32) as usize);
    }
}
