use std::io::Cursor;

/// Bytes of a mono 16-bit PCM WAV holding `n_samples` samples.
pub fn encoded_len(n_samples: usize) -> usize {
    44 + n_samples * 2
}

/// Encode PCM f32 samples as a mono 16-bit PCM WAV (RIFF) byte buffer.
pub fn encode_wav(samples: &[f32], sample_rate: u32) -> anyhow::Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::<u8>::with_capacity(encoded_len(samples.len())));
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)
            .map_err(|e| anyhow::anyhow!("wav write err: {e}"))?;
        const I16_MAX_F32: f32 = i16::MAX as f32;
        for &s in samples {
            let v = (s.clamp(-1.0, 1.0) * I16_MAX_F32) as i16;
            writer.write_sample(v).map_err(|e| anyhow::anyhow!("wav sample err: {e}"))?;
        }
        writer.finalize().map_err(|e| anyhow::anyhow!("wav finalize err: {e}"))?;
    }
    Ok(cursor.into_inner())
}
