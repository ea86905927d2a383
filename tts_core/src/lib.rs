//! Core text-to-speech pipeline.
//!
//! Arbitrary-length text is segmented into model-sized chunks, each chunk
//! is rendered by the external neural model behind [`SegmentSynthesizer`],
//! and the per-chunk waveforms are stitched back into one continuous track
//! with cross-fades at the seams. Finished tracks are either returned
//! directly or parked in the in-memory [`JobStore`] for the two-step
//! generate-then-download pattern.

mod assemble;
mod backend;
mod error;
mod segment;
mod store;
mod voice;
pub mod wav;

use std::sync::Arc;

use tracing::debug;

pub use assemble::{assemble, AssembledAudio, AudioFormat};
pub use backend::{PiperSynthesizer, SegmentSynthesizer, SynthesizedSegment};
pub use error::TtsError;
pub use segment::{clean_text, segment, TextChunk};
pub use store::{JobStore, JobStorePolicy, JobTicket};
pub use voice::{Area, Emotion, Gender, Group, VoiceParameters, VoiceSelection};

/// Pipeline tunables. Defaults mirror the production model configuration:
/// 135-character chunks, a 0.1 s cross-fade, a 1.0 s output floor.
#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    pub max_chars: usize,
    pub cross_fade_duration: f32,
    pub min_target_duration: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { max_chars: 135, cross_fade_duration: 0.1, min_target_duration: 1.0 }
    }
}

/// The synthesis pipeline facade the request-handling layer talks to.
///
/// Requests share no mutable state besides the job store: voice defaults
/// and tunables are read-only after construction, and every request gets
/// its own resolved, immutable [`VoiceParameters`].
pub struct TtsEngine {
    backend: Arc<dyn SegmentSynthesizer>,
    defaults: VoiceParameters,
    config: EngineConfig,
    jobs: JobStore,
}

impl TtsEngine {
    pub fn new(
        backend: Arc<dyn SegmentSynthesizer>,
        defaults: VoiceParameters,
        config: EngineConfig,
        policy: JobStorePolicy,
    ) -> Self {
        Self { backend, defaults, config, jobs: JobStore::new(policy) }
    }

    /// Normalize and segment the input text, and resolve the effective
    /// voice parameters for the request. Resolution happens once here; the
    /// result is reused unchanged for every chunk.
    pub fn segment_and_resolve(
        &self,
        text: &str,
        selection: &VoiceSelection,
    ) -> Result<(Vec<TextChunk>, VoiceParameters), TtsError> {
        let cleaned = clean_text(text);
        let chunks = segment(&cleaned, self.config.max_chars)?;
        let voice = VoiceParameters::resolve(selection, &self.defaults)?;
        Ok((chunks, voice))
    }

    /// Render every chunk and assemble the results into one track.
    ///
    /// Chunks are synthesized on parallel worker threads; results are
    /// joined in spawn order, so the assembler always sees segments in
    /// original chunk order regardless of completion order. The first
    /// failure aborts the whole job: partial audio with a missing section
    /// is worse than no audio.
    pub fn synthesize_all(
        &self,
        chunks: &[TextChunk],
        voice: &VoiceParameters,
    ) -> Result<AssembledAudio, TtsError> {
        let segments = self.fan_out(chunks, voice)?;
        debug!(segments = segments.len(), "assembling synthesized segments");
        assemble(&segments, self.config.cross_fade_duration, self.config.min_target_duration)
    }

    /// Full pipeline: text in, assembled track out.
    pub fn synthesize(
        &self,
        text: &str,
        selection: &VoiceSelection,
    ) -> Result<AssembledAudio, TtsError> {
        let (chunks, voice) = self.segment_and_resolve(text, selection)?;
        self.synthesize_all(&chunks, &voice)
    }

    /// Park assembled audio for later download and return its ticket.
    pub fn register_job(&self, audio: AssembledAudio) -> JobTicket {
        self.jobs.create(audio)
    }

    /// Look up a previously registered job.
    pub fn fetch_job(&self, job_id: &str) -> Result<AssembledAudio, TtsError> {
        self.jobs.fetch(job_id)
    }

    pub fn evict_job(&self, job_id: &str) -> bool {
        self.jobs.evict(job_id)
    }

    pub fn evict_expired_jobs(&self) -> usize {
        self.jobs.evict_expired()
    }

    pub fn job_count(&self) -> usize {
        self.jobs.len()
    }

    fn fan_out(
        &self,
        chunks: &[TextChunk],
        voice: &VoiceParameters,
    ) -> Result<Vec<SynthesizedSegment>, TtsError> {
        if chunks.len() <= 1 {
            return chunks.iter().map(|c| self.backend.synthesize(c, voice)).collect();
        }

        let backend = &self.backend;
        let results: Vec<Result<SynthesizedSegment, TtsError>> = std::thread::scope(|scope| {
            let handles: Vec<_> = chunks
                .iter()
                .map(|chunk| scope.spawn(move || backend.synthesize(chunk, voice)))
                .collect();
            handles
                .into_iter()
                .enumerate()
                .map(|(i, handle)| {
                    handle.join().unwrap_or_else(|_| {
                        Err(TtsError::SynthesisBackend {
                            chunk_index: i,
                            message: "synthesis worker panicked".to_string(),
                        })
                    })
                })
                .collect()
        });
        results.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Stamps output samples with the chunk index and records every voice
    /// it was called with. With `stagger` set, earlier chunks finish last
    /// to exercise the join-order guarantee.
    struct MockBackend {
        sample_rate: u32,
        samples_per_chunk: usize,
        seen_voices: Mutex<Vec<VoiceParameters>>,
        fail_on: Option<usize>,
        stagger: bool,
    }

    impl MockBackend {
        fn new(sample_rate: u32, samples_per_chunk: usize) -> Self {
            Self {
                sample_rate,
                samples_per_chunk,
                seen_voices: Mutex::new(Vec::new()),
                fail_on: None,
                stagger: false,
            }
        }
    }

    impl SegmentSynthesizer for MockBackend {
        fn synthesize(
            &self,
            chunk: &TextChunk,
            voice: &VoiceParameters,
        ) -> Result<SynthesizedSegment, TtsError> {
            if self.stagger {
                std::thread::sleep(Duration::from_millis(20 - 5 * chunk.index.min(3) as u64));
            }
            if self.fail_on == Some(chunk.index) {
                return Err(TtsError::SynthesisBackend {
                    chunk_index: chunk.index,
                    message: "mock failure".to_string(),
                });
            }
            self.seen_voices.lock().unwrap().push(*voice);
            let level = chunk.index as f32 / 10.0;
            Ok(SynthesizedSegment::new(
                chunk.index,
                vec![level; self.samples_per_chunk],
                self.sample_rate,
            ))
        }
    }

    fn chunk(index: usize, content: &str) -> TextChunk {
        TextChunk { index, content: content.to_string(), estimated_chars: content.len() }
    }

    fn engine_with(backend: MockBackend, config: EngineConfig) -> TtsEngine {
        TtsEngine::new(
            Arc::new(backend),
            VoiceParameters::default(),
            config,
            JobStorePolicy::default(),
        )
    }

    #[test]
    fn test_fan_out_preserves_chunk_order() {
        let mut backend = MockBackend::new(16_000, 100);
        backend.stagger = true;
        let config =
            EngineConfig { max_chars: 135, cross_fade_duration: 0.0, min_target_duration: 0.0 };
        let engine = engine_with(backend, config);

        let chunks = vec![chunk(0, "one"), chunk(1, "two"), chunk(2, "three"), chunk(3, "four")];
        let audio = engine.synthesize_all(&chunks, &VoiceParameters::default()).unwrap();

        // With zero fade the output is plain concatenation; index-stamped
        // levels must appear in chunk order even though completion order
        // was reversed.
        for i in 0..4 {
            assert_eq!(audio.samples[i * 100], i as f32 / 10.0);
        }
    }

    #[test]
    fn test_backend_failure_aborts_whole_job() {
        let mut backend = MockBackend::new(16_000, 100);
        backend.fail_on = Some(1);
        let engine = engine_with(backend, EngineConfig::default());

        let chunks = vec![chunk(0, "one"), chunk(1, "two"), chunk(2, "three")];
        match engine.synthesize_all(&chunks, &VoiceParameters::default()) {
            Err(TtsError::SynthesisBackend { chunk_index, .. }) => assert_eq!(chunk_index, 1),
            other => panic!("expected SynthesisBackend, got {other:?}"),
        }
    }

    #[test]
    fn test_one_resolution_reused_for_every_chunk() {
        let backend = Arc::new(MockBackend::new(16_000, 100));
        let engine = TtsEngine::new(
            backend.clone(),
            VoiceParameters { gender: Some(Gender::Female), ..Default::default() },
            EngineConfig { max_chars: 20, ..Default::default() },
            JobStorePolicy::default(),
        );

        let selection = VoiceSelection { area: Some("northern".into()), ..Default::default() };
        let (chunks, voice) = engine
            .segment_and_resolve("One two three four five six seven eight nine.", &selection)
            .unwrap();
        assert!(chunks.len() > 1);
        assert_eq!(voice.gender, Some(Gender::Female));
        assert_eq!(voice.area, Some(Area::Northern));

        engine.synthesize_all(&chunks, &voice).unwrap();
        let seen = backend.seen_voices.lock().unwrap();
        assert_eq!(seen.len(), chunks.len());
        assert!(seen.iter().all(|v| *v == voice));
    }

    #[test]
    fn test_full_pipeline_meets_duration_floor() {
        // One short chunk of 0.3 s must be padded to the 1.0 s floor.
        let backend = MockBackend::new(24_000, 7_200);
        let engine = engine_with(backend, EngineConfig::default());

        let audio = engine.synthesize("Hello world.", &VoiceSelection::default()).unwrap();
        assert!((audio.duration_seconds - 1.0).abs() < 1e-4);
        assert_eq!(audio.sample_rate, 24_000);
    }

    #[test]
    fn test_register_and_fetch_job_round_trip() {
        let backend = MockBackend::new(24_000, 24_000);
        let engine = engine_with(backend, EngineConfig::default());

        let audio = engine.synthesize("Hello world.", &VoiceSelection::default()).unwrap();
        let ticket = engine.register_job(audio.clone());
        assert!(ticket.size_bytes > 44);

        let fetched = engine.fetch_job(&ticket.job_id).unwrap();
        assert_eq!(fetched, audio);

        assert!(engine.evict_job(&ticket.job_id));
        assert!(matches!(engine.fetch_job(&ticket.job_id), Err(TtsError::NotFound(_))));
    }

    #[test]
    fn test_invalid_parameter_surfaces_before_synthesis() {
        let backend = MockBackend::new(24_000, 100);
        let engine = engine_with(backend, EngineConfig::default());

        let selection = VoiceSelection { gender: Some("robot".into()), ..Default::default() };
        match engine.synthesize("Hello world.", &selection) {
            Err(TtsError::InvalidParameter { field, .. }) => assert_eq!(field, "gender"),
            other => panic!("expected InvalidParameter, got {other:?}"),
        }
    }
}
