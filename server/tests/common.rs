//! Common utilities for integration tests

use std::sync::Arc;

use axum::Router;

use server::config::ServerConfig;
use server::routes::{build_router, AppState};
use tts_core::{
    EngineConfig, JobStorePolicy, SegmentSynthesizer, SynthesizedSegment, TextChunk, TtsEngine,
    TtsError, VoiceParameters,
};

pub const SAMPLE_RATE: u32 = 24_000;

/// Deterministic stand-in for the neural model: half a second of flat
/// signal per chunk.
pub struct MockBackend;

impl SegmentSynthesizer for MockBackend {
    fn synthesize(
        &self,
        chunk: &TextChunk,
        _voice: &VoiceParameters,
    ) -> Result<SynthesizedSegment, TtsError> {
        Ok(SynthesizedSegment::new(chunk.index, vec![0.5; SAMPLE_RATE as usize / 2], SAMPLE_RATE))
    }
}

/// The real router over a mock synthesis backend.
pub fn create_test_app() -> Router {
    let config = ServerConfig::default();
    let engine = Arc::new(TtsEngine::new(
        Arc::new(MockBackend),
        VoiceParameters::default(),
        EngineConfig::default(),
        JobStorePolicy::default(),
    ));
    build_router(AppState::new(engine, config))
}
