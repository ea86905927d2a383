//! Segment synthesizer boundary and the piper-backed implementation.
//!
//! The neural model is a black box behind [`SegmentSynthesizer`]: one call
//! per chunk in, one mono waveform out. Sample-rate agreement across the
//! chunks of a job is asserted by the assembler, not here.

use std::{
    collections::BTreeMap,
    fs,
    path::Path,
    sync::{Arc, RwLock},
    time::Instant,
};

use anyhow::Context;
use dashmap::DashMap;
use piper_rs::synth::{PiperSpeechStreamParallel, PiperSpeechSynthesizer};
use serde::Deserialize;
use tracing::debug;

use crate::error::TtsError;
use crate::segment::TextChunk;
use crate::voice::VoiceParameters;

/// One chunk's rendered waveform. Owned by the assembler until merged,
/// then discarded.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesizedSegment {
    pub chunk_index: usize,
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub duration_seconds: f32,
}

impl SynthesizedSegment {
    pub fn new(chunk_index: usize, samples: Vec<f32>, sample_rate: u32) -> Self {
        let duration_seconds = samples.len() as f32 / sample_rate as f32;
        Self { chunk_index, samples, sample_rate, duration_seconds }
    }
}

/// Boundary to the external neural model. Implementations must be safe to
/// call from multiple worker threads at once; determinism is not part of
/// the contract.
pub trait SegmentSynthesizer: Send + Sync {
    fn synthesize(
        &self,
        chunk: &TextChunk,
        voice: &VoiceParameters,
    ) -> Result<SynthesizedSegment, TtsError>;
}

/// Voice sample metadata keyed by `gender.area.group.emotion`.
#[derive(Debug, Deserialize)]
struct VoiceMapFile {
    default_voice: String,
    voices: BTreeMap<String, String>,
}

struct CachedSynth {
    synth: Arc<RwLock<PiperSpeechSynthesizer>>,
    sample_rate: u32,
    last_accessed: Instant,
}

/// Piper-backed segment synthesizer. Voice parameters select a model
/// sample via the voice map; loaded synthesizers are cached with
/// least-recently-used eviction so repeated requests don't reload models.
pub struct PiperSynthesizer {
    default_voice: String,
    // voice key ("gender.area.group.emotion") -> model config path.
    // BTreeMap so sample selection scans in a stable order.
    voices: BTreeMap<String, String>,
    cache: DashMap<String, CachedSynth>,
    max_cache_size: usize,
}

impl PiperSynthesizer {
    /// Load the voice map from a JSON file:
    /// `{ "default_voice": "<key>", "voices": { "<key>": "<config path>", ... } }`.
    pub fn from_mapfile<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to load {}", path.as_ref().display()))?;
        let map: VoiceMapFile =
            serde_json::from_str(&text).with_context(|| "voice map is not valid JSON")?;
        if !map.voices.contains_key(&map.default_voice) {
            anyhow::bail!("default_voice '{}' is not in the voice map", map.default_voice);
        }
        Ok(Self {
            default_voice: map.default_voice,
            voices: map.voices,
            cache: DashMap::new(),
            max_cache_size: 4,
        })
    }

    /// List known voice keys.
    pub fn voice_keys(&self) -> Vec<String> {
        self.voices.keys().cloned().collect()
    }

    /// Pick the first sample whose key satisfies every specified field;
    /// unspecified fields match anything. Falls back to the default voice
    /// when nothing matches.
    fn config_for(&self, voice: &VoiceParameters) -> &str {
        for (key, config) in &self.voices {
            let mut parts = key.split('.');
            let (g, a, gr, e) = (parts.next(), parts.next(), parts.next(), parts.next());
            let matches = voice.gender.map_or(true, |v| g == Some(v.as_str()))
                && voice.area.map_or(true, |v| a == Some(v.as_str()))
                && voice.group.map_or(true, |v| gr == Some(v.as_str()))
                && voice.emotion.map_or(true, |v| e == Some(v.as_str()));
            if matches {
                return config;
            }
        }
        debug!(?voice, "no sample matches the requested voice, using default");
        &self.voices[&self.default_voice]
    }

    /// Read the sample rate from a piper model config JSON.
    fn read_sample_rate(cfg_path: &str) -> anyhow::Result<u32> {
        let text = fs::read_to_string(cfg_path)
            .with_context(|| format!("Failed to read config file: {cfg_path}"))?;
        let json: serde_json::Value =
            serde_json::from_str(&text).with_context(|| "Config file is not valid JSON")?;
        let sample_rate = json
            .get("audio")
            .and_then(|a| a.get("sample_rate"))
            .and_then(|sr| sr.as_u64())
            .ok_or_else(|| anyhow::anyhow!("Missing or invalid 'audio.sample_rate' in config"))?;
        Ok(sample_rate as u32)
    }

    /// Get or load a cached synthesizer for a model config path.
    fn get_or_create_synth(
        &self,
        cfg_path: &str,
    ) -> anyhow::Result<(Arc<RwLock<PiperSpeechSynthesizer>>, u32)> {
        if let Some(mut cached) = self.cache.get_mut(cfg_path) {
            cached.last_accessed = Instant::now();
            return Ok((cached.synth.clone(), cached.sample_rate));
        }

        let sample_rate = Self::read_sample_rate(cfg_path)?;
        let model = piper_rs::from_config_path(Path::new(cfg_path))
            .map_err(|e| anyhow::anyhow!("piper load error: {e}"))?;
        let synth = Arc::new(RwLock::new(PiperSpeechSynthesizer::new(model)?));

        // At capacity: drop the least recently used model before inserting.
        if self.cache.len() >= self.max_cache_size {
            let mut oldest_key: Option<String> = None;
            let mut oldest_time = Instant::now();
            for entry in self.cache.iter() {
                if entry.last_accessed < oldest_time {
                    oldest_time = entry.last_accessed;
                    oldest_key = Some(entry.key().clone());
                }
            }
            if let Some(key) = oldest_key {
                self.cache.remove(&key);
            }
        }

        self.cache.insert(
            cfg_path.to_string(),
            CachedSynth { synth: synth.clone(), sample_rate, last_accessed: Instant::now() },
        );
        Ok((synth, sample_rate))
    }

    fn synthesize_inner(
        &self,
        chunk: &TextChunk,
        voice: &VoiceParameters,
    ) -> anyhow::Result<(Vec<f32>, u32)> {
        let cfg_path = self.config_for(voice).to_string();
        let (synth_arc, sample_rate) = self.get_or_create_synth(&cfg_path)?;
        let synth = synth_arc
            .read()
            .map_err(|_| anyhow::anyhow!("synthesizer lock poisoned by a previous panic"))?;

        let iter: PiperSpeechStreamParallel = synth
            .synthesize_parallel(chunk.content.clone(), None)
            .map_err(|e| anyhow::anyhow!("piper synth error: {e}"))?;

        let mut samples: Vec<f32> = Vec::new();
        for part in iter {
            samples.extend(part.map_err(|e| anyhow::anyhow!("chunk error: {e}"))?.into_vec());
        }
        Ok((samples, sample_rate))
    }
}

impl SegmentSynthesizer for PiperSynthesizer {
    fn synthesize(
        &self,
        chunk: &TextChunk,
        voice: &VoiceParameters,
    ) -> Result<SynthesizedSegment, TtsError> {
        let (samples, sample_rate) =
            self.synthesize_inner(chunk, voice).map_err(|e| TtsError::SynthesisBackend {
                chunk_index: chunk.index,
                message: e.to_string(),
            })?;
        Ok(SynthesizedSegment::new(chunk.index, samples, sample_rate))
    }
}
