// Configuration loaded from the environment at startup.

use std::time::Duration;

use tts_core::{EngineConfig, JobStorePolicy};

#[derive(Clone)]
pub struct ServerConfig {
    pub port: u16,
    /// Request-body text ceiling, in characters.
    pub max_text_length: usize,
    /// Per-chunk character budget for the segmenter.
    pub max_chunk_chars: usize,
    pub cross_fade_secs: f32,
    pub min_target_secs: f32,
    pub job_ttl_secs: u64,
    pub max_cached_jobs: usize,
    pub rate_limit_per_minute: u32,
    pub request_timeout_secs: u64,
    pub cors_allowed_origins: Option<Vec<String>>,
    /// Path to the voice map JSON.
    pub voice_map: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8085,
            max_text_length: 500,
            max_chunk_chars: 135,
            cross_fade_secs: 0.1,
            min_target_secs: 1.0,
            job_ttl_secs: 4800,
            max_cached_jobs: 256,
            rate_limit_per_minute: 60,
            request_timeout_secs: 60,
            cors_allowed_origins: None,
            voice_map: "models/map.json".to_string(),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let cors_allowed_origins = std::env::var("CORS_ALLOWED_ORIGINS")
            .ok()
            .map(|origins| origins.split(',').map(|s| s.trim().to_string()).collect());

        Self {
            port: env_parse("PORT", defaults.port),
            max_text_length: env_parse("MAX_TEXT_LENGTH", defaults.max_text_length),
            max_chunk_chars: env_parse("MAX_CHUNK_CHARS", defaults.max_chunk_chars),
            cross_fade_secs: env_parse("CROSS_FADE_SECS", defaults.cross_fade_secs),
            min_target_secs: env_parse("MIN_TARGET_SECS", defaults.min_target_secs),
            job_ttl_secs: env_parse("JOB_TTL_SECS", defaults.job_ttl_secs),
            max_cached_jobs: env_parse("MAX_CACHED_JOBS", defaults.max_cached_jobs),
            rate_limit_per_minute: env_parse(
                "RATE_LIMIT_PER_MINUTE",
                defaults.rate_limit_per_minute,
            ),
            request_timeout_secs: env_parse("REQUEST_TIMEOUT_SECS", defaults.request_timeout_secs),
            cors_allowed_origins,
            voice_map: std::env::var("VOICE_MAP").unwrap_or(defaults.voice_map),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            max_chars: self.max_chunk_chars,
            cross_fade_duration: self.cross_fade_secs,
            min_target_duration: self.min_target_secs,
        }
    }

    pub fn job_policy(&self) -> JobStorePolicy {
        JobStorePolicy {
            ttl: Duration::from_secs(self.job_ttl_secs),
            max_jobs: self.max_cached_jobs,
        }
    }
}
