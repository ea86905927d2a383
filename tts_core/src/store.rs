//! In-memory job store for the two-step delivery pattern.
//!
//! A job is a server-held handle to a previously synthesized, ready-to-
//! download track. Jobs live for the process lifetime only; eviction is an
//! explicit, injected policy (TTL plus a capacity bound) rather than an
//! implicit never-cleaned map.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use uuid::Uuid;

use crate::assemble::AssembledAudio;
use crate::error::TtsError;
use crate::wav;

/// Eviction policy the store owner configures.
#[derive(Debug, Clone, Copy)]
pub struct JobStorePolicy {
    /// Jobs older than this are treated as evicted.
    pub ttl: Duration,
    /// Hard cap on stored jobs; `create` evicts the oldest entry first
    /// when at capacity.
    pub max_jobs: usize,
}

impl Default for JobStorePolicy {
    fn default() -> Self {
        Self { ttl: Duration::from_secs(4800), max_jobs: 256 }
    }
}

/// Summary metadata returned to the caller at registration time.
#[derive(Debug, Clone, PartialEq)]
pub struct JobTicket {
    pub job_id: String,
    pub duration_seconds: f32,
    pub sample_rate: u32,
    pub size_bytes: usize,
}

struct SynthesisJob {
    audio: AssembledAudio,
    created_at: Instant,
}

/// Process-wide map from job id to owned audio. Safe for concurrent
/// create/fetch/evict from multiple request tasks; a fetch racing an
/// eviction sees either the whole job or `NotFound`, never torn data.
pub struct JobStore {
    jobs: DashMap<String, SynthesisJob>,
    policy: JobStorePolicy,
}

impl JobStore {
    pub fn new(policy: JobStorePolicy) -> Self {
        Self { jobs: DashMap::new(), policy }
    }

    /// Register assembled audio as a ready job and return its ticket.
    /// Synthesis has already completed by this point, so the job is
    /// fetchable the moment this returns.
    pub fn create(&self, audio: AssembledAudio) -> JobTicket {
        if self.jobs.len() >= self.policy.max_jobs {
            self.evict_oldest();
        }

        let job_id = Uuid::new_v4().simple().to_string();
        let ticket = JobTicket {
            job_id: job_id.clone(),
            duration_seconds: audio.duration_seconds,
            sample_rate: audio.sample_rate,
            size_bytes: wav::encoded_len(audio.samples.len()),
        };
        self.jobs.insert(job_id, SynthesisJob { audio, created_at: Instant::now() });
        ticket
    }

    /// Fetch a job's audio. Idempotent: a job can be fetched any number of
    /// times until evicted, and always returns audio byte-identical to
    /// what was stored. An entry past its TTL is removed and reported as
    /// `NotFound`.
    pub fn fetch(&self, job_id: &str) -> Result<AssembledAudio, TtsError> {
        let expired = match self.jobs.get(job_id) {
            Some(job) => {
                if job.created_at.elapsed() <= self.policy.ttl {
                    return Ok(job.audio.clone());
                }
                true
            }
            None => false,
        };
        if expired {
            // Guard dropped above; safe to remove.
            self.jobs.remove(job_id);
        }
        Err(TtsError::NotFound(job_id.to_string()))
    }

    /// Remove a job and release its memory. Returns whether it existed.
    pub fn evict(&self, job_id: &str) -> bool {
        self.jobs.remove(job_id).is_some()
    }

    /// Sweep all entries past the TTL. Returns how many were removed.
    pub fn evict_expired(&self) -> usize {
        let before = self.jobs.len();
        let ttl = self.policy.ttl;
        self.jobs.retain(|_, job| job.created_at.elapsed() <= ttl);
        before.saturating_sub(self.jobs.len())
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    fn evict_oldest(&self) {
        let mut oldest_key: Option<String> = None;
        let mut oldest_time = Instant::now();
        for entry in self.jobs.iter() {
            if entry.created_at < oldest_time {
                oldest_time = entry.created_at;
                oldest_key = Some(entry.key().clone());
            }
        }
        if let Some(key) = oldest_key {
            self.jobs.remove(&key);
        }
    }
}
