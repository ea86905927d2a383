use std::{
    sync::atomic::{AtomicU64, Ordering},
    sync::Arc,
    time::Instant,
};

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use tts_core::{wav, Area, AssembledAudio, Emotion, Gender, Group, TtsEngine, VoiceSelection};

use crate::config::ServerConfig;
use crate::error::ApiError;
use crate::validation::validate_synthesize_request;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<TtsEngine>,
    pub request_count: Arc<AtomicU64>,
    pub started_at: Instant,
    pub config: ServerConfig,
}

impl AppState {
    pub fn new(engine: Arc<TtsEngine>, config: ServerConfig) -> Self {
        Self {
            engine,
            request_count: Arc::new(AtomicU64::new(0)),
            started_at: Instant::now(),
            config,
        }
    }
}

/// All routes under `/api/v1`. Middleware is layered on top by the binary;
/// tests drive this router directly.
pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/health", get(health_check))
        .route("/voices", get(list_voices))
        .route("/synthesize", post(synthesize))
        .route("/synthesize/download", post(synthesize_download))
        .route("/synthesize/file", post(synthesize_to_file))
        .route("/download/{job_id}", get(download));

    Router::new().nest("/api/v1", api).with_state(state)
}

#[derive(Deserialize)]
pub struct SynthesizeRequest {
    text: String,
    gender: Option<String>,
    area: Option<String>,
    group: Option<String>,
    emotion: Option<String>,
}

impl SynthesizeRequest {
    fn selection(&self) -> VoiceSelection {
        VoiceSelection {
            gender: self.gender.clone(),
            area: self.area.clone(),
            group: self.group.clone(),
            emotion: self.emotion.clone(),
        }
    }
}

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    uptime_seconds: u64,
    request_count: u64,
    cached_jobs: usize,
}

#[derive(Serialize)]
pub struct VoicesResponse {
    genders: Vec<&'static str>,
    areas: Vec<&'static str>,
    groups: Vec<&'static str>,
    emotions: Vec<&'static str>,
}

#[derive(Serialize)]
pub struct SynthesizeFileResponse {
    job_id: String,
    download_url: String,
    duration_seconds: f32,
    sample_rate: u32,
    format: &'static str,
    file_size_bytes: usize,
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        uptime_seconds: state.started_at.elapsed().as_secs(),
        request_count: state.request_count.load(Ordering::Relaxed),
        cached_jobs: state.engine.job_count(),
    })
}

pub async fn list_voices() -> Json<VoicesResponse> {
    Json(VoicesResponse {
        genders: Gender::ALL.iter().map(|v| v.as_str()).collect(),
        areas: Area::ALL.iter().map(|v| v.as_str()).collect(),
        groups: Group::ALL.iter().map(|v| v.as_str()).collect(),
        emotions: Emotion::ALL.iter().map(|v| v.as_str()).collect(),
    })
}

/// Run the full pipeline for a request. Synthesis is CPU-bound and runs on
/// the blocking pool so the async workers keep serving other requests.
async fn run_synthesis(
    state: &AppState,
    req: &SynthesizeRequest,
) -> Result<AssembledAudio, ApiError> {
    state.request_count.fetch_add(1, Ordering::Relaxed);
    validate_synthesize_request(&req.text, state.config.max_text_length)?;

    let engine = state.engine.clone();
    let text = req.text.clone();
    let selection = req.selection();

    let started = Instant::now();
    let audio = tokio::task::spawn_blocking(move || engine.synthesize(&text, &selection))
        .await
        .map_err(|e| ApiError::InternalError(format!("Synthesis task join error: {e}")))??;

    info!(
        duration_seconds = audio.duration_seconds,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "synthesis complete"
    );
    Ok(audio)
}

/// Encode a finished track for the wire, optionally as a named attachment.
fn wav_response(
    audio: &AssembledAudio,
    attachment_name: Option<&str>,
) -> Result<(HeaderMap, Vec<u8>), ApiError> {
    let bytes = wav::encode_wav(&audio.samples, audio.sample_rate)
        .map_err(|e| ApiError::InternalError(format!("WAV encoding error: {e}")))?;

    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("audio/wav"));
    if let Some(name) = attachment_name {
        let disposition = format!("attachment; filename=\"{name}\"");
        headers.insert(
            header::CONTENT_DISPOSITION,
            HeaderValue::from_str(&disposition)
                .map_err(|e| ApiError::InternalError(format!("Header error: {e}")))?,
        );
    }
    Ok((headers, bytes))
}

/// One-shot synthesis: the WAV bytes come back in the response body.
pub async fn synthesize(
    State(state): State<AppState>,
    Json(req): Json<SynthesizeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let audio = run_synthesis(&state, &req).await?;
    Ok(wav_response(&audio, None)?)
}

/// One-shot synthesis delivered as a file attachment.
pub async fn synthesize_download(
    State(state): State<AppState>,
    Json(req): Json<SynthesizeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let audio = run_synthesis(&state, &req).await?;
    Ok(wav_response(&audio, Some("speech.wav"))?)
}

/// Two-step delivery: synthesize now, park the result as a job, hand back a
/// download URL.
pub async fn synthesize_to_file(
    State(state): State<AppState>,
    Json(req): Json<SynthesizeRequest>,
) -> Result<Json<SynthesizeFileResponse>, ApiError> {
    let audio = run_synthesis(&state, &req).await?;
    let format = audio.format.as_str();
    let ticket = state.engine.register_job(audio);

    Ok(Json(SynthesizeFileResponse {
        download_url: format!("/api/v1/download/{}", ticket.job_id),
        job_id: ticket.job_id,
        duration_seconds: ticket.duration_seconds,
        sample_rate: ticket.sample_rate,
        format,
        file_size_bytes: ticket.size_bytes,
    }))
}

pub async fn download(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let audio = state.engine.fetch_job(&job_id)?;
    let filename = format!("{job_id}.wav");
    Ok(wav_response(&audio, Some(&filename))?)
}
