use thiserror::Error;

/// Error taxonomy for the synthesis pipeline.
///
/// A multi-chunk job either produces one complete assembled track or fails
/// with one of these; partial audio is never returned.
#[derive(Debug, Error)]
pub enum TtsError {
    /// Caller mistake: empty text, text over the input ceiling, or an
    /// empty segment list handed to the assembler.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An explicit voice parameter value is not a member of its enumeration.
    #[error("invalid {field}: '{value}' is not a recognized value")]
    InvalidParameter { field: &'static str, value: String },

    /// The external model failed on one chunk. The whole job aborts;
    /// retry policy, if any, belongs to the caller.
    #[error("synthesis backend failed on chunk {chunk_index}: {message}")]
    SynthesisBackend { chunk_index: usize, message: String },

    /// Segments of one job disagree on sample rate. Should never occur if
    /// the backend contract holds; fatal for the job.
    #[error("sample rate mismatch: expected {expected} Hz, found {found} Hz")]
    FormatMismatch { expected: u32, found: u32 },

    /// Unknown or evicted job id.
    #[error("job '{0}' not found or has expired")]
    NotFound(String),
}
