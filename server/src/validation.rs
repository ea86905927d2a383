use crate::error::ApiError;

/// Validate the text of a synthesis request against the configured ceiling.
///
/// Length is counted in characters, not bytes. Voice parameter values are
/// validated later by the resolver, which knows the allowed enums.
pub fn validate_synthesize_request(text: &str, max_text_length: usize) -> Result<(), ApiError> {
    if text.trim().is_empty() {
        return Err(ApiError::InvalidInput("Text cannot be empty".to_string()));
    }
    let chars = text.chars().count();
    if chars > max_text_length {
        return Err(ApiError::InvalidInput(format!(
            "Text too long ({} characters, max {})",
            chars, max_text_length
        )));
    }
    Ok(())
}
