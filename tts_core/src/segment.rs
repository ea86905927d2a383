//! Text segmentation for synthesis.
//!
//! Unbounded input text is split into model-sized chunks without ever
//! breaking a word. Splitting prefers sentence boundaries, then commas,
//! then greedy word packing; a post-pass merges chunks too short to
//! synthesize cleanly into a neighbour.

use tracing::{debug, warn};

use crate::error::TtsError;

/// One contiguous text segment intended for a single backend call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    /// Ordinal position in the request, equal to input order.
    pub index: usize,
    /// Non-empty chunk text. Never splits a word.
    pub content: String,
    /// Length estimate for synthesis budgeting: character count plus a
    /// weight of 3 per pause punctuation mark.
    pub estimated_chars: usize,
}

impl TextChunk {
    fn new(index: usize, content: String) -> Self {
        let estimated_chars = content.chars().count()
            + 3 * content.chars().filter(|c| matches!(c, '.' | ',' | '!' | '?')).count();
        Self { index, content, estimated_chars }
    }
}

/// Characters the synthesis model can render, besides ASCII alphanumerics.
const VIETNAMESE_CHARS: &str =
    "àáảãạăằắẳẵặâầấẩẫậèéẻẽẹêềếểễệđìíỉĩịòóỏõọôồốổỗộơờớởỡợùúủũụưừứửữựỳỵỷỹý";
const PUNCTUATION_CHARS: &str = " .,!?'@$%&/:;()";

fn is_readable(c: char) -> bool {
    c.is_ascii_alphanumeric()
        || PUNCTUATION_CHARS.contains(c)
        || VIETNAMESE_CHARS.contains(c)
        || c.to_lowercase().any(|l| VIETNAMESE_CHARS.contains(l))
}

/// Normalize raw text into something the model renders cleanly: strip
/// unreadable characters, turn `;:()` into commas, collapse repeated
/// punctuation and whitespace, and close the text with terminal
/// punctuation. Newline-separated paragraphs each get a terminal `.` so
/// the segmenter treats them as sentence boundaries.
pub fn clean_text(text: &str) -> String {
    let mut text = if text.contains('\n') {
        let mut paragraphs: Vec<String> = Vec::new();
        for line in text.split('\n') {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if line.ends_with('.') {
                paragraphs.push(line.to_string());
            } else {
                paragraphs.push(format!("{line}."));
            }
        }
        paragraphs.join(" ")
    } else {
        text.to_string()
    };

    text = text
        .chars()
        .map(|c| if is_readable(c) { c } else { ' ' })
        .map(|c| if matches!(c, ';' | ':' | '(' | ')') { ',' } else { c })
        .collect();

    // Collapse runs of '.', ',' and whitespace.
    let mut out = String::with_capacity(text.len());
    let mut prev: Option<char> = None;
    for c in text.chars() {
        let normalized = if c.is_whitespace() { ' ' } else { c };
        if matches!(normalized, '.' | ',' | ' ') && prev == Some(normalized) {
            continue;
        }
        out.push(normalized);
        prev = Some(normalized);
    }

    let mut out = out.trim().to_string();
    if !out.is_empty() && !out.ends_with(['.', '?', '!', ',']) {
        out.push('.');
    }
    out
}

/// Split `text` into an ordered sequence of chunks, each at most
/// `max_chars` characters except when a single word alone exceeds the
/// budget (that word becomes its own oversized chunk).
///
/// Pure and deterministic: the same `(text, max_chars)` always yields the
/// same chunk sequence. Joining the chunk contents with single spaces
/// reproduces the whitespace-normalized input.
pub fn segment(text: &str, max_chars: usize) -> Result<Vec<TextChunk>, TtsError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(TtsError::InvalidInput("text is empty".to_string()));
    }

    let mut pieces: Vec<String> = Vec::new();
    for sentence in split_retaining(trimmed, &['.', '!', '?']) {
        if char_len(&sentence) <= max_chars {
            pieces.push(sentence);
            continue;
        }
        for part in split_retaining(&sentence, &[',']) {
            if char_len(&part) <= max_chars {
                pieces.push(part);
            } else {
                pack_words(&part, max_chars, &mut pieces);
            }
        }
    }

    let merged = merge_short(pieces, max_chars);
    debug!(
        chunks = merged.len(),
        lengths = ?merged.iter().map(|p| char_len(p)).collect::<Vec<_>>(),
        max_chars,
        "segmented text"
    );

    Ok(merged
        .into_iter()
        .enumerate()
        .map(|(index, content)| TextChunk::new(index, content))
        .collect())
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Split at each terminal character followed by whitespace (or end of
/// input), keeping the terminal with the preceding unit. Splitting only
/// ever happens at whitespace, so no characters other than separators are
/// dropped.
fn split_retaining(text: &str, terminals: &[char]) -> Vec<String> {
    let mut units = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        current.push(c);
        let at_boundary = terminals.contains(&c)
            && chars.peek().map_or(true, |next| next.is_whitespace());
        if at_boundary {
            let unit = current.trim();
            if !unit.is_empty() {
                units.push(unit.to_string());
            }
            current.clear();
        }
    }
    let unit = current.trim();
    if !unit.is_empty() {
        units.push(unit.to_string());
    }
    units
}

/// Greedily pack whitespace-separated words into chunks of at most
/// `max_chars`. A single word longer than the budget is emitted as its own
/// oversized chunk rather than split mid-word.
fn pack_words(text: &str, max_chars: usize, out: &mut Vec<String>) {
    let mut current = String::new();
    for word in text.split_whitespace() {
        if char_len(word) > max_chars {
            if !current.is_empty() {
                out.push(std::mem::take(&mut current));
            }
            warn!(
                word_chars = char_len(word),
                max_chars, "word exceeds chunk budget, emitting oversized chunk"
            );
            out.push(word.to_string());
            continue;
        }
        if current.is_empty() {
            current.push_str(word);
        } else if char_len(&current) + 1 + char_len(word) <= max_chars {
            current.push(' ');
            current.push_str(word);
        } else {
            out.push(std::mem::take(&mut current));
            current.push_str(word);
        }
    }
    if !current.is_empty() {
        out.push(current);
    }
}

/// Merge chunks shorter than a quarter of the budget into a neighbour,
/// provided the merge stays within `max_chars` plus a small tolerance.
/// Very short segments render with audible artifacts, so a slightly
/// over-budget merged chunk beats a standalone fragment.
fn merge_short(pieces: Vec<String>, max_chars: usize) -> Vec<String> {
    if pieces.len() < 2 {
        return pieces;
    }
    let min_len = max_chars / 4;
    let limit = max_chars + max_chars / 10;

    let mut out: Vec<String> = Vec::new();
    let mut i = 0;
    while i < pieces.len() {
        let current = &pieces[i];
        if char_len(current) < min_len {
            if i + 1 < pieces.len()
                && char_len(current) + 1 + char_len(&pieces[i + 1]) <= limit
            {
                out.push(format!("{current} {}", pieces[i + 1]));
                i += 2;
                continue;
            }
            if let Some(prev) = out.last_mut() {
                if char_len(prev) + 1 + char_len(current) <= limit {
                    prev.push(' ');
                    prev.push_str(current);
                    i += 1;
                    continue;
                }
            }
        }
        out.push(current.clone());
        i += 1;
    }
    out
}
