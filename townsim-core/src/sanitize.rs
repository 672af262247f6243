//! Cleaning of generated dialogue into a single, bounded utterance.
//!
//! Pipeline:
//! 1. Strip wrapping quotes and leading `Speaker:` / `Listener:` echoes
//!    (case-insensitive) until none remain
//! 2. Keep only the first line
//! 3. Strip wrapping quotes again
//! 4. Hard-cap the length in characters
//! 5. If the cap cut the line, drop the partial sentence after the last
//!    complete one; otherwise terminate the line with a period
//! 6. Substitute [`DEFAULT_LINE`] if nothing meaningful is left

/// Filler used when cleaning leaves nothing to say.
pub const DEFAULT_LINE: &str = "Hi there!";

const TERMINATORS: [char; 3] = ['.', '!', '?'];

/// Clean raw model output spoken by `speaker` to `listener`.
///
/// The result is never empty, contains no newline and is at most
/// `max_chars` characters long (for `max_chars >= DEFAULT_LINE.len()`).
#[must_use]
pub fn clean_response(raw: &str, speaker: &str, listener: &str, max_chars: usize) -> String {
    let mut text = raw;
    loop {
        let before = text.len();
        text = text.trim().trim_matches('"').trim();
        text = strip_name_prefix(text, speaker);
        text = strip_name_prefix(text, listener);
        if text.len() == before {
            break;
        }
    }

    let text = text.split(['\n', '\r']).next().unwrap_or_default();
    let text = text.trim().trim_matches('"').trim();

    let was_cut = text.chars().count() > max_chars;
    let truncated: String = text.chars().take(max_chars).collect();
    let truncated = truncated.trim_end();

    let cleaned = finish_sentence(truncated, max_chars, was_cut);
    if cleaned.chars().any(char::is_alphanumeric) {
        cleaned
    } else {
        DEFAULT_LINE.to_string()
    }
}

/// Remove `name:` from the front of `text`, if present.
fn strip_name_prefix<'a>(text: &'a str, name: &str) -> &'a str {
    let name = name.trim();
    if name.is_empty() {
        return text;
    }
    match text.get(..name.len()) {
        Some(head) if head.eq_ignore_ascii_case(name) => {
            let rest = text[name.len()..].trim_start();
            match rest.strip_prefix(':') {
                Some(after) => after.trim_start(),
                None => text,
            }
        }
        _ => text,
    }
}

/// Close an unterminated line with a period.
///
/// Only when the length cap cut the line (`was_cut`) is the fragment after
/// the last complete sentence dropped; an uncut line keeps its decimals and
/// abbreviations.
fn finish_sentence(text: &str, max_chars: usize, was_cut: bool) -> String {
    if text.is_empty() || text.ends_with(TERMINATORS) {
        return text.to_string();
    }

    if let Some(idx) = text.rfind(TERMINATORS).filter(|_| was_cut) {
        // `idx` is a byte offset of an ASCII terminator.
        let complete = text[..=idx].trim_end();
        if complete.chars().any(char::is_alphanumeric) {
            return complete.to_string();
        }
    }

    let mut fragment: String = text.to_string();
    if fragment.chars().count() >= max_chars {
        fragment.pop();
        let trimmed_len = fragment.trim_end().len();
        fragment.truncate(trimmed_len);
    }
    fragment.push('.');
    fragment
}
