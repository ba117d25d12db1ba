// Task input validation rules

use std::fmt;

/// Maximum title length, in characters, accepted at input time
pub const MAX_TITLE_CHARS: usize = 50;

/// Maximum description length, in characters, accepted at input time
pub const MAX_DESCRIPTION_CHARS: usize = 200;

/// Per-field validation failure shown next to a form input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldError {
    Required,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldError::Required => write!(f, "This field is required"),
        }
    }
}

/// Keep at most `max` characters (Unicode scalar values, never splitting one)
pub fn truncate_chars(value: &str, max: usize) -> String {
    match value.char_indices().nth(max) {
        Some((cut, _)) => value[..cut].to_string(),
        None => value.to_string(),
    }
}

/// Trim `value` and reject it if nothing is left
pub fn require_non_blank(value: &str) -> Result<&str, FieldError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(FieldError::Required)
    } else {
        Ok(trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_keeps_short_values() {
        assert_eq!(truncate_chars("short", MAX_TITLE_CHARS), "short");
        assert_eq!(truncate_chars("", MAX_TITLE_CHARS), "");
    }

    #[test]
    fn test_truncate_counts_characters_not_bytes() {
        let value = "é".repeat(60);
        let truncated = truncate_chars(&value, MAX_TITLE_CHARS);
        assert_eq!(truncated.chars().count(), MAX_TITLE_CHARS);
        assert_eq!(truncated.len(), MAX_TITLE_CHARS * 2);
    }

    #[test]
    fn test_truncate_at_exact_limit() {
        let value = "a".repeat(MAX_DESCRIPTION_CHARS);
        assert_eq!(truncate_chars(&value, MAX_DESCRIPTION_CHARS), value);
    }

    #[test]
    fn test_require_non_blank() {
        assert_eq!(require_non_blank("  Buy milk \n"), Ok("Buy milk"));
        assert_eq!(require_non_blank(""), Err(FieldError::Required));
        assert_eq!(require_non_blank(" \t\n "), Err(FieldError::Required));
    }
}
