//! Text sanitization and phone masking.
//!
//! Grounded on the original `utils/sanitization.py`: strip null bytes and
//! control characters (preserving `\n`/`\r`/`\t`), NFKC-normalize, strip
//! zero-width and bidirectional-override characters, collapse whitespace,
//! then truncate to a maximum length. The pipeline is idempotent by
//! construction — every step operates on already-normalized output, so a
//! second pass is a no-op (SPEC_FULL §8 property 1).

use unicode_normalization::UnicodeNormalization;

const DEFAULT_MAX_LENGTH: usize = 100_000;

/// Strip control/null/zero-width/bidi-override characters, NFKC-normalize,
/// collapse whitespace, and truncate to `max_length` bytes (char-boundary safe).
pub fn sanitize(text: &str, max_length: usize) -> String {
    let stripped: String = text
        .chars()
        .filter(|&c| !is_forbidden(c))
        .collect();

    let normalized: String = stripped.nfkc().collect();

    let collapsed = collapse_whitespace(&normalized);
    let trimmed = collapsed.trim();

    truncate_chars(trimmed, max_length)
}

/// Sanitize with the default maximum length (100,000 chars, per the RawMessage invariant).
pub fn sanitize_default(text: &str) -> String {
    sanitize(text, DEFAULT_MAX_LENGTH)
}

fn is_forbidden(c: char) -> bool {
    if c == '\0' {
        return true;
    }
    // Control characters other than the whitespace we want to keep for now
    // (whitespace collapsing happens afterward, so keep \n \r \t here).
    if c.is_control() && c != '\n' && c != '\r' && c != '\t' {
        return true;
    }
    // Zero-width characters: ZWSP, ZWNJ, ZWJ, BOM/ZWNBSP.
    if matches!(c, '\u{200B}'..='\u{200D}' | '\u{FEFF}') {
        return true;
    }
    // Bidirectional override / isolate control characters.
    if matches!(c, '\u{202A}'..='\u{202E}' | '\u{2066}'..='\u{2069}') {
        return true;
    }
    false
}

fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last_was_space = false;
    for c in text.chars() {
        if c.is_whitespace() {
            if !last_was_space {
                out.push(' ');
            }
            last_was_space = true;
        } else {
            out.push(c);
            last_was_space = false;
        }
    }
    out
}

fn truncate_chars(text: &str, max_length: usize) -> String {
    if text.chars().count() <= max_length {
        text.to_string()
    } else {
        text.chars().take(max_length).collect()
    }
}

/// Escape prompt-template-significant characters and re-apply sanitization,
/// so messages embedded in an LLM prompt can't break out of their slot or
/// smuggle control characters through. Curly braces are doubled so they
/// survive `{placeholder}`-style substitution unescaped (SPEC_FULL §4.E).
pub fn sanitize_for_prompt(text: &str, max_length: usize) -> String {
    let clean = sanitize(text, max_length);
    clean.replace('{', "{{").replace('}', "}}")
}

/// Mask a phone number, preserving the first 4 and last 4 characters.
///
/// Per SPEC_FULL §8 property 3: inputs with fewer than 8 characters mask to
/// the literal string `"***"`; longer inputs mask the middle with exactly
/// four asterisks regardless of the gap length.
pub fn mask_phone(phone: &str) -> String {
    let chars: Vec<char> = phone.chars().collect();
    if chars.len() < 8 {
        return "***".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}****{tail}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idempotent() {
        let input = "  hello\u{200B}   world\u{0000}!  ";
        let once = sanitize_default(input);
        let twice = sanitize_default(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn strips_forbidden_characters() {
        let input = "a\u{0000}b\u{200B}c\u{202Ed}e";
        let out = sanitize_default(input);
        assert!(!out.contains('\u{0000}'));
        assert!(!out.contains('\u{200B}'));
        assert!(!out.contains('\u{202E}'));
    }

    #[test]
    fn collapses_whitespace_and_trims() {
        let out = sanitize_default("  a   b\tc\n\nd  ");
        assert_eq!(out, "a b c d");
    }

    #[test]
    fn truncates_to_max_length() {
        let long = "x".repeat(50);
        let out = sanitize(&long, 10);
        assert_eq!(out.chars().count(), 10);
    }

    #[test]
    fn phone_masking_short_input() {
        assert_eq!(mask_phone("12345"), "***");
        assert_eq!(mask_phone("1234567"), "***");
    }

    #[test]
    fn phone_masking_boundary() {
        assert_eq!(mask_phone("12345678"), "1234****5678");
    }

    #[test]
    fn phone_masking_long_input() {
        assert_eq!(mask_phone("+15551234567"), "+155****4567");
    }

    #[test]
    fn prompt_escaping_doubles_braces() {
        let out = sanitize_for_prompt("see {field} now", 1000);
        assert_eq!(out, "see {{field}} now");
    }
}
