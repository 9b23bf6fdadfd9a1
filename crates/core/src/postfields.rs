//! `ensure_post_fields` (SPEC_FULL §4.F step 5, §4.G step 1): derive a
//! missing title/description from a post's original text. Idempotent —
//! posts that already carry both fields pass through unchanged — so it is
//! safe to call both at the end of auto-moderation and again just before
//! digest formatting.
//!
//! Grounded on `auto_moderator.py::ensure_post_fields` /
//! `utils/formatters.py::ensure_post_fields`: first line (or first 7 words
//! of it) becomes the title; the remainder of the text (or its second line)
//! truncated to 200 chars becomes the description; empty input falls back
//! to the original's Cyrillic sentinel strings.

const DESCRIPTION_MAX_CHARS: usize = 200;

/// Sentinel title used when no text is available to derive one from.
pub const SENTINEL_TITLE: &str = "Без заголовка";
/// Sentinel description used when no text is available to derive one from.
pub const SENTINEL_DESCRIPTION: &str = "Описание отсутствует";

/// Fill `title`/`description` from `text` if either is empty. Returns the
/// (possibly unchanged) pair.
pub fn ensure_post_fields(text: &str, title: &str, description: &str) -> (String, String) {
    let title = if title.trim().is_empty() {
        derive_title(text)
    } else {
        title.to_string()
    };
    let description = if description.trim().is_empty() {
        derive_description(text)
    } else {
        description.to_string()
    };
    (title, description)
}

fn derive_title(text: &str) -> String {
    if text.trim().is_empty() {
        return SENTINEL_TITLE.to_string();
    }
    let first_line = text.split('\n').next().unwrap_or("").trim();
    let words: Vec<&str> = first_line.split_whitespace().collect();
    if words.len() > 7 {
        words[..7].join(" ")
    } else if !first_line.is_empty() {
        first_line.to_string()
    } else {
        SENTINEL_TITLE.to_string()
    }
}

fn derive_description(text: &str) -> String {
    if text.trim().is_empty() {
        return SENTINEL_DESCRIPTION.to_string();
    }
    let mut lines = text.splitn(2, '\n');
    let _first = lines.next();
    if let Some(rest) = lines.next() {
        let rest = rest.trim();
        if !rest.is_empty() {
            return truncate_chars(rest, DESCRIPTION_MAX_CHARS);
        }
    }
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() > 7 {
        truncate_chars(&words[7..].join(" "), DESCRIPTION_MAX_CHARS)
    } else {
        truncate_chars(text, DESCRIPTION_MAX_CHARS)
    }
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        text.chars().take(max_chars).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fills_title_from_first_line() {
        let (title, _) = ensure_post_fields("Breaking news today\nmore details here", "", "d");
        assert_eq!(title, "Breaking news today");
    }

    #[test]
    fn truncates_title_to_seven_words() {
        let (title, _) =
            ensure_post_fields("one two three four five six seven eight nine", "", "d");
        assert_eq!(title, "one two three four five six seven");
    }

    #[test]
    fn fills_description_from_second_line() {
        let (_, description) = ensure_post_fields("Title line\nDescription line here", "t", "");
        assert_eq!(description, "Description line here");
    }

    #[test]
    fn sentinel_strings_on_empty_text() {
        let (title, description) = ensure_post_fields("", "", "");
        assert_eq!(title, SENTINEL_TITLE);
        assert_eq!(description, SENTINEL_DESCRIPTION);
    }

    #[test]
    fn leaves_existing_fields_untouched() {
        let (title, description) = ensure_post_fields("whatever text", "My Title", "My Desc");
        assert_eq!(title, "My Title");
        assert_eq!(description, "My Desc");
    }

    #[test]
    fn idempotent() {
        let (t1, d1) = ensure_post_fields("a single line with no second line", "", "");
        let (t2, d2) = ensure_post_fields("a single line with no second line", &t1, &d1);
        assert_eq!(t1, t2);
        assert_eq!(d1, d2);
    }
}
