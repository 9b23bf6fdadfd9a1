//! Digest composition (SPEC_FULL §4.G step 3).
//!
//! Grounded on `utils/formatters.py::format_digest_message`: header, then
//! each post numbered with an emoji-digit prefix (bold title, description,
//! source link), then footer. `NUMBER_EMOJIS` (`utils/constants.py`) is
//! reproduced as digit-by-digit keycap composition rather than a literal
//! 1-15 lookup table, since the keycap sequence (`<digit>\u{FE0F}\u{20E3}`)
//! composes the same way for any digit — the literal table just happened to
//! stop at 15 because that's the largest digest the original ever rendered.

use pulse_llm::SelectedItem;

/// Emoji-digit prefix for 1-15 (keycap composition); `"<n>."` beyond.
pub fn number_emoji(n: usize) -> String {
    match n {
        0 => String::new(),
        10 => "\u{1F51F}".to_string(),
        1..=15 => n
            .to_string()
            .chars()
            .map(|d| format!("{d}\u{FE0F}\u{20E3}"))
            .collect(),
        _ => format!("{n}."),
    }
}

/// Compose the full digest: header, numbered items, footer.
pub fn compose_digest(header: &str, items: &[SelectedItem], footer: &str) -> String {
    let mut lines = vec![header.to_string(), String::new()];

    for (idx, item) in items.iter().enumerate() {
        let prefix = number_emoji(idx + 1);
        lines.push(format!("{prefix} **{}**", item.title));
        lines.push(String::new());
        lines.push(format!("{}", item.description));
        if !item.source_link.is_empty() {
            lines.push(String::new());
            lines.push(item.source_link.clone());
        }
        lines.push(String::new());
    }

    lines.push(footer.to_string());
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: i64, title: &str) -> SelectedItem {
        SelectedItem {
            source_message_id: id,
            source_channel_id: 1,
            source_link: format!("https://t.me/chan/{id}"),
            text: "text".to_string(),
            category: "general".to_string(),
            title: title.to_string(),
            description: "description text".to_string(),
            score: 8,
            reason: "r".to_string(),
        }
    }

    #[test]
    fn single_digit_keycaps() {
        assert_eq!(number_emoji(1), "1\u{FE0F}\u{20E3}");
        assert_eq!(number_emoji(9), "9\u{FE0F}\u{20E3}");
    }

    #[test]
    fn ten_is_the_keycap_ten_symbol() {
        assert_eq!(number_emoji(10), "\u{1F51F}");
    }

    #[test]
    fn eleven_through_fifteen_compose_digit_by_digit() {
        assert_eq!(number_emoji(11), "1\u{FE0F}\u{20E3}1\u{FE0F}\u{20E3}");
        assert_eq!(number_emoji(15), "1\u{FE0F}\u{20E3}5\u{FE0F}\u{20E3}");
    }

    #[test]
    fn beyond_fifteen_falls_back_to_plain_numbering() {
        assert_eq!(number_emoji(16), "16.");
    }

    #[test]
    fn compose_includes_header_items_and_footer() {
        let items = vec![item(1, "First"), item(2, "Second")];
        let digest = compose_digest("HEADER", &items, "FOOTER");
        assert!(digest.starts_with("HEADER"));
        assert!(digest.contains("**First**"));
        assert!(digest.contains("**Second**"));
        assert!(digest.ends_with("FOOTER"));
    }
}
