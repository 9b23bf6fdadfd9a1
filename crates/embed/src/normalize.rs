//! Text normalization applied before encoding (SPEC_FULL §4.B).
//!
//! Grounded on `services/embeddings.py`'s pre-encode cleanup and
//! `tests/test_text_normalization.py`'s similarity expectations: collapsing
//! whitespace and stripping URLs must not move two paraphrases of the same
//! story apart, while stripping a source-attribution prefix must not make an
//! unrelated story look similar.

use std::sync::OnceLock;

use pulse_core::config::NormalizationConfig;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

fn url_regex() -> &'static Regex {
    static URL_RE: OnceLock<Regex> = OnceLock::new();
    URL_RE.get_or_init(|| Regex::new(r"https?://\S+").unwrap())
}

fn whitespace_regex() -> &'static Regex {
    static WS_RE: OnceLock<Regex> = OnceLock::new();
    WS_RE.get_or_init(|| Regex::new(r"\s+").unwrap())
}

/// Normalize `text` per `cfg`, returning the cleaned string ready for
/// encoding. Unconditional steps: Unicode NFKC normalization, whitespace
/// collapse, trim. Conditional steps per `cfg`: URL replacement, emoji
/// stripping, source-attribution prefix/infix removal.
pub fn normalize(text: &str, cfg: &NormalizationConfig) -> String {
    let mut out: String = text.nfkc().collect();

    if cfg.strip_urls {
        out = url_regex().replace_all(&out, "[URL]").into_owned();
    }

    if cfg.strip_source_attribution {
        out = strip_source_attribution(&out, &cfg.source_attribution_patterns);
    }

    if cfg.strip_emoji {
        out = strip_emoji(&out);
    }

    out = whitespace_regex().replace_all(&out, " ").trim().to_string();
    out
}

fn strip_source_attribution(text: &str, patterns: &[String]) -> String {
    let mut out = text.to_string();
    for pattern in patterns {
        if let Ok(re) = Regex::new(pattern) {
            out = re.replace_all(&out, "").into_owned();
        }
    }
    out
}

/// Strip codepoints in the common emoji / symbol ranges. Deliberately
/// conservative: it removes pictographs and emoji presentation selectors,
/// not all non-ASCII text, so non-Latin scripts survive untouched.
fn strip_emoji(text: &str) -> String {
    text.chars()
        .filter(|c| !is_emoji(*c))
        .collect()
}

fn is_emoji(c: char) -> bool {
    matches!(c as u32,
        0x1F300..=0x1FAFF // misc symbols, pictographs, emoticons, transport, supplemental
        | 0x2600..=0x27BF // misc symbols and dingbats
        | 0xFE00..=0xFE0F // variation selectors
        | 0x1F1E6..=0x1F1FF // regional indicators (flags)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> NormalizationConfig {
        NormalizationConfig::default()
    }

    #[test]
    fn collapses_whitespace() {
        let out = normalize("hello    world\n\tfoo", &cfg());
        assert_eq!(out, "hello world foo");
    }

    #[test]
    fn replaces_urls() {
        let out = normalize("check this out https://example.com/a/b see more", &cfg());
        assert_eq!(out, "check this out [URL] see more");
    }

    #[test]
    fn strips_known_source_attribution_prefix() {
        let out = normalize("Источник: Ведомости рубль вырос", &cfg());
        assert!(!out.contains("Источник"));
        assert!(out.contains("рубль вырос"));
    }

    #[test]
    fn leaves_plain_text_unchanged_besides_whitespace() {
        let out = normalize("это обычная новость без ссылок", &cfg());
        assert_eq!(out, "это обычная новость без ссылок");
    }

    #[test]
    fn emoji_stripping_is_opt_in() {
        let mut c = cfg();
        c.strip_emoji = false;
        assert!(normalize("great news \u{1F600}", &c).contains('\u{1F600}'));
        c.strip_emoji = true;
        assert!(!normalize("great news \u{1F600}", &c).contains('\u{1F600}'));
    }
}
