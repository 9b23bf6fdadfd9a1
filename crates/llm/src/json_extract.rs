//! Extract a JSON value from a raw LLM reply.
//!
//! Grounded on `gemini_client.py`'s fence-stripping + regex-search fallback,
//! generalized to fetch either a JSON object or a JSON array (the original
//! only ever looked for an array).

use regex::Regex;

/// Strip ` ```json ... ``` ` / ` ``` ... ``` ` fences, then return the first
/// balanced top-level JSON object or array found in the text. Returns `None`
/// if nothing resembling JSON is present.
pub fn extract_json(response: &str) -> Option<&str> {
    let trimmed = response.trim();
    let unfenced = strip_fences(trimmed);

    let first_non_ws = unfenced.trim_start();
    if first_non_ws.starts_with('{') || first_non_ws.starts_with('[') {
        return Some(first_non_ws.trim_end());
    }

    find_balanced(unfenced)
}

fn strip_fences(text: &str) -> &str {
    if let Some(start) = text.find("```json") {
        let body_start = start + "```json".len();
        if let Some(end) = text[body_start..].find("```") {
            return text[body_start..body_start + end].trim();
        }
    }
    if let Some(start) = text.find("```") {
        let body_start = start + "```".len();
        if let Some(end) = text[body_start..].find("```") {
            return text[body_start..body_start + end].trim();
        }
    }
    text
}

/// Regex-search for the first balanced `{...}` or `[...]` span, preferring
/// whichever opening bracket appears first in the text.
fn find_balanced(text: &str) -> Option<&str> {
    let obj_re = Regex::new(r"\{[\s\S]*\}").unwrap();
    let arr_re = Regex::new(r"\[[\s\S]*\]").unwrap();

    let obj_match = obj_re.find(text);
    let arr_match = arr_re.find(text);

    match (obj_match, arr_match) {
        (Some(o), Some(a)) => {
            if o.start() <= a.start() {
                Some(o.as_str())
            } else {
                Some(a.as_str())
            }
        }
        (Some(o), None) => Some(o.as_str()),
        (None, Some(a)) => Some(a.as_str()),
        (None, None) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_raw_array() {
        assert_eq!(extract_json("[1,2,3]"), Some("[1,2,3]"));
    }

    #[test]
    fn strips_json_fence() {
        let input = "Here:\n```json\n{\"a\": 1}\n```\nDone.";
        assert_eq!(extract_json(input), Some("{\"a\": 1}"));
    }

    #[test]
    fn falls_back_to_regex_search() {
        let input = "Sure, here is the result: {\"a\": 1} hope that helps";
        assert_eq!(extract_json(input), Some("{\"a\": 1}"));
    }

    #[test]
    fn returns_none_for_non_json() {
        assert_eq!(extract_json("no json here at all"), None);
    }
}
