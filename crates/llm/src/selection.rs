//! Categorized news selection (SPEC_FULL §4.E).
//!
//! Grounded on `gemini_client.py`'s `select_top_news` / `select_three_categories`
//! methods, generalized from a hardcoded three-category split to an arbitrary
//! `category_counts` map, and from "only ever parse an array" to the tagged
//! union described by the specification (flat list vs category-keyed object —
//! the legacy fixed-category and newer dynamic-category shapes collapse to
//! the same category-keyed-object parse once categories are config-driven
//! rather than hardcoded).

use std::collections::HashMap;
use std::time::Duration;

use pulse_core::domain::{ChannelId, MessageId};
use pulse_core::sanitize::sanitize_for_prompt;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::json_extract::extract_json;
use crate::prompts::{recently_published_section, render_template, split_system_user};
use crate::provider::{LlmError, LlmProvider, Message, Role};

const MAX_ATTEMPTS: u32 = 3;
const BASE_BACKOFF: Duration = Duration::from_secs(2);
const MAX_BACKOFF: Duration = Duration::from_secs(10);
const CHUNK_COOLDOWN: Duration = Duration::from_secs(5);

#[derive(Debug, thiserror::Error)]
pub enum SelectionError {
    #[error(transparent)]
    Llm(#[from] LlmError),
}

/// A raw ingested message offered up for selection.
#[derive(Debug, Clone)]
pub struct CandidateMessage {
    pub message_id: MessageId,
    pub channel_id: ChannelId,
    pub channel_handle: String,
    pub external_message_id: i64,
    pub text: String,
}

/// An item chosen by the LLM for a given category, enriched with its source.
#[derive(Debug, Clone)]
pub struct SelectedItem {
    pub source_message_id: MessageId,
    pub source_channel_id: ChannelId,
    pub source_link: String,
    pub text: String,
    pub category: String,
    pub title: String,
    pub description: String,
    pub score: u8,
    pub reason: String,
}

/// One item as returned by the model, before enrichment against the input
/// candidates. `category` is only present in the flat-list response shape;
/// in the category-keyed-object shape the key itself is the category.
#[derive(Debug, Clone, Deserialize)]
struct RawItem {
    id: i64,
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default = "default_score")]
    score: u8,
    #[serde(default)]
    reason: String,
    #[serde(default)]
    category: Option<String>,
}

fn default_score() -> u8 {
    5
}

/// The tagged union of response shapes the model may reply with.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawResponse {
    Flat(Vec<RawItem>),
    ByCategory(HashMap<String, Vec<RawItem>>),
}

fn parse_response(raw: &str, request_id: &str) -> HashMap<String, Vec<RawItem>> {
    let Some(json_slice) = extract_json(raw) else {
        warn!(request_id, "no JSON found in LLM response, skipping chunk");
        return HashMap::new();
    };

    match serde_json::from_str::<RawResponse>(json_slice) {
        Ok(RawResponse::Flat(items)) => {
            let mut grouped: HashMap<String, Vec<RawItem>> = HashMap::new();
            for item in items {
                let category = item.category.clone().unwrap_or_else(|| "general".to_string());
                grouped.entry(category).or_default().push(item);
            }
            grouped
        }
        Ok(RawResponse::ByCategory(map)) => map,
        Err(err) => {
            warn!(request_id, error = %err, "response failed schema validation, returning empty chunk result");
            HashMap::new()
        }
    }
}

/// Split candidates into fixed-size chunks, preserving order.
pub fn chunk_candidates(
    candidates: &[CandidateMessage],
    chunk_size: usize,
) -> Vec<&[CandidateMessage]> {
    if chunk_size == 0 {
        return vec![candidates];
    }
    candidates.chunks(chunk_size).collect()
}

fn messages_block(chunk: &[CandidateMessage]) -> String {
    chunk
        .iter()
        .map(|c| format!("id={} | {}", c.message_id, sanitize_for_prompt(&c.text, 2000)))
        .collect::<Vec<_>>()
        .join("\n")
}

fn categories_description(category_descriptions: &HashMap<String, String>) -> String {
    category_descriptions
        .iter()
        .map(|(name, desc)| format!("- {name}: {desc}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn json_structure(category_counts: &HashMap<String, u32>) -> String {
    let body = category_counts
        .keys()
        .map(|name| format!("  \"{name}\": [{{\"id\": <int>, \"title\": \"...\", \"description\": \"...\", \"score\": <1-10>, \"reason\": \"...\"}}]"))
        .collect::<Vec<_>>()
        .join(",\n");
    format!("{{\n{body}\n}}")
}

fn estimate_tokens(text: &str) -> usize {
    text.len() / 4
}

async fn complete_with_retry(
    provider: &dyn LlmProvider,
    messages: Vec<Message>,
    temperature: f32,
    max_tokens: u32,
    request_id: &str,
) -> Result<String, LlmError> {
    let mut attempt = 0u32;
    let mut delay = BASE_BACKOFF;
    loop {
        attempt += 1;
        match provider.complete(messages.clone(), temperature, max_tokens).await {
            Ok(text) => return Ok(text),
            Err(err) if attempt < MAX_ATTEMPTS && err.is_retryable() => {
                warn!(request_id, attempt, error = %err, "LLM call failed, retrying");
                tokio::time::sleep(delay).await;
                delay = (delay * 2).min(MAX_BACKOFF);
            }
            Err(err) => return Err(err),
        }
    }
}

/// Run one chunk through the provider and parse its result into a
/// category-keyed map of raw items, never failing the whole run: any error
/// (transport, schema) degrades that chunk to an empty result.
async fn run_chunk(
    provider: &dyn LlmProvider,
    template: &str,
    chunk: &[CandidateMessage],
    category_counts: &HashMap<String, u32>,
    category_descriptions: &HashMap<String, String>,
    recently_published_topics: &[String],
    temperature: f32,
    max_tokens: u32,
) -> HashMap<String, Vec<RawItem>> {
    let request_id = pulse_core::domain::new_request_id();

    let rendered = render_template(
        template,
        &categories_description(category_descriptions),
        &messages_block(chunk),
        &json_structure(category_counts),
        &recently_published_section(recently_published_topics),
    );
    let (system_prompt, user_prompt) = split_system_user(&rendered);

    let estimated = estimate_tokens(&system_prompt) + estimate_tokens(&user_prompt);
    if max_tokens > 0 && estimated as f64 >= 0.8 * max_tokens as f64 {
        warn!(
            request_id,
            estimated_tokens = estimated,
            max_tokens,
            "prompt is within 80% of max_tokens budget"
        );
    }
    debug!(request_id, chunk_len = chunk.len(), estimated_tokens = estimated, "dispatching selection chunk");

    let messages = vec![
        Message { role: Role::System, content: system_prompt },
        Message { role: Role::User, content: user_prompt },
    ];

    match complete_with_retry(provider, messages, temperature, max_tokens, &request_id).await {
        Ok(raw) => parse_response(&raw, &request_id),
        Err(err) => {
            warn!(request_id, error = %err, "chunk LLM call failed after retries, degrading to empty result");
            HashMap::new()
        }
    }
}

/// Enforce per-category quotas with surplus redistribution (SPEC_FULL §4.E,
/// scenario S4): each category takes up to its quota from its own
/// descending-score-sorted list; overflow goes into a surplus pool; if any
/// category ended up underfilled, the surplus (sorted by score) fills the
/// remaining slots, relabeling items into the category they fill.
fn enforce_quotas(
    mut combined: HashMap<String, Vec<SelectedItem>>,
    category_counts: &HashMap<String, u32>,
) -> HashMap<String, Vec<SelectedItem>> {
    for items in combined.values_mut() {
        items.sort_by(|a, b| b.score.cmp(&a.score));
    }

    let mut result: HashMap<String, Vec<SelectedItem>> = HashMap::new();
    let mut surplus: Vec<SelectedItem> = Vec::new();

    for (category, quota) in category_counts {
        let quota = *quota as usize;
        let items = combined.remove(category).unwrap_or_default();
        let (taken, overflow): (Vec<_>, Vec<_>) = if items.len() > quota {
            let mut items = items;
            let overflow = items.split_off(quota);
            (items, overflow)
        } else {
            (items, Vec::new())
        };
        result.insert(category.clone(), taken);
        surplus.extend(overflow);
    }
    // Candidates returned under a category name absent from category_counts
    // have no quota to fill; treat them as surplus too.
    for (_unknown_category, items) in combined {
        surplus.extend(items);
    }

    surplus.sort_by(|a, b| b.score.cmp(&a.score));

    for item in surplus {
        let underfilled = category_counts.iter().find(|(name, quota)| {
            result.get(name.as_str()).map(|v| v.len()).unwrap_or(0) < **quota as usize
        });
        if let Some((name, _)) = underfilled {
            let mut relabeled = item;
            relabeled.category = name.clone();
            result.entry(name.clone()).or_default().push(relabeled);
        }
    }

    for items in result.values_mut() {
        items.sort_by(|a, b| b.score.cmp(&a.score));
    }
    result
}

/// Select and categorize news from `candidates`, honoring `category_counts`
/// quotas. Chunks are processed sequentially against `provider` (sequential,
/// not parallel, so a shared rate limit budget is respected); chunk failures
/// degrade gracefully rather than aborting the whole run.
#[allow(clippy::too_many_arguments)]
pub async fn select_by_categories(
    provider: &dyn LlmProvider,
    template: &str,
    candidates: &[CandidateMessage],
    category_counts: &HashMap<String, u32>,
    category_descriptions: &HashMap<String, String>,
    chunk_size: usize,
    recently_published_topics: &[String],
    temperature: f32,
    max_tokens: u32,
) -> HashMap<String, Vec<SelectedItem>> {
    let by_id: HashMap<i64, &CandidateMessage> =
        candidates.iter().map(|c| (c.message_id, c)).collect();

    let mut combined: HashMap<String, Vec<SelectedItem>> = HashMap::new();
    let mut seen_message_ids: std::collections::HashSet<i64> = std::collections::HashSet::new();

    let chunks = chunk_candidates(candidates, chunk_size);
    let chunk_count = chunks.len();
    for (index, chunk) in chunks.into_iter().enumerate() {
        if index > 0 {
            tokio::time::sleep(CHUNK_COOLDOWN).await;
        }
        let grouped = run_chunk(
            provider,
            template,
            chunk,
            category_counts,
            category_descriptions,
            recently_published_topics,
            temperature,
            max_tokens,
        )
        .await;
        debug!(chunk_index = index, chunk_count, "processed selection chunk");

        for (category, items) in grouped {
            for raw in items {
                if !seen_message_ids.insert(raw.id) {
                    continue;
                }
                let Some(candidate) = by_id.get(&raw.id) else {
                    warn!(id = raw.id, "LLM referenced an id not present among candidates, dropping");
                    continue;
                };
                let source_link = format!(
                    "https://t.me/{}/{}",
                    candidate.channel_handle, candidate.external_message_id
                );
                combined.entry(category.clone()).or_default().push(SelectedItem {
                    source_message_id: candidate.message_id,
                    source_channel_id: candidate.channel_id,
                    source_link,
                    text: candidate.text.clone(),
                    category,
                    title: raw.title,
                    description: raw.description,
                    score: raw.score,
                    reason: raw.reason,
                });
            }
        }
    }

    enforce_quotas(combined, category_counts)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: i64, category: &str, score: u8) -> SelectedItem {
        SelectedItem {
            source_message_id: id,
            source_channel_id: 1,
            source_link: format!("https://t.me/chan/{id}"),
            text: format!("text {id}"),
            category: category.to_string(),
            title: format!("title {id}"),
            description: "desc".to_string(),
            score,
            reason: "reason".to_string(),
        }
    }

    #[test]
    fn chunking_preserves_all_candidates() {
        let candidates: Vec<_> = (0..7)
            .map(|i| CandidateMessage {
                message_id: i,
                channel_id: 1,
                channel_handle: "chan".to_string(),
                external_message_id: i,
                text: format!("msg {i}"),
            })
            .collect();
        let chunks = chunk_candidates(&candidates, 3);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks.iter().map(|c| c.len()).sum::<usize>(), 7);
    }

    #[test]
    fn quota_redistribution_matches_scenario_s4() {
        let mut combined = HashMap::new();
        combined.insert(
            "wb".to_string(),
            vec![item(1, "wb", 9), item(2, "wb", 8), item(3, "wb", 7)],
        );
        combined.insert(
            "ozon".to_string(),
            (10..20).map(|i| item(i, "ozon", (20 - i) as u8)).collect(),
        );
        combined.insert(
            "general".to_string(),
            vec![item(100, "general", 6), item(101, "general", 5)],
        );

        let mut quotas = HashMap::new();
        quotas.insert("wb".to_string(), 5);
        quotas.insert("ozon".to_string(), 5);
        quotas.insert("general".to_string(), 5);

        let result = enforce_quotas(combined, &quotas);

        let total: usize = result.values().map(|v| v.len()).sum();
        assert!(total <= 15);
        for (name, items) in &result {
            let quota = quotas[name] as usize;
            assert!(items.len() <= quota, "{name} exceeded its quota");
        }
        assert_eq!(result["wb"].len(), 5);
        assert_eq!(result["general"].len(), 5);
    }

    #[test]
    fn parse_response_accepts_flat_list() {
        let raw = r#"[{"id": 1, "title": "t", "description": "d", "score": 8, "reason": "r", "category": "wb"}]"#;
        let grouped = parse_response(raw, "req1");
        assert_eq!(grouped["wb"].len(), 1);
    }

    #[test]
    fn parse_response_accepts_category_object() {
        let raw = r#"{"wb": [{"id": 1, "title": "t", "description": "d", "score": 8, "reason": "r"}], "general": []}"#;
        let grouped = parse_response(raw, "req1");
        assert_eq!(grouped["wb"].len(), 1);
        assert_eq!(grouped["general"].len(), 0);
    }

    #[test]
    fn parse_response_degrades_gracefully_on_garbage() {
        let grouped = parse_response("not json at all", "req1");
        assert!(grouped.is_empty());
    }
}
