//! Interactive moderation (SPEC_FULL §4.F, "Interactive"): numbered listing,
//! bounded-retry reply parsing, timeout-to-auto-publish.
//!
//! Grounded on `tests/test_moderation_retry.py`'s
//! `_wait_for_moderation_response_retry` behavior (cancel/publish-all/
//! exclude-numbers grammar, bounded retries, no recursion) and
//! `utils/formatters.py::format_categories_moderation_message` for the
//! numbered-listing text, generalized from the fixed wildberries/ozon/general
//! split to an arbitrary category map.

use std::collections::HashMap;
use std::time::Duration;

use pulse_core::config::ModerationConfig;
use pulse_core::domain::RejectionReason;
use pulse_llm::SelectedItem;
use tracing::{info, warn};

use crate::{flatten_sorted, ModerationOutcome};

#[derive(Debug, thiserror::Error)]
pub enum ModerationError {
    #[error("moderation transport error: {0}")]
    Other(String),
}

impl From<ModerationError> for pulse_core::error::PipelineError {
    fn from(e: ModerationError) -> Self {
        pulse_core::error::PipelineError::Other(format!("moderation: {e}"))
    }
}

/// The conversational channel used to list candidates and await an operator
/// reply. A thin seam so tests can substitute a scripted fake instead of a
/// live chat-platform conversation.
#[async_trait::async_trait]
pub trait ModerationTransport: Send + Sync {
    async fn send(&self, text: &str) -> Result<(), ModerationError>;

    /// Waits up to `timeout` for a reply. `Ok(None)` means the wait timed
    /// out without a reply (distinct from a transport failure).
    async fn wait_reply(&self, timeout: Duration) -> Result<Option<String>, ModerationError>;
}

enum ReplyOutcome {
    Cancel,
    PublishAll,
    Exclude(Vec<usize>),
    Invalid,
}

fn parse_reply(text: &str, cfg: &ModerationConfig, total: usize) -> ReplyOutcome {
    let normalized = text.trim().to_lowercase();
    if cfg.cancel_keywords.iter().any(|k| k.to_lowercase() == normalized) {
        return ReplyOutcome::Cancel;
    }
    if cfg.publish_all_keywords.iter().any(|k| k.to_lowercase() == normalized) {
        return ReplyOutcome::PublishAll;
    }

    let numbers: Vec<usize> = normalized
        .split_whitespace()
        .filter_map(|tok| tok.parse::<usize>().ok())
        .filter(|n| *n >= 1 && *n <= total)
        .collect();

    if numbers.is_empty() {
        ReplyOutcome::Invalid
    } else {
        ReplyOutcome::Exclude(numbers)
    }
}

fn format_listing(candidates: &[SelectedItem]) -> String {
    let mut lines = vec!["\u{1F4CB} **МОДЕРАЦИЯ: ВСЕ КАТЕГОРИИ**".to_string()];
    lines.push(String::new());

    let mut by_category: Vec<(String, Vec<(usize, &SelectedItem)>)> = Vec::new();
    for (idx, item) in candidates.iter().enumerate() {
        let ordinal = idx + 1;
        match by_category.iter_mut().find(|(cat, _)| *cat == item.category) {
            Some((_, items)) => items.push((ordinal, item)),
            None => by_category.push((item.category.clone(), vec![(ordinal, item)])),
        }
    }

    for (category, items) in &by_category {
        lines.push(format!("\u{1F4E6} **{}**", category.to_uppercase()));
        for (ordinal, item) in items {
            let short_desc: String = item.description.chars().take(100).collect();
            lines.push(format!("{ordinal}. **{}**", item.title));
            lines.push(format!("_{short_desc}_"));
            lines.push(format!("\u{2B50} {}/10", item.score));
        }
        lines.push(String::new());
    }

    lines.push("=".repeat(50));
    lines.push("\u{1F4E9} Ответь сообщением с номерами для удаления (через пробел)".to_string());
    lines.push("\u{1F7E2} Чтобы одобрить все новости — отправь `0`".to_string());
    lines.push(String::new());
    lines.push("\u{1F552} После ответа модератора бот обновит список автоматически".to_string());
    lines.join("\n")
}

fn abort_all(candidates: Vec<SelectedItem>) -> ModerationOutcome {
    let rejections = candidates
        .iter()
        .map(|c| (c.source_message_id, RejectionReason::RejectedByModerator))
        .collect();
    ModerationOutcome { approved: Vec::new(), rejections }
}

fn approve_all(candidates: Vec<SelectedItem>) -> ModerationOutcome {
    ModerationOutcome { approved: candidates, rejections: HashMap::new() }
}

/// Run the interactive moderation flow: list, wait (bounded retries on
/// unparseable replies), and resolve to an approved/rejected split.
pub async fn moderate_interactive(
    transport: &dyn ModerationTransport,
    categorized: HashMap<String, Vec<SelectedItem>>,
    cfg: &ModerationConfig,
    max_retries: u32,
) -> ModerationOutcome {
    let candidates = flatten_sorted(categorized);
    if candidates.is_empty() {
        return ModerationOutcome::default();
    }

    let listing = format_listing(&candidates);
    if let Err(err) = transport.send(&listing).await {
        warn!(error = %err, "failed to send moderation listing, auto-approving");
        return approve_all(candidates);
    }

    let timeout = Duration::from_secs(u64::from(cfg.timeout_hours) * 3600);
    let total = candidates.len();

    for attempt in 0..max_retries {
        let reply = match transport.wait_reply(timeout).await {
            Ok(Some(text)) => text,
            Ok(None) => {
                info!("moderation wait timed out, auto-approving all");
                return approve_all(candidates);
            }
            Err(err) => {
                warn!(error = %err, "moderation transport failed, auto-approving all");
                return approve_all(candidates);
            }
        };

        match parse_reply(&reply, cfg, total) {
            ReplyOutcome::Cancel => {
                info!("moderator cancelled, rejecting all candidates");
                return abort_all(candidates);
            }
            ReplyOutcome::PublishAll => {
                info!("moderator approved all candidates");
                return approve_all(candidates);
            }
            ReplyOutcome::Exclude(numbers) => {
                let excluded: std::collections::HashSet<usize> = numbers.into_iter().collect();
                let mut approved = Vec::new();
                let mut rejections = HashMap::new();
                for (idx, item) in candidates.into_iter().enumerate() {
                    if excluded.contains(&(idx + 1)) {
                        rejections.insert(item.source_message_id, RejectionReason::RejectedByModerator);
                    } else {
                        approved.push(item);
                    }
                }
                let _ = transport
                    .send(&format!("Опубликовано {} из {}", approved.len(), total))
                    .await;
                return ModerationOutcome { approved, rejections };
            }
            ReplyOutcome::Invalid => {
                if attempt + 1 >= max_retries {
                    let _ = transport.send("Превышено количество попыток, модерация отменена").await;
                    return abort_all(candidates);
                }
                let _ = transport.send("Не удалось распознать ответ, попробуйте снова").await;
            }
        }
    }

    abort_all(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::Mutex;

    struct ScriptedTransport {
        sent: Mutex<Vec<String>>,
        replies: Mutex<Vec<Option<String>>>,
    }

    impl ScriptedTransport {
        fn new(replies: Vec<&str>) -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                replies: Mutex::new(replies.into_iter().map(|s| Some(s.to_string())).rev().collect()),
            }
        }

        fn with_timeout() -> Self {
            Self { sent: Mutex::new(Vec::new()), replies: Mutex::new(vec![None]) }
        }
    }

    #[async_trait::async_trait]
    impl ModerationTransport for ScriptedTransport {
        async fn send(&self, text: &str) -> Result<(), ModerationError> {
            self.sent.lock().await.push(text.to_string());
            Ok(())
        }

        async fn wait_reply(&self, _timeout: Duration) -> Result<Option<String>, ModerationError> {
            Ok(self.replies.lock().await.pop().flatten())
        }
    }

    fn item(id: i64, category: &str) -> SelectedItem {
        SelectedItem {
            source_message_id: id,
            source_channel_id: 1,
            source_link: format!("https://t.me/chan/{id}"),
            text: "text".to_string(),
            category: category.to_string(),
            title: "title".to_string(),
            description: "desc".to_string(),
            score: 8,
            reason: "r".to_string(),
        }
    }

    fn categorized() -> HashMap<String, Vec<SelectedItem>> {
        let mut map = HashMap::new();
        map.insert("general".to_string(), vec![item(1, "general"), item(2, "general"), item(3, "general")]);
        map
    }

    #[tokio::test]
    async fn exclude_grammar_rejects_named_numbers() {
        let transport = ScriptedTransport::new(vec!["1 3"]);
        let cfg = ModerationConfig::default();
        let outcome = moderate_interactive(&transport, categorized(), &cfg, 3).await;
        assert_eq!(outcome.approved.len(), 1);
        assert_eq!(outcome.approved[0].source_message_id, 2);
        assert_eq!(outcome.rejections.len(), 2);
    }

    #[tokio::test]
    async fn cancel_rejects_everything() {
        let transport = ScriptedTransport::new(vec!["отмена"]);
        let cfg = ModerationConfig::default();
        let outcome = moderate_interactive(&transport, categorized(), &cfg, 3).await;
        assert!(outcome.approved.is_empty());
        assert_eq!(outcome.rejections.len(), 3);
    }

    #[tokio::test]
    async fn publish_all_keyword_approves_everything() {
        let transport = ScriptedTransport::new(vec!["0"]);
        let cfg = ModerationConfig::default();
        let outcome = moderate_interactive(&transport, categorized(), &cfg, 3).await;
        assert_eq!(outcome.approved.len(), 3);
    }

    #[tokio::test]
    async fn invalid_then_valid_retries_once() {
        let transport = ScriptedTransport::new(vec!["abc", "2"]);
        let cfg = ModerationConfig::default();
        let outcome = moderate_interactive(&transport, categorized(), &cfg, 3).await;
        assert_eq!(outcome.approved.len(), 2);
        assert_eq!(outcome.rejections.len(), 1);
    }

    #[tokio::test]
    async fn exhausting_retries_aborts() {
        let transport = ScriptedTransport::new(vec!["abc", "xyz", "!!!"]);
        let cfg = ModerationConfig::default();
        let outcome = moderate_interactive(&transport, categorized(), &cfg, 3).await;
        assert!(outcome.approved.is_empty());
        assert_eq!(outcome.rejections.len(), 3);
    }

    #[tokio::test]
    async fn timeout_auto_approves() {
        let transport = ScriptedTransport::with_timeout();
        let cfg = ModerationConfig::default();
        let outcome = moderate_interactive(&transport, categorized(), &cfg, 3).await;
        assert_eq!(outcome.approved.len(), 3);
    }

    #[tokio::test]
    async fn out_of_range_numbers_are_ignored() {
        let transport = ScriptedTransport::new(vec!["99 100", "2"]);
        let cfg = ModerationConfig::default();
        let outcome = moderate_interactive(&transport, categorized(), &cfg, 3).await;
        assert_eq!(outcome.approved.len(), 2);
    }
}
