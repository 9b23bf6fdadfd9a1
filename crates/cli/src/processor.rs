//! The daily processor run (SPEC_FULL §4.D-§4.G): dedup the unprocessed
//! backlog, select by category, moderate, compose and publish the digest,
//! persist published embeddings, mark messages processed, and run the
//! weekly cleanup.

use std::collections::HashMap;

use chrono::{Datelike, Utc};
use tracing::{info, warn};

use pulse_core::domain::{MessageId, ProcessedUpdate, RejectionReason};
use pulse_core::timeutil::parse_tz;
use pulse_dedup::{DedupCandidate, DedupEngine};
use pulse_llm::{select_by_categories, CandidateMessage};
use pulse_moderation::{auto::moderate_auto, interactive::moderate_interactive, ModerationOutcome};
use pulse_publish::{
    compose_digest, persist_published, publish_digest, render_footer, render_header,
    GrammersPublisher, HeaderFooterContext,
};

use crate::app::{AppContext, AppError};
use crate::moderation_transport::TelegramModerationTransport;

/// Run one end-to-end processor cycle. Errors here are the CLI's concern to
/// log and survive — a failed run simply waits for the next scheduled tick
/// (SPEC_FULL §7), so this never panics on a partial-pipeline failure; it
/// logs and returns early instead.
pub async fn run_processor(ctx: &AppContext) -> Result<(), AppError> {
    let cfg = &ctx.config;

    let unprocessed = ctx.storage.get_unprocessed_messages(24 * 7).await?;
    info!(count = unprocessed.len(), "fetched unprocessed backlog");
    if unprocessed.is_empty() {
        info!("nothing to process this cycle");
        return Ok(());
    }

    let embedder = ctx.build_embedder()?;

    let (ids, matrix): (Vec<_>, Vec<_>) = ctx
        .storage
        .get_published_embeddings(cfg.processor.duplicate_time_window_days)
        .await?
        .into_iter()
        .unzip();
    let mut dedup = DedupEngine::new(ids, matrix, &cfg.processor);

    let dedup_candidates: Vec<DedupCandidate> = unprocessed
        .iter()
        .map(|m| DedupCandidate {
            message_id: m.id,
            text: m.text.clone(),
            tie_break_score: m.text.len() as i64,
        })
        .collect();

    let (unique_ids, dedup_rejections) = dedup.filter_duplicates(&embedder, &dedup_candidates).await;
    info!(unique = unique_ids.len(), rejected = dedup_rejections.len(), "dedup complete");

    let mut updates: Vec<ProcessedUpdate> = dedup_rejections
        .iter()
        .map(|(id, reason)| ProcessedUpdate {
            message_id: *id,
            is_duplicate: Some(true),
            llm_score: None,
            rejection_reason: Some(*reason),
        })
        .collect();

    let by_id: HashMap<MessageId, &pulse_core::domain::RawMessage> =
        unprocessed.iter().map(|m| (m.id, m)).collect();
    let candidates: Vec<CandidateMessage> = unique_ids
        .iter()
        .filter_map(|id| by_id.get(id))
        .map(|m| CandidateMessage {
            message_id: m.id,
            channel_id: m.channel_id,
            channel_handle: m.channel_handle.clone(),
            external_message_id: m.external_message_id,
            text: m.text.clone(),
        })
        .collect();

    if candidates.is_empty() {
        ctx.storage.mark_processed_batch(&updates).await?;
        info!("no candidates survived dedup, skipping selection and publication");
        return Ok(());
    }

    let category_counts: HashMap<String, u32> =
        cfg.categories.iter().map(|c| (c.name.clone(), c.quota)).collect();
    let category_descriptions: HashMap<String, String> =
        cfg.categories.iter().map(|c| (c.name.clone(), c.description.clone())).collect();

    let provider = ctx.build_llm_provider()?;
    let template = cfg
        .llm
        .prompts
        .get("select_by_categories")
        .cloned()
        .unwrap_or_else(|| pulse_llm::prompts::DEFAULT_SELECT_BY_CATEGORIES_TEMPLATE.to_string());

    // Recently published topics give the model tematical memory across runs
    // so it steers away from near-repeat stories even when they survive the
    // embedding-level dedup pass (SPEC_FULL §1, §4.E).
    let recently_published_topics = ctx
        .storage
        .get_recent_published_texts(cfg.processor.duplicate_time_window_days, 30)
        .await
        .unwrap_or_default();

    let categorized = select_by_categories(
        provider.as_ref(),
        &template,
        &candidates,
        &category_counts,
        &category_descriptions,
        cfg.llm.chunk_size as usize,
        &recently_published_topics,
        cfg.llm.temperature,
        cfg.llm.max_tokens,
    )
    .await;

    let llm_selected: std::collections::HashSet<MessageId> =
        categorized.values().flatten().map(|item| item.source_message_id).collect();
    for candidate in &candidates {
        if !llm_selected.contains(&candidate.message_id) {
            updates.push(ProcessedUpdate {
                message_id: candidate.message_id,
                is_duplicate: Some(false),
                llm_score: None,
                rejection_reason: Some(RejectionReason::RejectedByLlm),
            });
        }
    }

    let outcome: ModerationOutcome = if cfg.moderation.auto {
        moderate_auto(&embedder, categorized, cfg.processor.duplicate_threshold, cfg.moderation.final_top_n).await
    } else {
        let client = ctx.connect_telegram_client().await?;
        let handle = cfg.publication.notify_account.clone().unwrap_or_else(|| cfg.publication.channel.clone());
        let transport = TelegramModerationTransport::new(client, handle);
        moderate_interactive(&transport, categorized, &cfg.moderation, 3).await
    };

    for (id, reason) in &outcome.rejections {
        updates.push(ProcessedUpdate {
            message_id: *id,
            is_duplicate: Some(false),
            llm_score: None,
            rejection_reason: Some(*reason),
        });
    }

    if outcome.approved.is_empty() {
        ctx.storage.mark_processed_batch(&updates).await?;
        warn!("moderation approved nothing this cycle, nothing published");
        return Ok(());
    }

    let tz = parse_tz(&cfg.processor.timezone);
    let today = Utc::now().with_timezone(&tz).date_naive();
    let ctx_vars = HeaderFooterContext::new(
        today,
        "Pulse Digest",
        &ctx.profile,
        &cfg.publication.channel,
        &ctx.profile,
    );
    let header = render_header(&cfg.publication.header_template, &ctx_vars);
    let footer = render_footer(&cfg.publication.footer_template, &ctx_vars);
    let digest = compose_digest(&header, &outcome.approved, &footer);

    let client = ctx.connect_telegram_client().await?;
    let target = GrammersPublisher::new(client);
    publish_digest(&target, &cfg.publication, &digest)
        .await
        .map_err(|e| AppError::Telegram(e.to_string()))?;

    let saved = persist_published(&ctx.storage, &embedder, &mut dedup, &outcome.approved).await;
    info!(published = saved.len(), "digest published and persisted");

    for item in &outcome.approved {
        updates.push(ProcessedUpdate {
            message_id: item.source_message_id,
            is_duplicate: Some(false),
            llm_score: Some(item.score),
            rejection_reason: Some(RejectionReason::Published),
        });
    }
    ctx.storage.mark_processed_batch(&updates).await?;

    if cfg.cleanup.run_weekly && today.weekday() == chrono::Weekday::Mon {
        let stats = ctx.storage.cleanup(cfg.cleanup.raw_messages_days, cfg.cleanup.published_days).await?;
        info!(raw_deleted = stats.raw_messages_deleted, "weekly cleanup ran");
    }

    Ok(())
}
