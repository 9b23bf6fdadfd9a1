//! Prompt template loading and substitution for the categorized selection
//! stage (SPEC_FULL §4.E).
//!
//! Grounded on `gemini_client.py`'s inline f-string prompts (criteria
//! sections, `СООБЩЕНИЯ:` block, JSON-shape instructions at the end),
//! generalized from the hardcoded Wildberries/Ozon/general categories to an
//! arbitrary `category_descriptions` map so the same template serves any
//! configured category set.

/// Literal marker splitting a prompt template into system/user halves when
/// the provider distinguishes a system role. Absent from a template, the
/// whole thing is treated as the user prompt and a short generic system
/// prompt is used instead.
pub const SYSTEM_SPLIT_MARKER: &str = "\n===USER===\n";

pub const GENERIC_SYSTEM_PROMPT: &str =
    "You are a precise news curator. Follow the category criteria exactly \
     and respond with only the requested JSON, no commentary.";

/// The fallback template used when no `prompts.select_by_categories` key is
/// configured. Placeholders: `{categories_description}`, `{messages_block}`,
/// `{json_structure}`, `{recently_published_section}`.
pub const DEFAULT_SELECT_BY_CATEGORIES_TEMPLATE: &str = "\
You are an expert news curator working across several subject categories.

CATEGORIES:
{categories_description}
{recently_published_section}
Score every candidate from 1 (irrelevant) to 10 (must-publish). Never invent
an id that is not present in the MESSAGES section below. Never return the
same message id in more than one category.

MESSAGES:
{messages_block}
===USER===
Select and score the best items for each category from the messages above.

Respond with ONLY a JSON object shaped like:
{json_structure}

No markdown fences, no commentary, JSON only.";

/// Substitute the four named placeholders. Curly braces inside substituted
/// values are expected to already be escaped by the caller (see
/// `pulse_core::sanitize::sanitize_for_prompt`) so they cannot smuggle in
/// additional placeholder syntax.
pub fn render_template(
    template: &str,
    categories_description: &str,
    messages_block: &str,
    json_structure: &str,
    recently_published_section: &str,
) -> String {
    template
        .replace("{categories_description}", categories_description)
        .replace("{messages_block}", messages_block)
        .replace("{json_structure}", json_structure)
        .replace("{recently_published_section}", recently_published_section)
}

/// Split a rendered template into (system_prompt, user_prompt) on the
/// literal split marker. Absent a marker, returns the generic system prompt
/// paired with the whole rendered template as the user prompt.
pub fn split_system_user(rendered: &str) -> (String, String) {
    match rendered.split_once(SYSTEM_SPLIT_MARKER) {
        Some((system, user)) => (system.trim().to_string(), user.trim().to_string()),
        None => (GENERIC_SYSTEM_PROMPT.to_string(), rendered.trim().to_string()),
    }
}

/// Render the `{recently_published_section}` block from a list of recently
/// published topics, or an empty string when there are none.
pub fn recently_published_section(topics: &[String]) -> String {
    if topics.is_empty() {
        return String::new();
    }
    let joined = topics
        .iter()
        .map(|t| format!("- {t}"))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "\nRECENTLY PUBLISHED (do not re-select the same story):\n{joined}\n"
    )
}
