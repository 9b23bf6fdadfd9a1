//! Header/footer template rendering (SPEC_FULL §4.G step 2).
//!
//! Grounded on `crates/notify/src/templating.rs`'s `TemplateRenderer`
//! (minijinja, fresh `Environment` per render since templates are dynamic
//! strings, not pre-registered files); substitution keys are narrowed to
//! the five the specification names (`date`, `display_name`, `marketplace`,
//! `channel`, `profile`). `Environment::set_undefined_behavior(Strict)`
//! turns a reference to a key absent from [`HeaderFooterContext`] into a
//! render error, which is caught and substituted with a generic fallback
//! header/footer per spec ("on KeyError fall back to a generic header").

use chrono::NaiveDate;
use minijinja::{Environment, UndefinedBehavior};

/// Substitution values available to header/footer templates.
#[derive(Debug, Clone, serde::Serialize)]
pub struct HeaderFooterContext {
    pub date: String,
    pub display_name: String,
    pub marketplace: String,
    pub channel: String,
    pub profile: String,
}

impl HeaderFooterContext {
    pub fn new(date: NaiveDate, display_name: &str, marketplace: &str, channel: &str, profile: &str) -> Self {
        Self {
            date: date.format("%d-%m-%Y").to_string(),
            display_name: display_name.to_string(),
            marketplace: marketplace.to_string(),
            channel: channel.to_string(),
            profile: profile.to_string(),
        }
    }
}

const GENERIC_HEADER: &str = "\u{1F4CC} Главные новости за {{ date }}";
const GENERIC_FOOTER: &str = "{{ channel }}";

fn render(template: &str, ctx: &HeaderFooterContext) -> Option<String> {
    let mut env = Environment::new();
    env.set_undefined_behavior(UndefinedBehavior::Strict);
    env.render_str(template, ctx).ok()
}

/// Render the digest header, falling back to a generic, date-only header if
/// the configured template references a key the context doesn't carry.
pub fn render_header(template: &str, ctx: &HeaderFooterContext) -> String {
    render(template, ctx).unwrap_or_else(|| {
        tracing::warn!("header template referenced an unknown key, using generic fallback");
        render(GENERIC_HEADER, ctx).unwrap_or_default()
    })
}

/// Render the digest footer, same fallback behavior as [`render_header`].
pub fn render_footer(template: &str, ctx: &HeaderFooterContext) -> String {
    render(template, ctx).unwrap_or_else(|| {
        tracing::warn!("footer template referenced an unknown key, using generic fallback");
        render(GENERIC_FOOTER, ctx).unwrap_or_default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> HeaderFooterContext {
        HeaderFooterContext::new(
            NaiveDate::from_ymd_opt(2026, 7, 28).unwrap(),
            "Pulse Digest",
            "wildberries",
            "@pulse_news",
            "prod",
        )
    }

    #[test]
    fn renders_all_placeholders() {
        let rendered = render_header(
            "{{ display_name }} | {{ marketplace }} | {{ date }} | {{ channel }} | {{ profile }}",
            &ctx(),
        );
        assert_eq!(rendered, "Pulse Digest | wildberries | 28-07-2026 | @pulse_news | prod");
    }

    #[test]
    fn unknown_key_falls_back_to_generic_header() {
        let rendered = render_header("{{ unknown_field }}", &ctx());
        assert_eq!(rendered, "\u{1F4CC} Главные новости за 28-07-2026");
    }

    #[test]
    fn unknown_key_falls_back_to_generic_footer() {
        let rendered = render_footer("{{ unknown_field }}", &ctx());
        assert_eq!(rendered, "@pulse_news");
    }
}
