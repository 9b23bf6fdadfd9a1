//! Thin wrapper around [`pulse_listener::Listener`] (SPEC_FULL §4.C, §5):
//! builds the Telegram-backed [`GrammersClient`] from the shared context and
//! runs the listener loop.

use pulse_listener::{GrammersClient, Listener, ListenerError};

use crate::app::AppContext;

pub async fn run_listener(ctx: &AppContext) -> Result<(), ListenerError> {
    let client = GrammersClient::new(
        ctx.credentials.api_id,
        ctx.credentials.api_hash.clone(),
        ctx.session_path(),
    );

    let mut listener = Listener::new(
        client,
        ctx.storage.clone(),
        ctx.config.listener.clone(),
        ctx.config.filters.clone(),
    );
    listener.run().await
}
