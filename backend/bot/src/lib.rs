//! Telegram front-end: update dispatch, keyboards, and message texts.
//!
//! All domain decisions live in `vidgate-access`; this crate translates
//! Telegram updates into controller calls and renders the results.

pub mod action;
pub mod callback;
pub mod commands;
pub mod download;
pub mod keyboards;
pub mod sink;
pub mod state;
pub mod text;

pub use sink::TelegramSink;
pub use state::BotState;

use teloxide::prelude::*;
use tracing::info;

/// Run the long-polling dispatcher until shutdown.
pub async fn run(bot: Bot, state: BotState) {
    info!("Starting update dispatcher");

    let handler = dptree::entry()
        .branch(Update::filter_message().endpoint(commands::handle_message))
        .branch(Update::filter_callback_query().endpoint(callback::handle_callback));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .error_handler(LoggingErrorHandler::with_custom_text("Update handler failed"))
        .build()
        .dispatch()
        .await;
}
