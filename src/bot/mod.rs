//! Bot module for handling Telegram interactions
//!
//! This module is split into several submodules:
//! - `message_handler`: Turns messages into engine input, runs admin commands
//! - `callback_handler`: Handles inline keyboard callback queries
//! - `ui_builder`: Creates keyboards and renders replies
//! - `dialogue_manager`: Applies engine transitions to the chat and session

pub mod callback_handler;
pub mod dialogue_manager;
pub mod message_handler;
pub mod ui_builder;

use teloxide::dispatching::{HandlerExt, UpdateFilterExt, UpdateHandler};
use teloxide::prelude::*;

use crate::conversation::Engine;
use crate::dialogue::DialogueState;
use crate::feedback::FeedbackService;
use crate::session::SessionStorage;

pub use callback_handler::callback_handler;
pub use message_handler::message_handler;

/// Shared services injected into every handler
pub struct BotDeps {
    pub engine: Engine,
    pub feedback: FeedbackService,
    pub admin_user_ids: Vec<u64>,
}

impl BotDeps {
    pub fn is_admin(&self, user_id: u64) -> bool {
        self.admin_user_ids.contains(&user_id)
    }
}

/// Update routing: messages and callback queries, both bound to the chat's
/// dialogue
pub fn schema() -> UpdateHandler<anyhow::Error> {
    let messages = Update::filter_message()
        .enter_dialogue::<Message, SessionStorage<DialogueState>, DialogueState>()
        .endpoint(message_handler);

    let callbacks = Update::filter_callback_query()
        .enter_dialogue::<CallbackQuery, SessionStorage<DialogueState>, DialogueState>()
        .endpoint(callback_handler);

    dptree::entry().branch(messages).branch(callbacks)
}
