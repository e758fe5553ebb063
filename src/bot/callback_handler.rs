//! Callback Handler module for processing inline keyboard callback queries

use std::sync::Arc;

use anyhow::Result;
use teloxide::prelude::*;
use teloxide::types::CallbackQuery;
use tracing::{debug, warn};

use crate::conversation::{Input, Sender};
use crate::dialogue::SessionDialogue;
use crate::feedback::FeedbackCallback;

use super::dialogue_manager::{apply_transition, notify_network_error, send_feedback_reply};
use super::BotDeps;

/// Handle callback queries from inline keyboards
pub async fn callback_handler(bot: Bot, q: CallbackQuery, dialogue: SessionDialogue, deps: Arc<BotDeps>) -> Result<()> {
    let data = q.data.clone().unwrap_or_default();
    debug!(user_id = %q.from.id, data = %data, "Received callback query from user");

    if let Err(e) = bot.answer_callback_query(q.id.clone()).await {
        warn!(user_id = %q.from.id, error = %e, "Failed to answer callback query");
    }

    let chat_id = q
        .message
        .as_ref()
        .map(|message| message.chat().id)
        .unwrap_or_else(|| ChatId::from(q.from.id));

    let feedback = FeedbackCallback::parse(&data);

    // Buttons are single use; the separator button changes nothing
    if feedback != Some(FeedbackCallback::Ignore) {
        if let Some(message) = &q.message {
            if let Err(e) = bot.edit_message_reply_markup(message.chat().id, message.id()).await {
                debug!(user_id = %q.from.id, error = %e, "Could not remove inline keyboard");
            }
        }
    }

    if let Some(callback) = feedback {
        let replies = deps.feedback.handle_callback(q.from.id.0, callback).await;
        for reply in &replies {
            if let Err(e) = send_feedback_reply(&bot, chat_id, reply).await {
                warn!(user_id = %q.from.id, key = reply.key, error = %e, "Failed to deliver feedback reply");
                notify_network_error(&bot, chat_id).await;
                break;
            }
        }
        return Ok(());
    }

    let sender = Sender {
        user_id: q.from.id.0,
        username: q.from.username.clone(),
    };
    let state = dialogue.get_or_default().await?;
    let transition = deps.engine.handle(&sender, state, Input::Callback(data)).await;
    apply_transition(&bot, chat_id, &dialogue, transition).await
}
