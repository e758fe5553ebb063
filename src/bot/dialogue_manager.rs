//! Dialogue Manager module: applies conversation transitions to the chat

use anyhow::Result;
use teloxide::prelude::*;
use teloxide::RequestError;
use tracing::{debug, error, warn};

use crate::conversation::{Reply, Step, Transition};
use crate::dialogue::SessionDialogue;
use crate::feedback::FeedbackReply;
use crate::localization::t;

use super::ui_builder::{feedback_markup, render, render_feedback, reply_markup};

/// Send one conversation reply
pub async fn send_reply(bot: &Bot, chat_id: ChatId, reply: &Reply) -> Result<Message, RequestError> {
    let request = bot.send_message(chat_id, render(reply));
    match reply_markup(reply.keyboard) {
        Some(markup) => request.reply_markup(markup).await,
        None => request.await,
    }
}

/// Send one feedback workflow message
pub async fn send_feedback_reply(bot: &Bot, chat_id: ChatId, reply: &FeedbackReply) -> Result<Message, RequestError> {
    let request = bot.send_message(chat_id, render_feedback(reply));
    match feedback_markup(&reply.markup) {
        Some(markup) => request.reply_markup(markup).await,
        None => request.await,
    }
}

/// Persist the transition's state, then send its replies in order
pub async fn apply_transition(
    bot: &Bot,
    chat_id: ChatId,
    dialogue: &SessionDialogue,
    transition: Transition,
) -> Result<()> {
    match transition.step {
        Step::Continue(state) => {
            debug!(chat_id = %chat_id, state = ?state, "Dialogue continues");
            dialogue.update(state).await?;
        }
        Step::End => {
            debug!(chat_id = %chat_id, "Dialogue ended");
            dialogue.exit().await?;
        }
    }

    for reply in &transition.replies {
        if let Err(e) = send_reply(bot, chat_id, reply).await {
            error!(chat_id = %chat_id, key = reply.key, error = %e, "Failed to deliver reply");
            notify_network_error(bot, chat_id).await;
            break;
        }
    }

    Ok(())
}

/// Best-effort notice after a delivery failure
pub async fn notify_network_error(bot: &Bot, chat_id: ChatId) {
    if let Err(e) = bot.send_message(chat_id, t("network-error")).await {
        warn!(chat_id = %chat_id, error = %e, "Could not deliver network error notice");
    }
}
