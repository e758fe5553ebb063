//! Message Handler module for processing incoming Telegram messages

use std::sync::Arc;

use anyhow::Result;
use teloxide::prelude::*;
use tracing::{debug, info, warn};

use crate::commands::{AdminUsage, Command};
use crate::conversation::{Input, Sender};
use crate::dialogue::SessionDialogue;
use crate::feedback::RequestRefusal;
use crate::localization::{t, t_args};
use crate::upload::{FileKind, InboundFile};

use super::dialogue_manager::{apply_transition, send_feedback_reply};
use super::BotDeps;

/// Reduce a message to the input the conversation engine understands
pub fn message_input(msg: &Message) -> Input {
    if let Some(location) = msg.location() {
        return Input::Location {
            latitude: location.latitude,
            longitude: location.longitude,
        };
    }

    if let Some(doc) = msg.document() {
        return Input::File(InboundFile {
            file_id: doc.file.id.0.clone(),
            file_name: doc.file_name.clone(),
            size: u64::from(doc.file.size),
            kind: FileKind::Document,
        });
    }

    // Sizes are listed smallest first
    if let Some(photo) = msg.photo().and_then(|sizes| sizes.last()) {
        return Input::File(InboundFile {
            file_id: photo.file.id.0.clone(),
            file_name: None,
            size: u64::from(photo.file.size),
            kind: FileKind::Photo,
        });
    }

    match msg.text() {
        Some(text) => match Command::parse(text) {
            Some(command) => Input::Command(command),
            None => Input::Text(text.to_string()),
        },
        None => Input::Unsupported,
    }
}

pub async fn message_handler(bot: Bot, msg: Message, dialogue: SessionDialogue, deps: Arc<BotDeps>) -> Result<()> {
    let Some(user) = msg.from.as_ref() else {
        debug!(chat_id = %msg.chat.id, "Ignoring message without sender");
        return Ok(());
    };
    let sender = Sender {
        user_id: user.id.0,
        username: user.username.clone(),
    };

    let input = message_input(&msg);
    if let Input::Command(command) = &input {
        if command.is_admin() {
            return handle_admin_command(&bot, msg.chat.id, &deps, &sender, command.clone()).await;
        }
    }

    let state = dialogue.get_or_default().await?;
    let transition = deps.engine.handle(&sender, state, input).await;
    apply_transition(&bot, msg.chat.id, &dialogue, transition).await
}

async fn handle_admin_command(
    bot: &Bot,
    chat_id: ChatId,
    deps: &BotDeps,
    sender: &Sender,
    command: Command,
) -> Result<()> {
    if !deps.is_admin(sender.user_id) {
        warn!(user_id = sender.user_id, command = ?command, "Admin command from non-admin");
        bot.send_message(chat_id, t("admin-only")).await?;
        return Ok(());
    }

    let response = match command {
        Command::Usage(AdminUsage::RequestFeedback) => t("feedback-usage"),
        Command::Usage(AdminUsage::SendRating) => t("send-rating-usage"),
        Command::Usage(AdminUsage::InvalidChatId) => t("invalid-chat-id"),
        Command::RequestFeedback { chat_id: target, professional_ids } => {
            let user_id = target as u64;
            let ids = professional_ids.join(", ");
            match deps.feedback.request_feedback(user_id, professional_ids).await {
                Ok(reply) => match send_feedback_reply(bot, ChatId(target), &reply).await {
                    Ok(_) => {
                        info!(admin = sender.user_id, target, ids = %ids, "Feedback request sent");
                        t_args("feedback-sent", &[("chat", target.to_string().into()), ("ids", ids.into())])
                    }
                    Err(e) => {
                        warn!(target, error = %e, "Feedback request not delivered");
                        deps.feedback.sessions().remove(&user_id).await;
                        t_args("delivery-failed", &[("error", e.to_string().into())])
                    }
                },
                Err(RequestRefusal::OptedOut) => t_args("user-opted-out", &[("chat", target.to_string().into())]),
            }
        }
        Command::SendRating {
            chat_id: target,
            professional_id,
        } => match deps.feedback.request_rating(target as u64, &professional_id).await {
            Ok(reply) => match send_feedback_reply(bot, ChatId(target), &reply).await {
                Ok(_) => {
                    info!(admin = sender.user_id, target, professional_id = %professional_id, "Rating request sent");
                    t_args(
                        "rating-request-sent",
                        &[("chat", target.to_string().into()), ("id", professional_id.into())],
                    )
                }
                Err(e) => {
                    warn!(target, error = %e, "Rating request not delivered");
                    t_args("delivery-failed", &[("error", e.to_string().into())])
                }
            },
            Err(RequestRefusal::OptedOut) => t_args("user-opted-out", &[("chat", target.to_string().into())]),
        },
        Command::Reload => match deps.feedback.directory().reload(deps.engine.registry()).await {
            Ok(count) => t_args("directory-reloaded", &[("count", count.to_string().into())]),
            Err(e) => {
                warn!(error = %e, "Directory reload failed");
                t("directory-reload-failed")
            }
        },
        _ => return Ok(()),
    };

    bot.send_message(chat_id, response).await?;
    Ok(())
}
