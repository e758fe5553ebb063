//! Registration flow: one prompt per catalog field, then a single upsert.

use tracing::{error, info, warn};

use super::{accept_text, prompt_keyboard, upload_failure, Engine, Input, Keyboard, Reply, Sender, Transition};
use crate::catalog::{self, EditableField, InputKind};
use crate::dialogue::{DialogueState, RegistrationDraft};
use crate::registrant::LOCATION_NOT_SHARED;
use crate::validation::{classify, format_coordinates, parse_coordinates, LoopToken};

fn prompt(field: EditableField) -> Reply {
    let spec = catalog::spec(field);
    Reply::new(spec.register_prompt_key, prompt_keyboard(spec))
}

/// `/register`: refuse when a record exists, otherwise ask the first field
pub(super) async fn start(engine: &Engine, sender: &Sender) -> Transition {
    if engine.registry.find_by_user_id(sender.user_id).await.is_some() {
        info!(user_id = sender.user_id, "Registration refused, user already registered");
        return Transition::end(vec![Reply::new("already-registered", Keyboard::MainMenu)]);
    }

    info!(user_id = sender.user_id, "Registration started");
    let field = catalog::first_registration_field();
    Transition::next(
        DialogueState::Registering {
            field,
            draft: RegistrationDraft::default(),
        },
        vec![prompt(field)],
    )
}

pub(super) async fn step(
    engine: &Engine,
    sender: &Sender,
    field: EditableField,
    mut draft: RegistrationDraft,
    input: Input,
) -> Transition {
    let spec = catalog::spec(field);

    match spec.input {
        InputKind::Text(rule) => {
            let Input::Text(text) = input else {
                return Transition::next(DialogueState::Registering { field, draft }, vec![prompt(field)]);
            };
            match accept_text(rule, &text) {
                Ok(value) => {
                    draft.set_text(field, value);
                    advance(engine, sender, field, draft, Vec::new()).await
                }
                Err(reply) => Transition::next(DialogueState::Registering { field, draft }, vec![reply]),
            }
        }
        InputKind::Location => {
            let value = match input {
                Input::Location { latitude, longitude } => format_coordinates(latitude, longitude),
                // "Skip" and any other text that is not a coordinate pair
                Input::Text(text) => {
                    parse_coordinates(&text).unwrap_or_else(|| LOCATION_NOT_SHARED.to_string())
                }
                _ => {
                    return Transition::next(DialogueState::Registering { field, draft }, vec![prompt(field)]);
                }
            };
            draft.set_text(field, value);
            advance(engine, sender, field, draft, Vec::new()).await
        }
        InputKind::Files(folder) => match input {
            Input::File(file) => {
                let reply = match engine.relay.relay(&file, folder).await {
                    Ok(link) => {
                        if let Some(links) = draft.links_mut(field) {
                            links.push(link);
                        }
                        Reply::new("file-received", Keyboard::SkipDone)
                    }
                    Err(e) => {
                        warn!(user_id = sender.user_id, field = ?field, error = %e, "File relay failed");
                        upload_failure(&e)
                    }
                };
                Transition::next(DialogueState::Registering { field, draft }, vec![reply])
            }
            Input::Text(text) => match classify(&text) {
                LoopToken::Skip => advance(engine, sender, field, draft, Vec::new()).await,
                LoopToken::Done => {
                    let mut notices = Vec::new();
                    if draft.links_mut(field).map_or(true, |links| links.is_empty()) {
                        notices.push(Reply::new("no-files-uploaded", Keyboard::Keep));
                    }
                    advance(engine, sender, field, draft, notices).await
                }
                LoopToken::Other => Transition::next(
                    DialogueState::Registering { field, draft },
                    vec![Reply::new("upload-or-use-buttons", Keyboard::SkipDone)],
                ),
            },
            _ => Transition::next(
                DialogueState::Registering { field, draft },
                vec![Reply::new("upload-or-use-buttons", Keyboard::SkipDone)],
            ),
        },
    }
}

/// Ask the field after `field`, or save the record after the last one
async fn advance(
    engine: &Engine,
    sender: &Sender,
    field: EditableField,
    draft: RegistrationDraft,
    mut replies: Vec<Reply>,
) -> Transition {
    if let Some(next) = catalog::next_registration_field(field) {
        replies.push(prompt(next));
        return Transition::next(DialogueState::Registering { field: next, draft }, replies);
    }

    let record = draft.into_registrant(sender.user_id, sender.username.as_deref());
    match engine.registry.upsert(&record).await {
        Ok(outcome) => {
            info!(user_id = sender.user_id, outcome = ?outcome, "Registration complete");
            replies.push(Reply::new("registration-complete", Keyboard::MainMenu));
        }
        Err(e) => {
            error!(user_id = sender.user_id, error = %e, "Failed to save registration");
            replies.push(Reply::new("registration-failed", Keyboard::MainMenu));
        }
    }
    Transition::end(replies)
}
