//! Field edit flow: pick a field from the inline menu, send the new value,
//! one cell is written.

use tracing::{info, warn};

use super::{
    accept_text, field_arg, prompt_keyboard, store_failure, upload_failure, Engine, Input, Keyboard, Reply,
    Sender, Transition,
};
use crate::catalog::{self, EditableField, InputKind, EDIT_CANCEL_CALLBACK};
use crate::dialogue::DialogueState;
use crate::registrant::{join_links, LOCATION_NOT_SHARED};
use crate::registry::RowRef;
use crate::validation::{classify, format_coordinates, parse_coordinates, LoopToken};

fn prompt(field: EditableField) -> Reply {
    let spec = catalog::spec(field);
    Reply::new(spec.edit_prompt_key, prompt_keyboard(spec))
}

/// `/editprofile`: show the field menu to registered users
pub(super) async fn start(engine: &Engine, sender: &Sender) -> Transition {
    let (row, _) = match engine.registered(sender).await {
        Ok(found) => found,
        Err(transition) => return transition,
    };

    Transition::next(
        DialogueState::ChoosingField { row },
        vec![Reply::new("edit-menu-title", Keyboard::EditMenu)],
    )
}

/// A button of the field menu was pressed
pub(super) fn choose(row: RowRef, input: Input) -> Transition {
    let Input::Callback(data) = input else {
        return Transition::next(
            DialogueState::ChoosingField { row },
            vec![Reply::new("edit-choose-field", Keyboard::Keep)],
        );
    };

    if data == EDIT_CANCEL_CALLBACK {
        return Transition::end(vec![Reply::new("edit-cancelled", Keyboard::MainMenu)]);
    }

    let Some(spec) = catalog::by_callback(&data) else {
        warn!(user_id = row.user_id, callback = %data, "Unknown edit menu selection");
        return Transition::next(
            DialogueState::ChoosingField { row },
            vec![Reply::new("edit-choose-field", Keyboard::Keep)],
        );
    };

    let state = match spec.input {
        InputKind::Text(_) => DialogueState::EditingText { row, field: spec.field },
        InputKind::Location => DialogueState::EditingLocation { row },
        InputKind::Files(_) => DialogueState::EditingFiles {
            row,
            field: spec.field,
            links: Vec::new(),
        },
    };
    Transition::next(state, vec![prompt(spec.field)])
}

pub(super) async fn text(engine: &Engine, row: RowRef, field: EditableField, input: Input) -> Transition {
    let spec = catalog::spec(field);
    let (InputKind::Text(rule), Input::Text(text)) = (spec.input, input) else {
        return Transition::next(DialogueState::EditingText { row, field }, vec![prompt(field)]);
    };

    match accept_text(rule, &text) {
        Ok(value) => commit(engine, row, field, &value, "field-updated").await,
        Err(reply) => Transition::next(DialogueState::EditingText { row, field }, vec![reply]),
    }
}

pub(super) async fn location(engine: &Engine, row: RowRef, input: Input) -> Transition {
    let value = match input {
        Input::Location { latitude, longitude } => format_coordinates(latitude, longitude),
        Input::Text(text) => parse_coordinates(&text).unwrap_or_else(|| LOCATION_NOT_SHARED.to_string()),
        _ => {
            return Transition::next(
                DialogueState::EditingLocation { row },
                vec![prompt(EditableField::Location)],
            );
        }
    };
    commit(engine, row, EditableField::Location, &value, "field-updated").await
}

/// Collect replacement documents; Done or Skip commits them
pub(super) async fn files(
    engine: &Engine,
    row: RowRef,
    field: EditableField,
    mut links: Vec<String>,
    input: Input,
) -> Transition {
    let InputKind::Files(folder) = catalog::spec(field).input else {
        return Transition::end(vec![Reply::new("unexpected-error", Keyboard::MainMenu)]);
    };

    match input {
        Input::File(file) => {
            let reply = match engine.relay.relay(&file, folder).await {
                Ok(link) => {
                    links.push(link);
                    Reply::new("file-received", Keyboard::SkipDone)
                }
                Err(e) => {
                    warn!(user_id = row.user_id, field = ?field, error = %e, "File relay failed");
                    upload_failure(&e)
                }
            };
            Transition::next(DialogueState::EditingFiles { row, field, links }, vec![reply])
        }
        Input::Text(text) => match classify(&text) {
            LoopToken::Done if links.is_empty() => Transition::end(vec![Reply::new(
                "files-unchanged",
                Keyboard::MainMenu,
            )
            .arg("field", field_arg(field))]),
            // Skip with nothing uploaded clears the stored links
            LoopToken::Done | LoopToken::Skip => commit(engine, row, field, &join_links(&links), "files-updated").await,
            LoopToken::Other => Transition::next(
                DialogueState::EditingFiles { row, field, links },
                vec![Reply::new("upload-or-use-buttons", Keyboard::SkipDone)],
            ),
        },
        _ => Transition::next(
            DialogueState::EditingFiles { row, field, links },
            vec![Reply::new("upload-or-use-buttons", Keyboard::SkipDone)],
        ),
    }
}

async fn commit(
    engine: &Engine,
    row: RowRef,
    field: EditableField,
    value: &str,
    success_key: &'static str,
) -> Transition {
    let column = catalog::spec(field).column;
    match engine.registry.update_field(&row, column, value).await {
        Ok(written) => {
            info!(user_id = written.user_id, row = written.index, field = ?field, "Field updated");
            Transition::end(vec![Reply::new(success_key, Keyboard::MainMenu).arg("field", field_arg(field))])
        }
        Err(e) => {
            warn!(user_id = row.user_id, field = ?field, error = %e, "Field update failed");
            Transition::end(vec![store_failure(&e, "update-failed")])
        }
    }
}
