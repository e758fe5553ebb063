//! Profile view, deletion and comments.

use tracing::{info, warn};

use super::{store_failure, Engine, Input, Keyboard, Reply, Sender, Transition};
use crate::dialogue::DialogueState;
use crate::registrant::Column;
use crate::registry::RowRef;
use crate::validation::{classify_confirmation, validate_free_text, Confirmation, TextRejection};

/// `/profile`
pub(super) async fn profile(engine: &Engine, sender: &Sender) -> Transition {
    let (_, record) = match engine.registered(sender).await {
        Ok(found) => found,
        Err(transition) => return transition,
    };

    if record.full_name.is_empty() || record.profession.is_empty() {
        return Transition::end(vec![Reply::new("profile-incomplete", Keyboard::MainMenu)]);
    }

    let summary = Reply::new("profile-summary", Keyboard::MainMenu)
        .arg("name", record.full_name)
        .arg("profession", record.profession)
        .arg("phone", record.phone)
        .arg("location", record.location)
        .arg("address", record.region_city_woreda)
        .arg("testimonials", record.testimonial_links.len().to_string())
        .arg("education", record.education_links.len().to_string());
    Transition::end(vec![summary])
}

/// `/deleteprofile`
pub(super) async fn start_delete(engine: &Engine, sender: &Sender) -> Transition {
    match engine.registered(sender).await {
        Ok((row, _)) => Transition::next(
            DialogueState::ConfirmingDelete { row },
            vec![Reply::new("delete-confirm", Keyboard::YesNo)],
        ),
        Err(transition) => transition,
    }
}

/// Anything other than a yes cancels
pub(super) async fn confirm_delete(engine: &Engine, row: RowRef, input: Input) -> Transition {
    let answer = match &input {
        Input::Text(text) => classify_confirmation(text),
        _ => Confirmation::No,
    };

    if answer == Confirmation::No {
        return Transition::end(vec![Reply::new("delete-cancelled", Keyboard::MainMenu)]);
    }

    match engine.registry.delete(&row).await {
        Ok(()) => {
            info!(user_id = row.user_id, "Profile deleted");
            Transition::end(vec![Reply::new("profile-deleted", Keyboard::MainMenu)])
        }
        Err(e) => {
            warn!(user_id = row.user_id, error = %e, "Profile deletion failed");
            Transition::end(vec![store_failure(&e, "update-failed")])
        }
    }
}

/// `/comment`
pub(super) async fn start_comment(engine: &Engine, sender: &Sender) -> Transition {
    match engine.registered(sender).await {
        Ok((row, _)) => Transition::next(
            DialogueState::Commenting { row },
            vec![Reply::new("comment-prompt", Keyboard::Remove)],
        ),
        Err(transition) => transition,
    }
}

pub(super) async fn save_comment(engine: &Engine, row: RowRef, input: Input) -> Transition {
    let Input::Text(text) = input else {
        return Transition::next(
            DialogueState::Commenting { row },
            vec![Reply::new("comment-prompt", Keyboard::Keep)],
        );
    };

    let comment = match validate_free_text(&text) {
        Ok(comment) => comment,
        Err(TextRejection::Empty) => {
            return Transition::next(
                DialogueState::Commenting { row },
                vec![Reply::new("comment-prompt", Keyboard::Keep)],
            );
        }
        Err(TextRejection::TooLong) => {
            return Transition::next(
                DialogueState::Commenting { row },
                vec![Reply::new("text-too-long", Keyboard::Keep)
                    .arg("max", crate::validation::MAX_TEXT_LENGTH.to_string())],
            );
        }
    };

    match engine.registry.update_field(&row, Column::Comment, &comment).await {
        Ok(_) => {
            info!(user_id = row.user_id, "Comment saved");
            Transition::end(vec![Reply::new("comment-saved", Keyboard::MainMenu)])
        }
        Err(e) => {
            warn!(user_id = row.user_id, error = %e, "Saving comment failed");
            Transition::end(vec![store_failure(&e, "update-failed")])
        }
    }
}
