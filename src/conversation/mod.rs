//! Conversation engine
//!
//! Platform-independent state machine behind the registration, edit, profile,
//! delete and comment flows. [`Engine::handle`] takes the current
//! [`DialogueState`] and one [`Input`] and returns a [`Transition`]: the
//! replies to send and the state to continue in. The Telegram layer renders
//! replies and persists the state.
//!
//! - `registration`: the catalog-driven registration sequence
//! - `edit`: field selection and single-field updates
//! - `account`: profile view, deletion and comments

mod account;
mod edit;
mod registration;

use std::sync::Arc;

use tracing::{debug, warn};

use crate::catalog::{self, EditableField, FieldSpec, InputKind, TextRule};
use crate::commands::Command;
use crate::dialogue::DialogueState;
use crate::errors::{StoreError, UploadError};
use crate::localization::MessageArg;
use crate::registrant::Registrant;
use crate::registry::{Registry, RowRef};
use crate::upload::{InboundFile, UploadRelay};
use crate::validation::{is_valid_phone_number, validate_free_text, TextRejection, MAX_TEXT_LENGTH};

/// Who sent the input
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sender {
    pub user_id: u64,
    pub username: Option<String>,
}

/// One inbound event, already stripped of transport details
#[derive(Clone, Debug, PartialEq)]
pub enum Input {
    Text(String),
    Location { latitude: f64, longitude: f64 },
    File(InboundFile),
    /// Inline button payload
    Callback(String),
    Command(Command),
    /// Stickers, voice notes and anything else the flows cannot use
    Unsupported,
}

/// Keyboard attached to a reply
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Keyboard {
    /// Leave the current keyboard in place
    Keep,
    MainMenu,
    Remove,
    SkipDone,
    YesNo,
    ShareLocation,
    /// Inline field picker built from the catalog
    EditMenu,
}

/// A message to send: localization key, arguments and keyboard
#[derive(Clone, Debug, PartialEq)]
pub struct Reply {
    pub key: &'static str,
    pub args: Vec<(&'static str, MessageArg)>,
    pub keyboard: Keyboard,
}

impl Reply {
    pub fn new(key: &'static str, keyboard: Keyboard) -> Self {
        Self {
            key,
            args: Vec::new(),
            keyboard,
        }
    }

    pub fn arg(mut self, name: &'static str, value: impl Into<MessageArg>) -> Self {
        self.args.push((name, value.into()));
        self
    }
}

/// Where the conversation goes after a transition
#[derive(Clone, Debug, PartialEq)]
pub enum Step {
    Continue(DialogueState),
    /// Discard the session
    End,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Transition {
    pub replies: Vec<Reply>,
    pub step: Step,
}

impl Transition {
    /// Finish the conversation
    pub fn end(replies: Vec<Reply>) -> Self {
        Self {
            replies,
            step: Step::End,
        }
    }

    /// Continue in `state`
    pub fn next(state: DialogueState, replies: Vec<Reply>) -> Self {
        Self {
            replies,
            step: Step::Continue(state),
        }
    }

    /// State the conversation continues in, `None` when it ended
    pub fn state(&self) -> Option<&DialogueState> {
        match &self.step {
            Step::Continue(state) => Some(state),
            Step::End => None,
        }
    }
}

/// The conversation engine
pub struct Engine {
    registry: Arc<Registry>,
    relay: Arc<UploadRelay>,
}

impl Engine {
    pub fn new(registry: Arc<Registry>, relay: Arc<UploadRelay>) -> Self {
        Self { registry, relay }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Advance the conversation by one input
    pub async fn handle(&self, sender: &Sender, state: DialogueState, input: Input) -> Transition {
        debug!(user_id = sender.user_id, state = ?state, input = ?input, "Conversation input");

        let input = match input {
            Input::Command(command) => return self.handle_command(sender, state, command).await,
            other => other,
        };

        match state {
            DialogueState::Idle => Transition::end(vec![Reply::new("use-menu", Keyboard::MainMenu)]),
            DialogueState::Registering { field, draft } => {
                registration::step(self, sender, field, draft, input).await
            }
            DialogueState::ChoosingField { row } => edit::choose(row, input),
            DialogueState::EditingText { row, field } => edit::text(self, row, field, input).await,
            DialogueState::EditingLocation { row } => edit::location(self, row, input).await,
            DialogueState::EditingFiles { row, field, links } => {
                edit::files(self, row, field, links, input).await
            }
            DialogueState::ConfirmingDelete { row } => account::confirm_delete(self, row, input).await,
            DialogueState::Commenting { row } => account::save_comment(self, row, input).await,
        }
    }

    async fn handle_command(&self, sender: &Sender, state: DialogueState, command: Command) -> Transition {
        match command {
            Command::Cancel => {
                return Transition::end(vec![Reply::new("cancelled", Keyboard::MainMenu)]);
            }
            Command::Start => {
                return Transition::end(vec![Reply::new("welcome", Keyboard::MainMenu)]);
            }
            _ if state.is_active() => {
                return Transition::next(state, vec![Reply::new("finish-or-cancel", Keyboard::Keep)]);
            }
            _ => {}
        }

        match command {
            Command::Register => registration::start(self, sender).await,
            Command::EditProfile => edit::start(self, sender).await,
            Command::Profile => account::profile(self, sender).await,
            Command::DeleteProfile => account::start_delete(self, sender).await,
            Command::Comment => account::start_comment(self, sender).await,
            _ => Transition::end(vec![Reply::new("use-menu", Keyboard::MainMenu)]),
        }
    }

    /// The sender's record, or the transition that ends the flow when there
    /// is none or the store cannot be read
    async fn registered(&self, sender: &Sender) -> Result<(RowRef, Registrant), Transition> {
        match self.registry.lookup(sender.user_id).await {
            Ok(Some(found)) => Ok(found),
            Ok(None) => Err(Transition::end(vec![Reply::new(
                "not-registered",
                Keyboard::MainMenu,
            )])),
            Err(e) => {
                warn!(user_id = sender.user_id, error = %e, "Record lookup failed");
                Err(Transition::end(vec![Reply::new(
                    "service-unavailable",
                    Keyboard::MainMenu,
                )]))
            }
        }
    }
}

/// Validate a typed answer, or the reply asking for it again
fn accept_text(rule: TextRule, text: &str) -> Result<String, Reply> {
    match rule {
        TextRule::Phone => {
            let trimmed = text.trim();
            if is_valid_phone_number(trimmed) {
                Ok(trimmed.to_string())
            } else {
                Err(Reply::new("invalid-phone", Keyboard::Keep))
            }
        }
        TextRule::FreeText => validate_free_text(text).map_err(|rejection| match rejection {
            TextRejection::Empty => Reply::new("text-empty", Keyboard::Keep),
            TextRejection::TooLong => {
                Reply::new("text-too-long", Keyboard::Keep).arg("max", MAX_TEXT_LENGTH.to_string())
            }
        }),
    }
}

/// Keyboard shown with a field's prompt
fn prompt_keyboard(spec: &FieldSpec) -> Keyboard {
    match spec.input {
        InputKind::Text(_) => Keyboard::Remove,
        InputKind::Location => Keyboard::ShareLocation,
        InputKind::Files(_) => Keyboard::SkipDone,
    }
}

fn upload_failure(error: &UploadError) -> Reply {
    match error {
        UploadError::TooLarge { limit, .. } => Reply::new("upload-too-large", Keyboard::SkipDone)
            .arg("limit", (limit / (1024 * 1024)).to_string()),
        _ => Reply::new("upload-failed", Keyboard::SkipDone),
    }
}

/// Reply for a failed write; `fallback` names the flow's own failure message
fn store_failure(error: &StoreError, fallback: &'static str) -> Reply {
    match error {
        StoreError::StaleReference { .. } => Reply::new("record-missing", Keyboard::MainMenu),
        _ => Reply::new(fallback, Keyboard::MainMenu),
    }
}

/// Label argument naming a field in the user's language
fn field_arg(field: EditableField) -> MessageArg {
    MessageArg::Message(catalog::spec(field).label_key)
}
