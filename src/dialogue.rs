//! Registration dialogue module holding per-chat conversation state.

use serde::{Deserialize, Serialize};
use teloxide::dispatching::dialogue::Dialogue;

use crate::catalog::EditableField;
use crate::registrant::{Registrant, LOCATION_NOT_SHARED, USERNAME_NOT_SET};
use crate::registry::RowRef;
use crate::session::SessionStorage;

/// Conversation state of one chat
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub enum DialogueState {
    #[default]
    Idle,
    /// Walking the catalog; `field` is the one being asked for
    Registering {
        field: EditableField,
        draft: RegistrationDraft,
    },
    /// Edit menu shown, waiting for a field button
    ChoosingField { row: RowRef },
    EditingText { row: RowRef, field: EditableField },
    EditingLocation { row: RowRef },
    /// Collecting replacement documents for a file field
    EditingFiles {
        row: RowRef,
        field: EditableField,
        links: Vec<String>,
    },
    ConfirmingDelete { row: RowRef },
    Commenting { row: RowRef },
}

impl DialogueState {
    /// Whether a multi-step conversation is in progress
    pub fn is_active(&self) -> bool {
        !matches!(self, DialogueState::Idle)
    }
}

/// Answers collected so far during registration
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RegistrationDraft {
    pub full_name: String,
    pub profession: String,
    pub phone: String,
    pub location: String,
    pub region_city_woreda: String,
    pub testimonial_links: Vec<String>,
    pub education_links: Vec<String>,
}

impl RegistrationDraft {
    /// Store a typed answer. File fields are filled through [`Self::links_mut`].
    pub fn set_text(&mut self, field: EditableField, value: String) {
        match field {
            EditableField::FullName => self.full_name = value,
            EditableField::Profession => self.profession = value,
            EditableField::Phone => self.phone = value,
            EditableField::Location => self.location = value,
            EditableField::RegionCityWoreda => self.region_city_woreda = value,
            EditableField::Testimonials | EditableField::EducationalDocs => {}
        }
    }

    /// Link list of a file field
    pub fn links_mut(&mut self, field: EditableField) -> Option<&mut Vec<String>> {
        match field {
            EditableField::Testimonials => Some(&mut self.testimonial_links),
            EditableField::EducationalDocs => Some(&mut self.education_links),
            _ => None,
        }
    }

    /// Finished record for `user_id`
    pub fn into_registrant(self, user_id: u64, username: Option<&str>) -> Registrant {
        let location = if self.location.is_empty() {
            LOCATION_NOT_SHARED.to_string()
        } else {
            self.location
        };

        Registrant {
            user_id,
            username: username.unwrap_or(USERNAME_NOT_SET).to_string(),
            full_name: self.full_name,
            profession: self.profession,
            phone: self.phone,
            location,
            region_city_woreda: self.region_city_woreda,
            comment: String::new(),
            testimonial_links: self.testimonial_links,
            education_links: self.education_links,
        }
    }
}

/// Dialogue handle used by the handlers
pub type SessionDialogue = Dialogue<DialogueState, SessionStorage<DialogueState>>;
