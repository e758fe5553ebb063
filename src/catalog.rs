//! # Field Catalog Module
//!
//! Static table describing every user-editable field: where it is stored,
//! how it is prompted, how its input is validated and which conversation
//! state collects it. Registration walks the table in order; the edit menu
//! offers one button per entry.

use serde::{Deserialize, Serialize};

use crate::errors::CatalogError;
use crate::registrant::{Column, ColumnMap};

/// Fields a registrant provides and may later edit
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EditableField {
    FullName,
    Profession,
    Phone,
    Location,
    RegionCityWoreda,
    Testimonials,
    EducationalDocs,
}

/// Validation applied to typed values
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextRule {
    FreeText,
    Phone,
}

/// Remote folders documents can be uploaded to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum UploadFolder {
    Testimonials,
    Education,
}

/// Kind of input a field collects. Also decides the edit-flow state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputKind {
    Text(TextRule),
    Location,
    Files(UploadFolder),
}

/// One catalog entry
#[derive(Debug)]
pub struct FieldSpec {
    pub field: EditableField,
    /// Inline button payload in the edit menu
    pub callback: &'static str,
    /// Localization key of the edit-menu button label
    pub label_key: &'static str,
    /// Localization key of the registration prompt
    pub register_prompt_key: &'static str,
    /// Localization key of the edit prompt
    pub edit_prompt_key: &'static str,
    pub column: Column,
    pub input: InputKind,
}

/// Callback payload of the edit menu's cancel button
pub const EDIT_CANCEL_CALLBACK: &str = "edit_cancel";

/// The catalog, in registration order
pub static FIELD_CATALOG: [FieldSpec; 7] = [
    FieldSpec {
        field: EditableField::FullName,
        callback: "edit_name",
        label_key: "field-full-name",
        register_prompt_key: "register-prompt-full-name",
        edit_prompt_key: "edit-prompt-full-name",
        column: Column::FullName,
        input: InputKind::Text(TextRule::FreeText),
    },
    FieldSpec {
        field: EditableField::Profession,
        callback: "edit_profession",
        label_key: "field-profession",
        register_prompt_key: "register-prompt-profession",
        edit_prompt_key: "edit-prompt-profession",
        column: Column::Profession,
        input: InputKind::Text(TextRule::FreeText),
    },
    FieldSpec {
        field: EditableField::Phone,
        callback: "edit_phone",
        label_key: "field-phone",
        register_prompt_key: "register-prompt-phone",
        edit_prompt_key: "edit-prompt-phone",
        column: Column::Phone,
        input: InputKind::Text(TextRule::Phone),
    },
    FieldSpec {
        field: EditableField::Location,
        callback: "edit_location",
        label_key: "field-location",
        register_prompt_key: "register-prompt-location",
        edit_prompt_key: "edit-prompt-location",
        column: Column::Location,
        input: InputKind::Location,
    },
    FieldSpec {
        field: EditableField::RegionCityWoreda,
        callback: "edit_address",
        label_key: "field-address",
        register_prompt_key: "register-prompt-address",
        edit_prompt_key: "edit-prompt-address",
        column: Column::RegionCityWoreda,
        input: InputKind::Text(TextRule::FreeText),
    },
    FieldSpec {
        field: EditableField::Testimonials,
        callback: "edit_testimonials",
        label_key: "field-testimonials",
        register_prompt_key: "register-prompt-testimonials",
        edit_prompt_key: "edit-prompt-testimonials",
        column: Column::Testimonials,
        input: InputKind::Files(UploadFolder::Testimonials),
    },
    FieldSpec {
        field: EditableField::EducationalDocs,
        callback: "edit_education",
        label_key: "field-education",
        register_prompt_key: "register-prompt-education",
        edit_prompt_key: "edit-prompt-education",
        column: Column::EducationalDocs,
        input: InputKind::Files(UploadFolder::Education),
    },
];

/// Catalog entry for a field
pub fn spec(field: EditableField) -> &'static FieldSpec {
    FIELD_CATALOG
        .iter()
        .find(|s| s.field == field)
        .expect("every editable field has a catalog entry")
}

/// Catalog entry selected by an edit-menu button
pub fn by_callback(data: &str) -> Option<&'static FieldSpec> {
    FIELD_CATALOG.iter().find(|s| s.callback == data)
}

/// First field asked during registration
pub fn first_registration_field() -> EditableField {
    FIELD_CATALOG[0].field
}

/// Field asked after `field` during registration, `None` after the last one
pub fn next_registration_field(field: EditableField) -> Option<EditableField> {
    let index = FIELD_CATALOG.iter().position(|s| s.field == field)?;
    FIELD_CATALOG.get(index + 1).map(|s| s.field)
}

/// Reject a store layout that cannot hold every catalog field.
/// Runs once at startup so a bad layout never surfaces mid-conversation.
pub fn validate_catalog(columns: &ColumnMap) -> Result<(), CatalogError> {
    for spec in FIELD_CATALOG.iter() {
        if !columns.contains(spec.column) {
            return Err(CatalogError::MissingColumn {
                field: format!("{:?}", spec.field),
                column: spec.column,
            });
        }
    }

    for (field, column) in [("UserId", Column::UserId), ("Comment", Column::Comment)] {
        if !columns.contains(column) {
            return Err(CatalogError::MissingColumn {
                field: field.to_string(),
                column,
            });
        }
    }

    Ok(())
}
