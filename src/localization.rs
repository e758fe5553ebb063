//! # Localization Module
//!
//! English and Amharic Fluent resources compiled into the binary. Every user
//! facing message is shown in both languages: English first, Amharic below
//! it (or after a slash for button labels). Keys missing from the Amharic
//! resource are shown in English only.

use fluent_bundle::concurrent::FluentBundle;
use fluent_bundle::{FluentArgs, FluentResource, FluentValue};
use lazy_static::lazy_static;
use unic_langid::LanguageIdentifier;

const EN_RESOURCE: &str = include_str!("../locales/en/main.ftl");
const AM_RESOURCE: &str = include_str!("../locales/am/main.ftl");

/// Value substituted into a message placeholder
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MessageArg {
    /// Literal text, identical in every language
    Text(String),
    /// Another message, rendered in the same language as the outer one
    Message(&'static str),
}

impl From<String> for MessageArg {
    fn from(value: String) -> Self {
        MessageArg::Text(value)
    }
}

impl From<&str> for MessageArg {
    fn from(value: &str) -> Self {
        MessageArg::Text(value.to_string())
    }
}

/// Localization manager holding one bundle per language
pub struct LocalizationManager {
    english: FluentBundle<FluentResource>,
    amharic: FluentBundle<FluentResource>,
}

impl LocalizationManager {
    /// Build the bundles from the embedded resources
    pub fn new() -> Self {
        Self {
            english: Self::create_bundle("en", EN_RESOURCE),
            amharic: Self::create_bundle("am", AM_RESOURCE),
        }
    }

    fn create_bundle(locale: &str, source: &str) -> FluentBundle<FluentResource> {
        let langid: LanguageIdentifier = locale.parse().unwrap_or_default();
        let mut bundle = FluentBundle::new_concurrent(vec![langid]);
        bundle.set_use_isolating(false);

        let resource = FluentResource::try_new(source.to_string()).unwrap_or_else(|(resource, errors)| {
            tracing::error!(locale, errors = ?errors, "Fluent resource has syntax errors");
            resource
        });
        if let Err(errors) = bundle.add_resource(resource) {
            tracing::error!(locale, errors = ?errors, "Failed to add Fluent resource");
        }

        bundle
    }

    fn format(
        &self,
        bundle: &FluentBundle<FluentResource>,
        key: &str,
        args: &[(&str, MessageArg)],
    ) -> Option<String> {
        let message = bundle.get_message(key)?;
        let pattern = message.value()?;

        let mut fluent_args = FluentArgs::new();
        for (name, value) in args {
            let text = match value {
                MessageArg::Text(text) => text.clone(),
                MessageArg::Message(nested) => self
                    .format(bundle, nested, &[])
                    .or_else(|| self.format(&self.english, nested, &[]))
                    .unwrap_or_else(|| nested.to_string()),
            };
            fluent_args.set(*name, FluentValue::from(text));
        }

        let mut errors = vec![];
        let value = bundle.format_pattern(pattern, Some(&fluent_args), &mut errors);
        if !errors.is_empty() {
            tracing::warn!(key, errors = ?errors, "Fluent formatting errors");
        }
        Some(value.into_owned())
    }

    /// English rendering of `key`
    pub fn english(&self, key: &str, args: &[(&str, MessageArg)]) -> String {
        self.format(&self.english, key, args)
            .unwrap_or_else(|| format!("Missing translation: {key}"))
    }

    /// Amharic rendering of `key`, if translated
    pub fn amharic(&self, key: &str, args: &[(&str, MessageArg)]) -> Option<String> {
        self.format(&self.amharic, key, args)
    }

    /// Both languages joined by `separator`
    pub fn bilingual(&self, key: &str, args: &[(&str, MessageArg)], separator: &str) -> String {
        let english = self.english(key, args);
        match self.amharic(key, args) {
            Some(amharic) if amharic != english => format!("{english}{separator}{amharic}"),
            _ => english,
        }
    }
}

impl Default for LocalizationManager {
    fn default() -> Self {
        Self::new()
    }
}

lazy_static! {
    static ref LOCALIZATION: LocalizationManager = LocalizationManager::new();
}

/// Bilingual message, languages on separate lines
pub fn t(key: &str) -> String {
    t_args(key, &[])
}

/// Bilingual message with arguments, languages on separate lines
pub fn t_args(key: &str, args: &[(&str, MessageArg)]) -> String {
    LOCALIZATION.bilingual(key, args, "\n")
}

/// Bilingual short label for buttons: "English / Amharic"
pub fn label(key: &str) -> String {
    label_args(key, &[])
}

pub fn label_args(key: &str, args: &[(&str, MessageArg)]) -> String {
    LOCALIZATION.bilingual(key, args, " / ")
}
