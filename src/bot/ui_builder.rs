//! UI Builder module for creating keyboards and rendering replies

use teloxide::types::{
    ButtonRequest, InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton, KeyboardMarkup, KeyboardRemove,
    ReplyMarkup,
};

use crate::catalog::{EDIT_CANCEL_CALLBACK, FIELD_CATALOG};
use crate::conversation::{Keyboard, Reply};
use crate::feedback::{
    FeedbackMarkup, FeedbackReply, Professional, END_RATING_CALLBACK, IGNORE_CALLBACK, NO_CONTACT_CALLBACK,
    OPT_OUT_CALLBACK, RATE_ANOTHER_CALLBACK, RATE_PREFIX, SELECT_PREFIX, WILL_CONTACT_CALLBACK,
};
use crate::localization::{label, label_args, t_args};

pub const DONE_BUTTON: &str = "Done ጨርሻያለው✅ ";
pub const SKIP_BUTTON: &str = "Skip እለፍ⏭️";
pub const YES_BUTTON: &str = "Yes አዎ✅";
pub const NO_BUTTON: &str = "No አይ❌";
pub const SHARE_LOCATION_BUTTON: &str = "Share Location / አካባቢዎን ያጋሩ";
pub const LOCATION_SKIP_BUTTON: &str = "Skip / አሳልፍ";

const MAIN_MENU: [&[&str]; 3] = [
    &["/register ምዝገባ", "/editprofile መረጃ ያስተካክሉ"],
    &["/profile መረጃን አሳይ ", "/deleteprofile መረጃ ሰርዝ"],
    &["/comment አስተያየት"],
];
const SKIP_DONE: [&[&str]; 1] = [&[DONE_BUTTON, SKIP_BUTTON]];
const YES_NO: [&[&str]; 1] = [&[YES_BUTTON, NO_BUTTON]];

fn text_keyboard(rows: &[&[&str]]) -> KeyboardMarkup {
    KeyboardMarkup::new(
        rows.iter()
            .map(|row| row.iter().map(|text| KeyboardButton::new(*text)).collect::<Vec<_>>())
            .collect::<Vec<_>>(),
    )
    .resize_keyboard()
}

pub fn main_menu_keyboard() -> KeyboardMarkup {
    text_keyboard(&MAIN_MENU)
}

pub fn skip_done_keyboard() -> KeyboardMarkup {
    text_keyboard(&SKIP_DONE).one_time_keyboard()
}

pub fn yes_no_keyboard() -> KeyboardMarkup {
    text_keyboard(&YES_NO).one_time_keyboard()
}

pub fn share_location_keyboard() -> KeyboardMarkup {
    KeyboardMarkup::new(vec![
        vec![KeyboardButton::new(SHARE_LOCATION_BUTTON).request(ButtonRequest::Location)],
        vec![KeyboardButton::new(LOCATION_SKIP_BUTTON)],
    ])
    .resize_keyboard()
    .one_time_keyboard()
}

/// One button per catalog field, then cancel
pub fn edit_menu_keyboard() -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = FIELD_CATALOG
        .iter()
        .map(|spec| vec![InlineKeyboardButton::callback(label(spec.label_key), spec.callback)])
        .collect();
    rows.push(vec![InlineKeyboardButton::callback(
        format!("❌ {}", label("edit-cancel-button")),
        EDIT_CANCEL_CALLBACK,
    )]);
    InlineKeyboardMarkup::new(rows)
}

/// Markup for a conversation keyboard, `None` to leave the current one
pub fn reply_markup(keyboard: Keyboard) -> Option<ReplyMarkup> {
    let markup = match keyboard {
        Keyboard::Keep => return None,
        Keyboard::MainMenu => ReplyMarkup::Keyboard(main_menu_keyboard()),
        Keyboard::Remove => ReplyMarkup::KeyboardRemove(KeyboardRemove::new()),
        Keyboard::SkipDone => ReplyMarkup::Keyboard(skip_done_keyboard()),
        Keyboard::YesNo => ReplyMarkup::Keyboard(yes_no_keyboard()),
        Keyboard::ShareLocation => ReplyMarkup::Keyboard(share_location_keyboard()),
        Keyboard::EditMenu => ReplyMarkup::InlineKeyboard(edit_menu_keyboard()),
    };
    Some(markup)
}

/// Bilingual text of a conversation reply
pub fn render(reply: &Reply) -> String {
    t_args(reply.key, &reply.args)
}

fn professional_button(professional: &Professional) -> InlineKeyboardButton {
    InlineKeyboardButton::callback(
        label_args("feedback-button-contacted", &[("name", professional.name.clone().into())]),
        format!("{SELECT_PREFIX}{}", professional.id),
    )
}

pub fn star_keyboard(professional_id: &str) -> InlineKeyboardMarkup {
    let stars = (1..=5)
        .map(|n| InlineKeyboardButton::callback(format!("⭐ {n}"), format!("{RATE_PREFIX}{professional_id}_{n}")))
        .collect::<Vec<_>>();
    InlineKeyboardMarkup::new(vec![stars])
}

pub fn feedback_markup(markup: &FeedbackMarkup) -> Option<InlineKeyboardMarkup> {
    let keyboard = match markup {
        FeedbackMarkup::None => return None,
        FeedbackMarkup::Offer(professionals) => {
            let mut rows = vec![
                vec![InlineKeyboardButton::callback(label("feedback-button-no-contact"), NO_CONTACT_CALLBACK)],
                vec![InlineKeyboardButton::callback(
                    label("feedback-button-will-contact"),
                    WILL_CONTACT_CALLBACK,
                )],
                vec![InlineKeyboardButton::callback(label("feedback-button-opt-out"), OPT_OUT_CALLBACK)],
            ];
            if !professionals.is_empty() {
                rows.push(vec![InlineKeyboardButton::callback(
                    label("feedback-separator"),
                    IGNORE_CALLBACK,
                )]);
                rows.extend(professionals.iter().map(|p| vec![professional_button(p)]));
            }
            InlineKeyboardMarkup::new(rows)
        }
        FeedbackMarkup::Pick(professionals) => {
            let mut rows: Vec<Vec<InlineKeyboardButton>> =
                professionals.iter().map(|p| vec![professional_button(p)]).collect();
            rows.push(vec![InlineKeyboardButton::callback(
                label("followup-button-end"),
                END_RATING_CALLBACK,
            )]);
            InlineKeyboardMarkup::new(rows)
        }
        FeedbackMarkup::Stars(professional) => star_keyboard(&professional.id),
        FeedbackMarkup::FollowUp => InlineKeyboardMarkup::new(vec![vec![
            InlineKeyboardButton::callback(label("followup-button-rate-another"), RATE_ANOTHER_CALLBACK),
            InlineKeyboardButton::callback(label("followup-button-end"), END_RATING_CALLBACK),
        ]]),
    };
    Some(keyboard)
}

pub fn render_feedback(reply: &FeedbackReply) -> String {
    t_args(reply.key, &reply.args)
}
