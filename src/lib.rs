//! # Debo Registration Bot
//!
//! A Telegram bot that registers Ethiopian professionals into a spreadsheet
//! backed registry, lets them maintain their record, and collects ratings
//! for them through a feedback workflow.

pub mod bot;
pub mod catalog;
pub mod circuit_breaker;
pub mod commands;
pub mod config;
pub mod conversation;
pub mod dialogue;
pub mod directory;
pub mod errors;
pub mod feedback;
pub mod google;
pub mod localization;
pub mod registrant;
pub mod registry;
pub mod retry;
pub mod session;
pub mod store;
pub mod upload;
pub mod user_locks;
pub mod validation;
