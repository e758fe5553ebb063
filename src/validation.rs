//! # Input Validation Module
//!
//! Validators shared by the registration and edit flows: phone numbers,
//! bilingual done/skip and yes/no tokens, free text and coordinates.

use lazy_static::lazy_static;
use regex::Regex;

/// Longest accepted free-text answer, in characters
pub const MAX_TEXT_LENGTH: usize = 255;

// Accepted phone shape once separators are stripped
const PHONE_PATTERN: &str = r"^\+?\d{7,}$";
const COORDINATES_PATTERN: &str = r"^\s*(-?\d{1,3}(?:\.\d+)?)\s*[,;\s]\s*(-?\d{1,3}(?:\.\d+)?)\s*$";

lazy_static! {
    static ref PHONE_REGEX: Regex =
        Regex::new(PHONE_PATTERN).expect("Phone pattern should be valid");
    static ref PHONE_SEPARATORS: Regex =
        Regex::new(r"[()\s-]").expect("Phone separator pattern should be valid");
    static ref COORDINATES_REGEX: Regex =
        Regex::new(COORDINATES_PATTERN).expect("Coordinates pattern should be valid");
}

const SKIP_TOKENS: [&str; 3] = ["skip", "አሳልፍ", "እለፍ"];
const DONE_TOKENS: [&str; 3] = ["done", "ተጠናቋል", "ጨርሻ"];
const YES_TOKENS: [&str; 2] = ["yes", "አዎ"];

/// Classification of text sent inside a file-accumulation loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopToken {
    Done,
    Skip,
    Other,
}

/// Answer to a yes/no confirmation prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Yes,
    No,
}

/// Why a free-text answer was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextRejection {
    Empty,
    TooLong,
}

/// Check a phone number: optional leading `+`, then at least 7 digits once
/// parentheses, spaces and hyphens are removed
pub fn is_valid_phone_number(input: &str) -> bool {
    let cleaned = PHONE_SEPARATORS.replace_all(input, "");
    PHONE_REGEX.is_match(&cleaned)
}

/// Classify loop input. Matching is case-insensitive and by substring, so
/// keyboard labels such as "Skip እለፍ⏭️" are recognised. Skip wins over done.
pub fn classify(text: &str) -> LoopToken {
    let lowered = text.to_lowercase();
    if SKIP_TOKENS.iter().any(|t| lowered.contains(t)) {
        LoopToken::Skip
    } else if DONE_TOKENS.iter().any(|t| lowered.contains(t)) {
        LoopToken::Done
    } else {
        LoopToken::Other
    }
}

/// Classify a delete confirmation; anything that is not a yes is a no
pub fn classify_confirmation(text: &str) -> Confirmation {
    let lowered = text.to_lowercase();
    if YES_TOKENS.iter().any(|t| lowered.contains(t)) {
        Confirmation::Yes
    } else {
        Confirmation::No
    }
}

/// Validate a free-text answer (name, profession, address, comment)
pub fn validate_free_text(input: &str) -> Result<String, TextRejection> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(TextRejection::Empty);
    }

    if trimmed.chars().count() > MAX_TEXT_LENGTH {
        return Err(TextRejection::TooLong);
    }

    Ok(trimmed.to_string())
}

/// Format a coordinate pair the way the store keeps it
pub fn format_coordinates(latitude: f64, longitude: f64) -> String {
    format!("{latitude}, {longitude}")
}

/// Parse text that looks like "<lat>, <lon>" into the stored form
pub fn parse_coordinates(text: &str) -> Option<String> {
    let captures = COORDINATES_REGEX.captures(text)?;
    let latitude: f64 = captures.get(1)?.as_str().parse().ok()?;
    let longitude: f64 = captures.get(2)?.as_str().parse().ok()?;

    if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
        return None;
    }

    Some(format_coordinates(latitude, longitude))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phone_accepts_common_formats() {
        assert!(is_valid_phone_number("+251911123456"));
        assert!(is_valid_phone_number("0911000000"));
        assert!(is_valid_phone_number("(091) 100-0000"));
        assert!(is_valid_phone_number("+251 91 112 3456"));
        assert!(is_valid_phone_number("1234567"));
    }

    #[test]
    fn test_phone_rejects_bad_input() {
        assert!(!is_valid_phone_number("12345"));
        assert!(!is_valid_phone_number("abc1234567"));
        assert!(!is_valid_phone_number(""));
        assert!(!is_valid_phone_number("++2519111234"));
        assert!(!is_valid_phone_number("0911.000.000"));
    }

    #[test]
    fn test_classify_keyboard_labels() {
        assert_eq!(classify("Done ጨርሻያለው✅ "), LoopToken::Done);
        assert_eq!(classify("Skip እለፍ⏭️"), LoopToken::Skip);
        assert_eq!(classify("DONE"), LoopToken::Done);
        assert_eq!(classify("I am done now"), LoopToken::Done);
        assert_eq!(classify("hello"), LoopToken::Other);
    }

    #[test]
    fn test_skip_takes_precedence() {
        assert_eq!(classify("done, skip the rest"), LoopToken::Skip);
    }

    #[test]
    fn test_confirmation() {
        assert_eq!(classify_confirmation("Yes አዎ✅"), Confirmation::Yes);
        assert_eq!(classify_confirmation("አዎ"), Confirmation::Yes);
        assert_eq!(classify_confirmation("No አይ❌"), Confirmation::No);
        assert_eq!(classify_confirmation("maybe"), Confirmation::No);
    }

    #[test]
    fn test_free_text() {
        assert_eq!(validate_free_text("  Abebe Kebede "), Ok("Abebe Kebede".to_string()));
        assert_eq!(validate_free_text("   "), Err(TextRejection::Empty));
        assert_eq!(validate_free_text(&"a".repeat(256)), Err(TextRejection::TooLong));
        assert!(validate_free_text(&"ሀ".repeat(255)).is_ok());
    }

    #[test]
    fn test_coordinates() {
        assert_eq!(parse_coordinates("9.03, 38.74"), Some("9.03, 38.74".to_string()));
        assert_eq!(parse_coordinates(" -1.5 36.8 "), Some("-1.5, 36.8".to_string()));
        assert_eq!(parse_coordinates("Skip / አሳልፍ"), None);
        assert_eq!(parse_coordinates("95.0, 10.0"), None);
        assert_eq!(parse_coordinates("Bole, Addis Ababa"), None);
    }
}
