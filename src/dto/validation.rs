//! Validation helpers for session ids and player names.

use validator::ValidationError;

/// Maximum accepted length of a player name, after trimming.
pub const NAME_MAX_LEN: usize = 20;

/// True iff `value` is exactly 4 ASCII digits.
pub fn is_valid_sid(value: &str) -> bool {
    value.len() == 4 && value.bytes().all(|byte| byte.is_ascii_digit())
}

/// True iff `value`, after trimming leading/trailing whitespace, is 1 to
/// [`NAME_MAX_LEN`] ASCII letters with no other characters.
pub fn is_valid_name(value: &str) -> bool {
    let trimmed = value.trim();
    (1..=NAME_MAX_LEN).contains(&trimmed.len())
        && trimmed.bytes().all(|byte| byte.is_ascii_alphabetic())
}

/// Validates that a session id is exactly 4 decimal digits.
///
/// # Examples
///
/// ```ignore
/// validate_sid("1234") // Ok
/// validate_sid("123")  // Err - too short
/// validate_sid("12a4") // Err - non-digit
/// ```
pub fn validate_sid(sid: &str) -> Result<(), ValidationError> {
    if is_valid_sid(sid) {
        return Ok(());
    }

    let mut err = ValidationError::new("sid_format");
    err.message = Some("Session id must be exactly 4 digits".into());
    Err(err)
}

/// Validates that a player name trims to 1-20 ASCII letters.
pub fn validate_name(name: &str) -> Result<(), ValidationError> {
    if is_valid_name(name) {
        return Ok(());
    }

    let mut err = ValidationError::new("name_format");
    err.message =
        Some(format!("Player name must be 1-{NAME_MAX_LEN} letters (A-Z, a-z)").into());
    Err(err)
}
