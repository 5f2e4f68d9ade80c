//! Validation helpers for DTOs.

use validator::ValidationError;

/// Validates that a room code is exactly six ASCII digits.
///
/// # Examples
///
/// ```ignore
/// validate_room_code("482913") // Ok
/// validate_room_code("48291")  // Err - too short
/// validate_room_code("48291a") // Err - not a digit
/// ```
pub fn validate_room_code(code: &str) -> Result<(), ValidationError> {
    if code.len() != 6 {
        let mut err = ValidationError::new("room_code_length");
        err.message =
            Some(format!("Room code must be exactly 6 characters (got {})", code.len()).into());
        return Err(err);
    }

    if !code.chars().all(|c| c.is_ascii_digit()) {
        let mut err = ValidationError::new("room_code_format");
        err.message = Some("Room code must contain only ASCII digits".into());
        return Err(err);
    }

    Ok(())
}
