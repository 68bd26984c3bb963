//! Common validation rules shared across request payloads.

use validator::ValidationError;

/// Validates an opaque identifier or label copied into QR payloads.
///
/// Requirements:
/// - Not blank
/// - At most 128 characters
/// - No control characters
pub fn validate_identifier(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("identifier_blank"));
    }

    if value.chars().count() > 128 {
        return Err(ValidationError::new("identifier_too_long"));
    }

    if value.chars().any(char::is_control) {
        return Err(ValidationError::new("identifier_invalid_characters"));
    }

    Ok(())
}
