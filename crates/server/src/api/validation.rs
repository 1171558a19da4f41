// Input validation for delivery APIs
//
// Hard limits on producer input. Session names follow the key rule of the
// delivery crate.

use herald_delivery::validate_session_name as validate_key_segment;

use super::common::ErrorResponse;

// =============================================================================
// Input Size Limits
// =============================================================================

/// Maximum size for a destination number as typed by the producer.
pub const MAX_PHONE_NUMBER_BYTES: usize = 32;

/// Maximum size for a message body.
/// 64 KB is far beyond any chat message the client accepts.
pub const MAX_MESSAGE_BYTES: usize = 64 * 1024; // 64 KB

// =============================================================================
// Validation Functions
// =============================================================================

pub fn validate_session_name(name: &str) -> Result<(), ErrorResponse> {
    validate_key_segment(name).map_err(|e| ErrorResponse::new(e.to_string()))
}

pub fn validate_message(phone_number: &str, message: &str) -> Result<(), ErrorResponse> {
    if phone_number.trim().is_empty() {
        return Err(ErrorResponse::new("phone_number is required"));
    }
    if phone_number.len() > MAX_PHONE_NUMBER_BYTES {
        return Err(ErrorResponse::new("phone_number is too long"));
    }
    if message.trim().is_empty() {
        return Err(ErrorResponse::new("message is required"));
    }
    if message.len() > MAX_MESSAGE_BYTES {
        return Err(ErrorResponse::new("message is too long"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use herald_delivery::queue::keys::MAX_SESSION_NAME_BYTES;

    #[test]
    fn test_session_name() {
        assert!(validate_session_name("ieguillermo").is_ok());
        assert!(validate_session_name("sede-norte_2").is_ok());
        assert!(validate_session_name("").is_err());
        assert!(validate_session_name("a:b").is_err());
        assert!(validate_session_name("a b").is_err());
        assert!(validate_session_name(&"x".repeat(MAX_SESSION_NAME_BYTES + 1)).is_err());
    }

    #[test]
    fn test_message() {
        assert!(validate_message("987654321", "hello").is_ok());
        assert!(validate_message("", "hello").is_err());
        assert!(validate_message("987654321", "   ").is_err());
        assert!(validate_message(&"9".repeat(MAX_PHONE_NUMBER_BYTES + 1), "hi").is_err());
        assert!(validate_message("987654321", &"x".repeat(MAX_MESSAGE_BYTES + 1)).is_err());
    }
}
