//! Recipient normalization and block list

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::TransportError;

/// How destination numbers are prepared before a send
///
/// # Example
///
/// ```
/// use herald_delivery::RecipientPolicy;
///
/// let policy = RecipientPolicy::default().with_blocked_number("963828458");
///
/// assert_eq!(policy.normalize("987 654-321"), "51987654321");
/// assert!(policy.prepare("(963) 828-458").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecipientPolicy {
    /// Prefix added to local numbers
    pub country_code: String,

    /// Digit count of a number written without country code
    pub local_number_len: usize,

    /// Numbers that must never receive messages, with or without country code
    #[serde(default)]
    pub blocked_numbers: Vec<String>,
}

impl Default for RecipientPolicy {
    fn default() -> Self {
        Self {
            country_code: "51".to_string(),
            local_number_len: 9,
            blocked_numbers: vec![],
        }
    }
}

impl RecipientPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the country code
    pub fn with_country_code(mut self, code: impl Into<String>) -> Self {
        self.country_code = code.into();
        self
    }

    /// Set the local number length
    pub fn with_local_number_len(mut self, len: usize) -> Self {
        self.local_number_len = len;
        self
    }

    /// Add a blocked number
    pub fn with_blocked_number(mut self, number: impl Into<String>) -> Self {
        self.blocked_numbers.push(number.into());
        self
    }

    /// Strip formatting and prefix the country code onto local numbers
    pub fn normalize(&self, raw: &str) -> String {
        let digits: String = raw
            .chars()
            .filter(|c| !c.is_whitespace() && !matches!(c, '-' | '(' | ')'))
            .collect();

        if !digits.starts_with(&self.country_code) && digits.len() == self.local_number_len {
            format!("{}{}", self.country_code, digits)
        } else {
            digits
        }
    }

    /// Whether a normalized number is on the block list
    pub fn is_blocked(&self, normalized: &str) -> bool {
        let plain = normalized
            .strip_prefix(self.country_code.as_str())
            .unwrap_or(normalized);

        self.blocked_numbers.iter().any(|blocked| {
            let blocked = self.normalize(blocked);
            blocked == normalized || blocked == plain || self.normalize(plain) == blocked
        })
    }

    /// Normalize and vet a destination, failing permanently on unusable numbers
    pub fn prepare(&self, raw: &str) -> Result<String, TransportError> {
        let normalized = self.normalize(raw);

        if normalized.is_empty() {
            return Err(TransportError::no_such_recipient(raw));
        }

        if self.is_blocked(&normalized) {
            warn!(phone_number = %normalized, "Recipient is blocked");
            return Err(TransportError::blocked(&normalized));
        }

        Ok(normalized)
    }
}
