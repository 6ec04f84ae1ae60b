//! Candidate identity
//!
//! Personal information collected before an interview, the phone formatting
//! applied while it is typed, and registration with the user service.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use tracing::{info, warn};

use crate::backend::InterviewBackend;
use crate::error::{FieldError, SessionError};

static EMAIL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());

static PHONE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^0 \(\d{3}\) \d{3}-\d{2}-\d{2}$").unwrap());

/// Maximum digits in a phone number, leading 0 included
const PHONE_DIGITS: usize = 11;

/// Personal information sent to the user service
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonalInfo {
    pub name: String,
    pub surname: String,
    pub email: String,
    pub phone: String,
    /// Data-protection notice acknowledged; never sent to the backend
    #[serde(skip_serializing)]
    pub consent: bool,
}

impl PersonalInfo {
    /// Check every field, collecting all problems at once
    pub fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();
        let mut fail = |field: &str, message: &str| {
            errors.push(FieldError {
                field: field.to_string(),
                message: message.to_string(),
            })
        };

        if self.name.trim().is_empty() {
            fail("name", "Name is required.");
        }
        if self.surname.trim().is_empty() {
            fail("surname", "Surname is required.");
        }
        if !EMAIL_PATTERN.is_match(&self.email) {
            fail("email", "Email must be a valid email address.");
        }
        if !PHONE_PATTERN.is_match(&self.phone) {
            fail(
                "phone",
                "Phone number must be in the format 0 (XXX) XXX-XX-XX.",
            );
        }
        if !self.consent {
            fail("consent", "The data-protection notice must be accepted.");
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Format raw phone input as `0 (XXX) XXX-XX-XX`
///
/// Non-digits are dropped, a leading 0 is added and input beyond eleven digits is
/// cut off. Partial input is formatted progressively.
pub fn format_phone(raw: &str) -> String {
    let mut digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    if !digits.is_empty() && !digits.starts_with('0') {
        digits.insert(0, '0');
    }
    digits.truncate(PHONE_DIGITS);

    let mut formatted = String::with_capacity(18);
    for (i, digit) in digits.chars().enumerate() {
        match i {
            1 => formatted.push_str(" ("),
            4 => formatted.push_str(") "),
            7 | 9 => formatted.push('-'),
            _ => {}
        }
        formatted.push(digit);
    }
    formatted
}

/// Validate personal info and create the user, returning the id that tags uploads
pub async fn register(
    backend: &dyn InterviewBackend,
    mut info: PersonalInfo,
) -> Result<String, SessionError> {
    info.phone = format_phone(&info.phone);
    info.validate().map_err(SessionError::InvalidPersonalInfo)?;

    match backend.create_user(&info).await {
        Ok(user_id) => {
            info!("User created with ID: {}", user_id);
            Ok(user_id)
        }
        Err(e) => {
            warn!("User creation failed: {}", e);
            Err(e.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_info() -> PersonalInfo {
        PersonalInfo {
            name: "Deniz".to_string(),
            surname: "Kaya".to_string(),
            email: "deniz@example.com".to_string(),
            phone: "0 (532) 123-45-67".to_string(),
            consent: true,
        }
    }

    #[test]
    fn test_format_phone_complete_number() {
        assert_eq!(format_phone("05321234567"), "0 (532) 123-45-67");
        assert_eq!(format_phone("5321234567"), "0 (532) 123-45-67");
        assert_eq!(format_phone("+90 532 123 45 67"), "0 (905) 321-23-45");
    }

    #[test]
    fn test_format_phone_partial_and_overflow() {
        assert_eq!(format_phone(""), "");
        assert_eq!(format_phone("5"), "0 (5");
        assert_eq!(format_phone("0532"), "0 (532");
        assert_eq!(format_phone("05321"), "0 (532) 1");
        assert_eq!(format_phone("0532123456789"), "0 (532) 123-45-67");
    }

    #[test]
    fn test_format_phone_is_idempotent() {
        let once = format_phone("5321234567");
        assert_eq!(format_phone(&once), once);
    }

    #[test]
    fn test_validate_accepts_complete_info() {
        assert!(valid_info().validate().is_ok());
    }

    #[test]
    fn test_validate_collects_every_field() {
        let info = PersonalInfo {
            name: "  ".to_string(),
            surname: String::new(),
            email: "not-an-email".to_string(),
            phone: "0532".to_string(),
            consent: false,
        };

        let errors = info.validate().unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["name", "surname", "email", "phone", "consent"]);
    }

    #[test]
    fn test_consent_is_not_serialized() {
        let json = serde_json::to_string(&valid_info()).unwrap();
        assert!(!json.contains("consent"));
        assert!(json.contains("\"email\":\"deniz@example.com\""));
    }
}
