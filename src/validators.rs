/// Input validators module
///
/// Registration is the only place Chirpy accepts free-form identity
/// input, so validation is limited to the email address: length limits
/// against oversized payloads plus an RFC 5322 format check.

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::{AppError, ValidationError};

const MAX_EMAIL_LENGTH: usize = 254; // RFC 5321
const MIN_EMAIL_LENGTH: usize = 5;

lazy_static! {
    // RFC 5322 simplified email regex (practical validation)
    static ref EMAIL_REGEX: Regex = Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$"
    ).unwrap();
}

/// Validates an email address and returns the trimmed value.
pub fn is_valid_email(email: &str) -> Result<String, AppError> {
    let trimmed = email.trim();

    if trimmed.is_empty() {
        return Err(AppError::Validation(ValidationError::EmptyField(
            "email".to_string(),
        )));
    }

    if trimmed.len() < MIN_EMAIL_LENGTH || trimmed.len() > MAX_EMAIL_LENGTH {
        return Err(AppError::Validation(ValidationError::InvalidFormat(
            "email".to_string(),
        )));
    }

    // Exactly one @ (the regex tolerates quoted locals we don't support)
    if trimmed.matches('@').count() != 1 {
        return Err(AppError::Validation(ValidationError::InvalidFormat(
            "email".to_string(),
        )));
    }

    if !EMAIL_REGEX.is_match(trimmed) {
        return Err(AppError::Validation(ValidationError::InvalidFormat(
            "email".to_string(),
        )));
    }

    Ok(trimmed.to_string())
}
