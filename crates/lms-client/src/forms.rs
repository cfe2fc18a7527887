//! Credential input checks run before a sign-in or sign-up is submitted.
//!
//! The session actor does not validate; the credential store has the final
//! say. These checks only catch obviously malformed input early and produce
//! the messages shown next to the form.

use std::sync::LazyLock;

use regex::Regex;

use crate::backend::MIN_PASSWORD_LEN;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Z0-9a-z._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$").expect("email pattern")
});

/// Why a form cannot be submitted yet.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum FormError {
    #[error("Name cannot be empty")]
    EmptyName,
    #[error("Email cannot be empty")]
    EmptyEmail,
    #[error("Please enter a valid email address")]
    InvalidEmail,
    #[error("Password cannot be empty")]
    EmptyPassword,
    #[error("Password must be at least {} characters", MIN_PASSWORD_LEN)]
    ShortPassword,
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// Check sign-in input. Errors are reported in field order.
pub fn check_sign_in(email: &str, password: &str) -> Result<(), FormError> {
    if email.is_empty() {
        return Err(FormError::EmptyEmail);
    }
    if !is_valid_email(email) {
        return Err(FormError::InvalidEmail);
    }
    if password.is_empty() {
        return Err(FormError::EmptyPassword);
    }
    Ok(())
}

/// Check sign-up input: sign-in rules plus a name and a minimum password length.
pub fn check_sign_up(name: &str, email: &str, password: &str) -> Result<(), FormError> {
    if name.trim().is_empty() {
        return Err(FormError::EmptyName);
    }
    check_sign_in(email, password)?;
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(FormError::ShortPassword);
    }
    Ok(())
}
