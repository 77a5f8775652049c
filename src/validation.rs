// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Local input checks that run before any call to an external provider.

use validator::Validate;

/// Minimum password length accepted on sign-up and password change.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Input rejected locally; never propagated to a provider.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Serial number must not be empty")]
    EmptySerial,

    #[error("Email must not be empty")]
    EmptyEmail,

    #[error("Email address is not valid")]
    InvalidEmail,

    #[error("Password must not be empty")]
    EmptyPassword,

    #[error("Passwords do not match")]
    PasswordMismatch,

    #[error("Password must be at least {MIN_PASSWORD_LEN} characters")]
    PasswordTooShort,
}

#[derive(Validate)]
struct EmailAddress {
    #[validate(email)]
    value: String,
}

/// Trim a raw serial number, rejecting empty or whitespace-only input.
pub fn normalize_serial(raw: &str) -> Result<String, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptySerial);
    }
    Ok(trimmed.to_string())
}

/// Trim and check an email address.
pub fn normalize_email(raw: &str) -> Result<String, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyEmail);
    }
    let address = EmailAddress {
        value: trimmed.to_string(),
    };
    address
        .validate()
        .map_err(|_| ValidationError::InvalidEmail)?;
    Ok(trimmed.to_string())
}

/// Check sign-in credentials. Password strength is the provider's concern here.
pub fn validate_sign_in(email: &str, password: &str) -> Result<String, ValidationError> {
    let email = normalize_email(email)?;
    if password.is_empty() {
        return Err(ValidationError::EmptyPassword);
    }
    Ok(email)
}

/// Check a new password against its confirmation.
///
/// Mismatch is reported before length, matching what users see on the
/// registration and profile forms.
pub fn validate_new_password(password: &str, confirm: &str) -> Result<(), ValidationError> {
    if password != confirm {
        return Err(ValidationError::PasswordMismatch);
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ValidationError::PasswordTooShort);
    }
    Ok(())
}

/// Check a sign-up form.
pub fn validate_sign_up(
    email: &str,
    password: &str,
    confirm: &str,
) -> Result<String, ValidationError> {
    let email = normalize_email(email)?;
    validate_new_password(password, confirm)?;
    Ok(email)
}
