//! Form checks run before anything leaves the device.

use crate::api::AuthError;

/// Minimum password length for new or changed passwords
pub const MIN_PASSWORD_LEN: usize = 8;

fn require(value: &str, field: &str) -> Result<(), AuthError> {
    if value.trim().is_empty() {
        return Err(AuthError::validation(format!("{} is required", field)));
    }
    Ok(())
}

fn require_strong(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AuthError::validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

pub fn validate_login(email: &str, password: &str) -> Result<(), AuthError> {
    require(email, "Email")?;
    if password.is_empty() {
        return Err(AuthError::validation("Password is required"));
    }
    Ok(())
}

pub fn validate_registration(name: &str, email: &str, password: &str) -> Result<(), AuthError> {
    require(name, "Name")?;
    require(email, "Email")?;
    if password.is_empty() {
        return Err(AuthError::validation("Password is required"));
    }
    require_strong(password)
}

pub fn validate_password_change(password: &str, confirmation: &str) -> Result<(), AuthError> {
    require_strong(password)?;
    if password != confirmation {
        return Err(AuthError::validation("Passwords do not match"));
    }
    Ok(())
}
