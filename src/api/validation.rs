//! Request body validation
//!
//! Validators push [`FieldError`]s instead of failing fast so a client sees
//! every problem with a submission at once.

use url::Url;

use crate::error::FieldError;

const MAX_EMAIL_LEN: usize = 254;
const MIN_PASSWORD_LEN: usize = 8;

/// Trim and lower-case an email for storage and lookup
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn validate_email(email: &str, errors: &mut Vec<FieldError>) {
    if email.is_empty() {
        errors.push(FieldError::new("email", "Email is required"));
        return;
    }
    if email.len() > MAX_EMAIL_LEN || !looks_like_email(email) {
        errors.push(FieldError::new("email", "Please provide a valid email"));
    }
}

fn looks_like_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((name, tld)) => !name.is_empty() && !tld.is_empty(),
        None => false,
    }
}

/// Strength policy for new passwords
pub fn validate_new_password(field: &str, password: &str, errors: &mut Vec<FieldError>) {
    if password.chars().count() < MIN_PASSWORD_LEN {
        errors.push(FieldError::new(
            field,
            format!("Password must be at least {MIN_PASSWORD_LEN} characters long"),
        ));
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        errors.push(FieldError::new(field, "Password must contain a number"));
    }
    if !password.chars().any(char::is_alphabetic) {
        errors.push(FieldError::new(field, "Password must contain a letter"));
    }
}

pub fn validate_login_password(password: &str, errors: &mut Vec<FieldError>) {
    if password.is_empty() {
        errors.push(FieldError::new("password", "Password is required"));
    }
}

/// Parse a destination URL; only absolute http(s) URLs with a host pass
pub fn validate_destination(raw: &str, errors: &mut Vec<FieldError>) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        errors.push(FieldError::new("originalUrl", "URL is required"));
        return None;
    }
    // The URL parser silently drops tabs and newlines, which the Location header cannot carry
    if trimmed.chars().any(|c| c.is_control()) {
        errors.push(FieldError::new("originalUrl", "Please provide a valid URL"));
        return None;
    }

    match Url::parse(trimmed) {
        Ok(url)
            if matches!(url.scheme(), "http" | "https")
                && url.host_str().is_some_and(|h| !h.is_empty()) =>
        {
            Some(trimmed.to_string())
        }
        _ => {
            errors.push(FieldError::new("originalUrl", "Please provide a valid URL"));
            None
        }
    }
}
