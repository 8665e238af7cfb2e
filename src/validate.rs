use std::sync::OnceLock;

use regex::Regex;
use url::Url;

use crate::error::ValidationError;

/// `something@something.something` with no whitespace.
pub fn is_valid_email(email: &str) -> bool {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL
        .get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email regex"))
        .is_match(email)
}

pub fn required(field: &'static str, value: &str, message: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::new(field, message))
    } else {
        Ok(())
    }
}

/// Character count after trimming, so "  ab " is two characters.
pub fn min_chars(
    field: &'static str,
    value: &str,
    min: usize,
    message: &str,
) -> Result<(), ValidationError> {
    if value.trim().chars().count() < min {
        Err(ValidationError::new(field, message))
    } else {
        Ok(())
    }
}

/// Optional link fields: empty is fine, anything else must be http(s).
pub fn optional_http_url(
    field: &'static str,
    value: Option<&str>,
    message: &str,
) -> Result<(), ValidationError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(()),
        Some(v) => match Url::parse(v) {
            Ok(u) if u.scheme() == "http" || u.scheme() == "https" => Ok(()),
            _ => Err(ValidationError::new(field, message)),
        },
    }
}

/// Trimmed value, or `None` when blank.
pub fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
