//! Route handlers, grouped by audience

pub mod admin;
pub mod catalog;
pub mod health;
pub mod public;

use maskcore::AppError;

use super::error::ApiError;

/// Presence check for a required body field.
pub(crate) fn required<T>(value: Option<T>, field: &str) -> Result<T, ApiError> {
    value.ok_or_else(|| AppError::missing(field).into())
}

/// Like [`required`], but a blank string counts as missing.
pub(crate) fn required_text(value: Option<String>, field: &str) -> Result<String, ApiError> {
    required(value.filter(|v| !v.trim().is_empty()), field)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_text_is_missing() {
        assert!(required_text(Some("  ".into()), "name").is_err());
        assert!(required_text(None, "name").is_err());
        assert_eq!(required_text(Some("Gold".into()), "name").unwrap(), "Gold");
    }
}
