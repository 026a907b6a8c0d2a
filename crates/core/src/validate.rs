//! Shared field checks for writable record fields.

use crate::error::{DomainError, DomainResult};

/// Require a non-blank string whose length (in chars) is within `min..=max`.
pub(crate) fn text(field: &str, value: &str, min: usize, max: usize) -> DomainResult<()> {
    if value.trim().is_empty() {
        return Err(DomainError::validation(format!("{field} is required")));
    }
    let len = value.chars().count();
    if len < min || len > max {
        return Err(DomainError::validation(format!(
            "{field} must be between {min} and {max} characters"
        )));
    }
    Ok(())
}

/// Require an integer within `min..=max`.
pub(crate) fn range(field: &str, value: i32, min: i32, max: i32) -> DomainResult<()> {
    if !(min..=max).contains(&value) {
        return Err(DomainError::validation(format!(
            "{field} must be between {min} and {max}"
        )));
    }
    Ok(())
}
