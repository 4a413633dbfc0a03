use common::photo::has_dot_segment;

use crate::errors::PhotoError;

/// References are opaque, only obviously unusable ones are turned away
pub(crate) fn validate_reference(reference: &str) -> Result<&str, PhotoError> {
    if reference.trim().is_empty() {
        return Err(PhotoError::InvalidReference);
    }

    if reference.chars().any(char::is_control) {
        return Err(PhotoError::InvalidReference);
    }

    if has_dot_segment(reference) {
        return Err(PhotoError::InvalidReference);
    }

    Ok(reference)
}
