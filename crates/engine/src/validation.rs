//! Input validation for player-supplied fields.

use std::fmt;

/// Validation error types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Value too long.
    TooLong { field: String, max: usize, actual: usize },
    /// Empty value where one is required.
    Empty(String),
    /// Operation length outside the allowed set.
    InvalidDuration(i64),
    /// Reset hour outside 0..=23.
    InvalidResetHour(i64),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::TooLong { field, max, actual } => {
                write!(f, "{} is too long ({} chars, max {})", field, actual, max)
            }
            ValidationError::Empty(field) => write!(f, "{} cannot be empty", field),
            ValidationError::InvalidDuration(days) => write!(
                f,
                "duration must be one of {:?} days (got {})",
                ALLOWED_DURATIONS, days
            ),
            ValidationError::InvalidResetHour(hour) => {
                write!(f, "reset hour must be between 0 and 23 (got {})", hour)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Maximum allowed length for operation names.
pub const MAX_OPERATION_NAME_LENGTH: usize = 60;

/// Maximum allowed length for submission captions.
pub const MAX_CAPTION_LENGTH: usize = 280;

/// Operation lengths players can choose from.
pub const ALLOWED_DURATIONS: [i64; 3] = [7, 14, 30];

/// Extension used when an upload has none we can trust.
pub const DEFAULT_PHOTO_EXTENSION: &str = "jpg";

const MAX_EXTENSION_LENGTH: usize = 5;

fn check_length(field: &str, value: &str, max: usize) -> Result<(), ValidationError> {
    let actual = value.chars().count();
    if actual > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
            actual,
        });
    }
    Ok(())
}

/// Validate an operation name, returning it trimmed.
pub fn validate_operation_name(name: &str) -> Result<String, ValidationError> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Empty("name".to_string()));
    }

    check_length("name", name, MAX_OPERATION_NAME_LENGTH)?;
    Ok(name.to_string())
}

pub fn validate_duration(days: i64) -> Result<(), ValidationError> {
    if ALLOWED_DURATIONS.contains(&days) {
        Ok(())
    } else {
        Err(ValidationError::InvalidDuration(days))
    }
}

pub fn validate_reset_hour(hour: i64) -> Result<(), ValidationError> {
    if (0..=23).contains(&hour) {
        Ok(())
    } else {
        Err(ValidationError::InvalidResetHour(hour))
    }
}

/// Trim a caption. Blank captions become `None`.
pub fn normalize_caption(caption: Option<&str>) -> Result<Option<String>, ValidationError> {
    let Some(caption) = caption.map(str::trim).filter(|c| !c.is_empty()) else {
        return Ok(None);
    };

    check_length("caption", caption, MAX_CAPTION_LENGTH)?;
    Ok(Some(caption.to_string()))
}

/// Invite codes are matched case-insensitively and ignore surrounding space.
pub fn normalize_invite_code(code: &str) -> Result<String, ValidationError> {
    let code = code.trim().to_uppercase();
    if code.is_empty() {
        return Err(ValidationError::Empty("invite code".to_string()));
    }
    Ok(code)
}

/// Storage extension for an uploaded file name.
///
/// Falls back to [`DEFAULT_PHOTO_EXTENSION`] when the name has no usable
/// extension, so user input never shapes the storage path beyond `[a-z0-9]`.
pub fn photo_extension(file_name: Option<&str>) -> String {
    file_name
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| {
            !ext.is_empty()
                && ext.len() <= MAX_EXTENSION_LENGTH
                && ext.chars().all(|c| c.is_ascii_alphanumeric())
        })
        .unwrap_or_else(|| DEFAULT_PHOTO_EXTENSION.to_string())
}
