//! DTO validation helpers.

use validator::ValidationErrors;

use super::error::{AppError, FieldError};

/// Flatten `validator` output into an `AppError::Validation`.
///
/// Every failed field is kept so callers can surface the full list;
/// the headline message joins them for plain-text consumers.
pub fn validation_error(errors: ValidationErrors) -> AppError {
    let mut fields = Vec::new();
    for (field, errs) in errors.field_errors() {
        for err in errs {
            let message = err
                .message
                .as_deref()
                .unwrap_or("invalid value")
                .to_string();
            fields.push(FieldError {
                field: field.to_string(),
                message,
            });
        }
    }

    let message = if fields.is_empty() {
        "Validation failed".to_string()
    } else {
        fields
            .iter()
            .map(|f| format!("{}: {}", f.field, f.message))
            .collect::<Vec<_>>()
            .join("; ")
    };

    AppError::Validation(message)
}
