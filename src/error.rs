use thiserror::Error;

/// Application-wide result type alias.
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error types.
#[derive(Debug, Error)]
pub enum AppError {
    /// I/O errors from filesystem operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Terminal initialization or rendering errors.
    #[error("Terminal error: {0}")]
    Terminal(String),

    /// Invalid path provided by the user or vanished from disk.
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// The user's selection cannot be acted on (empty, on the header,
    /// or a mix of files and folders).
    #[error("{0}")]
    Selection(String),

    /// The rendered outline no longer matches the in-memory tree.
    #[error("Outline out of sync: {0}")]
    Desync(String),
}

impl AppError {
    /// Diagnostic for a selection mixing files and folders.
    pub fn mixed_selection() -> Self {
        AppError::Selection(
            "to avoid confusion, opening both files and folders at once is not supported".into(),
        )
    }

    /// Diagnostic for an empty selection.
    pub fn no_selection() -> Self {
        AppError::Selection("no cursor in view".into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let app_err: AppError = io_err.into();
        assert!(matches!(app_err, AppError::Io(_)));
        assert!(app_err.to_string().contains("file not found"));
    }

    #[test]
    fn invalid_path_error_display() {
        let err = AppError::InvalidPath("/nonexistent".into());
        assert_eq!(err.to_string(), "Invalid path: /nonexistent");
    }

    #[test]
    fn mixed_selection_display() {
        let err = AppError::mixed_selection();
        assert!(err.to_string().contains("files and folders"));
    }

    #[test]
    fn desync_error_display() {
        let err = AppError::Desync("line `src ▼` not found".into());
        assert!(err.to_string().starts_with("Outline out of sync"));
    }
}
