use thiserror::Error;

/// Failures surfaced by the generation pipeline.
///
/// The `Display` output is the localized message meant for the user; the
/// `detail` fields keep the underlying cause for logs.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("{0}")]
    Validation(String),

    #[error("{message}")]
    Outline { message: String, detail: String },

    #[error("{message}")]
    Section {
        title: String,
        message: String,
        detail: String,
    },

    #[error("{message}")]
    References { message: String, detail: String },

    #[error("generation cancelled")]
    Cancelled,

    #[error("cannot {action} while {state}")]
    InvalidState {
        action: &'static str,
        state: &'static str,
    },
}

impl GenerationError {
    pub fn detail(&self) -> Option<&str> {
        match self {
            GenerationError::Outline { detail, .. }
            | GenerationError::Section { detail, .. }
            | GenerationError::References { detail, .. } => Some(detail),
            _ => None,
        }
    }
}
