use thiserror::Error;

/// Failure raised by any operation of the remote generation client.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("input is empty")]
    EmptyInput,
    #[error("API key not found; set it in settings or via the environment")]
    CredentialMissing,
    #[error("transient service error ({}): {message}", status_label(.status))]
    TransientService {
        status: Option<u16>,
        message: String,
    },
    #[error("no response from AI")]
    NoResponse,
    #[error("no image generated in response")]
    NoImage,
    #[error("no edited image generated")]
    NoEdit,
    #[error("failed to parse AI response: {message}")]
    Parse { message: String },
    #[error("prompt enhancement failed: {0}")]
    Enhancement(Box<GenerationError>),
    #[error("request failed ({}): {message}", status_label(.status))]
    RequestFailure {
        status: Option<u16>,
        message: String,
    },
}

fn status_label(status: &Option<u16>) -> String {
    status
        .map(|s| s.to_string())
        .unwrap_or_else(|| "no status".to_string())
}

impl GenerationError {
    /// Builds the error for a failed exchange, classifying it as transient or not.
    pub fn from_failure(status: Option<u16>, message: impl Into<String>) -> Self {
        let message = message.into();
        if is_transient_failure(status, &message) {
            Self::TransientService { status, message }
        } else {
            Self::RequestFailure { status, message }
        }
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, Self::TransientService { .. })
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::TransientService { status, .. } | Self::RequestFailure { status, .. } => *status,
            Self::Enhancement(inner) => inner.status(),
            _ => None,
        }
    }
}

/// Server/overload heuristic: HTTP 500 or 503, or a message mentioning an
/// internal error or overload.
pub fn is_transient_failure(status: Option<u16>, message: &str) -> bool {
    if matches!(status, Some(500) | Some(503)) {
        return true;
    }
    let lower = message.to_ascii_lowercase();
    lower.contains("internal") || lower.contains("overloaded")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_server_statuses_as_transient() {
        assert!(is_transient_failure(Some(500), "boom"));
        assert!(is_transient_failure(Some(503), ""));
        assert!(!is_transient_failure(Some(400), "bad request"));
        assert!(!is_transient_failure(Some(429), "quota"));
    }

    #[test]
    fn classifies_messages_as_transient() {
        assert!(is_transient_failure(None, "An INTERNAL error has occurred"));
        assert!(is_transient_failure(Some(429), "The model is overloaded."));
        assert!(!is_transient_failure(None, "connection refused"));
    }

    #[test]
    fn from_failure_picks_variant() {
        assert!(GenerationError::from_failure(Some(503), "unavailable").is_transient());
        let err = GenerationError::from_failure(Some(403), "permission denied");
        assert!(!err.is_transient());
        assert_eq!(err.status(), Some(403));
    }

    #[test]
    fn enhancement_wrapper_keeps_inner_status() {
        let err = GenerationError::Enhancement(Box::new(GenerationError::from_failure(
            Some(401),
            "unauthorized",
        )));
        assert_eq!(err.status(), Some(401));
        assert!(!err.is_transient());
    }
}
