use thiserror::Error;

#[derive(Error, Debug)]
pub enum CompareError {
    #[error("Invalid setting '{field}': {message}")]
    InvalidSettings { field: &'static str, message: String },

    #[error("Structural integrity violation: {0}")]
    StructuralIntegrity(String),

    #[error("XML parsing error at {location}: {message}")]
    XmlParse { message: String, location: String },

    #[error("XML serialization error: {0}")]
    XmlWrite(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl CompareError {
    pub(crate) fn invalid_setting(field: &'static str, message: impl Into<String>) -> Self {
        CompareError::InvalidSettings {
            field,
            message: message.into(),
        }
    }

    pub(crate) fn structural(message: impl Into<String>) -> Self {
        CompareError::StructuralIntegrity(message.into())
    }
}

pub type Result<T> = std::result::Result<T, CompareError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formats_correctly() {
        let err = CompareError::invalid_setting("detail_threshold", "must be within [0, 1], got 1.5");
        assert_eq!(
            err.to_string(),
            "Invalid setting 'detail_threshold': must be within [0, 1], got 1.5"
        );
    }

    #[test]
    fn structural_error_formats_correctly() {
        let err = CompareError::structural("ancestor 42 not found");
        assert_eq!(
            err.to_string(),
            "Structural integrity violation: ancestor 42 not found"
        );
    }
}
