//! Error types for the selection and validation engine.
//!
//! Only configuration errors are surfaced as [`BindError`]. A selection that
//! cannot be resolved is reported through [`SelectOutcome`], and a value that
//! fails validation is reported through [`ValidityState`]; neither is an error.
//!
//! [`SelectOutcome`]: crate::model::SelectOutcome
//! [`ValidityState`]: crate::validation::ValidityState

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, BindError>;

/// Errors that can occur in the selection and validation engine.
#[derive(Debug, thiserror::Error)]
pub enum BindError {
    /// A reference that must resolve did not.
    #[error("Missing reference: {0}")]
    MissingReference(String),

    /// No value bind rule exists for the component.
    #[error("Could not find default value bind rule for this component")]
    MissingValueRule,

    /// Tried to remove the data root.
    #[error("Removing the data root of a component is not allowed")]
    RemoveRoot,

    /// `add` was called without a node and no `add` rule is configured.
    #[error("Could not find an add rule for this component")]
    MissingAddRule,

    /// A data action was requested but no executor is attached.
    #[error("No action executor is attached to this component")]
    MissingActionExecutor,

    /// A data action requires a data root.
    #[error("No data root is attached")]
    NoDataRoot,

    /// `complete_add` was called with a request that is not pending.
    #[error("Unknown or already completed add request")]
    UnknownAddRequest,

    /// Fetching data for an add action failed or timed out.
    #[error("Could not add data from '{location}': {message}")]
    DataLoad { location: String, message: String },

    /// A custom scope validation predicate could not be evaluated.
    #[error("Error in custom validation of scope '{scope}': {message}")]
    CustomValidation { scope: String, message: String },

    /// An element id does not belong to the element tree.
    #[error("Unknown element")]
    UnknownElement,

    /// A pattern rule could not be compiled.
    #[error("Invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// A datatype rule names a type that is not supported.
    #[error("Unknown data type '{0}'")]
    UnknownDataType(String),

    /// Options could not be parsed.
    #[error("Invalid configuration: {0}")]
    Config(#[from] toml::de::Error),
}

impl BindError {
    /// Create a missing-reference error.
    pub fn missing_reference(what: impl Into<String>) -> Self {
        Self::MissingReference(what.into())
    }

    /// Create a data-load error.
    pub fn data_load(location: impl Into<String>, message: impl Into<String>) -> Self {
        Self::DataLoad {
            location: location.into(),
            message: message.into(),
        }
    }

    /// Create a custom validation error.
    pub fn custom_validation(scope: impl Into<String>, message: impl Into<String>) -> Self {
        Self::CustomValidation {
            scope: scope.into(),
            message: message.into(),
        }
    }

    /// Create an invalid-pattern error.
    pub fn invalid_pattern(pattern: impl Into<String>, source: regex::Error) -> Self {
        Self::InvalidPattern {
            pattern: pattern.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_error_messages() {
        let err = BindError::data_load("http://host/item.xml", "timeout");
        assert_eq!(
            err.to_string(),
            "Could not add data from 'http://host/item.xml': timeout"
        );
        assert_eq!(
            BindError::missing_reference("item-9").to_string(),
            "Missing reference: item-9"
        );
    }

    #[test]
    fn test_pattern_error_keeps_source() {
        let source = regex::Regex::new("(unclosed").unwrap_err();
        let err = BindError::invalid_pattern("(unclosed", source);
        assert!(err.source().is_some());
    }

    #[test]
    fn test_toml_error_converts() {
        let parsed: std::result::Result<toml::Table, _> = toml::from_str("= broken");
        let err: BindError = parsed.unwrap_err().into();
        assert!(matches!(err, BindError::Config(_)));
    }
}
