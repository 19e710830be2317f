//! Error types
//!
//! Every fallible public operation returns [`Result`]. Lookups over absence
//! (missing attributes, unknown tags, out-of-range indices) are total and
//! never produce an error.

use thiserror::Error;

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, Error>;

/// Well-formedness failure raised by the strict document parser.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at byte {offset}")]
pub struct ParseError {
    pub message: String,
    /// Byte offset into the input where the problem was detected
    pub offset: usize,
}

impl ParseError {
    pub fn new(message: impl Into<String>, offset: usize) -> Self {
        ParseError {
            message: message.into(),
            offset,
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("attribute `{name}` does not exist")]
    MissingAttribute { name: String },

    #[error("no CSS selector translator is configured; use an XPath query instead")]
    SelectorEngineUnavailable,

    #[error("node <{tag}> has no captured subtree to search")]
    SearchUnsupported { tag: String },

    #[error("XPath query `{expression}` failed: {message}")]
    Query { expression: String, message: String },

    #[error("CSS selector `{selector}` is invalid: {message}")]
    Selector { selector: String, message: String },

    #[error("XML parse failed: {0}")]
    Parse(#[from] ParseError),

    #[error("child tag <{tag}> collides with a reserved dump key")]
    ReservedKey { tag: String },
}

impl Error {
    pub(crate) fn query(expression: &str, message: impl Into<String>) -> Self {
        Error::Query {
            expression: expression.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn selector(selector: &str, message: impl Into<String>) -> Self {
        Error::Selector {
            selector: selector.to_string(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_display() {
        let err = ParseError::new("Unclosed tag: <root>", 12);
        assert_eq!(err.to_string(), "Unclosed tag: <root> at byte 12");
    }

    #[test]
    fn test_parse_error_converts() {
        let err: Error = ParseError::new("Document has no root element", 0).into();
        assert!(matches!(err, Error::Parse(_)));
    }

    #[test]
    fn test_query_error_carries_expression() {
        let err = Error::query("//a[", "Expected ]");
        match err {
            Error::Query { expression, message } => {
                assert_eq!(expression, "//a[");
                assert_eq!(message, "Expected ]");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
