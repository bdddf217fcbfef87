use std::fmt;

/// Error taxonomy for the extraction core.
///
/// Four kinds, matching how each is actually handled by callers: a
/// malformed stream and an exceeded limit both mean "no tables for this
/// page" and are returned; an invalid operand is logged and the operator
/// is skipped; a resource lookup failure is not really an error at all,
/// just a fallback trigger, but is modeled here so loggers can see it.
#[derive(Debug, Clone, PartialEq)]
pub enum PDFError {
    /// Lexer could not finish a string, hex string, array, or dictionary
    /// before running out of input.
    MalformedStream { message: String },

    /// A state operator was invoked with too few arguments, or an
    /// argument of the wrong token type.
    InvalidOperand { operator: String, message: String },

    /// `page_resources` could not resolve a character width for the
    /// given font resource name.
    ResourceLookupFailed { font_resource_name: String },

    /// A caller-supplied cap (token count, nesting depth) was exceeded.
    LimitExceeded { limit: String, value: usize },
}

impl fmt::Display for PDFError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PDFError::MalformedStream { message } => {
                write!(f, "malformed content stream: {}", message)
            }
            PDFError::InvalidOperand { operator, message } => {
                write!(f, "invalid operand for '{}': {}", operator, message)
            }
            PDFError::ResourceLookupFailed { font_resource_name } => {
                write!(f, "could not resolve character widths for font resource '{}'", font_resource_name)
            }
            PDFError::LimitExceeded { limit, value } => {
                write!(f, "limit '{}' exceeded: {}", limit, value)
            }
        }
    }
}

impl PDFError {
    pub fn malformed_stream<S: Into<String>>(message: S) -> Self {
        PDFError::MalformedStream {
            message: message.into(),
        }
    }

    pub fn content_stream_error<S: Into<String>>(message: S) -> Self {
        PDFError::MalformedStream {
            message: message.into(),
        }
    }

    pub fn invalid_operand<S: Into<String>>(operator: S, message: S) -> Self {
        PDFError::InvalidOperand {
            operator: operator.into(),
            message: message.into(),
        }
    }

    pub fn resource_lookup_failed<S: Into<String>>(font_resource_name: S) -> Self {
        PDFError::ResourceLookupFailed {
            font_resource_name: font_resource_name.into(),
        }
    }

    pub fn limit_exceeded<S: Into<String>>(limit: S, value: usize) -> Self {
        PDFError::LimitExceeded {
            limit: limit.into(),
            value,
        }
    }
}

impl std::error::Error for PDFError {}

/// Result type alias used throughout the core.
pub type PDFResult<T> = Result<T, PDFError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PDFError::malformed_stream("unterminated literal string");
        assert_eq!(
            format!("{}", err),
            "malformed content stream: unterminated literal string"
        );

        let err = PDFError::invalid_operand("cm", "expected 6 numeric operands");
        assert_eq!(
            format!("{}", err),
            "invalid operand for 'cm': expected 6 numeric operands"
        );

        let err = PDFError::resource_lookup_failed("F1");
        assert_eq!(
            format!("{}", err),
            "could not resolve character widths for font resource 'F1'"
        );

        let err = PDFError::limit_exceeded("max_tokens", 100_000);
        assert_eq!(format!("{}", err), "limit 'max_tokens' exceeded: 100000");
    }

    #[test]
    fn test_error_is_std_error() {
        let err = PDFError::malformed_stream("x");
        let _dyn_err: &dyn std::error::Error = &err;
    }

    #[test]
    fn test_result_alias() {
        let result: PDFResult<()> = Err(PDFError::malformed_stream("x"));
        assert!(result.is_err());
    }
}
