//! Error types for call-site tooling.
//!
//! Analysis itself cannot fail: the plan model is a closed enum, so there is
//! no "unknown call site" to report. Errors only come from the edges of the
//! crate, loading a cost table and serializing graph exports.

use std::fmt;

/// Call-site tooling errors
///
/// # Examples
///
/// ```rust
/// use ferrous_callsite::CallSiteError;
///
/// let err = CallSiteError::InvalidCost {
///     name: "FERROUS_CALLSITE_SCOPED".to_string(),
///     value: "lots".to_string(),
/// };
/// assert_eq!(
///     err.to_string(),
///     "Invalid cost for FERROUS_CALLSITE_SCOPED: 'lots' is not a non-negative integer"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallSiteError {
    /// A cost table entry could not be parsed as a non-negative integer
    InvalidCost {
        /// Name of the setting (environment variable or field)
        name: String,
        /// The rejected raw value
        value: String,
    },
    /// Cost table document could not be read or written
    Config(String),
    /// Plan graph could not be serialized
    Export(String),
}

impl fmt::Display for CallSiteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallSiteError::InvalidCost { name, value } => write!(
                f,
                "Invalid cost for {}: '{}' is not a non-negative integer",
                name, value
            ),
            CallSiteError::Config(msg) => write!(f, "Cost table error: {}", msg),
            CallSiteError::Export(msg) => write!(f, "Graph export error: {}", msg),
        }
    }
}

impl std::error::Error for CallSiteError {}

/// Result type for fallible call-site operations.
pub type CallSiteResult<T> = Result<T, CallSiteError>;
