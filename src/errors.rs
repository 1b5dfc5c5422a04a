//! Error types for parsing structures and validating responses.
//!
//! There are two disjoint kinds of failure. A
//! [`MalformedStructure`](enum.MalformedStructure.html) means the structure
//! text itself is wrong, which is a bug in whoever wrote it. A
//! [`BadResponse`](struct.BadResponse.html) means the structure was fine, but
//! the JSON value did not have the shape it describes.
//! [`RslError`](enum.RslError.html) wraps both.

use failure::Fail;
use json_pointer::JsonPointer;
use serde_json::Value;

/// A structure string that could not be parsed.
///
/// These errors do not depend on the data being validated. Retrying the same
/// structure against a different response will fail in exactly the same way.
#[derive(Debug, Fail, PartialEq, Clone, Eq)]
pub enum MalformedStructure {
    /// A `(` was never closed.
    ///
    /// `level` is the text following the unclosed parenthesis.
    #[fail(display = "There is no matching end parenthesis in '{}'", level)]
    UnbalancedParenthesis { level: String },

    /// An array accessor held something other than an index, `*` or `+`.
    #[fail(
        display = "only <int> | '*' | '+' are allowed as array index arguments, found '{}'",
        token
    )]
    InvalidArrayIndex { token: String },

    /// A `[` was never closed.
    #[fail(display = "unterminated array accessor at offset {}", position)]
    UnterminatedAccessor { position: usize },

    /// The parser found a token where it expected something else.
    #[fail(
        display = "expected {} at offset {}, found {}",
        expected, position, found
    )]
    UnexpectedToken {
        expected: &'static str,
        found: String,
        position: usize,
    },

    /// A parenthesized group was followed by `>`.
    ///
    /// A group constrains the current value without descending into it, so
    /// nothing can follow it in the same path.
    #[fail(display = "'{}' must be the last step of a path", step)]
    StepAfterTerminal { step: String },

    /// Parentheses were nested deeper than the configured maximum.
    #[fail(display = "maximum nesting depth of {} exceeded", max_depth)]
    MaxDepthExceeded { max_depth: usize },
}

/// The particular way in which a response disagreed with a structure.
#[derive(Debug, Fail, PartialEq, Clone, Eq)]
pub enum Mismatch {
    /// A structure was given, but there was no response to check.
    #[fail(display = "Empty response")]
    EmptyResponse,

    #[fail(display = "'{}' is not an empty dict", value)]
    NotEmptyDict { value: String },

    #[fail(display = "'{}' is not a dict", value)]
    NotADict { value: String },

    #[fail(display = "'{}' is not an array", value)]
    NotAnArray { value: String },

    #[fail(display = "key '{}' is not in dict {}", key, dict)]
    MissingKey { key: String, dict: String },

    #[fail(display = "length of array '{}' is lower than the index {}", array, index)]
    IndexOutOfBounds { array: String, index: usize },

    #[fail(display = "array should not be empty")]
    EmptyArray,
}

/// A response which did not match a well-formed structure.
#[derive(Debug, Fail, PartialEq, Clone)]
#[fail(display = "{}", kind)]
pub struct BadResponse {
    kind: Mismatch,
    instance_path: JsonPointer<String, Vec<String>>,
}

impl BadResponse {
    /// Construct a mismatch found at `instance_path`.
    pub fn new(kind: Mismatch, instance_path: JsonPointer<String, Vec<String>>) -> BadResponse {
        BadResponse {
            kind,
            instance_path,
        }
    }

    /// What went wrong.
    pub fn kind(&self) -> &Mismatch {
        &self.kind
    }

    /// A pointer to the part of the response where the mismatch was found.
    ///
    /// For a missing key this is the mapping that lacks it; for an index out of
    /// bounds it is the array being indexed.
    pub fn instance_path(&self) -> &JsonPointer<String, Vec<String>> {
        &self.instance_path
    }
}

/// Any error produced while validating a response against a structure.
#[derive(Debug, Fail, PartialEq, Clone)]
pub enum RslError {
    #[fail(display = "{}", _0)]
    Malformed(#[cause] MalformedStructure),

    #[fail(display = "{}", _0)]
    BadResponse(#[cause] BadResponse),
}

impl RslError {
    /// Whether the structure, rather than the response, is at fault.
    ///
    /// Such errors are programming mistakes and should not be retried.
    pub fn is_malformed(&self) -> bool {
        match self {
            RslError::Malformed(_) => true,
            RslError::BadResponse(_) => false,
        }
    }
}

impl From<MalformedStructure> for RslError {
    fn from(err: MalformedStructure) -> Self {
        RslError::Malformed(err)
    }
}

impl From<BadResponse> for RslError {
    fn from(err: BadResponse) -> Self {
        RslError::BadResponse(err)
    }
}

/// Renders a value for inclusion in an error message.
///
/// Strings are shown without quotes; everything else is compact JSON.
pub(crate) fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn render_strings_bare() {
        assert_eq!(render(&json!("no_dict")), "no_dict");
        assert_eq!(render(&json!({"key": "value"})), r#"{"key":"value"}"#);
        assert_eq!(render(&json!(true)), "true");
    }

    #[test]
    fn messages() {
        assert_eq!(
            Mismatch::MissingKey {
                key: "result".to_owned(),
                dict: render(&json!({"key": "value"})),
            }
            .to_string(),
            r#"key 'result' is not in dict {"key":"value"}"#
        );

        assert_eq!(
            MalformedStructure::UnbalancedParenthesis {
                level: "ret > *".to_owned()
            }
            .to_string(),
            "There is no matching end parenthesis in 'ret > *'"
        );
    }

    #[test]
    fn malformed_is_not_retryable() {
        let err: RslError = MalformedStructure::MaxDepthExceeded { max_depth: 1 }.into();
        assert!(err.is_malformed());

        let err: RslError = BadResponse::new(Mismatch::EmptyArray, JsonPointer::new(vec![])).into();
        assert!(!err.is_malformed());
        assert_eq!(err.to_string(), "array should not be empty");
    }
}
