//! `rsl` is a small language for describing the *shape* of a JSON response,
//! and a validator that checks decoded responses against it.
//!
//! A structure string lists the keys and arrays a response must contain,
//! without describing their types or forbidding extra keys. It is meant for
//! REST clients that want to fail fast, with a readable message, when a server
//! returns something unexpected.
//!
//! # Validating data
//!
//! ```
//! use serde_json::json;
//! use rsl::{Structure, Validator};
//! use failure::Error;
//!
//! fn main() -> Result<(), Error> {
//!     // "return" must be a mapping holding an array "key1", a key "key2",
//!     // and optionally a mapping "key3" that contains "subkey".
//!     let structure = Structure::parse("return > (key1[*] & key2 & ?key3 > subkey)")?;
//!
//!     let validator = Validator::new();
//!     let ok = json!({
//!         "return": {
//!             "key1": [1, 2, 3],
//!             "key2": null,
//!             "unrelated": "extra keys are fine"
//!         }
//!     });
//!     validator.validate_structure(&structure, Some(&ok))?;
//!
//!     let bad = json!({
//!         "return": {
//!             "key1": [],
//!             "key2": null,
//!             "key3": { "other": true }
//!         }
//!     });
//!
//!     // Validation stops at the first mismatch. The error says what was
//!     // wrong, and points at where in the response it was found.
//!     let err = validator.validate_structure(&structure, Some(&bad)).unwrap_err();
//!     assert_eq!(err.to_string(), r#"key 'subkey' is not in dict {"other":true}"#);
//!     assert_eq!(err.instance_path().to_string(), "/return/key3");
//!
//!     Ok(())
//! }
//! ```
//!
//! # The structure language
//!
//! | Syntax           | Meaning                                                       |
//! |------------------|---------------------------------------------------------------|
//! | `key`            | the value is a mapping containing `key`                       |
//! | `?key`           | as above, but `key` may be missing                            |
//! | `*`              | the value is a mapping                                        |
//! | `a > b`          | `a` exists, and its value satisfies `b`                       |
//! | `a >> b`         | every value inside `a`'s mapping satisfies `b`                |
//! | `a & b`          | both `a` and `b` hold                                         |
//! | `(a & b)`        | grouping, usually as the last step of a path                  |
//! | `key[2]`         | `key` is an array with at least three elements                |
//! | `key[*]`         | `key` is an array; the rest of the path holds for every element |
//! | `key[+]`         | as `[*]`, but the array must not be empty                     |
//! | (empty)          | the value is exactly `{}`                                     |
//!
//! Any number of `>` may be chained: `a >>> b` checks `b` two levels of
//! unnamed keys below `a`. Whitespace around tokens is ignored.
//!
//! Errors come in two kinds, both wrapped by [`RslError`]:
//! [`MalformedStructure`] for a structure that cannot be parsed, and
//! [`BadResponse`] for a response that does not match.
//!
//! [`RslError`]: errors/enum.RslError.html
//! [`MalformedStructure`]: errors/enum.MalformedStructure.html
//! [`BadResponse`]: errors/struct.BadResponse.html

mod lexer;
mod vm;

pub mod errors;
pub mod structure;
pub mod validator;

pub use crate::errors::{BadResponse, MalformedStructure, Mismatch, RslError};
pub use crate::structure::{Accessor, Hop, Key, Level, Path, Step, Structure};
pub use crate::validator::{Config, Validator};

use serde_json::Value;

/// Validate a response against a structure with the default configuration.
///
/// This is shorthand for `Validator::new().validate(structure, response)`.
/// A `None` structure always succeeds; a `None` response with a structure is
/// an "Empty response" failure.
pub fn validate(structure: Option<&str>, response: Option<&Value>) -> Result<(), RslError> {
    Validator::new().validate(structure, response)
}
