//! Validate responses against structures.
//!
//! This module contains logic related to *validation*, the process of taking a
//! decoded response body and checking that it has the shape a structure
//! describes.
//!
//! See the docs for [`Validator`](struct.Validator.html) for more.

use crate::errors::{BadResponse, MalformedStructure, Mismatch, RslError};
use crate::structure::Structure;
use crate::vm::validate;
use json_pointer::JsonPointer;
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Validates responses against structures.
#[derive(Debug, Default, Eq, PartialEq, Clone, Hash)]
pub struct Validator {
    config: Config,
}

impl Validator {
    /// Constructs a new validator using the default configuration.
    pub fn new() -> Self {
        Self::new_with_config(Config::default())
    }

    /// Constructs a new validator using a configuration.
    pub fn new_with_config(config: Config) -> Self {
        Self { config }
    }

    /// The configuration this validator parses structures with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Parse a structure using this validator's configuration.
    pub fn parse(&self, structure: &str) -> Result<Structure, MalformedStructure> {
        Structure::parse_with_config(structure, &self.config).map_err(|err| {
            debug!("rejected structure {:?}: {}", structure, err);
            err
        })
    }

    /// Validate a response against a structure.
    ///
    /// A missing structure means no validation was requested, and always
    /// succeeds. Otherwise the structure is parsed first, so a malformed
    /// structure is reported even when there is no response. A missing
    /// response then fails with [`Mismatch::EmptyResponse`].
    ///
    /// [`Mismatch::EmptyResponse`]: ../errors/enum.Mismatch.html#variant.EmptyResponse
    pub fn validate(
        &self,
        structure: Option<&str>,
        response: Option<&Value>,
    ) -> Result<(), RslError> {
        let structure = match structure {
            Some(structure) => self.parse(structure)?,
            None => return Ok(()),
        };

        self.validate_structure(&structure, response)?;
        Ok(())
    }

    /// Validate a response against an already-parsed structure.
    ///
    /// Parsing once and validating many responses avoids re-tokenizing the
    /// structure on every call.
    pub fn validate_structure(
        &self,
        structure: &Structure,
        response: Option<&Value>,
    ) -> Result<(), BadResponse> {
        let response = response
            .ok_or_else(|| BadResponse::new(Mismatch::EmptyResponse, JsonPointer::new(vec![])))?;

        validate(structure, response).map_err(|err| {
            debug!(
                "response rejected by {:?} at {:?}: {}",
                structure.to_string(),
                err.instance_path().to_string(),
                err
            );
            err
        })
    }
}

/// Configuration for how structures are parsed.
///
/// `Config` implements serde's traits, so it can be embedded in a larger
/// configuration file. Missing fields take their default values.
#[derive(Debug, Eq, PartialEq, Clone, Hash, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    pub(crate) max_depth: usize,
}

impl Config {
    /// Create a new, default `Config`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum nesting of parenthesized groups. The default value is
    /// 32.
    ///
    /// Structures nested deeper than this are rejected with
    /// [`MalformedStructure::MaxDepthExceeded`] rather than risking unbounded
    /// recursion while parsing.
    ///
    /// [`MalformedStructure::MaxDepthExceeded`]: ../errors/enum.MalformedStructure.html#variant.MaxDepthExceeded
    pub fn max_depth(&mut self, max_depth: usize) -> &mut Self {
        self.max_depth = max_depth;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self { max_depth: 32 }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn null_structure() {
        let validator = Validator::new();
        assert_eq!(validator.validate(None, None), Ok(()));
        assert_eq!(validator.validate(None, Some(&json!("anything"))), Ok(()));
    }

    #[test]
    fn empty_response() {
        let err = Validator::new().validate(Some(""), None).unwrap_err();
        assert!(!err.is_malformed());
        assert_eq!(err.to_string(), "Empty response");
    }

    #[test]
    fn malformed_structure_beats_empty_response() {
        let err = Validator::new().validate(Some("(ret"), None).unwrap_err();
        assert!(err.is_malformed());
    }

    #[test]
    fn parsed_structure_is_reusable() {
        let validator = Validator::new();
        let structure = validator.parse("ret > [+]").unwrap();

        assert!(validator
            .validate_structure(&structure, Some(&json!({"ret": [1]})))
            .is_ok());
        assert!(validator
            .validate_structure(&structure, Some(&json!({"ret": []})))
            .is_err());
        assert!(validator
            .validate_structure(&structure, Some(&json!({"ret": [1, 2]})))
            .is_ok());
    }

    #[test]
    fn max_depth() {
        let mut config = Config::new();
        config.max_depth(1);

        let validator = Validator::new_with_config(config);
        assert_eq!(
            validator.validate(Some("a > (b > (c))"), Some(&json!({}))),
            Err(RslError::Malformed(MalformedStructure::MaxDepthExceeded {
                max_depth: 1
            }))
        );
    }

    #[test]
    fn config_from_json() {
        let config: Config = serde_json::from_value(json!({ "maxDepth": 4 })).unwrap();
        let mut expected = Config::new();
        expected.max_depth(4);
        assert_eq!(config, expected);

        let config: Config = serde_json::from_value(json!({})).unwrap();
        assert_eq!(config, Config::default());
    }
}
