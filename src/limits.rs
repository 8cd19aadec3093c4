//! Limits and build configuration
//!
//! Limits bound the resources a single schema build may consume: the number of
//! components, the size of content-model automata, and the nesting of model
//! groups. [`BuildConfig`] bundles them with the `maxOccurs` ceiling.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default ceiling for `maxOccurs` values
pub const DEFAULT_MAX_OCCURS_LIMIT: u32 = 1_000_000;

/// Resource limits for a schema build
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    /// Maximum number of schema components (types, elements, attributes)
    pub max_schema_components: usize,

    /// Maximum number of Glushkov positions in one content model
    pub max_positions: usize,

    /// Maximum number of DFA states before a model is lowered to an NFA
    pub max_dfa_states: usize,

    /// Largest occurrence count of a single particle that is unrolled into
    /// copies; larger counts keep one position with an occurrence counter
    pub max_unrolled_occurs: usize,

    /// Maximum nesting depth of model groups after group-reference expansion
    pub max_group_depth: usize,

    /// Largest attribute-use table searched linearly
    pub attr_linear_max: usize,

    /// Largest attribute-use table searched by binary search
    pub attr_binary_max: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_schema_components: 100_000,
            max_positions: 100_000,
            max_dfa_states: 4096,
            max_unrolled_occurs: 256,
            max_group_depth: 256,
            attr_linear_max: 8,
            attr_binary_max: 64,
        }
    }
}

impl Limits {
    /// Create a new Limits with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Create strict limits (more restrictive)
    pub fn strict() -> Self {
        Self {
            max_schema_components: 10_000,
            max_positions: 10_000,
            max_dfa_states: 512,
            max_unrolled_occurs: 64,
            max_group_depth: 64,
            ..Self::default()
        }
    }

    /// Create permissive limits (less restrictive, use with caution)
    pub fn permissive() -> Self {
        Self {
            max_schema_components: 1_000_000,
            max_positions: 1_000_000,
            max_dfa_states: 65_536,
            max_unrolled_occurs: 4096,
            max_group_depth: 4096,
            ..Self::default()
        }
    }

    /// Check if number of schema components is within limits
    pub fn check_schema_components(&self, count: usize) -> Result<()> {
        if count > self.max_schema_components {
            Err(Error::LimitExceeded(format!(
                "schema component count {} exceeds maximum {}",
                count, self.max_schema_components
            )))
        } else {
            Ok(())
        }
    }

    /// Check if the number of content-model positions is within limits
    pub fn check_positions(&self, count: usize) -> Result<()> {
        if count > self.max_positions {
            Err(Error::LimitExceeded(format!(
                "content model position count {} exceeds maximum {}",
                count, self.max_positions
            )))
        } else {
            Ok(())
        }
    }

    /// Check if model group nesting is within limits
    pub fn check_group_depth(&self, depth: usize) -> Result<()> {
        if depth > self.max_group_depth {
            Err(Error::LimitExceeded(format!(
                "model group depth {} exceeds maximum {}",
                depth, self.max_group_depth
            )))
        } else {
            Ok(())
        }
    }
}

/// Configuration of a single schema build
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Resource limits
    pub limits: Limits,

    /// Ceiling for `maxOccurs`; 0 selects [`DEFAULT_MAX_OCCURS_LIMIT`]
    pub max_occurs_limit: u32,
}

impl BuildConfig {
    /// Create a configuration with default limits
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the `maxOccurs` ceiling
    pub fn with_max_occurs_limit(mut self, limit: u32) -> Self {
        self.max_occurs_limit = limit;
        self
    }

    /// Set the resource limits
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Effective `maxOccurs` ceiling
    pub fn effective_max_occurs_limit(&self) -> u32 {
        if self.max_occurs_limit == 0 {
            DEFAULT_MAX_OCCURS_LIMIT
        } else {
            self.max_occurs_limit
        }
    }

    /// Check a bounded `maxOccurs` value against the ceiling
    pub fn check_max_occurs(&self, value: u32) -> Result<()> {
        let limit = self.effective_max_occurs_limit();
        if value > limit {
            Err(Error::OccursTooLarge { value, limit })
        } else {
            Ok(())
        }
    }

    /// Load a configuration from JSON; missing fields take their defaults
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text)
            .map_err(|e| Error::constraint(format!("invalid build configuration: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_limits() {
        let limits = Limits::default();
        assert_eq!(limits.attr_linear_max, 8);
        assert_eq!(limits.attr_binary_max, 64);
        assert!(limits.check_schema_components(500).is_ok());
        assert!(limits.check_schema_components(200_000).is_err());
    }

    #[test]
    fn test_strict_limits() {
        let limits = Limits::strict();
        assert!(limits.max_positions < Limits::default().max_positions);
        assert!(limits.check_group_depth(100).is_err());
    }

    #[test]
    fn test_permissive_limits() {
        let limits = Limits::permissive();
        assert!(limits.max_dfa_states > Limits::default().max_dfa_states);
        assert!(limits.check_positions(500_000).is_ok());
    }

    #[test]
    fn test_max_occurs_limit_default() {
        let config = BuildConfig::default();
        assert_eq!(config.effective_max_occurs_limit(), DEFAULT_MAX_OCCURS_LIMIT);
        assert!(config.check_max_occurs(1_000_000).is_ok());
        assert_eq!(
            config.check_max_occurs(1_000_001),
            Err(Error::OccursTooLarge {
                value: 1_000_001,
                limit: 1_000_000
            })
        );
    }

    #[test]
    fn test_config_from_json() {
        let config = BuildConfig::from_json(r#"{"max_occurs_limit": 1, "limits": {"attr_linear_max": 2}}"#)
            .unwrap();
        assert_eq!(config.effective_max_occurs_limit(), 1);
        assert_eq!(config.limits.attr_linear_max, 2);
        assert_eq!(config.limits.attr_binary_max, 64);

        assert!(BuildConfig::from_json("{").is_err());
    }
}
