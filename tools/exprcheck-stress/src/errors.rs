//! Errors for configuration, generation and profile loading.

use std::path::PathBuf;

use thiserror::Error;

/// A `GenConfig` that cannot drive generation.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("integer constant range is empty: {min} > {max}")]
    InvalidIntRange { min: u64, max: u64 },

    #[error("double constant range [{min}, {max}] is empty or not finite, or its width overflows")]
    InvalidDoubleRange { min: f64, max: f64 },

    #[error("{name} must be a probability in [0, 1], got {value}")]
    InvalidProbability { name: &'static str, value: f64 },

    #[error("weight of {kind} must be finite and non-negative, got {value}")]
    InvalidWeight { kind: &'static str, value: f64 },

    #[error("dampening factor of {kind} must be in [0, 1], got {value}")]
    InvalidDampening { kind: &'static str, value: f64 },

    #[error("no terminal expression kind has a positive weight")]
    NoTerminalExprKind,

    #[error("type kinds are enabled but neither scalar_type nor tagged_type has a positive weight")]
    NoTerminalTypeKind,

    #[error("{kind} is enabled but its operator mask is empty")]
    EmptyOperatorMask { kind: &'static str },

    #[error("{kind} is enabled but no {what} are configured")]
    MissingNames {
        kind: &'static str,
        what: &'static str,
    },
}

/// Generation got stuck at some node. Only reachable through an RNG that
/// returns nothing for a validated configuration.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GenError {
    #[error("no expression kind can be chosen at depth {depth}")]
    NoViableExprKind { depth: usize },

    #[error("no type kind can be chosen at depth {depth}")]
    NoViableTypeKind { depth: usize },

    #[error("no {kind} operator can be chosen")]
    NoViableOperator { kind: &'static str },

    #[error("no {what} to choose from")]
    NoNames { what: &'static str },
}

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("unknown profile '{name}', available profiles: {}", available.join(", "))]
    Unknown {
        name: String,
        available: Vec<&'static str>,
    },

    #[error("failed to read profile file '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse profile '{origin}': {source}")]
    Parse {
        origin: String,
        #[source]
        source: toml::de::Error,
    },
}
