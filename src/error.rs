// Copyright 2024 the Tectonic Project
// Licensed under the MIT License

//! Typed errors for rule-key computation.
//!
//! Rule keying needs callers (and tests) to distinguish *why* a key could
//! not be computed, so each failure mode gets its own enum variant here;
//! ambient, non-deterministic I/O (reading the working directory, loading
//! config) still flows through `tectonic_errors` at the edges.

use thiserror::Error;

/// The result type used throughout the rule-key engine.
pub type Result<T> = std::result::Result<T, RuleKeyError>;

/// A reason a rule-key computation could not complete.
///
/// None of these are recovered locally: encountering one aborts the current
/// rule-key computation, and the rule is not cacheable this time around.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RuleKeyError {
    /// A bare filesystem path was offered as a `Value` instead of one of the
    /// `SourcePath` variants.
    #[error(
        "field `{field}`: a bare filesystem path (`{path}`) cannot be hashed directly; wrap it in a SourcePath"
    )]
    AmbiguousPath { field: String, path: String },

    /// The File-Hash Oracle has no digest for an absolute path.
    #[error("field `{field}`: no content digest available for `{path}`")]
    MissingFileHash { field: String, path: String },

    /// The classifier was asked to encode a value shape it doesn't know.
    #[error("field `{field}`: unsupported value shape `{shape}`")]
    UnsupportedValue { field: String, shape: &'static str },

    /// An unordered map or set was admitted while running in strict mode.
    #[error("field `{field}`: unordered collection admitted under strict mode")]
    UnorderedCollection { field: String },

    /// The absolute/relative invariants of an archive-member source path
    /// were violated.
    #[error("field `{field}`: invalid archive-member source path: {reason}")]
    InvalidArchiveMemberPaths { field: String, reason: String },

    /// Rule resolution found a rule that is already in progress on the
    /// current resolution stack.
    #[error("cyclic rule graph detected while resolving `{target}`")]
    CyclicRuleGraph { target: String },
}
