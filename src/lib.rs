// Copyright 2024 the Tectonic Project
// Licensed under the MIT License

//! Deterministic content-addressing for build rules.
//!
//! A rule key is a 160-bit fingerprint of everything that can affect a
//! build rule's output: its tool versions, its source files' content, its
//! declared flags, and the keys of the other rules it depends on. Two
//! builds that produce equal rule keys for the same rule are assumed to
//! produce identical output, so a build-step executor can skip the work and
//! reuse a cached result.
//!
//! The entry points are [`builder::RuleKeyBuilder`] (fed one `(field,
//! value)` pair at a time, then finalized into a [`digest::RuleKey`]) and
//! [`rule::RuleKeyMemo`] (which memoizes a whole [`rule::BuildRule`]'s key
//! by target, so that a rule referenced from two different inputs is only
//! computed once).

pub mod builder;
mod classify;
pub mod config;
pub mod digest;
pub mod error;
pub mod file_hash;
pub mod logger;
pub mod path;
pub mod rule;
pub mod target;
pub mod value;

pub use builder::{BuilderContext, RuleKeyBuilder};
pub use digest::{RuleKey, Sha1HashCode};
pub use error::{Result, RuleKeyError};
pub use file_hash::{ArchiveMemberReader, FileHashOracle};
pub use logger::{NoopRuleKeyLogger, RuleKeyEvent, RuleKeyLogger, VerboseRuleKeyLogger};
pub use path::{ArchiveMemberSourcePath, PathResolver, SourcePath};
pub use rule::{Appendable, BuildRule, RuleKeyMemo};
pub use target::BuildTarget;
pub use value::{EitherValue, FloatValue, IntValue, Value};
