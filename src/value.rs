// Copyright 2024 the Tectonic Project
// Licensed under the MIT License

//! The `Value` tagged union accepted by the Value Classifier.
//!
//! A closed Rust enum standing in for what a dynamically-typed build
//! description would otherwise dispatch on with a runtime type-test chain:
//! every admissible value shape gets its own variant here, and an unknown
//! shape is a compile error rather than a hashing-time surprise.

use std::path::PathBuf;
use std::sync::Arc;

use crate::digest::{RuleKey, Sha1HashCode};
use crate::path::{ArchiveMemberSourcePath, SourcePath};
use crate::rule::{Appendable, BuildRule};
use crate::target::BuildTarget;

/// A signed integer of one of the four widths the rule-keying contract
/// names.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum IntValue {
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
}

/// A floating-point value of one of the two IEEE-754 widths the contract
/// names.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FloatValue {
    F32(f32),
    F64(f64),
}

/// A left/right sum type: a local two-variant enum rather than a pulled-in
/// `either`-shaped crate, since that's all a `Value` needs from it.
#[derive(Clone, Debug)]
pub enum EitherValue {
    Left(Box<Value>),
    Right(Box<Value>),
}

/// The exhaustive tagged union the Value Classifier dispatches over.
///
/// `Arc` wraps everything with a shared-ownership story (`BuildRule`,
/// `Appendable`, lazy thunks) because rule keys are computed across an
/// embarrassingly parallel rule-keying workload: a `BuildRule`'s inputs
/// may be read by whichever worker ends up resolving it.
#[derive(Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(IntValue),
    Float(FloatValue),
    Str(String),
    /// The source text of a regular expression pattern.
    Regex(String),
    Bytes(Vec<u8>),
    /// An enumerator's textual label.
    Enum(String),
    /// The name of a build-rule type (e.g. `java_library`, `kotlin_library`).
    RuleType(String),
    Sequence(Vec<Value>),
    OrderedSet(Vec<Value>),
    UnorderedSet(Vec<Value>),
    OrderedMap(Vec<(Value, Value)>),
    UnorderedMap(Vec<(Value, Value)>),
    /// A lazy computation forced exactly once, at classification time.
    Thunk(Arc<dyn Fn() -> Value + Send + Sync>),
    Option(Option<Box<Value>>),
    Either(EitherValue),
    /// A bare filesystem path, offered directly rather than wrapped in a
    /// `SourcePath` variant. Always rejected (I2); see `AmbiguousPath`.
    Path(PathBuf),
    SourcePath(SourcePath),
    NonHashingSourcePath(SourcePath),
    ArchiveMemberSourcePath(ArchiveMemberSourcePath),
    BuildTarget(BuildTarget),
    BuildRule(Arc<BuildRule>),
    Appendable(Arc<dyn Appendable>),
    /// An already-computed rule key, e.g. one surfaced by a prior
    /// resolution step.
    RuleKey(RuleKey),
    /// An already-computed file content digest.
    Sha1HashCode(Sha1HashCode),
    /// A `SourcePath` paired with an ordered list of flag strings.
    SourceWithFlags(SourcePath, Vec<String>),
    /// A named root directory.
    SourceRoot(String),
}

impl std::fmt::Debug for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "Null"),
            Value::Bool(v) => write!(f, "Bool({v:?})"),
            Value::Int(v) => write!(f, "Int({v:?})"),
            Value::Float(v) => write!(f, "Float({v:?})"),
            Value::Str(v) => write!(f, "Str({v:?})"),
            Value::Regex(v) => write!(f, "Regex({v:?})"),
            Value::Bytes(v) => write!(f, "Bytes({} bytes)", v.len()),
            Value::Enum(v) => write!(f, "Enum({v:?})"),
            Value::RuleType(v) => write!(f, "RuleType({v:?})"),
            Value::Sequence(v) => write!(f, "Sequence({v:?})"),
            Value::OrderedSet(v) => write!(f, "OrderedSet({v:?})"),
            Value::UnorderedSet(v) => write!(f, "UnorderedSet({v:?})"),
            Value::OrderedMap(v) => write!(f, "OrderedMap({v:?})"),
            Value::UnorderedMap(v) => write!(f, "UnorderedMap({v:?})"),
            Value::Thunk(_) => write!(f, "Thunk(..)"),
            Value::Option(v) => write!(f, "Option({v:?})"),
            Value::Either(v) => write!(f, "Either({v:?})"),
            Value::Path(v) => write!(f, "Path({v:?})"),
            Value::SourcePath(v) => write!(f, "SourcePath({v:?})"),
            Value::NonHashingSourcePath(v) => write!(f, "NonHashingSourcePath({v:?})"),
            Value::ArchiveMemberSourcePath(v) => write!(f, "ArchiveMemberSourcePath({v:?})"),
            Value::BuildTarget(v) => write!(f, "BuildTarget({v:?})"),
            Value::BuildRule(v) => write!(f, "BuildRule({v:?})"),
            Value::Appendable(v) => write!(f, "Appendable({v:?})"),
            Value::RuleKey(v) => write!(f, "RuleKey({v:?})"),
            Value::Sha1HashCode(v) => write!(f, "Sha1HashCode({v:?})"),
            Value::SourceWithFlags(sp, flags) => {
                write!(f, "SourceWithFlags({sp:?}, {flags:?})")
            }
            Value::SourceRoot(v) => write!(f, "SourceRoot({v:?})"),
        }
    }
}

impl Value {
    pub fn null() -> Self {
        Value::Null
    }

    pub fn bool(v: bool) -> Self {
        Value::Bool(v)
    }

    pub fn int8(v: i8) -> Self {
        Value::Int(IntValue::I8(v))
    }

    pub fn int16(v: i16) -> Self {
        Value::Int(IntValue::I16(v))
    }

    pub fn int32(v: i32) -> Self {
        Value::Int(IntValue::I32(v))
    }

    pub fn int64(v: i64) -> Self {
        Value::Int(IntValue::I64(v))
    }

    pub fn float32(v: f32) -> Self {
        Value::Float(FloatValue::F32(v))
    }

    pub fn float64(v: f64) -> Self {
        Value::Float(FloatValue::F64(v))
    }

    pub fn str(v: impl Into<String>) -> Self {
        Value::Str(v.into())
    }

    pub fn sequence(items: impl IntoIterator<Item = Value>) -> Self {
        Value::Sequence(items.into_iter().collect())
    }

    pub fn some(v: Value) -> Self {
        Value::Option(Some(Box::new(v)))
    }

    pub fn none() -> Self {
        Value::Option(None)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::int32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::int64(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(inner) => Value::some(inner.into()),
            None => Value::none(),
        }
    }
}
