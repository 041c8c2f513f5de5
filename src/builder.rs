// Copyright 2024 the Tectonic Project
// Licensed under the MIT License

//! The Rule-Key Builder: orchestrates the digest sink, path resolver, file-hash
//! oracle, and rule memo behind a keyed `(field, value)` stream.
//!
//! `BuilderContext` bundles the collaborators a rule-keying request needs
//! behind one struct, constructed once per build and passed by reference,
//! rather than threaded through as separate arguments or reached for as
//! ambient globals.

use std::sync::Arc;
use string_interner::{DefaultSymbol, StringInterner};

use crate::config::RuleKeyConfig;
use crate::digest::RuleKey;
use crate::error::Result;
use crate::file_hash::FileHashOracle;
use crate::logger::RuleKeyLogger;
use crate::path::PathResolver;
use crate::rule::{Appendable, RuleKeyMemo};
use crate::value::Value;

/// The collaborators a [`RuleKeyBuilder`] needs: where files live, how their
/// content is hashed, what other rules have already resolved to, and how
/// strict to be about ordering ambiguity.
///
/// Cheap to clone: every field but `config` is an `Arc`. Each top-level
/// rule-keying request gets its own `RuleKeyBuilder`, but they all share one
/// `BuilderContext` for the lifetime of a build.
#[derive(Clone)]
pub struct BuilderContext {
    pub resolver: Arc<PathResolver>,
    pub oracle: Arc<FileHashOracle>,
    pub memo: Arc<RuleKeyMemo>,
    pub config: RuleKeyConfig,
}

impl BuilderContext {
    pub fn new(
        resolver: Arc<PathResolver>,
        oracle: Arc<FileHashOracle>,
        memo: Arc<RuleKeyMemo>,
        config: RuleKeyConfig,
    ) -> Self {
        BuilderContext {
            resolver,
            oracle,
            memo,
            config,
        }
    }
}

/// Drives one rule key to completion.
///
/// Fed in a single-threaded fashion from construction to [`finalize`], never
/// shared across threads itself (the collaborators inside `BuilderContext`
/// are the shared, thread-safe parts). See `classify.rs` for how individual
/// `Value` shapes turn into absorbed bytes.
///
/// [`finalize`]: RuleKeyBuilder::finalize
pub struct RuleKeyBuilder<'a> {
    sink: crate::digest::DigestSink,
    ctx: BuilderContext,
    /// Field names seen by this builder, interned so that a deeply nested
    /// or heavily-repeated field (the same name recurring across every
    /// element of a collection, see `classify_sequence`) costs one string
    /// allocation instead of one per push. Scoped to a single builder's
    /// lifetime rather than kept process-wide.
    field_names: StringInterner,
    context_stack: Vec<DefaultSymbol>,
    logger: &'a mut dyn RuleKeyLogger,
}

impl<'a> RuleKeyBuilder<'a> {
    pub fn new(ctx: BuilderContext, logger: &'a mut dyn RuleKeyLogger) -> Self {
        RuleKeyBuilder {
            sink: crate::digest::DigestSink::new(),
            ctx,
            field_names: StringInterner::default(),
            context_stack: Vec::new(),
            logger,
        }
    }

    pub fn context(&self) -> &BuilderContext {
        &self.ctx
    }

    /// Pushes `name` onto the key-context stack, returning the stack depth
    /// to restore on exit from this field's scope.
    fn push_field(&mut self, name: &str) -> usize {
        let token = self.context_stack.len();
        let symbol = self.field_names.get_or_intern(name);
        self.context_stack.push(symbol);
        token
    }

    fn pop_to(&mut self, token: usize) {
        self.context_stack.truncate(token);
    }

    /// Emits every pending field name (oldest first), each followed by a
    /// separator, then clears the stack. Called immediately before any
    /// primitive byte run reaches the sink, so a field name is absorbed
    /// exactly once per contiguous run of primitives beneath it.
    fn drain_context(&mut self) {
        for symbol in self.context_stack.drain(..) {
            let name = self
                .field_names
                .resolve(symbol)
                .expect("symbol was interned by this builder");
            self.sink.absorb_chars(name);
            self.sink.absorb_separator();
        }
    }

    pub(crate) fn absorb_str(&mut self, s: &str) {
        self.drain_context();
        self.sink.absorb_chars(s);
        self.sink.absorb_separator();
    }

    pub(crate) fn absorb_raw(&mut self, bytes: &[u8]) {
        self.drain_context();
        self.sink.absorb_bytes(bytes);
        self.sink.absorb_separator();
    }

    pub(crate) fn absorb_fixed<T: crate::digest::FixedWidth>(&mut self, value: T) {
        self.drain_context();
        self.sink.absorb_fixed(value);
        self.sink.absorb_separator();
    }

    /// Emits the empty byte run used for null values.
    pub(crate) fn absorb_null(&mut self) {
        self.drain_context();
        self.sink.absorb_separator();
    }

    pub(crate) fn log(&mut self, event: crate::logger::RuleKeyEvent) {
        self.logger.log(event);
    }

    pub(crate) fn logger_ref(&mut self) -> &mut dyn RuleKeyLogger {
        &mut *self.logger
    }

    pub(crate) fn push_scope(&mut self, name: &str) -> usize {
        self.push_field(name)
    }

    pub(crate) fn pop_scope(&mut self, token: usize) {
        self.pop_to(token)
    }

    /// Computes the sub-key of an appendable by driving a fresh builder
    /// sharing this one's collaborators.
    pub(crate) fn compute_appendable_subkey(&mut self, app: Arc<dyn Appendable>) -> Result<RuleKey> {
        let ctx = self.ctx.clone();
        let mut sub = RuleKeyBuilder::new(ctx, &mut *self.logger);
        app.append_to(&mut sub)?;
        sub.finalize()
    }

    /// `set(name, value)`: push `name`, classify `value`, pop back to the
    /// prior scope.
    pub fn set(&mut self, name: &str, value: Value) -> Result<()> {
        let token = self.push_field(name);
        self.log(crate::logger::RuleKeyEvent::PushKey {
            field: name.to_string(),
        });
        let result = self.classify(name, value);
        self.pop_to(token);
        result
    }

    /// The public entry point. Handles appendables and options before
    /// falling through to the classifier for everything else.
    pub fn set_reflectively(&mut self, name: &str, value: Value) -> Result<()> {
        if let Value::Appendable(app) = &value {
            let app = app.clone();
            let sub_key = self.compute_appendable_subkey(app.clone())?;
            self.set(&format!("{name}.appendableSubKey"), Value::RuleKey(sub_key))?;
            if let Some(rule) = app.as_build_rule() {
                self.set(name, Value::BuildRule(rule))?;
            }
            return Ok(());
        }

        self.set(name, value)
    }

    /// Drains any residual key-context (none should remain; every `set`
    /// call pops back to its own entry point) and produces the final key.
    pub fn finalize(self) -> Result<RuleKey> {
        Ok(self.sink.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RuleKeyConfig;
    use crate::file_hash::FileHashOracle;
    use crate::logger::{NoopRuleKeyLogger, RuleKeyEvent, VerboseRuleKeyLogger};
    use crate::path::PathResolver;

    fn ctx() -> BuilderContext {
        BuilderContext::new(
            Arc::new(PathResolver::new("/ws")),
            Arc::new(FileHashOracle::new()),
            Arc::new(RuleKeyMemo::new()),
            RuleKeyConfig::default(),
        )
    }

    #[test]
    fn set_pops_the_key_context_stack_back_to_empty() {
        let mut logger = NoopRuleKeyLogger;
        let mut b = RuleKeyBuilder::new(ctx(), &mut logger);
        b.set("a", Value::int32(1)).unwrap();
        assert!(b.context_stack.is_empty());
    }

    #[test]
    fn set_emits_one_push_key_event_per_call() {
        let mut logger = VerboseRuleKeyLogger::default();
        let mut b = RuleKeyBuilder::new(ctx(), &mut logger);
        b.set("a", Value::int32(1)).unwrap();
        b.set("b", Value::int32(2)).unwrap();
        let push_keys = logger
            .events
            .iter()
            .filter(|e| matches!(e, RuleKeyEvent::PushKey { .. }))
            .count();
        assert_eq!(push_keys, 2);
    }

    #[test]
    fn repeated_field_names_intern_to_the_same_symbol() {
        let mut logger = NoopRuleKeyLogger;
        let mut b = RuleKeyBuilder::new(ctx(), &mut logger);
        b.set("repeated", Value::int32(1)).unwrap();
        b.set("repeated", Value::int32(2)).unwrap();
        assert_eq!(
            b.field_names.get_or_intern("repeated"),
            b.field_names.get_or_intern("repeated")
        );
    }

    #[test]
    fn set_reflectively_on_a_plain_value_behaves_like_set() {
        let k1 = {
            let mut logger = NoopRuleKeyLogger;
            let mut b = RuleKeyBuilder::new(ctx(), &mut logger);
            b.set_reflectively("n", Value::int32(5)).unwrap();
            b.finalize().unwrap()
        };
        let k2 = {
            let mut logger = NoopRuleKeyLogger;
            let mut b = RuleKeyBuilder::new(ctx(), &mut logger);
            b.set("n", Value::int32(5)).unwrap();
            b.finalize().unwrap()
        };
        assert_eq!(k1.as_bytes(), k2.as_bytes());
    }
}
