// Copyright 2024 the Tectonic Project
// Licensed under the MIT License

//! Build rules, their declared inputs, and the memo table that resolves a
//! rule to its rule key.
//!
//! The rule-key memo is a shared, internally synchronized table handed out
//! by reference, the same "shared id table" shape as an interning table:
//! entries are written once per key and read by any number of concurrent
//! callers afterward.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use crate::builder::{BuilderContext, RuleKeyBuilder};
use crate::digest::RuleKey;
use crate::error::{Result, RuleKeyError};
use crate::logger::RuleKeyLogger;
use crate::target::BuildTarget;
use crate::value::Value;

/// A build rule: a target identity, plus the ordered `(field, value)` pairs
/// it declares as inputs to its rule key.
///
/// Rules form a DAG (cyclic rule graphs are forbidden and detected by
/// [`RuleKeyMemo`]). A `BuildRule`'s own `RuleKey` is not stored on the
/// struct itself; it is computed on demand and cached by [`RuleKeyMemo`],
/// keyed by `BuildTarget`, so that the same rule reached from two different
/// callers resolves to one shared computation.
#[derive(Debug)]
pub struct BuildRule {
    target: BuildTarget,
    inputs: Vec<(String, Value)>,
}

impl BuildRule {
    pub fn new(target: BuildTarget, inputs: Vec<(String, Value)>) -> Self {
        BuildRule { target, inputs }
    }

    pub fn target(&self) -> &BuildTarget {
        &self.target
    }

    pub fn inputs(&self) -> &[(String, Value)] {
        &self.inputs
    }
}

/// A sub-structure that contributes its own sub-key to a rule key rather
/// than being inlined field by field.
///
/// Object-safe so that `Value::Appendable` can hold a `dyn` trait object;
/// `Send + Sync` so appendables can be shared across the embarrassingly
/// parallel rule-keying workload the same way `BuildRule`s are.
pub trait Appendable: std::fmt::Debug + Send + Sync {
    /// Drives a fresh Rule-Key Builder to compute this appendable's sub-key.
    fn append_to(&self, builder: &mut RuleKeyBuilder<'_>) -> Result<()>;

    /// Some appendable values are simultaneously build rules: the same
    /// underlying object should contribute both its appendable sub-key
    /// *and* its own rule key. Appendables that aren't also rules leave
    /// this as `None`.
    fn as_build_rule(&self) -> Option<Arc<BuildRule>> {
        None
    }
}

/// The process-wide, internally-synchronized table of computed `BuildRule`
/// rule keys, keyed by `BuildTarget`.
///
/// Concurrent requesters of the same target either share one computation or
/// each compute independently and agree on the result, because the
/// computation is deterministic; this implementation takes the simpler
/// "recompute and overwrite" path rather than single-flight deduplication.
///
/// Explicit init (`RuleKeyMemo::new`) with no ambient default: the rule-key
/// memo is a per-build collaborator, constructed once per build and passed
/// by reference, not a process-global singleton.
#[derive(Debug, Default)]
pub struct RuleKeyMemo {
    table: Mutex<HashMap<BuildTarget, RuleKey>>,
    in_progress: Mutex<HashSet<BuildTarget>>,
}

impl RuleKeyMemo {
    pub fn new() -> Self {
        RuleKeyMemo::default()
    }

    /// Returns the already-computed key for `target`, if any.
    pub fn get(&self, target: &BuildTarget) -> Option<RuleKey> {
        self.table.lock().unwrap().get(target).cloned()
    }

    /// Computes (or returns the cached) rule key for `rule`.
    ///
    /// A rule found already in progress on the current resolution stack
    /// means the rule graph has a cycle: fatal, not a silently-tolerated
    /// loop.
    pub fn compute(
        self: &Arc<Self>,
        rule: &Arc<BuildRule>,
        ctx: &BuilderContext,
        logger: &mut dyn RuleKeyLogger,
    ) -> Result<RuleKey> {
        if let Some(key) = self.get(rule.target()) {
            return Ok(key);
        }

        {
            let mut in_progress = self.in_progress.lock().unwrap();
            if !in_progress.insert(rule.target().clone()) {
                return Err(RuleKeyError::CyclicRuleGraph {
                    target: rule.target().fully_qualified_name(),
                });
            }
        }

        let result = (|| {
            let mut sub = RuleKeyBuilder::new(ctx.clone(), logger);
            for (name, value) in rule.inputs() {
                sub.set(name, value.clone())?;
            }
            sub.finalize()
        })();

        self.in_progress.lock().unwrap().remove(rule.target());

        let key = result?;
        self.table
            .lock()
            .unwrap()
            .insert(rule.target().clone(), key.clone());

        logger.log(crate::logger::RuleKeyEvent::RegisteredRuleKey {
            target: rule.target().fully_qualified_name(),
            key: key.to_string(),
        });

        Ok(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::BuilderContext;
    use crate::config::RuleKeyConfig;
    use crate::file_hash::FileHashOracle;
    use crate::logger::NoopRuleKeyLogger;
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
    fn identical_inputs_produce_identical_keys() {
        let ctx = ctx();
        let mut logger = NoopRuleKeyLogger;

        let a = Arc::new(BuildRule::new(
            BuildTarget::unflavored("//x", "a"),
            vec![("n".to_string(), Value::int32(7))],
        ));
        let b = Arc::new(BuildRule::new(
            BuildTarget::unflavored("//x", "b"),
            vec![("n".to_string(), Value::int32(7))],
        ));

        let ka = ctx.memo.clone().compute(&a, &ctx, &mut logger).unwrap();
        let kb = ctx.memo.clone().compute(&b, &ctx, &mut logger).unwrap();
        assert_eq!(ka.as_bytes(), kb.as_bytes());
    }

    #[test]
    fn memoizes_by_target() {
        let ctx = ctx();
        let mut logger = NoopRuleKeyLogger;

        let rule = Arc::new(BuildRule::new(
            BuildTarget::unflavored("//x", "a"),
            vec![("n".to_string(), Value::int32(7))],
        ));

        let k1 = ctx.memo.clone().compute(&rule, &ctx, &mut logger).unwrap();
        assert_eq!(ctx.memo.get(rule.target()).unwrap().as_bytes(), k1.as_bytes());
    }

    #[test]
    fn detects_cycles() {
        // A rule whose own Appendable contribution tries to resolve itself
        // again before finishing; simulate by marking it in-progress and
        // attempting to compute it a second time reentrantly.
        let ctx = ctx();
        let mut logger = NoopRuleKeyLogger;
        let target = BuildTarget::unflavored("//x", "self");
        ctx.memo
            .in_progress
            .lock()
            .unwrap()
            .insert(target.clone());

        let rule = Arc::new(BuildRule::new(target, vec![]));
        let err = ctx.memo.clone().compute(&rule, &ctx, &mut logger).unwrap_err();
        assert!(matches!(err, RuleKeyError::CyclicRuleGraph { .. }));
    }
}
