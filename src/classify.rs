// Copyright 2024 the Tectonic Project
// Licensed under the MIT License

//! The Value Classifier: dispatches a `Value` to its canonical byte
//! encoding, implemented as methods on [`RuleKeyBuilder`].
//!
//! One match arm per `Value` variant, no runtime type introspection.

use std::sync::Arc;

use crate::builder::RuleKeyBuilder;
use crate::error::{Result, RuleKeyError};
use crate::logger::RuleKeyEvent;
use crate::path::{ArchiveMemberSourcePath, SourcePath};
use crate::rule::BuildRule;
use crate::value::{EitherValue, FloatValue, IntValue, Value};

impl<'a> RuleKeyBuilder<'a> {
    pub(crate) fn classify(&mut self, field: &str, value: Value) -> Result<()> {
        match value {
            Value::Null => {
                self.log(RuleKeyEvent::NullValue {
                    field: field.to_string(),
                });
                self.absorb_null();
            }

            Value::Bool(b) => {
                self.log(RuleKeyEvent::AddedValue {
                    field: field.to_string(),
                    shape: "bool",
                });
                self.absorb_str(if b { "t" } else { "f" });
            }

            Value::Int(i) => {
                self.log(RuleKeyEvent::AddedValue {
                    field: field.to_string(),
                    shape: "int",
                });
                match i {
                    IntValue::I8(v) => self.absorb_fixed(v),
                    IntValue::I16(v) => self.absorb_fixed(v),
                    IntValue::I32(v) => self.absorb_fixed(v),
                    IntValue::I64(v) => self.absorb_fixed(v),
                }
            }

            Value::Float(f) => {
                self.log(RuleKeyEvent::AddedValue {
                    field: field.to_string(),
                    shape: "float",
                });
                match f {
                    FloatValue::F32(v) => self.absorb_fixed(v),
                    FloatValue::F64(v) => self.absorb_fixed(v),
                }
            }

            Value::Str(s) => self.absorb_str(&s),
            Value::Regex(pattern) => self.absorb_str(&pattern),
            Value::Bytes(bytes) => self.absorb_raw(&bytes),
            Value::Enum(label) => self.absorb_str(&label),
            Value::RuleType(name) => self.absorb_str(&name),
            Value::SourceRoot(name) => self.absorb_str(&name),

            Value::RuleKey(key) => self.absorb_str(&key.to_string()),
            Value::Sha1HashCode(digest) => self.absorb_raw(digest.as_bytes()),

            Value::Path(path) => {
                return Err(RuleKeyError::AmbiguousPath {
                    field: field.to_string(),
                    path: path.display().to_string(),
                });
            }

            Value::BuildTarget(target) => self.absorb_str(&target.fully_qualified_name()),

            Value::BuildRule(rule) => self.classify_build_rule(field, rule)?,
            Value::Appendable(app) => self.classify_appendable(field, app)?,

            Value::SourcePath(sp) => self.classify_hashing_source_path(field, sp)?,
            Value::NonHashingSourcePath(sp) => self.classify_non_hashing_source_path(sp),
            Value::ArchiveMemberSourcePath(amsp) => self.classify_archive_member(field, amsp)?,

            Value::SourceWithFlags(sp, flags) => {
                self.classify_hashing_source_path(field, sp)?;
                self.absorb_str("[");
                self.log(RuleKeyEvent::PushSourceWithFlags {
                    field: field.to_string(),
                    flags: flags.clone(),
                });
                for flag in &flags {
                    self.absorb_str(flag);
                    self.absorb_str(",");
                }
                self.absorb_str("]");
            }

            Value::Option(opt) => match opt {
                Some(inner) => self.classify(field, *inner)?,
                None => self.classify(field, Value::Null)?,
            },

            Value::Either(either) => match either {
                EitherValue::Left(inner) => self.classify(field, *inner)?,
                EitherValue::Right(inner) => self.classify(field, *inner)?,
            },

            Value::Thunk(thunk) => {
                let produced = (*thunk)();
                self.classify(field, produced)?;
            }

            Value::Sequence(items) => self.classify_sequence(field, items)?,
            Value::OrderedSet(items) => self.classify_sequence(field, items)?,

            Value::UnorderedSet(items) => {
                self.warn_unordered(field)?;
                self.classify_sequence(field, items)?;
            }

            Value::OrderedMap(entries) => self.classify_ordered_map(field, entries)?,

            Value::UnorderedMap(entries) => {
                self.warn_unordered(field)?;
                self.classify_ordered_map(field, entries)?;
            }
        }

        Ok(())
    }

    fn warn_unordered(&mut self, field: &str) -> Result<()> {
        if self.context().config.strict_unordered_collections {
            return Err(RuleKeyError::UnorderedCollection {
                field: field.to_string(),
            });
        }

        self.log(RuleKeyEvent::UnorderedCollectionWarning {
            field: field.to_string(),
        });
        Ok(())
    }

    fn classify_sequence(&mut self, field: &str, items: Vec<Value>) -> Result<()> {
        for item in items {
            self.classify(field, item)?;
        }
        Ok(())
    }

    fn classify_ordered_map(&mut self, field: &str, entries: Vec<(Value, Value)>) -> Result<()> {
        self.log(RuleKeyEvent::PushMap {
            field: field.to_string(),
            len: entries.len(),
        });
        self.absorb_str("{");

        for (key, val) in entries {
            let token = self.push_scope(field);
            self.log(RuleKeyEvent::PushMapKey {
                field: field.to_string(),
            });
            self.classify(field, key)?;
            self.pop_scope(token);

            self.absorb_str(" -> ");

            let token = self.push_scope(field);
            self.log(RuleKeyEvent::PushMapValue {
                field: field.to_string(),
            });
            self.classify(field, val)?;
            self.pop_scope(token);
        }

        self.absorb_str("}");
        Ok(())
    }

    fn classify_build_rule(&mut self, _field: &str, rule: Arc<BuildRule>) -> Result<()> {
        self.absorb_str(&rule.target().fully_qualified_name());
        let ctx = self.context().clone();
        let key = ctx.memo.compute(&rule, &ctx, self.logger_ref())?;
        self.absorb_str(&key.to_string());
        Ok(())
    }

    fn classify_appendable(&mut self, field: &str, app: Arc<dyn crate::rule::Appendable>) -> Result<()> {
        if let Some(rule) = app.as_build_rule() {
            self.classify_build_rule(field, rule)?;
        }
        let sub_key = self.compute_appendable_subkey(app)?;
        self.absorb_str(&sub_key.to_string());
        Ok(())
    }

    fn classify_hashing_source_path(&mut self, field: &str, sp: SourcePath) -> Result<()> {
        if let Some(rule) = self.context().resolver.owning_rule(&sp) {
            self.absorb_str(&format!("rule-output:{}", rule.target().fully_qualified_name()));
            return self.classify_build_rule(field, rule);
        }

        match sp {
            SourcePath::ArchiveMember(amsp) => self.classify_archive_member(field, amsp),

            SourcePath::RuleOutput(_) => {
                unreachable!("owning_rule resolves every RuleOutput path above")
            }

            SourcePath::Filesystem(path) => {
                let absolute = self.context().resolver.resolve_absolute(&path);
                let digest = self.context().oracle.digest_file(&absolute)?;
                let text = self.narrowed_path_text(&absolute);
                self.log(RuleKeyEvent::AddedPath {
                    field: field.to_string(),
                    path: text.clone(),
                });
                self.absorb_str(&text);
                self.absorb_str(&digest.to_string());
                Ok(())
            }

            SourcePath::Resource(_id) => Err(RuleKeyError::UnsupportedValue {
                field: field.to_string(),
                shape: "hashing SourcePath::Resource (resources are non-hashing only)",
            }),
        }
    }

    fn classify_non_hashing_source_path(&mut self, sp: SourcePath) {
        if let Some(rule) = self.context().resolver.owning_rule(&sp) {
            self.absorb_str(&rule.target().fully_qualified_name());
            return;
        }

        let text = match sp {
            SourcePath::Filesystem(path) => {
                let absolute = self.context().resolver.resolve_absolute(&path);
                self.narrowed_path_text(&absolute)
            }
            SourcePath::Resource(id) => id,
            SourcePath::RuleOutput(_) => {
                unreachable!("owning_rule resolves every RuleOutput path above")
            }
            SourcePath::ArchiveMember(amsp) => amsp.member_relative.to_string_lossy().into_owned(),
        };
        self.absorb_str(&text);
    }

    fn classify_archive_member(&mut self, field: &str, amsp: ArchiveMemberSourcePath) -> Result<()> {
        let (archive_abs, member_rel) = self.context().resolver.resolve_archive_member(&amsp)?;
        let digest = self.context().oracle.digest_archive_member(&archive_abs, &member_rel)?;
        let member_text = member_rel.to_string_lossy().into_owned();
        self.log(RuleKeyEvent::AddedArchiveMember {
            field: field.to_string(),
            archive: archive_abs.display().to_string(),
            member: member_text.clone(),
        });
        self.absorb_str(&member_text);
        self.absorb_str(&digest.to_string());
        Ok(())
    }

    /// Renders an absolute path relative to the
    /// workspace root when possible, falling back to the bare filename when
    /// the path escapes the workspace.
    fn narrowed_path_text(&self, absolute: &std::path::Path) -> String {
        match self.context().resolver.resolve_relative(absolute) {
            Some(rel) => rel.to_string_lossy().into_owned(),
            None => absolute
                .file_name()
                .map(|f| f.to_string_lossy().into_owned())
                .unwrap_or_default(),
        }
    }
}
