// Copyright 2024 the Tectonic Project
// Licensed under the MIT License

//! `SourcePath` and the resolver that turns it into concrete filesystem
//! locations.
//!
//! A `SourcePath` is what a value *is* (one of four variants); the resolver
//! is what turns it into an absolute path, a workspace-relative path, or
//! (for rule-produced paths) the `BuildRule` that produces it.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{Result, RuleKeyError};
use crate::rule::BuildRule;

/// An archive (jar/zip) member: the archive's absolute path, paired with
/// the member's path relative to the archive root.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArchiveMemberSourcePath {
    pub archive_absolute: PathBuf,
    pub member_relative: PathBuf,
}

impl ArchiveMemberSourcePath {
    pub fn new(archive_absolute: impl Into<PathBuf>, member_relative: impl Into<PathBuf>) -> Self {
        ArchiveMemberSourcePath {
            archive_absolute: archive_absolute.into(),
            member_relative: member_relative.into(),
        }
    }
}

/// A polymorphic handle to a file input.
///
/// Callers construct one of these four variants explicitly; nothing in this
/// crate ever infers which kind a path "really" is.
#[derive(Clone, Debug)]
pub enum SourcePath {
    /// An absolute or workspace-relative filesystem location.
    Filesystem(PathBuf),
    /// A file produced by another rule's build step.
    RuleOutput(Arc<BuildRule>),
    /// A member of a containing archive.
    ArchiveMember(ArchiveMemberSourcePath),
    /// An opaque resource identifier, meaningful only in non-hashing mode.
    Resource(String),
}

impl SourcePath {
    pub fn filesystem(path: impl Into<PathBuf>) -> Self {
        SourcePath::Filesystem(path.into())
    }

    pub fn rule_output(rule: Arc<BuildRule>) -> Self {
        SourcePath::RuleOutput(rule)
    }

    pub fn archive_member(archive_absolute: impl Into<PathBuf>, member_relative: impl Into<PathBuf>) -> Self {
        SourcePath::ArchiveMember(ArchiveMemberSourcePath::new(archive_absolute, member_relative))
    }

    pub fn resource(id: impl Into<String>) -> Self {
        SourcePath::Resource(id.into())
    }
}

/// Resolves `SourcePath`s to concrete filesystem locations and rule
/// ownership, against a fixed workspace root.
///
/// Immutable after construction: the workspace root never changes over the
/// lifetime of a build.
#[derive(Debug, Clone)]
pub struct PathResolver {
    workspace_root: PathBuf,
}

impl PathResolver {
    pub fn new(workspace_root: impl Into<PathBuf>) -> Self {
        PathResolver {
            workspace_root: workspace_root.into(),
        }
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    /// Resolves a path (absolute, or relative to the workspace root) to an
    /// absolute path.
    ///
    /// Only meaningful for the `Filesystem` variant; the classifier never
    /// calls this for `RuleOutput`, `ArchiveMember`, or `Resource`, since
    /// those are handled without reference to the filesystem at all (see
    /// `classify.rs`).
    pub fn resolve_absolute(&self, raw: &Path) -> PathBuf {
        if raw.is_absolute() {
            raw.to_path_buf()
        } else {
            self.workspace_root.join(raw)
        }
    }

    /// Tries to express an absolute path relative to the workspace root.
    ///
    /// Returns `None` when the path escapes the workspace, in which case
    /// the caller falls back to the absolute path's filename so that tool
    /// locations outside the workspace don't bleed their full path into a
    /// rule key.
    pub fn resolve_relative(&self, absolute: &Path) -> Option<PathBuf> {
        absolute
            .strip_prefix(&self.workspace_root)
            .ok()
            .map(Path::to_path_buf)
    }

    /// Returns the rule that owns a `SourcePath`, if any.
    pub fn owning_rule(&self, sp: &SourcePath) -> Option<Arc<BuildRule>> {
        match sp {
            SourcePath::RuleOutput(rule) => Some(rule.clone()),
            _ => None,
        }
    }

    /// Validates and extracts the two paths that make up an archive member.
    ///
    /// A violation of the absolute/relative invariants is a programmer
    /// error, not a user-facing ambiguity like a bare filesystem path.
    pub fn resolve_archive_member(
        &self,
        amsp: &ArchiveMemberSourcePath,
    ) -> Result<(PathBuf, PathBuf)> {
        if !amsp.archive_absolute.is_absolute() {
            return Err(RuleKeyError::InvalidArchiveMemberPaths {
                field: String::new(),
                reason: format!(
                    "archive path `{}` must be absolute",
                    amsp.archive_absolute.display()
                ),
            });
        }

        if amsp.member_relative.is_absolute() {
            return Err(RuleKeyError::InvalidArchiveMemberPaths {
                field: String::new(),
                reason: format!(
                    "member path `{}` must be relative",
                    amsp.member_relative.display()
                ),
            });
        }

        Ok((amsp.archive_absolute.clone(), amsp.member_relative.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relativizes_inside_workspace() {
        let resolver = PathResolver::new("/ws");
        let rel = resolver.resolve_relative(Path::new("/ws/foo/Bar.txt"));
        assert_eq!(rel, Some(PathBuf::from("foo/Bar.txt")));
    }

    #[test]
    fn fails_relativize_outside_workspace() {
        let resolver = PathResolver::new("/ws");
        let rel = resolver.resolve_relative(Path::new("/usr/bin/strip"));
        assert_eq!(rel, None);
    }

    #[test]
    fn resolve_absolute_joins_relative_paths() {
        let resolver = PathResolver::new("/ws");
        assert_eq!(
            resolver.resolve_absolute(Path::new("foo/Bar.txt")),
            PathBuf::from("/ws/foo/Bar.txt")
        );
        assert_eq!(
            resolver.resolve_absolute(Path::new("/elsewhere/Bar.txt")),
            PathBuf::from("/elsewhere/Bar.txt")
        );
    }

    #[test]
    fn rejects_non_absolute_archive_path() {
        let resolver = PathResolver::new("/ws");
        let amsp = ArchiveMemberSourcePath::new("rel/foo.jar", "a/b.txt");
        let err = resolver.resolve_archive_member(&amsp).unwrap_err();
        assert!(matches!(err, RuleKeyError::InvalidArchiveMemberPaths { .. }));
    }

    #[test]
    fn rejects_absolute_member_path() {
        let resolver = PathResolver::new("/ws");
        let amsp = ArchiveMemberSourcePath::new("/archives/foo.jar", "/a/b.txt");
        let err = resolver.resolve_archive_member(&amsp).unwrap_err();
        assert!(matches!(err, RuleKeyError::InvalidArchiveMemberPaths { .. }));
    }

    #[test]
    fn owning_rule_returns_the_producing_rule_for_rule_output_paths() {
        let resolver = PathResolver::new("/ws");
        let rule = Arc::new(BuildRule::new(
            crate::target::BuildTarget::unflavored("//x", "gen"),
            vec![],
        ));
        let sp = SourcePath::rule_output(rule.clone());
        let owner = resolver.owning_rule(&sp).unwrap();
        assert_eq!(owner.target(), rule.target());
    }

    #[test]
    fn owning_rule_is_none_for_every_other_source_path_variant() {
        let resolver = PathResolver::new("/ws");
        assert!(resolver.owning_rule(&SourcePath::filesystem("foo.txt")).is_none());
        assert!(resolver.owning_rule(&SourcePath::resource("icons/app.png")).is_none());
        assert!(resolver
            .owning_rule(&SourcePath::archive_member("/archives/foo.jar", "a/b.txt"))
            .is_none());
    }
}
