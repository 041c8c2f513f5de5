// Copyright 2022 the Tectonic Project
// Licensed under the MIT License

use std::{env::current_dir, path::PathBuf};
use tectonic_errors::prelude::*;

pub fn get_root() -> Result<PathBuf> {
    Ok(current_dir()?)
}

/// Knobs governing how a [`crate::builder::RuleKeyBuilder`] behaves.
///
/// Kept separate from `BuilderContext`'s other collaborators (the path
/// resolver, the file-hash oracle, the rule memo) because this one is plain
/// data rather than a shared, synchronized resource.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RuleKeyConfig {
    /// When true, an unordered map or set aborts the computation instead of
    /// being logged and hashed in iteration order. Defaults to strict: a
    /// build tool that silently produces unstable cache keys is worse than
    /// one that refuses to produce a key at all.
    pub strict_unordered_collections: bool,
}

impl RuleKeyConfig {
    pub fn strict() -> Self {
        RuleKeyConfig {
            strict_unordered_collections: true,
        }
    }

    pub fn permissive() -> Self {
        RuleKeyConfig {
            strict_unordered_collections: false,
        }
    }
}

impl Default for RuleKeyConfig {
    fn default() -> Self {
        Self::strict()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_strict() {
        assert!(RuleKeyConfig::default().strict_unordered_collections);
    }
}
