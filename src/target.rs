// Copyright 2024 the Tectonic Project
// Licensed under the MIT License

//! `BuildTarget`: a canonicalized fully-qualified rule name.

use std::fmt;

/// A fully-qualified name for a build rule: a namespace, a name, and an
/// ordered (sorted, deduplicated) set of flavors.
///
/// Identity is the fully-qualified string, so two `BuildTarget`s built from
/// the same namespace/name/flavor set compare equal and hash equal
/// regardless of the order flavors were supplied in.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BuildTarget {
    namespace: String,
    name: String,
    flavors: Vec<String>,
}

impl BuildTarget {
    pub fn new(
        namespace: impl Into<String>,
        name: impl Into<String>,
        flavors: impl IntoIterator<Item = String>,
    ) -> Self {
        let mut flavors: Vec<String> = flavors.into_iter().collect();
        flavors.sort();
        flavors.dedup();

        BuildTarget {
            namespace: namespace.into(),
            name: name.into(),
            flavors,
        }
    }

    pub fn unflavored(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(namespace, name, std::iter::empty())
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn flavors(&self) -> &[String] {
        &self.flavors
    }

    /// The canonical fully-qualified name, e.g. `//java/com/example:lib#src-jar`.
    pub fn fully_qualified_name(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for BuildTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.name)?;
        if !self.flavors.is_empty() {
            write!(f, "#{}", self.flavors.join(","))?;
        }
        Ok(())
    }
}
