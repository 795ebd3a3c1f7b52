//! Key namespacing.
//!
//! Every key the cache touches lives under a fixed prefix so that several
//! services can share one store without colliding. Below the prefix,
//! entries and tag indexes get disjoint segments so that no logical key can
//! address a tag index.

/// Segment placed between the prefix and a logical key.
const ENTRY_SEGMENT: &str = "k:";

/// Segment placed between the prefix and a tag name.
const TAG_SEGMENT: &str = "t:";

/// Builds store keys for one prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyNamespace {
    prefix: String,
    entries: String,
}

impl KeyNamespace {
    /// Creates a namespace with the given prefix (e.g. `"pulse:"`).
    pub fn new(prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        let entries = format!("{prefix}{ENTRY_SEGMENT}");
        Self { prefix, entries }
    }

    /// The raw prefix.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Full store key for a logical key.
    pub fn key(&self, key: &str) -> String {
        format!("{}{}", self.entries, key)
    }

    /// Store key of the set indexing entries tagged with `tag`.
    pub fn tag(&self, tag: &str) -> String {
        format!("{}{}{}", self.prefix, TAG_SEGMENT, tag)
    }

    /// Store MATCH pattern for a logical glob over entries.
    pub fn pattern(&self, glob: &str) -> String {
        format!("{}{}", self.entries, glob)
    }

    /// Pattern matching every key in the namespace, tag indexes included.
    pub fn all(&self) -> String {
        format!("{}*", self.prefix)
    }

    /// Returns true if a full store key is an entry of this namespace.
    pub fn owns(&self, full_key: &str) -> bool {
        full_key.starts_with(&self.entries)
    }
}
