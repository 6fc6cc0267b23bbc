use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Set of string tags carried by an entity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagList {
    tags: BTreeSet<String>,
}

impl TagList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_tags<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tags: tags.into_iter().map(Into::into).collect(),
        }
    }

    pub fn has(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    pub fn has_all<S: AsRef<str>>(&self, tags: &[S]) -> bool {
        tags.iter().all(|tag| self.has(tag.as_ref()))
    }

    /// Returns false if the tag was already present.
    pub fn add(&mut self, tag: impl Into<String>) -> bool {
        self.tags.insert(tag.into())
    }

    pub fn remove(&mut self, tag: &str) -> bool {
        self.tags.remove(tag)
    }

    pub fn merge_in(&mut self, other: &TagList) {
        self.tags.extend(other.tags.iter().cloned());
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().map(String::as_str)
    }

    pub fn as_vec(&self) -> Vec<String> {
        self.tags.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn clear(&mut self) {
        self.tags.clear();
    }
}
