//! An insertion ordered set of strings.

use indexmap::IndexSet;

#[cfg(test)]
#[path = "ordered_set_tests.rs"]
mod tests;

/// A set of strings that remembers the order in which values were first added.
///
/// Adding a value that is already present leaves its position unchanged.
///
/// # Examples
///
/// ```
/// use commit_insights_core::ordered_set::OrderedSet;
///
/// let mut names = OrderedSet::new();
/// names.insert("Bob");
/// names.insert("Alice");
/// names.insert("Bob");
///
/// assert_eq!(names.to_vec(), vec!["Bob", "Alice"]);
/// assert_eq!(names.join(", "), "Bob, Alice");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderedSet {
    values: IndexSet<String>,
}

impl OrderedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a value, returning `true` if it was not present yet.
    pub fn insert(&mut self, value: impl Into<String>) -> bool {
        self.values.insert(value.into())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.values.iter().cloned().collect()
    }

    /// Joins the values in first-seen order. An empty set yields an empty string.
    pub fn join(&self, separator: &str) -> String {
        self.to_vec().join(separator)
    }
}
