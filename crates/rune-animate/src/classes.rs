//! Ordered CSS class lists.
//!
//! Class strings arrive space separated (`"red  green"`), are merged across
//! sources (current element classes, `add_class`, `remove_class`, temporary
//! classes) and compared when pairing anchored animations.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An ordered, duplicate-free list of class names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct ClassList(Vec<String>);

impl ClassList {
    /// Create an empty class list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a whitespace separated class string.
    pub fn parse(classes: &str) -> Self {
        let mut list = Self::new();
        list.extend_str(classes);
        list
    }

    /// Append every class of `classes` not already present.
    pub fn extend_str(&mut self, classes: &str) {
        for class in classes.split_whitespace() {
            self.insert(class);
        }
    }

    /// Append a single class if absent. Returns `true` when it was added.
    pub fn insert(&mut self, class: &str) -> bool {
        if class.is_empty() || self.contains(class) {
            return false;
        }
        self.0.push(class.to_string());
        true
    }

    /// Remove a class. Returns `true` when it was present.
    pub fn remove(&mut self, class: &str) -> bool {
        let before = self.0.len();
        self.0.retain(|c| c != class);
        before != self.0.len()
    }

    /// Union preserving the order of `self` first, then new classes of `other`.
    pub fn merge(&self, other: &ClassList) -> ClassList {
        let mut merged = self.clone();
        for class in other.iter() {
            merged.insert(class);
        }
        merged
    }

    /// Classes present in both lists, in the order of `self`, skipping any class
    /// starting with `reserved_prefix`.
    pub fn shared_with(&self, other: &ClassList, reserved_prefix: &str) -> ClassList {
        self.0
            .iter()
            .filter(|c| reserved_prefix.is_empty() || !c.starts_with(reserved_prefix))
            .filter(|c| other.contains(c))
            .cloned()
            .collect()
    }

    /// Check whether the list contains `class`.
    pub fn contains(&self, class: &str) -> bool {
        self.0.iter().any(|c| c == class)
    }

    /// Iterate over class names in order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Check if the list is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of classes.
    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl fmt::Display for ClassList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(" "))
    }
}

impl From<&str> for ClassList {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

impl From<String> for ClassList {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<ClassList> for String {
    fn from(value: ClassList) -> Self {
        value.to_string()
    }
}

impl<S: AsRef<str>> FromIterator<S> for ClassList {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut list = Self::new();
        for class in iter {
            list.extend_str(class.as_ref());
        }
        list
    }
}
