//! Ancestry ordering.
//!
//! Splits entries into levels so that an entry whose node has an ancestor
//! carrying another entry always lands in a later level than that entry:
//!
//! ```text
//! ul (0)          level 0: [ul]
//! ├── li (1)      level 1: [li, li]
//! │   └── a (2)   level 2: [a]
//! └── li (1)
//! ```
//!
//! The sort is generic over the node type; callers supply the parent lookup.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

/// Order `entries` into ancestry levels.
///
/// Each entry's parent is the first entry (in input order) attached to its
/// nearest strict ancestor that carries any entry. Entries without such an
/// ancestor form level 0; level `k + 1` holds the children of level `k`
/// entries. Siblings keep their input order. Every entry appears exactly once.
pub fn sort<N, T, F>(entries: Vec<(N, T)>, mut parent_of: F) -> Vec<Vec<T>>
where
    N: Eq + Hash + Clone,
    F: FnMut(&N) -> Option<N>,
{
    let count = entries.len();

    // Pass 1: node -> first entry, then each entry's nearest tracked ancestor
    let mut first_at: HashMap<N, usize> = HashMap::with_capacity(count);
    for (index, (node, _)) in entries.iter().enumerate() {
        first_at.entry(node.clone()).or_insert(index);
    }

    let mut roots = Vec::new();
    let mut children: Vec<Vec<usize>> = vec![Vec::new(); count];
    for (index, (node, _)) in entries.iter().enumerate() {
        match nearest_tracked(node, &first_at, &mut parent_of) {
            Some(parent) => children[parent].push(index),
            None => roots.push(index),
        }
    }

    // Pass 2: breadth-first flatten
    let mut slots: Vec<Option<T>> = entries.into_iter().map(|(_, item)| Some(item)).collect();
    let mut levels = Vec::new();
    let mut current = roots;
    while !current.is_empty() {
        let mut next = Vec::new();
        let mut level = Vec::with_capacity(current.len());
        for index in current {
            if let Some(item) = slots[index].take() {
                level.push(item);
            }
            next.extend_from_slice(&children[index]);
        }
        levels.push(level);
        current = next;
    }
    levels
}

fn nearest_tracked<N, F>(node: &N, first_at: &HashMap<N, usize>, parent_of: &mut F) -> Option<usize>
where
    N: Eq + Hash + Clone,
    F: FnMut(&N) -> Option<N>,
{
    let mut seen = HashSet::new();
    let mut cursor = parent_of(node);
    while let Some(ancestor) = cursor {
        if let Some(&index) = first_at.get(&ancestor) {
            return Some(index);
        }
        if !seen.insert(ancestor.clone()) {
            return None;
        }
        cursor = parent_of(&ancestor);
    }
    None
}
