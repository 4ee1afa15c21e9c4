// ABOUTME: Set-difference planner for nested collections submitted as desired state
// ABOUTME: Splits submitted items into removed, retained, added and unknown rows
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Recipe Server Contributors

//! # Reconciliation Planning
//!
//! Clients submit the complete desired state of a nested collection (the
//! sections of a recipe, the ingredients of a section, the tags of a recipe).
//! Items that carry an id refer to persisted rows, items without one are new.
//! [`reconcile`] compares that desired state with the persisted keys and
//! produces a [`ReconcilePlan`]. The planner performs no I/O: the caller
//! applies the plan inside its own transaction.

use std::collections::HashSet;
use std::hash::Hash;

/// Identity of a submitted nested item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Submitted<K> {
    /// Item without an id, to be inserted
    New,
    /// Item referring to a persisted row
    Existing(K),
}

impl<K> From<Option<K>> for Submitted<K> {
    fn from(key: Option<K>) -> Self {
        key.map_or(Self::New, Self::Existing)
    }
}

/// Changes needed to turn the persisted collection into the submitted one
#[derive(Debug)]
pub struct ReconcilePlan<'d, K, D> {
    /// Persisted keys absent from the submission, in persisted order
    pub removed: Vec<K>,
    /// Submitted items matching a persisted row
    pub retained: Vec<(K, &'d D)>,
    /// Submitted items without an id
    pub added: Vec<&'d D>,
    /// Submitted items whose id matches no persisted row
    pub unknown: Vec<(K, &'d D)>,
}

/// Plan the inserts, updates and deletes that reconcile `existing` with `desired`
///
/// `existing_key` yields the key of a persisted row and `desired_key` tags a
/// submitted item as new or existing. Keys are compared by equality, so the
/// same function serves surrogate ids (sections, ingredients) and natural
/// keys of join rows (tag ids).
pub fn reconcile<'d, E, D, K>(
    existing: &[E],
    desired: &'d [D],
    existing_key: impl Fn(&E) -> K,
    desired_key: impl Fn(&D) -> Submitted<K>,
) -> ReconcilePlan<'d, K, D>
where
    K: Eq + Hash + Clone,
{
    let persisted: Vec<K> = existing.iter().map(existing_key).collect();
    let persisted_set: HashSet<&K> = persisted.iter().collect();

    let mut retained = Vec::new();
    let mut added = Vec::new();
    let mut unknown = Vec::new();
    let mut submitted_set = HashSet::new();

    for item in desired {
        match desired_key(item) {
            Submitted::New => added.push(item),
            Submitted::Existing(key) => {
                submitted_set.insert(key.clone());
                if persisted_set.contains(&key) {
                    retained.push((key, item));
                } else {
                    unknown.push((key, item));
                }
            }
        }
    }

    let removed = persisted
        .iter()
        .filter(|key| !submitted_set.contains(*key))
        .cloned()
        .collect();

    ReconcilePlan {
        removed,
        retained,
        added,
        unknown,
    }
}
