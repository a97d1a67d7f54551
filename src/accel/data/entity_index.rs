// This file is part of LensKit.
// Copyright (C) 2018-2023 Boise State University.
// Copyright (C) 2023-2026 Drexel University.
// Licensed under the MIT license, see LICENSE.md for details.
// SPDX-License-Identifier: MIT

//! Dense entity ID index.

use rustc_hash::FxHashMap;

/// Bijection between external entity IDs and dense zero-based indices.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityIndex {
    ids: Vec<i64>,
    positions: FxHashMap<i64, usize>,
}

impl EntityIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an index over identifiers `0..n`.
    pub fn identity(n: usize) -> Self {
        Self::from_ids(0..n as i64)
    }

    /// Create an index from IDs, in order of first appearance.
    ///
    /// Repeated IDs are ignored.
    pub fn from_ids<I: IntoIterator<Item = i64>>(ids: I) -> Self {
        let mut index = Self::new();
        for id in ids {
            index.intern(id);
        }
        index
    }

    /// Look up an ID, adding it if it is not already present.
    pub fn intern(&mut self, id: i64) -> usize {
        if let Some(pos) = self.positions.get(&id) {
            *pos
        } else {
            let pos = self.ids.len();
            self.ids.push(id);
            self.positions.insert(id, pos);
            pos
        }
    }

    /// Look up the index of an ID.
    pub fn index_of(&self, id: i64) -> Option<usize> {
        self.positions.get(&id).copied()
    }

    /// Look up the ID at an index.
    pub fn id_of(&self, index: usize) -> Option<i64> {
        self.ids.get(index).copied()
    }

    /// Get the IDs in index order.
    pub fn ids(&self) -> &[i64] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_appearance_order() {
        let index = EntityIndex::from_ids([42, 7, 42, 19]);
        assert_eq!(index.len(), 3);
        assert_eq!(index.ids(), &[42, 7, 19]);
        assert_eq!(index.index_of(7), Some(1));
        assert_eq!(index.index_of(19), Some(2));
        assert_eq!(index.index_of(100), None);
        assert_eq!(index.id_of(0), Some(42));
        assert_eq!(index.id_of(3), None);
    }

    #[test]
    fn test_identity() {
        let index = EntityIndex::identity(4);
        for i in 0..4 {
            assert_eq!(index.index_of(i as i64), Some(i));
        }
        assert!(EntityIndex::identity(0).is_empty());
    }
}
