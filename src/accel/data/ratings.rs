// This file is part of LensKit.
// Copyright (C) 2018-2023 Boise State University.
// Copyright (C) 2023-2026 Drexel University.
// Licensed under the MIT license, see LICENSE.md for details.
// SPDX-License-Identifier: MIT

//! Rating entries and their per-entity groupings.

use log::*;

use crate::errors::Side;

/// A single entry in a rating group.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RatingEntry {
    /// An observed rating.
    Observed { user: usize, item: usize, value: f64 },
    /// A synthetic zero entry standing in for an entity with no ratings.
    Placeholder { index: usize },
}

impl RatingEntry {
    pub fn new(user: usize, item: usize, value: f64) -> Self {
        RatingEntry::Observed { user, item, value }
    }

    /// Get the rating value (0 for placeholders).
    pub fn value(&self) -> f64 {
        match self {
            RatingEntry::Observed { value, .. } => *value,
            RatingEntry::Placeholder { .. } => 0.0,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, RatingEntry::Placeholder { .. })
    }

    /// Get the (user, item, value) triple of a rating that carries evidence.
    ///
    /// Placeholders and zero-valued ratings return `None`.
    pub fn evidence(&self) -> Option<(usize, usize, f64)> {
        match self {
            RatingEntry::Observed { user, item, value } if *value > 0.0 => {
                Some((*user, *item, *value))
            }
            _ => None,
        }
    }

    /// Get the index of this entry on one side of the matrix.
    pub fn index(&self, side: Side) -> usize {
        match (self, side) {
            (RatingEntry::Observed { user, .. }, Side::User) => *user,
            (RatingEntry::Observed { item, .. }, Side::Item) => *item,
            (RatingEntry::Placeholder { index }, _) => *index,
        }
    }
}

/// Training ratings grouped by user and by item.
///
/// Every index in `0..n` on each side has a non-empty group; entities
/// without ratings get a single placeholder.
#[derive(Debug, Clone)]
pub struct GroupedRatings {
    by_user: Vec<Vec<RatingEntry>>,
    by_item: Vec<Vec<RatingEntry>>,
}

impl GroupedRatings {
    /// Group ratings for a matrix with the specified dimensions.
    ///
    /// Indices must already be checked against the dimensions, as
    /// [`RatingSplit::new`](crate::data::RatingSplit::new) does.
    ///
    /// # Panics
    ///
    /// Panics if an entry's user index is not below `n_users` or its item
    /// index is not below `n_items`.
    pub fn build(entries: &[RatingEntry], n_users: usize, n_items: usize) -> Self {
        let by_user = group_side(entries, n_users, Side::User);
        let by_item = group_side(entries, n_items, Side::Item);
        GroupedRatings { by_user, by_item }
    }

    /// Get the groups for one side of the matrix.
    pub fn groups(&self, side: Side) -> &[Vec<RatingEntry>] {
        match side {
            Side::User => &self.by_user,
            Side::Item => &self.by_item,
        }
    }

    pub fn n_users(&self) -> usize {
        self.by_user.len()
    }

    pub fn n_items(&self) -> usize {
        self.by_item.len()
    }
}

fn group_side(entries: &[RatingEntry], n: usize, side: Side) -> Vec<Vec<RatingEntry>> {
    let mut counts = vec![0usize; n];
    for e in entries {
        counts[e.index(side)] += 1;
    }
    let mut groups: Vec<Vec<RatingEntry>> =
        counts.iter().map(|c| Vec::with_capacity(*c)).collect();
    for e in entries {
        groups[e.index(side)].push(*e);
    }

    let mut n_empty = 0;
    for (i, group) in groups.iter_mut().enumerate() {
        if group.is_empty() {
            group.push(RatingEntry::Placeholder { index: i });
            n_empty += 1;
        }
    }
    debug!(
        "grouped {} ratings into {} {} groups ({} placeholders)",
        entries.len(),
        n,
        side,
        n_empty
    );

    groups
}
