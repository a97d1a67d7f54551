// This file is part of LensKit.
// Copyright (C) 2018-2023 Boise State University.
// Copyright (C) 2023-2026 Drexel University.
// Licensed under the MIT license, see LICENSE.md for details.
// SPDX-License-Identifier: MIT

//! Train/validation rating splits.

use log::*;
use rand::{seq::SliceRandom, SeedableRng};
use rand_pcg::Pcg64;

use crate::data::{EntityIndex, RatingEntry};
use crate::errors::{HPFError, Side};

/// Training and validation ratings with their entity indexes.
#[derive(Debug, Clone)]
pub struct RatingSplit {
    train: Vec<RatingEntry>,
    validation: Vec<RatingEntry>,
    users: EntityIndex,
    items: EntityIndex,
}

impl RatingSplit {
    /// Assemble a split from already-indexed ratings.
    ///
    /// Every entry must be an observed rating with indices inside the
    /// indexes and a finite, non-negative value.
    pub fn new(
        train: Vec<RatingEntry>,
        validation: Vec<RatingEntry>,
        users: EntityIndex,
        items: EntityIndex,
    ) -> Result<Self, HPFError> {
        for e in train.iter().chain(validation.iter()) {
            check_entry(e, users.len(), items.len())?;
        }
        Ok(RatingSplit {
            train,
            validation,
            users,
            items,
        })
    }

    /// Randomly hold out a fraction of rating triples for validation.
    ///
    /// Both indexes cover every user and item in `triples`, so entities
    /// that appear only in the validation set still get model rows.
    pub fn random(
        triples: &[(i64, i64, f64)],
        validation_fraction: f64,
        seed: u64,
    ) -> Result<Self, HPFError> {
        if !(validation_fraction > 0.0 && validation_fraction < 1.0) {
            return Err(HPFError::InvalidConfig(format!(
                "validation fraction {} not in (0, 1)",
                validation_fraction
            )));
        }

        let mut users = EntityIndex::new();
        let mut items = EntityIndex::new();
        let mut entries: Vec<RatingEntry> = triples
            .iter()
            .map(|(u, i, r)| RatingEntry::new(users.intern(*u), items.intern(*i), *r))
            .collect();

        let mut rng = Pcg64::seed_from_u64(seed);
        entries.shuffle(&mut rng);

        let n_val = (validation_fraction * entries.len() as f64).ceil() as usize;
        let train = entries.split_off(n_val.min(entries.len()));
        debug!(
            "split {} ratings into {} train and {} validation",
            triples.len(),
            train.len(),
            entries.len()
        );

        Self::new(train, entries, users, items)
    }

    pub fn train(&self) -> &[RatingEntry] {
        &self.train
    }

    pub fn validation(&self) -> &[RatingEntry] {
        &self.validation
    }

    pub fn users(&self) -> &EntityIndex {
        &self.users
    }

    pub fn items(&self) -> &EntityIndex {
        &self.items
    }

    pub fn n_users(&self) -> usize {
        self.users.len()
    }

    pub fn n_items(&self) -> usize {
        self.items.len()
    }
}

fn check_entry(entry: &RatingEntry, n_users: usize, n_items: usize) -> Result<(), HPFError> {
    match *entry {
        RatingEntry::Observed { user, item, value } => {
            if user >= n_users {
                Err(HPFError::IndexOutOfRange {
                    side: Side::User,
                    index: user,
                    count: n_users,
                })
            } else if item >= n_items {
                Err(HPFError::IndexOutOfRange {
                    side: Side::Item,
                    index: item,
                    count: n_items,
                })
            } else if !value.is_finite() || value < 0.0 {
                Err(HPFError::InvalidRating { user, item, value })
            } else {
                Ok(())
            }
        }
        RatingEntry::Placeholder { .. } => Err(HPFError::InvalidConfig(
            "placeholder entries cannot be supplied as ratings".into(),
        )),
    }
}
