// This file is part of LensKit.
// Copyright (C) 2018-2023 Boise State University.
// Copyright (C) 2023-2026 Drexel University.
// Licensed under the MIT license, see LICENSE.md for details.
// SPDX-License-Identifier: MIT

//! Trained HPF models.

use log::*;
use ndarray::{Array2, ArrayView1};

use crate::data::EntityIndex;
use crate::errors::HPFError;
use crate::hpf::model::VariationalModel;

/// A trained HPF model: expected user preferences and item attributes.
#[derive(Debug, Clone)]
pub struct HPFModel {
    user_features: Array2<f64>,
    item_features: Array2<f64>,
    users: EntityIndex,
    items: EntityIndex,
}

impl HPFModel {
    /// Collapse variational parameters into expected feature matrices.
    ///
    /// # Panics
    ///
    /// Panics if an index's length differs from its model's entity count, or
    /// if the user and item models have different feature counts.
    pub fn from_variational(
        users: &VariationalModel,
        items: &VariationalModel,
        user_index: EntityIndex,
        item_index: EntityIndex,
    ) -> Result<Self, HPFError> {
        assert_eq!(users.len(), user_index.len());
        assert_eq!(items.len(), item_index.len());
        assert_eq!(users.n_features(), items.n_features());

        let user_features = users.weight_expectations()?;
        let item_features = items.weight_expectations()?;
        info!(
            "finished {} user and {} item feature vectors",
            user_features.nrows(),
            item_features.nrows()
        );

        Ok(HPFModel {
            user_features,
            item_features,
            users: user_index,
            items: item_index,
        })
    }

    pub fn n_features(&self) -> usize {
        self.user_features.ncols()
    }

    /// Expected user preference matrix (users x features).
    pub fn user_features(&self) -> &Array2<f64> {
        &self.user_features
    }

    /// Expected item attribute matrix (items x features).
    pub fn item_features(&self) -> &Array2<f64> {
        &self.item_features
    }

    /// Take the user and item feature matrices out of the model.
    pub fn into_features(self) -> (Array2<f64>, Array2<f64>) {
        (self.user_features, self.item_features)
    }

    pub fn users(&self) -> &EntityIndex {
        &self.users
    }

    pub fn items(&self) -> &EntityIndex {
        &self.items
    }

    /// Get a user's feature vector by ID.
    pub fn user_vector(&self, user: i64) -> Option<ArrayView1<'_, f64>> {
        self.users.index_of(user).map(|u| self.user_features.row(u))
    }

    /// Get an item's feature vector by ID.
    pub fn item_vector(&self, item: i64) -> Option<ArrayView1<'_, f64>> {
        self.items.index_of(item).map(|i| self.item_features.row(i))
    }

    /// Score an item for a user (the expected Poisson rate).
    pub fn score(&self, user: i64, item: i64) -> Option<f64> {
        let uv = self.user_vector(user)?;
        let iv = self.item_vector(item)?;
        Some(uv.dot(&iv))
    }

    /// Probability that a user has a nonzero count for an item.
    pub fn probability(&self, user: i64, item: i64) -> Option<f64> {
        self.score(user, item).map(|s| -(-s).exp_m1())
    }

    /// Score several items for one user; unknown items score `None`.
    pub fn score_items(&self, user: i64, items: &[i64]) -> Vec<Option<f64>> {
        match self.user_vector(user) {
            Some(uv) => items
                .iter()
                .map(|i| self.item_vector(*i).map(|iv| uv.dot(&iv)))
                .collect(),
            None => vec![None; items.len()],
        }
    }
}
