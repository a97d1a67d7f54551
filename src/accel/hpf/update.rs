// This file is part of LensKit.
// Copyright (C) 2018-2023 Boise State University.
// Copyright (C) 2023-2026 Drexel University.
// Licensed under the MIT license, see LICENSE.md for details.
// SPDX-License-Identifier: MIT

//! Coordinate-ascent updates of the variational parameters.
//!
//! Each iteration updates every user, then every item.  The multinomial
//! responsibilities for an observed rating are computed from the parameters
//! the iteration started with; the item phase then uses the *freshly updated*
//! user expectations for its rate terms.

use log::*;
use ndarray::{Array1, Array2, ArrayView1, Zip};
use rayon::prelude::*;

use crate::data::{GroupedRatings, RatingEntry};
use crate::errors::{HPFError, Side};
use crate::hpf::config::{HPFConfig, SidePriors};
use crate::hpf::model::{check_parameter, EntityParams, VariationalModel};
use crate::parallel::maybe_fuse;

/// E[log weight] for both sides at the start of an iteration.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub user_log: Array2<f64>,
    pub item_log: Array2<f64>,
}

impl Snapshot {
    pub fn capture(users: &VariationalModel, items: &VariationalModel) -> Result<Self, HPFError> {
        Ok(Snapshot {
            user_log: users.weight_log_expectations()?,
            item_log: items.weight_log_expectations()?,
        })
    }
}

/// Parallel update engine over grouped training ratings.
pub struct UpdateEngine<'a> {
    groups: &'a GroupedRatings,
    config: &'a HPFConfig,
}

impl<'a> UpdateEngine<'a> {
    pub fn new(groups: &'a GroupedRatings, config: &'a HPFConfig) -> Self {
        UpdateEngine { groups, config }
    }

    /// Compute new user parameters from the previous user and item models.
    pub fn update_users(
        &self,
        snapshot: &Snapshot,
        users: &VariationalModel,
        items: &VariationalModel,
    ) -> Result<VariationalModel, HPFError> {
        let item_sums = items.expectation_sums()?;
        update_side(
            Side::User,
            self.groups.groups(Side::User),
            &self.config.user,
            users,
            snapshot,
            &item_sums,
        )
    }

    /// Compute new item parameters.
    ///
    /// `users` should be the user model produced by [`Self::update_users`] in
    /// the same iteration.
    pub fn update_items(
        &self,
        snapshot: &Snapshot,
        items: &VariationalModel,
        users: &VariationalModel,
    ) -> Result<VariationalModel, HPFError> {
        let user_sums = users.expectation_sums()?;
        update_side(
            Side::Item,
            self.groups.groups(Side::Item),
            &self.config.item,
            items,
            snapshot,
            &user_sums,
        )
    }

    /// Run one full iteration: users, then items against the new users.
    pub fn iterate(
        &self,
        users: &VariationalModel,
        items: &VariationalModel,
    ) -> Result<(VariationalModel, VariationalModel), HPFError> {
        let snapshot = Snapshot::capture(users, items)?;
        let new_users = self.update_users(&snapshot, users, items)?;
        debug!("updated {} users", new_users.len());
        let new_items = self.update_items(&snapshot, items, &new_users)?;
        debug!("updated {} items", new_items.len());
        Ok((new_users, new_items))
    }
}

/// Update every entity on one side in parallel.
///
/// `this` is the side's previous model and `other_sums` holds the opposing
/// side's per-feature expected weight totals.
///
/// # Panics
///
/// Panics if `groups` does not have exactly one entry per row of `this`.
pub fn update_side(
    side: Side,
    groups: &[Vec<RatingEntry>],
    priors: &SidePriors,
    this: &VariationalModel,
    snapshot: &Snapshot,
    other_sums: &Array1<f64>,
) -> Result<VariationalModel, HPFError> {
    assert_eq!(groups.len(), this.len(), "{} group count mismatch", side);
    let k = this.n_features();
    debug!("updating {} {} rows with {} features", groups.len(), side, k);

    let rows = maybe_fuse(
        groups
            .par_iter()
            .enumerate()
            .map(|(e, group)| update_entity(side, e, group, priors, this, snapshot, other_sums)),
    )
    .collect::<Result<Vec<_>, _>>()?;

    Ok(VariationalModel::from_rows(side, k, rows))
}

fn update_entity(
    side: Side,
    entity: usize,
    group: &[RatingEntry],
    priors: &SidePriors,
    this: &VariationalModel,
    snapshot: &Snapshot,
    other_sums: &Array1<f64>,
) -> Result<EntityParams, HPFError> {
    let k = this.n_features();
    let mut phi = Array1::<f64>::zeros(k);
    let mut sum_phi = Array1::<f64>::zeros(k);

    for entry in group {
        if let Some((u, i, r)) = entry.evidence() {
            responsibilities(
                snapshot.user_log.row(u),
                snapshot.item_log.row(i),
                &mut phi,
            );
            sum_phi.scaled_add(r, &phi);
        }
    }

    let activity = this.activity_expectation(entity)?;
    let weight_shape = sum_phi.mapv(|s| priors.weight_shape + s);
    let weight_rate = other_sums.mapv(|s| activity + s);
    for &rte in weight_rate.iter() {
        check_parameter(side, entity, "updated weight rate", rte)?;
    }

    let activity_shape = priors.activity_shape + k as f64 * priors.weight_shape;
    let activity_rate = priors.activity_rate() + (&weight_shape / &weight_rate).sum();
    check_parameter(side, entity, "updated activity rate", activity_rate)?;

    Ok(EntityParams {
        weight_shape,
        weight_rate,
        activity_shape,
        activity_rate,
    })
}

/// Compute normalized responsibilities from two E[log weight] rows.
fn responsibilities(user_log: ArrayView1<f64>, item_log: ArrayView1<f64>, out: &mut Array1<f64>) {
    Zip::from(&mut *out)
        .and(&user_log)
        .and(&item_log)
        .for_each(|o, &a, &b| *o = a + b);
    // shift by the max so the largest term is exp(0) and the total is >= 1
    let max = out.fold(f64::NEG_INFINITY, |m, &v| m.max(v));
    out.mapv_inplace(|v| (v - max).exp());
    let total = out.sum();
    *out /= total;
}
