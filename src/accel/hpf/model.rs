// This file is part of LensKit.
// Copyright (C) 2018-2023 Boise State University.
// Copyright (C) 2023-2026 Drexel University.
// Licensed under the MIT license, see LICENSE.md for details.
// SPDX-License-Identifier: MIT

//! Variational Gamma parameters for one side of the factorization.

use ndarray::{Array1, Array2, Axis, Zip};
use rand::Rng;
use statrs::function::gamma::digamma;

use crate::errors::{HPFError, Side};
use crate::hpf::config::SidePriors;

/// Smallest shape or rate we are willing to divide by or take the log of.
pub const MIN_PARAMETER: f64 = 1e-10;

/// Variational parameters for the users or the items of an HPF model.
///
/// Row `i` of the weight matrices holds the Gamma shape and rate for entity
/// `i`'s K latent features; the activity vectors hold the Gamma parameters for
/// its scalar activity (user) or popularity (item) term.
#[derive(Debug, Clone, PartialEq)]
pub struct VariationalModel {
    pub side: Side,
    pub weight_shape: Array2<f64>,
    pub weight_rate: Array2<f64>,
    pub activity_shape: Array1<f64>,
    pub activity_rate: Array1<f64>,
}

/// One entity's freshly computed variational parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityParams {
    pub weight_shape: Array1<f64>,
    pub weight_rate: Array1<f64>,
    pub activity_shape: f64,
    pub activity_rate: f64,
}

impl VariationalModel {
    /// Initialize parameters by perturbing the priors.
    ///
    /// Draws are taken in a fixed order (every weight shape/rate pair, then
    /// every activity shape/rate pair) so a seeded generator reproduces the
    /// same model.
    pub fn initialize<R: Rng>(
        side: Side,
        priors: &SidePriors,
        n: usize,
        k: usize,
        max_shape_offset: f64,
        max_rate_offset: f64,
        rng: &mut R,
    ) -> Self {
        let mut weight_shape = Array2::zeros((n, k));
        let mut weight_rate = Array2::zeros((n, k));
        for i in 0..n {
            for f in 0..k {
                weight_shape[[i, f]] = priors.weight_shape + offset(rng, max_shape_offset);
                weight_rate[[i, f]] = priors.activity_mean + offset(rng, max_rate_offset);
            }
        }

        let mut activity_shape = Array1::zeros(n);
        let mut activity_rate = Array1::zeros(n);
        for i in 0..n {
            activity_shape[i] = priors.activity_shape + offset(rng, max_shape_offset);
            activity_rate[i] = 1.0 + offset(rng, max_rate_offset);
        }

        VariationalModel {
            side,
            weight_shape,
            weight_rate,
            activity_shape,
            activity_rate,
        }
    }

    /// Assemble a model from per-entity rows, in entity order.
    pub fn from_rows(side: Side, k: usize, rows: Vec<EntityParams>) -> Self {
        let n = rows.len();
        let mut model = VariationalModel {
            side,
            weight_shape: Array2::zeros((n, k)),
            weight_rate: Array2::zeros((n, k)),
            activity_shape: Array1::zeros(n),
            activity_rate: Array1::zeros(n),
        };
        for (i, row) in rows.into_iter().enumerate() {
            model.weight_shape.row_mut(i).assign(&row.weight_shape);
            model.weight_rate.row_mut(i).assign(&row.weight_rate);
            model.activity_shape[i] = row.activity_shape;
            model.activity_rate[i] = row.activity_rate;
        }
        model
    }

    /// Number of entities.
    pub fn len(&self) -> usize {
        self.weight_shape.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of latent features.
    pub fn n_features(&self) -> usize {
        self.weight_shape.ncols()
    }

    /// Compute E[weight] = shape / rate for every entity and feature.
    pub fn weight_expectations(&self) -> Result<Array2<f64>, HPFError> {
        self.check_weights()?;
        Ok(&self.weight_shape / &self.weight_rate)
    }

    /// Compute E[log weight] = digamma(shape) - log(rate).
    pub fn weight_log_expectations(&self) -> Result<Array2<f64>, HPFError> {
        self.check_weights()?;
        let mut out = Array2::<f64>::zeros(self.weight_shape.raw_dim());
        Zip::from(&mut out)
            .and(&self.weight_shape)
            .and(&self.weight_rate)
            .par_for_each(|o, &shp, &rte| *o = digamma(shp) - rte.ln());
        Ok(out)
    }

    /// Sum of each feature's expected weight over all entities.
    pub fn expectation_sums(&self) -> Result<Array1<f64>, HPFError> {
        Ok(self.weight_expectations()?.sum_axis(Axis(0)))
    }

    /// Expected activity (or popularity) of one entity.
    pub fn activity_expectation(&self, entity: usize) -> Result<f64, HPFError> {
        let shp = self.activity_shape[entity];
        let rte = self.activity_rate[entity];
        check_parameter(self.side, entity, "activity shape", shp)?;
        check_parameter(self.side, entity, "activity rate", rte)?;
        Ok(shp / rte)
    }

    fn check_weights(&self) -> Result<(), HPFError> {
        for ((i, f), &shp) in self.weight_shape.indexed_iter() {
            check_parameter(self.side, i, "weight shape", shp)
                .map_err(|e| with_feature(e, f))?;
        }
        for ((i, f), &rte) in self.weight_rate.indexed_iter() {
            check_parameter(self.side, i, "weight rate", rte).map_err(|e| with_feature(e, f))?;
        }
        Ok(())
    }
}

/// Verify that a Gamma parameter is finite and safely positive.
pub(crate) fn check_parameter(
    side: Side,
    entity: usize,
    name: &str,
    value: f64,
) -> Result<(), HPFError> {
    if value.is_finite() && value > MIN_PARAMETER {
        Ok(())
    } else {
        Err(HPFError::degenerate(
            side,
            entity,
            format!("{} is {}", name, value),
        ))
    }
}

fn with_feature(err: HPFError, feature: usize) -> HPFError {
    match err {
        HPFError::Degenerate {
            side,
            entity,
            iteration,
            detail,
        } => HPFError::Degenerate {
            side,
            entity,
            iteration,
            detail: format!("{} (feature {})", detail, feature),
        },
        e => e,
    }
}

fn offset<R: Rng>(rng: &mut R, max: f64) -> f64 {
    rng.random::<f64>() * max
}
