// This file is part of LensKit.
// Copyright (C) 2018-2023 Boise State University.
// Copyright (C) 2023-2026 Drexel University.
// Licensed under the MIT license, see LICENSE.md for details.
// SPDX-License-Identifier: MIT

//! Python entry point for HPF training.

use arrow::{
    array::ArrayData,
    datatypes::{Float32Type, Int32Type},
    pyarrow::PyArrowType,
};
use log::*;
use numpy::{IntoPyArray, PyArray2};
use pyo3::{exceptions::PyValueError, prelude::*};

use crate::arrow::checked_array;
use crate::data::{EntityIndex, RatingEntry, RatingSplit};
use crate::hpf::config::HPFConfig;
use crate::hpf::train::{self, ThresholdStop};

/// Rating columns, with users and items as dense indices.
#[derive(FromPyObject)]
pub(super) struct HPFRatingInput {
    users: PyArrowType<ArrayData>,
    items: PyArrowType<ArrayData>,
    ratings: PyArrowType<ArrayData>,
}

impl HPFRatingInput {
    fn into_entries(self, name: &str) -> PyResult<Vec<RatingEntry>> {
        let users = checked_array::<Int32Type>("users", self.users)?;
        let items = checked_array::<Int32Type>("items", self.items)?;
        let ratings = checked_array::<Float32Type>("ratings", self.ratings)?;
        let n = users.len();
        if items.len() != n || ratings.len() != n {
            return Err(PyValueError::new_err(format!(
                "{} array length mismatch ({} users, {} items, {} ratings)",
                name,
                n,
                items.len(),
                ratings.len()
            )));
        }

        users
            .values()
            .iter()
            .zip(items.values().iter())
            .zip(ratings.values().iter())
            .map(|((u, i), r)| {
                let u = usize::try_from(*u)
                    .map_err(|_| PyValueError::new_err(format!("negative user index {}", u)))?;
                let i = usize::try_from(*i)
                    .map_err(|_| PyValueError::new_err(format!("negative item index {}", i)))?;
                Ok(RatingEntry::new(u, i, *r as f64))
            })
            .collect()
    }
}

/// Train an HPF model, returning the expected user and item feature matrices.
#[pyfunction]
#[pyo3(signature=(config, train_ratings, val_ratings, n_users, n_items, *, threshold=1e-4, min_iterations=0, max_iterations=200))]
pub(super) fn train_hpf<'py>(
    py: Python<'py>,
    config: HPFConfig,
    train_ratings: HPFRatingInput,
    val_ratings: HPFRatingInput,
    n_users: usize,
    n_items: usize,
    threshold: f64,
    min_iterations: usize,
    max_iterations: usize,
) -> PyResult<(Bound<'py, PyArray2<f64>>, Bound<'py, PyArray2<f64>>)> {
    let data = RatingSplit::new(
        train_ratings.into_entries("train")?,
        val_ratings.into_entries("validation")?,
        EntityIndex::identity(n_users),
        EntityIndex::identity(n_items),
    )?;
    let mut stop = ThresholdStop::new(threshold)
        .min_iterations(min_iterations)
        .max_iterations(max_iterations);

    debug!(
        "training HPF from Python with {} features (threshold {})",
        config.features, threshold
    );
    let model = py.allow_threads(|| train::train_hpf(&config, &data, &mut stop))?;
    let (theta, beta) = model.into_features();

    Ok((theta.into_pyarray(py), beta.into_pyarray(py)))
}
