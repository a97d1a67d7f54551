// This file is part of LensKit.
// Copyright (C) 2018-2023 Boise State University.
// Copyright (C) 2023-2026 Drexel University.
// Licensed under the MIT license, see LICENSE.md for details.
// SPDX-License-Identifier: MIT

//! Hierarchical Poisson factorization.
//!
//! Mean-field variational inference for the model of Gopalan, Hofman and
//! Blei, "Scalable Recommendation with Poisson Factorization".

#[cfg(feature = "python")]
mod bindings;
pub mod config;
pub mod finalize;
pub mod model;
pub mod monitor;
pub mod train;
pub mod update;

#[cfg(feature = "python")]
use pyo3::prelude::*;

pub use config::{HPFConfig, SidePriors};
pub use finalize::HPFModel;
pub use model::VariationalModel;
pub use monitor::ConvergenceMonitor;
pub use train::{train_hpf, IterationLimit, ThresholdStop, TrainingLoop};
pub use update::UpdateEngine;

/// Register the lenskit._accel.hpf module
#[cfg(feature = "python")]
pub fn register_hpf(parent: &Bound<'_, PyModule>) -> PyResult<()> {
    let hpf = PyModule::new(parent.py(), "hpf")?;
    parent.add_submodule(&hpf)?;

    hpf.add_function(wrap_pyfunction!(bindings::train_hpf, &hpf)?)?;

    Ok(())
}
