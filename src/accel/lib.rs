// This file is part of LensKit.
// Copyright (C) 2018-2023 Boise State University.
// Copyright (C) 2023-2026 Drexel University.
// Licensed under the MIT license, see LICENSE.md for details.
// SPDX-License-Identifier: MIT

#[cfg(feature = "python")]
use pyo3::prelude::*;

#[cfg(feature = "python")]
mod arrow;
pub mod data;
pub mod errors;
pub mod hpf;
pub mod parallel;

pub use errors::{HPFError, Side};

/// Entry point for LensKit accelerator module.
#[cfg(feature = "python")]
#[pymodule]
fn _accel(m: &Bound<'_, PyModule>) -> PyResult<()> {
    pyo3_log::init();
    hpf::register_hpf(m)?;

    m.add_function(wrap_pyfunction!(parallel::init_accel_pool, m)?)?;
    m.add_function(wrap_pyfunction!(parallel::thread_count, m)?)?;

    Ok(())
}
