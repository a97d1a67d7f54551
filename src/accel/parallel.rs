// This file is part of LensKit.
// Copyright (C) 2018-2023 Boise State University.
// Copyright (C) 2023-2026 Drexel University.
// Licensed under the MIT license, see LICENSE.md for details.
// SPDX-License-Identifier: MIT

use log::*;
#[cfg(feature = "python")]
use pyo3::prelude::*;

#[cfg(feature = "fuse-parallel")]
use rayon::iter::PanicFuse;
use rayon::{current_num_threads, iter::ParallelIterator, ThreadPoolBuilder};

use crate::errors::HPFError;

/// Configure the global thread pool used for training.
pub fn init_pool(n_threads: usize) -> Result<(), HPFError> {
    debug!(
        "initializing accelerator thread pool with {} threads",
        n_threads
    );
    ThreadPoolBuilder::new()
        .num_threads(n_threads)
        .build_global()
        .map_err(|e| HPFError::ThreadPool(e.to_string()))
}

#[cfg(feature = "python")]
#[pyfunction]
pub fn init_accel_pool(n_threads: usize) -> PyResult<()> {
    Ok(init_pool(n_threads)?)
}

#[cfg(feature = "python")]
#[pyfunction]
pub fn thread_count() -> PyResult<usize> {
    Ok(current_num_threads())
}

/// Number of threads in the current pool.
pub fn pool_size() -> usize {
    current_num_threads()
}

#[cfg(not(feature = "fuse-parallel"))]
pub fn maybe_fuse<I: ParallelIterator>(iter: I) -> I {
    iter
}

#[cfg(feature = "fuse-parallel")]
pub fn maybe_fuse<I: ParallelIterator>(iter: I) -> PanicFuse<I> {
    iter.panic_fuse()
}
