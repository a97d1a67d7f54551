// This file is part of LensKit.
// Copyright (C) 2018-2023 Boise State University.
// Copyright (C) 2023-2026 Drexel University.
// Licensed under the MIT license, see LICENSE.md for details.
// SPDX-License-Identifier: MIT

//! Error types for model training.

use std::fmt;

use thiserror::Error;

/// Which side of the rating matrix an entity belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    User,
    Item,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::User => f.write_str("user"),
            Side::Item => f.write_str("item"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum HPFError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("validation set is empty")]
    EmptyValidation,
    #[error("{side} index {index} out of range for {count} entities")]
    IndexOutOfRange {
        side: Side,
        index: usize,
        count: usize,
    },
    #[error("invalid rating {value} for user {user}, item {item}")]
    InvalidRating { user: usize, item: usize, value: f64 },
    #[error("degenerate {side} {entity} at iteration {iteration}: {detail}")]
    Degenerate {
        side: Side,
        entity: usize,
        iteration: usize,
        detail: String,
    },
    #[error("zero expected rate for user {user}, item {item} at iteration {iteration}")]
    DegeneratePrediction {
        user: usize,
        item: usize,
        iteration: usize,
    },
    #[error("thread pool error: {0}")]
    ThreadPool(String),
}

impl HPFError {
    /// Create a degeneracy error for a variational row.
    ///
    /// The iteration is filled in later by the training loop.
    pub(crate) fn degenerate<S: Into<String>>(side: Side, entity: usize, detail: S) -> Self {
        HPFError::Degenerate {
            side,
            entity,
            iteration: 0,
            detail: detail.into(),
        }
    }

    /// Stamp a numerical error with the iteration it occurred in.
    pub fn at_iteration(self, iter: usize) -> Self {
        match self {
            HPFError::Degenerate {
                side,
                entity,
                detail,
                ..
            } => HPFError::Degenerate {
                side,
                entity,
                iteration: iter,
                detail,
            },
            HPFError::DegeneratePrediction { user, item, .. } => {
                HPFError::DegeneratePrediction {
                    user,
                    item,
                    iteration: iter,
                }
            }
            e => e,
        }
    }

    /// Query whether this error reports a numerical failure (as opposed to bad input).
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            HPFError::Degenerate { .. } | HPFError::DegeneratePrediction { .. }
        )
    }
}

#[cfg(feature = "python")]
impl From<HPFError> for pyo3::PyErr {
    fn from(err: HPFError) -> pyo3::PyErr {
        use pyo3::exceptions::{PyRuntimeError, PyValueError};
        if err.is_numeric() || matches!(err, HPFError::ThreadPool(_)) {
            PyRuntimeError::new_err(err.to_string())
        } else {
            PyValueError::new_err(err.to_string())
        }
    }
}
