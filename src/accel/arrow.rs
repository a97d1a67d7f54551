// This file is part of LensKit.
// Copyright (C) 2018-2023 Boise State University.
// Copyright (C) 2023-2026 Drexel University.
// Licensed under the MIT license, see LICENSE.md for details.
// SPDX-License-Identifier: MIT

//! Type-checked access to Arrow arrays passed in from Python.

use arrow::array::{
    downcast_array, make_array, Array, ArrayData, ArrowPrimitiveType, PrimitiveArray,
};
use arrow::pyarrow::PyArrowType;
use pyo3::exceptions::{PyTypeError, PyValueError};
use pyo3::prelude::*;

/// Extract a primitive array of the expected type, or raise `TypeError`.
pub fn checked_array<E: ArrowPrimitiveType + 'static>(
    name: &str,
    data: PyArrowType<ArrayData>,
) -> PyResult<PrimitiveArray<E>> {
    let array = make_array(data.0);
    if array.data_type().equals_datatype(&E::DATA_TYPE) {
        if array.null_count() > 0 {
            return Err(PyValueError::new_err(format!(
                "{} array has {} nulls",
                name,
                array.null_count()
            )));
        }
        Ok(downcast_array(array.as_ref()))
    } else {
        Err(PyTypeError::new_err(format!(
            "invalid {} type {}, expected {}",
            name,
            array.data_type(),
            E::DATA_TYPE
        )))
    }
}
