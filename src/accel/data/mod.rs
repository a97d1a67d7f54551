// This file is part of LensKit.
// Copyright (C) 2018-2023 Boise State University.
// Copyright (C) 2023-2026 Drexel University.
// Licensed under the MIT license, see LICENSE.md for details.
// SPDX-License-Identifier: MIT

//! Rating data management.

mod entity_index;
mod ratings;
mod split;

pub use entity_index::EntityIndex;
pub use ratings::{GroupedRatings, RatingEntry};
pub use split::RatingSplit;
