// This file is part of LensKit.
// Copyright (C) 2018-2023 Boise State University.
// Copyright (C) 2023-2026 Drexel University.
// Licensed under the MIT license, see LICENSE.md for details.
// SPDX-License-Identifier: MIT

//! HPF training configuration.

#[cfg(feature = "python")]
use pyo3::prelude::*;
use serde::{Deserialize, Serialize};

use crate::errors::HPFError;
use crate::hpf::model::MIN_PARAMETER;

/// Gamma priors for one side of the factorization.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "python", derive(FromPyObject))]
#[serde(default)]
pub struct SidePriors {
    /// Shape of the per-feature weight prior (a or c).
    pub weight_shape: f64,
    /// Shape of the activity/popularity prior (a' or c').
    pub activity_shape: f64,
    /// Mean of the activity/popularity prior (b' or d').
    pub activity_mean: f64,
}

impl Default for SidePriors {
    fn default() -> Self {
        SidePriors {
            weight_shape: 0.3,
            activity_shape: 0.3,
            activity_mean: 1.0,
        }
    }
}

impl SidePriors {
    /// Prior rate of the activity term.
    pub fn activity_rate(&self) -> f64 {
        self.activity_shape / self.activity_mean
    }

    fn validate(&self, side: &str) -> Result<(), HPFError> {
        for (name, val) in [
            ("weight_shape", self.weight_shape),
            ("activity_shape", self.activity_shape),
            ("activity_mean", self.activity_mean),
        ] {
            if !(val.is_finite() && val > MIN_PARAMETER) {
                return Err(HPFError::InvalidConfig(format!(
                    "{} {} must be greater than {:e}, got {}",
                    side, name, MIN_PARAMETER, val
                )));
            }
        }
        Ok(())
    }
}

/// Hierarchical Poisson factorization settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "python", derive(FromPyObject))]
#[serde(default)]
pub struct HPFConfig {
    /// Number of latent features.
    pub features: usize,
    pub user: SidePriors,
    pub item: SidePriors,
    /// Seed for initial parameter perturbation.
    pub seed: u64,
    pub max_shape_offset: f64,
    pub max_rate_offset: f64,
    /// Check validation log likelihood every this many iterations.
    pub check_frequency: usize,
    /// Score validation data as click/purchase probabilities instead of counts.
    pub probability: bool,
}

impl Default for HPFConfig {
    fn default() -> Self {
        HPFConfig {
            features: 10,
            user: SidePriors::default(),
            item: SidePriors::default(),
            seed: 42,
            max_shape_offset: 0.01,
            max_rate_offset: 0.01,
            check_frequency: 1,
            probability: false,
        }
    }
}

impl HPFConfig {
    /// Parse a configuration from JSON, filling in defaults.
    pub fn from_json(json: &str) -> Result<Self, HPFError> {
        let cfg: HPFConfig = serde_json::from_str(json)
            .map_err(|e| HPFError::InvalidConfig(format!("cannot parse config: {}", e)))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Check that the configuration describes a valid model.
    pub fn validate(&self) -> Result<(), HPFError> {
        if self.features == 0 {
            return Err(HPFError::InvalidConfig(
                "feature count must be positive".into(),
            ));
        }
        if self.check_frequency == 0 {
            return Err(HPFError::InvalidConfig(
                "check frequency must be positive".into(),
            ));
        }
        self.user.validate("user")?;
        self.item.validate("item")?;
        for (name, val) in [
            ("max_shape_offset", self.max_shape_offset),
            ("max_rate_offset", self.max_rate_offset),
        ] {
            if !(val.is_finite() && val >= 0.0) {
                return Err(HPFError::InvalidConfig(format!(
                    "{} must be non-negative, got {}",
                    name, val
                )));
            }
        }
        Ok(())
    }
}
