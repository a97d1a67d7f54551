// This file is part of LensKit.
// Copyright (C) 2018-2023 Boise State University.
// Copyright (C) 2023-2026 Drexel University.
// Licensed under the MIT license, see LICENSE.md for details.
// SPDX-License-Identifier: MIT

//! Held-out predictive log likelihood for convergence checks.

use log::*;
use ndarray::Array2;
use statrs::function::gamma::ln_gamma;

use crate::data::RatingEntry;
use crate::errors::HPFError;
use crate::hpf::model::VariationalModel;

/// Log likelihood trend across convergence checks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Trend {
    pub previous: Option<f64>,
    pub current: Option<f64>,
    /// Relative change reported to the stopping controller.
    pub change: f64,
}

impl Default for Trend {
    fn default() -> Self {
        Trend {
            previous: None,
            current: None,
            change: 1.0,
        }
    }
}

impl Trend {
    /// Record a new average log likelihood and return the relative change.
    pub fn record(&mut self, avg: f64) -> f64 {
        self.change = match self.current {
            Some(prev) => relative_change(prev, avg),
            None => 1.0,
        };
        self.previous = self.current;
        self.current = Some(avg);
        self.change
    }
}

/// Relative change between two average log likelihoods.
pub fn relative_change(previous: f64, current: f64) -> f64 {
    if previous == 0.0 {
        if current == 0.0 {
            0.0
        } else {
            f64::INFINITY
        }
    } else {
        ((current - previous) / previous).abs()
    }
}

/// Log likelihood of one observation given its expected Poisson rate.
///
/// In probability mode, a rating is treated as an indicator of a nonzero
/// count; otherwise it is the count itself.  The result is `-inf` when a
/// positive rating has a zero rate.
pub fn log_likelihood(rating: f64, rate: f64, probability: bool) -> f64 {
    if probability {
        if rating == 0.0 {
            -rate
        } else {
            (-(-rate).exp_m1()).ln()
        }
    } else if rating > 0.0 {
        rating * rate.ln() - rate - ln_gamma(rating + 1.0)
    } else {
        // 0 * log(rate) and log(0!) both vanish
        -rate
    }
}

/// Computes validation log likelihood every few iterations.
pub struct ConvergenceMonitor {
    validation: Vec<(usize, usize, f64)>,
    frequency: usize,
    probability: bool,
    trend: Trend,
}

impl ConvergenceMonitor {
    /// Create a monitor over validation ratings.
    ///
    /// Fails if there are no validation ratings to average over.
    pub fn new(
        validation: &[RatingEntry],
        frequency: usize,
        probability: bool,
    ) -> Result<Self, HPFError> {
        if frequency == 0 {
            return Err(HPFError::InvalidConfig(
                "check frequency must be positive".into(),
            ));
        }
        let validation: Vec<_> = validation
            .iter()
            .filter_map(|e| match *e {
                RatingEntry::Observed { user, item, value } => Some((user, item, value)),
                RatingEntry::Placeholder { .. } => None,
            })
            .collect();
        if validation.is_empty() {
            return Err(HPFError::EmptyValidation);
        }

        Ok(ConvergenceMonitor {
            validation,
            frequency,
            probability,
            trend: Trend::default(),
        })
    }

    /// Query whether a check is due at an iteration.
    pub fn is_due(&self, iteration: usize) -> bool {
        iteration % self.frequency == 0
    }

    pub fn trend(&self) -> &Trend {
        &self.trend
    }

    /// Get the latest relative change (1.0 before the first check).
    pub fn change(&self) -> f64 {
        self.trend.change
    }

    /// Compute the average predictive log likelihood of the validation data.
    pub fn average_log_likelihood(
        &self,
        users: &VariationalModel,
        items: &VariationalModel,
    ) -> Result<f64, HPFError> {
        let theta = users.weight_expectations()?;
        let beta = items.weight_expectations()?;
        self.average_from_expectations(&theta, &beta)
    }

    fn average_from_expectations(
        &self,
        theta: &Array2<f64>,
        beta: &Array2<f64>,
    ) -> Result<f64, HPFError> {
        let mut total = 0.0;
        for &(user, item, rating) in &self.validation {
            let rate = theta.row(user).dot(&beta.row(item));
            let ll = log_likelihood(rating, rate, self.probability);
            if !ll.is_finite() {
                return Err(HPFError::DegeneratePrediction {
                    user,
                    item,
                    iteration: 0,
                });
            }
            total += ll;
        }
        Ok(total / self.validation.len() as f64)
    }

    /// Run a check, update the trend, and return the relative change.
    pub fn check(
        &mut self,
        iteration: usize,
        users: &VariationalModel,
        items: &VariationalModel,
    ) -> Result<f64, HPFError> {
        let avg = self
            .average_log_likelihood(users, items)
            .map_err(|e| e.at_iteration(iteration))?;
        let change = self.trend.record(avg);
        info!(
            "iteration {} with current average predictive log likelihood {:.6} and the change is {:.6}",
            iteration, avg, change
        );
        Ok(change)
    }
}
