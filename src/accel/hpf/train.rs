// This file is part of LensKit.
// Copyright (C) 2018-2023 Boise State University.
// Copyright (C) 2023-2026 Drexel University.
// Licensed under the MIT license, see LICENSE.md for details.
// SPDX-License-Identifier: MIT

//! HPF training loop.

use log::*;
use rand::SeedableRng;
use rand_pcg::Pcg64;

use crate::data::{GroupedRatings, RatingSplit};
use crate::errors::{HPFError, Side};
use crate::hpf::config::HPFConfig;
use crate::hpf::finalize::HPFModel;
use crate::hpf::model::VariationalModel;
use crate::hpf::monitor::ConvergenceMonitor;
use crate::hpf::update::{Snapshot, UpdateEngine};
use crate::parallel::pool_size;

/// Controller deciding when to stop an iterative training loop.
pub trait TrainingLoop {
    /// Decide whether to run another iteration, given the latest change.
    ///
    /// Returning `true` starts a new iteration and advances the count.
    fn keep_training(&mut self, change: f64) -> bool;

    /// Number of iterations started so far (1-based inside the loop).
    fn iteration_count(&self) -> usize;
}

/// Stop once the change drops below a threshold.
#[derive(Debug, Clone)]
pub struct ThresholdStop {
    threshold: f64,
    min_iterations: usize,
    max_iterations: Option<usize>,
    iterations: usize,
}

impl ThresholdStop {
    pub fn new(threshold: f64) -> Self {
        ThresholdStop {
            threshold,
            min_iterations: 0,
            max_iterations: None,
            iterations: 0,
        }
    }

    pub fn min_iterations(self, n: usize) -> Self {
        ThresholdStop {
            min_iterations: n,
            ..self
        }
    }

    pub fn max_iterations(self, n: usize) -> Self {
        ThresholdStop {
            max_iterations: Some(n),
            ..self
        }
    }
}

impl TrainingLoop for ThresholdStop {
    fn keep_training(&mut self, change: f64) -> bool {
        if let Some(max) = self.max_iterations {
            if self.iterations >= max {
                return false;
            }
        }
        if self.iterations >= self.min_iterations && change < self.threshold {
            return false;
        }
        self.iterations += 1;
        true
    }

    fn iteration_count(&self) -> usize {
        self.iterations
    }
}

/// Run a fixed number of iterations, ignoring the change.
#[derive(Debug, Clone)]
pub struct IterationLimit {
    limit: usize,
    iterations: usize,
}

impl IterationLimit {
    pub fn new(limit: usize) -> Self {
        IterationLimit {
            limit,
            iterations: 0,
        }
    }
}

impl TrainingLoop for IterationLimit {
    fn keep_training(&mut self, _change: f64) -> bool {
        if self.iterations < self.limit {
            self.iterations += 1;
            true
        } else {
            false
        }
    }

    fn iteration_count(&self) -> usize {
        self.iterations
    }
}

/// Train an HPF model on a rating split.
pub fn train_hpf<L: TrainingLoop>(
    config: &HPFConfig,
    data: &RatingSplit,
    controller: &mut L,
) -> Result<HPFModel, HPFError> {
    config.validate()?;
    let mut monitor = ConvergenceMonitor::new(
        data.validation(),
        config.check_frequency,
        config.probability,
    )?;

    let n_users = data.n_users();
    let n_items = data.n_items();
    let k = config.features;
    debug!(
        "training HPF with {} features on {} users and {} items ({} train, {} validation)",
        k,
        n_users,
        n_items,
        data.train().len(),
        data.validation().len()
    );
    debug!("updating entities on {} threads", pool_size());

    let mut rng = Pcg64::seed_from_u64(config.seed);
    let mut users = VariationalModel::initialize(
        Side::User,
        &config.user,
        n_users,
        k,
        config.max_shape_offset,
        config.max_rate_offset,
        &mut rng,
    );
    let mut items = VariationalModel::initialize(
        Side::Item,
        &config.item,
        n_items,
        k,
        config.max_shape_offset,
        config.max_rate_offset,
        &mut rng,
    );
    info!("initialization finished");

    let groups = GroupedRatings::build(data.train(), n_users, n_items);
    let engine = UpdateEngine::new(&groups, config);

    let mut checked = false;
    while controller.keep_training(monitor.change()) {
        let iter = controller.iteration_count();

        let snapshot = Snapshot::capture(&users, &items).map_err(|e| e.at_iteration(iter))?;
        let new_users = engine
            .update_users(&snapshot, &users, &items)
            .map_err(|e| e.at_iteration(iter))?;
        info!("iteration {} user update finished", iter);

        let new_items = engine
            .update_items(&snapshot, &items, &new_users)
            .map_err(|e| e.at_iteration(iter))?;
        info!("iteration {} item update finished", iter);

        users = new_users;
        items = new_items;

        if monitor.is_due(iter) {
            monitor.check(iter, &users, &items)?;
            checked = true;
        }
    }

    if !checked {
        warn!("training stopped before any convergence check");
    }

    HPFModel::from_variational(&users, &items, data.users().clone(), data.items().clone())
        .map_err(|e| e.at_iteration(controller.iteration_count()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{EntityIndex, RatingEntry};
    use statrs::function::gamma::digamma;

    fn init_logging() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn config() -> HPFConfig {
        HPFConfig {
            features: 2,
            seed: 1234,
            max_shape_offset: 0.1,
            max_rate_offset: 0.1,
            ..Default::default()
        }
    }

    /// 3x3 matrix with one rating per user.
    fn split() -> RatingSplit {
        RatingSplit::new(
            vec![
                RatingEntry::new(0, 0, 3.0),
                RatingEntry::new(1, 2, 1.0),
                RatingEntry::new(2, 1, 2.0),
            ],
            vec![RatingEntry::new(0, 1, 1.0), RatingEntry::new(2, 2, 0.0)],
            EntityIndex::from_ids([100, 101, 102]),
            EntityIndex::from_ids([200, 201, 202]),
        )
        .unwrap()
    }

    /// Plain sequential rendition of the update equations.
    struct Naive {
        shp: Vec<Vec<f64>>,
        rte: Vec<Vec<f64>>,
        a_shp: Vec<f64>,
        a_rte: Vec<f64>,
    }

    impl Naive {
        fn from(m: &VariationalModel) -> Naive {
            let n = m.len();
            let k = m.n_features();
            Naive {
                shp: (0..n)
                    .map(|i| (0..k).map(|f| m.weight_shape[[i, f]]).collect())
                    .collect(),
                rte: (0..n)
                    .map(|i| (0..k).map(|f| m.weight_rate[[i, f]]).collect())
                    .collect(),
                a_shp: m.activity_shape.to_vec(),
                a_rte: m.activity_rate.to_vec(),
            }
        }

        fn elog(&self, i: usize, f: usize) -> f64 {
            digamma(self.shp[i][f]) - self.rte[i][f].ln()
        }

        fn exp(&self, i: usize, f: usize) -> f64 {
            self.shp[i][f] / self.rte[i][f]
        }
    }

    fn naive_side(
        this: &Naive,
        other_sums: &[f64],
        phi_sums: &[Vec<f64>],
        p: &crate::hpf::config::SidePriors,
    ) -> Naive {
        let n = this.shp.len();
        let k = other_sums.len();
        let mut out = Naive {
            shp: vec![vec![0.0; k]; n],
            rte: vec![vec![0.0; k]; n],
            a_shp: vec![0.0; n],
            a_rte: vec![0.0; n],
        };
        for e in 0..n {
            let act = this.a_shp[e] / this.a_rte[e];
            let mut tot = 0.0;
            for f in 0..k {
                out.shp[e][f] = p.weight_shape + phi_sums[e][f];
                out.rte[e][f] = act + other_sums[f];
                tot += out.shp[e][f] / out.rte[e][f];
            }
            out.a_shp[e] = p.activity_shape + k as f64 * p.weight_shape;
            out.a_rte[e] = p.activity_shape / p.activity_mean + tot;
        }
        out
    }

    fn naive_iteration(
        cfg: &HPFConfig,
        ratings: &[(usize, usize, f64)],
        users: &Naive,
        items: &Naive,
    ) -> (Naive, Naive) {
        let k = cfg.features;
        let nu = users.shp.len();
        let ni = items.shp.len();
        let mut u_phi = vec![vec![0.0; k]; nu];
        let mut i_phi = vec![vec![0.0; k]; ni];
        for &(u, i, r) in ratings {
            let raw: Vec<f64> = (0..k)
                .map(|f| (users.elog(u, f) + items.elog(i, f)).exp())
                .collect();
            let z: f64 = raw.iter().sum();
            for f in 0..k {
                u_phi[u][f] += r * raw[f] / z;
                i_phi[i][f] += r * raw[f] / z;
            }
        }
        let item_sums: Vec<f64> = (0..k)
            .map(|f| (0..ni).map(|i| items.exp(i, f)).sum())
            .collect();
        let new_users = naive_side(users, &item_sums, &u_phi, &cfg.user);
        let user_sums: Vec<f64> = (0..k)
            .map(|f| (0..nu).map(|u| new_users.exp(u, f)).sum())
            .collect();
        let new_items = naive_side(items, &user_sums, &i_phi, &cfg.item);
        (new_users, new_items)
    }

    #[test]
    fn test_threshold_stop() {
        let mut stop = ThresholdStop::new(0.01).min_iterations(2).max_iterations(5);
        assert!(stop.keep_training(0.0));
        assert!(stop.keep_training(0.0));
        assert_eq!(stop.iteration_count(), 2);
        assert!(stop.keep_training(0.5));
        assert!(!stop.keep_training(0.001));
        assert_eq!(stop.iteration_count(), 3);

        let mut stop = ThresholdStop::new(0.01).max_iterations(2);
        assert!(stop.keep_training(1.0));
        assert!(stop.keep_training(1.0));
        assert!(!stop.keep_training(1.0));
    }

    #[test]
    fn test_iteration_limit() {
        let mut lim = IterationLimit::new(2);
        assert!(lim.keep_training(0.0));
        assert_eq!(lim.iteration_count(), 1);
        assert!(lim.keep_training(0.0));
        assert!(!lim.keep_training(1.0));
        assert_eq!(lim.iteration_count(), 2);
    }

    #[test]
    fn test_empty_validation_fails_fast() {
        let data = RatingSplit::new(
            vec![RatingEntry::new(0, 0, 1.0)],
            vec![],
            EntityIndex::identity(1),
            EntityIndex::identity(1),
        )
        .unwrap();
        let mut stop = IterationLimit::new(3);
        let res = train_hpf(&config(), &data, &mut stop);
        assert_eq!(res.unwrap_err(), HPFError::EmptyValidation);
        assert_eq!(stop.iteration_count(), 0);
    }

    #[test]
    fn test_invalid_config() {
        let cfg = HPFConfig {
            features: 0,
            ..config()
        };
        let res = train_hpf(&cfg, &split(), &mut IterationLimit::new(1));
        assert!(matches!(res, Err(HPFError::InvalidConfig(_))));
    }

    #[test]
    fn test_tiny_prior_rejected_before_training() {
        let mut cfg = config();
        cfg.user.weight_shape = 1e-11;
        let mut stop = IterationLimit::new(3);
        let res = train_hpf(&cfg, &split(), &mut stop);
        assert!(matches!(res, Err(HPFError::InvalidConfig(_))));
        assert_eq!(stop.iteration_count(), 0);
    }

    /// Expected features after 5 iterations from seed 1234.
    const RECORDED_USERS: [[f64; 2]; 3] = [
        [0.4926076590977773, 1.7653096428604915],
        [0.5855630100166958, 0.14818480786458],
        [1.1505845735390448, 0.2595740928617702],
    ];
    const RECORDED_ITEMS: [[f64; 2]; 3] = [
        [0.30197865002662494, 1.0065409927880489],
        [0.7123216014278637, 0.15046868192215176],
        [0.37769454432503674, 0.09050415368389499],
    ];

    #[test]
    fn test_end_to_end_matches_recorded() {
        init_logging();
        let model = train_hpf(&config(), &split(), &mut IterationLimit::new(5)).unwrap();
        for u in 0..3 {
            for f in 0..2 {
                let v = model.user_features()[[u, f]];
                let diff = (v - RECORDED_USERS[u][f]).abs();
                assert!(diff < 1e-9, "user {} feature {}: {}", u, f, v);
            }
        }
        for i in 0..3 {
            for f in 0..2 {
                let v = model.item_features()[[i, f]];
                let diff = (v - RECORDED_ITEMS[i][f]).abs();
                assert!(diff < 1e-9, "item {} feature {}: {}", i, f, v);
            }
        }
    }

    #[test]
    fn test_end_to_end_matches_reference() {
        init_logging();
        let cfg = config();
        let data = split();
        let iters = 5;
        let model = train_hpf(&cfg, &data, &mut IterationLimit::new(iters)).unwrap();

        let mut rng = Pcg64::seed_from_u64(cfg.seed);
        let u0 = VariationalModel::initialize(
            Side::User,
            &cfg.user,
            3,
            2,
            cfg.max_shape_offset,
            cfg.max_rate_offset,
            &mut rng,
        );
        let i0 = VariationalModel::initialize(
            Side::Item,
            &cfg.item,
            3,
            2,
            cfg.max_shape_offset,
            cfg.max_rate_offset,
            &mut rng,
        );
        let ratings = vec![(0, 0, 3.0), (1, 2, 1.0), (2, 1, 2.0)];
        let mut users = Naive::from(&u0);
        let mut items = Naive::from(&i0);
        for _ in 0..iters {
            let (nu, ni) = naive_iteration(&cfg, &ratings, &users, &items);
            users = nu;
            items = ni;
        }

        for u in 0..3 {
            for f in 0..2 {
                let v = model.user_features()[[u, f]];
                assert!(v.is_finite() && v >= 0.0);
                assert!((v - users.exp(u, f)).abs() < 1e-9, "user {} feature {}", u, f);
            }
        }
        for i in 0..3 {
            for f in 0..2 {
                let v = model.item_features()[[i, f]];
                assert!(v.is_finite() && v >= 0.0);
                assert!((v - items.exp(i, f)).abs() < 1e-9, "item {} feature {}", i, f);
            }
        }
        assert_eq!(model.users().index_of(101), Some(1));
        assert!(model.score(100, 200).is_some());
    }

    #[test]
    fn test_end_to_end_deterministic() {
        let cfg = config();
        let data = split();
        let a = train_hpf(&cfg, &data, &mut IterationLimit::new(4)).unwrap();
        let b = train_hpf(&cfg, &data, &mut IterationLimit::new(4)).unwrap();
        for (x, y) in a.user_features().iter().zip(b.user_features().iter()) {
            assert_eq!(x.to_bits(), y.to_bits());
        }
        for (x, y) in a.item_features().iter().zip(b.item_features().iter()) {
            assert_eq!(x.to_bits(), y.to_bits());
        }
    }

    #[test]
    fn test_threshold_training_stops() {
        let cfg = HPFConfig {
            check_frequency: 2,
            ..config()
        };
        let mut stop = ThresholdStop::new(1e-3).max_iterations(200);
        let model = train_hpf(&cfg, &split(), &mut stop).unwrap();
        assert!(stop.iteration_count() >= 2);
        assert!(stop.iteration_count() <= 200);
        assert!(model.user_features().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_probability_mode_trains() {
        let cfg = HPFConfig {
            probability: true,
            ..config()
        };
        let model = train_hpf(&cfg, &split(), &mut IterationLimit::new(3)).unwrap();
        let p = model.probability(100, 200).unwrap();
        assert!(p > 0.0 && p < 1.0);
    }
}
