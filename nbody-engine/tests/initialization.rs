// Copyright 2025 John Brosnihan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//! Integration tests for initial conditions
//!
//! Tests momentum zeroing, determinism and the distribution shapes

use nbody_engine::config::SimulationConfig;
use nbody_engine::initializer::{initialize, initialize_with_seed, BodyDistribution, Seed};

fn total_mass(velocities: &[nbody_engine::Velocity]) -> f32 {
    velocities.iter().map(|v| v.mass()).sum()
}

#[test]
fn test_momentum_is_zeroed_for_every_distribution() {
    for distribution in BodyDistribution::ALL {
        for n in [1, 2, 7, 300, 4096] {
            let state = initialize(distribution, &SimulationConfig::new(n));
            let momentum = state.total_momentum();
            let bound = 1e-3 * total_mass(state.velocities());

            assert!(
                momentum.linear_magnitude() <= bound,
                "{} with {} bodies: residual momentum {} exceeds {}",
                distribution,
                n,
                momentum.linear_magnitude(),
                bound
            );
        }
    }
}

#[test]
fn test_seeded_distributions_are_deterministic() {
    let config = SimulationConfig::new(1000);
    for distribution in [BodyDistribution::Uniform, BodyDistribution::TwoClusters] {
        let a = initialize(distribution, &config);
        let b = initialize(distribution, &config);
        assert_eq!(a, b, "{} is not reproducible", distribution);
    }
}

#[test]
fn test_explicit_seed_makes_varying_mass_reproducible() {
    let config = SimulationConfig::new(500);
    let a = initialize_with_seed(BodyDistribution::TwoClustersVaryingMass, &config, Seed::Fixed(7));
    let b = initialize_with_seed(BodyDistribution::TwoClustersVaryingMass, &config, Seed::Fixed(7));
    let c = initialize_with_seed(BodyDistribution::TwoClustersVaryingMass, &config, Seed::Fixed(8));

    assert_eq!(a, b);
    assert_ne!(a, c);
}

#[test]
fn test_masses_per_distribution() {
    let config = SimulationConfig::new(2000);

    for distribution in [BodyDistribution::Uniform, BodyDistribution::TwoClusters] {
        let state = initialize(distribution, &config);
        assert!(state.velocities().iter().all(|v| v.mass() == 1.0));
        assert!(state.positions().iter().all(|p| p.w() == 1.0));
    }

    let state = initialize(BodyDistribution::TwoClustersVaryingMass, &config);
    for (p, v) in state.positions().iter().zip(state.velocities()) {
        assert!((0.7..=1.3).contains(&v.mass()), "mass {} out of range", v.mass());
        assert_eq!(p.w(), v.mass());
    }
}

#[test]
fn test_two_clusters_are_offset_along_x() {
    let n = 2048;
    let config = SimulationConfig::new(n);
    let state = initialize_with_seed(BodyDistribution::TwoClusters, &config, Seed::Fixed(3));
    let (left, right) = state.positions().split_at(n / 2);

    let mean_x = |ps: &[nbody_engine::Position]| ps.iter().map(|p| p.x()).sum::<f32>() / ps.len() as f32;
    let offset = 0.5 * config.pscale();

    assert!((mean_x(left) - offset).abs() < 0.1 * config.pscale());
    assert!((mean_x(right) + offset).abs() < 0.1 * config.pscale());
}

#[test]
fn test_positions_within_scaled_cloud() {
    let config = SimulationConfig::new(8192).with_scales(1.5, 1.0);
    let half = 0.5 * config.pscale();
    let state = initialize(BodyDistribution::Uniform, &config);

    for p in state.positions() {
        assert!(p.x().abs() <= half && p.y().abs() <= half);
        assert!(p.is_valid());
    }
}

#[test]
fn test_empty_system() {
    for distribution in BodyDistribution::ALL {
        let state = initialize(distribution, &SimulationConfig::new(0));
        assert!(state.is_empty());
        assert_eq!(state.total_momentum().linear_magnitude(), 0.0);
    }
}
