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
//! Integration tests for the simulation driver

use nbody_engine::config::SimulationConfig;
use nbody_engine::initializer::{initialize, BodyDistribution};
use nbody_engine::integration::{Integrator, SequentialIntegrator, TiledIntegrator};
use nbody_engine::simulation::Simulation;

#[test]
fn test_switching_integrators_keeps_trajectory() {
    let config = SimulationConfig::new(600);

    // Reference run without switching
    let mut reference = initialize(BodyDistribution::TwoClusters, &config);
    SequentialIntegrator::new()
        .integrate(&mut reference, &config.step_parameters(), 6)
        .unwrap();

    let mut sim = Simulation::new(config, BodyDistribution::TwoClusters, Simulation::standard_integrators()).unwrap();
    for _ in 0..3 {
        sim.advance_by(2).unwrap();
        sim.switch_integrator();
    }

    assert_eq!(sim.steps(), 6);
    assert_eq!(sim.into_state(), reference);
}

#[test]
fn test_snapshot_is_complete_after_each_advance() {
    let config = SimulationConfig::new(100);
    let mut sim = Simulation::new(
        config,
        BodyDistribution::Uniform,
        vec![Box::new(TiledIntegrator::new(32)) as Box<dyn Integrator>],
    )
    .unwrap();

    let before = sim.positions().to_vec();
    sim.advance().unwrap();
    let after = sim.positions();

    assert_eq!(after.len(), before.len());
    // Every body moved; nothing is left over from the previous snapshot
    assert!(before.iter().zip(after).all(|(b, a)| b != a));
    assert_eq!(sim.position_bytes().len(), 100 * std::mem::size_of::<nbody_engine::Position>());
}

#[test]
fn test_momentum_stays_small() {
    let config = SimulationConfig::new(512);
    let mut sim = Simulation::new(
        config,
        BodyDistribution::TwoClustersVaryingMass,
        vec![Box::new(TiledIntegrator::new(128)) as Box<dyn Integrator>],
    )
    .unwrap();
    sim.advance_by(20).unwrap();

    let total_mass: f32 = sim.velocities().iter().map(|v| v.mass()).sum();
    let state = sim.into_state();
    assert!(state.total_momentum().linear_magnitude() <= 1e-2 * total_mass);
}
