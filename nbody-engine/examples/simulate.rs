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
//! Headless simulation example
//!
//! Runs the standard integrator rotation on a two-cluster system, switching
//! integrator every few hundred steps, and prints the throughput of each.
//!
//! Usage: `cargo run --release --example simulate [num_bodies] [distribution 1-3]`
//!
//! Set `RUST_LOG=debug` to see momentum totals and per-window throughput.

use std::error::Error;

use nbody_engine::config::SimulationConfig;
use nbody_engine::initializer::BodyDistribution;
use nbody_engine::integration::{Integrator, SequentialIntegrator};
use nbody_engine::simulation::{Simulation, FPS_WINDOW};

const STEPS_PER_INTEGRATOR: usize = 2 * FPS_WINDOW as usize;

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = std::env::args().skip(1);
    let num_bodies = match args.next() {
        Some(arg) => arg.parse()?,
        None => 4096,
    };
    let distribution = match args.next() {
        Some(arg) => BodyDistribution::from_variant(arg.parse()?).ok_or("distribution must be 1, 2 or 3")?,
        None => BodyDistribution::TwoClusters,
    };

    println!("N-Body Engine - Simulation Example");
    println!("==================================\n");

    let config = SimulationConfig::new(num_bodies);
    let mut integrators = Simulation::standard_integrators();
    if num_bodies <= 4096 {
        integrators.push(Box::new(SequentialIntegrator::new()) as Box<dyn Integrator>);
    }
    let rotation = integrators.len();

    let mut sim = Simulation::new(config, distribution, integrators)?;
    println!("{} bodies, {} distribution, {} integrators\n", sim.len(), distribution, rotation);

    for _ in 0..rotation {
        sim.advance_by(STEPS_PER_INTEGRATOR)?;
        println!("  {}", sim.description());
        sim.switch_integrator();
    }

    let momentum = sim.into_state().total_momentum();
    println!("\nResidual momentum: {:.3e}", momentum.linear_magnitude());
    Ok(())
}
