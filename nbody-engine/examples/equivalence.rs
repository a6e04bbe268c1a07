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
//! Equivalence and performance example
//!
//! Checks every tiled block size against the sequential integrator, then
//! times each of them.
//!
//! Usage: `cargo run --release --example equivalence [num_bodies]`

use std::error::Error;

use nbody_engine::harness::EquivalenceHarness;
use nbody_engine::integration::{Integrator, Schedule, SequentialIntegrator, TiledIntegrator};

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let num_bodies = match std::env::args().nth(1) {
        Some(arg) => arg.parse()?,
        None => 256 * 56,
    };

    println!("N-Body Engine - Equivalence Example");
    println!("===================================\n");

    let harness = EquivalenceHarness::new();
    let mut reference = SequentialIntegrator::new();
    let mut candidates: Vec<Box<dyn Integrator>> = [64, 128, 256, 512]
        .into_iter()
        .map(|block_size| Box::new(TiledIntegrator::new(block_size)) as Box<dyn Integrator>)
        .collect();
    if num_bodies <= 2048 {
        candidates.push(Box::new(TiledIntegrator::with_schedule(64, Schedule::Threaded)));
    }

    let mut failures = 0;
    for candidate in candidates.iter_mut() {
        for report in harness.compare_standard(&mut reference, candidate.as_mut(), num_bodies)? {
            if !report.is_equivalent() {
                failures += 1;
            }
            println!("{}", report);
        }
    }

    println!("\nPerformance ({} bodies):", num_bodies);
    println!("  {}", harness.measure(&mut reference, num_bodies)?);
    for candidate in candidates.iter_mut() {
        println!("  {}", harness.measure(candidate.as_mut(), num_bodies)?);
    }

    if failures > 0 {
        return Err(format!("{} comparisons failed", failures).into());
    }
    Ok(())
}
