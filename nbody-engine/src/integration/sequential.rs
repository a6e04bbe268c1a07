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
//! Sequential reference integrator
//!
//! Computes every acceleration first, then applies every update. Each body's
//! acceleration is summed over all sources in ascending index order, which is
//! the order every other integrator must reproduce.

use crate::body::{try_zeroed_buffer, Acceleration};
use crate::config::StepParameters;
use crate::error::SimulationError;
use crate::interaction::accumulate;
use super::{advance_body, Integrator, StepBuffers};

/// Single-threaded two-pass integrator
///
/// # Example
///
/// ```
/// use nbody_engine::integration::{Integrator, SequentialIntegrator};
///
/// let integrator = SequentialIntegrator::new();
/// assert_eq!(integrator.name(), "sequential");
/// ```
#[derive(Debug, Default)]
pub struct SequentialIntegrator {
    accelerations: Vec<Acceleration>,
}

impl SequentialIntegrator {
    /// Create a new sequential integrator
    pub fn new() -> Self {
        SequentialIntegrator { accelerations: Vec::new() }
    }

    /// Create a sequential integrator with scratch space for `num_bodies` bodies
    pub fn with_capacity(num_bodies: usize) -> Result<Self, SimulationError> {
        Ok(SequentialIntegrator {
            accelerations: try_zeroed_buffer(num_bodies)?,
        })
    }
}

impl Integrator for SequentialIntegrator {
    fn name(&self) -> &str {
        "sequential"
    }

    fn step(&mut self, buffers: StepBuffers<'_>, params: &StepParameters) -> Result<(), SimulationError> {
        let (old_positions, new_positions, velocities) = buffers.into_parts();

        if self.accelerations.len() != old_positions.len() {
            self.accelerations = try_zeroed_buffer(old_positions.len())?;
        }

        // Pass 1: accelerations from the pre-step snapshot
        for (acc, &target) in self.accelerations.iter_mut().zip(old_positions) {
            *acc = accumulate(params.softening_squared, Acceleration::zero(), target, old_positions);
        }

        // Pass 2: update
        for (((out, &position), velocity), &acc) in new_positions
            .iter_mut()
            .zip(old_positions)
            .zip(velocities.iter_mut())
            .zip(&self.accelerations)
        {
            let (new_position, new_velocity) = advance_body(position, *velocity, acc, params);
            *out = new_position;
            *velocity = new_velocity;
        }

        Ok(())
    }
}
