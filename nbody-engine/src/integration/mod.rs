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
//! Numerical integration of the N-body system
//!
//! Every integrator advances the system with the same semi-implicit Euler
//! step with velocity damping:
//!
//! ```text
//! a_i    = Σ_j interaction(p_i, p_j)       (over the pre-step positions)
//! v_i'   = (v_i + a_i·dt) · damping
//! p_i'   = p_i + v_i'·dt
//! ```
//!
//! They differ only in how the O(N²) acceleration sum is scheduled.
//!
//! # Integrators
//!
//! - **Sequential**: reference implementation, one thread, two passes
//! - **Tiled**: bodies split into blocks that stage positions through a
//!   block-local tile, with two barriers per tile
//!
//! Both implement [`Integrator`], so a caller can hold either as
//! `Box<dyn Integrator>` and swap them freely.

use crate::body::{try_zeroed_buffer, Acceleration, BodyState, Position, Velocity};
use crate::buffers::PositionBuffers;
use crate::config::StepParameters;
use crate::error::SimulationError;

mod sequential;
mod shared_tile;
mod tiled;

pub use sequential::SequentialIntegrator;
pub use shared_tile::SharedTile;
pub use tiled::{div_up, Schedule, TiledIntegrator, DEFAULT_BLOCK_SIZE};

/// Buffers one integration step works on
///
/// The step reads `old_positions` and writes `new_positions`; holding one
/// shared and one exclusive borrow makes aliasing between them impossible.
/// Velocities are updated in place, each body touching only its own record.
pub struct StepBuffers<'a> {
    old_positions: &'a [Position],
    new_positions: &'a mut [Position],
    velocities: &'a mut [Velocity],
}

impl<'a> StepBuffers<'a> {
    /// Bundle the buffers of a step, checking that they describe the same bodies
    pub fn new(
        old_positions: &'a [Position],
        new_positions: &'a mut [Position],
        velocities: &'a mut [Velocity],
    ) -> Result<Self, SimulationError> {
        if old_positions.len() != velocities.len() || new_positions.len() != velocities.len() {
            return Err(SimulationError::LengthMismatch {
                positions: old_positions.len().max(new_positions.len()),
                velocities: velocities.len(),
            });
        }
        Ok(StepBuffers {
            old_positions,
            new_positions,
            velocities,
        })
    }

    /// Number of bodies
    pub fn len(&self) -> usize {
        self.velocities.len()
    }

    /// Check if there are no bodies
    pub fn is_empty(&self) -> bool {
        self.velocities.is_empty()
    }

    /// Split into the read buffer, the write buffer and the velocities
    pub fn into_parts(self) -> (&'a [Position], &'a mut [Position], &'a mut [Velocity]) {
        (self.old_positions, self.new_positions, self.velocities)
    }
}

/// Apply the damped semi-implicit Euler update to one body
///
/// Only x, y and z change; `position.w` and the mass are carried through.
#[inline]
pub fn advance_body(
    position: Position,
    velocity: Velocity,
    accel: Acceleration,
    params: &StepParameters,
) -> (Position, Velocity) {
    let dt = params.delta_time;
    let damping = params.damping;

    let vx = (velocity.x() + accel.ax() * dt) * damping;
    let vy = (velocity.y() + accel.ay() * dt) * damping;
    let vz = (velocity.z() + accel.az() * dt) * damping;

    let new_position = Position::new(
        position.x() + vx * dt,
        position.y() + vy * dt,
        position.z() + vz * dt,
        position.w(),
    );
    (new_position, Velocity::new(vx, vy, vz, velocity.mass()))
}

/// Trait for N-body integration schemes
///
/// Implementations must read only `old_positions` when computing forces, so
/// that every body sees the same pre-step snapshot.
pub trait Integrator: Send + Sync {
    /// Get the name of this integrator
    fn name(&self) -> &str;

    /// Advance every body by one step
    fn step(&mut self, buffers: StepBuffers<'_>, params: &StepParameters) -> Result<(), SimulationError>;

    /// Advance a body state by `steps` steps
    ///
    /// Positions ping-pong between two buffers, swapping roles after every
    /// step; the final snapshot is copied back into `state`.
    ///
    /// If a step fails, `state` is left at the last completed step: the
    /// velocities that step already touched are restored before the error
    /// is returned.
    fn integrate(
        &mut self,
        state: &mut BodyState,
        params: &StepParameters,
        steps: usize,
    ) -> Result<(), SimulationError> {
        if steps == 0 || state.is_empty() {
            return Ok(());
        }

        let (positions, velocities) = state.split_mut();
        let mut initial = try_zeroed_buffer(positions.len())?;
        initial.copy_from_slice(positions);
        let mut buffers = PositionBuffers::new(initial)?;
        let mut saved_velocities = try_zeroed_buffer(velocities.len())?;

        for _ in 0..steps {
            saved_velocities.copy_from_slice(velocities);
            let (read, write) = buffers.split();
            let outcome = StepBuffers::new(read, write, &mut *velocities).and_then(|step| self.step(step, params));

            if let Err(err) = outcome {
                velocities.copy_from_slice(&saved_velocities);
                positions.copy_from_slice(buffers.front());
                return Err(err);
            }
            buffers.swap();
        }

        positions.copy_from_slice(buffers.front());
        Ok(())
    }
}
