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
//! Body records and the body state container
//!
//! Bodies are stored as two parallel arrays of four-component single-precision
//! records. The layout mirrors what a renderer or a GPU kernel consumes: a
//! position is `(x, y, z, w)` and a velocity is `(vx, vy, vz, mass)`.
//!
//! The mass stored in the fourth velocity component is authoritative. The
//! fourth position component is a placeholder (1.0) for the uniform and
//! two-cluster distributions and carries the same mass sample for the
//! mass-varying distribution; the interaction law reads it as the source mass.

use crate::error::SimulationError;
use bytemuck::{Pod, Zeroable};

/// Position of a body, with an auxiliary fourth component
///
/// # Examples
///
/// ```
/// use nbody_engine::body::Position;
///
/// let pos = Position::new(1.0, 2.0, 3.0, 1.0);
/// assert_eq!(pos.z(), 3.0);
/// assert!(pos.is_valid());
/// ```
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct Position {
    x: f32,
    y: f32,
    z: f32,
    w: f32,
}

impl Position {
    /// Create a new position
    #[inline]
    pub fn new(x: f32, y: f32, z: f32, w: f32) -> Self {
        Position { x, y, z, w }
    }

    /// Get the x coordinate
    #[inline]
    pub fn x(&self) -> f32 {
        self.x
    }

    /// Get the y coordinate
    #[inline]
    pub fn y(&self) -> f32 {
        self.y
    }

    /// Get the z coordinate
    #[inline]
    pub fn z(&self) -> f32 {
        self.z
    }

    /// Get the auxiliary fourth component (source mass for the interaction law)
    #[inline]
    pub fn w(&self) -> f32 {
        self.w
    }

    /// Check if the spatial coordinates are finite
    pub fn is_valid(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    /// Get the position as an array `[x, y, z, w]`
    pub fn as_array(&self) -> [f32; 4] {
        [self.x, self.y, self.z, self.w]
    }

    /// Create a position from an array `[x, y, z, w]`
    pub fn from_array(arr: [f32; 4]) -> Self {
        Position::new(arr[0], arr[1], arr[2], arr[3])
    }
}

/// Velocity of a body, with the body's mass in the fourth component
///
/// # Examples
///
/// ```
/// use nbody_engine::body::Velocity;
///
/// let vel = Velocity::new(2.0, 0.0, -1.0, 0.5);
/// let p = vel.momentum();
/// assert_eq!(p.x, 1.0);
/// assert_eq!(p.mass, 0.5);
/// ```
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct Velocity {
    vx: f32,
    vy: f32,
    vz: f32,
    mass: f32,
}

impl Velocity {
    /// Create a new velocity record
    #[inline]
    pub fn new(vx: f32, vy: f32, vz: f32, mass: f32) -> Self {
        Velocity { vx, vy, vz, mass }
    }

    /// Get the x component
    #[inline]
    pub fn x(&self) -> f32 {
        self.vx
    }

    /// Get the y component
    #[inline]
    pub fn y(&self) -> f32 {
        self.vy
    }

    /// Get the z component
    #[inline]
    pub fn z(&self) -> f32 {
        self.vz
    }

    /// Get the body's mass
    #[inline]
    pub fn mass(&self) -> f32 {
        self.mass
    }

    /// Check if the velocity components are finite
    pub fn is_valid(&self) -> bool {
        self.vx.is_finite() && self.vy.is_finite() && self.vz.is_finite()
    }

    /// Linear momentum `(vx·m, vy·m, vz·m)` together with the mass `m`
    pub fn momentum(&self) -> Momentum {
        Momentum {
            x: self.vx * self.mass,
            y: self.vy * self.mass,
            z: self.vz * self.mass,
            mass: self.mass,
        }
    }
}

/// Momentum of one body or a sum over many bodies
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Momentum {
    /// x component
    pub x: f32,
    /// y component
    pub y: f32,
    /// z component
    pub z: f32,
    /// Mass (summed when momenta are accumulated)
    pub mass: f32,
}

impl Momentum {
    /// Zero momentum and zero mass
    pub fn zero() -> Self {
        Momentum::default()
    }

    /// Component-wise sum of two momenta
    pub fn add(&self, other: &Momentum) -> Momentum {
        Momentum {
            x: self.x + other.x,
            y: self.y + other.y,
            z: self.z + other.z,
            mass: self.mass + other.mass,
        }
    }

    /// Magnitude of the linear part
    pub fn linear_magnitude(&self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// Sum the momenta of a set of velocity records, in order
    pub fn total(velocities: &[Velocity]) -> Momentum {
        velocities
            .iter()
            .fold(Momentum::zero(), |accum, vel| accum.add(&vel.momentum()))
    }
}

/// Acceleration accumulator for the interaction law
#[derive(Debug, Clone, Copy, PartialEq, Default, Zeroable)]
pub struct Acceleration {
    ax: f32,
    ay: f32,
    az: f32,
}

impl Acceleration {
    /// Create a new acceleration
    #[inline]
    pub fn new(ax: f32, ay: f32, az: f32) -> Self {
        Acceleration { ax, ay, az }
    }

    /// Zero acceleration
    #[inline]
    pub fn zero() -> Self {
        Acceleration::new(0.0, 0.0, 0.0)
    }

    /// Get the x component
    #[inline]
    pub fn ax(&self) -> f32 {
        self.ax
    }

    /// Get the y component
    #[inline]
    pub fn ay(&self) -> f32 {
        self.ay
    }

    /// Get the z component
    #[inline]
    pub fn az(&self) -> f32 {
        self.az
    }

    /// Check if all components are finite
    pub fn is_valid(&self) -> bool {
        self.ax.is_finite() && self.ay.is_finite() && self.az.is_finite()
    }
}

/// Positions and velocities of every body in a run
///
/// Both arrays always have the same length. The constructor checks it and
/// the accessors only hand out slices, so the length cannot change afterwards.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BodyState {
    positions: Vec<Position>,
    velocities: Vec<Velocity>,
}

impl BodyState {
    /// Create a body state from matching position and velocity arrays
    pub fn new(positions: Vec<Position>, velocities: Vec<Velocity>) -> Result<Self, SimulationError> {
        if positions.len() != velocities.len() {
            return Err(SimulationError::LengthMismatch {
                positions: positions.len(),
                velocities: velocities.len(),
            });
        }
        Ok(BodyState { positions, velocities })
    }

    /// Build a state from arrays the caller produced with equal lengths
    pub(crate) fn from_matching(positions: Vec<Position>, velocities: Vec<Velocity>) -> Self {
        debug_assert_eq!(positions.len(), velocities.len());
        BodyState { positions, velocities }
    }

    /// A state with no bodies
    pub fn empty() -> Self {
        BodyState::default()
    }

    /// Number of bodies
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Check whether there are no bodies
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Body positions
    pub fn positions(&self) -> &[Position] {
        &self.positions
    }

    /// Body velocities
    pub fn velocities(&self) -> &[Velocity] {
        &self.velocities
    }

    /// Mutable positions and velocities at once
    pub fn split_mut(&mut self) -> (&mut [Position], &mut [Velocity]) {
        (&mut self.positions, &mut self.velocities)
    }

    /// Total momentum and mass of all bodies
    pub fn total_momentum(&self) -> Momentum {
        Momentum::total(&self.velocities)
    }

    /// Consume the state, returning the position and velocity arrays
    pub fn into_parts(self) -> (Vec<Position>, Vec<Velocity>) {
        (self.positions, self.velocities)
    }
}

/// Allocate a zero-filled buffer, reporting allocation failure instead of aborting
pub(crate) fn try_zeroed_buffer<T: Zeroable + Clone>(len: usize) -> Result<Vec<T>, SimulationError> {
    let mut buffer = Vec::new();
    buffer
        .try_reserve_exact(len)
        .map_err(|_| SimulationError::AllocationFailed { bodies: len })?;
    buffer.resize(len, T::zeroed());
    Ok(buffer)
}
