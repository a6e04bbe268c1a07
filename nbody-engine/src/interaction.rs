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
//! Softened pairwise gravitational interaction
//!
//! The acceleration body `j` induces on body `i` is
//!
//! **a_i += m_j · r_ij / (|r_ij|² + ε²)^(3/2)**
//!
//! with `r_ij = p_j − p_i`. The gravitational constant is folded into the
//! masses, and the mass of the accelerated body cancels out, so the sum is
//! directly an acceleration.
//!
//! ## Self-interaction
//!
//! The sum runs over every `j`, including `j == i`. In that case `r_ij` is
//! exactly the zero vector, the softened distance is `ε²`, and the term is
//! `0 · m_i / ε³ = 0`. This only holds for `ε² > 0`; with no softening the
//! term is `0 · ∞ = NaN`, which is why configurations with ε² = 0 are rejected.

use crate::body::{Acceleration, Position};

/// Accumulate the acceleration `source` induces on `target`
///
/// `target.w` is ignored; `source.w` is the source mass. Every integrator
/// funnels through this function so their per-pair arithmetic is identical.
///
/// # Examples
///
/// ```
/// use nbody_engine::body::{Acceleration, Position};
/// use nbody_engine::interaction::body_body_interaction;
///
/// let body = Position::new(0.0, 0.0, 0.0, 1.0);
/// let acc = body_body_interaction(0.01, Acceleration::zero(), body, body);
/// assert_eq!(acc, Acceleration::zero());
/// ```
#[inline]
pub fn body_body_interaction(
    softening_squared: f32,
    acc: Acceleration,
    target: Position,
    source: Position,
) -> Acceleration {
    let rx = source.x() - target.x();
    let ry = source.y() - target.y();
    let rz = source.z() - target.z();

    let dist_sqr = rx * rx + ry * ry + rz * rz + softening_squared;

    let inv_dist = 1.0 / dist_sqr.sqrt();
    let inv_dist_cube = inv_dist * inv_dist * inv_dist;

    let s = source.w() * inv_dist_cube;

    Acceleration::new(acc.ax() + rx * s, acc.ay() + ry * s, acc.az() + rz * s)
}

/// Accumulate the acceleration every body in `sources` induces on `target`, in order
#[inline]
pub fn accumulate(softening_squared: f32, acc: Acceleration, target: Position, sources: &[Position]) -> Acceleration {
    sources
        .iter()
        .fold(acc, |acc, &source| body_body_interaction(softening_squared, acc, target, source))
}
