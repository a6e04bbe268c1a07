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
//! Initial body distributions
//!
//! Three sampling policies produce the starting [`BodyState`]:
//!
//! - [`BodyDistribution::Uniform`]: one cubic cloud centred at `z = 50`
//! - [`BodyDistribution::TwoClusters`]: two clouds offset along x, with a
//!   shear on the y velocity that sets them rotating about each other
//! - [`BodyDistribution::TwoClustersVaryingMass`]: the same, with each
//!   body's mass drawn from `[0.7, 1.3)`
//!
//! Every distribution ends with [`zero_momentum`], which removes the net
//! linear momentum of the system.
//!
//! ## Reproducibility
//!
//! The first two distributions use a fixed seed (42) by default, so two runs
//! with the same configuration produce bit-identical states. The mass-varying
//! distribution draws from OS entropy by default. All positions are sampled
//! before any velocity, in body order, and that order is part of the contract.

use crate::body::{BodyState, Momentum, Position, Velocity};
use crate::config::SimulationConfig;
use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Seed used by the reproducible distributions
pub const DEFAULT_SEED: u64 = 42;

/// Distance along z at which every cloud is centred
const CLOUD_DEPTH: f32 = 50.0;

/// Strength of the rotational shear applied to the two-cluster velocities
const ROTATION_SHEAR: f32 = 0.01;

/// Source of randomness for an initialization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Seed {
    /// Deterministic generator seeded with the given value
    Fixed(u64),
    /// Generator seeded from the operating system
    Entropy,
}

impl Seed {
    /// Build the generator for this seed
    pub fn rng(self) -> StdRng {
        match self {
            Seed::Fixed(seed) => StdRng::seed_from_u64(seed),
            Seed::Entropy => StdRng::from_os_rng(),
        }
    }
}

/// Sampling policy for the initial positions and velocities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BodyDistribution {
    /// Uniform cloud, unit masses
    Uniform,
    /// Two counter-rotating clusters, unit masses
    TwoClusters,
    /// Two counter-rotating clusters, masses in `[0.7, 1.3)`
    TwoClustersVaryingMass,
}

impl BodyDistribution {
    /// All distributions, in variant order
    pub const ALL: [BodyDistribution; 3] = [
        BodyDistribution::Uniform,
        BodyDistribution::TwoClusters,
        BodyDistribution::TwoClustersVaryingMass,
    ];

    /// Distribution for a numeric variant tag (1, 2 or 3)
    pub fn from_variant(variant: u8) -> Option<Self> {
        match variant {
            1 => Some(BodyDistribution::Uniform),
            2 => Some(BodyDistribution::TwoClusters),
            3 => Some(BodyDistribution::TwoClustersVaryingMass),
            _ => None,
        }
    }

    /// Numeric variant tag of this distribution
    pub fn variant(&self) -> u8 {
        match self {
            BodyDistribution::Uniform => 1,
            BodyDistribution::TwoClusters => 2,
            BodyDistribution::TwoClustersVaryingMass => 3,
        }
    }

    /// Seed policy used by [`initialize`]
    ///
    /// The mass-varying distribution is deliberately unseeded.
    pub fn default_seed(&self) -> Seed {
        match self {
            BodyDistribution::Uniform | BodyDistribution::TwoClusters => Seed::Fixed(DEFAULT_SEED),
            BodyDistribution::TwoClustersVaryingMass => Seed::Entropy,
        }
    }

    /// Short name used in logs and reports
    pub fn name(&self) -> &'static str {
        match self {
            BodyDistribution::Uniform => "uniform",
            BodyDistribution::TwoClusters => "two-clusters",
            BodyDistribution::TwoClustersVaryingMass => "two-clusters-varying-mass",
        }
    }
}

impl std::fmt::Display for BodyDistribution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (variant {})", self.name(), self.variant())
    }
}

/// Per-run sampler holding the generator and the derived scales
struct Sampler<'a, R: Rng> {
    rng: &'a mut R,
    num_bodies: usize,
    pscale: f32,
    vscale: f32,
}

impl<'a, R: Rng> Sampler<'a, R> {
    /// `u * scale + location` with `u` uniform in `[0, 1)`, drawn in double precision
    fn rand(&mut self, scale: f32, location: f32) -> f32 {
        (self.rng.random::<f64>() * scale as f64 + location as f64) as f32
    }

    fn rand_p(&mut self) -> f32 {
        self.pscale * self.rand(1.0, -0.5)
    }

    fn rand_v(&mut self) -> f32 {
        self.vscale * self.rand(1.0, -0.5)
    }

    fn rand_m(&mut self) -> f32 {
        self.rand(0.6, 0.7)
    }

    fn in_first_cluster(&self, i: usize) -> bool {
        i < self.num_bodies / 2
    }

    fn position(&mut self, distribution: BodyDistribution, i: usize) -> Position {
        match distribution {
            BodyDistribution::Uniform => {
                let x = self.rand_p();
                let y = self.rand_p();
                let z = self.rand_p() + CLOUD_DEPTH;
                Position::new(x, y, z, 1.0)
            }
            BodyDistribution::TwoClusters | BodyDistribution::TwoClustersVaryingMass => {
                let offset = if self.in_first_cluster(i) {
                    0.5 * self.pscale
                } else {
                    -0.5 * self.pscale
                };
                let x = self.rand_p() + offset;
                let y = self.rand_p();
                let z = self.rand_p() + CLOUD_DEPTH;
                let w = match distribution {
                    BodyDistribution::TwoClustersVaryingMass => self.rand_m(),
                    _ => 1.0,
                };
                Position::new(x, y, z, w)
            }
        }
    }

    fn velocity(&mut self, distribution: BodyDistribution, position: &Position, i: usize) -> Velocity {
        match distribution {
            BodyDistribution::Uniform => {
                let vx = self.rand_v();
                let vy = self.rand_v();
                let vz = self.rand_v();
                Velocity::new(vx, vy, vz, 1.0)
            }
            BodyDistribution::TwoClusters | BodyDistribution::TwoClustersVaryingMass => {
                let shear = ROTATION_SHEAR * self.vscale * position.x() * position.x();
                let vx = self.rand_v();
                let vy = if self.in_first_cluster(i) {
                    self.rand_v() + shear
                } else {
                    self.rand_v() - shear
                };
                let vz = self.rand_v();
                let mass = match distribution {
                    BodyDistribution::TwoClustersVaryingMass => position.w(),
                    _ => 1.0,
                };
                Velocity::new(vx, vy, vz, mass)
            }
        }
    }
}

/// Initialize bodies with the distribution's default seed policy
///
/// # Examples
///
/// ```
/// use nbody_engine::config::SimulationConfig;
/// use nbody_engine::initializer::{initialize, BodyDistribution};
///
/// let config = SimulationConfig::new(128);
/// let a = initialize(BodyDistribution::Uniform, &config);
/// let b = initialize(BodyDistribution::Uniform, &config);
/// assert_eq!(a.len(), 128);
/// assert_eq!(a, b);
/// ```
pub fn initialize(distribution: BodyDistribution, config: &SimulationConfig) -> BodyState {
    initialize_with_seed(distribution, config, distribution.default_seed())
}

/// Initialize bodies with an explicit seed policy
pub fn initialize_with_seed(distribution: BodyDistribution, config: &SimulationConfig, seed: Seed) -> BodyState {
    let mut rng = seed.rng();
    initialize_with_rng(distribution, config, &mut rng)
}

/// Initialize bodies drawing from the given generator
///
/// Masses are strictly positive for every distribution, which
/// [`zero_momentum`] relies on.
pub fn initialize_with_rng<R: Rng>(distribution: BodyDistribution, config: &SimulationConfig, rng: &mut R) -> BodyState {
    let num_bodies = config.num_bodies;
    let mut sampler = Sampler {
        rng,
        num_bodies,
        pscale: config.pscale(),
        vscale: config.vscale(),
    };

    let positions: Vec<Position> = (0..num_bodies)
        .map(|i| sampler.position(distribution, i))
        .collect();
    let mut velocities: Vec<Velocity> = positions
        .iter()
        .enumerate()
        .map(|(i, position)| sampler.velocity(distribution, position, i))
        .collect();

    debug!(
        "Initialized {} bodies with {} distribution (pscale {}, vscale {})",
        num_bodies,
        distribution,
        config.pscale(),
        config.vscale()
    );

    zero_momentum(&mut velocities);

    BodyState::from_matching(positions, velocities)
}

/// Remove the net linear momentum of a set of bodies
///
/// Each body's velocity is reduced by `total.xyz / n / mass_i`, so every body
/// gives up an equal share of the total momentum. Masses are unchanged.
///
/// Precondition: every mass is strictly positive. A zero mass yields a
/// non-finite velocity; this is not checked.
pub fn zero_momentum(velocities: &mut [Velocity]) {
    if velocities.is_empty() {
        return;
    }

    let total = Momentum::total(velocities);
    debug!(
        "Total momentum before adjustment: ({}, {}, {}), mass {}",
        total.x, total.y, total.z, total.mass
    );

    let len = velocities.len() as f32;
    for vel in velocities.iter_mut() {
        let mass = vel.mass();
        *vel = Velocity::new(
            vel.x() - total.x / len / mass,
            vel.y() - total.y / len / mass,
            vel.z() - total.z / len / mass,
            mass,
        );
    }

    let adjusted = Momentum::total(velocities);
    debug!(
        "Total momentum after adjustment: ({}, {}, {}), mass {}",
        adjusted.x, adjusted.y, adjusted.z, adjusted.mass
    );
}
