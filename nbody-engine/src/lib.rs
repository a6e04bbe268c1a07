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
//! # N-Body Engine
//!
//! A softened-gravity N-body engine with interchangeable integrators that
//! produce bitwise-identical trajectories.
//!
//! ## Features
//!
//! - **Softened Gravity**: Plummer-softened pairwise law, full O(N²) sum
//! - **Deterministic Setup**: Seeded cloud and two-cluster initial conditions
//!   with zero net momentum
//! - **Tiled Integration**: Block-tiled force evaluation with barrier-separated
//!   load and compute phases, on rayon tasks or one thread per lane
//! - **Equivalence Harness**: Step-by-step comparison of any two integrators
//! - **Simulation Driver**: Ping-pong buffers and an integrator rotation for
//!   frame-by-frame rendering
//!
//! ## Example
//!
//! ```rust
//! use nbody_engine::config::SimulationConfig;
//! use nbody_engine::initializer::{initialize, BodyDistribution};
//! use nbody_engine::integration::{Integrator, TiledIntegrator};
//!
//! let config = SimulationConfig::new(512);
//! let mut state = initialize(BodyDistribution::TwoClusters, &config);
//!
//! let mut integrator = TiledIntegrator::new(128);
//! integrator.integrate(&mut state, &config.step_parameters(), 10).unwrap();
//! assert!(state.positions().iter().all(|p| p.is_valid()));
//! ```

#![warn(missing_docs)]

/// Body records and state containers
pub mod body;

/// Ping-pong position buffers
pub mod buffers;

/// Run configuration
pub mod config;

/// Error types
pub mod error;

/// Cross-integrator equivalence and performance checks
pub mod harness;

/// Initial conditions
pub mod initializer;

/// Numerical integration methods
pub mod integration;

/// Pairwise interaction law
pub mod interaction;

/// Memory pooling for reducing allocation churn
pub mod pool;

/// Frame-by-frame simulation driver
pub mod simulation;

pub use body::{Acceleration, BodyState, Position, Velocity};
pub use config::{SimulationConfig, StepParameters};
pub use error::SimulationError;
pub use initializer::{initialize, BodyDistribution, Seed};
pub use integration::{Integrator, Schedule, SequentialIntegrator, TiledIntegrator};
pub use simulation::Simulation;
