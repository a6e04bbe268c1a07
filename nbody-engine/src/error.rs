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
//! Error type shared by the engine
//!
//! Only conditions the engine can detect cheaply are reported here. Numeric
//! preconditions such as strictly positive masses are documented on the
//! functions that rely on them and are not checked at runtime.

use std::error::Error;
use std::fmt;

/// Errors produced while configuring or running a simulation
#[derive(Debug, Clone, PartialEq)]
pub enum SimulationError {
    /// A configuration value is out of its valid range
    InvalidConfig(String),
    /// Position and velocity arrays do not describe the same bodies
    LengthMismatch {
        /// Number of position records
        positions: usize,
        /// Number of velocity records
        velocities: usize,
    },
    /// A body buffer could not be allocated
    AllocationFailed {
        /// Number of bodies the buffer was sized for
        bodies: usize,
    },
    /// A simulation driver was built without any integrator
    EmptyIntegratorQueue,
}

impl fmt::Display for SimulationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SimulationError::InvalidConfig(msg) => write!(f, "Invalid configuration: {}", msg),
            SimulationError::LengthMismatch { positions, velocities } => write!(
                f,
                "Body state length mismatch: {} positions, {} velocities",
                positions, velocities
            ),
            SimulationError::AllocationFailed { bodies } => {
                write!(f, "Failed to allocate body buffer for {} bodies", bodies)
            }
            SimulationError::EmptyIntegratorQueue => write!(f, "No integrator available"),
        }
    }
}

impl Error for SimulationError {}
