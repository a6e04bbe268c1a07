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
//! Frame-by-frame simulation driver
//!
//! [`Simulation`] owns the body state and a rotation of integrators. Each
//! call to [`Simulation::advance`] runs one step into the back position
//! buffer and then swaps, so [`Simulation::positions`] always returns a
//! complete snapshot that a renderer can upload as-is.
//!
//! # Example
//!
//! ```
//! use nbody_engine::config::SimulationConfig;
//! use nbody_engine::initializer::BodyDistribution;
//! use nbody_engine::integration::{Integrator, SequentialIntegrator, TiledIntegrator};
//! use nbody_engine::simulation::Simulation;
//!
//! let integrators: Vec<Box<dyn Integrator>> = vec![
//!     Box::new(TiledIntegrator::new(64)),
//!     Box::new(SequentialIntegrator::new()),
//! ];
//! let mut sim = Simulation::new(SimulationConfig::new(256), BodyDistribution::TwoClusters, integrators).unwrap();
//!
//! sim.advance_by(3).unwrap();
//! assert_eq!(sim.steps(), 3);
//!
//! assert_eq!(sim.switch_integrator(), "sequential");
//! assert_eq!(sim.position_bytes().len(), 256 * 16);
//! ```

use std::collections::VecDeque;
use std::time::Instant;

use log::{debug, info};

use crate::body::{BodyState, Position, Velocity};
use crate::buffers::PositionBuffers;
use crate::config::{SimulationConfig, StepParameters};
use crate::error::SimulationError;
use crate::initializer::{initialize, BodyDistribution};
use crate::integration::{Integrator, StepBuffers, TiledIntegrator};

/// Number of steps per throughput measurement window
pub const FPS_WINDOW: u64 = 128;

/// Block sizes of the standard integrator rotation, in order
pub const STANDARD_BLOCK_SIZES: [usize; 4] = [256, 64, 128, 512];

/// Steps-per-second bookkeeping over fixed windows
#[derive(Debug)]
struct Throughput {
    window_start: Instant,
    window_steps: u64,
    last_rate: Option<f64>,
}

impl Throughput {
    fn new() -> Self {
        Throughput {
            window_start: Instant::now(),
            window_steps: 0,
            last_rate: None,
        }
    }

    /// Count one step, closing the window after `FPS_WINDOW` steps
    fn record_step(&mut self) -> Option<f64> {
        self.window_steps += 1;
        if self.window_steps < FPS_WINDOW {
            return None;
        }

        let elapsed = self.window_start.elapsed().as_secs_f64().max(f64::MIN_POSITIVE);
        let rate = self.window_steps as f64 / elapsed;
        self.last_rate = Some(rate);
        self.window_start = Instant::now();
        self.window_steps = 0;
        Some(rate)
    }
}

/// A running simulation with a queue of interchangeable integrators
pub struct Simulation {
    config: SimulationConfig,
    params: StepParameters,
    positions: PositionBuffers,
    velocities: Vec<Velocity>,
    integrators: VecDeque<Box<dyn Integrator>>,
    steps: u64,
    throughput: Throughput,
}

impl Simulation {
    /// Initialize bodies with `distribution` and prepare the integrator rotation
    ///
    /// The first integrator in `integrators` is the current one.
    pub fn new(
        config: SimulationConfig,
        distribution: BodyDistribution,
        integrators: Vec<Box<dyn Integrator>>,
    ) -> Result<Self, SimulationError> {
        config.validate()?;
        let state = initialize(distribution, &config);
        Self::from_state(config, state, integrators)
    }

    /// Start from an existing body state
    ///
    /// `config.num_bodies` is replaced by the length of `state`.
    pub fn from_state(
        mut config: SimulationConfig,
        state: BodyState,
        integrators: Vec<Box<dyn Integrator>>,
    ) -> Result<Self, SimulationError> {
        config.num_bodies = state.len();
        config.validate()?;
        if integrators.is_empty() {
            return Err(SimulationError::EmptyIntegratorQueue);
        }

        let (positions, velocities) = state.into_parts();
        let sim = Simulation {
            params: config.step_parameters(),
            config,
            positions: PositionBuffers::new(positions)?,
            velocities,
            integrators: integrators.into(),
            steps: 0,
            throughput: Throughput::new(),
        };

        info!(
            "Simulation ready: {} bodies, {} integrators, starting with {}",
            sim.len(),
            sim.integrators.len(),
            sim.current_integrator()
        );
        Ok(sim)
    }

    /// Tiled integrators in the standard rotation order
    pub fn standard_integrators() -> Vec<Box<dyn Integrator>> {
        STANDARD_BLOCK_SIZES
            .iter()
            .map(|&block_size| Box::new(TiledIntegrator::new(block_size)) as Box<dyn Integrator>)
            .collect()
    }

    /// Advance one step with the current integrator
    pub fn advance(&mut self) -> Result<(), SimulationError> {
        let integrator = self
            .integrators
            .front_mut()
            .ok_or(SimulationError::EmptyIntegratorQueue)?;

        let (read, write) = self.positions.split();
        integrator.step(StepBuffers::new(read, write, &mut self.velocities)?, &self.params)?;
        self.positions.swap();
        self.steps += 1;

        if let Some(rate) = self.throughput.record_step() {
            debug!("{}: {:.1} steps/s", integrator.name(), rate);
        }
        Ok(())
    }

    /// Advance `steps` steps
    pub fn advance_by(&mut self, steps: usize) -> Result<(), SimulationError> {
        for _ in 0..steps {
            self.advance()?;
        }
        Ok(())
    }

    /// Rotate to the next integrator and return its name
    ///
    /// The current integrator moves to the back of the queue. Throughput
    /// measurement restarts.
    pub fn switch_integrator(&mut self) -> &str {
        self.integrators.rotate_left(1);
        self.throughput = Throughput::new();
        info!("Switched to {}", self.current_integrator());
        self.current_integrator()
    }

    /// Name of the integrator used by the next step
    pub fn current_integrator(&self) -> &str {
        self.integrators.front().map_or("", |integrator| integrator.name())
    }

    /// Current position snapshot
    pub fn positions(&self) -> &[Position] {
        self.positions.front()
    }

    /// Current position snapshot as raw bytes, four `f32` per body
    pub fn position_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(self.positions.front())
    }

    /// Current velocities
    pub fn velocities(&self) -> &[Velocity] {
        &self.velocities
    }

    /// Number of bodies
    pub fn len(&self) -> usize {
        self.velocities.len()
    }

    /// Check if the simulation has no bodies
    pub fn is_empty(&self) -> bool {
        self.velocities.is_empty()
    }

    /// Steps taken since creation
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Steps per second over the last complete window with the current integrator
    ///
    /// `None` until [`FPS_WINDOW`] steps have run since creation or the last switch.
    pub fn throughput(&self) -> Option<f64> {
        self.throughput.last_rate
    }

    /// Configuration of this run
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// One-line status, e.g. for a window title
    pub fn description(&self) -> String {
        match self.throughput() {
            Some(rate) => format!(
                "{} bodies, {}, {:.1} steps/s",
                self.len(),
                self.current_integrator(),
                rate
            ),
            None => format!("{} bodies, {}", self.len(), self.current_integrator()),
        }
    }

    /// Consume the simulation, returning the current state
    pub fn into_state(self) -> BodyState {
        BodyState::from_matching(self.positions.into_front(), self.velocities)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integration::SequentialIntegrator;

    fn small_sim(integrators: Vec<Box<dyn Integrator>>) -> Simulation {
        Simulation::new(SimulationConfig::new(40), BodyDistribution::Uniform, integrators).unwrap()
    }

    #[test]
    fn test_empty_queue_is_rejected() {
        let result = Simulation::new(SimulationConfig::new(8), BodyDistribution::Uniform, Vec::new());
        assert!(matches!(result, Err(SimulationError::EmptyIntegratorQueue)));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = SimulationConfig::new(8).with_damping(1.5);
        let result = Simulation::new(config, BodyDistribution::Uniform, Simulation::standard_integrators());
        assert!(matches!(result, Err(SimulationError::InvalidConfig(_))));
    }

    #[test]
    fn test_advance_matches_batch_integration() {
        let config = SimulationConfig::new(40);
        let mut expected = initialize(BodyDistribution::Uniform, &config);
        SequentialIntegrator::new()
            .integrate(&mut expected, &config.step_parameters(), 4)
            .unwrap();

        let mut sim = small_sim(vec![Box::new(TiledIntegrator::new(16))]);
        sim.advance_by(4).unwrap();

        assert_eq!(sim.steps(), 4);
        assert_eq!(sim.into_state(), expected);
    }

    #[test]
    fn test_switch_rotates_queue() {
        let mut sim = small_sim(vec![
            Box::new(TiledIntegrator::new(8)),
            Box::new(SequentialIntegrator::new()),
            Box::new(TiledIntegrator::new(32)),
        ]);

        assert_eq!(sim.current_integrator(), "tiled(8)");
        assert_eq!(sim.switch_integrator(), "sequential");
        assert_eq!(sim.switch_integrator(), "tiled(32)");
        assert_eq!(sim.switch_integrator(), "tiled(8)");
    }

    #[test]
    fn test_standard_rotation() {
        let names: Vec<String> = Simulation::standard_integrators()
            .iter()
            .map(|integrator| integrator.name().to_string())
            .collect();
        assert_eq!(names, ["tiled(256)", "tiled(64)", "tiled(128)", "tiled(512)"]);
    }

    #[test]
    fn test_throughput_window() {
        let mut sim = Simulation::new(
            SimulationConfig::new(4),
            BodyDistribution::Uniform,
            vec![Box::new(SequentialIntegrator::new())],
        )
        .unwrap();

        sim.advance_by(FPS_WINDOW as usize - 1).unwrap();
        assert!(sim.throughput().is_none());
        sim.advance().unwrap();
        assert!(sim.throughput().unwrap() > 0.0);
        assert!(sim.description().contains("steps/s"));

        sim.switch_integrator();
        assert!(sim.throughput().is_none());
    }

    #[test]
    fn test_position_bytes_view_front_buffer() {
        let mut sim = small_sim(vec![Box::new(SequentialIntegrator::new())]);
        sim.advance().unwrap();

        let floats: &[f32] = bytemuck::cast_slice(sim.position_bytes());
        assert_eq!(floats.len(), 4 * sim.len());
        assert_eq!(floats[4], sim.positions()[1].x());
        assert_eq!(floats[7], sim.positions()[1].w());
    }

    #[test]
    fn test_empty_simulation_advances() {
        let mut sim = Simulation::new(
            SimulationConfig::new(0),
            BodyDistribution::TwoClusters,
            Simulation::standard_integrators(),
        )
        .unwrap();
        sim.advance_by(3).unwrap();
        assert!(sim.is_empty());
        assert!(sim.positions().is_empty());
    }
}
