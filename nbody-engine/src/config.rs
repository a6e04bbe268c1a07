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
//! Run configuration
//!
//! A [`SimulationConfig`] is fixed for the lifetime of a run. Integrators only
//! need the per-step subset, [`StepParameters`].

use crate::error::SimulationError;

/// Number of bodies above which the cluster scale starts growing
const SCALE_REFERENCE_BODIES: f32 = 1024.0;

/// Parameters consumed by a single integration step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepParameters {
    /// Timestep
    pub delta_time: f32,
    /// Softening constant ε², added to every squared distance
    pub softening_squared: f32,
    /// Multiplicative velocity decay applied once per step
    pub damping: f32,
}

impl Default for StepParameters {
    fn default() -> Self {
        SimulationConfig::default().step_parameters()
    }
}

/// Configuration for one simulation run
///
/// # Examples
///
/// ```
/// use nbody_engine::config::SimulationConfig;
///
/// let config = SimulationConfig::new(4096).with_steps(10);
/// assert!(config.validate().is_ok());
/// assert_eq!(config.pscale(), 4.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    /// Spread of initial positions before scaling by body count
    pub cluster_scale: f32,
    /// Spread of initial velocities relative to the position scale
    pub velocity_scale: f32,
    /// Number of bodies
    pub num_bodies: usize,
    /// Timestep
    pub delta_time: f32,
    /// Softening constant ε²
    pub softening_squared: f32,
    /// Multiplicative velocity decay per step, in `(0, 1]`
    pub damping: f32,
    /// Number of steps in a batch
    pub steps: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            cluster_scale: 1.0,
            velocity_scale: 1.0,
            num_bodies: 256 * 64,
            delta_time: 0.001,
            softening_squared: 0.00125,
            damping: 0.9995,
            steps: 1,
        }
    }
}

impl SimulationConfig {
    /// Create a configuration with default physics for `num_bodies` bodies
    pub fn new(num_bodies: usize) -> Self {
        SimulationConfig {
            num_bodies,
            ..SimulationConfig::default()
        }
    }

    /// Set the cluster and velocity scales
    pub fn with_scales(mut self, cluster_scale: f32, velocity_scale: f32) -> Self {
        self.cluster_scale = cluster_scale;
        self.velocity_scale = velocity_scale;
        self
    }

    /// Set the timestep
    pub fn with_delta_time(mut self, delta_time: f32) -> Self {
        self.delta_time = delta_time;
        self
    }

    /// Set the softening constant ε²
    pub fn with_softening_squared(mut self, softening_squared: f32) -> Self {
        self.softening_squared = softening_squared;
        self
    }

    /// Set the damping factor
    pub fn with_damping(mut self, damping: f32) -> Self {
        self.damping = damping;
        self
    }

    /// Set the number of steps in a batch
    pub fn with_steps(mut self, steps: usize) -> Self {
        self.steps = steps;
        self
    }

    /// Position scale: `cluster_scale * max(1, num_bodies / 1024)`
    pub fn pscale(&self) -> f32 {
        self.cluster_scale * (self.num_bodies as f32 / SCALE_REFERENCE_BODIES).max(1.0)
    }

    /// Velocity scale: `velocity_scale * pscale`
    pub fn vscale(&self) -> f32 {
        self.velocity_scale * self.pscale()
    }

    /// The per-step subset of this configuration
    pub fn step_parameters(&self) -> StepParameters {
        StepParameters {
            delta_time: self.delta_time,
            softening_squared: self.softening_squared,
            damping: self.damping,
        }
    }

    /// Check that every value is in range
    ///
    /// The softening constant must be strictly positive: with ε² = 0 the
    /// self-interaction term of the force sum is `0 · ∞` and every body ends
    /// up with a NaN acceleration.
    pub fn validate(&self) -> Result<(), SimulationError> {
        if !(self.delta_time > 0.0 && self.delta_time.is_finite()) {
            return Err(SimulationError::InvalidConfig(format!(
                "delta_time must be positive and finite, got {}",
                self.delta_time
            )));
        }
        if !(self.softening_squared > 0.0 && self.softening_squared.is_finite()) {
            return Err(SimulationError::InvalidConfig(format!(
                "softening_squared must be positive and finite, got {}",
                self.softening_squared
            )));
        }
        if !(self.damping > 0.0 && self.damping <= 1.0) {
            return Err(SimulationError::InvalidConfig(format!(
                "damping must be in (0, 1], got {}",
                self.damping
            )));
        }
        if !(self.cluster_scale > 0.0 && self.cluster_scale.is_finite()) {
            return Err(SimulationError::InvalidConfig(format!(
                "cluster_scale must be positive and finite, got {}",
                self.cluster_scale
            )));
        }
        if !(self.velocity_scale >= 0.0 && self.velocity_scale.is_finite()) {
            return Err(SimulationError::InvalidConfig(format!(
                "velocity_scale must be non-negative and finite, got {}",
                self.velocity_scale
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SimulationConfig::default();
        assert_eq!(config.num_bodies, 16384);
        assert_eq!(config.delta_time, 0.001);
        assert_eq!(config.softening_squared, 0.00125);
        assert_eq!(config.damping, 0.9995);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_scales_small_system() {
        let config = SimulationConfig::new(100).with_scales(2.0, 0.5);
        assert_eq!(config.pscale(), 2.0);
        assert_eq!(config.vscale(), 1.0);
    }

    #[test]
    fn test_scales_grow_with_body_count() {
        let config = SimulationConfig::new(256 * 56);
        assert_eq!(config.pscale(), 14.0);
        assert_eq!(config.vscale(), 14.0);
    }

    #[test]
    fn test_zero_bodies_scale() {
        let config = SimulationConfig::new(0);
        assert_eq!(config.pscale(), 1.0);
    }

    #[test]
    fn test_step_parameters() {
        let params = SimulationConfig::new(10)
            .with_delta_time(0.01)
            .with_softening_squared(0.5)
            .with_damping(1.0)
            .step_parameters();
        assert_eq!(
            params,
            StepParameters { delta_time: 0.01, softening_squared: 0.5, damping: 1.0 }
        );
    }

    #[test]
    fn test_zero_softening_rejected() {
        let config = SimulationConfig::new(10).with_softening_squared(0.0);
        assert!(matches!(config.validate(), Err(SimulationError::InvalidConfig(_))));
    }

    #[test]
    fn test_invalid_timestep_rejected() {
        assert!(SimulationConfig::new(10).with_delta_time(0.0).validate().is_err());
        assert!(SimulationConfig::new(10).with_delta_time(f32::NAN).validate().is_err());
        assert!(SimulationConfig::new(10).with_delta_time(f32::INFINITY).validate().is_err());
    }

    #[test]
    fn test_damping_range() {
        assert!(SimulationConfig::new(10).with_damping(1.5).validate().is_err());
        assert!(SimulationConfig::new(10).with_damping(0.0).validate().is_err());
        assert!(SimulationConfig::new(10).with_damping(1.0).validate().is_ok());
    }
}
