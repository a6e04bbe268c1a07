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
//! Cross-integrator equivalence and performance checks
//!
//! [`EquivalenceHarness::compare`] runs two integrators side by side from the
//! same initial state. Before every step the actual state is reset to the
//! expected one, so each comparison measures the error of a single step and
//! drift does not compound. Every out-of-tolerance component is recorded in
//! the returned [`EquivalenceReport`].
//!
//! # Example
//!
//! ```
//! use nbody_engine::harness::EquivalenceHarness;
//! use nbody_engine::initializer::BodyDistribution;
//! use nbody_engine::integration::{SequentialIntegrator, TiledIntegrator};
//!
//! let harness = EquivalenceHarness::new();
//! let report = harness
//!     .compare(
//!         BodyDistribution::Uniform,
//!         &mut SequentialIntegrator::new(),
//!         &mut TiledIntegrator::new(32),
//!         100,
//!     )
//!     .unwrap();
//! report.assert_equivalent();
//! ```

use std::fmt;
use std::time::{Duration, Instant};

use log::{info, warn};

use crate::body::Position;
use crate::config::SimulationConfig;
use crate::error::SimulationError;
use crate::initializer::{initialize, BodyDistribution};
use crate::integration::Integrator;

/// Default number of compared steps
pub const DEFAULT_COMPARE_STEPS: usize = 5;

/// Default number of timed steps
pub const DEFAULT_MEASURE_STEPS: usize = 10;

/// Default absolute tolerance per component
pub const DEFAULT_TOLERANCE: f32 = 1e-5;

/// Distributions checked by [`EquivalenceHarness::compare_standard`]
pub const STANDARD_DISTRIBUTIONS: [BodyDistribution; 2] =
    [BodyDistribution::Uniform, BodyDistribution::TwoClustersVaryingMass];

/// Position component
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Component {
    /// x coordinate
    X,
    /// y coordinate
    Y,
    /// z coordinate
    Z,
    /// Fourth component (source mass)
    W,
}

impl Component {
    /// All components in storage order
    pub const ALL: [Component; 4] = [Component::X, Component::Y, Component::Z, Component::W];

    fn of(self, position: &Position) -> f32 {
        match self {
            Component::X => position.x(),
            Component::Y => position.y(),
            Component::Z => position.z(),
            Component::W => position.w(),
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Component::X => "x",
            Component::Y => "y",
            Component::Z => "z",
            Component::W => "w",
        };
        f.write_str(name)
    }
}

/// One out-of-tolerance component
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mismatch {
    /// Step index, starting at 0
    pub step: usize,
    /// Body index
    pub body: usize,
    /// Which component differs
    pub component: Component,
    /// Value produced by the expected integrator
    pub expected: f32,
    /// Value produced by the actual integrator
    pub actual: f32,
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "step {}: body {} {} expected {} got {}",
            self.step, self.body, self.component, self.expected, self.actual
        )
    }
}

/// Outcome of comparing two integrators
#[derive(Debug, Clone)]
pub struct EquivalenceReport {
    /// Initial distribution
    pub distribution: BodyDistribution,
    /// Name of the reference integrator
    pub expected: String,
    /// Name of the integrator under test
    pub actual: String,
    /// Number of bodies
    pub num_bodies: usize,
    /// Number of compared steps
    pub steps: usize,
    /// Absolute tolerance per component
    pub tolerance: f32,
    /// Every out-of-tolerance component, in step then body order
    pub mismatches: Vec<Mismatch>,
}

impl EquivalenceReport {
    /// Check if no component was out of tolerance
    pub fn is_equivalent(&self) -> bool {
        self.mismatches.is_empty()
    }

    /// Largest absolute difference among the mismatches
    pub fn max_deviation(&self) -> Option<f32> {
        self.mismatches
            .iter()
            .map(|m| (m.actual - m.expected).abs())
            .fold(None, |max, d| Some(max.map_or(d, |m: f32| m.max(d))))
    }

    /// Panic with the full mismatch list unless the integrators agree
    ///
    /// # Panics
    ///
    /// Panics if any mismatch was recorded
    pub fn assert_equivalent(&self) {
        assert!(self.is_equivalent(), "{}", self);
    }
}

impl fmt::Display for EquivalenceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} vs {} on {} bodies ({}), {} steps: ",
            self.actual, self.expected, self.num_bodies, self.distribution, self.steps
        )?;
        if self.is_equivalent() {
            return write!(f, "equivalent within {}", self.tolerance);
        }
        write!(f, "{} mismatches beyond {}", self.mismatches.len(), self.tolerance)?;
        for mismatch in &self.mismatches {
            write!(f, "\n  {}", mismatch)?;
        }
        Ok(())
    }
}

/// Timing of one integrator
#[derive(Debug, Clone)]
pub struct PerformanceReport {
    /// Integrator name
    pub integrator: String,
    /// Number of bodies
    pub num_bodies: usize,
    /// Number of timed steps
    pub steps: usize,
    /// Wall-clock time of all steps
    pub elapsed: Duration,
}

impl PerformanceReport {
    /// Pairwise interactions evaluated per second
    pub fn interactions_per_second(&self) -> f64 {
        let interactions = (self.num_bodies as f64).powi(2) * self.steps as f64;
        interactions / self.elapsed.as_secs_f64().max(f64::MIN_POSITIVE)
    }

    /// Steps per second
    pub fn steps_per_second(&self) -> f64 {
        self.steps as f64 / self.elapsed.as_secs_f64().max(f64::MIN_POSITIVE)
    }
}

impl fmt::Display for PerformanceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} bodies, {} steps in {:.3?} ({:.3e} interactions/s)",
            self.integrator,
            self.num_bodies,
            self.steps,
            self.elapsed,
            self.interactions_per_second()
        )
    }
}

/// Runs integrators against each other and against the clock
#[derive(Debug, Clone)]
pub struct EquivalenceHarness {
    config: SimulationConfig,
    compare_steps: usize,
    measure_steps: usize,
    tolerance: f32,
}

impl Default for EquivalenceHarness {
    fn default() -> Self {
        Self::new()
    }
}

impl EquivalenceHarness {
    /// Create a harness with the default physics constants and tolerance
    pub fn new() -> Self {
        EquivalenceHarness {
            config: SimulationConfig::default().with_scales(1.0, 1.0),
            compare_steps: DEFAULT_COMPARE_STEPS,
            measure_steps: DEFAULT_MEASURE_STEPS,
            tolerance: DEFAULT_TOLERANCE,
        }
    }

    /// Use a different physics configuration; its body count is ignored
    pub fn with_config(mut self, config: SimulationConfig) -> Self {
        self.config = config;
        self
    }

    /// Compare over a different number of steps
    pub fn with_compare_steps(mut self, steps: usize) -> Self {
        self.compare_steps = steps;
        self
    }

    /// Time a different number of steps
    pub fn with_measure_steps(mut self, steps: usize) -> Self {
        self.measure_steps = steps;
        self
    }

    /// Use a different absolute tolerance
    ///
    /// # Panics
    ///
    /// Panics if tolerance is negative or NaN
    pub fn with_tolerance(mut self, tolerance: f32) -> Self {
        assert!(tolerance >= 0.0, "Tolerance must be non-negative");
        self.tolerance = tolerance;
        self
    }

    /// Absolute tolerance per component
    pub fn tolerance(&self) -> f32 {
        self.tolerance
    }

    fn config_for(&self, num_bodies: usize) -> Result<SimulationConfig, SimulationError> {
        let mut config = self.config.clone();
        config.num_bodies = num_bodies;
        config.validate()?;
        Ok(config)
    }

    /// Compare `actual` against `expected` on one distribution
    pub fn compare(
        &self,
        distribution: BodyDistribution,
        expected: &mut dyn Integrator,
        actual: &mut dyn Integrator,
        num_bodies: usize,
    ) -> Result<EquivalenceReport, SimulationError> {
        let config = self.config_for(num_bodies)?;
        let params = config.step_parameters();

        info!(
            "Testing {} against {} with {} bodies ({})",
            actual.name(),
            expected.name(),
            num_bodies,
            distribution
        );

        let mut expected_state = initialize(distribution, &config);
        let mut mismatches = Vec::new();

        for step in 0..self.compare_steps {
            let mut actual_state = expected_state.clone();
            expected.integrate(&mut expected_state, &params, 1)?;
            actual.integrate(&mut actual_state, &params, 1)?;

            collect_mismatches(
                step,
                expected_state.positions(),
                actual_state.positions(),
                self.tolerance,
                &mut mismatches,
            );
        }

        let report = EquivalenceReport {
            distribution,
            expected: expected.name().to_string(),
            actual: actual.name().to_string(),
            num_bodies,
            steps: self.compare_steps,
            tolerance: self.tolerance,
            mismatches,
        };

        if report.is_equivalent() {
            info!("{}", report);
        } else {
            warn!("{}", report);
        }
        Ok(report)
    }

    /// Compare on the uniform and the varying-mass two-cluster distributions
    pub fn compare_standard(
        &self,
        expected: &mut dyn Integrator,
        actual: &mut dyn Integrator,
        num_bodies: usize,
    ) -> Result<Vec<EquivalenceReport>, SimulationError> {
        STANDARD_DISTRIBUTIONS
            .iter()
            .map(|&distribution| self.compare(distribution, expected, actual, num_bodies))
            .collect()
    }

    /// Time `integrator` on a uniform system of `num_bodies` bodies
    pub fn measure(
        &self,
        integrator: &mut dyn Integrator,
        num_bodies: usize,
    ) -> Result<PerformanceReport, SimulationError> {
        let config = self.config_for(num_bodies)?;
        let params = config.step_parameters();
        let mut state = initialize(BodyDistribution::Uniform, &config);

        let start = Instant::now();
        integrator.integrate(&mut state, &params, self.measure_steps)?;
        let elapsed = start.elapsed();

        let report = PerformanceReport {
            integrator: integrator.name().to_string(),
            num_bodies,
            steps: self.measure_steps,
            elapsed,
        };
        info!("{}", report);
        Ok(report)
    }
}

fn collect_mismatches(
    step: usize,
    expected: &[Position],
    actual: &[Position],
    tolerance: f32,
    mismatches: &mut Vec<Mismatch>,
) {
    for (body, (e, a)) in expected.iter().zip(actual).enumerate() {
        for component in Component::ALL {
            let expected = component.of(e);
            let actual = component.of(a);
            // NaN on either side fails the comparison
            let within = (actual - expected).abs() <= tolerance;
            if !within {
                mismatches.push(Mismatch {
                    step,
                    body,
                    component,
                    expected,
                    actual,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StepParameters;
    use crate::integration::{SequentialIntegrator, StepBuffers, TiledIntegrator};

    /// Integrator that nudges one body off its reference trajectory
    struct Skewed {
        inner: SequentialIntegrator,
        body: usize,
        offset: f32,
    }

    impl Integrator for Skewed {
        fn name(&self) -> &str {
            "skewed"
        }

        fn step(&mut self, buffers: StepBuffers<'_>, params: &StepParameters) -> Result<(), SimulationError> {
            let (old, new, vel) = buffers.into_parts();
            self.inner.step(StepBuffers::new(old, &mut *new, &mut *vel)?, params)?;
            let p = new[self.body];
            new[self.body] = Position::new(p.x() + self.offset, p.y(), p.z(), p.w());
            Ok(())
        }
    }

    #[test]
    fn test_identical_integrators_are_equivalent() {
        let harness = EquivalenceHarness::new();
        let report = harness
            .compare(
                BodyDistribution::TwoClusters,
                &mut SequentialIntegrator::new(),
                &mut TiledIntegrator::new(8),
                50,
            )
            .unwrap();

        assert!(report.is_equivalent());
        assert_eq!(report.steps, DEFAULT_COMPARE_STEPS);
        assert_eq!(report.max_deviation(), None);
        report.assert_equivalent();
    }

    #[test]
    fn test_every_mismatch_is_reported() {
        let harness = EquivalenceHarness::new();
        let mut skewed = Skewed { inner: SequentialIntegrator::new(), body: 3, offset: 1e-2 };
        let report = harness
            .compare(BodyDistribution::Uniform, &mut SequentialIntegrator::new(), &mut skewed, 10)
            .unwrap();

        // State is resynchronized each step, so each step fails exactly once
        assert_eq!(report.mismatches.len(), DEFAULT_COMPARE_STEPS);
        for (step, mismatch) in report.mismatches.iter().enumerate() {
            assert_eq!(mismatch.step, step);
            assert_eq!(mismatch.body, 3);
            assert_eq!(mismatch.component, Component::X);
        }
        assert!(report.max_deviation().unwrap() > 9e-3);
    }

    #[test]
    #[should_panic(expected = "step 0: body 3 x")]
    fn test_assert_equivalent_lists_mismatches() {
        let harness = EquivalenceHarness::new().with_compare_steps(1);
        let mut skewed = Skewed { inner: SequentialIntegrator::new(), body: 3, offset: 1.0 };
        harness
            .compare(BodyDistribution::Uniform, &mut SequentialIntegrator::new(), &mut skewed, 4)
            .unwrap()
            .assert_equivalent();
    }

    #[test]
    fn test_nan_is_a_mismatch() {
        let expected = [Position::new(0.0, 0.0, 0.0, 1.0)];
        let actual = [Position::new(f32::NAN, 0.0, 0.0, 1.0)];
        let mut mismatches = Vec::new();
        collect_mismatches(0, &expected, &actual, 1e-5, &mut mismatches);
        assert_eq!(mismatches.len(), 1);
    }

    #[test]
    fn test_compare_standard_runs_two_distributions() {
        let harness = EquivalenceHarness::new().with_compare_steps(1);
        let reports = harness
            .compare_standard(&mut SequentialIntegrator::new(), &mut TiledIntegrator::new(4), 9)
            .unwrap();

        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].distribution, BodyDistribution::Uniform);
        assert_eq!(reports[1].distribution, BodyDistribution::TwoClustersVaryingMass);
        assert!(reports.iter().all(EquivalenceReport::is_equivalent));
    }

    #[test]
    fn test_measure_reports_counts() {
        let harness = EquivalenceHarness::new().with_measure_steps(2);
        let report = harness.measure(&mut TiledIntegrator::new(16), 32).unwrap();

        assert_eq!(report.integrator, "tiled(16)");
        assert_eq!(report.num_bodies, 32);
        assert_eq!(report.steps, 2);
        assert!(report.interactions_per_second() > 0.0);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let harness = EquivalenceHarness::new().with_config(SimulationConfig::default().with_softening_squared(0.0));
        let result = harness.measure(&mut SequentialIntegrator::new(), 8);
        assert!(matches!(result, Err(SimulationError::InvalidConfig(_))));
    }
}
