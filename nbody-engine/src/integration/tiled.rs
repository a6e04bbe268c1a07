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
//! Tiled block integrator
//!
//! Bodies are split into `ceil(N / B)` blocks of `B` lanes. Lane `k` of block
//! `b` owns body `b·B + k` when that index exists. Every block walks the same
//! sequence of tiles over the source bodies:
//!
//! ```text
//! for tile t in 0..ceil(N / B):
//!     load:     lane k stages body t·B + k into the block's tile (if it exists)
//!     barrier   -- the tile is complete before anyone reads it
//!     compute:  every active lane folds the resident slots into its accumulator
//!     barrier   -- everyone is done with the tile before it is overwritten
//! update every active lane's body
//! ```
//!
//! Resident slots are consumed in ascending order and tiles in ascending
//! order, so each body sums its sources in exactly the order of the
//! sequential integrator and the results are bitwise identical.
//!
//! # Schedules
//!
//! - [`Schedule::Lockstep`]: the lanes of a block run phase by phase on one
//!   task, which realizes both barriers as phase boundaries. Blocks run as
//!   independent rayon tasks when the `parallel` feature is enabled.
//! - [`Schedule::Threaded`]: every lane is an OS thread; the tile is shared
//!   through atomics and the barriers are real [`std::sync::Barrier`]s.
//!   Blocks run one after another so at most `min(B, N)` threads exist at
//!   once. A lane that cannot be spawned fails the step with
//!   [`SimulationError::AllocationFailed`] before any lane starts.

use std::ops::Range;
use std::sync::{Barrier, Condvar, Mutex};
use std::thread;

use log::{trace, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::body::{Acceleration, Position, Velocity};
use crate::config::StepParameters;
use crate::error::SimulationError;
use crate::interaction::{accumulate, body_body_interaction};
use crate::pool::{PoolConfig, PoolStats, VecPool};
use super::shared_tile::SharedTile;
use super::{advance_body, Integrator, StepBuffers};

/// Default number of lanes per block
pub const DEFAULT_BLOCK_SIZE: usize = 256;

/// Maximum number of scratch buffers retained per pool
const MAX_POOLED_TILES: usize = 64;

/// Integer division rounding up
///
/// # Panics
///
/// Panics if `denominator` is zero
///
/// # Example
///
/// ```
/// use nbody_engine::integration::div_up;
///
/// assert_eq!(div_up(300, 256), 2);
/// assert_eq!(div_up(512, 256), 2);
/// assert_eq!(div_up(0, 256), 0);
/// ```
#[inline]
pub fn div_up(numerator: usize, denominator: usize) -> usize {
    numerator.div_ceil(denominator)
}

/// How the lanes of a block are executed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Schedule {
    /// Lanes advance phase by phase on a single task per block
    #[default]
    Lockstep,
    /// One OS thread per lane, synchronized by a barrier
    Threaded,
}

/// Geometry of one step
#[derive(Debug, Clone, Copy)]
struct Launch {
    num_bodies: usize,
    block_size: usize,
    num_tiles: usize,
}

impl Launch {
    fn new(num_bodies: usize, block_size: usize) -> Self {
        Launch {
            num_bodies,
            block_size,
            num_tiles: div_up(num_bodies, block_size),
        }
    }

    /// Largest number of bodies any tile holds: `min(B, N)`
    fn resident_capacity(&self) -> usize {
        self.block_size.min(self.num_bodies)
    }

    /// Source bodies resident in `tile`; shorter than `block_size` for the last tile
    fn tile_range(&self, tile: usize) -> Range<usize> {
        let start = tile * self.block_size;
        start..(start + self.block_size).min(self.num_bodies)
    }
}

/// Block-tiled integrator
///
/// # Example
///
/// ```
/// use nbody_engine::integration::{Integrator, Schedule, TiledIntegrator};
///
/// let integrator = TiledIntegrator::new(128);
/// assert_eq!(integrator.name(), "tiled(128)");
/// assert_eq!(integrator.num_blocks(300), 3);
///
/// let threaded = TiledIntegrator::with_schedule(64, Schedule::Threaded);
/// assert_eq!(threaded.name(), "tiled-threaded(64)");
/// ```
pub struct TiledIntegrator {
    block_size: usize,
    schedule: Schedule,
    name: String,
    tiles: VecPool<Position>,
    accelerations: VecPool<Acceleration>,
}

impl TiledIntegrator {
    /// Create a lockstep tiled integrator with `block_size` lanes per block
    ///
    /// # Panics
    ///
    /// Panics if `block_size` is zero
    pub fn new(block_size: usize) -> Self {
        Self::with_schedule(block_size, Schedule::Lockstep)
    }

    /// Create a tiled integrator with an explicit lane schedule
    ///
    /// # Panics
    ///
    /// Panics if `block_size` is zero
    pub fn with_schedule(block_size: usize, schedule: Schedule) -> Self {
        assert!(block_size > 0, "Block size must be positive");

        let name = match schedule {
            Schedule::Lockstep => format!("tiled({})", block_size),
            Schedule::Threaded => format!("tiled-threaded({})", block_size),
        };
        // Tiles never exceed the body count, so huge block sizes must not preallocate
        let pool_config = PoolConfig::new(block_size.min(DEFAULT_BLOCK_SIZE), MAX_POOLED_TILES);

        TiledIntegrator {
            block_size,
            schedule,
            name,
            tiles: VecPool::with_config(pool_config.clone()),
            accelerations: VecPool::with_config(pool_config),
        }
    }

    /// Lanes per block
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Lane schedule
    pub fn schedule(&self) -> Schedule {
        self.schedule
    }

    /// Number of blocks (and tiles) needed for `num_bodies` bodies
    pub fn num_blocks(&self, num_bodies: usize) -> usize {
        div_up(num_bodies, self.block_size)
    }

    /// Statistics of the tile scratch pool
    pub fn pool_stats(&self) -> PoolStats {
        self.tiles.stats()
    }

    #[cfg(feature = "parallel")]
    fn step_lockstep(
        &self,
        launch: Launch,
        old_positions: &[Position],
        new_positions: &mut [Position],
        velocities: &mut [Velocity],
        params: &StepParameters,
    ) {
        let tiles = &self.tiles;
        let accelerations = &self.accelerations;

        new_positions
            .par_chunks_mut(launch.block_size)
            .zip(velocities.par_chunks_mut(launch.block_size))
            .enumerate()
            .for_each(|(block, (out, velocities))| {
                let mut tile = tiles.acquire(launch.resident_capacity());
                let mut accels = accelerations.acquire(out.len());
                run_block_lockstep(launch, block, old_positions, out, velocities, &mut tile, &mut accels, params);
            });
    }

    #[cfg(not(feature = "parallel"))]
    fn step_lockstep(
        &self,
        launch: Launch,
        old_positions: &[Position],
        new_positions: &mut [Position],
        velocities: &mut [Velocity],
        params: &StepParameters,
    ) {
        for (block, (out, velocities)) in new_positions
            .chunks_mut(launch.block_size)
            .zip(velocities.chunks_mut(launch.block_size))
            .enumerate()
        {
            let mut tile = self.tiles.acquire(launch.resident_capacity());
            let mut accels = self.accelerations.acquire(out.len());
            run_block_lockstep(launch, block, old_positions, out, velocities, &mut tile, &mut accels, params);
        }
    }
}

impl Integrator for TiledIntegrator {
    fn name(&self) -> &str {
        &self.name
    }

    fn step(&mut self, buffers: StepBuffers<'_>, params: &StepParameters) -> Result<(), SimulationError> {
        let (old_positions, new_positions, velocities) = buffers.into_parts();
        if old_positions.is_empty() {
            return Ok(());
        }

        let launch = Launch::new(old_positions.len(), self.block_size);
        trace!(
            "{}: {} bodies in {} blocks",
            self.name,
            launch.num_bodies,
            launch.num_tiles
        );

        match self.schedule {
            Schedule::Lockstep => {
                self.step_lockstep(launch, old_positions, new_positions, velocities, params)
            }
            Schedule::Threaded => {
                for (block, (out, velocities)) in new_positions
                    .chunks_mut(launch.block_size)
                    .zip(velocities.chunks_mut(launch.block_size))
                    .enumerate()
                {
                    run_block_threaded(launch, block, old_positions, out, velocities, params)?;
                }
            }
        }

        Ok(())
    }
}

/// Run one block with its lanes in lockstep
///
/// `out` and `velocities` hold the block's active lanes only; `tile` has
/// `min(B, N)` slots and `accels` one entry per active lane.
#[allow(clippy::too_many_arguments)]
fn run_block_lockstep(
    launch: Launch,
    block: usize,
    old_positions: &[Position],
    out: &mut [Position],
    velocities: &mut [Velocity],
    tile: &mut [Position],
    accels: &mut [Acceleration],
    params: &StepParameters,
) {
    let base = block * launch.block_size;
    let targets = &old_positions[base..base + out.len()];
    accels.fill(Acceleration::zero());

    for t in 0..launch.num_tiles {
        let sources = launch.tile_range(t);
        let resident = sources.len();

        // Load phase: every lane with an in-range source stages it, including
        // lanes of a partial block that own no body themselves
        tile[..resident].copy_from_slice(&old_positions[sources]);

        // Compute phase
        for (acc, &target) in accels.iter_mut().zip(targets) {
            *acc = accumulate(params.softening_squared, *acc, target, &tile[..resident]);
        }
    }

    for (((out, &position), velocity), &acc) in out
        .iter_mut()
        .zip(targets)
        .zip(velocities.iter_mut())
        .zip(accels.iter())
    {
        let (new_position, new_velocity) = advance_body(position, *velocity, acc, params);
        *out = new_position;
        *velocity = new_velocity;
    }
}

/// Whether the lanes of a block may start
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GateState {
    Closed,
    Open,
    Cancelled,
}

/// One-shot gate that holds lane threads until every lane has been spawned
///
/// Lanes must not reach the first barrier before the whole block exists,
/// otherwise a failed spawn would leave them waiting forever.
#[derive(Debug)]
struct StartGate {
    state: Mutex<GateState>,
    changed: Condvar,
}

impl StartGate {
    fn new() -> Self {
        StartGate {
            state: Mutex::new(GateState::Closed),
            changed: Condvar::new(),
        }
    }

    fn release(&self, state: GateState) {
        let mut current = self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *current = state;
        self.changed.notify_all();
    }

    /// Block until released; returns `true` if the lane should run
    fn wait(&self) -> bool {
        let mut state = self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        while *state == GateState::Closed {
            state = self
                .changed
                .wait(state)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
        }
        *state == GateState::Open
    }
}

/// Run one block with a thread per lane
///
/// Only `min(B, N)` lanes are spawned: a lane at or past that index can
/// neither own a body nor hold a resident slot of any tile.
fn run_block_threaded(
    launch: Launch,
    block: usize,
    old_positions: &[Position],
    out: &mut [Position],
    velocities: &mut [Velocity],
    params: &StepParameters,
) -> Result<(), SimulationError> {
    let base = block * launch.block_size;
    let lanes = launch.resident_capacity();
    let tile = SharedTile::new(lanes);
    let barrier = Barrier::new(lanes);
    let gate = StartGate::new();
    let mut bodies = out.iter_mut().zip(velocities.iter_mut());

    thread::scope(|scope| {
        for lane in 0..lanes {
            let body = bodies.next();
            let tile = &tile;
            let barrier = &barrier;
            let gate = &gate;
            let spawned = thread::Builder::new().spawn_scoped(scope, move || {
                if gate.wait() {
                    run_lane(launch, base, lane, old_positions, body, tile, barrier, params);
                }
            });

            if let Err(err) = spawned {
                warn!("Failed to spawn lane {} of {}: {}", lane, lanes, err);
                gate.release(GateState::Cancelled);
                return Err(SimulationError::AllocationFailed {
                    bodies: launch.num_bodies,
                });
            }
        }

        gate.release(GateState::Open);
        Ok(())
    })
}

/// Body of one lane thread
///
/// `body` is `None` for lanes of a partial final block that own no body;
/// such lanes still load their share of each tile and wait at every barrier.
#[allow(clippy::too_many_arguments)]
fn run_lane(
    launch: Launch,
    base: usize,
    lane: usize,
    old_positions: &[Position],
    body: Option<(&mut Position, &mut Velocity)>,
    tile: &SharedTile,
    barrier: &Barrier,
    params: &StepParameters,
) {
    let target = body.as_ref().map(|_| old_positions[base + lane]);
    let mut acc = Acceleration::zero();

    for t in 0..launch.num_tiles {
        let sources = launch.tile_range(t);
        let resident = sources.len();

        if lane < resident {
            tile.store(lane, old_positions[sources.start + lane]);
        }
        barrier.wait();

        if let Some(target) = target {
            for slot in 0..resident {
                acc = body_body_interaction(params.softening_squared, acc, target, tile.load(slot));
            }
        }
        barrier.wait();
    }

    if let Some((out, velocity)) = body {
        let (new_position, new_velocity) = advance_body(old_positions[base + lane], *velocity, acc, params);
        *out = new_position;
        *velocity = new_velocity;
    }
}
