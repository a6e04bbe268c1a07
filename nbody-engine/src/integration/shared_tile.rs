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
//! Block-shared tile storage for threaded lanes
//!
//! Every lane of a block writes one slot and then reads all of them, so the
//! slots must be shareable across threads without locking. Each component is
//! stored as the bit pattern of its `f32` in an `AtomicU32`. Relaxed ordering
//! is sufficient because lanes only touch the tile between barrier waits, and
//! the barrier establishes the happens-before edge.

use crate::body::Position;
use std::sync::atomic::{AtomicU32, Ordering};

/// Fixed-size array of positions shared by the lanes of one block
#[derive(Debug)]
pub struct SharedTile {
    slots: Vec<[AtomicU32; 4]>,
}

impl SharedTile {
    /// Create a tile with `len` zeroed slots
    pub fn new(len: usize) -> Self {
        SharedTile {
            slots: (0..len).map(|_| Default::default()).collect(),
        }
    }

    /// Number of slots
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Check if the tile has no slots
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Write a position into `slot`
    ///
    /// # Panics
    ///
    /// Panics if `slot` is out of range
    pub fn store(&self, slot: usize, position: Position) {
        for (cell, value) in self.slots[slot].iter().zip(position.as_array()) {
            cell.store(value.to_bits(), Ordering::Relaxed);
        }
    }

    /// Read the position held in `slot`
    ///
    /// # Panics
    ///
    /// Panics if `slot` is out of range
    pub fn load(&self, slot: usize) -> Position {
        let cells = &self.slots[slot];
        Position::from_array([
            f32::from_bits(cells[0].load(Ordering::Relaxed)),
            f32::from_bits(cells[1].load(Ordering::Relaxed)),
            f32::from_bits(cells[2].load(Ordering::Relaxed)),
            f32::from_bits(cells[3].load(Ordering::Relaxed)),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_load_preserves_bits() {
        let tile = SharedTile::new(2);
        let p = Position::new(-0.0, f32::MIN_POSITIVE, 1.0e30, 0.65);
        tile.store(1, p);

        let loaded = tile.load(1);
        assert_eq!(loaded.x().to_bits(), (-0.0f32).to_bits());
        assert_eq!(loaded, p);
        assert_eq!(tile.load(0), Position::default());
    }

    #[test]
    fn test_lanes_share_slots() {
        let tile = SharedTile::new(4);
        let barrier = std::sync::Barrier::new(4);

        std::thread::scope(|scope| {
            for lane in 0..4 {
                let tile = &tile;
                let barrier = &barrier;
                scope.spawn(move || {
                    tile.store(lane, Position::new(lane as f32, 0.0, 0.0, 1.0));
                    barrier.wait();
                    let sum: f32 = (0..4).map(|slot| tile.load(slot).x()).sum();
                    assert_eq!(sum, 6.0);
                });
            }
        });
    }

    #[test]
    #[should_panic]
    fn test_out_of_range_slot_panics() {
        let tile = SharedTile::new(1);
        tile.load(1);
    }
}
