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
//! Ping-pong position buffers
//!
//! A step reads every position while it writes new ones, so it must never
//! write into the buffer it reads. [`PositionBuffers`] holds two named
//! buffers: the *front* buffer is the current, complete snapshot and the
//! *back* buffer receives the next step. [`PositionBuffers::swap`] exchanges
//! the roles once a step has fully completed.

use crate::body::{try_zeroed_buffer, Position};
use crate::error::SimulationError;

/// Two position buffers with alternating read/write roles
#[derive(Debug, Clone)]
pub struct PositionBuffers {
    front: Vec<Position>,
    back: Vec<Position>,
    swaps: u64,
}

impl PositionBuffers {
    /// Wrap `initial` as the front buffer and allocate a matching back buffer
    pub fn new(initial: Vec<Position>) -> Result<Self, SimulationError> {
        let back = try_zeroed_buffer(initial.len())?;
        Ok(PositionBuffers {
            front: initial,
            back,
            swaps: 0,
        })
    }

    /// Number of positions in each buffer
    pub fn len(&self) -> usize {
        self.front.len()
    }

    /// Check if the buffers hold no positions
    pub fn is_empty(&self) -> bool {
        self.front.is_empty()
    }

    /// The current snapshot
    pub fn front(&self) -> &[Position] {
        &self.front
    }

    /// Borrow the front buffer for reading and the back buffer for writing
    pub fn split(&mut self) -> (&[Position], &mut [Position]) {
        (&self.front, &mut self.back)
    }

    /// Exchange the roles of the two buffers
    pub fn swap(&mut self) {
        std::mem::swap(&mut self.front, &mut self.back);
        self.swaps += 1;
    }

    /// Number of role swaps so far
    pub fn swaps(&self) -> u64 {
        self.swaps
    }

    /// Consume the buffers, returning the current snapshot
    pub fn into_front(self) -> Vec<Position> {
        self.front
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn positions(n: usize) -> Vec<Position> {
        (0..n).map(|i| Position::new(i as f32, 0.0, 0.0, 1.0)).collect()
    }

    #[test]
    fn test_new_keeps_front() {
        let buffers = PositionBuffers::new(positions(3)).unwrap();
        assert_eq!(buffers.len(), 3);
        assert_eq!(buffers.front()[2].x(), 2.0);
        assert_eq!(buffers.swaps(), 0);
    }

    #[test]
    fn test_swap_exchanges_roles() {
        let mut buffers = PositionBuffers::new(positions(2)).unwrap();
        {
            let (read, write) = buffers.split();
            for (out, p) in write.iter_mut().zip(read) {
                *out = Position::new(p.x() + 10.0, 0.0, 0.0, 1.0);
            }
        }
        // Not visible before the swap
        assert_eq!(buffers.front()[0].x(), 0.0);

        buffers.swap();
        assert_eq!(buffers.front()[0].x(), 10.0);
        assert_eq!(buffers.front()[1].x(), 11.0);
        assert_eq!(buffers.swaps(), 1);

        let (read, write) = buffers.split();
        assert_eq!(read[0].x(), 10.0);
        assert_eq!(write[0].x(), 0.0);
    }

    #[test]
    fn test_buffers_never_alias() {
        let mut buffers = PositionBuffers::new(positions(4)).unwrap();
        for _ in 0..3 {
            let (read, write) = buffers.split();
            assert_ne!(read.as_ptr(), write.as_ptr());
            buffers.swap();
        }
    }

    #[test]
    fn test_empty_buffers() {
        let mut buffers = PositionBuffers::new(Vec::new()).unwrap();
        assert!(buffers.is_empty());
        buffers.swap();
        assert!(buffers.into_front().is_empty());
    }
}
