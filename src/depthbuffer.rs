use crate::error::RenderError;
use rayon::prelude::*;
use std::sync::atomic::{AtomicU32, Ordering};

/// Depth value meaning "nothing drawn yet" (the far plane).
pub const DEPTH_CLEAR_VALUE: f32 = 1.0;

// Below this many cells a parallel clear costs more than it saves
const PARALLEL_CLEAR_MIN_LEN: usize = 16 * 1024;

/// Per-pixel depth shared by every rasterizer thread of a frame.
///
/// Each cell is an `f32` stored as its bit pattern in an `AtomicU32` and accessed with
/// relaxed ordering. Reading a depth and later writing a new one are two separate atomic
/// operations, so two threads can both pass a depth test against the same stale value.
/// That race is accepted: the buffer ends up holding one of the written depths and the
/// colour buffer may show the other triangle.
pub struct DepthBuffer {
    width: usize,
    height: usize,
    cells: Vec<AtomicU32>,
}

impl DepthBuffer {
    pub fn new(width: usize, height: usize) -> Result<Self, RenderError> {
        let len = width
            .checked_mul(height)
            .ok_or(RenderError::Allocation {
                what: "depth buffer",
                cells: usize::MAX,
            })?;
        let mut cells = Vec::new();
        cells
            .try_reserve_exact(len)
            .map_err(|_| RenderError::Allocation {
                what: "depth buffer",
                cells: len,
            })?;
        cells.extend((0..len).map(|_| AtomicU32::new(DEPTH_CLEAR_VALUE.to_bits())));
        Ok(Self {
            width,
            height,
            cells,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Resets every cell to the far plane. Must happen before the frame's rasterizer threads start.
    pub fn clear(&self) {
        let bits = DEPTH_CLEAR_VALUE.to_bits();
        self.cells
            .par_iter()
            .with_min_len(PARALLEL_CLEAR_MIN_LEN)
            .for_each(|cell| cell.store(bits, Ordering::Relaxed));
    }

    #[inline]
    pub fn get(&self, index: usize) -> f32 {
        f32::from_bits(self.cells[index].load(Ordering::Relaxed))
    }

    #[inline]
    pub fn set(&self, index: usize, value: f32) {
        self.cells[index].store(value.to_bits(), Ordering::Relaxed);
    }
}
