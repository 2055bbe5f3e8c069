//! Draw Statistics
//!
//! [`DrawStats`] is the counter pair accumulated for every tracked
//! depth-stencil resource and for the frame as a whole.

use std::ops::{Add, AddAssign};

/// Number of vertices and draw calls issued within a tracking window.
///
/// Combined by plain addition; both fields only grow until the owning
/// window is reset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct DrawStats {
    pub vertices: u64,
    pub drawcalls: u64,
}

impl DrawStats {
    /// No draws recorded.
    pub const ZERO: Self = Self {
        vertices: 0,
        drawcalls: 0,
    };

    #[inline]
    #[must_use]
    pub const fn new(vertices: u64, drawcalls: u64) -> Self {
        Self {
            vertices,
            drawcalls,
        }
    }

    /// Stats for a single draw call of `vertices` vertices.
    #[inline]
    #[must_use]
    pub const fn single(vertices: u64) -> Self {
        Self::new(vertices, 1)
    }

    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.drawcalls == 0
    }

    /// Returns the counter used to rank workloads.
    ///
    /// Indirect draws report zero vertices, so once any have been seen the
    /// draw-call count is the only meaningful measure.
    #[inline]
    #[must_use]
    pub const fn weight(&self, indirect: bool) -> u64 {
        if indirect {
            self.drawcalls
        } else {
            self.vertices
        }
    }
}

impl Add for DrawStats {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            vertices: self.vertices.saturating_add(rhs.vertices),
            drawcalls: self.drawcalls.saturating_add(rhs.drawcalls),
        }
    }
}

impl AddAssign for DrawStats {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}
