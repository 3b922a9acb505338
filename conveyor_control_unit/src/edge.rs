//! Rising-edge detection.

/// One-cycle pulse on a false → true transition.
#[inline]
pub const fn rising(current: bool, previous: bool) -> bool {
    current && !previous
}

/// Rising-edge detector that keeps the previous level itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct RisingEdge {
    previous: bool,
}

impl RisingEdge {
    pub const fn new() -> Self {
        Self { previous: false }
    }

    /// Sample the level for this cycle; returns the edge pulse.
    #[inline]
    pub fn update(&mut self, current: bool) -> bool {
        let edge = rising(current, self.previous);
        self.previous = current;
        edge
    }

    /// Level seen on the previous cycle.
    #[inline]
    pub const fn previous(&self) -> bool {
        self.previous
    }
}
