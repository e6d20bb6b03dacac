//! # Lookback Window
//!
//! The bounded range of recent heights re-verified per reconciliation pass.

/// Half-open height range `[starting, ending)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScanWindow {
    /// Lowest height scanned.
    pub starting: u64,
    /// One past the highest height scanned (the peer's tip height).
    pub ending: u64,
}

impl ScanWindow {
    /// Window for a summary reporting `tip_height`, never reaching below the
    /// first height the peer serves.
    ///
    /// `starting = max(start_height, tip_height - depth)`, saturating at 0.
    pub fn new(start_height: u64, tip_height: u64, depth: u64) -> Self {
        let starting = tip_height.saturating_sub(depth).max(start_height);
        Self {
            starting: starting.min(tip_height),
            ending: tip_height,
        }
    }

    /// Heights from `ending - 1` down to `starting`.
    pub fn descending(&self) -> impl Iterator<Item = u64> {
        (self.starting..self.ending).rev()
    }

    /// Number of heights in the window.
    pub fn len(&self) -> u64 {
        self.ending - self.starting
    }

    /// Whether the window holds no height.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `height` lies in the window.
    pub fn contains(&self, height: u64) -> bool {
        (self.starting..self.ending).contains(&height)
    }
}
