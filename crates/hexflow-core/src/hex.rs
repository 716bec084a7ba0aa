//! Axial hex coordinates.
//!
//! [`HexCoord`] is the engine's cell key. It orders by `(q, r)`, which is the
//! deterministic tie-break used wherever two cells compete (hub ownership,
//! sort stability). Neighbor and distance math is delegated to [`hexx`].

use hexx::Hex;
use serde::{Deserialize, Serialize};

/// A position on the axial `(q, r)` hex grid.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct HexCoord {
    pub q: i32,
    pub r: i32,
}

impl HexCoord {
    pub const fn new(q: i32, r: i32) -> Self {
        Self { q, r }
    }

    pub fn to_hex(self) -> Hex {
        Hex::new(self.q, self.r)
    }

    pub fn from_hex(hex: Hex) -> Self {
        Self::new(hex.x, hex.y)
    }

    /// The six adjacent coordinates, in a fixed order.
    pub fn neighbors(self) -> [HexCoord; 6] {
        self.to_hex().all_neighbors().map(Self::from_hex)
    }

    /// Hex (step) distance to another coordinate.
    pub fn distance(self, other: HexCoord) -> u32 {
        self.to_hex().unsigned_distance_to(other.to_hex())
    }

    pub fn is_adjacent(self, other: HexCoord) -> bool {
        self.distance(other) == 1
    }

    /// Every coordinate within `radius` steps, including `self`, in `(q, r)` order.
    pub fn within(self, radius: u32) -> Vec<HexCoord> {
        let r = radius as i32;
        let mut out = Vec::new();
        for dq in -r..=r {
            for dr in (-r).max(-dq - r)..=r.min(-dq + r) {
                out.push(HexCoord::new(self.q + dq, self.r + dr));
            }
        }
        out
    }
}

impl std::fmt::Display for HexCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({},{})", self.q, self.r)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn neighbors_are_adjacent_and_unique() {
        let c = HexCoord::new(2, -1);
        let n = c.neighbors();
        for a in n {
            assert_eq!(c.distance(a), 1);
        }
        let mut sorted = n.to_vec();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), 6);
    }

    #[test]
    fn axial_distance() {
        let a = HexCoord::new(0, 0);
        assert_eq!(a.distance(HexCoord::new(3, 0)), 3);
        assert_eq!(a.distance(HexCoord::new(2, -2)), 2);
        assert_eq!(a.distance(HexCoord::new(1, 1)), 2);
        assert_eq!(a.distance(a), 0);
    }

    #[test]
    fn within_radius_counts() {
        let c = HexCoord::new(0, 0);
        assert_eq!(c.within(0).len(), 1);
        assert_eq!(c.within(1).len(), 7);
        assert_eq!(c.within(2).len(), 19);
        assert!(c.within(2).iter().all(|h| c.distance(*h) <= 2));
    }

    #[test]
    fn ordering_is_q_then_r() {
        assert!(HexCoord::new(0, 5) < HexCoord::new(1, -5));
        assert!(HexCoord::new(1, -5) < HexCoord::new(1, 0));
    }
}
