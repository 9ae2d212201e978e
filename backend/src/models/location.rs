//! Spatial identifiers
//!
//! Every warehouse is addressed by a `WarehouseLocation`: the zone that owns it,
//! the world it lives in, and an integer block position. Couriers move between
//! these positions; the solver ranks candidates by squared Euclidean distance.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Administrative grouping (e.g. a colony) that scopes matching
pub type ZoneId = u32;

/// Identifier of the world/dimension a position belongs to
pub type WorldId = String;

/// Identifier of a courier entity
pub type AgentId = u32;

/// Integer 3D position
///
/// # Example
/// ```
/// use courier_logistics_core::BlockPos;
///
/// let a = BlockPos::new(0, 64, 0);
/// let b = BlockPos::new(3, 64, 4);
/// assert_eq!(a.distance_sq(&b), 25);
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Squared Euclidean distance (no sqrt, exact in integers)
    pub fn distance_sq(&self, other: &BlockPos) -> i64 {
        let dx = i64::from(self.x) - i64::from(other.x);
        let dy = i64::from(self.y) - i64::from(other.y);
        let dz = i64::from(self.z) - i64::from(other.z);
        dx * dx + dy * dy + dz * dz
    }

    /// Position shifted component-wise by `delta`
    pub fn offset(&self, delta: &BlockPos) -> BlockPos {
        BlockPos::new(self.x + delta.x, self.y + delta.y, self.z + delta.z)
    }
}

impl fmt::Display for BlockPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// Unique storage point: (zone, world, position)
///
/// Value type; two locations are the same warehouse iff all three fields match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WarehouseLocation {
    pub zone: ZoneId,
    pub world: WorldId,
    pub pos: BlockPos,
}

impl WarehouseLocation {
    pub fn new(zone: ZoneId, world: impl Into<WorldId>, pos: BlockPos) -> Self {
        Self {
            zone,
            world: world.into(),
            pos,
        }
    }
}

impl fmt::Display for WarehouseLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "zone {} {}@{}", self.zone, self.world, self.pos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_sq_is_symmetric() {
        let a = BlockPos::new(-2, 10, 7);
        let b = BlockPos::new(5, 4, -1);
        assert_eq!(a.distance_sq(&b), b.distance_sq(&a));
        assert_eq!(a.distance_sq(&b), 49 + 36 + 64);
    }

    #[test]
    fn test_distance_sq_does_not_overflow_at_extremes() {
        let a = BlockPos::new(i32::MIN, 0, 0);
        let b = BlockPos::new(i32::MAX, 0, 0);
        assert!(a.distance_sq(&b) > 0);
    }

    #[test]
    fn test_location_equality_by_fields() {
        let a = WarehouseLocation::new(1, "overworld", BlockPos::new(1, 2, 3));
        let b = WarehouseLocation::new(1, "overworld", BlockPos::new(1, 2, 3));
        let c = WarehouseLocation::new(1, "nether", BlockPos::new(1, 2, 3));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
