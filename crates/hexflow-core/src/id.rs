use serde::{Deserialize, Serialize};
use slotmap::new_key_type;

new_key_type! {
    /// Identifies a per-tick producer record in the allocation arena.
    pub struct ProducerId;

    /// Identifies a per-tick consumer record in the allocation arena.
    pub struct ConsumerId;
}

/// Identifies a building definition in the catalog. Cheap to copy and compare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BuildingTypeId(pub u32);
