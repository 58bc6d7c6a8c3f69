use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An employee authorized to change a roadmap.
///
/// A roadmap always has at least one manager and never lists the same
/// employee twice; [`Roadmap`](super::Roadmap) enforces both.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct RoadmapManager {
    pub roadmap_id: Uuid,
    pub manager_id: Uuid,
}

impl RoadmapManager {
    pub(crate) fn new(roadmap_id: Uuid, manager_id: Uuid) -> Self {
        Self {
            roadmap_id,
            manager_id,
        }
    }
}
