use uuid::Uuid;

use crate::models::Roadmap;

/// A roadmap as loaded from storage, with the version it was stored at.
#[derive(Debug, Clone)]
pub struct VersionedRoadmap {
    pub roadmap: Roadmap,
    pub version: u64,
}

/// Storage for whole roadmap aggregates.
///
/// Implementations load and save the entire aggregate (managers and every
/// item) in one step. `save` must be atomic and must reject a write whose
/// `expected_version` no longer matches the stored one, so two writers working
/// from the same load cannot silently overwrite each other's orders and
/// parents.
pub trait RoadmapRepository {
    type Error;

    fn load(&self, id: Uuid) -> Result<Option<VersionedRoadmap>, Self::Error>;

    /// Store the aggregate and return its new version.
    ///
    /// `expected_version = None` inserts a new roadmap at version 1.
    fn save(&self, roadmap: &Roadmap, expected_version: Option<u64>) -> Result<u64, Self::Error>;

    /// The key to assign to the next roadmap created.
    fn next_key(&self) -> Result<u32, Self::Error>;
}
