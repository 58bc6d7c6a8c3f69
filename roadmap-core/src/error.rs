use thiserror::Error;

use crate::models::RoadmapItemKind;

/// Expected failures of roadmap operations.
///
/// These are validation outcomes, not defects: every mutating method on
/// [`Roadmap`](crate::models::Roadmap) reports them through [`RoadmapResult`]
/// and leaves the aggregate untouched when one is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoadmapError {
    #[error("User is not a roadmap manager of this roadmap.")]
    Unauthorized,
    #[error("{0}")]
    NotFound(String),
    #[error("Parent activity not found.")]
    ParentNotFound,
    #[error("{0}")]
    InvalidOrder(String),
    #[error("Employee is already a roadmap manager of this roadmap.")]
    DuplicateManager,
    #[error("Roadmap must have at least one roadmap manager.")]
    LastManagerRemoval,
    #[error("An activity cannot be moved under itself or one of its descendants.")]
    CycleDetected,
    #[error("Roadmap {0} items do not support this operation.")]
    UnsupportedItemKind(RoadmapItemKind),
    #[error("{0}")]
    InvalidArgument(String),
}

impl RoadmapError {
    pub(crate) fn item_not_found(kind: RoadmapItemKind) -> Self {
        Self::NotFound(format!("Roadmap {} not found.", kind.label()))
    }
}

pub type RoadmapResult<T> = Result<T, RoadmapError>;
