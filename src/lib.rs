//! Roadmap planning: storage, configuration and presentation around the
//! [`roadmap_core`] aggregate.

pub mod config;
pub mod db;
pub mod tree_render;

pub use roadmap_core::{error, models, ordering, repository};
pub use roadmap_core::{RoadmapError, RoadmapResult};
