//! Roadmap planning aggregate.
//!
//! A [`Roadmap`](models::Roadmap) holds a forest of activities, milestones and
//! timeboxes, keeps the activities of every sibling scope densely ordered and
//! only lets its managers change it. Persistence is left to a
//! [`RoadmapRepository`](repository::RoadmapRepository) implementation.

pub mod error;
pub mod models;
pub mod ordering;
pub mod repository;

pub use error::{RoadmapError, RoadmapResult};
