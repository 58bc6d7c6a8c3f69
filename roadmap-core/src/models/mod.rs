//! Domain models for roadmap planning.
//!
//! # Core Concepts
//!
//! - [`Roadmap`]: The aggregate root. Owns its managers and every item, and is
//!   the only way to change either.
//! - [`RoadmapItem`]: A planning item. Activities are branch nodes with a
//!   sibling order; milestones (a single date) and timeboxes (a date range)
//!   are unordered leaves.
//! - [`RoadmapManager`]: An employee allowed to change the roadmap.

mod activity;
mod common;
mod item;
mod manager;
mod roadmap;

pub use common::*;
pub use item::*;
pub use manager::*;
pub use roadmap::*;
