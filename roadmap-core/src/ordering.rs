//! Dense sibling ordering.
//!
//! A sibling scope (the root of a roadmap, or the activity children of one
//! activity) keeps its activities numbered `1..=N` with no gaps or duplicates.
//! The functions here work on a snapshot of the scope as [`Slot`]s and return
//! the full set of assignments to write back; they never touch the aggregate
//! directly.

use std::collections::HashMap;

use uuid::Uuid;

use crate::error::{RoadmapError, RoadmapResult};

/// One activity's position within its scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub id: Uuid,
    pub order: u32,
}

impl Slot {
    pub fn new(id: Uuid, order: u32) -> Self {
        Self { id, order }
    }
}

/// Renumber a scope to `1..=N`, keeping the relative order of the input.
///
/// Ties keep the order in which they were passed in.
pub fn renumber(slots: &[Slot]) -> Vec<Slot> {
    let mut sorted = slots.to_vec();
    sorted.sort_by_key(|slot| slot.order);
    sorted
        .into_iter()
        .enumerate()
        .map(|(index, slot)| Slot::new(slot.id, index as u32 + 1))
        .collect()
}

pub fn is_dense(slots: &[Slot]) -> bool {
    let mut orders: Vec<u32> = slots.iter().map(|slot| slot.order).collect();
    orders.sort_unstable();
    orders
        .iter()
        .enumerate()
        .all(|(index, order)| *order == index as u32 + 1)
}

/// Move `id` to `new_order` within its scope.
///
/// Siblings between the old and new position shift by one to open the slot,
/// then the scope is renumbered so an out-of-range `new_order` lands at the
/// end. The scope is renumbered even when `id` already sits at `new_order`.
/// Returns `None` if `id` is not part of the scope.
pub fn reposition(slots: &[Slot], id: Uuid, new_order: u32) -> Option<Vec<Slot>> {
    let current = slots.iter().find(|slot| slot.id == id)?.order;
    if current == new_order {
        return Some(renumber(slots));
    }

    let shifted: Vec<Slot> = slots
        .iter()
        .map(|slot| {
            if slot.id == id {
                Slot::new(id, new_order)
            } else if new_order > current && slot.order > current && slot.order <= new_order {
                Slot::new(slot.id, slot.order - 1)
            } else if new_order < current && slot.order >= new_order && slot.order < current {
                Slot::new(slot.id, slot.order + 1)
            } else {
                *slot
            }
        })
        .collect();

    Some(renumber(&shifted))
}

/// Apply a caller-supplied order for every member of a scope.
///
/// The map must cover exactly the scope's ids, with every value at least 1.
/// Values need not be contiguous; the result is renumbered.
pub fn apply_order_map(slots: &[Slot], order_map: &HashMap<Uuid, u32>) -> RoadmapResult<Vec<Slot>> {
    if order_map.len() != slots.len() {
        return Err(RoadmapError::InvalidOrder(
            "Not all activities provided were found.".to_string(),
        ));
    }
    if order_map.values().any(|order| *order == 0) {
        return Err(RoadmapError::InvalidOrder(
            "Order must be greater than zero.".to_string(),
        ));
    }

    let mapped = slots
        .iter()
        .map(|slot| {
            order_map
                .get(&slot.id)
                .map(|order| Slot::new(slot.id, *order))
                .ok_or_else(|| {
                    RoadmapError::InvalidOrder(
                        "Not all activities provided were found.".to_string(),
                    )
                })
        })
        .collect::<RoadmapResult<Vec<_>>>()?;

    Ok(renumber(&mapped))
}
