//! Activity hierarchy: reparenting, subtree walks and child ordering.
//!
//! Activities are the only branch nodes of a roadmap. Each activity's
//! activity children form a sibling scope ordered independently of every other
//! scope; the roadmap root is one more scope with `parent_id = None`.

use std::collections::HashMap;

use uuid::Uuid;

use super::roadmap::Roadmap;
use crate::error::{RoadmapError, RoadmapResult};
use crate::ordering::{self, Slot};

impl Roadmap {
    /// The id of `item_id` followed by every item below it, depth first.
    ///
    /// Leaves yield only themselves. Unknown ids yield nothing.
    pub fn self_and_descendants(&self, item_id: Uuid) -> Vec<Uuid> {
        if self.item(item_id).is_none() {
            return Vec::new();
        }

        let mut children_map: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        for item in self.items_map().values() {
            if let Some(parent_id) = item.parent_id() {
                children_map.entry(parent_id).or_default().push(item.id());
            }
        }

        let mut collected = Vec::new();
        let mut stack = vec![item_id];
        while let Some(id) = stack.pop() {
            collected.push(id);
            if let Some(children) = children_map.get(&id) {
                stack.extend(children.iter().rev());
            }
        }
        collected
    }

    /// Reparent an activity, leaving it last in its new scope and the new
    /// scope numbered `1..=N`.
    ///
    /// Rejects a parent that is not an activity on this roadmap, and a parent
    /// that is the activity itself or one of its descendants. Nothing changes
    /// on failure. Callers pair this with [`Roadmap::set_child_activity_order`]
    /// or a renumber of the new scope, and renumber the old scope afterwards.
    pub(super) fn change_parent(
        &mut self,
        activity_id: Uuid,
        new_parent_id: Option<Uuid>,
    ) -> RoadmapResult<()> {
        self.activity(activity_id)?;
        let new_parent_id = self.resolve_parent(new_parent_id)?;
        if let Some(parent_id) = new_parent_id {
            if self.self_and_descendants(activity_id).contains(&parent_id) {
                return Err(RoadmapError::CycleDetected);
            }
        }

        // Child activities can be numbered past their count when leaves share
        // the parent, so the tail is taken from the highest order in use.
        let tail = self
            .scope_slots(new_parent_id)
            .iter()
            .filter(|slot| slot.id != activity_id)
            .map(|slot| slot.order)
            .max()
            .unwrap_or(0)
            + 1;

        let activity = self.item_mut(activity_id)?;
        activity.set_parent(new_parent_id);
        activity.set_order(tail);
        self.reset_child_activities_order(new_parent_id);
        Ok(())
    }

    /// Move `child_id` to `new_order` within the scope of `parent_id`.
    ///
    /// Siblings in between shift by one and the scope is renumbered.
    pub(super) fn set_child_activity_order(
        &mut self,
        parent_id: Option<Uuid>,
        child_id: Uuid,
        new_order: u32,
    ) -> RoadmapResult<()> {
        let slots = ordering::reposition(&self.scope_slots(parent_id), child_id, new_order)
            .ok_or_else(|| RoadmapError::NotFound("Roadmap Activity not found.".to_string()))?;
        self.write_slots(&slots);

        tracing::debug!(
            "Activity {} now at position {} under {:?}",
            child_id,
            new_order,
            parent_id
        );
        Ok(())
    }

    /// Renumber the activities of a scope to `1..=N`, keeping their order.
    pub(super) fn reset_child_activities_order(&mut self, parent_id: Option<Uuid>) {
        let slots = ordering::renumber(&self.scope_slots(parent_id));
        self.write_slots(&slots);
    }

    pub(super) fn activity_count(&self, parent_id: Option<Uuid>) -> usize {
        self.scope_slots(parent_id).len()
    }

    /// The activities of a scope as slots, sorted by order then name.
    pub(super) fn scope_slots(&self, parent_id: Option<Uuid>) -> Vec<Slot> {
        let mut activities: Vec<_> = self
            .items_map()
            .values()
            .filter(|item| item.parent_id() == parent_id)
            .filter_map(|item| item.order().map(|order| (order, item.name(), item.id())))
            .collect();
        activities.sort();
        activities
            .into_iter()
            .map(|(order, _, id)| Slot::new(id, order))
            .collect()
    }

    /// Write orders back. Slots always come from [`Roadmap::scope_slots`].
    pub(super) fn write_slots(&mut self, slots: &[Slot]) {
        for slot in slots {
            let activity = self.item_mut(slot.id);
            debug_assert!(activity.is_ok(), "scope slot {} has no item", slot.id);
            if let Ok(activity) = activity {
                activity.set_order(slot.order);
            }
        }
    }
}
