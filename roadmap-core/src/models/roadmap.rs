use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::common::{optional_text, required_text, DateRange, Visibility};
use super::item::{
    RoadmapItem, RoadmapItemKind, UpsertActivityInput, UpsertItemInput, UpsertMilestoneInput,
    UpsertTimeboxInput,
};
use super::manager::RoadmapManager;
use crate::error::{RoadmapError, RoadmapResult};
use crate::ordering;

/// A planning roadmap and everything on it.
///
/// The roadmap is the consistency boundary for its managers and items: every
/// change goes through a method here, each method checks that the caller is a
/// manager, and a failed call leaves the roadmap exactly as it was.
///
/// Items are held in an id-keyed arena. The hierarchy is derived from each
/// item's `parent_id`; no item keeps its own list of children.
///
/// # Invariants
/// - At least one manager, no duplicates.
/// - Every `parent_id` names an activity on this roadmap, and no activity is
///   its own ancestor.
/// - The activities of each sibling scope are ordered `1..=N` after any move,
///   reorder or delete touching that scope.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Roadmap {
    id: Uuid,
    key: u32,
    name: String,
    description: Option<String>,
    date_range: DateRange,
    visibility: Visibility,
    managers: Vec<RoadmapManager>,
    items: BTreeMap<Uuid, RoadmapItem>,
}

/// Input for creating or updating a roadmap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpsertRoadmapInput {
    pub name: String,
    pub description: Option<String>,
    pub date_range: DateRange,
    #[serde(default)]
    pub visibility: Visibility,
    /// Employees allowed to change the roadmap. Must not be empty.
    pub manager_ids: Vec<Uuid>,
}

/// An item with its nested children, used for tree responses.
///
/// Children are listed activities first (by order), then milestones and
/// timeboxes by date.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoadmapTreeNode {
    #[serde(flatten)]
    pub item: RoadmapItem,
    pub children: Vec<RoadmapTreeNode>,
}

impl Roadmap {
    /// Create a roadmap with its initial managers.
    ///
    /// This is the only path that adds managers without an authorized caller.
    pub fn create(key: u32, input: &UpsertRoadmapInput) -> RoadmapResult<Self> {
        let name = required_text(&input.name, "Name")?;
        if input.manager_ids.is_empty() {
            return Err(RoadmapError::InvalidArgument(
                RoadmapError::LastManagerRemoval.to_string(),
            ));
        }

        let mut roadmap = Self {
            id: Uuid::new_v4(),
            key,
            name,
            description: optional_text(input.description.as_deref()),
            date_range: input.date_range,
            visibility: input.visibility,
            managers: Vec::new(),
            items: BTreeMap::new(),
        };

        for manager_id in &input.manager_ids {
            if !roadmap.can_manage(*manager_id) {
                roadmap.insert_manager(*manager_id)?;
            }
        }

        tracing::debug!("Created roadmap {} ({})", roadmap.key, roadmap.id);
        Ok(roadmap)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn key(&self) -> u32 {
        self.key
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn date_range(&self) -> DateRange {
        self.date_range
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    pub fn managers(&self) -> &[RoadmapManager] {
        &self.managers
    }

    pub fn items(&self) -> impl Iterator<Item = &RoadmapItem> {
        self.items.values()
    }

    pub fn item(&self, id: Uuid) -> Option<&RoadmapItem> {
        self.items.get(&id)
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    // ============================================================
    // Authorization
    // ============================================================

    pub fn can_manage(&self, employee_id: Uuid) -> bool {
        self.managers.iter().any(|m| m.manager_id == employee_id)
    }

    pub fn can_delete(&self, current_user: Uuid) -> bool {
        self.can_manage(current_user)
    }

    fn authorize(&self, current_user: Uuid) -> RoadmapResult<()> {
        if self.can_manage(current_user) {
            Ok(())
        } else {
            Err(RoadmapError::Unauthorized)
        }
    }

    // ============================================================
    // Roadmap fields and managers
    // ============================================================

    /// Replace the roadmap fields and synchronize the manager set.
    ///
    /// The caller must be a manager and must remain one in `input.manager_ids`.
    pub fn update(&mut self, input: &UpsertRoadmapInput, current_user: Uuid) -> RoadmapResult<()> {
        self.authorize(current_user)?;
        if !input.manager_ids.contains(&current_user) {
            return Err(RoadmapError::InvalidArgument(
                "You cannot remove yourself as a roadmap manager.".to_string(),
            ));
        }
        let name = required_text(&input.name, "Name")?;

        let wanted: HashSet<Uuid> = input.manager_ids.iter().copied().collect();
        let mut added = HashSet::new();
        let to_add: Vec<Uuid> = input
            .manager_ids
            .iter()
            .copied()
            .filter(|id| !self.can_manage(*id) && added.insert(*id))
            .collect();
        let to_remove: Vec<Uuid> = self
            .managers
            .iter()
            .map(|m| m.manager_id)
            .filter(|id| !wanted.contains(id))
            .collect();

        for manager_id in to_add {
            self.insert_manager(manager_id)?;
        }
        for manager_id in to_remove {
            self.delete_manager(manager_id)?;
        }

        self.name = name;
        self.description = optional_text(input.description.as_deref());
        self.date_range = input.date_range;
        self.visibility = input.visibility;
        Ok(())
    }

    pub fn add_manager(&mut self, manager_id: Uuid, current_user: Uuid) -> RoadmapResult<()> {
        self.authorize(current_user)?;
        self.insert_manager(manager_id)
    }

    pub fn remove_manager(&mut self, manager_id: Uuid, current_user: Uuid) -> RoadmapResult<()> {
        self.authorize(current_user)?;
        self.delete_manager(manager_id)
    }

    fn insert_manager(&mut self, manager_id: Uuid) -> RoadmapResult<()> {
        if self.can_manage(manager_id) {
            return Err(RoadmapError::DuplicateManager);
        }
        self.managers.push(RoadmapManager::new(self.id, manager_id));
        Ok(())
    }

    fn delete_manager(&mut self, manager_id: Uuid) -> RoadmapResult<()> {
        let index = self
            .managers
            .iter()
            .position(|m| m.manager_id == manager_id)
            .ok_or_else(|| RoadmapError::NotFound("Roadmap manager not found.".to_string()))?;
        if self.managers.len() == 1 {
            return Err(RoadmapError::LastManagerRemoval);
        }
        self.managers.remove(index);
        Ok(())
    }

    // ============================================================
    // Item creation and updates
    // ============================================================

    /// Create an item at the root, or under `parent_id` when it is set.
    ///
    /// A root activity is ordered after the existing root activities. A child
    /// activity takes the parent's total child count plus one, milestones and
    /// timeboxes included.
    pub fn create_item(
        &mut self,
        input: &UpsertItemInput,
        current_user: Uuid,
    ) -> RoadmapResult<RoadmapItem> {
        self.authorize(current_user)?;
        let parent_id = self.resolve_parent(input.parent_id())?;

        let item = match input {
            UpsertItemInput::Activity(activity) => {
                let order = match parent_id {
                    Some(parent_id) => self.children(Some(parent_id)).len() as u32 + 1,
                    None => self.activity_count(None) as u32 + 1,
                };
                RoadmapItem::activity(self.id, parent_id, activity, order)?
            }
            UpsertItemInput::Milestone(milestone) => {
                RoadmapItem::milestone(self.id, parent_id, milestone)?
            }
            UpsertItemInput::Timebox(timebox) => RoadmapItem::timebox(self.id, parent_id, timebox)?,
        };

        tracing::debug!(
            "Created roadmap {} {} under {:?}",
            item.kind().as_str(),
            item.id(),
            parent_id
        );
        self.items.insert(item.id(), item.clone());
        Ok(item)
    }

    pub fn create_activity(
        &mut self,
        input: UpsertActivityInput,
        current_user: Uuid,
    ) -> RoadmapResult<RoadmapItem> {
        self.create_item(&input.into(), current_user)
    }

    pub fn create_milestone(
        &mut self,
        input: UpsertMilestoneInput,
        current_user: Uuid,
    ) -> RoadmapResult<RoadmapItem> {
        self.create_item(&input.into(), current_user)
    }

    pub fn create_timebox(
        &mut self,
        input: UpsertTimeboxInput,
        current_user: Uuid,
    ) -> RoadmapResult<RoadmapItem> {
        self.create_item(&input.into(), current_user)
    }

    /// Update an existing item of the payload's kind.
    ///
    /// A changed `parent_id` reparents the item before the fields are applied.
    /// A reparented activity goes to the end of its new scope and both the old
    /// and new scopes are renumbered.
    pub fn update_item(
        &mut self,
        item_id: Uuid,
        input: &UpsertItemInput,
        current_user: Uuid,
    ) -> RoadmapResult<RoadmapItem> {
        self.authorize(current_user)?;
        let kind = input.kind();
        let existing = self
            .items
            .get(&item_id)
            .filter(|item| item.kind() == kind)
            .ok_or_else(|| RoadmapError::item_not_found(kind))?;

        // Validate the field changes before anything moves.
        let old_parent = existing.parent_id();
        existing.clone().apply(input)?;

        let new_parent = input.parent_id();
        if new_parent != old_parent {
            match kind {
                RoadmapItemKind::Activity => {
                    self.change_parent(item_id, new_parent)?;
                    self.reset_child_activities_order(old_parent);
                    self.reset_child_activities_order(new_parent);
                }
                RoadmapItemKind::Milestone | RoadmapItemKind::Timebox => {
                    let parent_id = self.resolve_parent(new_parent)?;
                    self.item_mut(item_id)?.set_parent(parent_id);
                }
            }
        }

        let item = self.item_mut(item_id)?;
        item.apply(input)?;
        Ok(item.clone())
    }

    pub fn update_activity(
        &mut self,
        activity_id: Uuid,
        input: UpsertActivityInput,
        current_user: Uuid,
    ) -> RoadmapResult<RoadmapItem> {
        self.update_item(activity_id, &input.into(), current_user)
    }

    pub fn update_milestone(
        &mut self,
        milestone_id: Uuid,
        input: UpsertMilestoneInput,
        current_user: Uuid,
    ) -> RoadmapResult<RoadmapItem> {
        self.update_item(milestone_id, &input.into(), current_user)
    }

    pub fn update_timebox(
        &mut self,
        timebox_id: Uuid,
        input: UpsertTimeboxInput,
        current_user: Uuid,
    ) -> RoadmapResult<RoadmapItem> {
        self.update_item(timebox_id, &input.into(), current_user)
    }

    // ============================================================
    // Ordering and moves
    // ============================================================

    /// Move an activity to `new_order` among its current siblings.
    pub fn set_activity_order(
        &mut self,
        activity_id: Uuid,
        new_order: u32,
        current_user: Uuid,
    ) -> RoadmapResult<()> {
        self.authorize(current_user)?;
        require_positive(new_order)?;

        let activity = self.activity(activity_id)?;
        if activity.order() == Some(new_order) {
            return Ok(());
        }

        let parent_id = activity.parent_id();
        self.set_child_activity_order(parent_id, activity_id, new_order)
    }

    /// Reorder every root activity at once.
    ///
    /// `order_map` must name exactly the current root activities.
    pub fn set_children_order(
        &mut self,
        order_map: &HashMap<Uuid, u32>,
        current_user: Uuid,
    ) -> RoadmapResult<()> {
        self.authorize(current_user)?;
        self.apply_scope_order(None, order_map)
    }

    /// Reorder every activity child of `parent_id` at once.
    pub fn set_activity_children_order(
        &mut self,
        parent_id: Uuid,
        order_map: &HashMap<Uuid, u32>,
        current_user: Uuid,
    ) -> RoadmapResult<()> {
        self.authorize(current_user)?;
        self.activity(parent_id)?;
        self.apply_scope_order(Some(parent_id), order_map)
    }

    /// Move an activity under a different parent (or to the root) at
    /// `new_order`, closing the gap it leaves behind.
    ///
    /// Moving within the same parent is a no-op here, whatever `new_order`
    /// says; use [`Roadmap::set_activity_order`] to reorder siblings.
    pub fn move_activity(
        &mut self,
        activity_id: Uuid,
        new_parent_id: Option<Uuid>,
        new_order: u32,
        current_user: Uuid,
    ) -> RoadmapResult<()> {
        self.authorize(current_user)?;
        let old_parent = self.activity(activity_id)?.parent_id();
        if new_parent_id == old_parent {
            return Ok(());
        }
        require_positive(new_order)?;

        self.change_parent(activity_id, new_parent_id)?;
        self.set_child_activity_order(new_parent_id, activity_id, new_order)?;
        self.reset_child_activities_order(old_parent);

        tracing::debug!(
            "Moved activity {} from {:?} to {:?} at {}",
            activity_id,
            old_parent,
            new_parent_id,
            new_order
        );
        Ok(())
    }

    // ============================================================
    // Deletion
    // ============================================================

    /// Delete an item. Deleting an activity deletes its whole subtree.
    ///
    /// Returns the ids of every removed item, the target first.
    pub fn delete_item(&mut self, item_id: Uuid, current_user: Uuid) -> RoadmapResult<Vec<Uuid>> {
        self.authorize(current_user)?;
        let item = self
            .items
            .get(&item_id)
            .ok_or_else(|| RoadmapError::NotFound("Roadmap item not found.".to_string()))?;

        let parent_id = item.parent_id();
        let removed = match item.kind() {
            RoadmapItemKind::Activity => self.self_and_descendants(item_id),
            RoadmapItemKind::Milestone | RoadmapItemKind::Timebox => vec![item_id],
        };

        let doomed: HashSet<Uuid> = removed.iter().copied().collect();
        self.items.retain(|id, _| !doomed.contains(id));
        self.reset_child_activities_order(parent_id);

        tracing::debug!("Deleted {} item(s) from roadmap {}", removed.len(), self.id);
        Ok(removed)
    }

    /// Same as [`Roadmap::delete_item`].
    pub fn remove_child(&mut self, item_id: Uuid, current_user: Uuid) -> RoadmapResult<Vec<Uuid>> {
        self.delete_item(item_id, current_user)
    }

    // ============================================================
    // Read views
    // ============================================================

    /// Children of a scope: activities by order, then milestones and
    /// timeboxes by date and name.
    pub fn children(&self, parent_id: Option<Uuid>) -> Vec<&RoadmapItem> {
        let mut children: Vec<&RoadmapItem> = self
            .items
            .values()
            .filter(|item| item.parent_id() == parent_id)
            .collect();
        children.sort_by(|a, b| {
            let rank = |item: &RoadmapItem| match item.order() {
                Some(order) => (0, order),
                None => (1, 0),
            };
            rank(a)
                .cmp(&rank(b))
                .then_with(|| a.starts_on().cmp(&b.starts_on()))
                .then_with(|| a.name().cmp(b.name()))
        });
        children
    }

    /// Root activities in order.
    pub fn root_activities(&self) -> Vec<&RoadmapItem> {
        self.child_activities(None)
    }

    pub fn child_activities(&self, parent_id: Option<Uuid>) -> Vec<&RoadmapItem> {
        self.children(parent_id)
            .into_iter()
            .filter(|item| item.is_activity())
            .collect()
    }

    pub fn tree(&self) -> Vec<RoadmapTreeNode> {
        fn build_subtree(roadmap: &Roadmap, parent_id: Option<Uuid>) -> Vec<RoadmapTreeNode> {
            roadmap
                .children(parent_id)
                .into_iter()
                .map(|item| RoadmapTreeNode {
                    item: item.clone(),
                    children: build_subtree(roadmap, Some(item.id())),
                })
                .collect()
        }

        build_subtree(self, None)
    }

    // ============================================================
    // Internal helpers
    // ============================================================

    pub(super) fn item_mut(&mut self, id: Uuid) -> RoadmapResult<&mut RoadmapItem> {
        self.items
            .get_mut(&id)
            .ok_or_else(|| RoadmapError::NotFound("Roadmap item not found.".to_string()))
    }

    pub(super) fn items_map(&self) -> &BTreeMap<Uuid, RoadmapItem> {
        &self.items
    }

    /// Look up an activity, distinguishing a missing id from a leaf.
    pub(super) fn activity(&self, id: Uuid) -> RoadmapResult<&RoadmapItem> {
        let item = self
            .items
            .get(&id)
            .ok_or_else(|| RoadmapError::item_not_found(RoadmapItemKind::Activity))?;
        if !item.is_activity() {
            return Err(RoadmapError::UnsupportedItemKind(item.kind()));
        }
        Ok(item)
    }

    /// Check that a requested parent exists and is an activity.
    pub(super) fn resolve_parent(&self, parent_id: Option<Uuid>) -> RoadmapResult<Option<Uuid>> {
        match parent_id {
            None => Ok(None),
            Some(id) => match self.items.get(&id) {
                Some(item) if item.is_activity() => Ok(Some(id)),
                _ => Err(RoadmapError::ParentNotFound),
            },
        }
    }

    fn apply_scope_order(
        &mut self,
        parent_id: Option<Uuid>,
        order_map: &HashMap<Uuid, u32>,
    ) -> RoadmapResult<()> {
        let slots = ordering::apply_order_map(&self.scope_slots(parent_id), order_map)?;
        self.write_slots(&slots);
        Ok(())
    }
}

fn require_positive(order: u32) -> RoadmapResult<()> {
    if order == 0 {
        return Err(RoadmapError::InvalidOrder(
            "Order must be greater than zero.".to_string(),
        ));
    }
    Ok(())
}
