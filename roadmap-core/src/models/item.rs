use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::common::{optional_text, required_text, DateRange};
use crate::error::{RoadmapError, RoadmapResult};

/// The kind of a roadmap item. Fixed when the item is created.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RoadmapItemKind {
    Activity,
    Milestone,
    Timebox,
}

impl RoadmapItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Activity => "activity",
            Self::Milestone => "milestone",
            Self::Timebox => "timebox",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "activity" => Some(Self::Activity),
            "milestone" => Some(Self::Milestone),
            "timebox" => Some(Self::Timebox),
            _ => None,
        }
    }

    /// Capitalized name used in user-facing messages.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Activity => "Activity",
            Self::Milestone => "Milestone",
            Self::Timebox => "Timebox",
        }
    }
}

impl fmt::Display for RoadmapItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Kind-specific data of a roadmap item.
///
/// Only activities carry an `order`; it is their 1-based position among the
/// activity children of the same parent. Milestones and timeboxes are leaves
/// and are never ordered.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ItemSchedule {
    Activity { date_range: DateRange, order: u32 },
    Milestone { date: NaiveDate },
    Timebox { date_range: DateRange },
}

/// A planning item on a roadmap.
///
/// Items live in the roadmap's arena and reference their parent activity by
/// id; `parent_id = None` places the item at the root of the roadmap. Items
/// are only ever changed through [`Roadmap`](super::Roadmap).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoadmapItem {
    id: Uuid,
    roadmap_id: Uuid,
    parent_id: Option<Uuid>,
    name: String,
    description: Option<String>,
    color: Option<String>,
    #[serde(flatten)]
    schedule: ItemSchedule,
}

impl RoadmapItem {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn roadmap_id(&self) -> Uuid {
        self.roadmap_id
    }

    pub fn parent_id(&self) -> Option<Uuid> {
        self.parent_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn color(&self) -> Option<&str> {
        self.color.as_deref()
    }

    pub fn schedule(&self) -> &ItemSchedule {
        &self.schedule
    }

    pub fn kind(&self) -> RoadmapItemKind {
        match self.schedule {
            ItemSchedule::Activity { .. } => RoadmapItemKind::Activity,
            ItemSchedule::Milestone { .. } => RoadmapItemKind::Milestone,
            ItemSchedule::Timebox { .. } => RoadmapItemKind::Timebox,
        }
    }

    pub fn is_activity(&self) -> bool {
        matches!(self.schedule, ItemSchedule::Activity { .. })
    }

    /// Position among activity siblings. `None` for milestones and timeboxes.
    pub fn order(&self) -> Option<u32> {
        match self.schedule {
            ItemSchedule::Activity { order, .. } => Some(order),
            ItemSchedule::Milestone { .. } | ItemSchedule::Timebox { .. } => None,
        }
    }

    pub fn date_range(&self) -> Option<DateRange> {
        match self.schedule {
            ItemSchedule::Activity { date_range, .. } | ItemSchedule::Timebox { date_range } => {
                Some(date_range)
            }
            ItemSchedule::Milestone { .. } => None,
        }
    }

    pub fn date(&self) -> Option<NaiveDate> {
        match self.schedule {
            ItemSchedule::Milestone { date } => Some(date),
            ItemSchedule::Activity { .. } | ItemSchedule::Timebox { .. } => None,
        }
    }

    /// The first day the item covers, used to sort unordered leaves.
    pub fn starts_on(&self) -> NaiveDate {
        match self.schedule {
            ItemSchedule::Activity { date_range, .. } | ItemSchedule::Timebox { date_range } => {
                date_range.start()
            }
            ItemSchedule::Milestone { date } => date,
        }
    }

    pub(crate) fn activity(
        roadmap_id: Uuid,
        parent_id: Option<Uuid>,
        input: &UpsertActivityInput,
        order: u32,
    ) -> RoadmapResult<Self> {
        let details = ItemDetails::normalize(&input.name, &input.description, &input.color)?;
        Ok(details.into_item(
            roadmap_id,
            parent_id,
            ItemSchedule::Activity {
                date_range: input.date_range,
                order,
            },
        ))
    }

    pub(crate) fn milestone(
        roadmap_id: Uuid,
        parent_id: Option<Uuid>,
        input: &UpsertMilestoneInput,
    ) -> RoadmapResult<Self> {
        let details = ItemDetails::normalize(&input.name, &input.description, &input.color)?;
        Ok(details.into_item(roadmap_id, parent_id, ItemSchedule::Milestone { date: input.date }))
    }

    pub(crate) fn timebox(
        roadmap_id: Uuid,
        parent_id: Option<Uuid>,
        input: &UpsertTimeboxInput,
    ) -> RoadmapResult<Self> {
        let details = ItemDetails::normalize(&input.name, &input.description, &input.color)?;
        Ok(details.into_item(
            roadmap_id,
            parent_id,
            ItemSchedule::Timebox {
                date_range: input.date_range,
            },
        ))
    }

    /// Overwrite the descriptive fields and dates from an upsert payload.
    ///
    /// The payload kind must match the item kind; the caller checks this.
    /// Placement (`parent_id`, `order`) is not touched here.
    pub(crate) fn apply(&mut self, input: &UpsertItemInput) -> RoadmapResult<()> {
        let (name, description, color) = input.text_fields();
        let details = ItemDetails::normalize(name, description, color)?;

        match (&mut self.schedule, input) {
            (ItemSchedule::Activity { date_range, .. }, UpsertItemInput::Activity(input)) => {
                *date_range = input.date_range;
            }
            (ItemSchedule::Milestone { date }, UpsertItemInput::Milestone(input)) => {
                *date = input.date;
            }
            (ItemSchedule::Timebox { date_range }, UpsertItemInput::Timebox(input)) => {
                *date_range = input.date_range;
            }
            _ => return Err(RoadmapError::UnsupportedItemKind(input.kind())),
        }

        self.name = details.name;
        self.description = details.description;
        self.color = details.color;
        Ok(())
    }

    pub(crate) fn set_parent(&mut self, parent_id: Option<Uuid>) {
        self.parent_id = parent_id;
    }

    /// Set the sibling order. Ignored for leaves, which are never ordered.
    pub(crate) fn set_order(&mut self, new_order: u32) {
        if let ItemSchedule::Activity { order, .. } = &mut self.schedule {
            *order = new_order;
        }
    }
}

/// Normalized common fields shared by every item kind.
struct ItemDetails {
    name: String,
    description: Option<String>,
    color: Option<String>,
}

impl ItemDetails {
    fn normalize(
        name: &str,
        description: &Option<String>,
        color: &Option<String>,
    ) -> RoadmapResult<Self> {
        Ok(Self {
            name: required_text(name, "Name")?,
            description: optional_text(description.as_deref()),
            color: optional_text(color.as_deref()),
        })
    }

    fn into_item(self, roadmap_id: Uuid, parent_id: Option<Uuid>, schedule: ItemSchedule) -> RoadmapItem {
        RoadmapItem {
            id: Uuid::new_v4(),
            roadmap_id,
            parent_id,
            name: self.name,
            description: self.description,
            color: self.color,
            schedule,
        }
    }
}

/// Input for creating or updating an activity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpsertActivityInput {
    /// Parent activity. `None` places the activity at the roadmap root.
    pub parent_id: Option<Uuid>,
    pub name: String,
    pub description: Option<String>,
    /// Display hint, e.g. `#4a90d9`.
    pub color: Option<String>,
    pub date_range: DateRange,
}

/// Input for creating or updating a milestone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpsertMilestoneInput {
    pub parent_id: Option<Uuid>,
    pub name: String,
    pub description: Option<String>,
    pub color: Option<String>,
    pub date: NaiveDate,
}

/// Input for creating or updating a timebox.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpsertTimeboxInput {
    pub parent_id: Option<Uuid>,
    pub name: String,
    pub description: Option<String>,
    pub color: Option<String>,
    pub date_range: DateRange,
}

/// An upsert payload for any item kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UpsertItemInput {
    Activity(UpsertActivityInput),
    Milestone(UpsertMilestoneInput),
    Timebox(UpsertTimeboxInput),
}

impl UpsertItemInput {
    pub fn kind(&self) -> RoadmapItemKind {
        match self {
            Self::Activity(_) => RoadmapItemKind::Activity,
            Self::Milestone(_) => RoadmapItemKind::Milestone,
            Self::Timebox(_) => RoadmapItemKind::Timebox,
        }
    }

    pub fn parent_id(&self) -> Option<Uuid> {
        match self {
            Self::Activity(input) => input.parent_id,
            Self::Milestone(input) => input.parent_id,
            Self::Timebox(input) => input.parent_id,
        }
    }

    fn text_fields(&self) -> (&str, &Option<String>, &Option<String>) {
        match self {
            Self::Activity(input) => (&input.name, &input.description, &input.color),
            Self::Milestone(input) => (&input.name, &input.description, &input.color),
            Self::Timebox(input) => (&input.name, &input.description, &input.color),
        }
    }
}

impl From<UpsertActivityInput> for UpsertItemInput {
    fn from(input: UpsertActivityInput) -> Self {
        Self::Activity(input)
    }
}

impl From<UpsertMilestoneInput> for UpsertItemInput {
    fn from(input: UpsertMilestoneInput) -> Self {
        Self::Milestone(input)
    }
}

impl From<UpsertTimeboxInput> for UpsertItemInput {
    fn from(input: UpsertTimeboxInput) -> Self {
        Self::Timebox(input)
    }
}
