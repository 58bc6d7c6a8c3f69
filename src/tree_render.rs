//! ASCII tree rendering for roadmaps.

use crate::models::{ItemSchedule, RoadmapTreeNode};

const ACTIVITY: char = '■';
const MILESTONE: char = '◆';
const TIMEBOX: char = '□';

fn kind_symbol(schedule: &ItemSchedule) -> char {
    match schedule {
        ItemSchedule::Activity { .. } => ACTIVITY,
        ItemSchedule::Milestone { .. } => MILESTONE,
        ItemSchedule::Timebox { .. } => TIMEBOX,
    }
}

/// One line of text for a node: position, name and dates.
fn label(node: &RoadmapTreeNode) -> String {
    let item = &node.item;
    match item.schedule() {
        ItemSchedule::Activity { date_range, order } => format!(
            "{}. {} [{} → {}]",
            order,
            item.name(),
            date_range.start(),
            date_range.end()
        ),
        ItemSchedule::Milestone { date } => format!("{} [{}]", item.name(), date),
        ItemSchedule::Timebox { date_range } => format!(
            "{} [{} → {}]",
            item.name(),
            date_range.start(),
            date_range.end()
        ),
    }
}

/// Render a roadmap tree as ASCII art with kind symbols.
///
/// Example output:
/// ```text
/// ■ 1. Platform [2025-01-01 → 2025-03-31]
/// ├── ■ 1. Auth [2025-01-01 → 2025-02-15]
/// │   └── ◆ SSO live [2025-02-15]
/// └── □ Hardening [2025-03-01 → 2025-03-31]
/// ◆ GA [2025-04-01]
/// ```
pub fn render_tree(nodes: &[RoadmapTreeNode]) -> String {
    let mut output = String::new();
    for (i, node) in nodes.iter().enumerate() {
        let is_last = i == nodes.len() - 1;
        render_node(&mut output, node, "", is_last, true);
    }
    output
}

fn render_node(
    output: &mut String,
    node: &RoadmapTreeNode,
    prefix: &str,
    is_last: bool,
    is_root: bool,
) {
    if !is_root {
        let branch = if is_last { "└── " } else { "├── " };
        output.push_str(prefix);
        output.push_str(branch);
    }
    output.push(kind_symbol(node.item.schedule()));
    output.push(' ');
    output.push_str(&label(node));
    output.push('\n');

    let child_prefix = if is_root {
        String::new()
    } else {
        let continuation = if is_last { "    " } else { "│   " };
        format!("{}{}", prefix, continuation)
    };

    for (i, child) in node.children.iter().enumerate() {
        let child_is_last = i == node.children.len() - 1;
        render_node(output, child, &child_prefix, child_is_last, false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::*;
    use chrono::NaiveDate;
    use uuid::Uuid;

    fn date(month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, month, day).unwrap()
    }

    fn range() -> DateRange {
        DateRange::new(date(1, 1), date(3, 31)).unwrap()
    }

    fn activity(name: &str, parent_id: Option<Uuid>) -> UpsertActivityInput {
        UpsertActivityInput {
            parent_id,
            name: name.to_string(),
            description: None,
            color: None,
            date_range: range(),
        }
    }

    fn setup() -> (Roadmap, Uuid) {
        let manager = Uuid::new_v4();
        let roadmap = Roadmap::create(
            1,
            &UpsertRoadmapInput {
                name: "Plan".to_string(),
                description: None,
                date_range: range(),
                visibility: Visibility::Private,
                manager_ids: vec![manager],
            },
        )
        .unwrap();
        (roadmap, manager)
    }

    #[test]
    fn test_empty_roadmap() {
        let (roadmap, _) = setup();
        assert_eq!(render_tree(&roadmap.tree()), "");
    }

    #[test]
    fn test_single_root() {
        let (mut roadmap, manager) = setup();
        roadmap.create_activity(activity("Platform", None), manager).unwrap();

        let output = render_tree(&roadmap.tree());
        assert_eq!(output, "■ 1. Platform [2025-01-01 → 2025-03-31]\n");
    }

    #[test]
    fn test_nested_children() {
        let (mut roadmap, manager) = setup();
        let platform = roadmap.create_activity(activity("Platform", None), manager).unwrap();
        let auth = roadmap
            .create_activity(activity("Auth", Some(platform.id())), manager)
            .unwrap();
        roadmap
            .create_milestone(
                UpsertMilestoneInput {
                    parent_id: Some(auth.id()),
                    name: "SSO live".to_string(),
                    description: None,
                    color: None,
                    date: date(2, 15),
                },
                manager,
            )
            .unwrap();
        roadmap
            .create_timebox(
                UpsertTimeboxInput {
                    parent_id: Some(platform.id()),
                    name: "Hardening".to_string(),
                    description: None,
                    color: None,
                    date_range: DateRange::new(date(3, 1), date(3, 31)).unwrap(),
                },
                manager,
            )
            .unwrap();

        let output = render_tree(&roadmap.tree());
        let expected = "■ 1. Platform [2025-01-01 → 2025-03-31]\n├── ■ 1. Auth [2025-01-01 → 2025-03-31]\n│   └── ◆ SSO live [2025-02-15]\n└── □ Hardening [2025-03-01 → 2025-03-31]\n";
        assert_eq!(output, expected);
    }
}
