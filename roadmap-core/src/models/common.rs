use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{RoadmapError, RoadmapResult};

/// An inclusive span of calendar days. `start` never falls after `end`.
///
/// Deserialization goes through [`DateRange::new`], so decoded payloads are
/// held to the same bound check as constructed ones.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "RawDateRange")]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

#[derive(Deserialize)]
struct RawDateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl TryFrom<RawDateRange> for DateRange {
    type Error = RoadmapError;

    fn try_from(raw: RawDateRange) -> RoadmapResult<Self> {
        Self::new(raw.start, raw.end)
    }
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> RoadmapResult<Self> {
        if start > end {
            return Err(RoadmapError::InvalidArgument(
                "The start date must be on or before the end date.".to_string(),
            ));
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Who can see a roadmap.
///
/// - `Private`: only the roadmap managers
/// - `Public`: anyone in the organization
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    #[default]
    Private,
    Public,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Private => "private",
            Self::Public => "public",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "private" => Some(Self::Private),
            "public" => Some(Self::Public),
            _ => None,
        }
    }
}

/// Trim a required text field, rejecting blank input.
pub(crate) fn required_text(value: &str, field: &str) -> RoadmapResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(RoadmapError::InvalidArgument(format!("{field} is required.")));
    }
    Ok(trimmed.to_string())
}

/// Trim an optional text field; blank collapses to `None`.
pub(crate) fn optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn date_range_rejects_inverted_bounds() {
        let err = DateRange::new(date(2025, 3, 1), date(2025, 2, 1)).unwrap_err();
        assert!(matches!(err, RoadmapError::InvalidArgument(_)));
    }

    #[test]
    fn decoding_rejects_inverted_bounds() {
        let err = serde_json::from_str::<DateRange>(r#"{"start":"2025-03-01","end":"2025-01-01"}"#)
            .unwrap_err();
        assert!(err.to_string().contains("start date must be on or before the end date"));
    }

    #[test]
    fn decoding_keeps_valid_bounds() {
        let range: DateRange =
            serde_json::from_str(r#"{"start":"2025-01-01","end":"2025-03-01"}"#).unwrap();
        assert_eq!(range, DateRange::new(date(2025, 1, 1), date(2025, 3, 1)).unwrap());
        assert_eq!(
            serde_json::to_string(&range).unwrap(),
            r#"{"start":"2025-01-01","end":"2025-03-01"}"#
        );
    }

    #[test]
    fn date_range_allows_single_day() {
        let range = DateRange::new(date(2025, 3, 1), date(2025, 3, 1)).unwrap();
        assert!(range.contains(date(2025, 3, 1)));
        assert!(!range.contains(date(2025, 3, 2)));
    }

    #[test]
    fn optional_text_collapses_blank_to_none() {
        assert_eq!(optional_text(Some("   ")), None);
        assert_eq!(optional_text(Some(" notes ")), Some("notes".to_string()));
        assert_eq!(optional_text(None), None);
    }

    #[test]
    fn required_text_trims_and_rejects_blank() {
        assert_eq!(required_text("  Q1 Plan ", "Name").unwrap(), "Q1 Plan");
        assert_eq!(
            required_text(" ", "Name").unwrap_err(),
            RoadmapError::InvalidArgument("Name is required.".to_string())
        );
    }
}
