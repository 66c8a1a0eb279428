use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Literal the list service uses for a date that was never set
pub const UNSET_DATE_SENTINEL: &str = "0000-00-00";

/// List status values as understood by MyAnimeList
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ListStatus {
    Watching,
    Completed,
    OnHold,
    Dropped,
    PlanToWatch,
}

impl ListStatus {
    /// Textual status code sent to the list service
    pub fn as_api_str(&self) -> &'static str {
        match self {
            ListStatus::Watching => "watching",
            ListStatus::Completed => "completed",
            ListStatus::OnHold => "on_hold",
            ListStatus::Dropped => "dropped",
            ListStatus::PlanToWatch => "plan_to_watch",
        }
    }
}

impl fmt::Display for ListStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_api_str())
    }
}

impl FromStr for ListStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "watching" => Ok(ListStatus::Watching),
            "completed" => Ok(ListStatus::Completed),
            "on_hold" => Ok(ListStatus::OnHold),
            "dropped" => Ok(ListStatus::Dropped),
            "plan_to_watch" => Ok(ListStatus::PlanToWatch),
            other => Err(format!("Unknown list status: {}", other)),
        }
    }
}

/// A list entry date: either a calendar date or the unset sentinel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum EntryDate {
    #[default]
    Unset,
    Set(NaiveDate),
}

impl EntryDate {
    pub fn is_unset(&self) -> bool {
        matches!(self, EntryDate::Unset)
    }

    /// Parse a date as returned by the list service.
    ///
    /// Partial dates (`YYYY-MM`, `YYYY`) are accepted and pinned to the first day of
    /// the period; they only need to register as "set".
    pub fn parse(raw: &str) -> Result<Self, String> {
        let raw = raw.trim();
        if raw.is_empty() || raw == UNSET_DATE_SENTINEL {
            return Ok(EntryDate::Unset);
        }

        if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            return Ok(EntryDate::Set(date));
        }
        if let Ok(date) = NaiveDate::parse_from_str(&format!("{}-01", raw), "%Y-%m-%d") {
            return Ok(EntryDate::Set(date));
        }
        if let Ok(date) = NaiveDate::parse_from_str(&format!("{}-01-01", raw), "%Y-%m-%d") {
            return Ok(EntryDate::Set(date));
        }

        Err(format!("Invalid list entry date: {}", raw))
    }
}

impl fmt::Display for EntryDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryDate::Unset => f.write_str(UNSET_DATE_SENTINEL),
            EntryDate::Set(date) => write!(f, "{}", date.format("%Y-%m-%d")),
        }
    }
}

impl TryFrom<String> for EntryDate {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        EntryDate::parse(&value)
    }
}

impl From<EntryDate> for String {
    fn from(value: EntryDate) -> Self {
        value.to_string()
    }
}

/// The viewer's entry for one series on the list service
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ListEntry {
    pub catalog_id: u64,
    pub title: String,
    pub watched_episodes: u32,
    /// 0 means the total is unknown (e.g. an airing series)
    pub total_episodes: u32,
    pub status: ListStatus,
    pub rewatching: bool,
    pub score: u8,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub start_date: EntryDate,
    #[serde(default)]
    pub finish_date: EntryDate,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_date_sentinel_is_unset() {
        assert_eq!(EntryDate::parse("0000-00-00").unwrap(), EntryDate::Unset);
        assert_eq!(EntryDate::parse("").unwrap(), EntryDate::Unset);
        assert_eq!(EntryDate::Unset.to_string(), UNSET_DATE_SENTINEL);
    }

    #[test]
    fn test_entry_date_partial_dates_count_as_set() {
        let expected = NaiveDate::from_ymd_opt(2019, 4, 1).unwrap();
        assert_eq!(EntryDate::parse("2019-04").unwrap(), EntryDate::Set(expected));
        let expected = NaiveDate::from_ymd_opt(2019, 1, 1).unwrap();
        assert_eq!(EntryDate::parse("2019").unwrap(), EntryDate::Set(expected));
        assert!(EntryDate::parse("yesterday").is_err());
    }

    #[test]
    fn test_list_status_codes() {
        assert_eq!(ListStatus::OnHold.as_api_str(), "on_hold");
        assert_eq!("plan_to_watch".parse::<ListStatus>().unwrap(), ListStatus::PlanToWatch);
        assert!("rewatching".parse::<ListStatus>().is_err());
        let json = serde_json::to_string(&ListStatus::Completed).unwrap();
        assert_eq!(json, "\"completed\"");
    }
}
