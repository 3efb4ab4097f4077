use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Remote tables mirrored by the local cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    DailyPlans,
    Achievements,
    SpecialNotes,
}

impl Table {
    pub const ALL: [Table; 3] = [Table::DailyPlans, Table::Achievements, Table::SpecialNotes];

    /// Table name on the remote store.
    pub fn as_str(&self) -> &'static str {
        match self {
            Table::DailyPlans => "daily_plans",
            Table::Achievements => "achievements",
            Table::SpecialNotes => "special_notes",
        }
    }

    /// Column the remote fetch orders by, descending.
    pub fn sort_column(&self) -> &'static str {
        match self {
            Table::DailyPlans | Table::Achievements => "date",
            Table::SpecialNotes => "created_at",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Table {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "daily_plans" => Ok(Table::DailyPlans),
            "achievements" => Ok(Table::Achievements),
            "special_notes" => Ok(Table::SpecialNotes),
            _ => Err(format!(
                "Unknown table '{}'. Valid tables: daily_plans, achievements, special_notes",
                s
            )),
        }
    }
}
