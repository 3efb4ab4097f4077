use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::record::{Draft, Record};
use super::table::Table;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyPlan {
    pub id: String,
    pub day: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub targets: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record for DailyPlan {
    const TABLE: Table = Table::DailyPlans;

    fn id(&self) -> &str {
        &self.id
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }
}

impl fmt::Display for DailyPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let heading = format!("{} ({})", self.day, self.date);
        writeln!(f, "{}", heading)?;
        writeln!(f, "{}", "=".repeat(heading.len()))?;
        writeln!(f, "ID: {}", self.id)?;

        if !self.targets.is_empty() {
            writeln!(f, "\nTargets:\n{}", self.targets)?;
        }
        if !self.notes.is_empty() {
            writeln!(f, "\nNotes:\n{}", self.notes)?;
        }

        Ok(())
    }
}

/// Fields for a new daily plan.
#[derive(Debug, Clone)]
pub struct NewDailyPlan {
    pub day: String,
    pub date: NaiveDate,
    pub notes: String,
    pub targets: String,
}

impl NewDailyPlan {
    pub fn new(day: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            day: day.into(),
            date,
            notes: String::new(),
            targets: String::new(),
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    pub fn with_targets(mut self, targets: impl Into<String>) -> Self {
        self.targets = targets.into();
        self
    }
}

impl Draft for NewDailyPlan {
    type Record = DailyPlan;

    fn validate(&self) -> Result<(), String> {
        if self.day.trim().is_empty() {
            return Err("A daily plan needs a day".to_string());
        }
        Ok(())
    }

    fn into_record(self, id: String, now: DateTime<Utc>) -> DailyPlan {
        DailyPlan {
            id,
            day: self.day,
            date: self.date,
            notes: self.notes,
            targets: self.targets,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn monday() -> NewDailyPlan {
        NewDailyPlan::new("Monday", NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
    }

    #[test]
    fn test_into_record_sets_timestamps() {
        let now = Utc::now();
        let plan = monday()
            .with_targets("Ship the release")
            .into_record("1704067200000".to_string(), now);

        assert_eq!(plan.id, "1704067200000");
        assert_eq!(plan.day, "Monday");
        assert_eq!(plan.targets, "Ship the release");
        assert_eq!(plan.created_at, now);
        assert_eq!(plan.updated_at, now);
    }

    #[test]
    fn test_validate_requires_day() {
        assert!(monday().validate().is_ok());

        let blank = NewDailyPlan::new("  ", NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert!(blank.validate().is_err());
    }

    #[test]
    fn test_date_serializes_as_iso() {
        let plan = monday().into_record("1".to_string(), Utc::now());
        let json = serde_json::to_value(&plan).unwrap();
        assert_eq!(json["date"], "2024-01-01");
    }

    #[test]
    fn test_display() {
        let plan = monday()
            .with_notes("Gym at 7")
            .into_record("1".to_string(), Utc::now());

        let output = format!("{}", plan);
        assert!(output.contains("Monday (2024-01-01)"));
        assert!(output.contains("Gym at 7"));
    }
}
