use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::record::{Draft, Record};
use super::table::Table;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AchievementStatus {
    Completed,
    InProgress,
    #[default]
    Planned,
}

impl fmt::Display for AchievementStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AchievementStatus::Completed => write!(f, "completed"),
            AchievementStatus::InProgress => write!(f, "in-progress"),
            AchievementStatus::Planned => write!(f, "planned"),
        }
    }
}

impl FromStr for AchievementStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "completed" => Ok(AchievementStatus::Completed),
            "in-progress" => Ok(AchievementStatus::InProgress),
            "planned" => Ok(AchievementStatus::Planned),
            _ => Err(format!(
                "Invalid status '{}'. Valid options: completed, in-progress, planned",
                s
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Achievement {
    pub id: String,
    pub title: String,
    pub date: NaiveDate,
    pub progress: u8,
    pub status: AchievementStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record for Achievement {
    const TABLE: Table = Table::Achievements;

    fn id(&self) -> &str {
        &self.id
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }
}

impl fmt::Display for Achievement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.title)?;
        writeln!(f, "{}", "=".repeat(self.title.len()))?;
        writeln!(f, "ID: {}", self.id)?;
        writeln!(f, "Date: {}", self.date)?;
        writeln!(f, "Status: {}", self.status)?;
        writeln!(f, "Progress: {}%", self.progress)
    }
}

/// Fields for a new achievement.
#[derive(Debug, Clone)]
pub struct NewAchievement {
    pub title: String,
    pub date: NaiveDate,
    pub progress: u8,
    pub status: AchievementStatus,
}

impl NewAchievement {
    pub fn new(title: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            title: title.into(),
            date,
            progress: 0,
            status: AchievementStatus::Planned,
        }
    }

    pub fn with_progress(mut self, progress: u8) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_status(mut self, status: AchievementStatus) -> Self {
        self.status = status;
        self
    }
}

impl Draft for NewAchievement {
    type Record = Achievement;

    fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("An achievement needs a title".to_string());
        }
        if self.progress > 100 {
            return Err(format!(
                "Progress must be between 0 and 100, got {}",
                self.progress
            ));
        }
        Ok(())
    }

    fn into_record(self, id: String, now: DateTime<Utc>) -> Achievement {
        Achievement {
            id,
            title: self.title,
            date: self.date,
            progress: self.progress,
            status: self.status,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_from_str() {
        assert_eq!(
            AchievementStatus::from_str("completed").unwrap(),
            AchievementStatus::Completed
        );
        assert_eq!(
            AchievementStatus::from_str("In-Progress").unwrap(),
            AchievementStatus::InProgress
        );
        assert!(AchievementStatus::from_str("abandoned").is_err());
    }

    #[test]
    fn test_status_json_uses_kebab_case() {
        let json = serde_json::to_string(&AchievementStatus::InProgress).unwrap();
        assert_eq!(json, "\"in-progress\"");
    }

    #[test]
    fn test_new_achievement_defaults() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let draft = NewAchievement::new("Run 5k", date);

        assert_eq!(draft.progress, 0);
        assert_eq!(draft.status, AchievementStatus::Planned);
        assert!(draft.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_input() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert!(NewAchievement::new("", date).validate().is_err());
        assert!(NewAchievement::new("Run 5k", date)
            .with_progress(101)
            .validate()
            .is_err());
    }

    #[test]
    fn test_display() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let achievement = NewAchievement::new("Run 5k", date)
            .with_progress(40)
            .with_status(AchievementStatus::InProgress)
            .into_record("7".to_string(), Utc::now());

        let output = format!("{}", achievement);
        assert!(output.contains("Run 5k"));
        assert!(output.contains("in-progress"));
        assert!(output.contains("40%"));
    }
}
