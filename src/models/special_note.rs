use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::record::{Draft, Record};
use super::table::Table;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecialNote {
    pub id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record for SpecialNote {
    const TABLE: Table = Table::SpecialNotes;

    fn id(&self) -> &str {
        &self.id
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }
}

#[derive(Debug, Clone)]
pub struct NewSpecialNote {
    pub content: String,
}

impl NewSpecialNote {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }
}

impl Draft for NewSpecialNote {
    type Record = SpecialNote;

    fn validate(&self) -> Result<(), String> {
        if self.content.trim().is_empty() {
            return Err("A note cannot be empty".to_string());
        }
        Ok(())
    }

    fn into_record(self, id: String, now: DateTime<Utc>) -> SpecialNote {
        SpecialNote {
            id,
            content: self.content,
            created_at: now,
            updated_at: now,
        }
    }
}
