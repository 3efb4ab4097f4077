mod achievement;
mod daily_plan;
mod record;
mod special_note;
mod table;

pub use achievement::{Achievement, AchievementStatus, NewAchievement};
pub use daily_plan::{DailyPlan, NewDailyPlan};
pub use record::{Draft, Record, SyncStatus, Tracked};
pub use special_note::{NewSpecialNote, SpecialNote};
pub use table::Table;
