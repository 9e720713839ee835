//! Record collaborators
//!
//! The engine never persists finance, schedule or task records itself. It
//! calls a host-provided `RecordStore` once per confirmed draft, and reads
//! the known timetable through the same trait. Currently ships an in-memory
//! store and an HTTP-backed one.

pub mod http;

pub use http::HttpRecordStore;

use crate::error::DraftingError;
use crate::models::{Category, Importance, KnownSchedule, Weekday};
use crate::Result;
use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

pub type RecordId = String;

//
// ================= Commit Payloads =================
//

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewExpense {
    pub amount: Decimal,
    pub category: Category,
    pub date: NaiveDate,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewScheduledClass {
    pub subject_name: String,
    #[serde(with = "hh_mm")]
    pub start_time: NaiveTime,
    #[serde(with = "hh_mm")]
    pub end_time: NaiveTime,
    pub days: BTreeSet<Weekday>,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTask {
    pub title: String,
    pub date: NaiveDate,
    pub importance: Importance,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewStudyTask {
    pub title: String,
    pub subject: String,
    pub date: NaiveDate,
    pub importance: Importance,
}

//
// ================= Traits =================
//

/// Trait for record persistence and timetable lookups
#[async_trait::async_trait]
pub trait RecordStore: Send + Sync {
    async fn commit_expense(&self, expense: &NewExpense) -> Result<RecordId>;
    async fn commit_scheduled_class(&self, class: &NewScheduledClass) -> Result<RecordId>;
    async fn commit_task(&self, task: &NewTask) -> Result<RecordId>;
    async fn commit_study_task(&self, task: &NewStudyTask) -> Result<RecordId>;

    async fn list_known_class_subjects(&self) -> Result<BTreeSet<String>>;
    async fn list_known_schedule_colors(&self) -> Result<HashSet<String>>;
    async fn list_known_schedules(&self) -> Result<Vec<KnownSchedule>>;
}

/// Fire-and-forget view switch for the navigation intent
pub trait Navigator: Send + Sync {
    fn navigate(&self, route: &str);
}

/// Navigator for hosts that route on the client; only logs
pub struct LoggingNavigator;

impl Navigator for LoggingNavigator {
    fn navigate(&self, route: &str) {
        info!(route = %route, "Navigation requested");
    }
}

//
// ================= In-Memory Store =================
//

/// In-memory record store for development
pub struct InMemoryRecordStore {
    expenses: Arc<RwLock<Vec<(RecordId, NewExpense)>>>,
    classes: Arc<RwLock<Vec<(RecordId, NewScheduledClass)>>>,
    tasks: Arc<RwLock<Vec<(RecordId, NewTask)>>>,
    study_tasks: Arc<RwLock<Vec<(RecordId, NewStudyTask)>>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self {
            expenses: Arc::new(RwLock::new(Vec::new())),
            classes: Arc::new(RwLock::new(Vec::new())),
            tasks: Arc::new(RwLock::new(Vec::new())),
            study_tasks: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Start with an existing timetable
    pub fn with_classes(classes: Vec<NewScheduledClass>) -> Self {
        let store = Self::new();
        let seeded = classes
            .into_iter()
            .map(|class| (Uuid::new_v4().to_string(), class))
            .collect();
        Self {
            classes: Arc::new(RwLock::new(seeded)),
            ..store
        }
    }

    pub async fn expenses(&self) -> Vec<NewExpense> {
        self.expenses.read().await.iter().map(|(_, e)| e.clone()).collect()
    }

    pub async fn classes(&self) -> Vec<NewScheduledClass> {
        self.classes.read().await.iter().map(|(_, c)| c.clone()).collect()
    }

    pub async fn tasks(&self) -> Vec<NewTask> {
        self.tasks.read().await.iter().map(|(_, t)| t.clone()).collect()
    }

    pub async fn study_tasks(&self) -> Vec<NewStudyTask> {
        self.study_tasks.read().await.iter().map(|(_, t)| t.clone()).collect()
    }
}

impl Default for InMemoryRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn commit_expense(&self, expense: &NewExpense) -> Result<RecordId> {
        let id = Uuid::new_v4().to_string();
        self.expenses.write().await.push((id.clone(), expense.clone()));
        Ok(id)
    }

    async fn commit_scheduled_class(&self, class: &NewScheduledClass) -> Result<RecordId> {
        if class.days.is_empty() {
            return Err(DraftingError::CommitFailed(
                "a class needs at least one day".to_string(),
            ));
        }
        let id = Uuid::new_v4().to_string();
        self.classes.write().await.push((id.clone(), class.clone()));
        Ok(id)
    }

    async fn commit_task(&self, task: &NewTask) -> Result<RecordId> {
        let id = Uuid::new_v4().to_string();
        self.tasks.write().await.push((id.clone(), task.clone()));
        Ok(id)
    }

    async fn commit_study_task(&self, task: &NewStudyTask) -> Result<RecordId> {
        let id = Uuid::new_v4().to_string();
        self.study_tasks.write().await.push((id.clone(), task.clone()));
        Ok(id)
    }

    async fn list_known_class_subjects(&self) -> Result<BTreeSet<String>> {
        let classes = self.classes.read().await;
        Ok(classes.iter().map(|(_, c)| c.subject_name.clone()).collect())
    }

    async fn list_known_schedule_colors(&self) -> Result<HashSet<String>> {
        let classes = self.classes.read().await;
        Ok(classes.iter().map(|(_, c)| c.color.clone()).collect())
    }

    async fn list_known_schedules(&self) -> Result<Vec<KnownSchedule>> {
        let classes = self.classes.read().await;
        Ok(classes
            .iter()
            .map(|(_, c)| KnownSchedule {
                subject_name: c.subject_name.clone(),
                start_time: c.start_time,
                end_time: c.end_time,
                days: c.days.iter().copied().collect(),
                color: c.color.clone(),
            })
            .collect())
    }
}

/// Record store whose commits always fail, for exercising the failure path
pub struct FailingRecordStore;

#[async_trait::async_trait]
impl RecordStore for FailingRecordStore {
    async fn commit_expense(&self, _expense: &NewExpense) -> Result<RecordId> {
        Err(DraftingError::CommitFailed("expense store unavailable".to_string()))
    }

    async fn commit_scheduled_class(&self, _class: &NewScheduledClass) -> Result<RecordId> {
        Err(DraftingError::CommitFailed("schedule store unavailable".to_string()))
    }

    async fn commit_task(&self, _task: &NewTask) -> Result<RecordId> {
        Err(DraftingError::CommitFailed("task store unavailable".to_string()))
    }

    async fn commit_study_task(&self, _task: &NewStudyTask) -> Result<RecordId> {
        Err(DraftingError::CommitFailed("study task store unavailable".to_string()))
    }

    async fn list_known_class_subjects(&self) -> Result<BTreeSet<String>> {
        Ok(BTreeSet::new())
    }

    async fn list_known_schedule_colors(&self) -> Result<HashSet<String>> {
        Ok(HashSet::new())
    }

    async fn list_known_schedules(&self) -> Result<Vec<KnownSchedule>> {
        Ok(Vec::new())
    }
}

/// `NaiveTime` as `"HH:MM"` on the wire
pub(crate) mod hh_mm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveTime::parse_from_str(&raw, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(&raw, "%H:%M:%S"))
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn physics() -> NewScheduledClass {
        NewScheduledClass {
            subject_name: "Physics".to_string(),
            start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(10, 30, 0).unwrap(),
            days: [Weekday::Monday, Weekday::Wednesday].into_iter().collect(),
            color: "#4F46E5".to_string(),
        }
    }

    #[tokio::test]
    async fn test_known_subjects_and_colors_come_from_classes() {
        let store = InMemoryRecordStore::with_classes(vec![physics()]);

        let subjects = store.list_known_class_subjects().await.unwrap();
        assert!(subjects.contains("Physics"));

        let colors = store.list_known_schedule_colors().await.unwrap();
        assert!(colors.contains("#4F46E5"));

        let schedules = store.list_known_schedules().await.unwrap();
        assert_eq!(schedules[0].days, vec![Weekday::Monday, Weekday::Wednesday]);
    }

    #[tokio::test]
    async fn test_class_without_days_is_rejected() {
        let store = InMemoryRecordStore::new();
        let mut class = physics();
        class.days.clear();
        tokio_test::assert_err!(store.commit_scheduled_class(&class).await);
        assert!(store.classes().await.is_empty());
    }

    #[test]
    fn test_class_times_serialize_as_hh_mm() {
        let value = serde_json::to_value(physics()).unwrap();
        assert_eq!(value["start_time"], "09:00");
        assert_eq!(value["end_time"], "10:30");
        assert_eq!(value["days"], serde_json::json!(["Monday", "Wednesday"]));
    }
}
