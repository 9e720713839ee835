//! HTTP-backed record store
//!
//! Talks to the dashboard's record API. Every commit is a single POST; a
//! transport error or non-2xx status is a failed commit and is not retried.

use super::{NewExpense, NewScheduledClass, NewStudyTask, NewTask, RecordId, RecordStore};
use crate::error::DraftingError;
use crate::models::KnownSchedule;
use crate::Result;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct CreatedRecord {
    id: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ScheduleRow {
    subject_name: String,
    #[serde(with = "super::hh_mm")]
    start_time: chrono::NaiveTime,
    #[serde(with = "super::hh_mm")]
    end_time: chrono::NaiveTime,
    days: Vec<crate::models::Weekday>,
    #[serde(default)]
    color: String,
}

#[derive(Clone)]
pub struct HttpRecordStore {
    client: Client,
    base_url: String,
}

impl HttpRecordStore {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(60))
            .pool_max_idle_per_host(8)
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn post_json<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<RecordId> {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                let message = format!("Record API request failed for {}: {}", path, e);
                DraftingError::CommitFailed(message)
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DraftingError::CommitFailed(format!(
                "Record API returned {} for {}: {}",
                status, path, body
            )));
        }

        let created = response.json::<CreatedRecord>().await.map_err(|e| {
            DraftingError::CommitFailed(format!("Invalid JSON response from {}: {}", path, e))
        })?;

        let id = match created.id {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        };
        debug!(path = %path, record_id = %id, "Record created");
        Ok(id)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);

        let response = self.client.get(url).send().await.map_err(|e| {
            let message = format!("Record API request failed for {}: {}", path, e);
            DraftingError::CollaboratorError(message)
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(DraftingError::CollaboratorError(format!(
                "Record API returned {} for {}",
                status, path
            )));
        }

        response.json::<T>().await.map_err(|e| {
            DraftingError::CollaboratorError(format!("Invalid JSON response from {}: {}", path, e))
        })
    }

    async fn schedules(&self) -> Result<Vec<ScheduleRow>> {
        self.get_json("/schedules").await
    }
}

#[async_trait::async_trait]
impl RecordStore for HttpRecordStore {
    async fn commit_expense(&self, expense: &NewExpense) -> Result<RecordId> {
        self.post_json("/expenses", expense).await
    }

    async fn commit_scheduled_class(&self, class: &NewScheduledClass) -> Result<RecordId> {
        self.post_json("/schedules", class).await
    }

    async fn commit_task(&self, task: &NewTask) -> Result<RecordId> {
        self.post_json("/tasks", task).await
    }

    async fn commit_study_task(&self, task: &NewStudyTask) -> Result<RecordId> {
        self.post_json("/study-tasks", task).await
    }

    async fn list_known_class_subjects(&self) -> Result<BTreeSet<String>> {
        Ok(self
            .schedules()
            .await?
            .into_iter()
            .map(|row| row.subject_name)
            .collect())
    }

    async fn list_known_schedule_colors(&self) -> Result<HashSet<String>> {
        Ok(self
            .schedules()
            .await?
            .into_iter()
            .map(|row| row.color)
            .filter(|color| !color.is_empty())
            .collect())
    }

    async fn list_known_schedules(&self) -> Result<Vec<KnownSchedule>> {
        Ok(self
            .schedules()
            .await?
            .into_iter()
            .map(|row| KnownSchedule {
                subject_name: row.subject_name,
                start_time: row.start_time,
                end_time: row.end_time,
                days: row.days,
                color: row.color,
            })
            .collect())
    }
}
