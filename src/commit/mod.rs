//! Confirmation and commit
//!
//! A complete draft is shown back to the user as a read-only card with
//! Confirm/Cancel actions. Confirming turns the draft into exactly one
//! collaborator call. The draft is consumed either way: a failed commit is
//! reported, never retried, and nothing is assumed to have been created.

use crate::draft::{ClassDraft, Draft, ExpenseDraft, StudyTaskDraft, TaskDraft};
use crate::error::DraftingError;
use crate::models::{Message, MenuOption, Presentation};
use crate::records::{NewExpense, NewScheduledClass, NewStudyTask, NewTask, RecordId, RecordStore};
use crate::Result;
use chrono::{NaiveDate, NaiveTime, Timelike};
use rand::seq::SliceRandom;
use serde_json::json;
use std::collections::HashSet;
use tracing::warn;

pub const FAILURE_TEXT: &str = "Something went wrong, please try again.";

/// Colours offered to new classes
pub const PALETTE: &[&str] = &[
    "#4F46E5", "#0EA5E9", "#10B981", "#F59E0B", "#EF4444", "#8B5CF6", "#EC4899", "#14B8A6",
];

const LAST_HOUR: u64 = 23;

/// `start + duration`, with the hour clamped to 23 instead of wrapping
pub fn derive_end_time(start: NaiveTime, duration_hours: f64) -> NaiveTime {
    // `as` saturates, and NaN or negative durations become zero
    let duration_minutes = (duration_hours * 60.0).round() as u64;
    let start_minutes = u64::from(start.hour() * 60 + start.minute());
    let total_minutes = start_minutes.saturating_add(duration_minutes);

    let hour = (total_minutes / 60).min(LAST_HOUR);
    let minute = total_minutes % 60;
    NaiveTime::from_hms_opt(hour as u32, minute as u32, 0).unwrap_or(start)
}

/// A palette colour not already used by an existing class, picked at
/// random. Falls back to the whole palette when every colour is taken.
pub fn pick_color(in_use: &HashSet<String>) -> String {
    let in_use: HashSet<String> = in_use.iter().map(|c| c.to_uppercase()).collect();
    let free: Vec<&str> = PALETTE
        .iter()
        .copied()
        .filter(|c| !in_use.contains(&c.to_uppercase()))
        .collect();

    let mut rng = rand::thread_rng();
    let pool = if free.is_empty() { PALETTE } else { &free[..] };
    pool.choose(&mut rng).copied().unwrap_or(PALETTE[0]).to_string()
}

//
// ================= Commit Requests =================
//

/// A draft fully resolved into the arguments of one collaborator call
#[derive(Debug, Clone, PartialEq)]
pub enum CommitRequest {
    Expense(NewExpense),
    ScheduledClass(NewScheduledClass),
    Task(NewTask),
    StudyTask(NewStudyTask),
}

impl CommitRequest {
    /// Fill defaults and derived fields. Fails only for an incomplete draft.
    pub fn from_draft(
        draft: Draft,
        today: NaiveDate,
        colors_in_use: &HashSet<String>,
    ) -> Result<Self> {
        let incomplete =
            |what: &str| DraftingError::InvalidInput(format!("draft is missing {}", what));

        let request = match draft {
            Draft::Expense(ExpenseDraft {
                title,
                amount,
                category,
                date,
                description,
            }) => {
                let title = title.ok_or_else(|| incomplete("title"))?;
                CommitRequest::Expense(NewExpense {
                    amount: amount.ok_or_else(|| incomplete("amount"))?,
                    category: category.ok_or_else(|| incomplete("category"))?,
                    date: date.unwrap_or(today),
                    description: description.unwrap_or(title),
                })
            }
            Draft::ScheduledClass(ClassDraft {
                subject_name,
                start_time,
                duration_hours,
                days,
                color,
            }) => {
                let start_time = start_time.ok_or_else(|| incomplete("start time"))?;
                let duration = duration_hours.ok_or_else(|| incomplete("duration"))?;
                let days = days
                    .filter(|d| !d.is_empty())
                    .ok_or_else(|| incomplete("days"))?;
                CommitRequest::ScheduledClass(NewScheduledClass {
                    subject_name: subject_name.ok_or_else(|| incomplete("class name"))?,
                    start_time,
                    end_time: derive_end_time(start_time, duration),
                    days,
                    color: color.unwrap_or_else(|| pick_color(colors_in_use)),
                })
            }
            Draft::Task(TaskDraft {
                title,
                date,
                importance,
                description,
            }) => CommitRequest::Task(NewTask {
                title: title.ok_or_else(|| incomplete("title"))?,
                date: date.ok_or_else(|| incomplete("due date"))?,
                importance: importance.unwrap_or_default(),
                description: description.unwrap_or_default(),
            }),
            Draft::StudyTask(StudyTaskDraft {
                title,
                subject,
                date,
                importance,
            }) => CommitRequest::StudyTask(NewStudyTask {
                title: title.ok_or_else(|| incomplete("title"))?,
                subject: subject.ok_or_else(|| incomplete("subject"))?,
                date: date.ok_or_else(|| incomplete("due date"))?,
                importance: importance.unwrap_or_default(),
            }),
        };
        Ok(request)
    }

    /// Dispatch the one collaborator call for this record
    pub async fn dispatch(&self, records: &dyn RecordStore) -> Result<RecordId> {
        match self {
            CommitRequest::Expense(expense) => records.commit_expense(expense).await,
            CommitRequest::ScheduledClass(class) => records.commit_scheduled_class(class).await,
            CommitRequest::Task(task) => records.commit_task(task).await,
            CommitRequest::StudyTask(task) => records.commit_study_task(task).await,
        }
    }

    /// Success text naming the created record
    pub fn success_text(&self) -> String {
        match self {
            CommitRequest::Expense(e) => format!(
                "Saved your expense \"{}\" ({} in {}) for {}.",
                e.description, e.amount, e.category, e.date
            ),
            CommitRequest::ScheduledClass(c) => format!(
                "Added {} to your timetable on {} from {} to {}.",
                c.subject_name,
                c.days.iter().map(|d| d.short()).collect::<Vec<_>>().join(", "),
                c.start_time.format("%H:%M"),
                c.end_time.format("%H:%M")
            ),
            CommitRequest::Task(t) => format!(
                "Added task \"{}\" due {} ({} importance).",
                t.title, t.date, t.importance
            ),
            CommitRequest::StudyTask(t) => format!(
                "Added study task \"{}\" for {} due {} ({} importance).",
                t.title, t.subject, t.date, t.importance
            ),
        }
    }
}

/// Commit a confirmed draft and turn the outcome into the final message
pub async fn commit_draft(
    draft: Draft,
    records: &dyn RecordStore,
    today: NaiveDate,
) -> (Message, Option<RecordId>) {
    let colors_in_use = match &draft {
        Draft::ScheduledClass(ClassDraft { color: None, .. }) => {
            records.list_known_schedule_colors().await.unwrap_or_else(|e| {
                warn!(error = %e, "Could not load schedule colours, picking from full palette");
                HashSet::new()
            })
        }
        _ => HashSet::new(),
    };

    let kind = draft.kind();
    let outcome = match CommitRequest::from_draft(draft, today, &colors_in_use) {
        Ok(request) => request
            .dispatch(records)
            .await
            .map(|id| (request.success_text(), id)),
        Err(e) => Err(e),
    };

    match outcome {
        Ok((text, id)) => (
            Message::assistant(
                text,
                Presentation::PlainText,
                json!({ "record_id": &id, "kind": kind }),
            ),
            Some(id),
        ),
        Err(e) => {
            warn!(kind = ?kind, error = %e, "Commit failed");
            (Message::plain(FAILURE_TEXT), None)
        }
    }
}

//
// ================= Confirmation Card =================
//

/// (label, value) rows shown on the card, values exactly as stored
pub fn card_fields(draft: &Draft) -> Vec<(&'static str, String)> {
    let mut rows = Vec::new();
    match draft {
        Draft::Expense(d) => {
            push(&mut rows, "Title", d.title.clone());
            push(&mut rows, "Amount", d.amount.map(|a| a.to_string()));
            push(&mut rows, "Category", d.category.map(|c| c.to_string()));
            push(&mut rows, "Date", d.date.map(|d| d.to_string()));
            push(&mut rows, "Description", d.description.clone().or_else(|| d.title.clone()));
        }
        Draft::ScheduledClass(d) => {
            push(&mut rows, "Class", d.subject_name.clone());
            push(
                &mut rows,
                "Days",
                d.days.as_ref().map(|days| {
                    days.iter().map(|d| d.to_string()).collect::<Vec<_>>().join(", ")
                }),
            );
            push(&mut rows, "Start time", d.start_time.map(|t| t.format("%H:%M").to_string()));
            push(&mut rows, "Duration (hours)", d.duration_hours.map(|h| h.to_string()));
            if let (Some(start), Some(hours)) = (d.start_time, d.duration_hours) {
                push(
                    &mut rows,
                    "End time",
                    Some(derive_end_time(start, hours).format("%H:%M").to_string()),
                );
            }
            push(&mut rows, "Color", d.color.clone());
        }
        Draft::Task(d) => {
            push(&mut rows, "Title", d.title.clone());
            push(&mut rows, "Due", d.date.map(|d| d.to_string()));
            push(&mut rows, "Importance", d.importance.map(|i| i.to_string()));
            push(&mut rows, "Description", d.description.clone());
        }
        Draft::StudyTask(d) => {
            push(&mut rows, "Title", d.title.clone());
            push(&mut rows, "Subject", d.subject.clone());
            push(&mut rows, "Due", d.date.map(|d| d.to_string()));
            push(&mut rows, "Importance", d.importance.map(|i| i.to_string()));
        }
    }
    rows
}

fn push(rows: &mut Vec<(&'static str, String)>, label: &'static str, value: Option<String>) {
    if let Some(value) = value {
        rows.push((label, value));
    }
}

pub fn render_confirmation(draft: &Draft) -> Message {
    let fields = card_fields(draft);

    let mut text = format!("Here's your {}. Shall I save it?", draft.kind().label());
    for (label, value) in &fields {
        text.push_str(&format!("\n{}: {}", label, value));
    }

    let actions = vec![
        MenuOption::new("Confirm", "confirm"),
        MenuOption::new("Cancel", "cancel"),
    ];

    Message::assistant(
        text,
        Presentation::ConfirmationCard,
        json!({
            "kind": draft.kind(),
            "fields": fields
                .iter()
                .map(|(label, value)| json!({ "label": label, "value": value }))
                .collect::<Vec<_>>(),
            "options": actions,
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, Importance, Weekday};
    use crate::records::{FailingRecordStore, InMemoryRecordStore};
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 10).unwrap()
    }

    fn lunch() -> Draft {
        Draft::Expense(ExpenseDraft {
            title: Some("Lunch".to_string()),
            amount: Some(Decimal::from_str("15.50").unwrap()),
            category: Some(Category::Food),
            date: Some(today()),
            description: None,
        })
    }

    #[test]
    fn test_end_time_derivation() {
        assert_eq!(derive_end_time(hm(9, 0), 1.5), hm(10, 30));
        assert_eq!(derive_end_time(hm(14, 45), 0.5), hm(15, 15));
    }

    #[test]
    fn test_end_time_clamps_hour_to_23() {
        assert_eq!(derive_end_time(hm(23, 0), 2.0).hour(), 23);
        assert_eq!(derive_end_time(hm(22, 30), 2.0), hm(23, 30));
    }

    #[test]
    fn test_end_time_survives_huge_durations() {
        assert_eq!(derive_end_time(hm(9, 0), 1e9).hour(), 23);
        assert_eq!(derive_end_time(hm(9, 0), f64::MAX).hour(), 23);
        assert_eq!(derive_end_time(hm(9, 0), f64::NAN), hm(9, 0));
    }

    #[test]
    fn test_pick_color_avoids_used() {
        let used: HashSet<String> = PALETTE[1..].iter().map(|c| c.to_lowercase()).collect();
        for _ in 0..20 {
            assert_eq!(pick_color(&used), PALETTE[0]);
        }

        let all: HashSet<String> = PALETTE.iter().map(|c| c.to_string()).collect();
        assert!(PALETTE.contains(&pick_color(&all).as_str()));
    }

    #[test]
    fn test_defaults_fill_in_on_commit() {
        let draft = Draft::Task(TaskDraft {
            title: Some("Call the bank".to_string()),
            date: Some(today()),
            importance: None,
            description: None,
        });
        let request = CommitRequest::from_draft(draft, today(), &HashSet::new()).unwrap();
        assert_eq!(
            request,
            CommitRequest::Task(NewTask {
                title: "Call the bank".to_string(),
                date: today(),
                importance: Importance::Medium,
                description: String::new(),
            })
        );
    }

    #[test]
    fn test_expense_description_defaults_to_title() {
        match CommitRequest::from_draft(lunch(), today(), &HashSet::new()).unwrap() {
            CommitRequest::Expense(e) => {
                assert_eq!(e.description, "Lunch");
                assert_eq!(e.amount.to_string(), "15.50");
            }
            other => panic!("unexpected request {:?}", other),
        }
    }

    #[test]
    fn test_incomplete_draft_cannot_commit() {
        let draft = Draft::ScheduledClass(ClassDraft {
            subject_name: Some("Physics".to_string()),
            ..Default::default()
        });
        assert!(CommitRequest::from_draft(draft, today(), &HashSet::new()).is_err());
    }

    #[test]
    fn test_card_shows_values_verbatim() {
        let card = render_confirmation(&lunch());
        assert_eq!(card.presentation, Presentation::ConfirmationCard);
        assert!(card.text.contains("Title: Lunch"));
        assert!(card.text.contains("Amount: 15.50"));
        assert!(card.text.contains("Category: Food"));
        assert!(card.text.contains("Date: 2026-03-10"));

        let values: Vec<String> = card.options().into_iter().map(|o| o.value).collect();
        assert_eq!(values, vec!["confirm", "cancel"]);
    }

    #[test]
    fn test_class_card_includes_end_time() {
        let draft = Draft::ScheduledClass(ClassDraft {
            subject_name: Some("Physics".to_string()),
            start_time: Some(hm(9, 0)),
            duration_hours: Some(1.5),
            days: Some([Weekday::Monday].into_iter().collect()),
            color: None,
        });
        let fields = card_fields(&draft);
        assert!(fields.contains(&("Start time", "09:00".to_string())));
        assert!(fields.contains(&("Duration (hours)", "1.5".to_string())));
        assert!(fields.contains(&("End time", "10:30".to_string())));
    }

    #[tokio::test]
    async fn test_commit_success_names_record() {
        let store = InMemoryRecordStore::new();
        let (message, id) = commit_draft(lunch(), &store, today()).await;
        assert!(id.is_some());
        assert!(message.text.contains("Lunch"));
        assert_eq!(store.expenses().await.len(), 1);
    }

    #[tokio::test]
    async fn test_commit_failure_is_generic() {
        let (message, id) = commit_draft(lunch(), &FailingRecordStore, today()).await;
        assert!(id.is_none());
        assert_eq!(message.text, FAILURE_TEXT);
    }
}
