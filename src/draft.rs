//! Draft model
//!
//! The record under construction is a closed tagged union, one variant per
//! committable intent. Each variant has its own closed field enum, and the
//! slot order of that enum is the wizard order. `PendingField` is never
//! stored independently of the draft; it is always recomputed from the
//! draft's first missing slot, so it cannot name a field of another variant.

use crate::models::{Category, Importance, Weekday};
use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

//
// ================= Variant Payloads =================
//

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExpenseDraft {
    pub title: Option<String>,
    pub amount: Option<Decimal>,
    pub category: Option<Category>,
    pub date: Option<NaiveDate>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassDraft {
    pub subject_name: Option<String>,
    pub start_time: Option<NaiveTime>,
    pub duration_hours: Option<f64>,
    pub days: Option<BTreeSet<Weekday>>,
    pub color: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskDraft {
    pub title: Option<String>,
    pub date: Option<NaiveDate>,
    pub importance: Option<Importance>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StudyTaskDraft {
    pub title: Option<String>,
    pub subject: Option<String>,
    pub date: Option<NaiveDate>,
    pub importance: Option<Importance>,
}

//
// ================= Slots =================
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExpenseField {
    Title,
    Category,
    Amount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClassField {
    SubjectName,
    Days,
    StartTime,
    DurationHours,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskField {
    Title,
    DueDate,
    Importance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StudyTaskField {
    Title,
    Subject,
    DueDate,
    Importance,
}

impl ExpenseField {
    pub const ORDER: [ExpenseField; 3] =
        [ExpenseField::Title, ExpenseField::Category, ExpenseField::Amount];
}

impl ClassField {
    pub const ORDER: [ClassField; 4] = [
        ClassField::SubjectName,
        ClassField::Days,
        ClassField::StartTime,
        ClassField::DurationHours,
    ];
}

impl TaskField {
    pub const ORDER: [TaskField; 3] = [TaskField::Title, TaskField::DueDate, TaskField::Importance];
}

impl StudyTaskField {
    pub const ORDER: [StudyTaskField; 4] = [
        StudyTaskField::Title,
        StudyTaskField::Subject,
        StudyTaskField::DueDate,
        StudyTaskField::Importance,
    ];
}

/// The slot the controller is currently waiting for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PendingField {
    None,
    Expense(ExpenseField),
    ScheduledClass(ClassField),
    Task(TaskField),
    StudyTask(StudyTaskField),
    Confirm,
}

//
// ================= Draft =================
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DraftKind {
    Expense,
    ScheduledClass,
    Task,
    StudyTask,
}

impl DraftKind {
    /// Main-menu value for this intent
    pub fn menu_value(&self) -> &'static str {
        match self {
            DraftKind::Expense => "expense",
            DraftKind::ScheduledClass => "class",
            DraftKind::Task => "task",
            DraftKind::StudyTask => "study_task",
        }
    }

    pub fn from_menu_value(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "expense" => Some(DraftKind::Expense),
            "class" | "schedule" | "scheduled_class" => Some(DraftKind::ScheduledClass),
            "task" | "todo" => Some(DraftKind::Task),
            "study_task" | "study" => Some(DraftKind::StudyTask),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DraftKind::Expense => "expense",
            DraftKind::ScheduledClass => "class",
            DraftKind::Task => "task",
            DraftKind::StudyTask => "study task",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Draft {
    Expense(ExpenseDraft),
    ScheduledClass(ClassDraft),
    Task(TaskDraft),
    StudyTask(StudyTaskDraft),
}

impl Draft {
    pub fn new(kind: DraftKind) -> Self {
        match kind {
            DraftKind::Expense => Draft::Expense(ExpenseDraft::default()),
            DraftKind::ScheduledClass => Draft::ScheduledClass(ClassDraft::default()),
            DraftKind::Task => Draft::Task(TaskDraft::default()),
            DraftKind::StudyTask => Draft::StudyTask(StudyTaskDraft::default()),
        }
    }

    pub fn kind(&self) -> DraftKind {
        match self {
            Draft::Expense(_) => DraftKind::Expense,
            Draft::ScheduledClass(_) => DraftKind::ScheduledClass,
            Draft::Task(_) => DraftKind::Task,
            Draft::StudyTask(_) => DraftKind::StudyTask,
        }
    }

    /// First unfilled slot in wizard order, or `Confirm` once complete
    pub fn next_pending(&self) -> PendingField {
        match self {
            Draft::Expense(d) => ExpenseField::ORDER
                .into_iter()
                .find(|f| match f {
                    ExpenseField::Title => d.title.is_none(),
                    ExpenseField::Category => d.category.is_none(),
                    ExpenseField::Amount => d.amount.is_none(),
                })
                .map_or(PendingField::Confirm, PendingField::Expense),
            Draft::ScheduledClass(d) => ClassField::ORDER
                .into_iter()
                .find(|f| match f {
                    ClassField::SubjectName => d.subject_name.is_none(),
                    ClassField::Days => d.days.as_ref().map_or(true, BTreeSet::is_empty),
                    ClassField::StartTime => d.start_time.is_none(),
                    ClassField::DurationHours => d.duration_hours.is_none(),
                })
                .map_or(PendingField::Confirm, PendingField::ScheduledClass),
            Draft::Task(d) => TaskField::ORDER
                .into_iter()
                .find(|f| match f {
                    TaskField::Title => d.title.is_none(),
                    TaskField::DueDate => d.date.is_none(),
                    TaskField::Importance => d.importance.is_none(),
                })
                .map_or(PendingField::Confirm, PendingField::Task),
            Draft::StudyTask(d) => StudyTaskField::ORDER
                .into_iter()
                .find(|f| match f {
                    StudyTaskField::Title => d.title.is_none(),
                    StudyTaskField::Subject => d.subject.is_none(),
                    StudyTaskField::DueDate => d.date.is_none(),
                    StudyTaskField::Importance => d.importance.is_none(),
                })
                .map_or(PendingField::Confirm, PendingField::StudyTask),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.next_pending() == PendingField::Confirm
    }

    /// Fill this draft's empty slots from another draft of the same kind.
    /// Slots already set are kept. Returns whether anything was filled.
    pub fn fill_missing_from(&mut self, other: Draft) -> bool {
        fn fill<T>(slot: &mut Option<T>, value: Option<T>) -> bool {
            match (slot.is_none(), value) {
                (true, Some(value)) => {
                    *slot = Some(value);
                    true
                }
                _ => false,
            }
        }

        match (self, other) {
            (Draft::Expense(d), Draft::Expense(o)) => {
                let filled = [
                    fill(&mut d.title, o.title),
                    fill(&mut d.amount, o.amount),
                    fill(&mut d.category, o.category),
                    fill(&mut d.date, o.date),
                    fill(&mut d.description, o.description),
                ];
                filled.contains(&true)
            }
            (Draft::ScheduledClass(d), Draft::ScheduledClass(o)) => {
                if d.days.as_ref().is_some_and(BTreeSet::is_empty) {
                    d.days = None;
                }
                let filled = [
                    fill(&mut d.subject_name, o.subject_name),
                    fill(&mut d.start_time, o.start_time),
                    fill(&mut d.duration_hours, o.duration_hours),
                    fill(&mut d.days, o.days),
                    fill(&mut d.color, o.color),
                ];
                filled.contains(&true)
            }
            (Draft::Task(d), Draft::Task(o)) => {
                let filled = [
                    fill(&mut d.title, o.title),
                    fill(&mut d.date, o.date),
                    fill(&mut d.importance, o.importance),
                    fill(&mut d.description, o.description),
                ];
                filled.contains(&true)
            }
            (Draft::StudyTask(d), Draft::StudyTask(o)) => {
                let filled = [
                    fill(&mut d.title, o.title),
                    fill(&mut d.subject, o.subject),
                    fill(&mut d.date, o.date),
                    fill(&mut d.importance, o.importance),
                ];
                filled.contains(&true)
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_draft_awaits_first_slot() {
        assert_eq!(
            Draft::new(DraftKind::Expense).next_pending(),
            PendingField::Expense(ExpenseField::Title)
        );
        assert_eq!(
            Draft::new(DraftKind::ScheduledClass).next_pending(),
            PendingField::ScheduledClass(ClassField::SubjectName)
        );
        assert_eq!(
            Draft::new(DraftKind::Task).next_pending(),
            PendingField::Task(TaskField::Title)
        );
        assert_eq!(
            Draft::new(DraftKind::StudyTask).next_pending(),
            PendingField::StudyTask(StudyTaskField::Title)
        );
    }

    #[test]
    fn test_first_missing_slot_skips_filled_ones() {
        let draft = Draft::ScheduledClass(ClassDraft {
            subject_name: Some("Physics".to_string()),
            start_time: NaiveTime::from_hms_opt(9, 0, 0),
            ..Default::default()
        });
        assert_eq!(
            draft.next_pending(),
            PendingField::ScheduledClass(ClassField::Days)
        );
    }

    #[test]
    fn test_empty_day_set_counts_as_missing() {
        let draft = Draft::ScheduledClass(ClassDraft {
            subject_name: Some("Physics".to_string()),
            days: Some(BTreeSet::new()),
            start_time: NaiveTime::from_hms_opt(9, 0, 0),
            duration_hours: Some(1.0),
            color: None,
        });
        assert!(!draft.is_complete());
    }

    #[test]
    fn test_complete_expense() {
        let draft = Draft::Expense(ExpenseDraft {
            title: Some("Lunch".to_string()),
            amount: Some(Decimal::new(1550, 2)),
            category: Some(Category::Food),
            date: None,
            description: None,
        });
        assert!(draft.is_complete());
    }

    #[test]
    fn test_menu_values_round_trip() {
        for kind in [
            DraftKind::Expense,
            DraftKind::ScheduledClass,
            DraftKind::Task,
            DraftKind::StudyTask,
        ] {
            assert_eq!(DraftKind::from_menu_value(kind.menu_value()), Some(kind));
        }
    }

    #[test]
    fn test_fill_missing_keeps_answered_slots() {
        let mut live = Draft::Expense(ExpenseDraft {
            title: Some("Concert tickets".to_string()),
            ..Default::default()
        });
        let seeded = Draft::Expense(ExpenseDraft {
            title: Some("Expense".to_string()),
            amount: Some(Decimal::new(4200, 2)),
            category: Some(Category::Entertainment),
            ..Default::default()
        });

        assert!(live.fill_missing_from(seeded));
        match &live {
            Draft::Expense(d) => {
                assert_eq!(d.title.as_deref(), Some("Concert tickets"));
                assert_eq!(d.amount, Some(Decimal::new(4200, 2)));
                assert_eq!(d.category, Some(Category::Entertainment));
            }
            other => panic!("unexpected draft {:?}", other),
        }

        assert!(!live.fill_missing_from(Draft::new(DraftKind::Expense)));
        assert!(!live.fill_missing_from(Draft::new(DraftKind::Task)));
    }
}
