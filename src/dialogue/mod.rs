//! Dialogue controller
//!
//! One state machine drives both the guided wizard and free-text entry:
//!
//! Idle → {Expense, ScheduledClass, Task, StudyTask} × PendingField → Confirm → Idle
//!
//! A menu click starts an empty draft of the chosen variant. Typed text is
//! classified; when it names a record intent every extractor runs once and
//! the recovered slots seed a fresh draft, which then continues from its
//! first missing slot exactly as the wizard would. Answers to a pending slot
//! are validated before they are stored, and a rejected answer re-prompts
//! without advancing.

pub mod prompts;

use crate::classifier::{Intent, IntentClassifier, SmallTalk};
use crate::commit::{self, pick_color};
use crate::draft::{
    ClassDraft, ClassField, Draft, DraftKind, ExpenseDraft, ExpenseField, PendingField,
    StudyTaskDraft, StudyTaskField, TaskDraft, TaskField,
};
use crate::extract::{self, schedule::MAX_DURATION_HOURS, NavigationTarget};
use crate::models::{Category, Clock, Importance, Message, UserInput, Weekday};
use crate::pacing::Staged;
use crate::records::{Navigator, RecordStore};
use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

const YES_WORDS: &[&str] = &["yes", "y", "yep", "yeah", "sure", "ok", "okay", "confirm", "save"];
const NO_WORDS: &[&str] = &["no", "n", "nope", "cancel", "discard", "stop"];

/// Value that returns to the main menu from anywhere
pub const MENU_VALUE: &str = "menu";

/// A user answer to the pending slot, before validation
enum Answer {
    Text(String),
    Choice(Vec<String>),
}

impl Answer {
    /// Single-valued view: the typed text, or the first picked option
    fn single(&self) -> &str {
        match self {
            Answer::Text(text) => text.trim(),
            Answer::Choice(values) => values.first().map(|v| v.trim()).unwrap_or(""),
        }
    }
}

/// Why an answer was not stored. Carries the corrective text.
struct Rejected(&'static str);

pub struct DialogueController {
    records: Arc<dyn RecordStore>,
    navigator: Arc<dyn Navigator>,
    clock: Arc<dyn Clock>,
    draft: Option<Draft>,
}

impl DialogueController {
    pub fn new(
        records: Arc<dyn RecordStore>,
        navigator: Arc<dyn Navigator>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            records,
            navigator,
            clock,
            draft: None,
        }
    }

    pub fn draft(&self) -> Option<&Draft> {
        self.draft.as_ref()
    }

    /// The slot currently awaited, derived from the live draft
    pub fn pending(&self) -> PendingField {
        self.draft
            .as_ref()
            .map_or(PendingField::None, Draft::next_pending)
    }

    /// Opening turn of a new conversation
    pub fn start(&self) -> Vec<Staged> {
        vec![Staged::now(prompts::greeting()), Staged::short(prompts::main_menu())]
    }

    pub async fn handle(&mut self, input: UserInput) -> Vec<Staged> {
        debug!(input = %input, pending = ?self.pending(), "Handling input");
        let mut out = Vec::new();

        match input {
            UserInput::Menu(value) => self.on_menu(&value, &mut out).await,
            UserInput::Choice(values) => self.on_choice(values, &mut out).await,
            UserInput::Text(text) => self.on_text(&text, &mut out).await,
            UserInput::Confirm => self.on_confirm(&mut out).await,
            UserInput::Cancel => self.on_cancel(&mut out),
        }

        out
    }

    //
    // ================= Input Kinds =================
    //

    async fn on_menu(&mut self, value: &str, out: &mut Vec<Staged>) {
        if value.trim().eq_ignore_ascii_case(MENU_VALUE) {
            self.draft = None;
            out.push(Staged::short(prompts::main_menu()));
            return;
        }

        match DraftKind::from_menu_value(value) {
            Some(kind) => {
                self.replace_draft(self.blank_draft(kind));
                out.push(Staged::short(prompts::started(kind)));
                self.advance(out).await;
            }
            None => {
                out.push(Staged::short(prompts::unknown_option(value)));
                out.push(Staged::short(prompts::main_menu()));
            }
        }
    }

    async fn on_choice(&mut self, values: Vec<String>, out: &mut Vec<Staged>) {
        match self.pending() {
            PendingField::None => {
                // A main-menu option sent as a choice is still a menu pick
                match values.first() {
                    Some(value) if DraftKind::from_menu_value(value).is_some() => {
                        let value = value.clone();
                        self.on_menu(&value, out).await;
                    }
                    _ => {
                        out.push(Staged::short(prompts::not_understood()));
                        out.push(Staged::short(prompts::main_menu()));
                    }
                }
            }
            PendingField::Confirm => match values.first().map(|v| v.trim().to_lowercase()) {
                Some(v) if v == "confirm" => self.on_confirm(out).await,
                Some(v) if v == "cancel" => self.on_cancel(out),
                _ => self.reshow_card(out),
            },
            pending => self.on_answer(pending, Answer::Choice(values), out).await,
        }
    }

    async fn on_text(&mut self, text: &str, out: &mut Vec<Staged>) {
        let pending = self.pending();

        if pending == PendingField::Confirm {
            let word = extract::tokens(text).into_iter().next().unwrap_or_default();
            if YES_WORDS.contains(&word.as_str()) {
                self.on_confirm(out).await;
            } else if NO_WORDS.contains(&word.as_str()) {
                self.on_cancel(out);
            } else {
                self.reshow_card(out);
            }
            return;
        }

        let intent = IntentClassifier::classify(text);
        info!(intent = ?intent, pending = ?pending, "Intent classified");

        if let Intent::Navigation(target) = &intent {
            self.navigate(target, out);
            if pending != PendingField::None {
                self.advance(out).await;
            }
            return;
        }

        if pending == PendingField::None {
            match intent.draft_kind() {
                Some(kind) => self.absorb(kind, text, out).await,
                None => self.small_talk(&intent, text, out).await,
            }
            return;
        }

        // Mid-wizard: a different record intent replaces the draft, the same
        // intent fills whatever slots the sentence carries, help is answered
        // in place, anything else is the answer to the pending slot
        let current = self.draft.as_ref().map(Draft::kind);
        match intent {
            Intent::SmallTalk(SmallTalk::Help) => {
                out.push(Staged::short(prompts::help()));
                self.advance(out).await;
            }
            _ => match intent.draft_kind() {
                Some(kind) if Some(kind) != current => self.absorb(kind, text, out).await,
                Some(kind) => {
                    if self.merge_from_text(kind, text).await {
                        out.push(Staged::short(prompts::merged(kind)));
                        self.advance(out).await;
                    } else {
                        self.on_answer(pending, Answer::Text(text.to_string()), out).await;
                    }
                }
                None => self.on_answer(pending, Answer::Text(text.to_string()), out).await,
            },
        }
    }

    async fn on_confirm(&mut self, out: &mut Vec<Staged>) {
        if self.pending() != PendingField::Confirm {
            out.push(Staged::short(prompts::nothing_to_confirm()));
            self.advance(out).await;
            return;
        }

        // Taken before the call so the draft is gone whatever the outcome
        let Some(draft) = self.draft.take() else {
            return;
        };
        let kind = draft.kind();
        let (message, record_id) =
            commit::commit_draft(draft, self.records.as_ref(), self.clock.today()).await;

        match &record_id {
            Some(id) => info!(kind = ?kind, record_id = %id, "Draft committed"),
            None => warn!(kind = ?kind, "Draft discarded after failed commit"),
        }

        out.push(Staged::short(message));
        out.push(Staged::long(prompts::main_menu()));
    }

    fn on_cancel(&mut self, out: &mut Vec<Staged>) {
        if let Some(draft) = self.draft.take() {
            info!(kind = ?draft.kind(), "Draft cancelled");
            out.push(Staged::short(prompts::cancelled()));
        }
        out.push(Staged::long(prompts::main_menu()));
    }

    //
    // ================= Drafts =================
    //

    fn replace_draft(&mut self, draft: Draft) {
        if let Some(previous) = self.draft.replace(draft) {
            debug!(kind = ?previous.kind(), "Discarding incomplete draft");
        }
    }

    /// Empty draft for a menu pick. Expenses are dated today up front.
    fn blank_draft(&self, kind: DraftKind) -> Draft {
        match Draft::new(kind) {
            Draft::Expense(d) => Draft::Expense(ExpenseDraft {
                date: Some(self.clock.today()),
                ..d
            }),
            other => other,
        }
    }

    /// Build a fresh draft from one utterance, running every extractor once
    async fn seed_from_text(&self, kind: DraftKind, text: &str) -> Draft {
        let today = self.clock.today();

        match kind {
            DraftKind::Expense => Draft::Expense(ExpenseDraft {
                title: Some(extract::extract_expense_title(text)),
                amount: extract::extract_amount(text),
                category: Some(extract::extract_category(text)),
                date: Some(extract::extract_date(text, today)),
                description: None,
            }),
            DraftKind::ScheduledClass => Draft::ScheduledClass(ClassDraft {
                subject_name: extract::extract_subject_name(text),
                start_time: extract::extract_time(text),
                duration_hours: extract::extract_duration_hours(text),
                days: extract::extract_weekdays(text),
                color: None,
            }),
            DraftKind::Task => Draft::Task(TaskDraft {
                title: extract::extract_task_title(text),
                date: Some(extract::extract_date(text, today)),
                importance: Some(extract::extract_importance(text)),
                description: None,
            }),
            DraftKind::StudyTask => {
                let known: Vec<String> = self.known_subjects().await.into_iter().collect();
                Draft::StudyTask(StudyTaskDraft {
                    title: extract::extract_task_title(text),
                    subject: extract::extract_study_subject(text, &known),
                    date: Some(extract::extract_date(text, today)),
                    importance: Some(extract::extract_importance(text)),
                })
            }
        }
    }

    async fn absorb(&mut self, kind: DraftKind, text: &str, out: &mut Vec<Staged>) {
        let draft = self.seed_from_text(kind, text).await;
        info!(kind = ?kind, pending = ?draft.next_pending(), "Draft absorbed from text");
        self.replace_draft(draft);
        out.push(Staged::short(prompts::absorbed(kind)));
        self.advance(out).await;
    }

    /// Fill the live draft's empty slots from one utterance. Answered slots
    /// are kept. Returns false when the sentence added nothing.
    async fn merge_from_text(&mut self, kind: DraftKind, text: &str) -> bool {
        let seeded = self.seed_from_text(kind, text).await;
        let Some(draft) = self.draft.as_mut() else {
            return false;
        };
        let filled = draft.fill_missing_from(seeded);
        if filled {
            info!(kind = ?kind, pending = ?draft.next_pending(), "Draft merged from text");
        }
        filled
    }

    /// Prompt for the first missing slot, or show the card once complete
    async fn advance(&mut self, out: &mut Vec<Staged>) {
        match self.pending() {
            PendingField::None => out.push(Staged::short(prompts::main_menu())),
            PendingField::Confirm => {
                self.assign_color().await;
                self.reshow_card(out);
            }
            pending => {
                let subjects = match pending {
                    PendingField::StudyTask(StudyTaskField::Subject) => self.known_subjects().await,
                    _ => BTreeSet::new(),
                };
                if let Some(prompt) = prompts::prompt_for(pending, &subjects) {
                    out.push(Staged::short(prompt));
                }
            }
        }
    }

    fn reshow_card(&self, out: &mut Vec<Staged>) {
        if let Some(draft) = &self.draft {
            if draft.is_complete() {
                out.push(Staged::short(commit::render_confirmation(draft)));
            }
        }
    }

    /// Pick the class colour before the card is shown, so the card and the
    /// commit carry the same value
    async fn assign_color(&mut self) {
        let needs_color = matches!(
            &self.draft,
            Some(Draft::ScheduledClass(ClassDraft { color: None, .. }))
        );
        if !needs_color {
            return;
        }

        let in_use = self.records.list_known_schedule_colors().await.unwrap_or_else(|e| {
            warn!(error = %e, "Could not load schedule colours");
            Default::default()
        });
        if let Some(Draft::ScheduledClass(class)) = &mut self.draft {
            class.color = Some(pick_color(&in_use));
        }
    }

    async fn known_subjects(&self) -> BTreeSet<String> {
        self.records.list_known_class_subjects().await.unwrap_or_else(|e| {
            warn!(error = %e, "Could not load class subjects");
            BTreeSet::new()
        })
    }

    //
    // ================= Slot Answers =================
    //

    async fn on_answer(&mut self, pending: PendingField, answer: Answer, out: &mut Vec<Staged>) {
        let today = self.clock.today();
        let Some(draft) = self.draft.as_mut() else {
            out.push(Staged::short(prompts::main_menu()));
            return;
        };

        match apply_answer(draft, pending, &answer, today) {
            Ok(()) => debug!(pending = ?pending, "Slot filled"),
            Err(Rejected(correction)) => {
                info!(pending = ?pending, "Answer rejected");
                out.push(Staged::short(Message::plain(correction)));
            }
        }
        self.advance(out).await;
    }

    //
    // ================= Small Talk & Navigation =================
    //

    fn navigate(&self, target: &NavigationTarget, out: &mut Vec<Staged>) {
        info!(route = %target.route, "Navigating");
        self.navigator.navigate(&target.route);
        out.push(Staged::short(prompts::navigating(&target.label, &target.route)));
    }

    async fn small_talk(&self, intent: &Intent, text: &str, out: &mut Vec<Staged>) {
        match intent {
            Intent::SmallTalk(SmallTalk::ScheduleQuery) => {
                out.push(Staged::short(self.answer_schedule_query(text).await));
            }
            Intent::SmallTalk(SmallTalk::Help) => out.push(Staged::short(prompts::help())),
            Intent::SmallTalk(SmallTalk::Thanks) => out.push(Staged::short(prompts::thanks())),
            Intent::SmallTalk(SmallTalk::Greeting) => {
                out.push(Staged::short(prompts::greeting()));
                out.push(Staged::short(prompts::main_menu()));
            }
            _ => {
                out.push(Staged::short(prompts::not_understood()));
                out.push(Staged::short(prompts::main_menu()));
            }
        }
    }

    /// Classes on the weekday named in the question, else on the day the
    /// question refers to ("tomorrow"), else today
    async fn answer_schedule_query(&self, text: &str) -> Message {
        let today = self.clock.today();
        let named_day = extract::extract_weekdays(text).and_then(|d| d.first().copied());
        let (day, is_today) = match named_day {
            Some(day) => (day, day == Weekday::from(today.weekday())),
            None => {
                let date = extract::extract_date(text, today);
                (Weekday::from(date.weekday()), date == today)
            }
        };

        let schedules = self.records.list_known_schedules().await.unwrap_or_else(|e| {
            warn!(error = %e, "Could not load schedules");
            Vec::new()
        });
        prompts::classes_on(day, is_today, &schedules)
    }
}

//
// ================= Validation =================
//

fn apply_answer(
    draft: &mut Draft,
    pending: PendingField,
    answer: &Answer,
    today: NaiveDate,
) -> Result<(), Rejected> {
    match (draft, pending) {
        (Draft::Expense(d), PendingField::Expense(field)) => match field {
            ExpenseField::Title => d.title = Some(non_empty(answer)?),
            ExpenseField::Category => d.category = Some(parse_category(answer.single())?),
            ExpenseField::Amount => d.amount = Some(parse_amount(answer.single())?),
        },
        (Draft::ScheduledClass(d), PendingField::ScheduledClass(field)) => match field {
            ClassField::SubjectName => d.subject_name = Some(non_empty(answer)?),
            ClassField::Days => d.days = Some(parse_days(answer)?),
            ClassField::StartTime => {
                d.start_time = Some(
                    extract::extract_time(answer.single())
                        .ok_or(Rejected("Please give a time like 9:00am or 14:30."))?,
                )
            }
            ClassField::DurationHours => d.duration_hours = Some(parse_duration(answer.single())?),
        },
        (Draft::Task(d), PendingField::Task(field)) => match field {
            TaskField::Title => d.title = Some(non_empty(answer)?),
            TaskField::DueDate => d.date = Some(parse_date(answer.single(), today)?),
            TaskField::Importance => d.importance = Some(parse_importance(answer.single())?),
        },
        (Draft::StudyTask(d), PendingField::StudyTask(field)) => match field {
            StudyTaskField::Title => d.title = Some(non_empty(answer)?),
            StudyTaskField::Subject => d.subject = Some(non_empty(answer)?),
            StudyTaskField::DueDate => d.date = Some(parse_date(answer.single(), today)?),
            StudyTaskField::Importance => d.importance = Some(parse_importance(answer.single())?),
        },
        // Pending is derived from the draft, so these never pair up
        (_, PendingField::None | PendingField::Confirm)
        | (Draft::Expense(_), _)
        | (Draft::ScheduledClass(_), _)
        | (Draft::Task(_), _)
        | (Draft::StudyTask(_), _) => {}
    }
    Ok(())
}

fn non_empty(answer: &Answer) -> Result<String, Rejected> {
    let value = match answer {
        Answer::Text(text) => text.trim().to_string(),
        Answer::Choice(values) => values
            .iter()
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .collect::<Vec<_>>()
            .join(", "),
    };
    if value.is_empty() {
        Err(Rejected("That can't be empty."))
    } else {
        Ok(value)
    }
}

fn parse_category(value: &str) -> Result<Category, Rejected> {
    Category::parse(value)
        .or_else(|| Some(extract::extract_category(value)).filter(|c| *c != Category::Other))
        .ok_or(Rejected("Please pick one of the listed categories."))
}

fn parse_amount(value: &str) -> Result<Decimal, Rejected> {
    let amount = extract::parse_amount_input(value)
        .or_else(|| extract::extract_amount(value))
        .ok_or(Rejected("I couldn't read that amount. Please enter a number like 12.50."))?;
    if amount <= Decimal::ZERO {
        return Err(Rejected("The amount has to be greater than zero."));
    }
    Ok(amount)
}

fn parse_days(answer: &Answer) -> Result<BTreeSet<Weekday>, Rejected> {
    let days: BTreeSet<Weekday> = match answer {
        Answer::Choice(values) => values
            .iter()
            .filter_map(|v| {
                Weekday::parse(v).or_else(|| extract::extract_weekdays(v)?.first().copied())
            })
            .collect(),
        Answer::Text(text) => extract::extract_weekdays(text).unwrap_or_default(),
    };
    if days.is_empty() {
        Err(Rejected("Please pick at least one day."))
    } else {
        Ok(days)
    }
}

fn parse_duration(value: &str) -> Result<f64, Rejected> {
    let hours = value
        .split_whitespace()
        .next()
        .and_then(|n| n.parse::<f64>().ok())
        .or_else(|| extract::extract_duration_hours(value))
        .ok_or(Rejected("Please give the length in hours, e.g. 1.5."))?;
    if !hours.is_finite() || hours <= 0.0 {
        return Err(Rejected("The duration has to be greater than zero."));
    }
    if hours > MAX_DURATION_HOURS {
        return Err(Rejected("A class can be at most 12 hours long."));
    }
    Ok(hours)
}

fn parse_date(value: &str, today: NaiveDate) -> Result<NaiveDate, Rejected> {
    extract::parse_date_input(value, today)
        .ok_or(Rejected("Please give a date as YYYY-MM-DD, or say today or tomorrow."))
}

fn parse_importance(value: &str) -> Result<Importance, Rejected> {
    Importance::parse(value).ok_or(Rejected("Please choose high, medium or low."))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commit::{card_fields, FAILURE_TEXT, PALETTE};
    use crate::models::{FixedClock, Presentation};
    use crate::records::{
        FailingRecordStore, InMemoryRecordStore, LoggingNavigator, NewExpense, NewScheduledClass,
    };
    use chrono::NaiveTime;
    use std::sync::Mutex;

    fn today() -> NaiveDate {
        // a Tuesday
        NaiveDate::from_ymd_opt(2026, 3, 10).unwrap()
    }

    fn controller_with(records: Arc<dyn RecordStore>) -> DialogueController {
        DialogueController::new(
            records,
            Arc::new(LoggingNavigator),
            Arc::new(FixedClock(today())),
        )
    }

    fn physics() -> NewScheduledClass {
        NewScheduledClass {
            subject_name: "Physics".to_string(),
            start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(10, 30, 0).unwrap(),
            days: [Weekday::Tuesday, Weekday::Thursday].into_iter().collect(),
            color: PALETTE[0].to_string(),
        }
    }

    fn text(s: &str) -> UserInput {
        UserInput::Text(s.to_string())
    }

    fn pick(values: &[&str]) -> UserInput {
        UserInput::Choice(values.iter().map(|v| v.to_string()).collect())
    }

    fn last(out: &[Staged]) -> &Message {
        &out.last().expect("at least one reply").message
    }

    #[derive(Default)]
    struct RecordingNavigator {
        routes: Mutex<Vec<String>>,
    }

    impl Navigator for RecordingNavigator {
        fn navigate(&self, route: &str) {
            self.routes.lock().unwrap().push(route.to_string());
        }
    }

    #[test]
    fn test_start_shows_main_menu() {
        let controller = controller_with(Arc::new(InMemoryRecordStore::new()));
        let out = controller.start();
        assert_eq!(last(&out).presentation, Presentation::MenuPrompt);
        assert_eq!(controller.pending(), PendingField::None);
    }

    #[tokio::test]
    async fn test_partial_class_prompts_for_days() {
        let mut controller = controller_with(Arc::new(InMemoryRecordStore::new()));
        let out = controller.handle(text("Add my Physics lecture")).await;

        assert_eq!(controller.pending(), PendingField::ScheduledClass(ClassField::Days));
        match controller.draft() {
            Some(Draft::ScheduledClass(d)) => {
                assert_eq!(d.subject_name.as_deref(), Some("Physics"))
            }
            other => panic!("unexpected draft {:?}", other),
        }

        let prompt = last(&out);
        assert_eq!(prompt.presentation, Presentation::ChoicePrompt);
        assert_eq!(prompt.payload["field"], "days");
    }

    #[tokio::test]
    async fn test_class_wizard_end_to_end() {
        let store = Arc::new(InMemoryRecordStore::new());
        let mut controller = controller_with(store.clone());

        controller.handle(UserInput::Menu("class".to_string())).await;
        assert_eq!(
            controller.pending(),
            PendingField::ScheduledClass(ClassField::SubjectName)
        );
        controller.handle(text("Physics")).await;
        controller.handle(pick(&["Mon", "Wed"])).await;
        controller.handle(text("9:00am")).await;
        let out = controller.handle(pick(&["1.5"])).await;

        assert_eq!(controller.pending(), PendingField::Confirm);
        let card = last(&out);
        assert_eq!(card.presentation, Presentation::ConfirmationCard);
        assert!(card.text.contains("End time: 10:30"));

        let out = controller.handle(UserInput::Confirm).await;
        assert_eq!(controller.pending(), PendingField::None);
        assert_eq!(last(&out).presentation, Presentation::MenuPrompt);

        let classes = store.classes().await;
        assert_eq!(classes.len(), 1);
        assert_eq!(classes[0].subject_name, "Physics");
        assert_eq!(classes[0].end_time, NaiveTime::from_hms_opt(10, 30, 0).unwrap());
        assert_eq!(
            classes[0].days,
            [Weekday::Monday, Weekday::Wednesday].into_iter().collect()
        );
        assert!(PALETTE.contains(&classes[0].color.as_str()));
    }

    #[tokio::test]
    async fn test_late_class_end_time_is_clamped() {
        let store = Arc::new(InMemoryRecordStore::new());
        let mut controller = controller_with(store.clone());

        controller
            .handle(text("add my Astronomy lab on Friday at 11pm for 2 hours"))
            .await;
        assert_eq!(controller.pending(), PendingField::Confirm);
        controller.handle(UserInput::Confirm).await;

        assert_eq!(store.classes().await[0].end_time, NaiveTime::from_hms_opt(23, 0, 0).unwrap());
    }

    #[tokio::test]
    async fn test_commit_failure_reports_once_and_resets() {
        let mut controller = controller_with(Arc::new(FailingRecordStore));
        controller.handle(text("I spent $15.50 on lunch")).await;
        assert_eq!(controller.pending(), PendingField::Confirm);

        let out = controller.handle(UserInput::Confirm).await;
        let failures = out
            .iter()
            .filter(|s| s.message.text == FAILURE_TEXT)
            .count();
        assert_eq!(failures, 1);
        assert!(controller.draft().is_none());
        assert_eq!(last(&out).presentation, Presentation::MenuPrompt);
    }

    #[tokio::test]
    async fn test_absorption_is_idempotent_across_sessions() {
        let utterance = "Add my Calculus class on Monday at 2pm for 2 hours";
        let mut first = controller_with(Arc::new(InMemoryRecordStore::new()));
        let mut second = controller_with(Arc::new(InMemoryRecordStore::new()));
        first.handle(text(utterance)).await;
        second.handle(text(utterance)).await;

        let without_color = |c: &DialogueController| match c.draft().cloned() {
            Some(Draft::ScheduledClass(d)) => ClassDraft { color: None, ..d },
            other => panic!("unexpected draft {:?}", other),
        };
        assert_eq!(without_color(&first), without_color(&second));
        assert_eq!(first.pending(), PendingField::Confirm);
    }

    #[tokio::test]
    async fn test_card_matches_commit_payload() {
        let store = Arc::new(InMemoryRecordStore::new());
        let mut controller = controller_with(store.clone());
        controller.handle(text("I spent $15.50 on lunch")).await;

        let fields = card_fields(controller.draft().unwrap());
        controller.handle(UserInput::Confirm).await;

        let committed: NewExpense = store.expenses().await.remove(0);
        assert!(fields.contains(&("Amount", committed.amount.to_string())));
        assert!(fields.contains(&("Category", committed.category.to_string())));
        assert!(fields.contains(&("Date", committed.date.to_string())));
        assert!(fields.contains(&("Description", committed.description.clone())));
        assert_eq!(committed.amount.to_string(), "15.50");
        assert_eq!(committed.description, "Lunch");
    }

    #[tokio::test]
    async fn test_invalid_amount_does_not_advance() {
        let mut controller = controller_with(Arc::new(InMemoryRecordStore::new()));
        controller.handle(UserInput::Menu("expense".to_string())).await;
        controller.handle(text("Concert tickets")).await;
        controller.handle(pick(&["entertainment"])).await;
        assert_eq!(controller.pending(), PendingField::Expense(ExpenseField::Amount));

        for bad in ["0", "-3", "lots"] {
            let out = controller.handle(text(bad)).await;
            assert_eq!(controller.pending(), PendingField::Expense(ExpenseField::Amount));
            assert_eq!(out.len(), 2, "{}", bad);
            assert_eq!(last(&out).presentation, Presentation::InputPrompt);
        }

        controller.handle(text("42")).await;
        assert_eq!(controller.pending(), PendingField::Confirm);
    }

    #[tokio::test]
    async fn test_invalid_duration_does_not_advance() {
        let mut controller = controller_with(Arc::new(InMemoryRecordStore::new()));
        controller.handle(UserInput::Menu("class".to_string())).await;
        controller.handle(text("Physics")).await;
        controller.handle(pick(&["Mon"])).await;
        controller.handle(text("9:00am")).await;
        assert_eq!(
            controller.pending(),
            PendingField::ScheduledClass(ClassField::DurationHours)
        );

        for bad in ["0", "-1", "soon", "1e9", "100000000", "13"] {
            let out = controller.handle(text(bad)).await;
            assert_eq!(
                controller.pending(),
                PendingField::ScheduledClass(ClassField::DurationHours),
                "{}",
                bad
            );
            assert_eq!(out.len(), 2, "{}", bad);
        }

        let out = controller.handle(text("12")).await;
        assert_eq!(controller.pending(), PendingField::Confirm);
        assert!(last(&out).text.contains("End time: 21:00"));
    }

    #[tokio::test]
    async fn test_same_intent_sentence_fills_open_slots() {
        let mut controller = controller_with(Arc::new(InMemoryRecordStore::new()));
        controller.handle(UserInput::Menu("expense".to_string())).await;
        controller.handle(text("I spent $15.50 on lunch")).await;

        match controller.draft() {
            Some(Draft::Expense(d)) => {
                assert_eq!(d.title.as_deref(), Some("Lunch"));
                assert_eq!(d.amount.map(|a| a.to_string()).as_deref(), Some("15.50"));
                assert_eq!(d.category, Some(Category::Food));
            }
            other => panic!("unexpected draft {:?}", other),
        }
        assert_eq!(controller.pending(), PendingField::Confirm);
    }

    #[tokio::test]
    async fn test_same_intent_sentence_keeps_answered_slots() {
        let mut controller = controller_with(Arc::new(InMemoryRecordStore::new()));
        controller.handle(UserInput::Menu("expense".to_string())).await;
        controller.handle(text("Concert tickets")).await;
        controller.handle(pick(&["entertainment"])).await;
        controller.handle(text("it cost $42")).await;

        match controller.draft() {
            Some(Draft::Expense(d)) => {
                assert_eq!(d.title.as_deref(), Some("Concert tickets"));
                assert_eq!(d.category, Some(Category::Entertainment));
                assert_eq!(d.amount, Some(Decimal::from(42)));
            }
            other => panic!("unexpected draft {:?}", other),
        }
        assert_eq!(controller.pending(), PendingField::Confirm);
    }

    #[tokio::test]
    async fn test_new_intent_replaces_incomplete_draft() {
        let mut controller = controller_with(Arc::new(InMemoryRecordStore::new()));
        controller.handle(UserInput::Menu("expense".to_string())).await;
        controller
            .handle(text("remind me to finish my history essay"))
            .await;
        assert_eq!(controller.draft().map(Draft::kind), Some(DraftKind::StudyTask));

        controller.handle(UserInput::Menu("task".to_string())).await;
        assert_eq!(controller.pending(), PendingField::Task(TaskField::Title));
    }

    #[tokio::test]
    async fn test_task_wizard_with_typed_confirmation() {
        let store = Arc::new(InMemoryRecordStore::new());
        let mut controller = controller_with(store.clone());

        controller.handle(UserInput::Menu("task".to_string())).await;
        controller.handle(text("Call the bank")).await;
        let out = controller.handle(text("next week")).await;
        assert_eq!(controller.pending(), PendingField::Task(TaskField::DueDate));
        assert_eq!(out.len(), 2);

        controller.handle(text("2026-03-12")).await;
        controller.handle(pick(&["high"])).await;
        assert_eq!(controller.pending(), PendingField::Confirm);

        controller.handle(text("yes please")).await;
        let tasks = store.tasks().await;
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].title, "Call the bank");
        assert_eq!(tasks[0].date, NaiveDate::from_ymd_opt(2026, 3, 12).unwrap());
        assert_eq!(tasks[0].importance, Importance::High);
    }

    #[tokio::test]
    async fn test_free_text_task_goes_straight_to_confirm() {
        let mut controller = controller_with(Arc::new(InMemoryRecordStore::new()));
        controller.handle(text("remind me to call mom tomorrow")).await;

        match controller.draft() {
            Some(Draft::Task(d)) => {
                assert_eq!(d.title.as_deref(), Some("Call mom"));
                assert_eq!(d.date, NaiveDate::from_ymd_opt(2026, 3, 11));
                assert_eq!(d.importance, Some(Importance::Medium));
            }
            other => panic!("unexpected draft {:?}", other),
        }
        assert_eq!(controller.pending(), PendingField::Confirm);
    }

    #[tokio::test]
    async fn test_study_task_subject_choices_come_from_timetable() {
        let store = Arc::new(InMemoryRecordStore::with_classes(vec![physics()]));
        let mut controller = controller_with(store.clone());

        controller.handle(UserInput::Menu("study_task".to_string())).await;
        let out = controller.handle(text("Problem set 3")).await;
        let labels: Vec<String> = last(&out).options().into_iter().map(|o| o.label).collect();
        assert_eq!(labels, vec!["Physics"]);

        controller.handle(pick(&["Physics"])).await;
        controller.handle(text("tomorrow")).await;
        controller.handle(pick(&["low"])).await;
        controller.handle(UserInput::Confirm).await;

        let tasks = store.study_tasks().await;
        assert_eq!(tasks[0].subject, "Physics");
        assert_eq!(tasks[0].importance, Importance::Low);
    }

    #[tokio::test]
    async fn test_study_subject_falls_back_to_general() {
        let mut controller = controller_with(Arc::new(InMemoryRecordStore::new()));
        controller.handle(UserInput::Menu("study_task".to_string())).await;
        let out = controller.handle(text("Read chapter 4")).await;
        let values: Vec<String> = last(&out).options().into_iter().map(|o| o.value).collect();
        assert_eq!(values, vec![prompts::FALLBACK_SUBJECT]);
    }

    #[tokio::test]
    async fn test_cancel_discards_draft() {
        let store = Arc::new(InMemoryRecordStore::new());
        let mut controller = controller_with(store.clone());
        controller.handle(text("I spent $15.50 on lunch")).await;

        let out = controller.handle(UserInput::Cancel).await;
        assert!(controller.draft().is_none());
        assert_eq!(last(&out).presentation, Presentation::MenuPrompt);
        assert!(store.expenses().await.is_empty());
    }

    #[tokio::test]
    async fn test_schedule_question_answered_without_draft() {
        let mut controller =
            controller_with(Arc::new(InMemoryRecordStore::with_classes(vec![physics()])));
        let out = controller.handle(text("what classes do I have today?")).await;

        assert!(controller.draft().is_none());
        assert_eq!(
            last(&out).text,
            "Here's what you have today:\n- Physics 09:00-10:30"
        );
    }

    #[tokio::test]
    async fn test_navigation_keeps_pending_draft() {
        let navigator = Arc::new(RecordingNavigator::default());
        let mut controller = DialogueController::new(
            Arc::new(InMemoryRecordStore::new()),
            navigator.clone(),
            Arc::new(FixedClock(today())),
        );

        controller.handle(UserInput::Menu("class".to_string())).await;
        controller.handle(text("show my schedule")).await;

        assert_eq!(*navigator.routes.lock().unwrap(), vec!["/schedule".to_string()]);
        assert_eq!(
            controller.pending(),
            PendingField::ScheduledClass(ClassField::SubjectName)
        );
    }

    #[tokio::test]
    async fn test_unclassified_text_stays_idle() {
        let mut controller = controller_with(Arc::new(InMemoryRecordStore::new()));
        let out = controller.handle(text("the weather is nice")).await;
        assert!(controller.draft().is_none());
        assert_eq!(out[0].message.text, prompts::not_understood().text);
    }

    #[tokio::test]
    async fn test_confirm_without_draft() {
        let mut controller = controller_with(Arc::new(InMemoryRecordStore::new()));
        let out = controller.handle(UserInput::Confirm).await;
        assert_eq!(out[0].message.text, prompts::nothing_to_confirm().text);
        assert_eq!(last(&out).presentation, Presentation::MenuPrompt);
    }
}
