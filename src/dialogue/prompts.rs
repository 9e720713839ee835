//! Menus, choice lists and prompt texts
//!
//! Every assistant turn the wizard can produce is built here, so both
//! presentation surfaces render exactly the same conversation.

use crate::draft::{ClassField, DraftKind, ExpenseField, PendingField, StudyTaskField, TaskField};
use crate::models::{
    Category, Importance, KnownSchedule, MenuOption, Message, Presentation, Weekday,
};
use serde_json::json;
use std::collections::BTreeSet;

pub const FALLBACK_SUBJECT: &str = "General";

const DURATION_CHOICES: &[(&str, &str)] = &[
    ("30 minutes", "0.5"),
    ("1 hour", "1"),
    ("1.5 hours", "1.5"),
    ("2 hours", "2"),
    ("3 hours", "3"),
];

pub fn main_menu_options() -> Vec<MenuOption> {
    vec![
        MenuOption::new("Add an expense", DraftKind::Expense.menu_value())
            .described("Track something you spent"),
        MenuOption::new("Schedule a class", DraftKind::ScheduledClass.menu_value())
            .described("Add a recurring class to your timetable"),
        MenuOption::new("Add a task", DraftKind::Task.menu_value())
            .described("Create a to-do with a due date"),
        MenuOption::new("Add a study task", DraftKind::StudyTask.menu_value())
            .described("Plan coursework for one of your subjects"),
    ]
}

pub fn main_menu() -> Message {
    Message::assistant(
        "What would you like to do? Pick an option or just tell me in your own words.",
        Presentation::MenuPrompt,
        json!({ "options": main_menu_options() }),
    )
}

pub fn greeting() -> Message {
    Message::plain("Hi! I can log expenses, schedule classes and keep track of your tasks.")
}

pub fn category_options() -> Vec<MenuOption> {
    Category::ALL
        .iter()
        .map(|c| MenuOption::new(c.to_string(), c.to_string().to_lowercase()))
        .collect()
}

pub fn importance_options() -> Vec<MenuOption> {
    Importance::ALL
        .iter()
        .map(|i| MenuOption::new(i.to_string(), i.to_string().to_lowercase()))
        .collect()
}

pub fn day_options() -> Vec<MenuOption> {
    Weekday::ALL
        .iter()
        .map(|d| MenuOption::new(d.to_string(), d.short()))
        .collect()
}

pub fn duration_options() -> Vec<MenuOption> {
    DURATION_CHOICES
        .iter()
        .map(|(label, value)| MenuOption::new(*label, *value))
        .collect()
}

/// Known class subjects, or a lone "General" when none exist yet
pub fn subject_options(known: &BTreeSet<String>) -> Vec<MenuOption> {
    if known.is_empty() {
        return vec![MenuOption::new(FALLBACK_SUBJECT, FALLBACK_SUBJECT)];
    }
    known
        .iter()
        .map(|s| MenuOption::new(s.clone(), s.clone()))
        .collect()
}

fn input(field: &str, text: &str) -> Message {
    Message::assistant(text, Presentation::InputPrompt, json!({ "field": field }))
}

fn choice(field: &str, text: &str, options: Vec<MenuOption>, multi: bool) -> Message {
    Message::assistant(
        text,
        Presentation::ChoicePrompt,
        json!({ "field": field, "options": options, "multi": multi }),
    )
}

/// The prompt for one pending slot. `Confirm` and `None` have no slot
/// prompt and return `None`.
pub fn prompt_for(pending: PendingField, known_subjects: &BTreeSet<String>) -> Option<Message> {
    let message = match pending {
        PendingField::Expense(field) => match field {
            ExpenseField::Title => input("title", "What did you spend money on?"),
            ExpenseField::Category => choice(
                "category",
                "Which category does it belong to?",
                category_options(),
                false,
            ),
            ExpenseField::Amount => input("amount", "How much was it?"),
        },
        PendingField::ScheduledClass(field) => match field {
            ClassField::SubjectName => input("subject_name", "What's the name of the class?"),
            ClassField::Days => choice(
                "days",
                "Which days does it run? Pick all that apply.",
                day_options(),
                true,
            ),
            ClassField::StartTime => input(
                "start_time",
                "What time does it start? (e.g. 9:00am or 14:30)",
            ),
            ClassField::DurationHours => choice(
                "duration_hours",
                "How long is each class?",
                duration_options(),
                false,
            ),
        },
        PendingField::Task(field) => match field {
            TaskField::Title => input("title", "What do you need to do?"),
            TaskField::DueDate => input(
                "date",
                "When is it due? (YYYY-MM-DD, today or tomorrow)",
            ),
            TaskField::Importance => choice(
                "importance",
                "How important is it?",
                importance_options(),
                false,
            ),
        },
        PendingField::StudyTask(field) => match field {
            StudyTaskField::Title => input("title", "What do you need to study or finish?"),
            StudyTaskField::Subject => choice(
                "subject",
                "Which subject is it for?",
                subject_options(known_subjects),
                false,
            ),
            StudyTaskField::DueDate => input(
                "date",
                "When is it due? (YYYY-MM-DD, today or tomorrow)",
            ),
            StudyTaskField::Importance => choice(
                "importance",
                "How important is it?",
                importance_options(),
                false,
            ),
        },
        PendingField::Confirm | PendingField::None => return None,
    };
    Some(message)
}

pub fn started(kind: DraftKind) -> Message {
    Message::plain(format!("Sure, let's add a new {}.", kind.label()))
}

pub fn absorbed(kind: DraftKind) -> Message {
    Message::plain(format!(
        "Got it, I've started a {} from what you said.",
        kind.label()
    ))
}

pub fn merged(kind: DraftKind) -> Message {
    Message::plain(format!("Thanks, I've added that to your {}.", kind.label()))
}

pub fn cancelled() -> Message {
    Message::plain("No problem, I've discarded that.")
}

pub fn not_understood() -> Message {
    Message::plain(
        "Sorry, I didn't quite catch that. You can pick an option below or describe what you'd like to add.",
    )
}

pub fn unknown_option(value: &str) -> Message {
    Message::plain(format!("I don't have an option called \"{}\".", value))
}

pub fn nothing_to_confirm() -> Message {
    Message::plain("There's nothing waiting for confirmation right now.")
}

pub fn help() -> Message {
    Message::plain(
        "You can tell me things like \"I spent $12 on lunch\", \"add my Physics lecture on Monday at 9am for 2 hours\", \"remind me to call the bank tomorrow\" or \"remind me to finish my History essay\". Or pick an option from the menu.",
    )
}

pub fn thanks() -> Message {
    Message::plain("You're welcome!")
}

pub fn navigating(label: &str, route: &str) -> Message {
    Message::assistant(
        format!("Opening your {}.", label),
        Presentation::PlainText,
        json!({ "route": route }),
    )
}

/// Answer to "what classes do I have today" from the known timetable
pub fn classes_on(day: Weekday, is_today: bool, schedules: &[KnownSchedule]) -> Message {
    let mut classes: Vec<&KnownSchedule> = schedules
        .iter()
        .filter(|s| s.days.contains(&day))
        .collect();
    classes.sort_by_key(|s| s.start_time);

    let when = if is_today {
        "today".to_string()
    } else {
        format!("on {}", day)
    };

    if classes.is_empty() {
        return Message::plain(format!("You don't have any classes {}.", when));
    }

    let mut text = format!("Here's what you have {}:", when);
    for class in &classes {
        text.push_str(&format!(
            "\n- {} {}-{}",
            class.subject_name,
            class.start_time.format("%H:%M"),
            class.end_time.format("%H:%M")
        ));
    }
    Message::plain(text)
}
