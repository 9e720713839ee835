//! Slot extractors
//!
//! Pure functions from a raw utterance to an optional typed value. None of
//! them look at conversation state or fail loudly; a miss just leaves the
//! slot for the wizard to ask about.

pub mod amount;
pub mod category;
pub mod schedule;

pub use amount::{extract_amount, parse_amount_input};
pub use category::{extract_category, extract_expense_title, is_fallback_title};
pub use schedule::{extract_duration_hours, extract_subject_name, extract_time, extract_weekdays};

use crate::models::Importance;
use chrono::{Duration, NaiveDate};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

//
// ================= Dates =================
//

const RELATIVE_DATE_WORDS: &[&str] = &["yesterday", "today", "tomorrow", "tonight"];

pub(crate) fn is_relative_date_word(word: &str) -> bool {
    RELATIVE_DATE_WORDS.contains(&word)
}

/// "yesterday" / "tomorrow" relative to `today`; anything else is today
pub fn extract_date(text: &str, today: NaiveDate) -> NaiveDate {
    let words = tokens(text);
    if words.iter().any(|w| w == "yesterday") {
        today - Duration::days(1)
    } else if words.iter().any(|w| w == "tomorrow") {
        today + Duration::days(1)
    } else {
        today
    }
}

/// Answer to the due-date prompt: `YYYY-MM-DD` or a relative word
pub fn parse_date_input(text: &str, today: NaiveDate) -> Option<NaiveDate> {
    let trimmed = text.trim();
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Some(date);
    }
    match trimmed.to_lowercase().as_str() {
        "today" => Some(today),
        "tomorrow" => Some(today + Duration::days(1)),
        "yesterday" => Some(today - Duration::days(1)),
        _ => None,
    }
}

//
// ================= Importance =================
//

const IMPORTANCE_BUCKETS: &[(Importance, &[&str])] = &[
    (Importance::High, &["urgent", "critical", "important", "high", "asap"]),
    (Importance::Medium, &["medium", "moderate", "normal"]),
    (Importance::Low, &["low", "minor", "optional", "whenever"]),
];

/// First bucket with a keyword hit wins; no hit means Medium
pub fn extract_importance(text: &str) -> Importance {
    let words = tokens(text);
    IMPORTANCE_BUCKETS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|kw| words.iter().any(|w| w == kw)))
        .map(|(importance, _)| *importance)
        .unwrap_or_default()
}

fn is_importance_word(word: &str) -> bool {
    IMPORTANCE_BUCKETS
        .iter()
        .any(|(_, keywords)| keywords.contains(&word))
        || matches!(word, "priority" | "urgently")
}

//
// ================= Navigation =================
//

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationTarget {
    pub label: String,
    pub route: String,
}

/// Keyword → (label, route); checked in table order against the captured noun
const ROUTE_TABLE: &[(&str, &str, &str)] = &[
    ("study materials", "study materials", "/study"),
    ("materials", "study materials", "/study"),
    ("schedule", "schedule", "/schedule"),
    ("timetable", "schedule", "/schedule"),
    ("finance", "finance", "/finance"),
    ("finances", "finance", "/finance"),
    ("expenses", "finance", "/finance"),
    ("tasks", "tasks", "/tasks"),
    ("todos", "tasks", "/tasks"),
    ("to-dos", "tasks", "/tasks"),
    ("dashboard", "dashboard", "/dashboard"),
    ("home", "dashboard", "/dashboard"),
];

lazy_static! {
    static ref NAVIGATION: Regex = Regex::new(
        r"(?i)\b(?:show(?:\s+me)?|open(?:\s+up)?|go\s+to|view|take\s+me\s+to)\s+(?:my\s+|the\s+)?(study\s+materials|materials|schedule|timetable|finances?|expenses|tasks|to-?dos|dashboard|home)\b"
    )
    .unwrap();
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
}

/// A "show/open/go to/view <area>" request; first syntactic match wins
pub fn extract_navigation(text: &str) -> Option<NavigationTarget> {
    let caps = NAVIGATION.captures(text)?;
    let noun = WHITESPACE
        .replace_all(&caps.get(1)?.as_str().to_lowercase(), " ")
        .into_owned();

    ROUTE_TABLE
        .iter()
        .find(|(keyword, _, _)| *keyword == noun)
        .map(|(_, label, route)| NavigationTarget {
            label: label.to_string(),
            route: route.to_string(),
        })
}

//
// ================= Task Titles =================
//

/// Leading phrases dropped from task titles, longest first
const TASK_LEAD_PHRASES: &[&str] = &[
    "can you remind me to",
    "please remind me to",
    "remind me to",
    "add a to-do to",
    "add a todo to",
    "add a task to",
    "create a task to",
    "add task to",
    "don't forget to",
    "dont forget to",
    "i need to",
    "i have to",
    "need to",
    "add a to-do",
    "add a todo",
    "add a task",
    "add task",
    "to-do:",
    "todo:",
    "task:",
];

const TRAILING_CONNECTORS: &[&str] = &["by", "due", "on", "for", "at", "is", "it's", "its"];

/// Title for a task or study task: the utterance minus lead phrases,
/// relative dates and importance words, with the first letter capitalised
pub fn extract_task_title(text: &str) -> Option<String> {
    let mut rest = text.trim().to_string();
    let lower = rest.to_lowercase();
    if let Some(tail) = TASK_LEAD_PHRASES
        .iter()
        .find(|p| lower.starts_with(*p))
        .and_then(|p| rest.get(p.len()..))
    {
        rest = tail.to_string();
    }

    let mut words: Vec<&str> = rest
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| c.is_ascii_punctuation() && c != '\''))
        .filter(|w| !w.is_empty())
        .filter(|w| {
            let lower = w.to_lowercase();
            !is_relative_date_word(&lower) && !is_importance_word(&lower)
        })
        .collect();

    while words
        .last()
        .is_some_and(|w| TRAILING_CONNECTORS.contains(&w.to_lowercase().as_str()))
    {
        words.pop();
    }

    if words.is_empty() {
        return None;
    }
    Some(capitalize_first(&words.join(" ")))
}

/// First known subject named in the utterance, in the order given
pub fn extract_study_subject(text: &str, known_subjects: &[String]) -> Option<String> {
    let haystack = format!(" {} ", tokens(text).join(" "));
    known_subjects
        .iter()
        .find(|subject| {
            let needle = tokens(subject).join(" ");
            !needle.is_empty() && haystack.contains(&format!(" {} ", needle))
        })
        .cloned()
}

//
// ================= Text Helpers =================
//

/// Lower-cased alphanumeric runs (apostrophes and hyphens kept inside words)
pub(crate) fn tokens(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || c == '\'' || c == '-'))
        .map(|w| w.trim_matches(|c| c == '\'' || c == '-'))
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

/// Keyword match tolerant of a plural suffix
pub(crate) fn word_matches(word: &str, keyword: &str) -> bool {
    word == keyword
        || word
            .strip_prefix(keyword)
            .is_some_and(|suffix| suffix == "s" || suffix == "es")
}

pub(crate) fn has_word(words: &[String], keyword: &str) -> bool {
    words.iter().any(|w| word_matches(w, keyword))
}

/// Whole-phrase match on word boundaries of the normalised text
pub(crate) fn has_phrase(text: &str, phrase: &str) -> bool {
    let haystack = format!(" {} ", tokens(text).join(" "));
    haystack.contains(&format!(" {} ", phrase))
}

pub(crate) fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(capitalize_first)
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize_first(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
