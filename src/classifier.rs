//! Intent Classifier
//!
//! Maps a free-text utterance to one intent using keyword and phrase
//! triggers evaluated in a fixed precedence, stopping at the first hit:
//! - Navigation: "show/open/go to/view <area>"
//! - ScheduledClass: a class noun, or a timetable phrase
//! - StudyTask: coursework nouns, or "remind me to finish ..." phrases
//! - Expense: an amount, or a spending verb plus a recognisable category/title
//! - Task: to-do phrasing
//! - SmallTalk: schedule questions, help, thanks, greetings
//!
//! Nothing is scored across stages. Reordering the stages changes results.

use crate::draft::DraftKind;
use crate::extract::{
    self, extract_amount, extract_category, extract_expense_title, extract_navigation,
    is_fallback_title, NavigationTarget,
};
use crate::models::Category;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SmallTalk {
    /// "what classes do I have today", answered from known schedules
    ScheduleQuery,
    Help,
    Thanks,
    Greeting,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Intent {
    Navigation(NavigationTarget),
    ScheduledClass,
    StudyTask,
    Expense,
    Task,
    SmallTalk(SmallTalk),
    None,
}

impl Intent {
    /// The draft variant this intent creates, if any
    pub fn draft_kind(&self) -> Option<DraftKind> {
        match self {
            Intent::ScheduledClass => Some(DraftKind::ScheduledClass),
            Intent::StudyTask => Some(DraftKind::StudyTask),
            Intent::Expense => Some(DraftKind::Expense),
            Intent::Task => Some(DraftKind::Task),
            Intent::Navigation(_) | Intent::SmallTalk(_) | Intent::None => None,
        }
    }
}

/// Static keyword lists, zero allocation
const CLASS_WORDS: &[&str] = &[
    "class", "lecture", "lesson", "tutorial", "lab", "seminar", "meeting", "session",
];

const CLASS_PHRASES: &[&str] = &[
    "timetable",
    "to my schedule",
    "on my schedule",
    "in my schedule",
    "to the schedule",
    "weekly schedule",
];

const STUDY_WORDS: &[&str] = &[
    "homework", "assignment", "revision", "revise", "study", "review", "essay", "report",
    "project", "quiz", "exam", "test",
];

const STUDY_PHRASES: &[&str] = &[
    "remind me to finish",
    "remind me to complete",
    "remind me to submit",
    "remind me to prepare",
    "finish my",
    "submit my",
];

const SPENDING_WORDS: &[&str] = &["spent", "paid", "bought", "purchased", "spend"];

const SPENDING_PHRASES: &[&str] = &["paying for", "cost me", "charged me"];

const TASK_WORDS: &[&str] = &["task", "todo", "to-do", "chore", "errand"];

const TASK_PHRASES: &[&str] = &[
    "remind me",
    "don't forget",
    "dont forget",
    "need to",
    "have to",
];

const QUESTION_LEADS: &[&str] = &[
    "what", "what's", "whats", "which", "when", "do", "any", "anything", "is",
];

const SCHEDULE_NOUNS: &[&str] = &["schedule", "timetable"];

const HELP_PHRASES: &[&str] = &["help", "what can you do", "how does this work", "how do i"];

const THANKS_PHRASES: &[&str] = &["thanks", "thank you", "thx", "cheers", "appreciate it"];

const GREETING_PHRASES: &[&str] = &[
    "hi", "hello", "hey", "yo", "hiya", "good morning", "good afternoon", "good evening",
];

/// Intent classifier
pub struct IntentClassifier;

impl IntentClassifier {
    /// Classify an utterance. Total and deterministic.
    pub fn classify(text: &str) -> Intent {
        let words = extract::tokens(text);
        if words.is_empty() {
            return Intent::None;
        }

        if let Some(target) = extract_navigation(text) {
            return Intent::Navigation(target);
        }

        let schedule_query = is_schedule_query(&words);

        if !schedule_query && is_class_request(text, &words) {
            return Intent::ScheduledClass;
        }

        if any_word(&words, STUDY_WORDS) || any_phrase(text, STUDY_PHRASES) {
            return Intent::StudyTask;
        }

        if is_expense(text, &words) {
            return Intent::Expense;
        }

        if any_word(&words, TASK_WORDS) || any_phrase(text, TASK_PHRASES) {
            return Intent::Task;
        }

        if let Some(kind) = classify_small_talk(text, schedule_query) {
            return Intent::SmallTalk(kind);
        }

        Intent::None
    }
}

fn is_class_request(text: &str, words: &[String]) -> bool {
    any_word(words, CLASS_WORDS) || any_phrase(text, CLASS_PHRASES)
}

/// A question about existing classes, not a request to add one
fn is_schedule_query(words: &[String]) -> bool {
    let asks = words
        .first()
        .is_some_and(|first| QUESTION_LEADS.contains(&first.as_str()));
    asks && (any_word(words, CLASS_WORDS) || any_word(words, SCHEDULE_NOUNS))
}

fn is_expense(text: &str, words: &[String]) -> bool {
    if extract_amount(text).is_some() {
        return true;
    }

    let spending = any_word(words, SPENDING_WORDS) || any_phrase(text, SPENDING_PHRASES);
    spending
        && (extract_category(text) != Category::Other
            || !is_fallback_title(&extract_expense_title(text)))
}

fn classify_small_talk(text: &str, schedule_query: bool) -> Option<SmallTalk> {
    if schedule_query {
        Some(SmallTalk::ScheduleQuery)
    } else if any_phrase(text, HELP_PHRASES) {
        Some(SmallTalk::Help)
    } else if any_phrase(text, THANKS_PHRASES) {
        Some(SmallTalk::Thanks)
    } else if any_phrase(text, GREETING_PHRASES) {
        Some(SmallTalk::Greeting)
    } else {
        None
    }
}

fn any_word(words: &[String], keywords: &[&str]) -> bool {
    keywords.iter().any(|kw| extract::has_word(words, kw))
}

fn any_phrase(text: &str, phrases: &[&str]) -> bool {
    phrases.iter().any(|p| extract::has_phrase(text, p))
}
