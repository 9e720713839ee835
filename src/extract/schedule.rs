//! Timetable slot extraction: time of day, duration, class name, weekdays

use super::{title_case, tokens};
use crate::models::Weekday;
use chrono::NaiveTime;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::BTreeSet;

/// Longest class accepted, from free text or the duration prompt
pub const MAX_DURATION_HOURS: f64 = 12.0;

/// Nouns that mark a timetable entry
pub const CLASS_NOUNS: &[&str] = &[
    "class", "lecture", "lesson", "tutorial", "lab", "seminar", "course", "session",
];

/// Words that end a class name when scanning forward from "called"/"for"
const NAME_TERMINATORS: &[&str] = &[
    "on", "at", "every", "from", "for", "starting", "each", "this", "next", "to", "in",
    "class", "classes", "lecture", "lectures", "lesson", "lessons", "tutorial", "lab",
    "seminar", "course", "session", "please", "tomorrow", "today", "weekly",
];

/// Words that cannot be a class name on their own
const NAME_STOPWORDS: &[&str] = &[
    "a", "an", "the", "my", "new", "this", "next", "that", "add", "schedule", "weekly",
    "daily", "every", "first", "another", "our", "your", "one", "some", "to", "for", "of",
    "recurring", "regular", "create", "set", "up",
];

lazy_static! {
    static ref MERIDIEM_TIME: Regex =
        Regex::new(r"(?i)\b(\d{1,2})(?::(\d{2}))?\s*(a\.?m\.?|p\.?m\.?)(?:\W|$)").unwrap();
    static ref CLOCK_TIME: Regex = Regex::new(r"\b(\d{1,2}):(\d{2})\b").unwrap();
    static ref DURATION: Regex = Regex::new(
        r"(?i)\b(?:for|about|around)\s+(\d+(?:\.\d+)?)\s*(?:hours?|hrs?|h)\b"
    )
    .unwrap();
    static ref CALLED_NAME: Regex = Regex::new(r"(?i)\b(?:called|named)\s+(.+)$").unwrap();
    static ref MY_NAME_NOUN: Regex = Regex::new(concat!(
        r"(?i)\bmy\s+([a-z][\w&'-]*(?:\s+[a-z][\w&'-]*)*?)\s+",
        r"(?:class|lecture|lesson|tutorial|lab|seminar|course|session)(?:es|s)?\b",
    ))
    .unwrap();
    static ref NAME_BEFORE_NOUN: Regex = Regex::new(concat!(
        r"(?i)\b([a-z][\w&'-]*)\s+",
        r"(?:class|lecture|lesson|tutorial|lab|seminar|course|session)(?:es|s)?\b",
    ))
    .unwrap();
    static ref TRAILING_FOR: Regex = Regex::new(r"(?i)\bfor\s+(.+)$").unwrap();
}

/// Find a time of day and normalise it to 24-hour
///
/// `2pm`, `9:30am`, `12 a.m.` and bare `14:05` are accepted; out-of-range
/// hours or minutes give `None`.
pub fn extract_time(text: &str) -> Option<NaiveTime> {
    if let Some(caps) = MERIDIEM_TIME.captures(text) {
        let hour: u32 = caps.get(1)?.as_str().parse().ok()?;
        let minute: u32 = caps
            .get(2)
            .map_or(Some(0), |m| m.as_str().parse().ok())?;
        let is_pm = caps.get(3)?.as_str().to_lowercase().starts_with('p');

        if !(1..=12).contains(&hour) {
            return None;
        }
        let hour = match (hour, is_pm) {
            (12, false) => 0,
            (12, true) => 12,
            (h, true) => h + 12,
            (h, false) => h,
        };
        return NaiveTime::from_hms_opt(hour, minute, 0);
    }

    let caps = CLOCK_TIME.captures(text)?;
    let hour: u32 = caps.get(1)?.as_str().parse().ok()?;
    let minute: u32 = caps.get(2)?.as_str().parse().ok()?;
    NaiveTime::from_hms_opt(hour, minute, 0)
}

/// `for 2 hours`, `about 1.5 hrs`; accepts 0 < N <= 12
pub fn extract_duration_hours(text: &str) -> Option<f64> {
    let caps = DURATION.captures(text)?;
    let hours: f64 = caps.get(1)?.as_str().parse().ok()?;
    (hours > 0.0 && hours <= MAX_DURATION_HOURS).then_some(hours)
}

/// Recover the class name. Patterns are tried in a fixed order:
/// `called/named X`, `my X <class-noun>`, `X <class-noun>`, trailing `for X`.
pub fn extract_subject_name(text: &str) -> Option<String> {
    let from_called = || {
        CALLED_NAME
            .captures(text)
            .and_then(|c| name_until_terminator(c.get(1)?.as_str()))
    };
    let from_my = || {
        MY_NAME_NOUN
            .captures(text)
            .and_then(|c| clean_name(c.get(1)?.as_str()))
    };
    let from_before_noun = || {
        NAME_BEFORE_NOUN.captures_iter(text).find_map(|c| {
            let word = c.get(1)?.as_str();
            clean_name(word)
        })
    };
    let from_trailing_for = || {
        TRAILING_FOR
            .captures(text)
            .and_then(|c| name_until_terminator(c.get(1)?.as_str()))
    };

    from_called()
        .or_else(from_my)
        .or_else(from_before_noun)
        .or_else(from_trailing_for)
}

/// Every weekday named anywhere in the text, in calendar order.
/// Plurals ("mondays") only count for full day names.
pub fn extract_weekdays(text: &str) -> Option<BTreeSet<Weekday>> {
    let days: BTreeSet<Weekday> = tokens(text)
        .iter()
        .filter_map(|token| {
            Weekday::parse(token).or_else(|| {
                token
                    .strip_suffix('s')
                    .filter(|day| day.ends_with("day"))
                    .and_then(Weekday::parse)
            })
        })
        .collect();

    (!days.is_empty()).then_some(days)
}

fn name_until_terminator(raw: &str) -> Option<String> {
    let words: Vec<&str> = raw
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| c.is_ascii_punctuation() && c != '&'))
        .take_while(|w| {
            let lower = w.to_lowercase();
            !w.is_empty()
                && !NAME_TERMINATORS.contains(&lower.as_str())
                && Weekday::parse(&lower).is_none()
                && !w.chars().any(|c| c.is_ascii_digit())
        })
        .collect();

    clean_name(&words.join(" "))
}

fn clean_name(raw: &str) -> Option<String> {
    let words: Vec<&str> = raw
        .split_whitespace()
        .skip_while(|w| NAME_STOPWORDS.contains(&w.to_lowercase().as_str()))
        .collect();

    if words.is_empty() {
        return None;
    }
    if words.len() == 1 && NAME_STOPWORDS.contains(&words[0].to_lowercase().as_str()) {
        return None;
    }
    Some(title_case(&words.join(" ")))
}
