//! Core data models for the drafting assistant

use chrono::{DateTime, Local, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

//
// ================= Enums =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Food,
    Transport,
    Shopping,
    Entertainment,
    Bills,
    Health,
    Education,
    Other,
}

impl Category {
    pub const ALL: [Category; 8] = [
        Category::Food,
        Category::Transport,
        Category::Shopping,
        Category::Entertainment,
        Category::Bills,
        Category::Health,
        Category::Education,
        Category::Other,
    ];

    /// Parse a menu value or label, case-insensitively
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|c| c.to_string().to_lowercase() == value)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Importance {
    High,
    #[default]
    Medium,
    Low,
}

impl Importance {
    pub const ALL: [Importance; 3] = [Importance::High, Importance::Medium, Importance::Low];

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "high" => Some(Importance::High),
            "medium" => Some(Importance::Medium),
            "low" => Some(Importance::Low),
            _ => None,
        }
    }
}

/// Day of the week, ordered Monday first so sets sort in calendar order
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Weekday {
    pub const ALL: [Weekday; 7] = [
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
        Weekday::Saturday,
        Weekday::Sunday,
    ];

    pub fn short(&self) -> &'static str {
        match self {
            Weekday::Monday => "Mon",
            Weekday::Tuesday => "Tue",
            Weekday::Wednesday => "Wed",
            Weekday::Thursday => "Thu",
            Weekday::Friday => "Fri",
            Weekday::Saturday => "Sat",
            Weekday::Sunday => "Sun",
        }
    }

    /// Accepts full names and the usual abbreviations ("tue", "tues", "thurs", ...)
    pub fn parse(token: &str) -> Option<Self> {
        match token.trim().to_lowercase().as_str() {
            "monday" | "mon" => Some(Weekday::Monday),
            "tuesday" | "tue" | "tues" => Some(Weekday::Tuesday),
            "wednesday" | "wed" => Some(Weekday::Wednesday),
            "thursday" | "thu" | "thur" | "thurs" => Some(Weekday::Thursday),
            "friday" | "fri" => Some(Weekday::Friday),
            "saturday" | "sat" => Some(Weekday::Saturday),
            "sunday" | "sun" => Some(Weekday::Sunday),
            _ => None,
        }
    }
}

impl From<chrono::Weekday> for Weekday {
    fn from(day: chrono::Weekday) -> Self {
        match day {
            chrono::Weekday::Mon => Weekday::Monday,
            chrono::Weekday::Tue => Weekday::Tuesday,
            chrono::Weekday::Wed => Weekday::Wednesday,
            chrono::Weekday::Thu => Weekday::Thursday,
            chrono::Weekday::Fri => Weekday::Friday,
            chrono::Weekday::Sat => Weekday::Saturday,
            chrono::Weekday::Sun => Weekday::Sunday,
        }
    }
}

//
// ================= Messages =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Assistant,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Presentation {
    PlainText,
    MenuPrompt,
    ChoicePrompt,
    InputPrompt,
    ConfirmationCard,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MenuOption {
    pub label: String,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl MenuOption {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
            description: None,
        }
    }

    pub fn described(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// An immutable transcript entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub sender: Sender,
    pub text: String,
    pub presentation: Presentation,
    /// Options for menu/choice prompts, the draft fields for confirmation cards
    #[serde(default)]
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn assistant(
        text: impl Into<String>,
        presentation: Presentation,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender: Sender::Assistant,
            text: text.into(),
            presentation,
            payload,
            created_at: Utc::now(),
        }
    }

    pub fn plain(text: impl Into<String>) -> Self {
        Self::assistant(text, Presentation::PlainText, serde_json::Value::Null)
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender: Sender::User,
            text: text.into(),
            presentation: Presentation::PlainText,
            payload: serde_json::Value::Null,
            created_at: Utc::now(),
        }
    }

    /// Options carried by a menu or choice prompt
    pub fn options(&self) -> Vec<MenuOption> {
        self.payload
            .get("options")
            .cloned()
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or_default()
    }
}

//
// ================= User Input =================
//

/// Everything a presentation surface can send into a session
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum UserInput {
    /// Main menu click (`expense`, `class`, `task`, `study_task`, or `menu`)
    Menu(String),
    /// One or more option values picked from a choice prompt
    Choice(Vec<String>),
    /// Typed free text
    Text(String),
    Confirm,
    Cancel,
}

impl fmt::Display for UserInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserInput::Menu(value) => write!(f, "{}", value),
            UserInput::Choice(values) => write!(f, "{}", values.join(", ")),
            UserInput::Text(text) => write!(f, "{}", text),
            UserInput::Confirm => write!(f, "Confirm"),
            UserInput::Cancel => write!(f, "Cancel"),
        }
    }
}

//
// ================= Known Records =================
//

/// A class already on the user's timetable (read-only view)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KnownSchedule {
    pub subject_name: String,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub days: Vec<Weekday>,
    pub color: String,
}

//
// ================= Clock =================
//

/// Source of "today" for relative-date extraction
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// Pinned date, used by tests and replays
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Category::Food => "Food",
            Category::Transport => "Transport",
            Category::Shopping => "Shopping",
            Category::Entertainment => "Entertainment",
            Category::Bills => "Bills",
            Category::Health => "Health",
            Category::Education => "Education",
            Category::Other => "Other",
        };
        write!(f, "{}", s)
    }
}

impl fmt::Display for Importance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Importance::High => "High",
            Importance::Medium => "Medium",
            Importance::Low => "Low",
        };
        write!(f, "{}", s)
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Weekday::Monday => "Monday",
            Weekday::Tuesday => "Tuesday",
            Weekday::Wednesday => "Wednesday",
            Weekday::Thursday => "Thursday",
            Weekday::Friday => "Friday",
            Weekday::Saturday => "Saturday",
            Weekday::Sunday => "Sunday",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weekday_parse_abbreviations() {
        assert_eq!(Weekday::parse("Thurs"), Some(Weekday::Thursday));
        assert_eq!(Weekday::parse("tue"), Some(Weekday::Tuesday));
        assert_eq!(Weekday::parse("funday"), None);
        assert!(Weekday::Monday < Weekday::Sunday);
    }

    #[test]
    fn test_user_input_wire_format() {
        let input: UserInput =
            serde_json::from_str(r#"{"type":"choice","value":["Mon","Wed"]}"#).unwrap();
        assert_eq!(
            input,
            UserInput::Choice(vec!["Mon".to_string(), "Wed".to_string()])
        );

        let confirm: UserInput = serde_json::from_str(r#"{"type":"confirm"}"#).unwrap();
        assert_eq!(confirm, UserInput::Confirm);
    }

    #[test]
    fn test_category_parse_is_case_insensitive() {
        assert_eq!(Category::parse("food"), Some(Category::Food));
        assert_eq!(Category::parse(" Bills "), Some(Category::Bills));
        assert_eq!(Category::parse("rent"), None);
    }
}
