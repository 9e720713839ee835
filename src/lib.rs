//! Drafting Assistant
//!
//! A conversational engine that turns either a guided menu wizard or a
//! single free-form sentence into one structured record:
//! - an expense
//! - a recurring class on the timetable
//! - a to-do
//! - a study task
//!
//! Both entry paths converge on one state machine with one confirmation
//! protocol. Records are committed through host-provided collaborators, and
//! only the chat transcript is persisted by the engine itself.
//!
//! FLOW:
//! INPUT → CLASSIFY → EXTRACT → DRAFT → PROMPT? → CONFIRM → COMMIT → IDLE

pub mod api;
pub mod classifier;
pub mod commit;
pub mod config;
pub mod dialogue;
pub mod draft;
pub mod error;
pub mod extract;
pub mod memory;
pub mod models;
pub mod pacing;
pub mod records;
pub mod session;

pub use error::{DraftingError, Result};

// Re-export common types
pub use models::*;
pub use classifier::{Intent, IntentClassifier, SmallTalk};
pub use dialogue::DialogueController;
pub use draft::{Draft, DraftKind, PendingField};
pub use session::{ChatSession, SessionFactory};
