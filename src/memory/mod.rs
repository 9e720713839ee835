//! Chat transcript persistence
//!
//! The transcript is the only artifact of a session that outlives it.
//! Stores are written best-effort: callers log failures and move on, a
//! failed write never blocks or rolls back the conversation.

pub mod postgres;
pub mod store;

pub use postgres::PgTranscriptStore;
pub use store::{FailingTranscriptStore, InMemoryTranscriptStore};

use crate::models::{Message, Presentation, Sender};
use crate::Result;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Trait for transcript persistence
#[async_trait::async_trait]
pub trait TranscriptStore: Send + Sync {
    async fn append_transcript_message(&self, session_id: Uuid, message: &Message) -> Result<()>;

    /// Messages of one session in the order they were appended
    async fn load_transcript(&self, session_id: Uuid) -> Result<Vec<Message>>;
}

pub(crate) fn sender_to_db(sender: Sender) -> &'static str {
    match sender {
        Sender::User => "user",
        Sender::Assistant => "assistant",
    }
}

pub(crate) fn sender_from_db(sender: &str) -> Sender {
    match sender.to_lowercase().as_str() {
        "assistant" => Sender::Assistant,
        _ => Sender::User,
    }
}

pub(crate) fn presentation_to_db(presentation: Presentation) -> &'static str {
    match presentation {
        Presentation::PlainText => "plain_text",
        Presentation::MenuPrompt => "menu_prompt",
        Presentation::ChoicePrompt => "choice_prompt",
        Presentation::InputPrompt => "input_prompt",
        Presentation::ConfirmationCard => "confirmation_card",
    }
}

pub(crate) fn presentation_from_db(presentation: &str) -> Presentation {
    match presentation {
        "menu_prompt" => Presentation::MenuPrompt,
        "choice_prompt" => Presentation::ChoicePrompt,
        "input_prompt" => Presentation::InputPrompt,
        "confirmation_card" => Presentation::ConfirmationCard,
        _ => Presentation::PlainText,
    }
}

/// Postgres when a database URL is given and the pool can be built,
/// in-memory otherwise
pub fn build_transcript_store(database_url: Option<&str>) -> Arc<dyn TranscriptStore> {
    if let Some(url) = database_url {
        match PgTranscriptStore::connect_lazy(url) {
            Ok(store) => {
                info!("Transcript backend: postgres");
                return Arc::new(store);
            }
            Err(error) => {
                warn!(
                    "Failed to initialize postgres transcript backend, falling back to in-memory: {}",
                    error
                );
            }
        }
    }

    info!("Transcript backend: in-memory");
    Arc::new(InMemoryTranscriptStore::new())
}
