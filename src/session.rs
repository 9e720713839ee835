//! Chat sessions
//!
//! A `ChatSession` is the one object both presentation surfaces drive. It
//! owns a dialogue controller, the session's append-only transcript and its
//! reply pacer. Every message is appended locally first and then handed to
//! the transcript store on a spawned task, so a slow or failing store can
//! never hold up the conversation.

use crate::dialogue::DialogueController;
use crate::draft::PendingField;
use crate::memory::TranscriptStore;
use crate::models::{Clock, Message, SystemClock, UserInput};
use crate::pacing::{Pace, ReplyPacer, Staged};
use crate::records::{Navigator, RecordStore};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

pub struct ChatSession {
    id: Uuid,
    controller: DialogueController,
    transcript: Vec<Message>,
    pacer: ReplyPacer,
    store: Arc<dyn TranscriptStore>,
}

impl ChatSession {
    pub fn new(
        id: Uuid,
        controller: DialogueController,
        pacer: ReplyPacer,
        store: Arc<dyn TranscriptStore>,
    ) -> Self {
        info!(session_id = %id, "Session created");
        Self {
            id,
            controller,
            transcript: Vec::new(),
            pacer,
            store,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn transcript(&self) -> &[Message] {
        &self.transcript
    }

    pub fn pending(&self) -> PendingField {
        self.controller.pending()
    }

    /// Greeting and main menu. Returns the new assistant messages.
    pub async fn start(&mut self) -> Vec<Message> {
        let staged = self.controller.start();
        self.deliver(staged).await
    }

    /// Feed one user input. Returns the new assistant messages in order.
    pub async fn handle(&mut self, input: UserInput) -> Vec<Message> {
        self.record(Message::user(input.to_string()));
        let staged = self.controller.handle(input).await;
        self.deliver(staged).await
    }

    /// Stop pacing; later replies are delivered without pauses
    pub fn close(&self) {
        self.pacer.cancel();
    }

    async fn deliver(&mut self, staged: Vec<Staged>) -> Vec<Message> {
        let mut delivered = Vec::with_capacity(staged.len());
        for Staged { pace, message } in staged {
            self.pacer.pause(pace).await;
            self.record(message.clone());
            delivered.push(message);
        }
        delivered
    }

    fn record(&mut self, message: Message) {
        let store = Arc::clone(&self.store);
        let session_id = self.id;
        let persisted = message.clone();
        tokio::spawn(async move {
            if let Err(e) = store.append_transcript_message(session_id, &persisted).await {
                warn!(session_id = %session_id, error = %e, "Failed to persist transcript message");
            }
        });
        self.transcript.push(message);
    }
}

/// Everything a new session is wired to. Shared by all sessions of a host.
#[derive(Clone)]
pub struct SessionFactory {
    records: Arc<dyn RecordStore>,
    navigator: Arc<dyn Navigator>,
    transcripts: Arc<dyn TranscriptStore>,
    clock: Arc<dyn Clock>,
    reply_delay: Duration,
    menu_delay: Duration,
}

impl SessionFactory {
    pub fn new(
        records: Arc<dyn RecordStore>,
        navigator: Arc<dyn Navigator>,
        transcripts: Arc<dyn TranscriptStore>,
    ) -> Self {
        let pacer = ReplyPacer::default();
        Self {
            records,
            navigator,
            transcripts,
            clock: Arc::new(SystemClock),
            reply_delay: pacer.delay_for(Pace::Short),
            menu_delay: pacer.delay_for(Pace::Long),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_pacing(mut self, reply_delay: Duration, menu_delay: Duration) -> Self {
        self.reply_delay = reply_delay;
        self.menu_delay = menu_delay;
        self
    }

    pub fn transcripts(&self) -> Arc<dyn TranscriptStore> {
        Arc::clone(&self.transcripts)
    }

    pub fn create(&self, id: Uuid) -> ChatSession {
        let controller = DialogueController::new(
            Arc::clone(&self.records),
            Arc::clone(&self.navigator),
            Arc::clone(&self.clock),
        );
        ChatSession::new(
            id,
            controller,
            ReplyPacer::new(self.reply_delay, self.menu_delay),
            Arc::clone(&self.transcripts),
        )
    }
}

impl Drop for ChatSession {
    fn drop(&mut self) {
        self.pacer.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{FailingTranscriptStore, InMemoryTranscriptStore};
    use crate::models::{FixedClock, Presentation, Sender};
    use crate::records::{InMemoryRecordStore, LoggingNavigator};
    use chrono::NaiveDate;

    fn session_with(store: Arc<dyn TranscriptStore>) -> ChatSession {
        SessionFactory::new(
            Arc::new(InMemoryRecordStore::new()),
            Arc::new(LoggingNavigator),
            store,
        )
        .with_clock(Arc::new(FixedClock(NaiveDate::from_ymd_opt(2026, 3, 10).unwrap())))
        .with_pacing(Duration::ZERO, Duration::ZERO)
        .create(Uuid::new_v4())
    }

    /// Let spawned persistence tasks run
    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    #[tokio::test]
    async fn test_transcript_records_both_sides() {
        let mut session = session_with(Arc::new(InMemoryTranscriptStore::new()));
        session.start().await;
        let replies = session
            .handle(UserInput::Text("I spent $15.50 on lunch".to_string()))
            .await;

        assert_eq!(
            replies.last().map(|m| m.presentation),
            Some(Presentation::ConfirmationCard)
        );
        let senders: Vec<Sender> = session.transcript().iter().map(|m| m.sender).collect();
        assert_eq!(senders[0], Sender::Assistant);
        assert!(senders.contains(&Sender::User));
        assert_eq!(session.pending(), PendingField::Confirm);
    }

    #[tokio::test]
    async fn test_messages_are_persisted() {
        let store = Arc::new(InMemoryTranscriptStore::new());
        let mut session = session_with(store.clone());
        session.start().await;
        session
            .handle(UserInput::Menu("expense".to_string()))
            .await;
        settle().await;

        let stored = store.load_transcript(session.id()).await.unwrap();
        assert_eq!(stored.len(), session.transcript().len());
    }

    #[tokio::test]
    async fn test_persistence_failure_does_not_block() {
        let mut session = session_with(Arc::new(FailingTranscriptStore));
        session.start().await;
        let replies = session
            .handle(UserInput::Menu("task".to_string()))
            .await;

        assert!(!replies.is_empty());
        assert_eq!(replies.last().map(|m| m.presentation), Some(Presentation::InputPrompt));
        assert_eq!(session.transcript().len(), 2 + 1 + replies.len());
    }
}
