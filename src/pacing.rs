//! Reply pacing
//!
//! Assistant turns are staged with a pace so they appear conversational
//! rather than instant: a short beat before ordinary replies and a longer
//! one before the main menu reappears after a finished or cancelled flow.
//! Pauses are cosmetic. They never reorder messages and are skipped
//! entirely when the delays are zero or the pacer has been cancelled.

use crate::models::Message;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pace {
    Immediate,
    Short,
    Long,
}

/// One assistant message and the pause that precedes it
#[derive(Debug, Clone)]
pub struct Staged {
    pub pace: Pace,
    pub message: Message,
}

impl Staged {
    pub fn now(message: Message) -> Self {
        Self {
            pace: Pace::Immediate,
            message,
        }
    }

    pub fn short(message: Message) -> Self {
        Self {
            pace: Pace::Short,
            message,
        }
    }

    pub fn long(message: Message) -> Self {
        Self {
            pace: Pace::Long,
            message,
        }
    }
}

#[derive(Clone)]
pub struct ReplyPacer {
    reply_delay: Duration,
    menu_delay: Duration,
    cancel: CancellationToken,
}

impl ReplyPacer {
    pub fn new(reply_delay: Duration, menu_delay: Duration) -> Self {
        Self {
            reply_delay,
            menu_delay,
            cancel: CancellationToken::new(),
        }
    }

    /// No pauses at all, for tests and non-interactive hosts
    pub fn instant() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }

    pub fn delay_for(&self, pace: Pace) -> Duration {
        match pace {
            Pace::Immediate => Duration::ZERO,
            Pace::Short => self.reply_delay,
            Pace::Long => self.menu_delay,
        }
    }

    /// Wait out the pause for `pace`. Returns early once cancelled.
    pub async fn pause(&self, pace: Pace) {
        let delay = self.delay_for(pace);
        if delay.is_zero() || self.cancel.is_cancelled() {
            return;
        }

        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = self.cancel.cancelled() => {
                debug!("Reply pause interrupted");
            }
        }
    }

    /// Skip every current and future pause, e.g. when the session closes
    pub fn cancel(&self) {
        self.cancel.cancel();
    }
}

impl Default for ReplyPacer {
    fn default() -> Self {
        Self::new(Duration::from_millis(400), Duration::from_millis(1200))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[tokio::test]
    async fn test_instant_pacer_never_waits() {
        let pacer = ReplyPacer::instant();
        let start = Instant::now();
        pacer.pause(Pace::Long).await;
        pacer.pause(Pace::Short).await;
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[test]
    fn test_delays_by_pace() {
        let pacer = ReplyPacer::new(Duration::from_millis(10), Duration::from_millis(30));
        assert_eq!(pacer.delay_for(Pace::Immediate), Duration::ZERO);
        assert_eq!(pacer.delay_for(Pace::Short), Duration::from_millis(10));
        assert_eq!(pacer.delay_for(Pace::Long), Duration::from_millis(30));
    }

    #[tokio::test]
    async fn test_pause_sleeps_for_configured_delay() {
        let pacer = ReplyPacer::new(Duration::from_millis(5), Duration::from_millis(20));
        let start = Instant::now();
        pacer.pause(Pace::Long).await;
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[tokio::test]
    async fn test_cancel_cuts_pause_short() {
        let pacer = ReplyPacer::new(Duration::from_secs(30), Duration::from_secs(30));
        let waiter = pacer.clone();
        let handle = tokio::spawn(async move { waiter.pause(Pace::Short).await });

        pacer.cancel();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("pause should end once cancelled")
            .unwrap();
    }
}
