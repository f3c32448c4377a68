//! Trailing-edge debounce
//!
//! Each call to [`Debouncer::ticket`] supersedes every earlier ticket. A ticket
//! settles after the delay and reports whether it is still the latest, so only
//! the last keystroke in a burst leads to a fetch.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Delay between the last keystroke and the search fetch
pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);

#[derive(Debug, Clone)]
pub struct Debouncer {
    delay: Duration,
    latest: Arc<AtomicU64>,
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(SEARCH_DEBOUNCE)
    }
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            latest: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Start a new wait, invalidating all earlier tickets
    pub fn ticket(&self) -> DebounceTicket {
        let id = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        DebounceTicket {
            id,
            delay: self.delay,
            latest: Arc::clone(&self.latest),
        }
    }

    /// Invalidate every outstanding ticket
    pub fn cancel(&self) {
        self.latest.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Debug)]
pub struct DebounceTicket {
    id: u64,
    delay: Duration,
    latest: Arc<AtomicU64>,
}

impl DebounceTicket {
    pub fn is_current(&self) -> bool {
        self.latest.load(Ordering::SeqCst) == self.id
    }

    /// Wait out the delay; true when no newer ticket was issued meanwhile
    pub async fn settled(&self) -> bool {
        tokio::time::sleep(self.delay).await;
        self.is_current()
    }
}
