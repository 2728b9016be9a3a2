//! Recording broadcaster for tests.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity

use eventhub_core::broadcast::{Broadcast, BroadcastError, BroadcastKind, Broadcaster};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

/// Broadcaster that keeps every accepted message in memory.
///
/// Switch it to failing with [`RecordingBroadcaster::set_failing`] to check
/// that primary writes survive a broker outage. Failed messages are not
/// recorded.
///
/// # Example
///
/// ```
/// use eventhub_testing::RecordingBroadcaster;
///
/// let broadcaster = RecordingBroadcaster::new();
/// assert!(broadcaster.published().is_empty());
/// ```
#[derive(Clone, Debug, Default)]
pub struct RecordingBroadcaster {
    published: Arc<RwLock<Vec<Broadcast>>>,
    failing: Arc<AtomicBool>,
}

impl RecordingBroadcaster {
    /// Create a broadcaster that accepts everything
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every following publish.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// All accepted messages in publish order
    #[must_use]
    pub fn published(&self) -> Vec<Broadcast> {
        self.published.read().unwrap().clone()
    }

    /// Accepted messages of one kind
    #[must_use]
    pub fn of_kind(&self, kind: BroadcastKind) -> Vec<Broadcast> {
        self.published
            .read()
            .unwrap()
            .iter()
            .filter(|b| b.kind == kind)
            .cloned()
            .collect()
    }
}

impl Broadcaster for RecordingBroadcaster {
    fn publish(
        &self,
        broadcast: &Broadcast,
    ) -> Pin<Box<dyn Future<Output = Result<(), BroadcastError>> + Send + '_>> {
        let broadcast = broadcast.clone();
        Box::pin(async move {
            if self.failing.load(Ordering::SeqCst) {
                return Err(BroadcastError::PublishFailed {
                    topic: broadcast.kind.as_str().to_string(),
                    reason: "broker unavailable".to_string(),
                });
            }
            self.published.write().unwrap().push(broadcast);
            Ok(())
        })
    }
}
