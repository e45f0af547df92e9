//! Typed event bus for intra-service communication.
//!
//! Uses tokio broadcast channels to decouple services from one another.
//! Any service can emit events without knowing who is listening, and any
//! number of subscribers can independently consume events.

use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::debug;

/// Application-level state changes other parts of the client care about.
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// A user signed in.
    SessionStarted { user_id: String, role: String },
    /// The session ended (logout or expiry).
    SessionEnded,
    /// The backend's capability set was (re)loaded.
    CapabilitiesLoaded { count: usize },
    /// A form submission was updated.
    FormDataUpdated { form_id: String, submission_id: String },
    /// A form submission was deleted.
    FormDataDeleted { form_id: String, submission_id: String },
    /// A stored file could not be removed; the row change still stands.
    FileCleanupFailed { path: String, error: String },
    /// A letter was archived with its number.
    LetterGenerated { template_id: String, nomor_surat: String },
    /// One import batch finished.
    ImportProgress { batch: usize, total_batches: usize, succeeded: usize, failed: usize },
    /// An import finished.
    ImportComplete { succeeded: usize, failed: usize },
    /// The local roster cache was refreshed.
    RosterSynced { count: usize },
    /// A resident record changed remotely.
    ResidentChanged { nik: String },
    /// A user's role changed.
    UserRoleChanged { user_id: String, role: String },
}

/// Application-wide event bus backed by a tokio broadcast channel.
///
/// Fan-out delivery: every subscriber gets every event. Slow subscribers
/// that fall behind receive a `Lagged` error and may miss events.
#[derive(Clone)]
pub struct EventBus {
    sender: Arc<broadcast::Sender<AppEvent>>,
}

impl EventBus {
    /// Create a new EventBus with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Subscribe to receive application events.
    pub fn subscribe(&self) -> broadcast::Receiver<AppEvent> {
        self.sender.subscribe()
    }

    /// Emit an event to all subscribers.
    pub fn emit(&self, event: AppEvent) {
        let label = event_label(&event);
        match self.sender.send(event) {
            Ok(count) => {
                debug!("event_bus: emitted {label} to {count} subscriber(s)");
            }
            Err(_) => {
                debug!("event_bus: no subscribers for {label}");
            }
        }
    }

    /// Get the current number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// Human-readable label for an event (for logging).
fn event_label(event: &AppEvent) -> &'static str {
    match event {
        AppEvent::SessionStarted { .. } => "SessionStarted",
        AppEvent::SessionEnded => "SessionEnded",
        AppEvent::CapabilitiesLoaded { .. } => "CapabilitiesLoaded",
        AppEvent::FormDataUpdated { .. } => "FormDataUpdated",
        AppEvent::FormDataDeleted { .. } => "FormDataDeleted",
        AppEvent::FileCleanupFailed { .. } => "FileCleanupFailed",
        AppEvent::LetterGenerated { .. } => "LetterGenerated",
        AppEvent::ImportProgress { .. } => "ImportProgress",
        AppEvent::ImportComplete { .. } => "ImportComplete",
        AppEvent::RosterSynced { .. } => "RosterSynced",
        AppEvent::ResidentChanged { .. } => "ResidentChanged",
        AppEvent::UserRoleChanged { .. } => "UserRoleChanged",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_event_bus_emit_receive() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        bus.emit(AppEvent::RosterSynced { count: 12 });

        match rx.recv().await.unwrap() {
            AppEvent::RosterSynced { count } => assert_eq!(count, 12),
            _ => panic!("unexpected event type"),
        }
    }

    #[tokio::test]
    async fn test_event_bus_no_subscribers() {
        let bus = EventBus::new(16);
        bus.emit(AppEvent::SessionEnded);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_event_labels() {
        assert_eq!(
            event_label(&AppEvent::ImportComplete { succeeded: 1, failed: 0 }),
            "ImportComplete"
        );
    }
}
