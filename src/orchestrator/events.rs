use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use super::state::SessionStatus;

const EVENT_CAPACITY: usize = 256;

/// Notifications for the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum SessionEvent {
    StatusChanged {
        status: SessionStatus,
        error: Option<String>,
    },
    Progress {
        percent: f64,
    },
    ArtifactCommitted {
        artifact_id: String,
    },
    ArtifactEvicted {
        artifact_id: String,
    },
    ArtifactRemoved {
        artifact_id: String,
    },
}

#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<SessionEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(EVENT_CAPACITY)
    }
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publish to current subscribers. Nobody listening is fine.
    pub fn emit(&self, event: SessionEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_without_subscribers() {
        let bus = EventBus::default();
        bus.emit(SessionEvent::Progress { percent: 10.0 });
    }

    #[tokio::test]
    async fn test_subscriber_receives_events() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();
        bus.emit(SessionEvent::ArtifactCommitted {
            artifact_id: "a1".into(),
        });
        assert_eq!(
            rx.recv().await.unwrap(),
            SessionEvent::ArtifactCommitted {
                artifact_id: "a1".into()
            }
        );
    }

    #[test]
    fn test_event_json_shape() {
        let event = SessionEvent::StatusChanged {
            status: SessionStatus::Error,
            error: Some("No image generated.".into()),
        };
        let json: serde_json::Value = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "StatusChanged");
        assert_eq!(json["data"]["status"], "error");
        assert_eq!(json["data"]["error"], "No image generated.");
    }
}
