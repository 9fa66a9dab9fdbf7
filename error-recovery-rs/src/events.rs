//! # Recovery Event Bus
//!
//! Every handled fault publishes one event for downstream observability
//! consumers. The bus is a plain broadcast channel; the recovery core has
//! no opinion on what subscribes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::types::{ErrorCategory, ErrorContext, ErrorSeverity};

/// Event category tag carried by every published event.
pub const ERROR_EVENT: &str = "error_event";

/// Snapshot of one handled fault, published to subscribers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecoveryEvent {
    /// Always [`ERROR_EVENT`]
    pub event_category: String,
    /// Fault occurrence id
    pub error_id: Uuid,
    /// Rust type name of the reported error
    pub error_type: String,
    /// Assigned category
    pub category: ErrorCategory,
    /// Assigned severity
    pub severity: ErrorSeverity,
    /// Originating component
    pub component: String,
    /// Originating function
    pub function: String,
    /// Whether the fault touches therapeutic safety
    pub affects_therapeutic_safety: bool,
    /// Whether a supportive intervention is required
    pub requires_therapeutic_intervention: bool,
    /// When the event was published
    pub timestamp: DateTime<Utc>,
}

impl RecoveryEvent {
    /// Builds an event from a classified fault context.
    pub fn from_context(context: &ErrorContext) -> Self {
        Self {
            event_category: ERROR_EVENT.to_string(),
            error_id: context.id,
            error_type: context.error_type.clone(),
            category: context.category,
            severity: context.severity(),
            component: context.component.clone(),
            function: context.function.clone(),
            affects_therapeutic_safety: context.affects_therapeutic_safety,
            requires_therapeutic_intervention: context.requires_therapeutic_intervention,
            timestamp: Utc::now(),
        }
    }
}

/// Broadcast bus for recovery events.
///
/// Publishing never blocks and never fails: with no subscribers the event
/// is simply dropped, and a lagging subscriber loses the oldest events
/// (standard broadcast semantics).
#[derive(Debug)]
pub struct EventBus {
    sender: broadcast::Sender<RecoveryEvent>,
}

impl EventBus {
    /// Creates a bus retaining up to `capacity` undelivered events per
    /// subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes one event to current subscribers.
    pub fn publish(&self, event: RecoveryEvent) {
        let _ = self.sender.send(event);
    }

    /// Opens a new subscription.
    pub fn subscribe(&self) -> broadcast::Receiver<RecoveryEvent> {
        self.sender.subscribe()
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}
