//! Engine event channel
//!
//! Key principles:
//! - Explicit queue owned by the engine context, not a global
//! - Drained exactly once per fixed step; notifications posted during a
//!   drain are deferred to the next drain
//! - Urgent notifications may request front-of-queue priority insertion

use std::collections::VecDeque;

/// Notifications passed between engine subsystems
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// Shut the engine down at the end of the current fixed step
    QuitRequested,
    /// The window surface changed size
    WindowResized {
        /// New surface width in pixels
        width: u32,
        /// New surface height in pixels
        height: u32,
    },
    /// A scene finished importing
    SceneLoaded {
        /// Name of the scene that was imported
        name: String,
    },
    /// A scene failed to import and was abandoned
    SceneLoadFailed {
        /// Path that could not be read
        path: String,
    },
}

/// Delivery priority for posted events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    /// Appended to the back of the queue
    Normal,
    /// Inserted at the front of the queue, ahead of pending events
    Urgent,
}

/// Single-consumer event queue with a drain-once-per-tick contract
///
/// Events posted while a drain is in progress land in the next drain, never
/// the current one: `drain` detaches the pending queue wholesale before
/// yielding anything.
#[derive(Debug, Default)]
pub struct EventQueue {
    pending: VecDeque<EngineEvent>,
}

impl EventQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self {
            pending: VecDeque::new(),
        }
    }

    /// Post an event for the next drain
    pub fn post(&mut self, event: EngineEvent) {
        self.post_with_priority(event, Priority::Normal);
    }

    /// Post an event with explicit delivery priority
    pub fn post_with_priority(&mut self, event: EngineEvent, priority: Priority) {
        match priority {
            Priority::Normal => self.pending.push_back(event),
            Priority::Urgent => self.pending.push_front(event),
        }
    }

    /// Take every currently pending event, leaving the queue empty
    ///
    /// Call once per fixed step. Events posted to `self` after this call
    /// (including while iterating the returned batch) belong to the next
    /// drain.
    pub fn drain(&mut self) -> VecDeque<EngineEvent> {
        std::mem::take(&mut self.pending)
    }

    /// Number of events waiting for the next drain
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether no events are waiting
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Discard all pending events (state transitions)
    pub fn clear(&mut self) {
        self.pending.clear();
    }
}
