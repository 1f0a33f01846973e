//! Coalescing queue between the message pump and the polling loop.
//!
//! The window procedure pushes one update per IME notification with
//! [`CompositionEventQueue::put_event`]. Consecutive non-terminal updates are
//! folded into a single buffered entry (the accumulator), so a burst of
//! `Compose` notifications reaches the consumer as one snapshot holding the
//! latest text. A terminal update (`End` or `Result`) closes the entry and the
//! next update opens a fresh one.
//!
//! The consumer drains the queue with [`CompositionEventQueue::copy_events`].
//! A drain always closes the accumulator, even in the middle of a
//! composition: the partial entry is delivered and later updates start a new
//! entry.

use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::trace;

use crate::event::CompositionEvent;

#[derive(Debug, Default)]
struct QueueState {
    events: Vec<CompositionEvent>,
    /// Index of the open entry. When set it is always `events.len() - 1`.
    open: Option<usize>,
}

/// Thread-safe buffer of composition events with update coalescing.
#[derive(Debug, Default)]
pub struct CompositionEventQueue {
    state: Mutex<QueueState>,
}

impl CompositionEventQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty queue with room for `capacity` entries per drain cycle.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            state: Mutex::new(QueueState {
                events: Vec::with_capacity(capacity),
                open: None,
            }),
        }
    }

    // Every holder leaves `open` pointing at the last entry (or unset) before
    // running code that can panic, so a poisoned state is still usable.
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record one composition update.
    ///
    /// Overwrites the open entry, opening a new one first if none is open.
    /// Terminal updates close the entry afterwards.
    pub fn put_event(&self, update: &CompositionEvent) {
        let mut state = self.lock();

        let index = match state.open {
            Some(index) => index,
            None => {
                state.events.push(CompositionEvent::new());
                let index = state.events.len() - 1;
                state.open = Some(index);
                index
            }
        };

        state.events[index].copy_from(update);

        if update.is_terminal() {
            state.open = None;
        }

        trace!(
            state = ?update.state,
            buffered = state.events.len(),
            open = state.open.is_some(),
            "composition event queued"
        );
    }

    /// Move every buffered entry, in order, to the end of `destination`.
    ///
    /// Leaves the queue empty with no open entry.
    pub fn copy_events<E>(&self, destination: &mut E)
    where
        E: Extend<CompositionEvent>,
    {
        let mut state = self.lock();
        let count = state.events.len();
        let interrupted = state.open.is_some();

        // Detach the batch and close the slot before `extend` runs caller code.
        let capacity = state.events.capacity();
        let events = std::mem::replace(&mut state.events, Vec::with_capacity(capacity));
        state.open = None;
        destination.extend(events);

        if count > 0 {
            trace!(count, interrupted, "composition events drained");
        }
    }

    /// Drain the queue into a new vector.
    pub fn drain(&self) -> Vec<CompositionEvent> {
        let mut events = Vec::new();
        self.copy_events(&mut events);
        events
    }

    /// Number of buffered entries.
    pub fn len(&self) -> usize {
        self.lock().events.len()
    }

    /// Check if nothing is buffered.
    pub fn is_empty(&self) -> bool {
        self.lock().events.is_empty()
    }

    /// Check if the last buffered entry is still open for updates.
    pub fn is_accumulating(&self) -> bool {
        self.lock().open.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::CompositionState::{Compose, End, Result, Start};
    use std::collections::VecDeque;

    fn text_event(state: crate::CompositionState, text: &str) -> CompositionEvent {
        CompositionEvent::with_text(state, text)
    }

    #[test]
    fn test_updates_collapse_into_result() {
        let queue = CompositionEventQueue::new();
        queue.put_event(&text_event(Compose, "a"));
        queue.put_event(&text_event(Compose, "ab"));
        queue.put_event(&text_event(Result, "ab"));

        let mut dest = Vec::new();
        queue.copy_events(&mut dest);

        assert_eq!(dest, vec![text_event(Result, "ab")]);
    }

    #[test]
    fn test_each_terminal_opens_new_entry() {
        let queue = CompositionEventQueue::new();
        queue.put_event(&text_event(Result, "x"));
        queue.put_event(&text_event(Result, "y"));

        let mut dest = Vec::new();
        queue.copy_events(&mut dest);

        assert_eq!(dest, vec![text_event(Result, "x"), text_event(Result, "y")]);
    }

    #[test]
    fn test_drain_empty_queue_leaves_destination_unchanged() {
        let queue = CompositionEventQueue::new();
        let mut dest = vec![text_event(Result, "old")];

        queue.copy_events(&mut dest);
        assert_eq!(dest, vec![text_event(Result, "old")]);
    }

    #[test]
    fn test_second_drain_is_empty() {
        let queue = CompositionEventQueue::new();
        queue.put_event(&text_event(Compose, "n"));

        assert_eq!(queue.drain().len(), 1);
        assert!(queue.drain().is_empty());
    }

    #[test]
    fn test_drain_appends_after_existing_entries() {
        let queue = CompositionEventQueue::new();
        queue.put_event(&text_event(Result, "b"));

        let mut dest = VecDeque::from(vec![text_event(Result, "a")]);
        queue.copy_events(&mut dest);

        assert_eq!(dest.len(), 2);
        assert_eq!(dest[0].text(), Some("a"));
        assert_eq!(dest[1].text(), Some("b"));
    }

    #[test]
    fn test_open_entry_tracks_last_update() {
        let queue = CompositionEventQueue::new();
        queue.put_event(&CompositionEvent::with_state(Start));
        assert!(queue.is_accumulating());
        assert_eq!(queue.len(), 1);

        let mut update = text_event(Compose, "kan");
        update.cursor_pos = 3;
        queue.put_event(&update);
        assert_eq!(queue.len(), 1);

        queue.put_event(&CompositionEvent::with_state(End));
        assert!(!queue.is_accumulating());

        let events = queue.drain();
        assert_eq!(events, vec![CompositionEvent::with_state(End)]);
    }

    #[test]
    fn test_drain_mid_composition_resets_slot() {
        let queue = CompositionEventQueue::new();
        queue.put_event(&text_event(Compose, "ni"));

        let first = queue.drain();
        assert_eq!(first, vec![text_event(Compose, "ni")]);
        assert!(queue.is_empty());
        assert!(!queue.is_accumulating());

        queue.put_event(&text_event(Compose, "nih"));
        queue.put_event(&text_event(Result, "你"));
        let second = queue.drain();
        assert_eq!(second, vec![text_event(Result, "你")]);
    }

    #[test]
    fn test_with_capacity_starts_empty() {
        let queue = CompositionEventQueue::with_capacity(8);
        assert!(queue.is_empty());
        assert!(!queue.is_accumulating());
    }
}
