//! Polling side of an IME session.
//!
//! `ImePoller` is handed to the input loop. Each cycle it calls `poll()` to
//! pull everything the window side has queued, then walks the events one by
//! one with `next()` and reads the current event through the accessors.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, trace};

use crate::event::{CompositionEvent, CompositionState};
use crate::queue::CompositionEventQueue;

/// Consumer handle for a window's composition events.
#[derive(Debug)]
pub struct ImePoller {
    queue: Arc<CompositionEventQueue>,
    composing: Arc<AtomicBool>,
    pending: VecDeque<CompositionEvent>,
    current: CompositionEvent,
}

impl ImePoller {
    pub(crate) fn new(queue: Arc<CompositionEventQueue>, composing: Arc<AtomicBool>) -> Self {
        Self {
            queue,
            composing,
            pending: VecDeque::new(),
            current: CompositionEvent::new(),
        }
    }

    /// Pull all queued events into the pending list.
    pub fn poll(&mut self) {
        let before = self.pending.len();
        self.queue.copy_events(&mut self.pending);
        trace!(received = self.pending.len() - before, "polled IME events");
    }

    /// Advance to the next pending event.
    ///
    /// Returns false if nothing is pending; the current event is left as is.
    pub fn next(&mut self) -> bool {
        match self.pending.pop_front() {
            Some(event) => {
                self.current = event;
                true
            }
            None => false,
        }
    }

    /// The event selected by the last successful `next()`.
    pub fn current(&self) -> &CompositionEvent {
        &self.current
    }

    /// Text of the current event.
    pub fn string(&self) -> Option<&str> {
        self.current.text()
    }

    /// Caret position of the current event.
    pub fn cursor_position(&self) -> i32 {
        self.current.cursor_pos
    }

    /// State of the current event.
    pub fn state(&self) -> CompositionState {
        self.current.state
    }

    /// Number of events polled but not yet read.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Clear the current event.
    pub fn reset(&mut self) {
        self.current.reset();
    }

    pub fn is_composing(&self) -> bool {
        self.composing.load(Ordering::Acquire)
    }

    /// Route IME messages to the window-side handler (`true`) or to default
    /// window processing (`false`).
    pub fn set_composing(&self, composing: bool) {
        let was = self.composing.swap(composing, Ordering::AcqRel);
        if was != composing {
            debug!(composing, "IME composing mode changed");
        }
    }
}
