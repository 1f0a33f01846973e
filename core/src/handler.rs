//! Window-side IME handling.
//!
//! `WindowsIme` owns the input method context of one window. The window
//! procedure asks [`WindowsIme::handles_message`] whether an IME message
//! should be taken away from default processing and, if so, passes it to
//! [`WindowsIme::handle_message`], which reads the composition strings and
//! feeds the shared [`CompositionEventQueue`]. The polling side reads the
//! queue through an [`ImePoller`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::ImeError;
use crate::event::{CompositionEvent, CompositionState};
use crate::imm::{GcsIndex, Himc, Hwnd, ImmBackend};
use crate::message::{self, WM_IME_COMPOSITION, WM_IME_ENDCOMPOSITION, WM_IME_STARTCOMPOSITION};
use crate::poller::ImePoller;
use crate::queue::CompositionEventQueue;
use crate::ImeConfig;

/// IME context and message translation for one window.
pub struct WindowsIme<B: ImmBackend> {
    backend: B,
    hwnd: Hwnd,
    himc: Himc,
    enabled: bool,
    track_cursor: bool,

    /// Shared with pollers; toggled from either side
    composing: Arc<AtomicBool>,

    /// Scratch event carried across messages of one composition
    event: CompositionEvent,

    queue: Arc<CompositionEventQueue>,
}

impl<B: ImmBackend> WindowsIme<B> {
    /// Create a context for `hwnd` and apply the startup flags from `config`.
    pub fn new(backend: B, hwnd: Hwnd, config: &ImeConfig) -> Result<Self, ImeError> {
        if hwnd.is_null() {
            return Err(ImeError::NoWindow);
        }

        let himc = backend.create_context()?;
        debug!(hwnd = hwnd.0, himc = himc.0, "created input method context");

        let mut ime = Self {
            backend,
            hwnd,
            himc,
            enabled: false,
            track_cursor: config.track_cursor,
            composing: Arc::new(AtomicBool::new(config.composing_on_create)),
            event: CompositionEvent::new(),
            queue: Arc::new(CompositionEventQueue::with_capacity(config.queue_capacity)),
        };
        ime.set_enabled(config.enabled_on_create);
        Ok(ime)
    }

    pub fn hwnd(&self) -> Hwnd {
        self.hwnd
    }

    pub fn himc(&self) -> Himc {
        self.himc
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Attach the context to the window, or detach it.
    pub fn set_enabled(&mut self, enabled: bool) {
        if self.enabled == enabled {
            return;
        }
        self.enabled = enabled;
        let himc = if enabled { self.himc } else { Himc::NULL };
        self.backend.associate_context(self.hwnd, himc);
        debug!(hwnd = self.hwnd.0, enabled, "input method context association changed");
    }

    pub fn is_composing(&self) -> bool {
        self.composing.load(Ordering::Acquire)
    }

    /// While composing, IME messages are handled here instead of by the
    /// default window procedure.
    pub fn set_composing(&self, composing: bool) {
        let was = self.composing.swap(composing, Ordering::AcqRel);
        if was != composing {
            debug!(composing, "IME composing mode changed");
        }
    }

    /// Check whether `msg` should be routed to [`Self::handle_message`].
    pub fn handles_message(&self, msg: u32) -> bool {
        message::is_intercepted(msg) && self.is_composing()
    }

    /// Translate one IME message into composition events.
    ///
    /// Always returns 0, the value the window procedure should return for
    /// messages it handled.
    pub fn handle_message(&mut self, msg: u32, _wparam: usize, lparam: isize) -> isize {
        match msg {
            WM_IME_STARTCOMPOSITION => {
                self.event.reset();
                self.event.state = CompositionState::Start;
                self.queue.put_event(&self.event);
            }
            WM_IME_ENDCOMPOSITION => {
                self.event.state = CompositionState::End;
                self.queue.put_event(&self.event);
                self.event.reset();
            }
            WM_IME_COMPOSITION => self.on_composition(lparam),
            _ => {}
        }
        0
    }

    fn on_composition(&mut self, lparam: isize) {
        if GcsIndex::ResultStr.is_set_in(lparam) {
            if let Some(result) = self.read(GcsIndex::ResultStr) {
                self.event.text = result.text;
                self.event.state = CompositionState::Result;
                self.queue.put_event(&self.event);
            }
        }
        if GcsIndex::CompStr.is_set_in(lparam) {
            if let Some(result) = self.read(GcsIndex::CompStr) {
                self.event.text = result.text;
                self.event.state = CompositionState::Compose;
                self.queue.put_event(&self.event);
            }
        }
        if self.track_cursor && GcsIndex::CursorPos.is_set_in(lparam) {
            if let Some(result) = self.read(GcsIndex::CursorPos) {
                self.event.cursor_pos = result.value;
                self.event.state = CompositionState::Compose;
                self.queue.put_event(&self.event);
            }
        }
    }

    fn read(&self, index: GcsIndex) -> Option<crate::imm::CompositionString> {
        match self.backend.composition_string(self.himc, index) {
            Ok(result) => Some(result),
            Err(err) => {
                warn!(?index, %err, "failed to read composition string");
                None
            }
        }
    }

    /// Move queued events to the end of `destination`.
    pub fn read_events<E>(&self, destination: &mut E)
    where
        E: Extend<CompositionEvent>,
    {
        self.queue.copy_events(destination);
    }

    /// The queue this window writes to.
    pub fn queue(&self) -> Arc<CompositionEventQueue> {
        Arc::clone(&self.queue)
    }

    /// Create a consumer for this window's events.
    pub fn poller(&self) -> ImePoller {
        ImePoller::new(Arc::clone(&self.queue), Arc::clone(&self.composing))
    }
}

impl<B: ImmBackend> Drop for WindowsIme<B> {
    fn drop(&mut self) {
        self.set_enabled(false);
        if self.backend.destroy_context(self.himc) {
            debug!(himc = self.himc.0, "destroyed input method context");
        } else {
            warn!(himc = self.himc.0, "failed to destroy input method context");
        }
    }
}
