//! Scripted input method backend and trace replay.
//!
//! `ScriptedImm` implements [`ImmBackend`] without an operating system: the
//! caller decides what each composition string query returns. A [`Trace`]
//! describes a recorded sequence of IME window messages; [`replay`] runs it
//! through a [`WindowsIme`] and returns the batches the polling loop would
//! have seen.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};

use crate::error::ImeError;
use crate::event::CompositionEvent;
use crate::handler::WindowsIme;
use crate::imm::{CompositionString, GcsIndex, Himc, Hwnd, ImmBackend, ImmError};
use crate::message::{WM_IME_COMPOSITION, WM_IME_ENDCOMPOSITION, WM_IME_STARTCOMPOSITION};
use crate::ImeConfig;

#[derive(Debug, Default)]
struct ScriptState {
    next_handle: isize,
    live: HashSet<Himc>,
    associations: HashMap<Hwnd, Himc>,
    strings: HashMap<GcsIndex, Result<CompositionString, ImmError>>,
    created: usize,
    associate_calls: usize,
    fail_create: bool,
}

/// In-memory input method manager.
#[derive(Debug, Default)]
pub struct ScriptedImm {
    state: Mutex<ScriptState>,
}

impl ScriptedImm {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, ScriptState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Answer queries for `index` with `text`.
    pub fn set_string(&self, index: GcsIndex, text: &str) {
        self.lock()
            .strings
            .insert(index, Ok(CompositionString::text(text)));
    }

    /// Answer queries for `index` with a number (caret or delta position).
    pub fn set_number(&self, index: GcsIndex, value: i32) {
        self.lock()
            .strings
            .insert(index, Ok(CompositionString::number(value)));
    }

    /// Make queries for `index` fail.
    pub fn set_error(&self, index: GcsIndex, err: ImmError) {
        self.lock().strings.insert(index, Err(err));
    }

    /// Forget every scripted answer.
    pub fn clear_strings(&self) {
        self.lock().strings.clear();
    }

    /// Make the next `create_context` calls fail.
    pub fn fail_context_creation(&self, fail: bool) {
        self.lock().fail_create = fail;
    }

    pub fn contexts_created(&self) -> usize {
        self.lock().created
    }

    pub fn live_contexts(&self) -> usize {
        self.lock().live.len()
    }

    pub fn associate_calls(&self) -> usize {
        self.lock().associate_calls
    }

    /// Context currently associated with `hwnd`.
    pub fn associated(&self, hwnd: Hwnd) -> Himc {
        self.lock()
            .associations
            .get(&hwnd)
            .copied()
            .unwrap_or(Himc::NULL)
    }
}

impl ImmBackend for ScriptedImm {
    fn create_context(&self) -> Result<Himc, ImmError> {
        let mut state = self.lock();
        if state.fail_create {
            return Err(ImmError::ContextCreation);
        }
        state.next_handle += 1;
        let himc = Himc(state.next_handle);
        state.live.insert(himc);
        state.created += 1;
        Ok(himc)
    }

    fn destroy_context(&self, himc: Himc) -> bool {
        self.lock().live.remove(&himc)
    }

    fn associate_context(&self, hwnd: Hwnd, himc: Himc) -> Himc {
        let mut state = self.lock();
        state.associate_calls += 1;
        state
            .associations
            .insert(hwnd, himc)
            .unwrap_or(Himc::NULL)
    }

    fn composition_string(
        &self,
        himc: Himc,
        index: GcsIndex,
    ) -> Result<CompositionString, ImmError> {
        let state = self.lock();
        if !state.live.contains(&himc) {
            return Err(ImmError::General);
        }
        state
            .strings
            .get(&index)
            .cloned()
            .unwrap_or(Err(ImmError::NoData))
    }
}

/// One recorded step of an IME session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TraceStep {
    /// `WM_IME_STARTCOMPOSITION`
    Start,
    /// `WM_IME_ENDCOMPOSITION`
    End,
    /// `WM_IME_COMPOSITION` with a `GCS_*` bit for every field present
    Composition {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        result: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        compose: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cursor: Option<i32>,
    },
    /// Any other window message, delivered as is
    Message {
        msg: u32,
        #[serde(default)]
        lparam: isize,
    },
    SetComposing { composing: bool },
    SetEnabled { enabled: bool },
    /// Drain the queue as the polling loop would
    Poll,
}

/// A recorded IME session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trace {
    /// Window the session belongs to; any non-zero value
    #[serde(default = "default_hwnd")]
    pub hwnd: isize,
    pub steps: Vec<TraceStep>,
}

fn default_hwnd() -> isize {
    1
}

impl Trace {
    /// Parse a trace from JSON.
    pub fn from_json_str(content: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(content)
    }
}

/// Run `trace` through a fresh [`WindowsIme`].
///
/// Returns one batch per `Poll` step, plus a final batch for whatever is
/// still queued at the end (omitted when empty). Messages are only delivered
/// while the handler intercepts them, as a window procedure would do.
pub fn replay(trace: &Trace, config: &ImeConfig) -> Result<Vec<Vec<CompositionEvent>>, ImeError> {
    let imm = ScriptedImm::new();
    let mut ime = WindowsIme::new(&imm, Hwnd(trace.hwnd), config)?;
    let mut batches = Vec::new();

    for step in &trace.steps {
        match step {
            TraceStep::Start => deliver(&mut ime, WM_IME_STARTCOMPOSITION, 0),
            TraceStep::End => deliver(&mut ime, WM_IME_ENDCOMPOSITION, 0),
            TraceStep::Composition {
                result,
                compose,
                cursor,
            } => {
                imm.clear_strings();
                let mut lparam = 0u32;
                if let Some(text) = result {
                    imm.set_string(GcsIndex::ResultStr, text);
                    lparam |= GcsIndex::ResultStr.bit();
                }
                if let Some(text) = compose {
                    imm.set_string(GcsIndex::CompStr, text);
                    lparam |= GcsIndex::CompStr.bit();
                }
                if let Some(pos) = cursor {
                    imm.set_number(GcsIndex::CursorPos, *pos);
                    lparam |= GcsIndex::CursorPos.bit();
                }
                deliver(&mut ime, WM_IME_COMPOSITION, lparam as isize);
            }
            TraceStep::Message { msg, lparam } => deliver(&mut ime, *msg, *lparam),
            TraceStep::SetComposing { composing } => ime.set_composing(*composing),
            TraceStep::SetEnabled { enabled } => ime.set_enabled(*enabled),
            TraceStep::Poll => batches.push(ime.queue().drain()),
        }
    }

    let rest = ime.queue().drain();
    if !rest.is_empty() {
        batches.push(rest);
    }
    Ok(batches)
}

fn deliver<B: ImmBackend>(ime: &mut WindowsIme<B>, msg: u32, lparam: isize) {
    if ime.handles_message(msg) {
        ime.handle_message(msg, 0, lparam);
    }
}
