//! libimm-core
//!
//! Windows Input Method Editor integration: the composition event queue that
//! sits between the window procedure and the input polling loop, the message
//! translation that feeds it, and the Input Method Manager calls behind it.
//!
//! Public API:
//! - `CompositionEvent` - Snapshot of an IME composition notification
//! - `CompositionEventQueue` - Coalescing buffer between producer and consumer
//! - `WindowsIme` - Per-window context and IME message handling
//! - `ImePoller` - Consumer side: poll, walk and read composition events
//! - `ImmBackend` - Operating system seam (`Imm32` on Windows, `ScriptedImm` anywhere)
//! - `ImeConfig` - Startup flags and tuning
use serde::{Deserialize, Serialize};

pub mod event;
pub use event::{CompositionEvent, CompositionState};

pub mod queue;
pub use queue::CompositionEventQueue;

pub mod imm;
pub use imm::{CompositionString, GcsIndex, Himc, Hwnd, ImmBackend, ImmError};

pub mod message;

pub mod error;
pub use error::ImeError;

pub mod handler;
pub use handler::WindowsIme;

pub mod poller;
pub use poller::ImePoller;

pub mod replay;
pub use replay::{replay, ScriptedImm, Trace, TraceStep};

pub mod platform;
#[cfg(windows)]
pub use platform::Imm32;

/// IME session configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ImeConfig {
    /// Associate the context with the window as soon as it is created
    pub enabled_on_create: bool,

    /// Intercept IME messages from the start instead of leaving them to the
    /// default window procedure
    pub composing_on_create: bool,

    /// Queue a `Compose` update when the caret moves (`GCS_CURSORPOS`)
    pub track_cursor: bool,

    /// Initial capacity of the event buffer
    pub queue_capacity: usize,
}

impl Default for ImeConfig {
    fn default() -> Self {
        Self {
            enabled_on_create: true,
            composing_on_create: false,
            track_cursor: true,
            queue_capacity: 16,
        }
    }
}

impl ImeConfig {
    /// Load configuration from a TOML file.
    pub fn load_toml<P: AsRef<std::path::Path>>(path: P) -> Result<Self, ImeError> {
        let content = std::fs::read_to_string(path)?;
        let config: ImeConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a TOML file.
    pub fn save_toml<P: AsRef<std::path::Path>>(&self, path: P) -> Result<(), ImeError> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load configuration from TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Serialize configuration to TOML string.
    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}
