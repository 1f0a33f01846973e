//! Input Method Manager surface used by the message handler.
//!
//! `ImmBackend` is the seam between the handler and the operating system: a
//! real `imm32` implementation lives in `platform::windows`, and
//! `replay::ScriptedImm` answers from recorded data.

use thiserror::Error;

/// `ImmGetCompositionString` returned `IMM_ERROR_NODATA`.
pub const IMM_ERROR_NODATA: i32 = -1;
/// `ImmGetCompositionString` returned `IMM_ERROR_GENERAL`.
pub const IMM_ERROR_GENERAL: i32 = -2;

/// Window handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Hwnd(pub isize);

impl Hwnd {
    pub const NULL: Hwnd = Hwnd(0);

    pub fn is_null(self) -> bool {
        self.0 == 0
    }
}

/// Input method context handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Himc(pub isize);

impl Himc {
    pub const NULL: Himc = Himc(0);

    pub fn is_null(self) -> bool {
        self.0 == 0
    }
}

/// Index passed to `ImmGetCompositionString`; doubles as the `GCS_*` bit
/// carried in the `lParam` of `WM_IME_COMPOSITION`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum GcsIndex {
    CompReadStr = 0x0001,
    CompReadAttr = 0x0002,
    CompReadClause = 0x0004,
    CompStr = 0x0008,
    CompAttr = 0x0010,
    CompClause = 0x0020,
    CursorPos = 0x0080,
    DeltaStart = 0x0100,
    ResultReadStr = 0x0200,
    ResultReadClause = 0x0400,
    ResultStr = 0x0800,
    ResultClause = 0x1000,
}

impl GcsIndex {
    pub fn bit(self) -> u32 {
        self as u32
    }

    /// Check if this index is set in a `WM_IME_COMPOSITION` `lParam`.
    pub fn is_set_in(self, lparam: isize) -> bool {
        (lparam as u32) & self.bit() != 0
    }

    /// Indices for which the OS returns a number instead of a string.
    pub fn is_numeric(self) -> bool {
        matches!(self, GcsIndex::CursorPos | GcsIndex::DeltaStart)
    }
}

/// Result of a composition string query.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CompositionString {
    /// Byte length of the string, or the position for numeric indices
    pub value: i32,
    /// Decoded text; `None` for numeric indices
    pub text: Option<String>,
}

impl CompositionString {
    pub fn number(value: i32) -> Self {
        Self { value, text: None }
    }

    /// Build the answer for a UTF-16 string of `text`, as the OS reports it.
    pub fn text<T: Into<String>>(text: T) -> Self {
        let text = text.into();
        let bytes = text.encode_utf16().count() * 2;
        Self {
            value: i32::try_from(bytes).unwrap_or(i32::MAX),
            text: Some(text),
        }
    }
}

/// Errors reported by the Input Method Manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ImmError {
    #[error("no composition data available")]
    NoData,
    #[error("input method manager reported a general error")]
    General,
    #[error("failed to create an input method context")]
    ContextCreation,
}

impl ImmError {
    /// Map a negative `ImmGetCompositionString` return value.
    pub fn from_code(code: i32) -> Option<ImmError> {
        match code {
            IMM_ERROR_NODATA => Some(ImmError::NoData),
            IMM_ERROR_GENERAL => Some(ImmError::General),
            _ => None,
        }
    }
}

/// Operating system calls the IME handler depends on.
pub trait ImmBackend {
    /// Create a new input method context.
    fn create_context(&self) -> Result<Himc, ImmError>;

    /// Destroy a context created by `create_context`.
    fn destroy_context(&self, himc: Himc) -> bool;

    /// Associate `himc` with `hwnd` and return the previous context.
    /// `Himc::NULL` detaches the window from any context.
    fn associate_context(&self, hwnd: Hwnd, himc: Himc) -> Himc;

    /// Read one part of the current composition.
    fn composition_string(
        &self,
        himc: Himc,
        index: GcsIndex,
    ) -> Result<CompositionString, ImmError>;
}

impl<B: ImmBackend + ?Sized> ImmBackend for &B {
    fn create_context(&self) -> Result<Himc, ImmError> {
        (**self).create_context()
    }

    fn destroy_context(&self, himc: Himc) -> bool {
        (**self).destroy_context(himc)
    }

    fn associate_context(&self, hwnd: Hwnd, himc: Himc) -> Himc {
        (**self).associate_context(hwnd, himc)
    }

    fn composition_string(
        &self,
        himc: Himc,
        index: GcsIndex,
    ) -> Result<CompositionString, ImmError> {
        (**self).composition_string(himc, index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gcs_bits() {
        let lparam = (GcsIndex::CompStr.bit() | GcsIndex::CursorPos.bit()) as isize;
        assert!(GcsIndex::CompStr.is_set_in(lparam));
        assert!(GcsIndex::CursorPos.is_set_in(lparam));
        assert!(!GcsIndex::ResultStr.is_set_in(lparam));
        assert_eq!(GcsIndex::ResultStr.bit(), 0x0800);
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(ImmError::from_code(-1), Some(ImmError::NoData));
        assert_eq!(ImmError::from_code(-2), Some(ImmError::General));
        assert_eq!(ImmError::from_code(0), None);
        assert_eq!(ImmError::from_code(12), None);
    }

    #[test]
    fn test_composition_string_length_is_utf16_bytes() {
        let s = CompositionString::text("日本");
        assert_eq!(s.value, 4);
        assert_eq!(s.text.as_deref(), Some("日本"));

        assert_eq!(CompositionString::number(5).text, None);
    }
}
