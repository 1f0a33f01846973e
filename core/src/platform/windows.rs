//! `imm32` backend.

use std::ptr;

use windows_sys::Win32::UI::Input::Ime::{
    ImmAssociateContext, ImmCreateContext, ImmDestroyContext, ImmGetCompositionStringW,
};

use crate::imm::{CompositionString, GcsIndex, Himc, Hwnd, ImmBackend, ImmError};

/// Input Method Manager calls through `imm32.dll`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Imm32;

impl Imm32 {
    pub fn new() -> Self {
        Imm32
    }
}

impl ImmBackend for Imm32 {
    fn create_context(&self) -> Result<Himc, ImmError> {
        // SAFETY: takes no arguments; a null return is handled below.
        let himc = Himc(unsafe { ImmCreateContext() } as isize);
        if himc.is_null() {
            Err(ImmError::ContextCreation)
        } else {
            Ok(himc)
        }
    }

    fn destroy_context(&self, himc: Himc) -> bool {
        // SAFETY: handles are plain values; an invalid one makes the call fail.
        unsafe { ImmDestroyContext(himc.0 as _) != 0 }
    }

    fn associate_context(&self, hwnd: Hwnd, himc: Himc) -> Himc {
        // SAFETY: no pointers are passed; a null `himc` detaches the window.
        Himc(unsafe { ImmAssociateContext(hwnd.0 as _, himc.0 as _) } as isize)
    }

    fn composition_string(
        &self,
        himc: Himc,
        index: GcsIndex,
    ) -> Result<CompositionString, ImmError> {
        // Without a buffer the call returns the size in bytes, or the value
        // itself for numeric indices.
        // SAFETY: a null buffer with length 0 is never written to.
        let size = unsafe {
            ImmGetCompositionStringW(himc.0 as _, index.bit(), ptr::null_mut(), 0)
        };
        if let Some(err) = ImmError::from_code(size) {
            return Err(err);
        }
        if index.is_numeric() {
            return Ok(CompositionString::number(size));
        }

        let byte_len = usize::try_from(size).map_err(|_| ImmError::General)?;
        let mut buf = vec![0u16; byte_len.div_ceil(2)];
        // SAFETY: `buf` holds at least `size` bytes and outlives the call.
        let written = unsafe {
            ImmGetCompositionStringW(
                himc.0 as _,
                index.bit(),
                buf.as_mut_ptr().cast(),
                size as u32,
            )
        };
        if let Some(err) = ImmError::from_code(written) {
            return Err(err);
        }

        let units = (usize::try_from(written).unwrap_or(0) / 2).min(buf.len());
        Ok(CompositionString {
            value: written,
            text: Some(String::from_utf16_lossy(&buf[..units])),
        })
    }
}
