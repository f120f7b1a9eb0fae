//! Read-only view of a named shared-memory mapping

use crate::{Result, TelemetryError};
use std::ptr::NonNull;
use tracing::{debug, trace};
use windows::Win32::Foundation::{CloseHandle, ERROR_FILE_NOT_FOUND, HANDLE};
use windows::Win32::System::Memory::{
    FILE_MAP_READ, MEMORY_MAPPED_VIEW_ADDRESS, MapViewOfFile, OpenFileMappingW, UnmapViewOfFile,
};
use windows::core::PCWSTR;

/// Mapped view of a producer-owned region
pub struct SharedRegion {
    mapping: HANDLE,
    base: NonNull<u8>,
    len: usize,
}

// SAFETY: the view is read-only and the handles are process-wide kernel objects.
unsafe impl Send for SharedRegion {}

impl SharedRegion {
    /// Open an existing mapping and map `len` bytes of it.
    pub fn open(name: &str, len: usize) -> Result<Self> {
        trace!(name, len, "Opening shared region");

        let wide_name = wide_string(name);
        let mapping = unsafe { OpenFileMappingW(FILE_MAP_READ.0, false, PCWSTR::from_raw(wide_name.as_ptr())) }
            .map_err(|e| {
                if e.code() == ERROR_FILE_NOT_FOUND.to_hresult() {
                    TelemetryError::channel_missing(name)
                } else {
                    TelemetryError::windows_api_error("OpenFileMappingW", e)
                }
            })?;

        let view = unsafe { MapViewOfFile(mapping, FILE_MAP_READ, 0, 0, len) };
        let Some(base) = NonNull::new(view.Value as *mut u8) else {
            let win_err = windows::core::Error::from_thread();
            unsafe {
                let _ = CloseHandle(mapping);
            }
            return Err(TelemetryError::windows_api_error("MapViewOfFile", win_err));
        };

        debug!(name, len, "Mapped shared region");
        Ok(Self { mapping, base, len })
    }

    /// The mapped bytes. The producer may be writing concurrently.
    pub fn bytes(&self) -> &[u8] {
        // SAFETY: base points at a live view of at least `len` bytes until drop.
        unsafe { std::slice::from_raw_parts(self.base.as_ptr(), self.len) }
    }
}

impl Drop for SharedRegion {
    fn drop(&mut self) {
        unsafe {
            let _ = UnmapViewOfFile(MEMORY_MAPPED_VIEW_ADDRESS { Value: self.base.as_ptr() as *mut _ });
            let _ = CloseHandle(self.mapping);
        }
    }
}

fn wide_string(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(std::iter::once(0)).collect()
}
