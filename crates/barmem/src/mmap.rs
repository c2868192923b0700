//! Real device windows mapped from resource files.

use std::fs::OpenOptions;
use std::io;
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};
use std::ptr;

use crate::error::{BarError, Result};
use crate::region::BarRegion;

/// A register window memory-mapped from a device resource file (a PCI BAR exposed
/// under sysfs, a UIO region, or any file whose bytes are the device's registers).
///
/// The whole resource is mapped shared and read/write; the file is opened with
/// `O_SYNC` so stores are not held back by the page cache. Word accessors compile to
/// volatile loads/stores, which is what preserves the per-word access order and count
/// that register banks require. The block accessors compile to a plain `memcpy` and
/// must only be pointed at side-effect-free storage.
#[derive(Debug)]
pub struct MmapRegion {
    path: PathBuf,
    base: *mut u8,
    len: usize,
}

// The region hands out no references into the mapping; all access goes through
// volatile or byte-copy operations on the raw pointer, and the `&mut self` accessors
// already serialize use of one region.
unsafe impl Send for MmapRegion {}

impl MmapRegion {
    /// Maps the resource at `path`.
    ///
    /// Fails with [`BarError::Open`] when the file cannot be opened read/write, is
    /// empty, does not fit the platform's address space, or the mapping itself fails.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        match Self::map(&path) {
            Ok((base, len)) => {
                tracing::debug!(path = %path.display(), len, "mapped device window");
                Ok(Self { path, base, len })
            }
            Err(source) => Err(BarError::Open { path, source }),
        }
    }

    fn map(path: &Path) -> io::Result<(*mut u8, usize)> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_SYNC)
            .open(path)?;

        let len = file.metadata()?.len();
        if len == 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "zero-length resource",
            ));
        }
        let len = usize::try_from(len).map_err(|_| {
            io::Error::new(io::ErrorKind::InvalidData, "resource too large to map")
        })?;

        // Resource files expose the BAR from byte 0, so mapping the whole file at
        // offset 0 is page-aligned by construction.
        let base = unsafe {
            libc::mmap(
                ptr::null_mut(),
                len,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED,
                file.as_raw_fd(),
                0,
            )
        };
        if base == libc::MAP_FAILED {
            return Err(io::Error::last_os_error());
        }

        Ok((base as *mut u8, len))
    }

    /// Path the window was mapped from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Pointer to the word containing byte `offset`.
    ///
    /// Bounds were validated by the handle; the mask keeps sub-word offsets from
    /// producing a misaligned `u32` access.
    #[inline]
    fn word_ptr(&self, offset: u64) -> *mut u32 {
        unsafe { self.base.add((offset & !3) as usize) as *mut u32 }
    }
}

impl BarRegion for MmapRegion {
    fn size(&self) -> u64 {
        self.len as u64
    }

    #[inline]
    fn read_word(&mut self, offset: u64) -> u32 {
        unsafe { ptr::read_volatile(self.word_ptr(offset)) }
    }

    #[inline]
    fn write_word(&mut self, offset: u64, value: u32) {
        unsafe { ptr::write_volatile(self.word_ptr(offset), value) }
    }

    fn read_block(&mut self, offset: u64, dst: &mut [u32]) {
        unsafe {
            ptr::copy_nonoverlapping(
                self.word_ptr(offset) as *const u8,
                dst.as_mut_ptr() as *mut u8,
                dst.len() * 4,
            );
        }
    }

    fn write_block(&mut self, offset: u64, src: &[u32]) {
        unsafe {
            ptr::copy_nonoverlapping(
                src.as_ptr() as *const u8,
                self.word_ptr(offset) as *mut u8,
                src.len() * 4,
            );
        }
    }
}

impl Drop for MmapRegion {
    fn drop(&mut self) {
        // Nothing useful to do if this fails; the kernel reclaims the mapping on
        // process exit regardless.
        unsafe {
            libc::munmap(self.base as *mut libc::c_void, self.len);
        }
        tracing::debug!(path = %self.path.display(), "unmapped device window");
    }
}
