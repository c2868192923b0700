use std::fmt;
use std::path::PathBuf;

use crate::error::{BarError, Result};
#[cfg(unix)]
use crate::mmap::MmapRegion;
use crate::region::{check_words, BarRegion, MockRegion};

/// Which backend [`BarHandle::open`] constructs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapMode {
    /// Map the resource file as a real device window.
    Device,
    /// Back the handle with an in-process mock window of
    /// [`MockRegion::DEFAULT_SIZE`] bytes; never fails for a well-formed path.
    Mock,
}

/// An open device window: exclusive ownership of one [`BarRegion`] plus the closed
/// flag.
///
/// All register access goes through a handle. Operations on a closed handle fail
/// with [`BarError::Closed`]; closing is idempotent, monotonic, and also happens on
/// drop, so the mapping is released on every exit path, early returns and propagated
/// failures included.
///
/// A failed access never closes the handle: the whole range is validated before the
/// first register is touched, and a rejected operation leaves the window untouched.
pub struct BarHandle {
    region: Option<Box<dyn BarRegion>>,
}

impl BarHandle {
    /// Opens `path` in the given mode.
    ///
    /// `Device` fails with [`BarError::Open`] when the resource cannot be mapped.
    /// `Mock` ignores the filesystem entirely (the path only labels trace output)
    /// and cannot fail.
    pub fn open(path: impl Into<PathBuf>, mode: MapMode) -> Result<Self> {
        let path = path.into();
        let region: Box<dyn BarRegion> = match mode {
            #[cfg(unix)]
            MapMode::Device => Box::new(MmapRegion::open(path)?),
            #[cfg(not(unix))]
            MapMode::Device => {
                return Err(BarError::Open {
                    path,
                    source: std::io::Error::new(
                        std::io::ErrorKind::Unsupported,
                        "device mapping requires a unix host",
                    ),
                })
            }
            MapMode::Mock => {
                tracing::debug!(path = %path.display(), "opened mock window");
                Box::new(MockRegion::default())
            }
        };
        Ok(Self::from_region(region))
    }

    /// Wraps an already-constructed backend.
    ///
    /// This is the injection seam for custom [`BarRegion`] implementations, such as
    /// a scripted FIFO device in tests or a simulator bridge.
    pub fn from_region(region: Box<dyn BarRegion>) -> Self {
        Self {
            region: Some(region),
        }
    }

    /// Releases the backend (unmaps a real window, frees a mock buffer).
    ///
    /// Closing an already-closed handle is a no-op, not an error.
    pub fn close(&mut self) {
        if self.region.take().is_some() {
            tracing::debug!("closed handle");
        }
    }

    pub fn is_open(&self) -> bool {
        self.region.is_some()
    }

    /// Mapped window length in bytes.
    pub fn size(&self) -> Result<u64> {
        match &self.region {
            Some(region) => Ok(region.size()),
            None => Err(BarError::Closed),
        }
    }

    pub(crate) fn region_mut(&mut self) -> Result<&mut (dyn BarRegion + 'static)> {
        self.region.as_deref_mut().ok_or(BarError::Closed)
    }

    /// Reads the 32-bit register at byte `address`.
    pub fn read_word(&mut self, address: u64) -> Result<u32> {
        let region = self.region_mut()?;
        check_words(region.size(), address, 1)?;
        Ok(region.read_word(address))
    }

    /// Writes the 32-bit register at byte `address`.
    ///
    /// The engine guarantees exactly one 4-byte store; whatever action that triggers
    /// in the device is outside its control.
    pub fn write_word(&mut self, address: u64, value: u32) -> Result<()> {
        let region = self.region_mut()?;
        check_words(region.size(), address, 1)?;
        region.write_word(address, value);
        Ok(())
    }

    /// Reads `count` consecutive words starting at `address`, one register access
    /// per word in increasing address order.
    ///
    /// This is the strategy for register banks where each access can latch or
    /// auto-increment device state; per-word order and access count are preserved
    /// exactly. `count == 0` is a valid no-op. See
    /// [`BarHandle::read_range_memcpy`] when the target is plain memory.
    pub fn read_range(&mut self, address: u64, count: u32) -> Result<Vec<u32>> {
        let region = self.region_mut()?;
        check_words(region.size(), address, count.into())?;
        let mut words = Vec::with_capacity(count as usize);
        for i in 0..u64::from(count) {
            words.push(region.read_word(address + 4 * i));
        }
        Ok(words)
    }

    /// Writes `data` starting at `address`, one register access per word in
    /// increasing address order.
    pub fn write_range(&mut self, address: u64, data: &[u32]) -> Result<()> {
        let count = word_count(data)?;
        let region = self.region_mut()?;
        check_words(region.size(), address, count)?;
        for (i, word) in data.iter().enumerate() {
            region.write_word(address + 4 * i as u64, *word);
        }
        Ok(())
    }

    /// Like [`BarHandle::read_range`] but as one contiguous block copy.
    ///
    /// Produces the same bytes on memory-like storage and is expected to be faster,
    /// at the price of any per-word ordering or access-count guarantee at the
    /// hardware level. Not interchangeable with the iterative strategy on
    /// side-effecting register banks: the engine never substitutes one for the
    /// other; the caller chooses.
    pub fn read_range_memcpy(&mut self, address: u64, count: u32) -> Result<Vec<u32>> {
        let region = self.region_mut()?;
        check_words(region.size(), address, count.into())?;
        let mut words = vec![0u32; count as usize];
        region.read_block(address, &mut words);
        Ok(words)
    }

    /// Like [`BarHandle::write_range`] but as one contiguous block copy; see
    /// [`BarHandle::read_range_memcpy`] for the trade-off.
    pub fn write_range_memcpy(&mut self, address: u64, data: &[u32]) -> Result<()> {
        let count = word_count(data)?;
        let region = self.region_mut()?;
        check_words(region.size(), address, count)?;
        region.write_block(address, data);
        Ok(())
    }
}

/// Write-path buffer lengths must fit the `u32` word-count domain.
pub(crate) fn word_count(data: &[u32]) -> Result<u64> {
    u32::try_from(data.len())
        .map(u64::from)
        .map_err(|_| BarError::TransferSize { len: data.len() })
}

impl fmt::Debug for BarHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BarHandle")
            .field("open", &self.is_open())
            .finish()
    }
}

impl Drop for BarHandle {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle(len: u64) -> BarHandle {
        BarHandle::from_region(Box::new(MockRegion::new(len)))
    }

    #[test]
    fn word_roundtrip() {
        let mut h = handle(0x100);
        h.write_word(0x10, 0xDEAD_BEEF).unwrap();
        assert_eq!(h.read_word(0x10).unwrap(), 0xDEAD_BEEF);
    }

    #[test]
    fn iterative_range_walks_increasing_addresses() {
        let mut h = handle(0x100);
        h.write_range(0x20, &[1, 2, 3, 4]).unwrap();
        assert_eq!(h.read_word(0x20).unwrap(), 1);
        assert_eq!(h.read_word(0x2C).unwrap(), 4);
        assert_eq!(h.read_range(0x20, 4).unwrap(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn zero_word_range_is_a_noop() {
        let mut h = handle(0x100);
        assert_eq!(h.read_range(0x0, 0).unwrap(), Vec::<u32>::new());
        h.write_range(0x0, &[]).unwrap();
        // Also valid exactly at the end of the window.
        assert_eq!(h.read_range_memcpy(0x100, 0).unwrap(), Vec::<u32>::new());
    }

    #[test]
    fn out_of_bounds_is_rejected_before_any_access() {
        let mut h = handle(0x100);
        h.write_word(0xFC, 0x1234_5678).unwrap();
        assert!(matches!(
            h.write_range(0xFC, &[1, 2]),
            Err(BarError::OutOfBounds { .. })
        ));
        // The in-bounds word was not touched by the rejected transfer.
        assert_eq!(h.read_word(0xFC).unwrap(), 0x1234_5678);
    }

    #[test]
    fn failed_access_leaves_handle_open() {
        let mut h = handle(0x100);
        let _ = h.read_word(0x1000).unwrap_err();
        assert!(h.is_open());
        h.write_word(0x0, 1).unwrap();
    }

    #[test]
    fn close_is_idempotent_and_terminal() {
        let mut h = handle(0x100);
        h.close();
        h.close();
        assert!(!h.is_open());
        assert!(matches!(h.read_word(0), Err(BarError::Closed)));
        assert!(matches!(h.size(), Err(BarError::Closed)));
        assert!(matches!(
            h.write_range_memcpy(0, &[1]),
            Err(BarError::Closed)
        ));
    }
}
