//! FIFO-style streaming transfers.
//!
//! A hardware FIFO exposes a fixed data-port register that drains or fills one entry
//! per access, plus a fill-level register reporting how many words may be
//! transferred right now. The checked operations re-read that level before every
//! chunk; the `_unchecked` ones trust the caller's own knowledge of FIFO state and
//! skip the polling entirely.

use std::hint;

use crate::error::Result;
use crate::handle::{word_count, BarHandle};
use crate::region::check_words;

impl BarHandle {
    /// Drains `count` words from the FIFO data port at `address`, gated by the
    /// fill-level register at `fill_level_address`.
    ///
    /// Each round re-reads the level (it is a live register, never cached) and
    /// transfers `min(level, remaining)` words as repeated single-word reads at the
    /// fixed port offset (the port does not advance; successive reads at the same
    /// offset return successive FIFO entries). A level of zero busy-waits until the
    /// device reports data: there is no internal timeout, and the call blocks until
    /// all `count` words are drained. Callers needing a bound must impose one
    /// externally.
    ///
    /// On success exactly `count` words were read, in FIFO order, with no word
    /// skipped or duplicated.
    pub fn read_fifo(
        &mut self,
        fill_level_address: u64,
        address: u64,
        count: u32,
    ) -> Result<Vec<u32>> {
        let region = self.region_mut()?;
        check_words(region.size(), fill_level_address, 1)?;
        check_words(region.size(), address, 1)?;

        let mut words = Vec::with_capacity(count as usize);
        let mut remaining = count;
        while remaining > 0 {
            let level = region.read_word(fill_level_address);
            let chunk = level.min(remaining);
            if chunk == 0 {
                hint::spin_loop();
                continue;
            }
            for _ in 0..chunk {
                words.push(region.read_word(address));
            }
            remaining -= chunk;
        }
        Ok(words)
    }

    /// Pushes all of `data` into the FIFO data port at `address`, bounded per chunk
    /// by the free space reported by the fill-level register at
    /// `fill_level_address`.
    ///
    /// Symmetric to [`BarHandle::read_fifo`], including the unbounded wait while the
    /// device reports no free space.
    pub fn write_fifo(
        &mut self,
        fill_level_address: u64,
        address: u64,
        data: &[u32],
    ) -> Result<()> {
        word_count(data)?;
        let region = self.region_mut()?;
        check_words(region.size(), fill_level_address, 1)?;
        check_words(region.size(), address, 1)?;

        let mut rest = data;
        while !rest.is_empty() {
            let level = region.read_word(fill_level_address);
            let chunk = (level as usize).min(rest.len());
            if chunk == 0 {
                hint::spin_loop();
                continue;
            }
            let (now, later) = rest.split_at(chunk);
            for word in now {
                region.write_word(address, *word);
            }
            rest = later;
        }
        Ok(())
    }

    /// Drains `count` words from the data port without consulting any fill-level
    /// register.
    ///
    /// The caller asserts, out of band, that the FIFO already holds `count` words,
    /// e.g. from a prior interrupt or a fixed-depth protocol. If that assertion is wrong the
    /// device returns whatever it returns (stale or default words) and nothing here
    /// detects it; prefer [`BarHandle::read_fifo`] unless the polling overhead
    /// actually matters.
    pub fn read_fifo_unchecked(&mut self, address: u64, count: u32) -> Result<Vec<u32>> {
        let region = self.region_mut()?;
        check_words(region.size(), address, 1)?;
        let mut words = Vec::with_capacity(count as usize);
        for _ in 0..count {
            words.push(region.read_word(address));
        }
        Ok(words)
    }

    /// Pushes all of `data` into the data port without consulting any fill-level
    /// register; on real hardware an overflowed FIFO silently drops words.
    pub fn write_fifo_unchecked(&mut self, address: u64, data: &[u32]) -> Result<()> {
        word_count(data)?;
        let region = self.region_mut()?;
        check_words(region.size(), address, 1)?;
        for word in data {
            region.write_word(address, *word);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::error::BarError;
    use crate::handle::BarHandle;
    use crate::region::MockRegion;

    #[test]
    fn fifo_ops_validate_port_bounds() {
        let mut h = BarHandle::from_region(Box::new(MockRegion::new(0x10)));
        assert!(matches!(
            h.read_fifo(0x0, 0x10, 1),
            Err(BarError::OutOfBounds { .. })
        ));
        assert!(matches!(
            h.write_fifo(0x10, 0x0, &[1]),
            Err(BarError::OutOfBounds { .. })
        ));
        assert!(matches!(
            h.read_fifo_unchecked(0x10, 1),
            Err(BarError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn fifo_ops_fail_on_closed_handle() {
        let mut h = BarHandle::from_region(Box::new(MockRegion::new(0x10)));
        h.close();
        assert!(matches!(h.read_fifo(0x0, 0x4, 1), Err(BarError::Closed)));
        assert!(matches!(
            h.write_fifo_unchecked(0x4, &[1]),
            Err(BarError::Closed)
        ));
    }

    #[test]
    fn zero_word_fifo_transfers_complete_immediately() {
        // A zero-length request must not poll the (zero) fill level forever.
        let mut h = BarHandle::from_region(Box::new(MockRegion::new(0x10)));
        assert_eq!(h.read_fifo(0x0, 0x4, 0).unwrap(), Vec::<u32>::new());
        h.write_fifo(0x0, 0x4, &[]).unwrap();
        assert_eq!(h.read_fifo_unchecked(0x4, 0).unwrap(), Vec::<u32>::new());
    }
}
