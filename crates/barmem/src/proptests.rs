use proptest::prelude::*;

use crate::handle::BarHandle;
use crate::region::MockRegion;

const WINDOW_SIZE: u64 = 4 * 1024;
const MAX_WORDS: usize = 256;

fn data_strategy() -> impl Strategy<Value = Vec<u32>> {
    proptest::collection::vec(any::<u32>(), 0..MAX_WORDS)
}

/// A word-aligned offset leaving room for `words` words inside the window.
fn offset_strategy(words: usize) -> impl Strategy<Value = u64> {
    let max_word = WINDOW_SIZE / 4 - words as u64;
    (0..=max_word).prop_map(|w| w * 4)
}

fn window() -> BarHandle {
    BarHandle::from_region(Box::new(MockRegion::new(WINDOW_SIZE)))
}

proptest! {
    #[test]
    fn iterative_roundtrip(
        (data, offset) in data_strategy().prop_flat_map(|data| {
            let len = data.len();
            (Just(data), offset_strategy(len))
        })
    ) {
        let mut h = window();
        h.write_range(offset, &data).unwrap();
        prop_assert_eq!(h.read_range(offset, data.len() as u32).unwrap(), data);
    }

    #[test]
    fn strategies_are_interchangeable_on_plain_memory(
        (data, offset) in data_strategy().prop_flat_map(|data| {
            let len = data.len();
            (Just(data), offset_strategy(len))
        })
    ) {
        // All four write/read strategy pairings must observe identical words on a
        // side-effect-free window.
        let count = data.len() as u32;

        let mut iter_written = window();
        iter_written.write_range(offset, &data).unwrap();
        prop_assert_eq!(
            iter_written.read_range_memcpy(offset, count).unwrap(),
            data.clone()
        );

        let mut bulk_written = window();
        bulk_written.write_range_memcpy(offset, &data).unwrap();
        prop_assert_eq!(bulk_written.read_range(offset, count).unwrap(), data.clone());
        prop_assert_eq!(
            bulk_written.read_range_memcpy(offset, count).unwrap(),
            data
        );
    }

    #[test]
    fn out_of_window_ranges_are_rejected(
        offset in 0u64..2 * WINDOW_SIZE,
        count in 0u32..2 * (WINDOW_SIZE as u32 / 4),
    ) {
        let mut h = window();
        let fits = offset + 4 * u64::from(count) <= WINDOW_SIZE;
        prop_assert_eq!(h.read_range(offset, count).is_ok(), fits);
        prop_assert_eq!(h.read_range_memcpy(offset, count).is_ok(), fits);
    }
}
