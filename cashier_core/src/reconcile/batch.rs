//! Order-preserving batch partitioning

use std::num::NonZeroUsize;

/// Split `records` into consecutive batches of `chunk_size`
///
/// Every batch but the last is full; concatenating the batches yields the
/// input unchanged.
pub fn partition<T>(records: &[T], chunk_size: NonZeroUsize) -> std::slice::Chunks<'_, T> {
    records.chunks(chunk_size.get())
}

/// Number of batches [`partition`] produces for `len` records
pub fn batch_count(len: usize, chunk_size: NonZeroUsize) -> usize {
    len.div_ceil(chunk_size.get())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn size(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    #[test]
    fn test_twenty_five_records_in_chunks_of_ten() {
        let records: Vec<u32> = (0..25).collect();
        let sizes: Vec<usize> = partition(&records, size(10)).map(<[u32]>::len).collect();

        assert_eq!(sizes, vec![10, 10, 5]);
        assert_eq!(batch_count(records.len(), size(10)), 3);
    }

    #[test]
    fn test_empty_input_has_no_batches() {
        let records: Vec<u32> = Vec::new();
        assert_eq!(partition(&records, size(25)).count(), 0);
        assert_eq!(batch_count(0, size(25)), 0);
    }

    proptest! {
        #[test]
        fn prop_batches_cover_input_in_order(
            records in proptest::collection::vec(any::<u16>(), 0..200),
            chunk in 1usize..40,
        ) {
            let chunk = size(chunk);
            let batches: Vec<&[u16]> = partition(&records, chunk).collect();

            prop_assert_eq!(batches.len(), batch_count(records.len(), chunk));
            prop_assert_eq!(batches.concat(), records.clone());

            if let Some((last, full)) = batches.split_last() {
                prop_assert!(full.iter().all(|b| b.len() == chunk.get()));
                prop_assert!(!last.is_empty() && last.len() <= chunk.get());
            }
        }
    }
}
