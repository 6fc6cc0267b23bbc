// parallel.rs - Chunked fan-out over live entity slices
//
// CPU-heavy systems split a slice of entities into contiguous chunks, run
// each chunk on a rayon worker and fan back in before returning. Nothing
// here mutates shared kernel state; callers collect per-chunk results and
// apply them on the ticking thread.

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuildError, ThreadPoolBuilder};

/// Chunk length that spreads `len` items over `workers` threads.
#[inline]
pub fn chunk_size(len: usize, workers: usize) -> usize {
    let workers = workers.max(1);
    len.div_ceil(workers).max(1)
}

/// Build a dedicated worker pool. `None` sizes it to hardware parallelism.
pub fn build_worker_pool(threads: Option<usize>) -> Result<ThreadPool, ThreadPoolBuildError> {
    let mut builder = ThreadPoolBuilder::new().thread_name(|i| format!("cadence-worker-{i}"));
    if let Some(threads) = threads {
        builder = builder.num_threads(threads);
    }
    builder.build()
}

/// Run `f` over contiguous chunks of `items` in parallel.
///
/// Returns one result per chunk, in slice order. The call returns only after
/// every chunk has completed (join barrier).
///
/// # Example
/// ```ignore
/// let sums = par_chunks(&values, |chunk| chunk.iter().sum::<i64>());
/// let total: i64 = sums.into_iter().sum();
/// ```
pub fn par_chunks<T, R, F>(items: &[T], f: F) -> Vec<R>
where
    T: Sync,
    R: Send,
    F: Fn(&[T]) -> R + Sync + Send,
{
    if items.is_empty() {
        return Vec::new();
    }
    let size = chunk_size(items.len(), rayon::current_num_threads());
    items.par_chunks(size).map(|chunk| f(chunk)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_size() {
        assert_eq!(chunk_size(10, 4), 3);
        assert_eq!(chunk_size(8, 4), 2);
        assert_eq!(chunk_size(3, 8), 1);
        assert_eq!(chunk_size(0, 4), 1);
        assert_eq!(chunk_size(5, 0), 5);
    }

    #[test]
    fn test_par_chunks_covers_every_item_in_order() {
        let items: Vec<u64> = (1..=1000).collect();
        let chunks = par_chunks(&items, |chunk| chunk.to_vec());
        let flattened: Vec<u64> = chunks.into_iter().flatten().collect();
        assert_eq!(flattened, items);
    }

    #[test]
    fn test_par_chunks_on_dedicated_pool() {
        let pool = build_worker_pool(Some(2)).expect("pool builds");
        let items: Vec<u64> = (0..100).collect();
        let sums = pool.install(|| par_chunks(&items, |chunk| chunk.iter().sum::<u64>()));
        assert_eq!(sums.len(), 2);
        assert_eq!(sums.into_iter().sum::<u64>(), 4950);
    }

    #[test]
    fn test_par_chunks_empty() {
        let items: Vec<u32> = Vec::new();
        assert!(par_chunks(&items, |chunk| chunk.len()).is_empty());
    }
}
