//! Chunked evaluation of a cell table.
//!
//! The table is cut into `chunk_count` contiguous chunks (fewer only when
//! there are fewer cells), the last one taking the remainder. Each chunk
//! classifies into its own slice of a pre-sized output, and the slices are
//! never shared. With the `threading` feature the chunks run on a dedicated
//! rayon pool of `worker_count` threads; otherwise, or with one worker, they
//! run in order on the calling thread. Results do not depend on the worker
//! count.

use std::ops::Range;

#[cfg(feature = "threading")]
use rayon::prelude::*;
use tracing::debug;

use crate::cells::CellRecord;
use crate::error::{ClassifyError, Result};
use crate::koppen::table::ClassCode;
use crate::koppen::CellRule;

/// Index ranges of the chunks: `n = min(chunk_count, len)` slices of
/// `len / n` cells, the last one also holding the `len % n` remainder.
pub fn chunk_bounds(len: usize, chunk_count: usize) -> Vec<Range<usize>> {
    let n = chunk_count.min(len);
    if n == 0 {
        return Vec::new();
    }
    let base = len / n;
    (0..n)
        .map(|i| {
            let end = if i + 1 == n { len } else { (i + 1) * base };
            i * base..end
        })
        .collect()
}

/// Pair each chunk of `cells` with its disjoint slice of `out`.
fn split_chunks<'c, 'o>(
    cells: &'c [CellRecord],
    mut out: &'o mut [ClassCode],
    bounds: &[Range<usize>],
) -> Vec<(&'c [CellRecord], &'o mut [ClassCode])> {
    let mut pairs = Vec::with_capacity(bounds.len());
    for range in bounds {
        let (slot, rest) = std::mem::take(&mut out).split_at_mut(range.len());
        pairs.push((&cells[range.clone()], slot));
        out = rest;
    }
    pairs
}

/// Applies one [`CellRule`] across a cell table.
pub struct BatchEvaluator<'r, R: CellRule> {
    rule: &'r R,
}

impl<'r, R: CellRule> BatchEvaluator<'r, R> {
    pub fn new(rule: &'r R) -> Self {
        Self { rule }
    }

    /// Classify every cell. Output has the same length and order as `cells`.
    pub fn evaluate(
        &self,
        cells: &[CellRecord],
        chunk_count: usize,
        worker_count: usize,
    ) -> Result<Vec<ClassCode>> {
        if chunk_count == 0 {
            return Err(ClassifyError::InvalidChunkCount);
        }
        if worker_count == 0 {
            return Err(ClassifyError::InvalidWorkerCount);
        }

        let bounds = chunk_bounds(cells.len(), chunk_count);
        debug!(
            cells = cells.len(),
            chunk_count,
            chunks = bounds.len(),
            last_chunk = bounds.last().map_or(0, |r| r.len()),
            worker_count,
            "chunk plan"
        );

        let mut out = vec![ClassCode::UNCLASSIFIED; cells.len()];
        let pairs = split_chunks(cells, &mut out, &bounds);
        if worker_count == 1 {
            self.run_sequential(pairs);
        } else {
            self.run_pooled(pairs, worker_count)?;
        }
        Ok(out)
    }

    /// Classify every cell and store the result in its `classification`.
    pub fn evaluate_in_place(
        &self,
        cells: &mut [CellRecord],
        chunk_count: usize,
        worker_count: usize,
    ) -> Result<()> {
        let codes = self.evaluate(cells, chunk_count, worker_count)?;
        for (cell, code) in cells.iter_mut().zip(codes) {
            cell.classification = code;
        }
        Ok(())
    }

    fn run_sequential(&self, pairs: Vec<(&[CellRecord], &mut [ClassCode])>) {
        for (chunk, slot) in pairs {
            self.classify_chunk(chunk, slot);
        }
    }

    #[cfg(feature = "threading")]
    fn run_pooled(
        &self,
        pairs: Vec<(&[CellRecord], &mut [ClassCode])>,
        worker_count: usize,
    ) -> Result<()> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(worker_count)
            .build()
            .map_err(|e| ClassifyError::WorkerPool(e.to_string()))?;
        pool.install(|| {
            pairs
                .into_par_iter()
                .for_each(|(chunk, slot)| self.classify_chunk(chunk, slot));
        });
        Ok(())
    }

    #[cfg(not(feature = "threading"))]
    fn run_pooled(
        &self,
        pairs: Vec<(&[CellRecord], &mut [ClassCode])>,
        _worker_count: usize,
    ) -> Result<()> {
        self.run_sequential(pairs);
        Ok(())
    }

    #[inline]
    fn classify_chunk(&self, chunk: &[CellRecord], slot: &mut [ClassCode]) {
        for (code, cell) in slot.iter_mut().zip(chunk) {
            *code = self.rule.classify(cell);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::koppen::table::ClassTable;
    use crate::koppen::CellClassifier;

    /// Deterministic mix of climates across both hemispheres.
    fn synthetic_cells(n: usize) -> Vec<CellRecord> {
        let mut state: u64 = 7;
        let mut next = || {
            // LCG for deterministic pseudo-random
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            (state >> 11) as f32 / (1u64 << 53) as f32
        };
        (0..n)
            .map(|i| {
                let lat = (i as f64 / n as f64) * 180.0 - 90.0;
                let base = next() * 70.0 - 40.0;
                let wet = next() * 300.0;
                let t: [f32; 12] = std::array::from_fn(|m| base + (m as f32 - 5.5).abs() * 2.0);
                let p: [f32; 12] = std::array::from_fn(|m| wet * (0.2 + (m % 6) as f32 / 6.0));
                CellRecord::monthly(lat, 0.0, t, p)
            })
            .collect()
    }

    /// Marks each cell with its own index so ordering is visible.
    struct IndexRule;

    impl CellRule for IndexRule {
        fn classify(&self, cell: &CellRecord) -> ClassCode {
            ClassCode(cell.lon as u8)
        }
    }

    struct PanicRule;

    impl CellRule for PanicRule {
        fn classify(&self, cell: &CellRecord) -> ClassCode {
            if cell.lon == 13.0 {
                panic!("bad cell");
            }
            ClassCode(1)
        }
    }

    fn indexed(n: usize) -> Vec<CellRecord> {
        (0..n)
            .map(|i| CellRecord::monthly(0.0, i as f64, [0.0; 12], [0.0; 12]))
            .collect()
    }

    fn lens(len: usize, chunk_count: usize) -> Vec<usize> {
        chunk_bounds(len, chunk_count).iter().map(|r| r.len()).collect()
    }

    #[test]
    fn chunk_count_is_honoured_with_remainder_last() {
        assert_eq!(lens(9, 4), [2, 2, 2, 3]);
        assert_eq!(lens(10, 3), [3, 3, 4]);
        assert_eq!(lens(9, 3), [3, 3, 3]);
        assert_eq!(lens(100, 1), [100]);
    }

    #[test]
    fn fewer_cells_than_chunks() {
        assert_eq!(lens(2, 16), [1, 1]);
        assert!(chunk_bounds(0, 4).is_empty());
    }

    #[test]
    fn chunk_bounds_tile_the_table() {
        for (len, chunks) in [(1000, 16), (17, 5), (5, 5), (3, 7)] {
            let bounds = chunk_bounds(len, chunks);
            assert_eq!(bounds.len(), chunks.min(len));
            assert_eq!(bounds[0].start, 0);
            assert_eq!(bounds.last().unwrap().end, len);
            for pair in bounds.windows(2) {
                assert_eq!(pair[0].end, pair[1].start);
            }
        }
    }

    #[test]
    fn output_preserves_order() {
        let cells = indexed(50);
        let eval = BatchEvaluator::new(&IndexRule);
        for (chunks, workers) in [(1, 1), (4, 1), (7, 1), (7, 3), (64, 4)] {
            let out = eval.evaluate(&cells, chunks, workers).unwrap();
            let expected: Vec<ClassCode> = (0..50u8).map(ClassCode).collect();
            assert_eq!(out, expected, "chunks={chunks} workers={workers}");
        }
    }

    #[test]
    fn deterministic_across_worker_counts() {
        let table = ClassTable::koppen_geiger();
        let rule = CellClassifier::new(&table);
        let cells = synthetic_cells(1000);
        let eval = BatchEvaluator::new(&rule);

        let reference: Vec<ClassCode> = cells.iter().map(|c| rule.classify(c)).collect();
        assert!(reference.iter().any(|c| c.is_classified()));
        for workers in [1, 2, 4, 8] {
            for chunks in [1, 3, 16] {
                let out = eval.evaluate(&cells, chunks, workers).unwrap();
                assert_eq!(out, reference, "chunks={chunks} workers={workers}");
            }
        }
    }

    #[test]
    fn in_place_overwrites_classification() {
        let mut cells = indexed(20);
        BatchEvaluator::new(&IndexRule)
            .evaluate_in_place(&mut cells, 4, 2)
            .unwrap();
        for (i, c) in cells.iter().enumerate() {
            assert_eq!(c.classification, ClassCode(i as u8));
        }
    }

    #[test]
    fn empty_input_is_empty_output() {
        let out = BatchEvaluator::new(&IndexRule).evaluate(&[], 16, 4).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn zero_counts_are_rejected() {
        let cells = indexed(4);
        let eval = BatchEvaluator::new(&IndexRule);
        assert!(matches!(eval.evaluate(&cells, 0, 1), Err(ClassifyError::InvalidChunkCount)));
        assert!(matches!(eval.evaluate(&cells, 1, 0), Err(ClassifyError::InvalidWorkerCount)));
    }

    #[test]
    #[should_panic(expected = "bad cell")]
    fn panicking_chunk_fails_the_batch() {
        let cells = indexed(32);
        let _ = BatchEvaluator::new(&PanicRule).evaluate(&cells, 4, 2);
    }
}
