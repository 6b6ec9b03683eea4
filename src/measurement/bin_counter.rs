//! Fixed-Resolution Bin Counter
//!
//! A histogram over non-negative nanosecond magnitudes with a fixed bin width
//! and a fixed bin count. Each bin tracks how many samples landed in it and the
//! most recent raw sample it received.
//!
//! Storage is sized once in `configure()`. `record()` never allocates, never
//! fails and costs one division plus two slice writes, so it is safe to call
//! from an audio callback.

use crate::error::{JitterError, Result};

/// Sentinel stored in `last_values` for bins that were never written
const NO_VALUE: u64 = u64::MAX;

/// Fixed-width histogram with saturating overflow into the last bin
#[derive(Clone, Debug)]
pub struct BinCounter {
    bin_width: u64,
    counts: Box<[u64]>,
    last_values: Box<[u64]>,
    total: u64,
    max_value: u64,
}

impl BinCounter {
    /// Create a counter with the given geometry
    pub fn new(bin_width: u64, num_bins: usize) -> Result<Self> {
        validate_geometry(bin_width, num_bins)?;
        Ok(BinCounter {
            bin_width,
            counts: vec![0; num_bins].into_boxed_slice(),
            last_values: vec![NO_VALUE; num_bins].into_boxed_slice(),
            total: 0,
            max_value: 0,
        })
    }

    /// Reset all bins and apply a new geometry.
    /// Storage is reused when the bin count does not change.
    pub fn configure(&mut self, bin_width: u64, num_bins: usize) -> Result<()> {
        validate_geometry(bin_width, num_bins)?;
        if self.counts.len() == num_bins {
            self.counts.fill(0);
            self.last_values.fill(NO_VALUE);
        } else {
            self.counts = vec![0; num_bins].into_boxed_slice();
            self.last_values = vec![NO_VALUE; num_bins].into_boxed_slice();
        }
        self.bin_width = bin_width;
        self.total = 0;
        self.max_value = 0;
        Ok(())
    }

    /// Record one sample. Values past the last bin's upper edge are counted
    /// in the last bin.
    #[inline]
    pub fn record(&mut self, value: u64) {
        let index = self.bin_for(value);
        self.counts[index] += 1;
        self.last_values[index] = value;
        self.total += 1;
        if value > self.max_value {
            self.max_value = value;
        }
    }

    /// Bin index a value maps to
    #[inline]
    pub fn bin_for(&self, value: u64) -> usize {
        let last = self.counts.len() - 1;
        let index = value / self.bin_width;
        if index >= last as u64 {
            last
        } else {
            index as usize
        }
    }

    /// Lower edge of bin `index` in nanoseconds
    pub fn lower_edge(&self, index: usize) -> u64 {
        (index as u64).saturating_mul(self.bin_width)
    }

    /// Per-bin sample counts, bin 0 first
    pub fn counts(&self) -> &[u64] {
        &self.counts
    }

    /// Raw per-bin storage of the last recorded value, bin 0 first.
    /// Bins never written hold `u64::MAX`; prefer `last_value()`.
    pub fn last_values(&self) -> &[u64] {
        &self.last_values
    }

    /// Most recent value recorded into `index`, or `None` if the bin is empty
    pub fn last_value(&self, index: usize) -> Option<u64> {
        match self.last_values.get(index) {
            Some(&NO_VALUE) | None => None,
            Some(&value) => Some(value),
        }
    }

    pub fn num_bins(&self) -> usize {
        self.counts.len()
    }

    pub fn bin_width(&self) -> u64 {
        self.bin_width
    }

    /// Number of `record()` calls since the last reset
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Largest raw value recorded since the last reset (0 when empty)
    pub fn max_value(&self) -> u64 {
        self.max_value
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }
}

fn validate_geometry(bin_width: u64, num_bins: usize) -> Result<()> {
    if bin_width == 0 {
        return Err(JitterError::InvalidGeometry(
            "bin width must be greater than zero".to_string(),
        ));
    }
    if num_bins == 0 {
        return Err(JitterError::InvalidGeometry(
            "bin count must be greater than zero".to_string(),
        ));
    }
    Ok(())
}
