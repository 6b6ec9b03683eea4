//! Summary Statistics
//!
//! The headline JitterMark value is a pluggable scalar derived from the three
//! histograms after a run. `ZeroMeasurement` reproduces the classic fixed
//! measurement of 0; the others report milliseconds.

use hdrhistogram::Histogram;
use serde::{Deserialize, Serialize};

use super::sampler::{JitterHistograms, JitterStream};
use super::NANOS_PER_MILLI;

/// Derives the numeric measurement of a run from its histograms
pub trait SummaryStatistic {
    /// Short label used in logs
    fn name(&self) -> String;

    /// Compute the measurement. Must not mutate anything and must be
    /// deterministic for identical histogram contents.
    fn summarize(&self, histograms: &JitterHistograms<'_>) -> f64;
}

/// Always reports 0.0
#[derive(Clone, Copy, Debug, Default)]
pub struct ZeroMeasurement;

impl SummaryStatistic for ZeroMeasurement {
    fn name(&self) -> String {
        "zero".to_string()
    }

    fn summarize(&self, _histograms: &JitterHistograms<'_>) -> f64 {
        0.0
    }
}

/// Largest deviation observed on one stream, in milliseconds
#[derive(Clone, Copy, Debug)]
pub struct WorstCase {
    pub stream: JitterStream,
}

impl SummaryStatistic for WorstCase {
    fn name(&self) -> String {
        format!("worst_case({:?})", self.stream)
    }

    fn summarize(&self, histograms: &JitterHistograms<'_>) -> f64 {
        nanos_to_millis(histograms.stream(self.stream).max_value())
    }
}

/// Percentile of one stream's deviation, in milliseconds.
///
/// Each bin contributes its count at its upper edge, so the result is an
/// upper bound accurate to one bin width. The saturating bin contributes at
/// the largest value actually recorded.
#[derive(Clone, Copy, Debug)]
pub struct Percentile {
    pub stream: JitterStream,
    /// Percentile in (0, 100]
    pub percentile: f64,
}

impl SummaryStatistic for Percentile {
    fn name(&self) -> String {
        format!("p{}({:?})", self.percentile, self.stream)
    }

    fn summarize(&self, histograms: &JitterHistograms<'_>) -> f64 {
        let bins = histograms.stream(self.stream);
        if bins.is_empty() {
            return 0.0;
        }

        // Microsecond resolution, 3 significant digits
        let mut histogram = match Histogram::<u64>::new(3) {
            Ok(h) => h,
            Err(e) => {
                log::warn!("[SUMMARY] Could not allocate percentile histogram: {:?}", e);
                return 0.0;
            }
        };

        let last = bins.num_bins() - 1;
        for (index, &count) in bins.counts().iter().enumerate() {
            if count == 0 {
                continue;
            }
            let edge_ns = if index == last {
                bins.max_value().max(bins.lower_edge(index))
            } else {
                bins.lower_edge(index + 1)
            };
            let edge_us = edge_ns.div_ceil(1000);
            if let Err(e) = histogram.record_n(edge_us, count) {
                log::warn!("[SUMMARY] Dropped bin {} from percentile: {:?}", index, e);
            }
        }

        histogram.value_at_percentile(self.percentile) as f64 / 1000.0
    }
}

/// Serializable choice of summary statistic for configuration files
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SummaryKind {
    #[default]
    Zero,
    WorstCase {
        stream: JitterStream,
    },
    Percentile {
        stream: JitterStream,
        percentile: f64,
    },
}

impl SummaryKind {
    /// Build the statistic this configuration names
    pub fn statistic(&self) -> Box<dyn SummaryStatistic> {
        match *self {
            SummaryKind::Zero => Box::new(ZeroMeasurement),
            SummaryKind::WorstCase { stream } => Box::new(WorstCase { stream }),
            SummaryKind::Percentile { stream, percentile } => {
                Box::new(Percentile { stream, percentile })
            }
        }
    }
}

fn nanos_to_millis(nanos: u64) -> f64 {
    nanos as f64 / NANOS_PER_MILLI as f64
}
