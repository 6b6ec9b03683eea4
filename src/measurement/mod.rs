//! Jitter Measurement Core
//!
//! ## Architecture
//! - **BinCounter**: fixed-width histogram with a saturating last bin
//! - **Sampler**: three BinCounters fed with wakeup/render/delivery lateness
//! - **Summary**: pluggable headline statistic over the histograms
//! - **Report**: text table plus numeric result
//!
//! ## Phases
//! A run is strictly sequential: `MeasurementRun::begin()` sizes the
//! histograms, the audio callback records through `sampler_mut()`, and the
//! report borrows the finished histograms. Recording needs `&mut` access and
//! reporting needs `&`, so the borrow checker rules out reading while a
//! callback is still recording. Live reporting would need a snapshot copy or
//! double-buffered histograms; neither exists today.

pub mod bin_counter;
pub mod report;
pub mod sampler;
pub mod summary;

use chrono::{DateTime, Local};

pub use bin_counter::BinCounter;
pub use report::{JitterReport, MarkResult};
pub use sampler::{
    CycleTimestamps, JitterGeometry, JitterHistograms, JitterSample, JitterSampler, JitterStream,
};
pub use summary::{Percentile, SummaryKind, SummaryStatistic, WorstCase, ZeroMeasurement};

use crate::error::Result;

pub const NANOS_PER_MICRO: u64 = 1_000;
pub const NANOS_PER_MILLI: u64 = 1_000_000;
pub const NANOS_PER_SECOND: u64 = 1_000_000_000;

/// Everything owned by one measurement run
pub struct MeasurementRun {
    sampler: JitterSampler,
    geometry: JitterGeometry,
    started_at: DateTime<Local>,
    cycles: u64,
}

impl MeasurementRun {
    /// Size the histograms for a new run
    pub fn begin(geometry: JitterGeometry) -> Result<Self> {
        let mut sampler = JitterSampler::new();
        sampler.begin_run(geometry)?;
        log::info!(
            "[RUN] Jitter histograms ready: {} bins x {} ns per stream",
            geometry.num_bins(),
            geometry.bin_width_ns()
        );
        Ok(MeasurementRun {
            sampler,
            geometry,
            started_at: Local::now(),
            cycles: 0,
        })
    }

    /// Record one callback cycle. Allocation-free.
    #[inline]
    pub fn record_cycle(&mut self, timestamps: &CycleTimestamps) {
        if self.sampler.record_cycle(timestamps) {
            self.cycles += 1;
        }
    }

    /// Direct access for callers that record the three streams separately
    pub fn sampler_mut(&mut self) -> &mut JitterSampler {
        &mut self.sampler
    }

    pub fn sampler(&self) -> &JitterSampler {
        &self.sampler
    }

    pub fn histograms(&self) -> Option<JitterHistograms<'_>> {
        self.sampler.histograms()
    }

    pub fn geometry(&self) -> JitterGeometry {
        self.geometry
    }

    pub fn started_at(&self) -> DateTime<Local> {
        self.started_at
    }

    /// Number of cycles recorded through `record_cycle()`
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Build the report for this run
    pub fn report(
        &self,
        test_name: &str,
        underrun_count: u64,
        cpu_summary: &str,
        statistic: &dyn SummaryStatistic,
    ) -> MarkResult {
        let histograms = self.histograms();
        JitterReport::generate(
            test_name,
            histograms.as_ref(),
            underrun_count,
            cpu_summary,
            statistic,
        )
    }
}
