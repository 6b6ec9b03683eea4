//! Jitter Sampler
//!
//! Owns one `BinCounter` per timing stream (wakeup, render, delivery) and turns
//! per-cycle timestamps into lateness magnitudes.
//!
//! The record entry points run on the audio callback thread. They are
//! allocation-free and report a missing `begin_run()` through their boolean
//! return (plus a debug assertion) instead of an error value.

use serde::{Deserialize, Serialize};

use super::bin_counter::BinCounter;
use super::NANOS_PER_MILLI;
use crate::error::{JitterError, Result};

/// Upper bound on bins per stream (three streams x two u64 arrays each)
pub const MAX_BINS: usize = 1 << 22;

/// Histogram resolution and range, shared by all three streams of a run
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JitterGeometry {
    /// Number of bins per millisecond of deviation
    pub bins_per_msec: u32,
    /// Deviation covered before samples saturate into the last bin
    pub max_msec: u32,
}

impl Default for JitterGeometry {
    fn default() -> Self {
        JitterGeometry {
            bins_per_msec: 10,
            max_msec: 100,
        }
    }
}

impl JitterGeometry {
    pub fn new(bins_per_msec: u32, max_msec: u32) -> Self {
        JitterGeometry {
            bins_per_msec,
            max_msec,
        }
    }

    /// Bin width in nanoseconds
    pub fn bin_width_ns(&self) -> u64 {
        if self.bins_per_msec == 0 {
            0
        } else {
            NANOS_PER_MILLI / self.bins_per_msec as u64
        }
    }

    pub fn num_bins(&self) -> usize {
        self.max_msec as usize * self.bins_per_msec as usize
    }

    /// Check that the geometry yields a non-empty histogram with a non-zero bin width
    pub fn validate(&self) -> Result<()> {
        if self.bins_per_msec == 0 {
            return Err(JitterError::InvalidGeometry(
                "bins_per_msec must be greater than zero".to_string(),
            ));
        }
        if self.bins_per_msec as u64 > NANOS_PER_MILLI {
            return Err(JitterError::InvalidGeometry(format!(
                "bins_per_msec {} is finer than one nanosecond",
                self.bins_per_msec
            )));
        }
        if self.max_msec == 0 {
            return Err(JitterError::InvalidGeometry(
                "max_msec must be greater than zero".to_string(),
            ));
        }
        if self.num_bins() > MAX_BINS {
            return Err(JitterError::InvalidGeometry(format!(
                "{} bins exceeds the limit of {}",
                self.num_bins(),
                MAX_BINS
            )));
        }
        Ok(())
    }
}

/// Timing stream a sample belongs to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JitterStream {
    Wakeup,
    Render,
    Delivery,
}

/// Monotonic timestamps (nanoseconds) captured during one callback cycle
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CycleTimestamps {
    /// Ideal callback time for this cycle
    pub scheduled: u64,
    /// Time the callback thread actually woke up
    pub wakeup: u64,
    /// Time the synthesizer finished rendering the buffer
    pub rendered: u64,
    /// Time the buffer was handed to the sink
    pub delivered: u64,
}

/// The three deviation magnitudes of one cycle
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct JitterSample {
    pub wakeup: u64,
    pub render: u64,
    pub delivery: u64,
}

impl JitterSample {
    /// Lateness of each event relative to the cycle's scheduled time.
    /// Events that happen early count as zero deviation.
    pub fn from_timestamps(ts: &CycleTimestamps) -> Self {
        JitterSample {
            wakeup: ts.wakeup.saturating_sub(ts.scheduled),
            render: ts.rendered.saturating_sub(ts.scheduled),
            delivery: ts.delivered.saturating_sub(ts.scheduled),
        }
    }
}

/// Borrowed view of the three histograms of a configured sampler
#[derive(Clone, Copy, Debug)]
pub struct JitterHistograms<'a> {
    pub wakeup: &'a BinCounter,
    pub render: &'a BinCounter,
    pub delivery: &'a BinCounter,
}

impl<'a> JitterHistograms<'a> {
    pub fn stream(&self, stream: JitterStream) -> &'a BinCounter {
        match stream {
            JitterStream::Wakeup => self.wakeup,
            JitterStream::Render => self.render,
            JitterStream::Delivery => self.delivery,
        }
    }

    pub fn num_bins(&self) -> usize {
        self.delivery.num_bins()
    }

    pub fn bin_width(&self) -> u64 {
        self.delivery.bin_width()
    }
}

struct Streams {
    wakeup: BinCounter,
    render: BinCounter,
    delivery: BinCounter,
}

/// Captures wakeup/render/delivery deviations into three parallel histograms
#[derive(Default)]
pub struct JitterSampler {
    streams: Option<Streams>,
    geometry: Option<JitterGeometry>,
}

impl JitterSampler {
    /// Create an unconfigured sampler. `begin_run()` must be called before recording.
    pub fn new() -> Self {
        JitterSampler::default()
    }

    /// Configure all three histograms with the same geometry and clear them.
    /// Allocation happens here, never in the record path.
    pub fn begin_run(&mut self, geometry: JitterGeometry) -> Result<()> {
        geometry.validate()?;
        let bin_width = geometry.bin_width_ns();
        let num_bins = geometry.num_bins();
        match self.streams.as_mut() {
            Some(streams) => {
                streams.wakeup.configure(bin_width, num_bins)?;
                streams.render.configure(bin_width, num_bins)?;
                streams.delivery.configure(bin_width, num_bins)?;
            }
            None => {
                self.streams = Some(Streams {
                    wakeup: BinCounter::new(bin_width, num_bins)?,
                    render: BinCounter::new(bin_width, num_bins)?,
                    delivery: BinCounter::new(bin_width, num_bins)?,
                });
            }
        }
        self.geometry = Some(geometry);
        Ok(())
    }

    pub fn is_configured(&self) -> bool {
        self.streams.is_some()
    }

    pub fn geometry(&self) -> Option<JitterGeometry> {
        self.geometry
    }

    #[inline]
    pub fn record_wakeup(&mut self, magnitude: u64) -> bool {
        self.record(JitterStream::Wakeup, magnitude)
    }

    #[inline]
    pub fn record_render(&mut self, magnitude: u64) -> bool {
        self.record(JitterStream::Render, magnitude)
    }

    #[inline]
    pub fn record_delivery(&mut self, magnitude: u64) -> bool {
        self.record(JitterStream::Delivery, magnitude)
    }

    /// Record one magnitude into a stream.
    /// Returns false if the sampler has not been configured.
    #[inline]
    pub fn record(&mut self, stream: JitterStream, magnitude: u64) -> bool {
        debug_assert!(self.streams.is_some(), "JitterSampler used before begin_run()");
        let Some(streams) = self.streams.as_mut() else {
            return false;
        };
        match stream {
            JitterStream::Wakeup => streams.wakeup.record(magnitude),
            JitterStream::Render => streams.render.record(magnitude),
            JitterStream::Delivery => streams.delivery.record(magnitude),
        }
        true
    }

    /// Record all three deviations of a cycle, in wakeup, render, delivery order
    #[inline]
    pub fn record_cycle(&mut self, timestamps: &CycleTimestamps) -> bool {
        let sample = JitterSample::from_timestamps(timestamps);
        self.record_wakeup(sample.wakeup)
            && self.record_render(sample.render)
            && self.record_delivery(sample.delivery)
    }

    /// Read-only view of the histograms, `None` before `begin_run()`
    pub fn histograms(&self) -> Option<JitterHistograms<'_>> {
        self.streams.as_ref().map(|streams| JitterHistograms {
            wakeup: &streams.wakeup,
            render: &streams.render,
            delivery: &streams.delivery,
        })
    }
}
