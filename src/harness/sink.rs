//! Audio Sink
//!
//! `AudioSink` is the seam between the harness and whatever drives audio
//! callbacks. It supplies the scheduled and actual callback times, the
//! delivery timestamp of each buffer, and a monotonically increasing underrun
//! count.
//!
//! `TimedAudioSink` paces callbacks on the monotonic clock with absolute
//! sleeps and stands in for a hardware driver.

use super::clock::{monotonic_now_ns, sleep_until_ns};
use crate::error::{JitterError, Result};
use crate::measurement::NANOS_PER_SECOND;

/// Timing of one callback wakeup
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CallbackTiming {
    /// Ideal callback time (monotonic ns)
    pub scheduled_ns: u64,
    /// Time the callback actually started (monotonic ns)
    pub wakeup_ns: u64,
    /// Whole periods skipped because the wakeup was that late
    pub missed_periods: u64,
}

/// Source of audio callbacks
pub trait AudioSink {
    fn sample_rate(&self) -> u32;

    fn frames_per_burst(&self) -> u32;

    fn channels(&self) -> u32;

    /// Begin producing callbacks
    fn start(&mut self) -> Result<()>;

    fn stop(&mut self) -> Result<()>;

    /// Block until the next callback is due
    fn wait_for_callback(&mut self) -> Result<CallbackTiming>;

    /// Hand a rendered buffer to the sink. Returns the delivery timestamp.
    fn deliver(&mut self, buffer: &[f32]) -> Result<u64>;

    /// Underruns observed since `start()`
    fn underrun_count(&self) -> u64;

    /// Clock used for the render-completion timestamp
    fn now_ns(&self) -> u64 {
        monotonic_now_ns()
    }

    /// Nominal callback period in nanoseconds
    fn period_ns(&self) -> u64 {
        self.frames_per_burst() as u64 * NANOS_PER_SECOND / self.sample_rate().max(1) as u64
    }
}

/// Clock-paced sink with a fixed number of bursts of buffering
pub struct TimedAudioSink {
    sample_rate: u32,
    frames_per_burst: u32,
    channels: u32,
    buffer_bursts: u32,
    period_ns: u64,
    next_wake_ns: u64,
    /// Grid point the current burst was produced for
    grid_point_ns: u64,
    underruns: u64,
    frames_delivered: u64,
    running: bool,
}

impl TimedAudioSink {
    pub fn new(sample_rate: u32, frames_per_burst: u32, channels: u32, buffer_bursts: u32) -> Self {
        let period_ns = frames_per_burst as u64 * NANOS_PER_SECOND / sample_rate.max(1) as u64;
        TimedAudioSink {
            sample_rate,
            frames_per_burst,
            channels,
            buffer_bursts: buffer_bursts.max(1),
            period_ns,
            next_wake_ns: 0,
            grid_point_ns: 0,
            underruns: 0,
            frames_delivered: 0,
            running: false,
        }
    }

    pub fn frames_delivered(&self) -> u64 {
        self.frames_delivered
    }

    /// Latest acceptable delivery time for the current cycle. Measured from
    /// the snapped grid point, so a stall already charged as missed periods
    /// is not charged again at delivery.
    fn delivery_deadline_ns(&self) -> u64 {
        self.grid_point_ns + self.buffer_bursts as u64 * self.period_ns
    }

    /// Account for a wakeup at `now` against the pending grid point
    fn on_wakeup(&mut self, now: u64) -> CallbackTiming {
        let scheduled = self.next_wake_ns;

        // Late wakeups snap to the last grid point passed; each skipped
        // period is a buffer that was never produced.
        let late_ns = now.saturating_sub(scheduled);
        let missed = late_ns / self.period_ns;
        self.underruns += missed;
        self.grid_point_ns = scheduled + missed * self.period_ns;
        self.next_wake_ns = self.grid_point_ns + self.period_ns;

        CallbackTiming {
            scheduled_ns: scheduled,
            wakeup_ns: now,
            missed_periods: missed,
        }
    }

    fn deliver_at(&mut self, buffer: &[f32], now: u64) -> Result<u64> {
        let expected = self.frames_per_burst as usize * self.channels as usize;
        if buffer.len() != expected {
            return Err(JitterError::Audio(format!(
                "buffer holds {} samples, expected {}",
                buffer.len(),
                expected
            )));
        }
        if now > self.delivery_deadline_ns() {
            self.underruns += 1;
        }
        self.frames_delivered += self.frames_per_burst as u64;
        Ok(now)
    }
}

impl AudioSink for TimedAudioSink {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn frames_per_burst(&self) -> u32 {
        self.frames_per_burst
    }

    fn channels(&self) -> u32 {
        self.channels
    }

    fn start(&mut self) -> Result<()> {
        if self.period_ns == 0 {
            return Err(JitterError::Audio(format!(
                "callback period is zero ({} frames at {} Hz)",
                self.frames_per_burst, self.sample_rate
            )));
        }
        self.next_wake_ns = monotonic_now_ns() + self.period_ns;
        self.underruns = 0;
        self.frames_delivered = 0;
        self.running = true;
        log::debug!(
            "[SINK] Started: period={} ns, buffer={} bursts",
            self.period_ns,
            self.buffer_bursts
        );
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.running = false;
        Ok(())
    }

    fn wait_for_callback(&mut self) -> Result<CallbackTiming> {
        if !self.running {
            return Err(JitterError::Audio("sink is not running".to_string()));
        }

        sleep_until_ns(self.next_wake_ns);
        Ok(self.on_wakeup(monotonic_now_ns()))
    }

    fn deliver(&mut self, buffer: &[f32]) -> Result<u64> {
        self.deliver_at(buffer, monotonic_now_ns())
    }

    fn underrun_count(&self) -> u64 {
        self.underruns
    }
}
