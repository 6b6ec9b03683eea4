//! JitterMark Harness
//!
//! Drives a measurement run end to end: configure the histograms, start the
//! voices, run the callback loop for the configured number of cycles, then
//! build the report from the histograms, the sink's underrun count and the
//! CPU analyzer summary.
//!
//! ## Architecture
//! - **Sink**: callback pacing, delivery deadlines, underrun counting
//! - **Synth**: the rendered workload
//! - **Cpu**: per-callback core tracking and system load
//! - **Tuner**: optional mlockall / affinity / SCHED_FIFO
//! - **Events**: lock-free diagnostics out of the callback loop
//! - **Clock**: monotonic timestamps and absolute sleeps

pub mod clock;
pub mod cpu;
pub mod events;
pub mod sink;
pub mod synth;
pub mod tuner;

use std::thread;

pub use cpu::CpuAnalyzer;
pub use events::{EventTotals, HarnessEvent};
pub use sink::{AudioSink, CallbackTiming, TimedAudioSink};
pub use synth::{SineSynthesizer, Synthesizer};
pub use tuner::{Tuner, TuningReport};

use crate::config::HarnessConfig;
use crate::error::{JitterError, Result};
use crate::measurement::{CycleTimestamps, JitterReport, MarkResult, MeasurementRun};

pub const TEST_NAME: &str = "JitterMark";

/// Capacity of the callback event ring
const EVENT_CAPACITY: usize = 1024;

/// Cycles between progress events
const PROGRESS_INTERVAL: u64 = 1000;

/// Measures scheduling jitter of a render loop driven by an `AudioSink`
pub struct JitterMarkHarness<S: AudioSink, Y: Synthesizer> {
    sink: S,
    synth: Y,
    cpu: CpuAnalyzer,
    config: HarnessConfig,
    run: Option<MeasurementRun>,
    buffer: Vec<f32>,
    events: Option<rtrb::Producer<HarnessEvent>>,
    dropped_events: u64,
    cycle: u64,
}

impl<S: AudioSink, Y: Synthesizer> JitterMarkHarness<S, Y> {
    pub fn new(sink: S, synth: Y, config: HarnessConfig) -> Result<Self> {
        config.validate()?;
        let buffer_len = sink.frames_per_burst() as usize * sink.channels() as usize;
        Ok(JitterMarkHarness {
            sink,
            synth,
            cpu: CpuAnalyzer::new(),
            config,
            run: None,
            buffer: vec![0.0; buffer_len],
            events: None,
            dropped_events: 0,
            cycle: 0,
        })
    }

    /// Size the histograms for a new run
    pub fn on_begin_measurement(&mut self) -> Result<()> {
        log::info!(
            "---- Measure scheduling jitter ---- #voices = {}",
            self.config.num_voices
        );
        self.run = Some(MeasurementRun::begin(self.config.geometry())?);
        self.cycle = 0;
        self.cpu.begin();
        Ok(())
    }

    /// Hook run before the voices are started. Nothing to prepare for jitter.
    pub fn on_before_note_on(&mut self) -> i32 {
        0
    }

    /// One audio callback: wake, render, deliver, then record the three deviations
    pub fn run_cycle(&mut self) -> Result<()> {
        if self.run.is_none() {
            return Err(JitterError::NotConfigured);
        }
        let timing = self.sink.wait_for_callback()?;
        if timing.missed_periods > 0 {
            self.push_event(HarnessEvent::MissedPeriods {
                cycle: self.cycle,
                periods: timing.missed_periods,
            });
        }
        self.cpu.record_cpu();

        let channels = self.sink.channels() as usize;
        self.synth.render(&mut self.buffer, channels);
        let rendered = self.sink.now_ns();

        let underruns_before = self.sink.underrun_count();
        let delivered = self.sink.deliver(&self.buffer)?;
        if self.sink.underrun_count() > underruns_before {
            let period = self.sink.period_ns();
            let grid_point = timing.scheduled_ns + timing.missed_periods * period;
            let deadline = grid_point + self.config.buffer_bursts as u64 * period;
            self.push_event(HarnessEvent::Underrun {
                cycle: self.cycle,
                late_ns: delivered.saturating_sub(deadline),
            });
        }

        let run = self.run.as_mut().ok_or(JitterError::NotConfigured)?;
        run.record_cycle(&CycleTimestamps {
            scheduled: timing.scheduled_ns,
            wakeup: timing.wakeup_ns,
            rendered,
            delivered,
        });

        self.cycle += 1;
        if self.cycle % PROGRESS_INTERVAL == 0 {
            self.push_event(HarnessEvent::Progress {
                cycles: self.cycle,
                underruns: self.sink.underrun_count(),
            });
        }
        Ok(())
    }

    /// Close the CPU window and build the report
    pub fn on_end_measurement(&mut self) -> MarkResult {
        self.cpu.end();
        let cpu_summary = self.cpu.dump();
        let underruns = self.sink.underrun_count();
        let statistic = self.config.summary.statistic();

        let result = match self.run.as_ref() {
            Some(run) => run.report(TEST_NAME, underruns, &cpu_summary, statistic.as_ref()),
            None => {
                log::error!("[HARNESS] Report requested without a measurement run");
                JitterReport::generate(TEST_NAME, None, underruns, &cpu_summary, statistic.as_ref())
            }
        };
        log::info!(
            "[HARNESS] {} finished: {} cycles, {} underruns, measurement {} ({})",
            TEST_NAME,
            self.cycle,
            underruns,
            result.measurement,
            statistic.name()
        );
        result
    }

    /// Run the whole lifecycle for the configured duration
    pub fn run(&mut self) -> Result<MarkResult> {
        if self.config.realtime {
            let tuning = Tuner::default().apply_realtime_settings(self.config.cpu_core);
            log::info!("[HARNESS] Real-time tuning: {:?}", tuning);
        } else if let Some(core) = self.config.cpu_core {
            log::warn!(
                "[HARNESS] cpu_core = {} ignored: pinning only applies with realtime = true",
                core
            );
        }

        let (producer, consumer) = events::event_channel(EVENT_CAPACITY);
        self.events = Some(producer);
        self.dropped_events = 0;
        let consumer_handle = events::spawn_event_consumer(consumer);

        let outcome = self.run_cycles();

        // Dropping the producer lets the consumer drain and exit
        self.events = None;
        match consumer_handle.join() {
            Ok(totals) => log::debug!("[HARNESS] Event totals: {:?}", totals),
            Err(_) => log::warn!("[HARNESS] Event consumer thread panicked"),
        }
        if self.dropped_events > 0 {
            log::warn!("[HARNESS] {} diagnostic events dropped", self.dropped_events);
        }

        outcome?;
        Ok(self.on_end_measurement())
    }

    fn run_cycles(&mut self) -> Result<()> {
        self.on_begin_measurement()?;
        self.on_before_note_on();
        self.synth.note_on(self.config.num_voices)?;

        let cycles = self.config.cycle_count();
        log::info!(
            "[HARNESS] Running {} cycles of {} frames at {} Hz",
            cycles,
            self.sink.frames_per_burst(),
            self.sink.sample_rate()
        );

        self.sink.start()?;
        let mut outcome = Ok(());
        for _ in 0..cycles {
            if let Err(e) = self.run_cycle() {
                outcome = Err(e);
                break;
            }
        }
        self.sink.stop()?;
        outcome
    }

    fn push_event(&mut self, event: HarnessEvent) {
        if let Some(producer) = self.events.as_mut() {
            if producer.push(event).is_err() {
                self.dropped_events += 1;
            }
        }
    }

    pub fn run_state(&self) -> Option<&MeasurementRun> {
        self.run.as_ref()
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn synth(&self) -> &Y {
        &self.synth
    }

    pub fn cycles(&self) -> u64 {
        self.cycle
    }
}

/// Build the default harness (timed sink + sine synth) and run it on a
/// dedicated callback thread
pub fn run_jittermark(config: HarnessConfig) -> Result<MarkResult> {
    config.validate()?;
    let handle = thread::Builder::new()
        .name("jittermark-callback".to_string())
        .spawn(move || {
            let sink = TimedAudioSink::new(
                config.sample_rate,
                config.frames_per_burst,
                config.channels,
                config.buffer_bursts,
            );
            let synth = SineSynthesizer::new(config.sample_rate);
            let mut harness = JitterMarkHarness::new(sink, synth, config)?;
            harness.run()
        })?;
    handle
        .join()
        .map_err(|_| JitterError::Audio("callback thread panicked".to_string()))?
}
