//! JitterMark
//!
//! Measures scheduling jitter of a real-time audio render loop. Every callback
//! cycle records how late the wakeup, the render completion and the delivery
//! were relative to the scheduled callback time. Each stream lands in a
//! fixed-resolution histogram, and the run ends with a text report that puts
//! the jitter distribution next to underrun counts and CPU load.
//!
//! The system is organized into functional modules:
//! - **error**: Unified error type hierarchy
//! - **measurement**: Bin counters, the jitter sampler, summary statistics, reports
//! - **harness**: Audio sink/synth/CPU collaborators and the run lifecycle
//! - **config**: TOML harness configuration
//! - **log_collector**: Background log writer behind the `log` facade

pub mod error;
pub mod measurement;
pub mod harness;
pub mod config;
pub mod log_collector;

// Re-export the log crate for macro usage
pub use log;

// ============================================================================
// PUBLIC RE-EXPORTS FOR CONVENIENCE
// ============================================================================

pub use error::{ConfigError, JitterError, Result};

pub use measurement::{
    BinCounter, CycleTimestamps, JitterGeometry, JitterHistograms, JitterReport, JitterSample,
    JitterSampler, JitterStream, MarkResult, MeasurementRun, SummaryKind, SummaryStatistic,
};

pub use harness::{
    run_jittermark, AudioSink, CallbackTiming, CpuAnalyzer, JitterMarkHarness, SineSynthesizer,
    Synthesizer, TimedAudioSink,
};

pub use config::HarnessConfig;
pub use log_collector::LogCollector;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
