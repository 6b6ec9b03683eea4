//! Real-Time Tuner for the callback thread
//!
//! Prepares the measuring thread for low-latency operation:
//! - Locks all memory pages to prevent page faults
//! - Prefaults the stack
//! - Pins the thread to a core
//! - Enables SCHED_FIFO real-time priority
//!
//! Each step is attempted independently. Unprivileged runs still work; the
//! report then reflects an untuned scheduler.

use nix::sys::mman::{mlockall, MlockAllFlags};

use crate::error::{JitterError, Result};

/// SCHED_FIFO priority used for the callback thread
pub const DEFAULT_FIFO_PRIORITY: i32 = 80;

/// Outcome of each tuning step
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TuningReport {
    pub memory_locked: bool,
    pub affinity_set: bool,
    pub fifo_enabled: bool,
}

#[derive(Debug)]
pub struct Tuner {
    priority: i32,
}

impl Tuner {
    pub fn new(priority: i32) -> Self {
        Tuner { priority }
    }

    /// Apply all real-time settings to the calling thread.
    /// Failures are logged and reflected in the returned report.
    pub fn apply_realtime_settings(&self, core: Option<usize>) -> TuningReport {
        let mut report = TuningReport::default();

        match mlockall(MlockAllFlags::MCL_CURRENT | MlockAllFlags::MCL_FUTURE) {
            Ok(()) => {
                report.memory_locked = true;
                log::info!("[TUNER] Memory locked");
            }
            Err(e) => log::warn!("[TUNER] mlockall failed: {}", e),
        }

        prefault_stack();

        if let Some(core) = core {
            match set_cpu_affinity(core) {
                Ok(()) => {
                    report.affinity_set = true;
                    log::info!("[TUNER] CPU affinity set to core {}", core);
                }
                Err(e) => log::warn!("[TUNER] {}", e),
            }
        }

        match set_sched_fifo(self.priority) {
            Ok(()) => {
                report.fifo_enabled = true;
                log::info!("[TUNER] SCHED_FIFO priority {} applied", self.priority);
            }
            Err(e) => log::warn!(
                "[TUNER] {}. Continuing in SCHED_OTHER mode.",
                e
            ),
        }

        report
    }
}

impl Default for Tuner {
    fn default() -> Self {
        Self::new(DEFAULT_FIFO_PRIORITY)
    }
}

/// Touch each page of an 8KB stack buffer so it is resident before measuring
fn prefault_stack() {
    let mut buffer: [u8; 8192] = [0; 8192];
    for i in (0..buffer.len()).step_by(4096) {
        unsafe {
            std::ptr::write_volatile(&mut buffer[i], 1);
        }
    }
    std::hint::black_box(&buffer);
}

/// Highest core index a `cpu_set_t` can name, plus one
pub const MAX_CPU_CORES: usize = libc::CPU_SETSIZE as usize;

fn set_cpu_affinity(core: usize) -> Result<()> {
    if core >= MAX_CPU_CORES {
        return Err(JitterError::Realtime(format!(
            "core {} is outside the affinity mask (max {})",
            core,
            MAX_CPU_CORES - 1
        )));
    }
    unsafe {
        let mut set: libc::cpu_set_t = std::mem::zeroed();
        libc::CPU_ZERO(&mut set);
        libc::CPU_SET(core, &mut set);

        let ret = libc::sched_setaffinity(0, std::mem::size_of::<libc::cpu_set_t>(), &set);
        if ret < 0 {
            return Err(JitterError::Realtime(format!(
                "sched_setaffinity failed: {}",
                std::io::Error::last_os_error()
            )));
        }
    }
    Ok(())
}

fn set_sched_fifo(priority: i32) -> Result<()> {
    unsafe {
        let mut param: libc::sched_param = std::mem::zeroed();
        param.sched_priority = priority;

        let ret = libc::sched_setscheduler(0, libc::SCHED_FIFO, &param);
        if ret < 0 {
            return Err(JitterError::Realtime(format!(
                "sched_setscheduler failed: {}",
                std::io::Error::last_os_error()
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_priority() {
        let tuner = Tuner::default();
        assert_eq!(tuner.priority, DEFAULT_FIFO_PRIORITY);
    }

    #[test]
    fn test_affinity_rejects_missing_core() {
        // cpu_set_t holds 1024 cores; the last one does not exist on test machines
        assert!(set_cpu_affinity(1023).is_err());
    }

    #[test]
    fn test_affinity_rejects_core_beyond_mask() {
        match set_cpu_affinity(5000) {
            Err(JitterError::Realtime(msg)) => assert!(msg.contains("5000")),
            other => panic!("expected Realtime error, got {:?}", other),
        }
    }

    #[test]
    fn test_out_of_range_core_is_not_fatal() {
        let report = Tuner::new(1).apply_realtime_settings(Some(5000));
        assert!(!report.affinity_set);
    }
}
