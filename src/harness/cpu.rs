//! CPU Analyzer
//!
//! Tracks which core each audio callback ran on and how often the callback
//! thread migrated, plus whole-system CPU load over the run (via `sysinfo`).
//! `record_cpu()` is called from the callback path and only touches a
//! preallocated table.

use std::fmt::Write;

use sysinfo::System;

pub struct CpuAnalyzer {
    system: System,
    /// Callbacks per CPU index; the last slot also absorbs indices past the table
    callbacks_per_cpu: Box<[u64]>,
    last_cpu: Option<usize>,
    migrations: u64,
    callbacks: u64,
    unknown: u64,
    system_load_percent: Option<f32>,
}

impl CpuAnalyzer {
    pub fn new() -> Self {
        let mut system = System::new();
        system.refresh_cpu_all();
        let num_cpus = system.cpus().len().max(1);
        CpuAnalyzer {
            system,
            callbacks_per_cpu: vec![0; num_cpus].into_boxed_slice(),
            last_cpu: None,
            migrations: 0,
            callbacks: 0,
            unknown: 0,
            system_load_percent: None,
        }
    }

    /// Reset counters and start the system load window
    pub fn begin(&mut self) {
        self.callbacks_per_cpu.fill(0);
        self.last_cpu = None;
        self.migrations = 0;
        self.callbacks = 0;
        self.unknown = 0;
        self.system_load_percent = None;
        self.system.refresh_cpu_usage();
    }

    /// Note the CPU the calling thread is running on
    #[inline]
    pub fn record_cpu(&mut self) {
        let cpu = unsafe { libc::sched_getcpu() };
        if cpu < 0 {
            self.callbacks += 1;
            self.unknown += 1;
            return;
        }
        self.record_cpu_index(cpu as usize);
    }

    /// Count one callback on `cpu`
    #[inline]
    pub fn record_cpu_index(&mut self, cpu: usize) {
        let slot = cpu.min(self.callbacks_per_cpu.len() - 1);
        self.callbacks_per_cpu[slot] += 1;
        self.callbacks += 1;
        if let Some(last) = self.last_cpu {
            if last != cpu {
                self.migrations += 1;
            }
        }
        self.last_cpu = Some(cpu);
    }

    /// Close the system load window
    pub fn end(&mut self) {
        self.system.refresh_cpu_usage();
        self.system_load_percent = Some(self.system.global_cpu_usage());
    }

    pub fn migrations(&self) -> u64 {
        self.migrations
    }

    pub fn callbacks(&self) -> u64 {
        self.callbacks
    }

    /// Text summary appended verbatim to the JitterMark report
    pub fn dump(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "CPU callbacks {}, migrations {}",
            self.callbacks, self.migrations
        );
        if self.callbacks > 0 {
            for (cpu, &count) in self.callbacks_per_cpu.iter().enumerate() {
                if count == 0 {
                    continue;
                }
                let share = count as f64 * 100.0 / self.callbacks as f64;
                let _ = writeln!(out, "  CPU#{:<3} {:>9} ({:5.1}%)", cpu, count, share);
            }
            if self.unknown > 0 {
                let _ = writeln!(out, "  CPU#?   {:>9}", self.unknown);
            }
        }
        if let Some(load) = self.system_load_percent {
            let _ = writeln!(out, "System CPU load {:.1}%", load);
        }
        out
    }
}

impl Default for CpuAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_counted_on_core_change() {
        let mut cpu = CpuAnalyzer::new();
        cpu.begin();
        cpu.record_cpu_index(0);
        cpu.record_cpu_index(0);
        cpu.record_cpu_index(0);
        assert_eq!(cpu.migrations(), 0);
        assert_eq!(cpu.callbacks(), 3);
        assert!(cpu.dump().contains("CPU callbacks 3, migrations 0"));
    }

    #[test]
    fn test_out_of_table_cpu_lands_in_last_slot() {
        let mut cpu = CpuAnalyzer::new();
        cpu.begin();
        cpu.record_cpu_index(100_000);
        cpu.record_cpu_index(0);
        assert_eq!(cpu.callbacks(), 2);
        assert_eq!(cpu.migrations(), 1);
    }

    #[test]
    fn test_record_cpu_uses_current_core() {
        let mut cpu = CpuAnalyzer::new();
        cpu.begin();
        cpu.record_cpu();
        cpu.end();
        assert_eq!(cpu.callbacks(), 1);
        assert!(cpu.dump().contains("System CPU load"));
    }
}
