//! Callback-path diagnostics
//!
//! The audio callback never formats or logs. It pushes small `HarnessEvent`
//! values into an rtrb ring buffer; a consumer thread drains them and does
//! the logging outside the critical path.

use std::thread;
use std::time::Duration;

/// Events produced by the callback loop
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HarnessEvent {
    /// A delivery missed its deadline: cycle index, delivery lateness in ns
    Underrun { cycle: u64, late_ns: u64 },
    /// A wakeup was so late that whole periods were skipped
    MissedPeriods { cycle: u64, periods: u64 },
    /// Periodic progress: cycles completed, underruns so far
    Progress { cycles: u64, underruns: u64 },
}

/// Totals seen by the consumer thread
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EventTotals {
    pub underruns: u64,
    pub missed_periods: u64,
    pub progress_updates: u64,
}

pub fn event_channel(capacity: usize) -> (rtrb::Producer<HarnessEvent>, rtrb::Consumer<HarnessEvent>) {
    rtrb::RingBuffer::new(capacity)
}

/// Spawn the thread that logs harness events. It exits once the producer is
/// dropped and the ring is empty, returning what it saw.
pub fn spawn_event_consumer(
    mut consumer: rtrb::Consumer<HarnessEvent>,
) -> thread::JoinHandle<EventTotals> {
    thread::spawn(move || {
        let mut totals = EventTotals::default();
        loop {
            match consumer.pop() {
                Ok(event) => log_event(&event, &mut totals),
                Err(_) if consumer.is_abandoned() => {
                    // Pushes may have landed between the failed pop and the drop
                    while let Ok(event) = consumer.pop() {
                        log_event(&event, &mut totals);
                    }
                    break;
                }
                Err(_) => thread::sleep(Duration::from_millis(5)),
            }
        }
        totals
    })
}

fn log_event(event: &HarnessEvent, totals: &mut EventTotals) {
    match *event {
        HarnessEvent::Underrun { cycle, late_ns } => {
            totals.underruns += 1;
            log::warn!(
                "[HARNESS] Underrun at cycle {}: delivery {:.3} ms late",
                cycle,
                late_ns as f64 / 1_000_000.0
            );
        }
        HarnessEvent::MissedPeriods { cycle, periods } => {
            totals.missed_periods += periods;
            log::warn!(
                "[HARNESS] Cycle {} woke {} period(s) late",
                cycle,
                periods
            );
        }
        HarnessEvent::Progress { cycles, underruns } => {
            totals.progress_updates += 1;
            log::debug!("[HARNESS] Progress: {} cycles, {} underruns", cycles, underruns);
        }
    }
}
