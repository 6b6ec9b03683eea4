//! Monotonic clock helpers
//!
//! Thin wrappers over `clock_gettime(CLOCK_MONOTONIC)` and absolute
//! `clock_nanosleep(TIMER_ABSTIME)`. All timestamps are nanoseconds on the
//! monotonic clock.

use crate::measurement::NANOS_PER_SECOND;

/// Current monotonic time in nanoseconds
#[inline]
pub fn monotonic_now_ns() -> u64 {
    let ts: libc::timespec = unsafe {
        let mut ts = std::mem::zeroed::<libc::timespec>();
        libc::clock_gettime(libc::CLOCK_MONOTONIC, &mut ts);
        ts
    };
    timespec_to_ns(&ts)
}

/// Sleep until an absolute monotonic time. Returns immediately if the
/// target is already in the past.
#[inline]
pub fn sleep_until_ns(target_ns: u64) {
    let target = ns_to_timespec(target_ns);
    loop {
        let rc = unsafe {
            libc::clock_nanosleep(
                libc::CLOCK_MONOTONIC,
                libc::TIMER_ABSTIME,
                &target,
                std::ptr::null_mut(),
            )
        };
        // Restart after signal interruption; the target is absolute.
        if rc != libc::EINTR {
            break;
        }
    }
}

fn timespec_to_ns(ts: &libc::timespec) -> u64 {
    (ts.tv_sec as u64) * NANOS_PER_SECOND + ts.tv_nsec as u64
}

fn ns_to_timespec(ns: u64) -> libc::timespec {
    libc::timespec {
        tv_sec: (ns / NANOS_PER_SECOND) as libc::time_t,
        tv_nsec: (ns % NANOS_PER_SECOND) as libc::c_long,
    }
}
