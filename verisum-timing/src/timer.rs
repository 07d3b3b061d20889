use std::time::{Duration, Instant};

/// Monotonic clock collaborator. Timestamps are nanoseconds since the
/// timer's epoch; reaction times are differences between two `now` reads.
pub trait Timer {
    /// Nanoseconds since the timer was created. Monotonic.
    fn now(&self) -> u64;

    /// Duration elapsed since an earlier `now` reading
    fn elapsed(&self, earlier_ns: u64) -> Duration {
        Duration::from_nanos(self.now().saturating_sub(earlier_ns))
    }

    /// Block for `duration` as precisely as the platform allows
    fn sleep(&self, duration: Duration);
}

/// Timer backed by `std::time::Instant` with an OS-assisted precise sleep.
/// On Linux the sleep uses `clock_nanosleep` against the monotonic clock;
/// elsewhere it coarse-sleeps most of the interval and spins the tail.
#[derive(Debug, Clone)]
pub struct HighPrecisionTimer {
    start: Instant,
}

impl HighPrecisionTimer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn high_precision_sleep(&self, duration: Duration) {
        if duration.is_zero() {
            return;
        }
        #[cfg(target_os = "linux")]
        Self::linux_sleep(duration);
        #[cfg(not(target_os = "linux"))]
        Self::sleep_with_spin_tail(duration);
    }

    #[cfg(target_os = "linux")]
    fn linux_sleep(duration: Duration) {
        use libc::{CLOCK_MONOTONIC, clock_nanosleep, timespec};

        let request = timespec {
            tv_sec: duration.as_secs() as libc::time_t,
            tv_nsec: duration.subsec_nanos() as libc::c_long,
        };

        unsafe {
            clock_nanosleep(CLOCK_MONOTONIC, 0, &request, std::ptr::null_mut());
        }
    }

    #[cfg(not(target_os = "linux"))]
    fn sleep_with_spin_tail(duration: Duration) {
        const SPIN_TAIL: Duration = Duration::from_micros(200);

        let deadline = Instant::now() + duration;
        if duration > SPIN_TAIL {
            std::thread::sleep(duration - SPIN_TAIL);
        }
        while Instant::now() < deadline {
            std::hint::spin_loop();
        }
    }
}

impl Timer for HighPrecisionTimer {
    fn now(&self) -> u64 {
        self.start.elapsed().as_nanos() as u64
    }

    fn sleep(&self, duration: Duration) {
        self.high_precision_sleep(duration);
    }
}

impl Default for HighPrecisionTimer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn now_is_monotonic() {
        let timer = HighPrecisionTimer::new();
        let a = timer.now();
        let b = timer.now();
        assert!(b >= a);
    }

    #[test]
    fn sleep_blocks_for_at_least_the_requested_duration() {
        let timer = HighPrecisionTimer::new();
        let before = timer.now();
        timer.sleep(Duration::from_millis(5));
        assert!(timer.elapsed(before) >= Duration::from_millis(5));
    }

    #[test]
    fn elapsed_never_underflows() {
        let timer = HighPrecisionTimer::new();
        let future = timer.now() + 1_000_000_000;
        assert_eq!(timer.elapsed(future), Duration::ZERO);
    }
}
