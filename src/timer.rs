//! Wall-clock and CPU phase timers.
//!
//! The driver wraps the build and encode phases in one timer of each kind
//! and prints the report lines on success as well as on failure.

use std::time::Instant;

/// Records wall-clock time, including time spent sleeping.
pub struct WallclockTimer {
    start: Option<Instant>,
    text: String,
}

impl WallclockTimer {
    /// Creates a stopped timer. `text` must contain one `{}` slot for the
    /// elapsed seconds.
    pub fn new(text: &str) -> Self {
        WallclockTimer {
            start: None,
            text: text.to_string(),
        }
    }

    pub fn start(&mut self) {
        assert!(self.start.is_none(), "timer is already running");
        self.start = Some(Instant::now());
    }

    /// Stops the timer and returns the formatted report line.
    pub fn stop(&mut self) -> String {
        let start = self.start.take().expect("timer is not running");
        let elapsed = start.elapsed().as_secs_f64();
        self.text.replacen("{}", &format!("{elapsed:.4}"), 1)
    }
}

/// Records CPU time (user + system) of the current process, hence
/// excluding time the process is sleeping.
pub struct ProcessTimer {
    start: Option<f64>,
    text: String,
}

impl ProcessTimer {
    pub fn new(text: &str) -> Self {
        ProcessTimer {
            start: None,
            text: text.to_string(),
        }
    }

    pub fn start(&mut self) {
        assert!(self.start.is_none(), "timer is already running");
        self.start = Some(process_seconds());
    }

    /// Stops the timer and returns the formatted report line.
    pub fn stop(&mut self) -> String {
        let start = self.start.take().expect("timer is not running");
        let elapsed = process_seconds() - start;
        self.text.replacen("{}", &format!("{elapsed:.4}"), 1)
    }
}

fn process_seconds() -> f64 {
    // SAFETY: getrusage only writes into the buffer we hand it.
    unsafe {
        let mut usage: libc::rusage = std::mem::zeroed();
        if libc::getrusage(libc::RUSAGE_SELF, &mut usage) != 0 {
            return 0.0;
        }
        let user = usage.ru_utime.tv_sec as f64 + usage.ru_utime.tv_usec as f64 * 1e-6;
        let system = usage.ru_stime.tv_sec as f64 + usage.ru_stime.tv_usec as f64 * 1e-6;
        user + system
    }
}
