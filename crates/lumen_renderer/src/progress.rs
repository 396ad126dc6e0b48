//! Advisory progress reporting for long-running passes.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

const POLL: Duration = Duration::from_millis(50);
const REPORT_INTERVAL: Duration = Duration::from_secs(1);

/// Shared counter that workers bump and a monitor thread reads.
pub(crate) struct Progress {
    label: &'static str,
    unit: &'static str,
    total: usize,
    done: AtomicUsize,
    finished: AtomicBool,
}

impl Progress {
    pub fn new(label: &'static str, unit: &'static str, total: usize) -> Self {
        Self {
            label,
            unit,
            total,
            done: AtomicUsize::new(0),
            finished: AtomicBool::new(false),
        }
    }

    pub fn add(&self, n: usize) {
        self.done.fetch_add(n, Ordering::Relaxed);
    }

    pub fn done(&self) -> usize {
        self.done.load(Ordering::Relaxed)
    }

    /// Stop the monitor loop.
    pub fn finish(&self) {
        self.finished.store(true, Ordering::Release);
    }

    /// Log percent complete, rate and ETA once a second until [`finish`].
    ///
    /// [`finish`]: Progress::finish
    pub fn monitor(&self) {
        let start = Instant::now();
        let mut last = start;
        while !self.finished.load(Ordering::Acquire) {
            thread::sleep(POLL);
            if last.elapsed() >= REPORT_INTERVAL {
                last = Instant::now();
                self.report(start.elapsed());
            }
        }
        let secs = start.elapsed().as_secs_f64().max(1e-9);
        log::info!(
            "{}: {} {} in {:.2}s ({:.0} {}/s)",
            self.label,
            self.done(),
            self.unit,
            secs,
            self.done() as f64 / secs,
            self.unit
        );
    }

    fn report(&self, elapsed: Duration) {
        let done = self.done();
        let secs = elapsed.as_secs_f64().max(1e-9);
        let rate = done as f64 / secs;
        let percent = 100.0 * done as f64 / self.total.max(1) as f64;
        let eta = if rate > 0.0 {
            Duration::from_secs_f64(self.total.saturating_sub(done) as f64 / rate)
        } else {
            Duration::ZERO
        };
        log::info!(
            "{}: {:.1}% ({:.0} {}/s, ETA {:.0?})",
            self.label,
            percent,
            rate,
            self.unit,
            eta
        );
    }
}
