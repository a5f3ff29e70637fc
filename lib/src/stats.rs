use std::{
    fmt,
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

/// Counters shared with running queries.
#[derive(Debug, Default)]
pub struct Tally {
    responses: AtomicU64,
    failures: AtomicU64,
}

impl Tally {
    #[inline]
    pub fn record_response(&self) {
        self.responses.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn responses(&self) -> u64 {
        self.responses.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }
}

/// Summary of one run, reported at shutdown.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RunStats {
    /// Queries launched.
    pub processed: u64,

    /// Completions observed by the dispatcher.
    pub completed: u64,

    /// Responses delivered by the engine.
    pub responses: u64,

    /// Queries with a non-zero status, an engine-reported error, or a panic.
    pub failed: u64,

    pub elapsed: Duration,
}

impl RunStats {
    #[inline]
    pub fn elapsed_millis(&self) -> u128 {
        self.elapsed.as_millis()
    }

    /// Queries per second, `None` if no time has elapsed.
    pub fn qps(&self) -> Option<f64> {
        let seconds = self.elapsed.as_secs_f64();
        (seconds > 0.0).then(|| self.processed as f64 / seconds)
    }
}

impl fmt::Display for RunStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Done.  {} queries processed ({} failed).  Total elapsed milliseconds since initialisation: {}.  QPS = ",
            self.processed,
            self.failed,
            self.elapsed_millis(),
        )?;

        match self.qps() {
            Some(qps) => write!(f, "{qps:.0}"),
            None => f.write_str("n/a"),
        }
    }
}
