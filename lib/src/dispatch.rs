use std::{
    io::Write,
    num::NonZeroUsize,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Instant,
};

use tokio::{
    sync::{OwnedSemaphorePermit, Semaphore},
    task::{self, JoinHandle},
};
use tracing::{error, trace, warn};

use crate::{
    code::ErrorCode,
    engine::{QueryEngine, Respond},
    error::DispatchError,
    response::Response,
    session::Session,
    sink::ResponseSink,
    slot::{Outcome, SlotPool},
    stats::{RunStats, Tally},
    util::Counter,
};

/// Runs queries against a session on at most N concurrent query streams.
///
/// Each submitted query is moved into its own blocking task and parked in a
/// free slot of the pool. Capacity is bounded by a semaphore with one permit
/// per stream: a task holds its permit for as long as the engine call runs,
/// so `submit` waits for capacity instead of spinning on the slots.
pub struct Dispatcher<E: QueryEngine, W: Write + Send + 'static> {
    session: Arc<Session<E>>,
    sink: Arc<ResponseSink<W>>,
    pool: SlotPool<JoinHandle<()>>,
    permits: Arc<Semaphore>,
    tally: Arc<Tally>,
    processed: Counter<u64>,
    completed: Counter<u64>,
    started: Instant,
}

impl<E: QueryEngine, W: Write + Send + 'static> Dispatcher<E, W> {
    pub fn new(session: Session<E>, sink: Arc<ResponseSink<W>>, streams: NonZeroUsize) -> Self {
        Self {
            session: Arc::new(session),
            sink,
            pool: SlotPool::new(streams),
            permits: Arc::new(Semaphore::new(streams.get())),
            tally: Arc::new(Tally::default()),
            processed: Counter::default(),
            completed: Counter::default(),
            started: Instant::now(),
        }
    }

    #[inline]
    pub fn streams(&self) -> usize {
        self.pool.len()
    }

    /// Slots currently holding a query that has not been reaped.
    #[inline]
    pub fn in_flight(&self) -> usize {
        self.pool.occupied()
    }

    #[inline]
    pub fn processed(&self) -> u64 {
        self.processed.get()
    }

    #[inline]
    pub fn completed(&self) -> u64 {
        self.completed.get()
    }

    /// Launches `query` in the first free slot, waiting for capacity if every
    /// stream is busy. Returns the slot index used.
    pub async fn submit(&mut self, query: String) -> Result<usize, DispatchError> {
        let permit = Arc::clone(&self.permits).acquire_owned().await?;

        let index = loop {
            self.reap();

            if let Some(index) = self.pool.find_free_slot() {
                break index;
            }

            // A task gives its permit back just before its handle reports
            // finished, so a slot can trail the permit we now hold.
            task::yield_now().await;
        };

        trace!(slot = index, %query, "launching query");

        let handle = self.launch(index, query, permit);
        self.pool.mark_occupied(index, handle);
        self.processed.increment();

        Ok(index)
    }

    /// Frees every slot whose query has finished. Never waits.
    pub fn reap(&mut self) -> usize {
        let mut released = 0;

        for index in 0..self.pool.len() {
            if let Some(outcome) = self.pool.poll_release(index) {
                if outcome == Outcome::Failed {
                    self.tally.record_failure();
                }

                self.completed.increment();
                released += 1;
            }
        }

        released
    }

    /// Waits for every in-flight query, then frees all slots.
    pub async fn drain(&mut self) -> Result<(), DispatchError> {
        let streams = self.pool.len();
        let streams = u32::try_from(streams).map_err(|_| DispatchError::Streams(streams))?;

        // Holding every permit means no engine call is still running.
        let all = Arc::clone(&self.permits).acquire_many_owned(streams).await?;

        while !self.pool.is_idle() {
            if self.reap() == 0 {
                task::yield_now().await;
            }
        }

        drop(all);
        Ok(())
    }

    pub fn stats(&self) -> RunStats {
        RunStats {
            processed: self.processed.get(),
            completed: self.completed.get(),
            responses: self.tally.responses(),
            failed: self.tally.failures(),
            elapsed: self.started.elapsed(),
        }
    }

    /// Drains stragglers, closes the session and reports the run.
    pub async fn finish(mut self) -> Result<RunStats, DispatchError> {
        self.drain().await?;
        let stats = self.stats();

        match Arc::try_unwrap(self.session) {
            Ok(session) => session.close(),
            Err(_) => warn!("engine environment is still shared, skipping deinitialization"),
        }

        Ok(stats)
    }

    fn launch(&self, index: usize, query: String, permit: OwnedSemaphorePermit) -> JoinHandle<()> {
        let session = Arc::clone(&self.session);
        let tally = Arc::clone(&self.tally);

        let failed = Arc::new(AtomicBool::new(false));
        let respond = responder(
            index,
            query.clone(),
            Arc::clone(&self.sink),
            Arc::clone(&self.tally),
            Arc::clone(&failed),
        );

        task::spawn_blocking(move || {
            let status = session.execute(&query, respond);

            if status != 0 {
                warn!(slot = index, %query, code = %ErrorCode(status), "query execution failed");
                failed.store(true, Ordering::Relaxed);
            }

            if failed.load(Ordering::Relaxed) {
                tally.record_failure();
            }

            drop(permit);
        })
    }
}

fn responder<W: Write + Send + 'static>(
    slot: usize,
    query: String,
    sink: Arc<ResponseSink<W>>,
    tally: Arc<Tally>,
    failed: Arc<AtomicBool>,
) -> Respond {
    Box::new(move |text: String| {
        tally.record_response();

        // Responses that don't carry the engine's header are passed through as is.
        if let Ok(status) = Response::status(&text) {
            if status < 0 {
                warn!(slot, %query, code = %ErrorCode(status), "engine reported a query error");
                failed.store(true, Ordering::Relaxed);
            }
        }

        if let Err(err) = sink.emit(&text) {
            error!(slot, %query, "failed to write response: {err}");
        }
    })
}
