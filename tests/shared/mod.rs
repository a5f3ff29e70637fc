use std::{
    io::{self, Write},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    thread,
    time::Duration,
};

use qstream::{ErrorCode, QueryEngine, Respond, Status};
use rand::Rng;

#[derive(Debug, Default)]
pub(crate) struct Calls {
    pub(crate) initialized: AtomicUsize,
    pub(crate) executed: AtomicUsize,
    pub(crate) deinitialized: AtomicUsize,
    pub(crate) files: Mutex<Option<String>>,
}

/// Answers every query with `ECHO:<query>` after a random delay.
#[derive(Debug, Clone, Default)]
pub(crate) struct EchoEngine {
    pub(crate) calls: Arc<Calls>,
    pub(crate) init_error: Option<Status>,
}

impl EchoEngine {
    pub(crate) fn failing_init(code: Status) -> Self {
        Self {
            init_error: Some(code),
            ..Self::default()
        }
    }
}

impl QueryEngine for EchoEngine {
    type Env = ();

    fn initialize(&self, files: &str) -> Result<Self::Env, ErrorCode> {
        self.calls.initialized.fetch_add(1, Ordering::SeqCst);
        *self.calls.files.lock().unwrap() = Some(files.to_string());

        match self.init_error {
            Some(code) => Err(ErrorCode(code)),
            None => Ok(()),
        }
    }

    fn execute(&self, _env: &Self::Env, query: &str, mut respond: Respond) -> Status {
        self.calls.executed.fetch_add(1, Ordering::SeqCst);

        let delay = rand::thread_rng().gen_range(1..15);
        thread::sleep(Duration::from_millis(delay));

        respond(format!("ECHO:{query}"));
        0
    }

    fn deinitialize(&self, _env: Self::Env) {
        self.calls.deinitialized.fetch_add(1, Ordering::SeqCst);
    }
}

/// Writer whose contents stay readable after the harness drops its handle.
#[derive(Debug, Clone, Default)]
pub(crate) struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl SharedBuf {
    pub(crate) fn lines(&self) -> Vec<String> {
        let bytes = self.0.lock().unwrap().clone();

        String::from_utf8(bytes)
            .unwrap()
            .lines()
            .map(ToString::to_string)
            .collect()
    }
}

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Response lines, without the closing summary.
pub(crate) fn responses(output: &SharedBuf) -> Vec<String> {
    output
        .lines()
        .into_iter()
        .filter(|line| !line.starts_with("Done."))
        .collect()
}
