use std::{
    io::{self, Write},
    sync::{Mutex, TryLockError},
    thread,
    time::Duration,
};

const RETRY_INTERVAL: Duration = Duration::from_millis(1);

/// Serializes responses from concurrent queries onto one writer.
///
/// Each `emit` holds the lock for exactly one response, so the bytes of a
/// response are never interleaved with another's. Responses from different
/// queries are written in whatever order their callers win the lock.
#[derive(Debug)]
pub struct ResponseSink<W: Write> {
    inner: Mutex<W>,
}

impl<W: Write> ResponseSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            inner: Mutex::new(writer),
        }
    }

    /// Writes `text` as one line. A trailing newline in `text` is not doubled.
    ///
    /// Spins on `try_lock`, sleeping briefly between attempts, rather than
    /// parking on the mutex.
    pub fn emit(&self, text: &str) -> io::Result<()> {
        loop {
            let mut writer = match self.inner.try_lock() {
                Ok(writer) => writer,
                // A writer poisoned by a panicking caller is still usable.
                Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
                Err(TryLockError::WouldBlock) => {
                    thread::sleep(RETRY_INTERVAL);
                    continue;
                }
            };

            writer.write_all(text.as_bytes())?;
            if !text.ends_with('\n') {
                writer.write_all(b"\n")?;
            }

            return writer.flush();
        }
    }

    pub fn into_inner(self) -> W {
        match self.inner.into_inner() {
            Ok(writer) => writer,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
