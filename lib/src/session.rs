use tracing::debug;

use crate::{
    code::{ErrorCode, Status},
    engine::{QueryEngine, Respond},
};

/// An engine paired with the environment it initialized.
pub struct Session<E: QueryEngine> {
    engine: E,
    env: E::Env,
}

impl<E: QueryEngine> Session<E> {
    pub fn open(engine: E, files: &str) -> Result<Self, ErrorCode> {
        let env = engine.initialize(files)?;
        debug!("engine environment initialized");

        Ok(Self { engine, env })
    }

    #[inline]
    pub fn execute(&self, query: &str, respond: Respond) -> Status {
        self.engine.execute(&self.env, query, respond)
    }

    pub fn close(self) {
        self.engine.deinitialize(self.env);
        debug!("engine environment deinitialized");
    }
}
