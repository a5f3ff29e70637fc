use std::{ffi::OsString, io::Write, num::NonZeroUsize, sync::Arc};

use qstream::{Dispatcher, QueryEngine, ResponseSink, RunStats, Session};
use tokio::io::AsyncBufRead;
use tracing::{error, info, warn};

use crate::{
    cli::Cli,
    error::{Error, IoError, StartupError},
    files::FileList,
    native::NativeEngine,
    read::{QueryReader, QuerySource},
};

/// Pointer width the engine library is built for.
pub const REQUIRED_POINTER_WIDTH: usize = 8;

/// Process exit status of a run that completed or only printed help.
pub const EXIT_SUCCESS: u8 = 0;

/// Runs the program for `args` and returns its exit status.
///
/// Help and responses go to `output`. The engine library is only loaded once
/// the arguments ask for a run.
pub async fn start<I, T, W>(args: I, output: W) -> u8
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
    W: Write + Send + 'static,
{
    match launch(args, output).await {
        Ok(()) => EXIT_SUCCESS,
        Err(err) => {
            error!("{err}");
            err.exit_code()
        }
    }
}

async fn launch<I, T, W>(args: I, mut output: W) -> Result<(), Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
    W: Write + Send + 'static,
{
    let cli = Cli::parse_lenient(args)?;

    if cli.help {
        return writeln!(output, "{}", Cli::usage())
            .map_err(|error| IoError::Output(error.kind()).into());
    }

    let path = cli.engine_lib.clone().unwrap_or_else(NativeEngine::default_path);
    let engine = NativeEngine::load(&path)?;

    let config = RunConfig {
        files: cli.file_list(),
        streams: cli.query_streams(),
        single: cli.single_query().map(ToString::to_string),
    };

    let stats = Harness::new(engine, config).run(output).await?;

    info!(
        processed = stats.processed,
        failed = stats.failed,
        elapsed_ms = stats.elapsed_millis() as u64,
        "run complete"
    );

    Ok(())
}

/// Settings for one run of the harness.
#[derive(Clone, Debug)]
pub struct RunConfig {
    pub files: FileList,
    pub streams: NonZeroUsize,
    pub single: Option<String>,
}

/// One run: initialize the engine, push every query through the dispatcher,
/// drain, deinitialize and report.
pub struct Harness<E: QueryEngine> {
    engine: E,
    config: RunConfig,
    pointer_width: usize,
    stdin: Option<Box<dyn AsyncBufRead + Send + Unpin>>,
}

impl<E: QueryEngine> Harness<E> {
    pub fn new(engine: E, config: RunConfig) -> Self {
        Self {
            engine,
            config,
            pointer_width: std::mem::size_of::<usize>(),
            stdin: None,
        }
    }

    pub fn with_pointer_width(mut self, width: usize) -> Self {
        self.pointer_width = width;
        self
    }

    /// Reads interactive queries from `reader` instead of the process stdin.
    pub fn with_stdin<R: AsyncBufRead + Send + Unpin + 'static>(mut self, reader: R) -> Self {
        self.stdin = Some(Box::new(reader));
        self
    }

    pub async fn run<W: Write + Send + 'static>(self, output: W) -> Result<RunStats, Error> {
        let Self {
            engine,
            config,
            pointer_width,
            stdin,
        } = self;

        if pointer_width != REQUIRED_POINTER_WIDTH {
            return Err(StartupError::PointerWidth(pointer_width).into());
        }

        let RunConfig {
            files,
            streams,
            single,
        } = config;

        info!(streams = streams.get(), files = %files, "starting query streams");

        let missing = files.missing_required();
        if !missing.is_empty() {
            warn!(?missing, "file list is missing index files");
        }

        for path in files.unrecognized() {
            warn!(path = %path.display(), "file list has an unrecognized entry");
        }

        let session =
            Session::open(engine, &files.to_string()).map_err(StartupError::Initialize)?;

        let sink = Arc::new(ResponseSink::new(output));
        let mut dispatcher = Dispatcher::new(session, Arc::clone(&sink), streams);

        let source = QuerySource::resolve(single.as_deref(), &files);
        let pumped = pump(&mut dispatcher, source, stdin).await;

        // Stragglers are awaited and the engine closed even if input failed.
        let stats = dispatcher.finish().await?;
        pumped?;

        if stats.failed > 0 {
            warn!(failed = stats.failed, "some queries failed");
        }

        sink.emit(&stats.to_string())
            .map_err(|error| IoError::Output(error.kind()))?;

        Ok(stats)
    }
}

async fn pump<E: QueryEngine, W: Write + Send + 'static>(
    dispatcher: &mut Dispatcher<E, W>,
    source: QuerySource,
    stdin: Option<Box<dyn AsyncBufRead + Send + Unpin>>,
) -> Result<(), Error> {
    let mut reader = match source {
        QuerySource::Single(query) => QueryReader::single(query),
        QuerySource::Batch(path) => {
            info!(batch = %path.display(), "reading queries from batch file");
            QueryReader::open(&path).await?
        }
        QuerySource::Stdin => {
            info!("please enter queries (or tab-separated queries + options) one per line");
            match stdin {
                Some(reader) => QueryReader::from_reader(reader),
                None => QueryReader::stdin(),
            }
        }
    };

    loop {
        match reader.next_line().await {
            Ok(Some(line)) => {
                dispatcher.submit(line).await?;
            }
            Ok(None) => return Ok(()),
            Err(err) => {
                error!(processed = dispatcher.processed(), "stopped reading queries: {err}");
                return Err(err);
            }
        }
    }
}
