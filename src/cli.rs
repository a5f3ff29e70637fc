extern crate clap;

use std::{ffi::OsString, num::NonZeroUsize, path::PathBuf};

use clap::{CommandFactory, Parser};
use tracing::{debug, warn};

use crate::{error::ConfigError, files::FileList};

/// Upper bound on concurrent query streams.
pub const MAX_QUERY_STREAMS: usize = 100;

/// Flags accepted on the command line. Anything else is ignored.
const KNOWN_FLAGS: &[&str] = &[
    "index_dir",
    "object_store_files",
    "query_streams",
    "pq",
    "help",
    "engine_lib",
];

const HELP: &str = "--help";

const AFTER_HELP: &str = "\
If no -pq option is given, queries are read one per line, either from a file called \
QBASH.query_batch in index_dir (or explicitly listed in -object_store_files) or from stdin.

Flags are written as -name=value. Responses are written to stdout, logs to stderr.";

/// Drives a query engine library with queries on a bounded number of concurrent streams.
#[derive(Debug, Parser)]
#[command(name = "qstream", disable_help_flag = true, args_override_self = true)]
pub struct Cli {
    /// A directory potentially containing a single index.
    #[arg(long = "index_dir", value_name = "DIRECTORY", default_value = "../test_data/wikipedia_titles")]
    pub index_dir: PathBuf,

    /// Explicit comma-separated paths to all the index files (instead of index_dir).
    #[arg(long = "object_store_files", value_name = "FILES")]
    pub object_store_files: Option<String>,

    /// The degree of parallelism used when running queries.
    #[arg(long = "query_streams", value_name = "INTEGER", default_value = "10")]
    pub query_streams: NonZeroUsize,

    /// A single query string.
    #[arg(long = "pq", value_name = "QUERY")]
    pub pq: Option<String>,

    /// Show this message.
    #[arg(long = "help")]
    pub help: bool,

    /// Path of the engine shared library.
    #[arg(long = "engine_lib", env = "QSTREAM_ENGINE_LIB", hide = true)]
    pub engine_lib: Option<PathBuf>,
}

impl Cli {
    /// Parses `-name=value` style arguments, ignoring unrecognized ones.
    ///
    /// A repeated flag takes its last value. `-help` wins over every other
    /// flag, including ones whose values would not parse.
    pub fn parse_lenient<I, T>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        let mut args = args.into_iter().map(Into::into);
        let program = args.next();
        let normalized = args.filter_map(normalize).collect::<Vec<_>>();

        if normalized.iter().any(|arg| arg == HELP) {
            return Ok(Self::try_parse_from(program.into_iter().chain([OsString::from(HELP)]))?);
        }

        Ok(Self::try_parse_from(program.into_iter().chain(normalized))?)
    }

    /// Help text listing every flag in the `-name=value` form it is accepted in.
    pub fn usage() -> String {
        let command = Self::command();
        let mut usage = format!("Usage: {} [-name=value]...\n\nOptions:\n", command.get_name());

        for arg in command.get_arguments().filter(|arg| !arg.is_hide_set()) {
            let Some(long) = arg.get_long() else {
                continue;
            };

            let flag = match arg.get_value_names() {
                Some([value, ..]) if arg.get_action().takes_values() => format!("-{long}={value}"),
                _ => format!("-{long}"),
            };

            let help = arg.get_help().map(ToString::to_string).unwrap_or_default();
            let default = arg
                .get_default_values()
                .first()
                .map(|value| format!(" [default: {}]", value.to_string_lossy()))
                .unwrap_or_default();

            usage.push_str(&format!("  {flag:<32} {help}{default}\n"));
        }

        usage.push('\n');
        usage.push_str(AFTER_HELP);
        usage
    }

    /// The single query, if one was given and is not empty.
    pub fn single_query(&self) -> Option<&str> {
        self.pq.as_deref().filter(|query| !query.is_empty())
    }

    pub fn query_streams(&self) -> NonZeroUsize {
        if self.query_streams.get() <= MAX_QUERY_STREAMS {
            return self.query_streams;
        }

        warn!(
            requested = self.query_streams.get(),
            max = MAX_QUERY_STREAMS,
            "too many query streams, clamping"
        );

        NonZeroUsize::new(MAX_QUERY_STREAMS).unwrap_or(self.query_streams)
    }

    /// The explicit file list if given, otherwise the default list for `index_dir`.
    pub fn file_list(&self) -> FileList {
        match self.object_store_files.as_deref() {
            Some(files) if !files.trim().is_empty() => FileList::parse(files),
            _ => FileList::from_index_dir(&self.index_dir),
        }
    }
}

/// Rewrites a recognized `-name=value` argument into clap's `--name=value`.
fn normalize(arg: OsString) -> Option<OsString> {
    let Some(text) = arg.to_str() else {
        debug!(?arg, "ignoring non UTF-8 argument");
        return None;
    };

    let flag = text.trim_start_matches('-');
    let name = flag.split_once('=').map_or(flag, |(name, _)| name);

    if text.starts_with('-') && name == "help" {
        return Some(HELP.into());
    }

    if text.starts_with('-') && KNOWN_FLAGS.contains(&name) {
        return Some(format!("--{flag}").into());
    }

    debug!(argument = text, "ignoring unrecognized argument");
    None
}
