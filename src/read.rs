use std::path::{Path, PathBuf};

use tokio::{
    fs::File,
    io::{self, AsyncBufRead, AsyncBufReadExt, BufReader, Lines},
};

use crate::{
    error::{Error, IoError},
    files::FileList,
};

/// Where queries come from, in priority order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum QuerySource {
    Single(String),
    Batch(PathBuf),
    Stdin,
}

impl QuerySource {
    pub fn resolve(single: Option<&str>, files: &FileList) -> Self {
        if let Some(query) = single.filter(|query| !query.is_empty()) {
            return Self::Single(query.to_string());
        }

        match files.query_batch() {
            Some(path) => Self::Batch(path.to_path_buf()),
            None => Self::Stdin,
        }
    }
}

/// Line reader over a batch file, stdin or any buffered async reader.
pub struct QueryReader {
    inner: Inner,
}

enum Inner {
    Single(Option<String>),
    Lines(Lines<Box<dyn AsyncBufRead + Send + Unpin>>),
}

impl QueryReader {
    pub fn single<S: Into<String>>(query: S) -> Self {
        Self {
            inner: Inner::Single(Some(query.into())),
        }
    }

    pub fn from_reader<R: AsyncBufRead + Send + Unpin + 'static>(reader: R) -> Self {
        let reader: Box<dyn AsyncBufRead + Send + Unpin> = Box::new(reader);

        Self {
            inner: Inner::Lines(reader.lines()),
        }
    }

    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref();

        match File::open(path).await {
            Ok(file) => Ok(Self::from_reader(BufReader::new(file))),
            Err(error) => Err(IoError::File(path.display().to_string(), error.kind()).into()),
        }
    }

    pub fn stdin() -> Self {
        Self::from_reader(BufReader::new(io::stdin()))
    }

    /// Next query, without its line terminator. Empty lines are queries too.
    pub async fn next_line(&mut self) -> Result<Option<String>, Error> {
        match &mut self.inner {
            Inner::Single(query) => Ok(query.take()),
            Inner::Lines(lines) => lines
                .next_line()
                .await
                .map_err(|error| IoError::Reader(error.kind()).into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use crate::{
        error::{Error, IoError},
        files::FileList,
        read::{QueryReader, QuerySource},
    };

    async fn collect(mut reader: QueryReader) -> Vec<String> {
        let mut lines = Vec::new();
        while let Some(line) = reader.next_line().await.unwrap() {
            lines.push(line);
        }
        lines
    }

    #[test]
    fn test_source_priority() {
        let dir = tempfile::tempdir().unwrap();
        let batch = dir.path().join("QBASH.query_batch");
        fs::write(&batch, "alpha\n").unwrap();

        let with_batch = FileList::from_index_dir(dir.path());
        let without_batch = FileList::parse("/i/QBASH.if");

        assert_eq!(
            QuerySource::resolve(Some("hello"), &with_batch),
            QuerySource::Single("hello".to_string())
        );
        assert_eq!(
            QuerySource::resolve(Some(""), &with_batch),
            QuerySource::Batch(batch)
        );
        assert_eq!(QuerySource::resolve(None, &without_batch), QuerySource::Stdin);
    }

    #[tokio::test]
    async fn test_reader_file_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("QBASH.query_batch");
        fs::write(&path, "alpha\r\nbeta\n\ngamma").unwrap();

        let reader = QueryReader::open(&path).await.unwrap();

        assert_eq!(collect(reader).await, vec!["alpha", "beta", "", "gamma"]);
    }

    #[tokio::test]
    async fn test_reader_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.query_batch");

        match QueryReader::open(&path).await {
            Err(Error::Io(IoError::File(name, kind))) => {
                assert!(name.ends_with("missing.query_batch"));
                assert_eq!(kind, std::io::ErrorKind::NotFound);
            }
            _ => panic!("expected a file error"),
        }
    }

    #[tokio::test]
    async fn test_reader_single_query() {
        let reader = QueryReader::single("hello");

        assert_eq!(collect(reader).await, vec!["hello"]);
    }

    #[tokio::test]
    async fn test_reader_from_bytes() {
        let reader = QueryReader::from_reader(&b"one\ntwo\n"[..]);

        assert_eq!(collect(reader).await, vec!["one", "two"]);
    }
}
