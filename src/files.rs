use std::{
    fmt,
    path::{Path, PathBuf},
};

/// Kinds of file the engine accepts in its file list, recognised by suffix.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IndexFile {
    Forward,
    InvertedFile,
    Vocab,
    DocTable,
    Config,
    SegmentRules,
    SubstitutionRules,
    QueryBatch,
    Output,
}

impl IndexFile {
    pub const ALL: [IndexFile; 9] = [
        IndexFile::Forward,
        IndexFile::InvertedFile,
        IndexFile::Vocab,
        IndexFile::DocTable,
        IndexFile::Config,
        IndexFile::SegmentRules,
        IndexFile::SubstitutionRules,
        IndexFile::QueryBatch,
        IndexFile::Output,
    ];

    /// Files the engine cannot initialize without.
    pub const REQUIRED: [IndexFile; 4] = [
        IndexFile::Forward,
        IndexFile::InvertedFile,
        IndexFile::Vocab,
        IndexFile::DocTable,
    ];

    pub fn suffix(&self) -> &'static str {
        match self {
            IndexFile::Forward => ".forward",
            IndexFile::InvertedFile => ".if",
            IndexFile::Vocab => ".vocab",
            IndexFile::DocTable => ".doctable",
            IndexFile::Config => ".config",
            IndexFile::SegmentRules => ".segment_rules",
            IndexFile::SubstitutionRules => ".substitution_rules",
            IndexFile::QueryBatch => ".query_batch",
            IndexFile::Output => ".output",
        }
    }

    /// Conventional file name inside an index directory.
    pub fn file_name(&self) -> String {
        format!("QBASH{}", self.suffix())
    }

    pub fn classify<P: AsRef<Path>>(path: P) -> Option<Self> {
        let path = path.as_ref().to_str()?;

        Self::ALL
            .into_iter()
            .find(|kind| path.ends_with(kind.suffix()))
    }
}

/// The comma-separated list of paths handed to engine initialization.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FileList {
    paths: Vec<PathBuf>,
}

impl FileList {
    /// Splits on commas, trimming whitespace and skipping empty entries.
    pub fn parse(list: &str) -> Self {
        let paths = list
            .split(',')
            .map(str::trim)
            .filter(|path| !path.is_empty())
            .map(PathBuf::from)
            .collect();

        Self { paths }
    }

    /// Default list for an index directory. The query batch is only listed
    /// when the directory actually has one.
    pub fn from_index_dir<P: AsRef<Path>>(dir: P) -> Self {
        let dir = dir.as_ref();

        let paths = IndexFile::ALL
            .into_iter()
            .filter(|kind| *kind != IndexFile::Output)
            .map(|kind| dir.join(kind.file_name()))
            .filter(|path| IndexFile::classify(path) != Some(IndexFile::QueryBatch) || path.is_file())
            .collect();

        Self { paths }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.paths.iter().map(PathBuf::as_path)
    }

    pub fn find(&self, kind: IndexFile) -> Option<&Path> {
        self.iter().find(|path| IndexFile::classify(path) == Some(kind))
    }

    #[inline]
    pub fn query_batch(&self) -> Option<&Path> {
        self.find(IndexFile::QueryBatch)
    }

    pub fn missing_required(&self) -> Vec<IndexFile> {
        IndexFile::REQUIRED
            .into_iter()
            .filter(|kind| self.find(*kind).is_none())
            .collect()
    }

    pub fn unrecognized(&self) -> impl Iterator<Item = &Path> {
        self.iter().filter(|path| IndexFile::classify(path).is_none())
    }
}

impl fmt::Display for FileList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (position, path) in self.paths.iter().enumerate() {
            if position > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}", path.display())?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::{fs, path::Path};

    use super::{FileList, IndexFile};

    #[test]
    fn test_classify_by_suffix() {
        assert_eq!(IndexFile::classify("/x/QBASH.if"), Some(IndexFile::InvertedFile));
        assert_eq!(IndexFile::classify("a.doctable"), Some(IndexFile::DocTable));
        assert_eq!(
            IndexFile::classify("rules.substitution_rules"),
            Some(IndexFile::SubstitutionRules)
        );
        assert_eq!(IndexFile::classify("QBASH.query_batch"), Some(IndexFile::QueryBatch));
        assert_eq!(IndexFile::classify("notes.txt"), None);
    }

    #[test]
    fn test_parse_skips_empty_entries() {
        let list = FileList::parse(" /i/QBASH.forward,, /i/QBASH.if ,/i/QBASH.vocab,");

        assert_eq!(list.len(), 3);
        assert_eq!(list.to_string(), "/i/QBASH.forward,/i/QBASH.if,/i/QBASH.vocab");
        assert_eq!(list.missing_required(), vec![IndexFile::DocTable]);
        assert_eq!(list.query_batch(), None);
    }

    #[test]
    fn test_unrecognized_entries() {
        let list = FileList::parse("/i/QBASH.if,/i/readme.md");

        assert_eq!(
            list.unrecognized().collect::<Vec<_>>(),
            vec![Path::new("/i/readme.md")]
        );
    }

    #[test]
    fn test_index_dir_lists_batch_only_when_present() {
        let dir = tempfile::tempdir().unwrap();

        let list = FileList::from_index_dir(dir.path());
        assert_eq!(list.len(), 7);
        assert!(list.missing_required().is_empty());
        assert_eq!(list.query_batch(), None);

        let batch = dir.path().join("QBASH.query_batch");
        fs::write(&batch, "alpha\n").unwrap();

        let list = FileList::from_index_dir(dir.path());
        assert_eq!(list.len(), 8);
        assert_eq!(list.query_batch(), Some(batch.as_path()));
        assert!(list.find(IndexFile::Output).is_none());
    }
}
