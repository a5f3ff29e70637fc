use std::fmt;

/// Integer status returned by the engine. Zero is success.
pub type Status = i32;

/// An engine error code.
///
/// The magnitude packs three fields: `severity * 100_000 + category * 10_000 + base`.
/// Codes may be reported with either sign.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ErrorCode(pub Status);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
    Fatal,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Category {
    General,
    Io,
    Memory,
    Syscall,
}

const EXPLANATIONS: &[(u32, &str)] = &[
    (64, "all four index files must be given when no index directory is set"),
    (65, "an index directory and individual index files were both given"),
    (66, "unable to open the output file for writing"),
    (67, "engine internal tests failed"),
    (68, "engine library must be built for a 64-bit target"),
    (69, "failed to create a query processing environment"),
    (70, "unable to allocate memory for a file name"),
    (71, "unrecognized file passed to initialization"),
    (72, "incomplete file list passed to initialization"),
    (73, "internal sanity test failed: tail string"),
    (74, "internal sanity test failed: substitution"),
    (75, "internal sanity test failed: bag similarity"),
    (76, "internal sanity test failed: prefix signature"),
    (80, "query text could not be converted to UTF-8"),
];

impl ErrorCode {
    #[inline]
    pub fn get(&self) -> Status {
        self.0
    }

    #[inline]
    pub fn is_success(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    fn magnitude(&self) -> u32 {
        self.0.unsigned_abs()
    }

    pub fn severity(&self) -> Severity {
        match self.magnitude() / 100_000 {
            0 => Severity::Warning,
            1 => Severity::Error,
            _ => Severity::Fatal,
        }
    }

    pub fn category(&self) -> Category {
        match self.magnitude() % 100_000 / 10_000 {
            1 => Category::Io,
            2 => Category::Memory,
            3 => Category::Syscall,
            _ => Category::General,
        }
    }

    #[inline]
    pub fn base(&self) -> u32 {
        self.magnitude() % 10_000
    }

    pub fn explanation(&self) -> &'static str {
        if self.is_success() {
            return "success";
        }

        // Initialization runs self-test families before loading anything and
        // reports them as `family * 1000 + code`.
        if (1000..6000).contains(&self.0) {
            return match self.0 / 1000 {
                1 => "engine self-test failed: string macros",
                2 => "engine self-test failed: prefix matching",
                3 => "engine self-test failed: duplicate detection",
                4 => "engine self-test failed: substitution",
                _ => "engine self-test failed: bag similarity",
            };
        }

        let base = self.base();
        EXPLANATIONS
            .iter()
            .find(|(code, _)| *code == base)
            .map(|(_, explanation)| *explanation)
            .unwrap_or("unknown error code")
    }
}

impl From<Status> for ErrorCode {
    fn from(value: Status) -> Self {
        Self(value)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Fatal => "fatal",
        })
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Category::General => "general",
            Category::Io => "i/o",
            Category::Memory => "memory",
            Category::Syscall => "syscall",
        })
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}, {}): {}",
            self.0,
            self.severity(),
            self.category(),
            self.explanation()
        )
    }
}
