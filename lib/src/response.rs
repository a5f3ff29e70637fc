use std::str::FromStr;

use thiserror::Error;

use crate::code::Status;

const VERSION_PREFIX: &str = "QbasherVersion:";

#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    #[error("Missing response header")]
    Header,

    #[error("Malformed header field: {0}")]
    Field(&'static str),

    #[error("Malformed result line: {0}")]
    Hit(String),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Hit {
    pub text: String,
    pub score: f64,
}

/// A structured engine response.
///
/// ```text
/// QbasherVersion:1\t<status>\t<count>
/// <result>\t<score>
/// ...
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Response {
    pub version: u32,
    pub status: Status,
    pub count: usize,
    pub hits: Vec<Hit>,
}

impl Response {
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let mut lines = text.lines();
        let (version, status, count) = parse_header(lines.next())?;

        let hits = lines
            .filter(|line| !line.is_empty())
            .map(|line| {
                let (text, score) = line
                    .rsplit_once('\t')
                    .ok_or_else(|| ParseError::Hit(line.to_string()))?;

                let score = score
                    .trim()
                    .parse()
                    .map_err(|_| ParseError::Hit(line.to_string()))?;

                Ok(Hit {
                    text: text.to_string(),
                    score,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            version,
            status,
            count,
            hits,
        })
    }

    /// Status from the header line alone. Result lines are not inspected.
    pub fn status(text: &str) -> Result<Status, ParseError> {
        parse_header(text.lines().next()).map(|(_, status, _)| status)
    }

    /// Whether the engine reported an error for this query.
    #[inline]
    pub fn is_error(&self) -> bool {
        self.status < 0
    }
}

fn parse_header(header: Option<&str>) -> Result<(u32, Status, usize), ParseError> {
    let mut fields = header.ok_or(ParseError::Header)?.split('\t');

    let version = fields
        .next()
        .and_then(|field| field.strip_prefix(VERSION_PREFIX))
        .ok_or(ParseError::Header)?;

    Ok((
        parse_field(Some(version), "version")?,
        parse_field(fields.next(), "status")?,
        parse_field(fields.next(), "count")?,
    ))
}

fn parse_field<T: FromStr>(field: Option<&str>, name: &'static str) -> Result<T, ParseError> {
    field
        .map(str::trim)
        .and_then(|field| field.parse().ok())
        .ok_or(ParseError::Field(name))
}
