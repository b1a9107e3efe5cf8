//! Error handling for the configuration front-end

use crate::config::address::Family;
use crate::log_util::escape_snippet;

use std::error;
use std::fmt;
use std::io;

/// A Result for internal operations.
pub type Result<T> = ::std::result::Result<T, Error>;

/// All errors which might arise while loading or building a configuration
#[derive(Debug)]
pub enum Error {
    Io(io::Error),
    Syntax(SyntaxError),
    PortOutOfRange(u32),
    InvalidHost { host: String, family: Family },
    MissingErrorPage(u16),
    MissingIndex(String),
    RangeOutOfBounds { start: usize, end: usize, len: usize },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::Io(ref e) => write!(f, "I/O error: {}", e),
            Error::Syntax(ref e) => fmt::Display::fmt(e, f),
            Error::PortOutOfRange(port) => {
                write!(f, "invalid port {}: must be at most 65535", port)
            }
            Error::InvalidHost { ref host, family } => {
                write!(f, "invalid host {:?} for {}", host, family)
            }
            Error::MissingErrorPage(code) => {
                write!(f, "no error pages are configured for code {}", code)
            }
            Error::MissingIndex(ref name) => {
                write!(f, "index {:?} is not a server default index", name)
            }
            Error::RangeOutOfBounds { start, end, len } => write!(
                f,
                "range {}..{} is out of bounds for a sequence of length {}",
                start, end, len
            ),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match *self {
            Error::Io(ref e) => Some(e),
            Error::Syntax(ref e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Error {
        Error::Io(e)
    }
}

impl From<SyntaxError> for Error {
    fn from(e: SyntaxError) -> Error {
        Error::Syntax(e)
    }
}

/// What went wrong in a malformed configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyntaxErrorKind {
    /// A directive every server block must carry is absent
    MissingDirective(&'static str),
    /// A token showed up where the grammar does not allow it
    UnexpectedToken(String),
    /// Input ended before the block opened with this delimiter was closed
    UnterminatedBlock(char),
    /// A directive's value could not be understood
    InvalidValue(String),
}

/// A malformed-configuration failure, pinned to the line that caused it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    pub kind: SyntaxErrorKind,
    /// 1-based line number in the parsed text
    pub line: usize,
    /// The offending source line, trimmed
    pub snippet: String,
}

impl SyntaxError {
    pub fn new(kind: SyntaxErrorKind, line: usize, snippet: &str) -> SyntaxError {
        SyntaxError {
            kind,
            line,
            snippet: snippet.trim().to_owned(),
        }
    }
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "malformed configuration at line {}: ", self.line)?;
        match self.kind {
            SyntaxErrorKind::MissingDirective(name) => {
                write!(f, "missing required directive `{}`", name)?
            }
            SyntaxErrorKind::UnexpectedToken(ref detail) => write!(f, "{}", detail)?,
            SyntaxErrorKind::UnterminatedBlock(open) => {
                write!(f, "block opened with `{}` is never closed", open)?
            }
            SyntaxErrorKind::InvalidValue(ref detail) => {
                write!(f, "invalid value: {}", detail)?
            }
        }
        if !self.snippet.is_empty() {
            write!(f, " (near `{}`)", escape_snippet(&self.snippet))?;
        }
        Ok(())
    }
}

impl error::Error for SyntaxError {}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn syntax_errors_read_as_malformed_configuration() {
        let err = Error::from(SyntaxError::new(
            SyntaxErrorKind::MissingDirective("server_name:"),
            1,
            "  server: {  ",
        ));

        assert_eq!(
            err.to_string(),
            "malformed configuration at line 1: missing required directive \
             `server_name:` (near `server: {`)"
        );
    }

    #[test]
    fn empty_snippet_is_omitted() {
        let err = SyntaxError::new(SyntaxErrorKind::UnterminatedBlock('['), 4, "");

        assert_eq!(
            err.to_string(),
            "malformed configuration at line 4: block opened with `[` is never closed"
        );
    }
}
