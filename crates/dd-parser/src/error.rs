use crate::SourceLine;
use core::fmt;
use thiserror::Error;

pub type Result<T, E = ParseError> = core::result::Result<T, E>;

/// Failure to split a single line into tokens. Columns are 1-based character
/// positions in the original line, before comment stripping and trimming.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("unclosed quote opened at column {column}")]
    UnclosedQuote { column: usize },
    #[error("illegal quote placement at column {column}")]
    IllegalQuotePlacement { column: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("cannot open file {path}: {reason}")]
    CannotOpenFile { path: String, reason: String },
    #[error("failed reading {path}: {reason}")]
    ReadFailed { path: String, reason: String },
    #[error("inclusion cycle: {path} is already being loaded")]
    InclusionCycle { path: String },
    #[error("include nesting deeper than {limit} while opening {path}")]
    IncludeTooDeep { path: String, limit: usize },
    #[error("unclosed quote opened at column {column}")]
    UnclosedQuote { column: usize },
    #[error("illegal quote placement at column {column}")]
    IllegalQuotePlacement { column: usize },
    #[error("'{directive}' requires an argument")]
    MissingDirectiveArgument { directive: &'static str },
    #[error("'{directive}' takes a single argument, found extra token '{token}'")]
    UnexpectedDirectiveArgument { directive: &'static str, token: String },
    #[error("cannot begin '{found}' while '{open}' is still open")]
    NestedBlock { open: String, found: String },
    #[error("{}", end_mismatch(.open, .found))]
    UnmatchedOrMismatchedEnd { open: Option<String>, found: String },
    #[error("device block '{open}' is never closed")]
    UnterminatedBlock { open: String },
}

fn end_mismatch(open: &Option<String>, found: &str) -> String {
    match open {
        Some(open) => format!("'end {found}' does not match open block '{open}'"),
        None => format!("'end {found}' without a matching 'begin'"),
    }
}

impl From<TokenError> for ParseError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::UnclosedQuote { column } => ParseError::UnclosedQuote { column },
            TokenError::IllegalQuotePlacement { column } => {
                ParseError::IllegalQuotePlacement { column }
            }
        }
    }
}

/// A flushed error report: the failure, the line it was raised on (absent
/// when the root file itself could not be opened), and the text written to
/// the error sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub error: ParseError,
    pub location: Option<SourceLine>,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Some(line) => write!(
                f,
                "Error! {}:{}: {}\n    {}",
                line.origin_file, line.line_number, line.raw_text, self.message
            ),
            None => write!(f, "Error! {}", self.message),
        }
    }
}

impl std::error::Error for Diagnostic {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}
