use serde::{Deserialize, Serialize};

/// One physical line of a DD document, as read from disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLine {
    pub origin_file: String,
    /// 1-based line number within `origin_file`.
    pub line_number: usize,
    pub raw_text: String,
}

/// Signal returned by [`crate::Parser::next`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineResult {
    BeginDevice(String),
    EndDevice(String),
    Content(Vec<String>),
    EndOfStream,
    Error(crate::Diagnostic),
}

/// Outcome of the last parser operation. `Error` is terminal until the next
/// [`crate::Parser::load`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Status {
    #[default]
    Ok,
    BeginDevice,
    EndDevice,
    EndOfStream,
    Error(crate::Diagnostic),
}

impl Status {
    pub fn is_error(&self) -> bool {
        matches!(self, Status::Error(_))
    }
}
