use crate::{Diagnostic, ErrorSink, ParseError, SourceLine};
use std::fmt::Write as _;
use std::io::{self, Write};

/// Accumulates an error message and flushes it, with line context, to the
/// configured sink.
pub struct ErrorReporter {
    sink: Box<dyn Write + Send>,
    pending: String,
}

impl ErrorReporter {
    pub fn new(sink: ErrorSink) -> Self {
        let sink: Box<dyn Write + Send> = match sink {
            ErrorSink::Stderr => Box::new(io::stderr()),
            ErrorSink::Discard => Box::new(io::sink()),
        };
        Self::with_writer(sink)
    }

    pub fn with_writer(sink: Box<dyn Write + Send>) -> Self {
        Self {
            sink,
            pending: String::new(),
        }
    }

    /// Append a fragment to the message under construction.
    pub fn report(&mut self, fragment: impl std::fmt::Display) {
        let _ = write!(self.pending, "{fragment}");
    }

    /// Format the pending message against `location`, write it to the sink
    /// and clear the accumulator.
    pub fn flush(&mut self, error: ParseError, location: Option<&SourceLine>) -> Diagnostic {
        let diagnostic = Diagnostic {
            error,
            location: location.cloned(),
            message: std::mem::take(&mut self.pending),
        };
        if let Err(e) = writeln!(self.sink, "{diagnostic}").and_then(|()| self.sink.flush()) {
            tracing::warn!(error = %e, "failed to write parser diagnostic");
        }
        diagnostic
    }
}

impl std::fmt::Debug for ErrorReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErrorReporter")
            .field("pending", &self.pending)
            .finish_non_exhaustive()
    }
}
