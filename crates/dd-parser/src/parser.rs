use crate::reporter::ErrorReporter;
use crate::{Diagnostic, ParseError, ParserConfig, SourceLine, Status};
use std::collections::HashSet;
use std::io::Write;

pub const INCLUDE: &str = "include";
pub const BEGIN: &str = "begin";
pub const END: &str = "end";

/// Parser for one DD document: a root file plus everything it includes.
///
/// [`Parser::load`] flattens all files into a single line buffer and checks
/// every line up front. The buffer is then walked with [`Parser::next`].
/// The first fatal error is written to the error sink and leaves the parser
/// in [`Status::Error`] until the next `load`.
#[derive(Debug)]
pub struct Parser {
    pub(crate) config: ParserConfig,
    pub(crate) lines: Vec<SourceLine>,
    /// Cycle keys of the files on the active include chain.
    pub(crate) loading: HashSet<String>,
    pub(crate) files_loaded: usize,
    /// Index of the next line `next` will look at.
    pub(crate) cursor: usize,
    pub(crate) block: Option<String>,
    pub(crate) status: Status,
    pub(crate) reporter: ErrorReporter,
}

impl Default for Parser {
    fn default() -> Self {
        Self::new(ParserConfig::default())
    }
}

impl Parser {
    pub fn new(config: ParserConfig) -> Self {
        Self {
            reporter: ErrorReporter::new(config.error_sink),
            config,
            lines: Vec::new(),
            loading: HashSet::new(),
            files_loaded: 0,
            cursor: 0,
            block: None,
            status: Status::Ok,
        }
    }

    /// Replace the configured error sink with an arbitrary writer.
    pub fn with_error_sink(mut self, sink: impl Write + Send + 'static) -> Self {
        self.reporter = ErrorReporter::with_writer(Box::new(sink));
        self
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    pub fn status(&self) -> &Status {
        &self.status
    }

    /// Device type of the currently open block, if any.
    pub fn open_block(&self) -> Option<&str> {
        self.block.as_deref()
    }

    /// The flattened line buffer, in consumption order.
    pub fn lines(&self) -> &[SourceLine] {
        &self.lines
    }

    /// Number of files opened by the last `load`, counting repeats.
    pub fn files_loaded(&self) -> usize {
        self.files_loaded
    }

    /// Report a failure detected by the consumer against the line most
    /// recently returned by `next`, and enter the error state.
    pub fn reject(&mut self, error: ParseError) -> Diagnostic {
        if let Some(diagnostic) = self.halted() {
            return diagnostic;
        }
        let at = self.previous_visible().map(|(idx, _)| idx);
        self.fail(error, at)
    }

    pub(crate) fn halted(&self) -> Option<Diagnostic> {
        match &self.status {
            Status::Error(diagnostic) => Some(diagnostic.clone()),
            _ => None,
        }
    }

    /// Route a fatal error through the reporter; the parser stays in
    /// `Status::Error` afterwards.
    pub(crate) fn fail(&mut self, error: ParseError, at: Option<usize>) -> Diagnostic {
        self.reporter.report(&error);
        let location = at.and_then(|idx| self.lines.get(idx));
        let diagnostic = self.reporter.flush(error, location);
        tracing::debug!(error = %diagnostic.error, "parser entered error state");
        self.status = Status::Error(diagnostic.clone());
        diagnostic
    }

    pub(crate) fn reset(&mut self) {
        self.lines.clear();
        self.loading.clear();
        self.files_loaded = 0;
        self.cursor = 0;
        self.block = None;
        self.status = Status::Ok;
    }
}
