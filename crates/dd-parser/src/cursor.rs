use crate::parser::{BEGIN, END, INCLUDE};
use crate::tokenizer::tokenize;
use crate::{Diagnostic, LineResult, ParseError, Parser, SourceLine, Status};
use tracing::trace;

impl Parser {
    /// Advance to the next non-blank line and classify it.
    ///
    /// `begin <type>` and `end <type>` drive the block state machine; blocks
    /// do not nest and `end` must name the open block. Every other line is
    /// returned as `Content`. Once an error has been returned, every later
    /// call returns the same error without consuming input.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> LineResult {
        if let Some(diagnostic) = self.halted() {
            return LineResult::Error(diagnostic);
        }
        while self.cursor < self.lines.len() {
            let at = self.cursor;
            self.cursor += 1;
            let tokens = match self.lines.get(at).map(|line| tokenize(&line.raw_text)) {
                Some(Ok(tokens)) => tokens,
                Some(Err(e)) => return LineResult::Error(self.fail(e.into(), Some(at))),
                None => break,
            };
            if !self.is_visible(&tokens) {
                continue;
            }
            return self.classify(tokens, at);
        }
        trace!("end of stream");
        self.status = Status::EndOfStream;
        LineResult::EndOfStream
    }

    /// Tokens of the line most recently returned by [`Parser::next`],
    /// re-derived by scanning back from the cursor.
    pub fn current(&self) -> Result<Option<Vec<String>>, Diagnostic> {
        if let Some(diagnostic) = self.halted() {
            return Err(diagnostic);
        }
        Ok(self.previous_visible().map(|(_, tokens)| tokens))
    }

    /// Source position of the line most recently returned by `next`.
    pub fn current_source(&self) -> Option<&SourceLine> {
        self.previous_visible()
            .and_then(|(idx, _)| self.lines.get(idx))
    }

    pub(crate) fn previous_visible(&self) -> Option<(usize, Vec<String>)> {
        self.lines
            .iter()
            .enumerate()
            .take(self.cursor)
            .rev()
            .find_map(|(idx, line)| {
                let tokens = tokenize(&line.raw_text).ok()?;
                self.is_visible(&tokens).then_some((idx, tokens))
            })
    }

    fn is_visible(&self, tokens: &[String]) -> bool {
        match tokens.first() {
            None => false,
            Some(first) => self.config.surface_include_directives || first != INCLUDE,
        }
    }

    fn classify(&mut self, tokens: Vec<String>, at: usize) -> LineResult {
        match tokens.first().map(String::as_str) {
            Some(BEGIN) => {
                if let Some(open) = &self.block {
                    let error = ParseError::NestedBlock {
                        open: open.clone(),
                        found: tokens.get(1).cloned().unwrap_or_default(),
                    };
                    return LineResult::Error(self.fail(error, Some(at)));
                }
                let Some(device_type) = tokens.get(1).cloned() else {
                    let error = ParseError::MissingDirectiveArgument { directive: BEGIN };
                    return LineResult::Error(self.fail(error, Some(at)));
                };
                trace!(device_type = %device_type, "begin device");
                self.block = Some(device_type.clone());
                self.status = Status::BeginDevice;
                LineResult::BeginDevice(device_type)
            }
            Some(END) => {
                let Some(device_type) = tokens.get(1).cloned() else {
                    let error = ParseError::MissingDirectiveArgument { directive: END };
                    return LineResult::Error(self.fail(error, Some(at)));
                };
                if self.block.as_deref() != Some(device_type.as_str()) {
                    let error = ParseError::UnmatchedOrMismatchedEnd {
                        open: self.block.clone(),
                        found: device_type,
                    };
                    return LineResult::Error(self.fail(error, Some(at)));
                }
                trace!(device_type = %device_type, "end device");
                self.block = None;
                self.status = Status::EndDevice;
                LineResult::EndDevice(device_type)
            }
            _ => {
                self.status = Status::Ok;
                LineResult::Content(tokens)
            }
        }
    }
}
