use crate::parser::INCLUDE;
use crate::tokenizer::tokenize;
use crate::{Diagnostic, ParseError, Parser, SourceLine, Status};
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use tracing::{debug, info};

impl Parser {
    /// Load `path` and every file it transitively includes into the line
    /// buffer. Any earlier state, including a sticky error, is discarded.
    ///
    /// Paths are handed to the file system as written; relative paths are
    /// resolved against the process working directory.
    pub fn load(&mut self, path: impl AsRef<str>) -> Result<(), Diagnostic> {
        self.reset();
        let root = path.as_ref();
        self.load_file(root, 0)?;
        self.cursor = 0;
        self.status = Status::Ok;
        info!(
            root,
            lines = self.lines.len(),
            files = self.files_loaded,
            "loaded device description"
        );
        Ok(())
    }

    /// `depth` is 0 for the root file and grows by one per include.
    fn load_file(&mut self, filename: &str, depth: usize) -> Result<(), Diagnostic> {
        if let Some(diagnostic) = self.halted() {
            return Err(diagnostic);
        }
        let is_inclusion = depth > 0;
        // the include directive that brought us here, if any
        let directive = if is_inclusion {
            self.lines.len().checked_sub(1)
        } else {
            None
        };

        let key = cycle_key(filename);
        if is_inclusion && self.loading.contains(&key) {
            let error = ParseError::InclusionCycle {
                path: filename.to_string(),
            };
            return Err(self.fail(error, directive));
        }

        if depth > self.config.max_include_depth {
            let error = ParseError::IncludeTooDeep {
                path: filename.to_string(),
                limit: self.config.max_include_depth,
            };
            return Err(self.fail(error, directive));
        }

        let file = match File::open(filename) {
            Ok(file) => file,
            Err(e) => {
                let error = ParseError::CannotOpenFile {
                    path: filename.to_string(),
                    reason: e.to_string(),
                };
                return Err(self.fail(error, directive));
            }
        };
        debug!(file = filename, depth, "opened device description");
        self.files_loaded += 1;

        self.loading.insert(key.clone());
        let result = self.read_lines(filename, BufReader::new(file), depth);
        self.loading.remove(&key);
        result
    }

    fn read_lines(
        &mut self,
        filename: &str,
        reader: impl BufRead,
        depth: usize,
    ) -> Result<(), Diagnostic> {
        for (idx, line) in reader.split(b'\n').enumerate() {
            let mut bytes = match line {
                Ok(bytes) => bytes,
                Err(e) => {
                    let error = ParseError::ReadFailed {
                        path: filename.to_string(),
                        reason: e.to_string(),
                    };
                    return Err(self.fail(error, None));
                }
            };
            if bytes.last() == Some(&b'\r') {
                bytes.pop();
            }
            let decoded = String::from_utf8(bytes);
            let raw_text = match &decoded {
                Ok(text) => text.clone(),
                Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
            };
            self.lines.push(SourceLine {
                origin_file: filename.to_string(),
                line_number: idx + 1,
                raw_text,
            });
            let at = Some(self.lines.len() - 1);

            let text = match decoded {
                Ok(text) => text,
                Err(e) => {
                    let error = ParseError::ReadFailed {
                        path: filename.to_string(),
                        reason: e.utf8_error().to_string(),
                    };
                    return Err(self.fail(error, at));
                }
            };
            let tokens = match tokenize(&text) {
                Ok(tokens) => tokens,
                Err(e) => return Err(self.fail(e.into(), at)),
            };
            if tokens.first().map(String::as_str) != Some(INCLUDE) {
                continue;
            }
            let Some(target) = tokens.get(1) else {
                let error = ParseError::MissingDirectiveArgument { directive: INCLUDE };
                return Err(self.fail(error, at));
            };
            if let Some(extra) = tokens.get(2) {
                let error = ParseError::UnexpectedDirectiveArgument {
                    directive: INCLUDE,
                    token: extra.clone(),
                };
                return Err(self.fail(error, at));
            }
            debug!(from = filename, line = idx + 1, path = %target, "include");
            self.load_file(target, depth + 1)?;
        }
        Ok(())
    }
}

/// Identity used for cycle detection: the canonical path when the file
/// exists, otherwise the name as written.
fn cycle_key(filename: &str) -> String {
    fs::canonicalize(filename)
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_else(|_| filename.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporter::tests::SharedBuf;
    use crate::{ErrorSink, LineResult, ParserConfig};
    use std::path::Path;

    fn write(dir: &Path, name: &str, body: &str) -> String {
        let path = dir.join(name);
        std::fs::write(&path, body).unwrap();
        path.to_string_lossy().into_owned()
    }

    fn include(path: &str) -> String {
        format!("include \"{path}\"\n")
    }

    fn parser() -> (Parser, SharedBuf) {
        let buf = SharedBuf::default();
        let parser = Parser::new(ParserConfig {
            error_sink: ErrorSink::Discard,
            ..ParserConfig::default()
        })
        .with_error_sink(buf.clone());
        (parser, buf)
    }

    fn raw(parser: &Parser) -> Vec<&str> {
        parser.lines().iter().map(|l| l.raw_text.as_str()).collect()
    }

    #[test]
    fn test_include_is_spliced_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let leg = write(dir.path(), "leg.dd", "begin motor\nend motor\n");
        let root = write(
            dir.path(),
            "robot.dd",
            &format!("# robot\n{}tail\n", include(&leg)),
        );

        let directive = format!("include \"{leg}\"");

        let (mut p, _) = parser();
        p.load(&root).unwrap();
        assert_eq!(
            raw(&p),
            vec![
                "# robot",
                directive.as_str(),
                "begin motor",
                "end motor",
                "tail"
            ]
        );
        assert_eq!(p.files_loaded(), 2);
        assert_eq!(p.lines()[2].origin_file, leg);
        assert_eq!(p.lines()[2].line_number, 1);
        assert_eq!(p.lines()[4].line_number, 3);
        assert_eq!(p.status(), &Status::Ok);
    }

    #[test]
    fn test_inclusion_cycle_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let root_path = dir.path().join("root.dd");
        let root = root_path.to_string_lossy().into_owned();
        let a = write(dir.path(), "a.dd", &include(&root));
        write(dir.path(), "root.dd", &include(&a));

        let (mut p, buf) = parser();
        let diag = p.load(&root).unwrap_err();
        assert_eq!(diag.error, ParseError::InclusionCycle { path: root.clone() });
        let location = diag.location.unwrap();
        assert_eq!(location.origin_file, a);
        assert_eq!(location.line_number, 1);
        assert!(buf.contents().starts_with("Error! "));
        assert!(p.status().is_error());
    }

    #[test]
    fn test_self_include_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("self.dd").to_string_lossy().into_owned();
        write(dir.path(), "self.dd", &include(&path));

        let (mut p, _) = parser();
        let diag = p.load(&path).unwrap_err();
        assert!(matches!(diag.error, ParseError::InclusionCycle { .. }));
    }

    #[test]
    fn test_diamond_inclusion_is_allowed() {
        let dir = tempfile::tempdir().unwrap();
        let common = write(dir.path(), "common.dd", "bus can0\n");
        let left = write(dir.path(), "left.dd", &include(&common));
        let right = write(dir.path(), "right.dd", &include(&common));
        let root = write(
            dir.path(),
            "root.dd",
            &format!("{}{}", include(&left), include(&right)),
        );

        let (mut p, _) = parser();
        p.load(&root).unwrap();
        let buses = p
            .lines()
            .iter()
            .filter(|l| l.raw_text == "bus can0")
            .count();
        assert_eq!(buses, 2);
        assert_eq!(p.files_loaded(), 5);
    }

    #[test]
    fn test_missing_root_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.dd").to_string_lossy().into_owned();

        let (mut p, buf) = parser();
        let diag = p.load(&path).unwrap_err();
        assert!(matches!(diag.error, ParseError::CannotOpenFile { .. }));
        assert!(diag.location.is_none());
        assert!(buf.contents().contains("nope.dd"));
    }

    #[test]
    fn test_missing_included_file_points_at_directive() {
        let dir = tempfile::tempdir().unwrap();
        let root = write(dir.path(), "root.dd", "x 1\ninclude missing_part.dd\n");

        let (mut p, _) = parser();
        let diag = p.load(&root).unwrap_err();
        assert!(matches!(
            &diag.error,
            ParseError::CannotOpenFile { path, .. } if path == "missing_part.dd"
        ));
        assert_eq!(diag.location.unwrap().line_number, 2);
    }

    #[test]
    fn test_include_argument_count() {
        let dir = tempfile::tempdir().unwrap();
        let bare = write(dir.path(), "bare.dd", "include\n");
        let extra = write(dir.path(), "extra.dd", "include a.dd b.dd\n");

        let (mut p, _) = parser();
        assert_eq!(
            p.load(&bare).unwrap_err().error,
            ParseError::MissingDirectiveArgument { directive: INCLUDE }
        );
        assert_eq!(
            p.load(&extra).unwrap_err().error,
            ParseError::UnexpectedDirectiveArgument {
                directive: INCLUDE,
                token: "b.dd".to_string()
            }
        );
    }

    #[test]
    fn test_token_error_aborts_load_with_context() {
        let dir = tempfile::tempdir().unwrap();
        let child = write(dir.path(), "child.dd", "ok line\nname \"broken\n");
        let root = write(dir.path(), "root.dd", &format!("{}after\n", include(&child)));

        let (mut p, buf) = parser();
        let diag = p.load(&root).unwrap_err();
        assert_eq!(diag.error, ParseError::UnclosedQuote { column: 6 });
        assert_eq!(diag.location.as_ref().unwrap().origin_file, child);
        assert_eq!(diag.location.as_ref().unwrap().line_number, 2);
        assert!(buf
            .contents()
            .contains(&format!("{child}:2: name \"broken")));
        assert!(!raw(&p).contains(&"after"));
    }

    #[test]
    fn test_include_depth_limit() {
        let dir = tempfile::tempdir().unwrap();
        let c = write(dir.path(), "c.dd", "leaf 1\n");
        let b = write(dir.path(), "b.dd", &include(&c));
        let a = write(dir.path(), "a.dd", &include(&b));

        let buf = SharedBuf::default();
        let mut p = Parser::new(ParserConfig {
            max_include_depth: 1,
            ..ParserConfig::default()
        })
        .with_error_sink(buf);
        let diag = p.load(&a).unwrap_err();
        assert_eq!(
            diag.error,
            ParseError::IncludeTooDeep {
                path: c,
                limit: 1
            }
        );
    }

    #[test]
    fn test_reload_clears_error() {
        let dir = tempfile::tempdir().unwrap();
        let bad = write(dir.path(), "bad.dd", "foo\"bar\n");
        let good = write(dir.path(), "good.dd", "foo bar\n");

        let (mut p, _) = parser();
        assert!(p.load(&bad).is_err());
        assert!(p.status().is_error());
        p.load(&good).unwrap();
        assert_eq!(p.status(), &Status::Ok);
        assert_eq!(raw(&p), vec!["foo bar"]);
    }

    #[test]
    fn test_crlf_line_endings() {
        let dir = tempfile::tempdir().unwrap();
        let root = write(dir.path(), "win.dd", "begin motor\r\nend motor\r\n");

        let (mut p, _) = parser();
        p.load(&root).unwrap();
        assert_eq!(raw(&p), vec!["begin motor", "end motor"]);
    }

    #[test]
    fn test_invalid_utf8_blames_its_own_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("root.dd");
        std::fs::write(&path, b"a 1\nb 2\nname \xff\xfe\n").unwrap();
        let root = path.to_string_lossy().into_owned();

        let (mut p, buf) = parser();
        let diag = p.load(&root).unwrap_err();
        assert!(matches!(diag.error, ParseError::ReadFailed { .. }));
        let location = diag.location.unwrap();
        assert_eq!(location.origin_file, root);
        assert_eq!(location.line_number, 3);
        assert!(location.raw_text.starts_with("name "));
        assert!(buf.contents().contains(&format!("{root}:3: name ")));
    }

    #[test]
    fn test_cycle_reported_before_depth_limit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("self.dd").to_string_lossy().into_owned();
        write(dir.path(), "self.dd", &include(&path));

        let buf = SharedBuf::default();
        let mut p = Parser::new(ParserConfig {
            max_include_depth: 0,
            ..ParserConfig::default()
        })
        .with_error_sink(buf);
        let diag = p.load(&path).unwrap_err();
        assert_eq!(diag.error, ParseError::InclusionCycle { path });
    }

    #[test]
    fn test_failed_load_blocks_consumption() {
        let dir = tempfile::tempdir().unwrap();
        let root_path = dir.path().join("root.dd");
        let root = root_path.to_string_lossy().into_owned();
        let a = write(dir.path(), "a.dd", &format!("begin motor\n{}", include(&root)));
        write(dir.path(), "root.dd", &format!("bus can0\n{}", include(&a)));

        let (mut p, buf) = parser();
        let diag = p.load(&root).unwrap_err();
        let lines = p.lines().to_vec();
        let cursor = p.cursor;
        for _ in 0..3 {
            assert_eq!(p.next(), LineResult::Error(diag.clone()));
            assert_eq!(p.current(), Err(diag.clone()));
            assert_eq!(p.lines(), lines.as_slice());
            assert_eq!(p.cursor, cursor);
            assert_eq!(p.open_block(), None);
        }
        assert_eq!(buf.contents().matches("Error!").count(), 1);
    }
}
