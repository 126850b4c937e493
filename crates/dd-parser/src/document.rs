use crate::{Diagnostic, LineResult, ParseError, Parser, ParserConfig};
use anyhow::Context;
use serde::{Deserialize, Serialize};

/// Content lines of one `begin <type>` .. `end <type>` block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceBlock {
    pub device_type: String,
    pub file: String,
    pub line: usize,
    pub params: Vec<Vec<String>>,
}

impl DeviceBlock {
    /// Arguments of the first parameter line whose key is `key`.
    pub fn param(&self, key: &str) -> Option<&[String]> {
        self.params
            .iter()
            .find(|p| p.first().map(String::as_str) == Some(key))
            .and_then(|p| p.get(1..))
    }
}

/// A fully walked DD document, grouped by device block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DdDocument {
    /// Content lines outside any block, in order.
    pub globals: Vec<Vec<String>>,
    pub devices: Vec<DeviceBlock>,
}

impl DdDocument {
    pub fn devices_of_type<'a>(
        &'a self,
        device_type: &'a str,
    ) -> impl Iterator<Item = &'a DeviceBlock> {
        self.devices
            .iter()
            .filter(move |d| d.device_type == device_type)
    }
}

/// Walk a loaded parser to the end of its stream. A block still open at the
/// end is rejected.
pub fn collect(parser: &mut Parser) -> Result<DdDocument, Diagnostic> {
    let mut doc = DdDocument::default();
    let mut open: Option<DeviceBlock> = None;
    loop {
        match parser.next() {
            LineResult::BeginDevice(device_type) => {
                let (file, line) = parser
                    .current_source()
                    .map(|l| (l.origin_file.clone(), l.line_number))
                    .unwrap_or_default();
                open = Some(DeviceBlock {
                    device_type,
                    file,
                    line,
                    params: Vec::new(),
                });
            }
            LineResult::EndDevice(_) => {
                if let Some(block) = open.take() {
                    doc.devices.push(block);
                }
            }
            LineResult::Content(tokens) => match open.as_mut() {
                Some(block) => block.params.push(tokens),
                None => doc.globals.push(tokens),
            },
            LineResult::EndOfStream => {
                if let Some(block) = open {
                    return Err(parser.reject(ParseError::UnterminatedBlock {
                        open: block.device_type,
                    }));
                }
                tracing::debug!(devices = doc.devices.len(), "collected document");
                return Ok(doc);
            }
            LineResult::Error(diagnostic) => return Err(diagnostic),
        }
    }
}

/// Load and collect `path` in one step.
pub fn load_document(path: &str, config: ParserConfig) -> anyhow::Result<DdDocument> {
    let mut parser = Parser::new(config);
    parser
        .load(path)
        .with_context(|| format!("loading device description: {path}"))?;
    let doc = collect(&mut parser)
        .with_context(|| format!("reading device description: {path}"))?;
    Ok(doc)
}
