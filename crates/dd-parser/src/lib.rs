//! dd-parser: reader for the device description (DD) language
//!
//! A DD document lists the devices of a robot (CAN joints, sensors,
//! controllers) as `begin <type>` .. `end <type>` blocks of whitespace
//! separated parameter lines, and may splice in other files with
//! `include <path>`. The parser flattens the includes, checks the block
//! structure and hands content lines to the caller; it knows nothing about
//! what any device type means.

mod types;
pub use types::{LineResult, SourceLine, Status};

mod error;
pub use error::{Diagnostic, ParseError, Result, TokenError};

mod config;
pub use config::{ErrorSink, ParserConfig};

pub mod trim;

mod tokenizer;
pub use tokenizer::{join_tokens, tokenize};

mod reporter;
pub use reporter::ErrorReporter;

mod parser;
pub use parser::{Parser, BEGIN, END, INCLUDE};

mod loader;
mod cursor;

mod document;
pub use document::{collect, load_document, DdDocument, DeviceBlock};
