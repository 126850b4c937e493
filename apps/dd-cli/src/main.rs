use anyhow::{Context, Result};
use clap::{ArgAction, Parser as ClapParser, Subcommand};
use dd_parser::{self as dd, LineResult, Parser, ParserConfig};
use tracing::info;

#[derive(ClapParser, Debug)]
#[command(
    name = "ddtool",
    version,
    about = "Device description (DD) file tool",
    disable_help_subcommand = true
)]
struct Cli {
    /// Parser config file (JSON); defaults apply when absent
    #[arg(long, global = true)]
    config: Option<String>,

    /// Skip `include` lines instead of reporting them as content
    #[arg(long, action = ArgAction::SetTrue, global = true)]
    hide_includes: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Load a DD file and check its structure
    Check {
        /// Root DD file
        file: String,
    },
    /// Print the devices declared by a DD file
    Dump {
        /// Root DD file
        file: String,
        /// Emit JSON instead of text
        #[arg(long, action = ArgAction::SetTrue)]
        json: bool,
    },
    /// Print every parser signal for a DD file
    Walk {
        /// Root DD file
        file: String,
    },
    /// Tokenize a single line
    Tokens {
        /// Line text
        text: String,
    },
}

fn main() -> Result<()> {
    setup_tracing();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => ParserConfig::load(path)?,
        None => ParserConfig::default(),
    };
    if cli.hide_includes {
        config.surface_include_directives = false;
    }

    match cli.command {
        Commands::Check { file } => dd_check(&file, config),
        Commands::Dump { file, json } => dd_dump(&file, config, json),
        Commands::Walk { file } => dd_walk(&file, config),
        Commands::Tokens { text } => dd_tokens(&text),
    }
}

fn setup_tracing() {
    // Best-effort; avoid panics if already set
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init();
}

// Keeps the diagnostic as the cause so it survives a discarding error sink.
fn rejected(file: &str, diagnostic: dd::Diagnostic) -> anyhow::Error {
    anyhow::Error::new(diagnostic).context(format!("device description rejected: {file}"))
}

fn open(file: &str, config: ParserConfig) -> Result<Parser> {
    let mut parser = Parser::new(config);
    parser.load(file).map_err(|d| rejected(file, d))?;
    Ok(parser)
}

fn dd_check(file: &str, config: ParserConfig) -> Result<()> {
    let mut parser = open(file, config)?;
    let doc = dd::collect(&mut parser).map_err(|d| rejected(file, d))?;
    info!(file, devices = doc.devices.len(), "check passed");
    println!(
        "ok: {} devices ({} lines, {} files)",
        doc.devices.len(),
        parser.lines().len(),
        parser.files_loaded()
    );
    Ok(())
}

fn dd_dump(file: &str, config: ParserConfig, json: bool) -> Result<()> {
    let mut parser = open(file, config)?;
    let doc = dd::collect(&mut parser).map_err(|d| rejected(file, d))?;
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&doc).context("serializing document")?
        );
        return Ok(());
    }
    for tokens in &doc.globals {
        println!("{}", dd::join_tokens(tokens));
    }
    for device in &doc.devices {
        println!("{}\t{}:{}", device.device_type, device.file, device.line);
        for param in &device.params {
            println!("\t{}", dd::join_tokens(param));
        }
    }
    Ok(())
}

fn dd_walk(file: &str, config: ParserConfig) -> Result<()> {
    let mut parser = open(file, config)?;
    loop {
        match parser.next() {
            LineResult::BeginDevice(device_type) => println!("begin\t{device_type}"),
            LineResult::EndDevice(device_type) => println!("end\t{device_type}"),
            LineResult::Content(tokens) => println!("content\t{}", dd::join_tokens(&tokens)),
            LineResult::EndOfStream => {
                println!("eos");
                return Ok(());
            }
            LineResult::Error(d) => return Err(rejected(file, d)),
        }
    }
}

fn dd_tokens(text: &str) -> Result<()> {
    let tokens = dd::tokenize(text).with_context(|| format!("tokenizing: {text}"))?;
    for (i, token) in tokens.iter().enumerate() {
        println!("{i}\t{token}");
    }
    Ok(())
}
