//! xpd - expand macro calls to their definitions
//!
//! Usage:
//!   xpd input.txt -o output.txt
//!   cat input.txt | xpd
//!   xpd --debug-matched input.txt

use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use xpd::driver::write_lexemes;
use xpd::{Config, FileReader, Processor, Redefinition, config};

#[derive(Parser)]
#[command(name = "xpd")]
#[command(about = "Expand macro calls to their definitions")]
#[command(version)]
struct Cli {
    /// Input file (default: standard input)
    file: Option<PathBuf>,

    /// Store output in this file (default: standard output)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Maximum include nesting
    #[arg(long, default_value_t = config::DEFAULT_MAX_INCLUDE_DEPTH)]
    max_include_depth: usize,

    /// Maximum number of nested macro expansions
    #[arg(long, default_value_t = config::DEFAULT_MAX_EXPANSION_DEPTH)]
    max_expansion_depth: usize,

    /// Let a later definition replace an earlier one instead of failing
    #[arg(long)]
    allow_redefinition: bool,

    /// Output the lexemes of each input line instead of expanding
    #[arg(long, conflicts_with = "debug_matched")]
    debug_tokenize: bool,

    /// Output the document after matching include and define, without expanding
    #[arg(long)]
    debug_matched: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    let config = Config::new()
        .with_max_include_depth(cli.max_include_depth)
        .with_max_expansion_depth(cli.max_expansion_depth)
        .with_redefinition(if cli.allow_redefinition {
            Redefinition::Replace
        } else {
            Redefinition::Reject
        });
    let mut processor = Processor::with_config(FileReader, config);

    let mut out: Box<dyn Write> = match &cli.output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("cannot create {}", path.display()))?,
        )),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };

    let (name, source) = match &cli.file {
        Some(path) => (path.as_path(), None),
        None => {
            let mut source = String::new();
            io::stdin()
                .read_to_string(&mut source)
                .context("cannot read standard input")?;
            (Path::new("<stdin>"), Some(source))
        }
    };

    if cli.debug_tokenize || cli.debug_matched {
        let source = match source {
            Some(source) => source,
            None => fs::read_to_string(name)
                .with_context(|| format!("cannot read {}", name.display()))?,
        };
        if cli.debug_tokenize {
            write_lexemes(name, &source, &mut out)?;
        } else {
            processor.write_matched(name, &source, &mut out)?;
        }
        return Ok(());
    }

    match source {
        Some(source) => processor.run_source(name, &source, &mut out)?,
        None => processor.run(name, &mut out)?,
    }

    Ok(())
}
