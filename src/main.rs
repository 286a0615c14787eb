use std::fs;
use std::io::{self, Read};
use std::process;

use anyhow::{Context, Result};
use clap::Parser;
use picc::{compile_with, CodegenOptions};
use tracing::{info, warn, Level};

/// Compile mini-C source into PIC16-style pseudo-assembly.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Source file; reads stdin when omitted
    #[arg(short, long)]
    input: Option<String>,

    /// Listing file; writes stdout when omitted
    #[arg(short, long)]
    output: Option<String>,

    #[arg(long, value_name = "ADDR", default_value = "0x20", value_parser = parse_address)]
    base_address: u16,

    #[arg(long, value_name = "ADDR", default_value = "0x7F", value_parser = parse_address)]
    scratch_address: u16,

    /// Raise log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    let source = match &cli.input {
        Some(path) => {
            fs::read_to_string(path).with_context(|| format!("failed to read input file {path}"))?
        }
        None => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .context("failed to read stdin")?;
            buffer
        }
    };

    let options = CodegenOptions {
        base_address: cli.base_address,
        scratch_address: cli.scratch_address,
    };
    let listing = match compile_with(&source, &options) {
        Ok(listing) => listing,
        Err(err) => {
            eprintln!("{}", err.render(&source));
            process::exit(1);
        }
    };

    if let Some((name, _)) = listing
        .variables
        .iter()
        .find(|(_, address)| *address == u32::from(options.scratch_address))
    {
        warn!(name, "variable shares the scratch address");
    }
    info!(
        lines = listing.lines.len(),
        variables = listing.variables.len(),
        "compiled"
    );

    let mut text = listing.text();
    if !text.is_empty() {
        text.push('\n');
    }
    match &cli.output {
        Some(path) => {
            fs::write(path, text).with_context(|| format!("failed to write output file {path}"))?
        }
        None => print!("{text}"),
    }

    Ok(())
}

fn parse_address(s: &str) -> Result<u16, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => s.parse::<u16>(),
    };
    parsed.map_err(|err| format!("invalid address {s:?}: {err}"))
}
