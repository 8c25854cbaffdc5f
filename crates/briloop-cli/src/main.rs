//! `briloop`: reads a Bril JSON program, reconstructs structured control
//! flow, and writes the Briloop JSON dialect.

use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;

use briloop_core::bril::parse_program;
use briloop_core::emit::emit_module;
use briloop_core::ir::{structured, StructuredModule};
use briloop_core::structurize::reconstruct;

#[derive(Parser)]
#[command(
    name = "briloop",
    about = "Reconstructs structured control flow for Bril programs",
    version
)]
struct Args {
    /// Input Bril JSON file; reads stdin when omitted.
    input: Option<PathBuf>,

    /// Output file; writes stdout when omitted.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Skip functions that fail to reconstruct (irreducible control flow)
    /// instead of aborting, reporting each on stderr.
    #[arg(long)]
    keep_going: bool,

    /// Pretty-print the output JSON.
    #[arg(long)]
    pretty: bool,

    /// Dump the parsed block-level IR to stderr before reconstructing.
    #[arg(long)]
    dump_ir: bool,
}

fn main() -> ExitCode {
    match run(Args::parse()) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("briloop: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> anyhow::Result<ExitCode> {
    let text = match &args.input {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?,
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("reading stdin")?;
            buf
        }
    };

    let module = parse_program(&text).context("parsing Bril program")?;
    if args.dump_ir {
        for func in module.functions.values() {
            eprintln!("{func}");
        }
    }

    let mut skipped = 0usize;
    let mut reconstructed = StructuredModule::default();
    for func in module.functions.values() {
        match reconstruct(func) {
            Ok(structured_func) => {
                // A failure here is a bug in the reconstruction, not bad input.
                structured::verify(&structured_func)
                    .with_context(|| format!("verifying function @{}", func.name))?;
                reconstructed.functions.push(structured_func);
            }
            Err(err) if args.keep_going => {
                eprintln!("briloop: skipping @{}: {err}", func.name);
                skipped += 1;
            }
            Err(err) => {
                return Err(err).with_context(|| format!("reconstructing @{}", func.name));
            }
        }
    }

    let emitted = emit_module(&reconstructed);
    let rendered = if args.pretty {
        let mut s = serde_json::to_string_pretty(&emitted).context("rendering output")?;
        s.push('\n');
        s
    } else {
        let mut s = emitted.to_string();
        s.push('\n');
        s
    };

    match &args.output {
        Some(path) => fs::write(path, rendered)
            .with_context(|| format!("writing {}", path.display()))?,
        None => {
            io::stdout()
                .write_all(rendered.as_bytes())
                .context("writing stdout")?;
        }
    }

    Ok(if skipped > 0 {
        // Partial output still signals the failure to scripted callers.
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}
