use clap::Parser;
use std::path::PathBuf;

use jsfxpp::pass::PassId;
use jsfxpp::pipeline::{compute_provenance, run_pipeline, BANNER};

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum EmitStage {
    /// Fully preprocessed JSFX, with banner
    Jsfx,
    /// Text after range expansion
    Sequences,
    /// Text after enum allocation
    Enums,
    /// Symbol tables as JSON
    Symbols,
    /// Source hash and version as JSON
    BuildInfo,
}

impl EmitStage {
    fn terminal_pass(self) -> Option<PassId> {
        match self {
            EmitStage::Jsfx | EmitStage::Symbols => Some(PassId::SynthesizeDispatch),
            EmitStage::Sequences => Some(PassId::ExpandSequences),
            EmitStage::Enums => Some(PassId::AllocateEnums),
            EmitStage::BuildInfo => None,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "jsfxpp",
    version,
    about = "JSFX Pre-Processor — expands range templates, enums and function dispatch"
)]
struct Cli {
    /// Input source file
    input: PathBuf,

    /// Output file path
    output: PathBuf,

    /// Output stage
    #[arg(long, value_enum, default_value_t = EmitStage::Jsfx)]
    emit: EmitStage,

    /// Do not prefix the output with the generator banner
    #[arg(long)]
    no_banner: bool,

    /// Treat warnings as errors
    #[arg(long)]
    deny_warnings: bool,

    /// Log passes and timing to stderr
    #[arg(long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!(
        input = %cli.input.display(),
        output = %cli.output.display(),
        emit = ?cli.emit,
        "jsfxpp starting"
    );

    // ── Read source ──
    let source = match std::fs::read_to_string(&cli.input) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("jsfxpp: error: {}: {}", cli.input.display(), e);
            std::process::exit(2);
        }
    };

    // ── Preprocess ──
    let rendered = match cli.emit.terminal_pass() {
        None => compute_provenance(&source).to_json(),
        Some(terminal) => {
            let result = match run_pipeline(&source, terminal) {
                Ok(r) => r,
                Err(e) => {
                    eprintln!("jsfxpp: {}", e.error.to_diagnostic());
                    tracing::debug!(pass = %e.failing_pass, "pipeline aborted");
                    std::process::exit(1);
                }
            };
            for warning in &result.warnings {
                eprintln!("jsfxpp: {}", warning);
            }
            if cli.deny_warnings && !result.warnings.is_empty() {
                eprintln!(
                    "jsfxpp: {} warning(s) treated as errors",
                    result.warnings.len()
                );
                std::process::exit(1);
            }
            match cli.emit {
                EmitStage::Symbols => result.symbols().to_json(),
                EmitStage::Jsfx if !cli.no_banner => Ok(format!("{}\n{}", BANNER, result.output)),
                _ => Ok(result.output),
            }
        }
    };
    let rendered = match rendered {
        Ok(text) => text,
        Err(e) => {
            eprintln!("jsfxpp: error: cannot serialize output: {}", e);
            std::process::exit(2);
        }
    };

    // ── Write output ──
    if let Err(e) = std::fs::write(&cli.output, rendered) {
        eprintln!("jsfxpp: error: {}: {}", cli.output.display(), e);
        std::process::exit(2);
    }
    tracing::debug!(output = %cli.output.display(), "written");
}
