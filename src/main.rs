//! QULOG - compiler from a Prolog subset to annealer-ready Verilog
//!
//! The driver wires the pipeline together: parse, preprocess, infer types,
//! and emit Verilog. It is also the single recovery boundary for user
//! errors, which print as `file:line:column: message`.

use anyhow::{Context, Result};
use clap::Parser;
use qulog_codegen::verilog::write_verilog;
use qulog_frontend::error::CompileError;
use qulog_frontend::preprocess::{self, Config};
use qulog_frontend::{parser, typeinf};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use tracing::info;

const PROG_NAME: &str = "qulog";

/// Compile a restricted Prolog subset to Verilog for quantum annealers
#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Prolog source file; omit to read standard input
    input: Option<PathBuf>,

    /// Minimum integer width in bits
    #[arg(long, default_value_t = 0)]
    int_bits: u32,

    /// Verilog output file, or "-" for standard output
    #[arg(short, long, default_value = "-")]
    output: String,

    /// Seed for instance-name generation, for reproducible builds
    #[arg(long)]
    seed: Option<u64>,

    /// Write the parsed AST as JSON to the given file
    #[arg(long)]
    dump_ast: Option<PathBuf>,

    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt().with_env_filter(log_level).init();

    let in_file_name = match &cli.input {
        Some(path) => path.display().to_string(),
        None => "<stdin>".to_string(),
    };

    if let Err(err) = run(&cli, &in_file_name) {
        match err.downcast_ref::<CompileError>() {
            Some(compile_err) => match compile_err.span() {
                Some(span) => eprintln!(
                    "{}:{}:{}: {}",
                    in_file_name, span.line, span.column, compile_err
                ),
                None => eprintln!("{}: {}", PROG_NAME, compile_err),
            },
            None => eprintln!("{}: {:#}", PROG_NAME, err),
        }
        std::process::exit(1);
    }
}

fn run(cli: &Cli, in_file_name: &str) -> Result<()> {
    let source = match &cli.input {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read standard input")?;
            buf
        }
    };

    let ast = parser::parse(&source)?;
    if let Some(path) = &cli.dump_ast {
        let file = fs::File::create(path)
            .with_context(|| format!("failed to create {}", path.display()))?;
        serde_json::to_writer_pretty(file, &ast).context("failed to serialize the AST")?;
    }

    let config = Config {
        prog_name: PROG_NAME.to_string(),
        in_file_name: in_file_name.to_string(),
        int_bits: cli.int_bits,
    };
    let analysis = preprocess::preprocess(&ast, &config)?;
    let typing = typeinf::infer(&analysis)?;

    let mut rng = match cli.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    info!(output = %cli.output, "writing Verilog");
    if cli.output == "-" {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        write_verilog(&mut out, &config, &analysis, &typing, &mut rng)?;
        out.flush().context("failed to write Verilog output")?;
    } else {
        let file = fs::File::create(&cli.output)
            .with_context(|| format!("failed to create {}", cli.output))?;
        let mut out = io::BufWriter::new(file);
        write_verilog(&mut out, &config, &analysis, &typing, &mut rng)?;
        out.flush().context("failed to write Verilog output")?;
    }
    Ok(())
}
