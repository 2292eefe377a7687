//! Sleipnir Command-Line Interface
//!
//! Reads an OPENQASM 2.0 program, maps it onto a hardware topology, and
//! emits the rewritten hardware-level source.

use std::fs;

use anyhow::{Context, Result, bail};
use clap::Parser;
use console::style;
use tracing_subscriber::EnvFilter;

use sleipnir_compile::{
    AllocConfig, AllocatorKind, ArchGraph, OperationKind, QModule, compile,
};

/// Map OPENQASM 2.0 programs onto hardware qubit topologies.
#[derive(Parser)]
#[command(name = "sleipnir")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input QASM file.
    input: String,

    /// Output file (defaults to stdout).
    #[arg(short, long)]
    output: Option<String>,

    /// Target architecture: `linear:<n>`, `ring:<n>`, or a file with a
    /// `<reg> <n>` header line followed by one directed `u v` edge per
    /// line.
    #[arg(short, long, default_value = "linear:5")]
    arch: String,

    /// Gate names the inliner must not expand.
    #[arg(short, long, value_delimiter = ',')]
    basis: Vec<String>,

    /// Skip gate inlining entirely.
    #[arg(long)]
    no_inline: bool,

    /// Cost charged per reversal CNOT.
    #[arg(long, default_value_t = 4)]
    rev_cost: u32,

    /// Cost charged per long CNOT.
    #[arg(long, default_value_t = 10)]
    lcnot_cost: u32,

    /// Emit compact single-line source.
    #[arg(long)]
    compact: bool,

    /// Print a JSON solution summary to stderr.
    #[arg(long)]
    stats: bool,

    /// Increase verbosity (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let source = fs::read_to_string(&cli.input)
        .with_context(|| format!("Failed to read input file: {}", cli.input))?;
    let arch = load_arch(&cli.arch)?;

    println!(
        "{} Compiling {} for {} ({} hardware qubits)",
        style("→").cyan().bold(),
        style(&cli.input).green(),
        style(&cli.arch).yellow(),
        arch.num_qubits()
    );

    let mut module = QModule::from_source(&source)?;
    let config = AllocConfig {
        rev_cost: cli.rev_cost,
        lcnot_cost: cli.lcnot_cost,
        ..AllocConfig::default()
    };
    let basis = if cli.no_inline {
        None
    } else {
        Some(cli.basis.as_slice())
    };

    let solution = compile(&mut module, &arch, AllocatorKind::Simple, basis, &config)?;

    let (mut cnots, mut revs, mut lcnots) = (0usize, 0usize, 0usize);
    for op in solution.ops.iter().flat_map(|(_, ops)| ops) {
        match op.kind {
            OperationKind::Cnot => cnots += 1,
            OperationKind::Rev => revs += 1,
            OperationKind::Lcnot => lcnots += 1,
        }
    }
    println!(
        "{} Allocation complete: cost {} ({} plain, {} reversed, {} long)",
        style("✓").green().bold(),
        style(solution.cost).bold(),
        cnots,
        revs,
        lcnots
    );

    if cli.stats {
        let summary = serde_json::json!({
            "cost": solution.cost,
            "dependencies": solution.ops.len(),
            "cnot": cnots,
            "rev": revs,
            "lcnot": lcnots,
            "initial_mapping": solution.initial_mapping,
        });
        eprintln!("{}", serde_json::to_string_pretty(&summary)?);
    }

    let emitted = module.to_source(!cli.compact, true);
    match &cli.output {
        Some(path) => {
            fs::write(path, emitted)
                .with_context(|| format!("Failed to write output file: {path}"))?;
            println!("  Output: {}", style(path).green());
        }
        None => print!("{emitted}"),
    }

    Ok(())
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn load_arch(spec: &str) -> Result<ArchGraph> {
    if let Some(n) = spec.strip_prefix("linear:") {
        let n: u32 = n.parse().context("invalid linear architecture size")?;
        return Ok(ArchGraph::linear(n));
    }
    if let Some(n) = spec.strip_prefix("ring:") {
        let n: u32 = n.parse().context("invalid ring architecture size")?;
        return Ok(ArchGraph::ring(n));
    }

    let text = fs::read_to_string(spec)
        .with_context(|| format!("Failed to read architecture file: {spec}"))?;
    let mut lines = text.lines().filter(|line| !line.trim().is_empty());

    let header = lines.next().context("empty architecture file")?;
    let mut parts = header.split_whitespace();
    let (Some(reg), Some(n)) = (parts.next(), parts.next()) else {
        bail!("architecture header must be '<reg> <num_qubits>'");
    };
    let n: u32 = n.parse().context("invalid qubit count in header")?;

    let mut arch = ArchGraph::new(reg, n);
    for line in lines {
        let mut parts = line.split_whitespace();
        let (Some(from), Some(to)) = (parts.next(), parts.next()) else {
            bail!("architecture edge must be '<from> <to>', got '{line}'");
        };
        arch.add_edge(from.parse()?, to.parse()?);
    }
    Ok(arch)
}
