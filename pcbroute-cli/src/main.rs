#![warn(
    clippy::all,
    future_incompatible,
    rust_2018_idioms,
    unused_import_braces,
    unused_lifetimes,
    unused_qualifications
)]
#![allow(clippy::cast_lossless, clippy::cast_possible_truncation, clippy::cast_sign_loss)]

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use eyre::Result;
use log::{info, warn};
use pcbroute::board::{Board, Item};
use pcbroute::io::{BoardReader, BoardWriter, JsonBoardReader, JsonBoardWriter};
use pcbroute::route::{batch_route, Config, ConnectionStatus, StopToken};

/// PCB autorouter engine CLI (§6's external CLI contract). Reads the
/// crate's internal JSON board format, runs the batch pass controller, and
/// writes the routed board back out.
#[derive(Debug, clap::Parser)]
#[clap(name = "pcbroute", about = "PCB autorouter engine")]
struct Args {
    /// Input board file, the internal JSON format (see `pcbroute::io`).
    input: PathBuf,

    #[clap(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    #[clap(long, default_value_t = 10)]
    passes: u32,

    /// 0 selects automatically. The engine is single-threaded (§5); this
    /// flag is accepted for the external contract's sake and otherwise
    /// unused.
    #[clap(long, default_value_t = 0)]
    threads: u32,

    #[clap(long, value_name = "SECONDS")]
    time_limit: Option<f64>,

    /// Accepted for compatibility with the external contract; the
    /// pull-tight optimization pass it would disable is not implemented.
    #[clap(long)]
    no_optimize: bool,

    #[clap(long)]
    drc: bool,
    #[clap(long, conflicts_with = "drc")]
    no_drc: bool,

    /// Route but don't write the output file.
    #[clap(long)]
    dry_run: bool,

    #[clap(short, long, parse(from_occurrences))]
    verbose: u8,

    /// Heatmap rendering is not implemented (§10.4); accepted so scripts
    /// built against the external contract don't fail argument parsing.
    #[clap(long, value_name = "PATH")]
    heatmap: Option<PathBuf>,
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    if std::env::var_os("RUST_LOG").is_none() {
        std::env::set_var("RUST_LOG", format!("pcbroute={level},pcbroute_cli={level}"));
    }
    pretty_env_logger::init_timed();
}

fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(a) => a,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::from(64);
        }
    };
    init_logging(args.verbose);
    let _ = color_eyre::install();

    match run(&args) {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            log::error!("{err:?}");
            ExitCode::from(70)
        }
    }
}

fn run(args: &Args) -> Result<u8> {
    if args.threads != 0 {
        info!("--threads {} requested; routing runs single-threaded regardless (§5)", args.threads);
    }
    if args.heatmap.is_some() {
        warn!("heatmap rendering is not implemented; ignoring --heatmap");
    }
    if args.no_optimize {
        info!("--no-optimize has no effect: pull-tight optimization is not implemented");
    }

    let board_reader = JsonBoardReader::new(&args.input);
    let mut board = board_reader.read()?;

    let config = Config {
        max_passes: args.passes,
        time_limit: args.time_limit.filter(|&s| s > 0.0).map(Duration::from_secs_f64),
        ..Config::default()
    };
    let stop = StopToken::new();
    info!("routing {} with up to {} pass(es)", args.input.display(), config.max_passes);
    let report = batch_route(&mut board, &config, &stop);

    for result in &report.results {
        match result.status {
            ConnectionStatus::Routed => info!("routed net {} ({} -> {})", result.net, result.from_item, result.to_item),
            ConnectionStatus::NotRouted | ConnectionStatus::Failed => {
                warn!("unrouted net {} ({} -> {})", result.net, result.from_item, result.to_item);
            }
            ConnectionStatus::Stopped | ConnectionStatus::TimedOut => {
                warn!("cancelled net {} ({} -> {})", result.net, result.from_item, result.to_item);
            }
        }
    }
    info!("{} pass(es) run, {} connection(s) routed, {} air wire(s) remaining", report.passes_run, report.routed_count(), report.air_wires.len());

    if !args.no_drc {
        let violations = check_drc(&board);
        for v in &violations {
            warn!("DRC: {v}");
        }
        if !violations.is_empty() {
            warn!("{} DRC violation(s) found", violations.len());
        }
    }

    let cancelled = report.results.iter().any(|r| matches!(r.status, ConnectionStatus::Stopped | ConnectionStatus::TimedOut));
    if cancelled {
        return Ok(130);
    }

    if !args.dry_run {
        if let Some(output) = &args.output {
            JsonBoardWriter::new(output).write(&board)?;
        }
    }

    Ok(if report.air_wires.is_empty() { 0 } else { 2 })
}

/// Minimal post-route DRC check for invariant 1 of §8: no two items of
/// different nets overlap (by bounding box, the same approximation the
/// engine itself uses for obstacle shapes) within the clearance the
/// matrix requires on a shared layer, and every item's bounding box lies
/// inside the board outline.
fn check_drc(board: &Board) -> Vec<String> {
    let items: Vec<&Item> = board.items().collect();
    let clearance = board.clearance();
    let mut violations = Vec::new();

    if let Some(outline) = items.iter().find_map(|it| match it {
        Item::Outline(o) => Some(pcbroute::geom::IntBox::from_points(o.outline.iter().copied())),
        _ => None,
    }) {
        for item in &items {
            if matches!(item, Item::Outline(_)) {
                continue;
            }
            if !outline.contains(&item.bbox()) {
                violations.push(format!("item {} lies outside the board outline", item.id()));
            }
        }
    }

    for i in 0..items.len() {
        for j in (i + 1)..items.len() {
            let (a, b) = (items[i], items[j]);
            if a.header().shares_net(b.header()) {
                continue;
            }
            let (a_lo, a_hi) = a.layer_span();
            let (b_lo, b_hi) = b.layer_span();
            if a_hi < b_lo || b_hi < a_lo {
                continue;
            }
            let layer = a_lo.max(b_lo);
            let required = clearance.get_value(a.header().clearance_class, b.header().clearance_class, layer);
            if a.bbox().expand(required).intersects(&b.bbox()) {
                violations.push(format!("items {} and {} violate clearance on layer {layer}", a.id(), b.id()));
            }
        }
    }
    violations
}
