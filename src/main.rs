use std::path::{Path, PathBuf};

use clap::Parser;
use label_layout::batch::{self, BatchSummary, ItemRequest};
use label_layout::descriptor::{detect_roll_width_mm, parse_label_dimensions};
use label_layout::render;
use label_layout::{EngineConfig, Label, OptimizationOutcome, Solver};
use tracing::Level;

#[derive(Parser)]
#[command(
    name = "label_layout",
    about = "Printing cylinder and roll layout optimizer for labels"
)]
struct Cli {
    /// Label size as HxW in mm (height around the cylinder, e.g. 50x30)
    #[arg(long, conflicts_with_all = ["article", "items"])]
    label: Option<String>,

    /// Article name to read the label size from (e.g. "ETIQ 55x66")
    #[arg(long, conflicts_with = "items")]
    article: Option<String>,

    /// Labels to produce
    #[arg(long, default_value_t = 1)]
    qty: u64,

    /// Roll width in mm (default: standard roll)
    #[arg(long, conflicts_with = "component")]
    roll_width: Option<f64>,

    /// Component name to read the roll width from (e.g. "LAMINADO 280 MM")
    #[arg(long)]
    component: Option<String>,

    /// JSON file with an array of items to optimize in batch
    #[arg(long)]
    items: Option<PathBuf>,

    /// JSON file overriding engine constants
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,

    /// Show ASCII layout of one cylinder revolution
    #[arg(long)]
    layout: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn parse_dimensions(s: &str) -> Result<(f64, f64), String> {
    let parts: Vec<&str> = s.split(['x', 'X']).collect();
    if parts.len() != 2 {
        return Err(format!("invalid label '{}', expected HxW", s));
    }
    let height = parts[0]
        .trim()
        .parse::<f64>()
        .map_err(|_| format!("invalid height in '{}'", s))?;
    let width = parts[1]
        .trim()
        .parse::<f64>()
        .map_err(|_| format!("invalid width in '{}'", s))?;
    Ok((height, width))
}

fn fail(msg: impl std::fmt::Display) -> ! {
    eprintln!("Error: {}", msg);
    std::process::exit(1);
}

fn run_items(solver: &Solver, path: &Path) {
    let contents = std::fs::read_to_string(path)
        .unwrap_or_else(|e| fail(format!("cannot read {}: {}", path.display(), e)));
    let items: Vec<ItemRequest> = serde_json::from_str(&contents)
        .unwrap_or_else(|e| fail(format!("invalid items file {}: {}", path.display(), e)));

    let reports = batch::run_batch(solver, &items);
    let summary = BatchSummary::from_reports(&reports);
    let body = serde_json::json!({ "items": reports, "summary": summary });
    match serde_json::to_string_pretty(&body) {
        Ok(s) => println!("{}", s),
        Err(e) => fail(e),
    }
}

fn print_outcome(label: &Label, outcome: &OptimizationOutcome, layout: bool) {
    match outcome {
        OptimizationOutcome::Solved(sol) => {
            println!("Label {} mm", label);
            println!(
                "Cylinder {} ({:.2} mm development): {} around, gap {:.2} mm",
                sol.cylinder, sol.development_mm, sol.repeats, sol.gap_vertical_mm
            );
            let gap = sol
                .gap_horizontal_mm
                .map(|g| format!("gap {:.2} mm", g))
                .unwrap_or_else(|| "no gap".to_string());
            println!(
                "Roll {} mm{}: {} across, {}",
                sol.roll_width_used_mm,
                if sol.used_fallback_roll {
                    " [standard fallback]"
                } else {
                    ""
                },
                sol.across_count,
                gap
            );
            if layout {
                print!("{}", render::render_revolution(label, sol));
            }
            println!();
            println!(
                "Summary: {} labels/revolution, {:.2} revolutions, {:.2} m linear, {:.2} m2",
                sol.labels_per_revolution, sol.revolutions, sol.linear_meters, sol.area_m2
            );
        }
        OptimizationOutcome::Infeasible(inf) => {
            println!("Label {} mm", label);
            if let Some(z) = inf.attempted_cylinder {
                println!("Attempted cylinder {}", z);
            }
            println!(
                "No feasible layout on roll {} mm: {}",
                inf.roll_width_used_mm, inf.reason
            );
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        _ => Level::DEBUG,
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_max_level(level)
        .init();

    let config = match &cli.config {
        Some(path) => EngineConfig::from_json_file(path).unwrap_or_else(|e| fail(e)),
        None => EngineConfig::default(),
    };
    let solver = Solver::new(config);

    if let Some(path) = &cli.items {
        run_items(&solver, path);
        return;
    }

    let (height, width) = match (&cli.label, &cli.article) {
        (Some(s), _) => parse_dimensions(s).unwrap_or_else(|e| fail(e)),
        (None, Some(article)) => parse_label_dimensions(article)
            .unwrap_or_else(|| fail(format!("no label size found in '{}'", article))),
        (None, None) => fail("one of --label, --article or --items is required"),
    };
    let label = Label::new(height, width).unwrap_or_else(|e| fail(e));

    let detected = cli
        .roll_width
        .or_else(|| cli.component.as_deref().and_then(detect_roll_width_mm));

    let outcome = solver.solve(label, cli.qty, detected);

    if cli.json {
        match serde_json::to_string_pretty(&outcome) {
            Ok(s) => println!("{}", s),
            Err(e) => fail(e),
        }
    } else {
        print_outcome(&label, &outcome, cli.layout);
    }
}
