//! Panelizer CLI - tile a board file across a panel from the command line.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use panelizer::{load_board, PanelOptions, PanelReport, PanelizerCore, Unit};
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "panelizer")]
#[command(about = "Tile a board layout across a panel with outline and V-cut guides", long_about = None)]
#[command(version)]
struct Cli {
    /// Target panel width in millimeters
    #[arg(value_name = "WIDTH")]
    width: f64,

    /// Target panel height in millimeters
    #[arg(value_name = "HEIGHT")]
    height: f64,

    /// Board file to panelize
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Where to write the panelized board
    #[arg(value_name = "OUTPUT")]
    output: PathBuf,

    /// Layer holding the board outline
    #[arg(long, default_value_t = 20)]
    outline_layer: i32,

    /// Layer for generated cut guides
    #[arg(long, default_value_t = 46)]
    guide_layer: i32,

    /// Stroke width of generated wires in millimeters
    #[arg(long, default_value_t = 0.254)]
    stroke_width: f64,

    /// How far guides extend past the panel edge, in millimeters
    #[arg(long, default_value_t = 5.0)]
    post_length: f64,

    /// Place a text marker next to every guide
    #[arg(long)]
    markers: bool,

    /// Remove coincident wires from the drawing plane after tiling
    #[arg(long)]
    merge_coincident: bool,

    /// Override the unit declared by the board file
    #[arg(long, value_enum)]
    unit: Option<UnitArg>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "human")]
    format: OutputFormat,

    /// Log progress to stderr
    #[arg(short, long)]
    verbose: bool,

    /// Run the transform without writing OUTPUT
    #[arg(long)]
    dry_run: bool,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Human-readable summary
    Human,
    /// JSON report
    Json,
}

#[derive(Clone, Copy, ValueEnum)]
enum UnitArg {
    Mm,
    Mic,
    Mil,
    Inch,
}

impl From<UnitArg> for Unit {
    fn from(arg: UnitArg) -> Self {
        match arg {
            UnitArg::Mm => Unit::Millimeter,
            UnitArg::Mic => Unit::Micron,
            UnitArg::Mil => Unit::Mil,
            UnitArg::Inch => Unit::Inch,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let exit_code = match handle_panelize(&cli) {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            1
        }
    };

    process::exit(exit_code);
}

/// Logs go to stderr so `--format json` output stays parseable.
fn init_logging(verbose: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn build_options(cli: &Cli) -> PanelOptions {
    let mut options = PanelOptions::new(cli.width, cli.height)
        .with_outline_layer(cli.outline_layer)
        .with_guide_layer(cli.guide_layer)
        .with_stroke_width(cli.stroke_width)
        .with_post_length(cli.post_length)
        .with_markers(cli.markers)
        .with_merge_coincident(cli.merge_coincident);
    if let Some(unit) = cli.unit {
        options = options.with_unit(unit.into());
    }
    options
}

fn handle_panelize(cli: &Cli) -> Result<()> {
    let options = build_options(cli);
    options.validate()?;

    let report = if cli.dry_run {
        let mut doc = load_board(&cli.input)
            .with_context(|| format!("Failed to load board: {}", cli.input.display()))?;
        PanelizerCore::panelize(&mut doc, &options)
            .with_context(|| format!("Failed to panelize {}", cli.input.display()))?
    } else {
        PanelizerCore::panelize_file(&cli.input, &cli.output, &options).with_context(|| {
            format!(
                "Failed to panelize {} into {}",
                cli.input.display(),
                cli.output.display()
            )
        })?
    };

    match cli.format {
        OutputFormat::Human => output_human(&report, &cli.output, cli.dry_run),
        OutputFormat::Json => output_json(&report, &cli.input, &cli.output, cli.dry_run)?,
    }
    Ok(())
}

fn output_human(report: &PanelReport, output: &Path, dry_run: bool) {
    let b = &report.board;
    println!(
        "Board:  {} x {} mm ({}, {}) - ({}, {})",
        report.board_width, report.board_height, b.min_x, b.min_y, b.max_x, b.max_y
    );
    println!(
        "Grid:   {} x {}, {} tile(s)",
        report.columns,
        report.rows,
        report.tile_count()
    );
    println!("Panel:  {} x {} mm", report.panel.width, report.panel.height);
    println!("{}", "─".repeat(60));
    println!("  Outline nodes removed: {}", report.removed_outline_nodes);
    println!("  Drawing primitives:    {}", report.duplicated.plain);
    println!("  Components:            {}", report.duplicated.elements);
    println!("  Signals:               {}", report.duplicated.signals);
    println!("  Designators:           {}", report.duplicated.realized_names);
    println!("  Border wires:          {}", report.guides.border);
    println!("  Guides:                {}", report.guides.guides);
    if report.guides.markers > 0 {
        println!("  Markers:               {}", report.guides.markers);
    }
    if report.merged_wires > 0 {
        println!("  Merged wires:          {}", report.merged_wires);
    }
    println!();
    if dry_run {
        println!("Dry run: {} not written", output.display());
    } else {
        println!("Wrote {}", output.display());
    }
}

fn output_json(report: &PanelReport, input: &Path, output: &Path, dry_run: bool) -> Result<()> {
    let value = serde_json::json!({
        "input": input.display().to_string(),
        "output": output.display().to_string(),
        "written": !dry_run,
        "report": report,
    });
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}
