//! Panelize a board and print the resulting layout.

use panelizer::prelude::*;
use std::path::Path;

fn main() -> Result<(), PanelizerError> {
    let mut args = std::env::args().skip(1);
    let input = args
        .next()
        .unwrap_or_else(|| "tests/fixtures/simple_board.brd".to_string());
    let input = Path::new(&input);

    if !input.exists() {
        eprintln!("File not found: {}", input.display());
        eprintln!("Usage: cargo run --example panelize_board [path/to/board.brd] [output.brd]");
        std::process::exit(1);
    }

    let mut doc = load_board(input)?;
    let options = PanelOptions::new(100.0, 80.0).with_markers(true);
    let report = PanelizerCore::panelize(&mut doc, &options)?;

    println!("Board: {} x {} mm", report.board_width, report.board_height);
    println!("Grid: {} columns x {} rows", report.columns, report.rows);
    println!("Panel: {} x {} mm", report.panel.width, report.panel.height);
    println!();
    for tile in &report.tiles {
        println!("  tile {:>3}: ({}, {})", tile.index, tile.x_offset, tile.y_offset);
    }

    if let Some(output) = args.next() {
        save_board(Path::new(&output), &doc)?;
        println!();
        println!("Wrote {}", output);
    }
    Ok(())
}
