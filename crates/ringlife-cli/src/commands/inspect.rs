//! `ringlife inspect` command - Describe a snapshot file.

use std::path::Path;

use colored::Colorize;

use ringlife::snapshot::{read_snapshot, Snapshot};

use crate::error::CliResult;

/// Print a snapshot's metadata, and optionally its cells.
pub fn execute(path: &Path, show_cells: bool) -> CliResult<()> {
    let snapshot = read_snapshot(path)?;
    print!("{}", describe(&snapshot));

    if show_cells {
        println!();
        for r in 0..snapshot.grid.ny {
            let line: String = snapshot
                .grid
                .row(r)
                .iter()
                .map(|&c| if c == 1 { '#' } else { '.' })
                .collect();
            println!("{}", line);
        }
    }
    Ok(())
}

fn describe(snapshot: &Snapshot) -> String {
    let grid = &snapshot.grid;
    let mut out = format!(
        "{} step {} of {} (seed {})\n  Grid:        {}x{}\n  Alive cells: {}\n",
        "Snapshot".bold(),
        snapshot.step,
        snapshot.pattern,
        snapshot.seed,
        grid.nx,
        grid.ny,
        grid.alive_cells()
    );
    if let Some(summary) = snapshot.summary {
        out.push_str(&format!(
            "  Final:       checksum {} in {:.6} s\n",
            summary.checksum, summary.elapsed_seconds
        ));
    }
    out
}
