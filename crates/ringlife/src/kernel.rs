//! Local step kernel.
//!
//! Applies birth-3/survive-2-or-3 to every interior row of a partition. The
//! source buffer holds `rows + 2` rows: ghost row, interior rows, ghost row.
//! Columns wrap modulo `nx`; rows wrap through the ghost rows. Results go to a
//! separate destination buffer so every neighbor count sees only the previous
//! generation.

use rayon::prelude::*;

/// Cell count above which rows are processed in parallel.
///
/// Small partitions are faster sequentially due to lower overhead.
pub const PARALLEL_THRESHOLD: usize = 256 * 256;

/// The Game of Life update rule (B3/S23).
#[inline(always)]
pub fn next_state(alive: u8, neighbors: u8) -> u8 {
    match (alive, neighbors) {
        (1, 2) | (1, 3) => 1,
        (0, 3) => 1,
        _ => 0,
    }
}

/// Compute one output row from the three source rows around it.
#[inline]
fn step_row(above: &[u8], center: &[u8], below: &[u8], out: &mut [u8]) {
    let nx = center.len();
    // Column sums of the three rows; each neighbor count is three of these
    // minus the cell itself.
    let column = |j: usize| above[j] + center[j] + below[j];

    for (j, cell) in out.iter_mut().enumerate() {
        let left = if j == 0 { nx - 1 } else { j - 1 };
        let right = if j + 1 == nx { 0 } else { j + 1 };
        let neighbors = column(left) + column(j) + column(right) - center[j];
        *cell = next_state(center[j], neighbors);
    }
}

/// Advance `rows` interior rows from `src` into `dst`.
///
/// Both buffers are `(rows + 2) * nx` long. Only interior rows of `dst` are
/// written; its ghost rows are left untouched.
pub fn step(src: &[u8], dst: &mut [u8], nx: usize, rows: usize) {
    debug_assert_eq!(src.len(), (rows + 2) * nx);
    debug_assert_eq!(dst.len(), (rows + 2) * nx);

    let interior = &mut dst[nx..(rows + 1) * nx];

    if rows * nx >= PARALLEL_THRESHOLD {
        interior
            .par_chunks_mut(nx)
            .enumerate()
            .for_each(|(offset, out)| {
                let i = offset + 1;
                step_row(
                    &src[(i - 1) * nx..i * nx],
                    &src[i * nx..(i + 1) * nx],
                    &src[(i + 1) * nx..(i + 2) * nx],
                    out,
                );
            });
    } else {
        for (offset, out) in interior.chunks_exact_mut(nx).enumerate() {
            let i = offset + 1;
            step_row(
                &src[(i - 1) * nx..i * nx],
                &src[i * nx..(i + 1) * nx],
                &src[(i + 1) * nx..(i + 2) * nx],
                out,
            );
        }
    }
}

/// Step a whole toroidal grid held in one buffer. Used as the single-process
/// reference the distributed run is checked against.
pub fn step_torus(cells: &[u8], nx: usize, ny: usize) -> Vec<u8> {
    let mut src = Vec::with_capacity((ny + 2) * nx);
    src.extend_from_slice(&cells[(ny - 1) * nx..]);
    src.extend_from_slice(cells);
    src.extend_from_slice(&cells[..nx]);

    let mut dst = vec![0u8; (ny + 2) * nx];
    step(&src, &mut dst, nx, ny);
    dst[nx..(ny + 1) * nx].to_vec()
}
