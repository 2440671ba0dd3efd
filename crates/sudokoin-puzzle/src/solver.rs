//! Backtracking solver for hidden-square puzzles.
//!
//! With the hide-nothing network policy the generated puzzle is already
//! solved and `solve` returns it unchanged; under the scaled policy miners
//! use this to fill the hidden cells.

use crate::board::SudokuBoard;

impl SudokuBoard {
    /// Solve the puzzle by backtracking over its hidden cells.
    ///
    /// Returns `None` if the givens are contradictory or no assignment of the
    /// hidden cells completes the board.
    pub fn solve(&self) -> Option<SudokuBoard> {
        if !self.is_valid() {
            return None;
        }
        let mut work = self.clone();
        let n = work.size();
        let holes: Vec<(usize, usize)> = (0..n)
            .flat_map(|r| (0..n).map(move |c| (r, c)))
            .filter(|&(r, c)| work.cell(r, c) == 0)
            .collect();
        if fill(&mut work, &holes, 0) { Some(work) } else { None }
    }
}

fn fill(board: &mut SudokuBoard, holes: &[(usize, usize)], at: usize) -> bool {
    let Some(&(row, col)) = holes.get(at) else {
        return true;
    };
    let n = board.size() as u32;
    for candidate in 1..=n {
        if board.is_valid_location(row, col, candidate) {
            board.cells[row][col] = candidate;
            if fill(board, holes, at + 1) {
                return true;
            }
            board.cells[row][col] = 0;
        }
    }
    false
}
