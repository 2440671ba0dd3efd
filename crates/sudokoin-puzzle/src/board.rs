//! The n×n Sudoku board: generation, validity, and wire encoding.
//!
//! Boards travel between nodes as base64-wrapped JSON
//! (`{n, seed, board, box_size}`); the same format carries both puzzles and
//! candidate solutions. A cell value of 0 marks a hidden square.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;

use crate::error::PuzzleError;

/// Deterministic RNG for a seed string.
///
/// Seeded with the SHA-256 of the seed so arbitrary-length seeds map onto the
/// fixed-width RNG state. Consensus-critical: every node must derive the same
/// stream for the same seed.
pub(crate) fn seed_rng(seed: &str) -> StdRng {
    let digest: [u8; 32] = Sha256::digest(seed.as_bytes()).into();
    StdRng::from_seed(digest)
}

/// Clone-and-shuffle, so one RNG can drive several independent orderings.
fn shuffled(rng: &mut StdRng, items: impl Iterator<Item = usize>) -> Vec<usize> {
    let mut v: Vec<usize> = items.collect();
    v.shuffle(rng);
    v
}

/// Wire shape of an encoded board.
#[derive(Serialize, Deserialize)]
struct BoardWire {
    n: usize,
    seed: String,
    board: Vec<Vec<u32>>,
    box_size: (usize, usize),
}

/// An n×n Sudoku board.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SudokuBoard {
    n: usize,
    seed: String,
    pub(crate) cells: Vec<Vec<u32>>,
}

impl SudokuBoard {
    /// Generate the solved board for `(n, seed)`.
    ///
    /// Shuffles row groups, column groups, and the digit alphabet with the
    /// seeded RNG, then fills each cell from the band-shift pattern
    /// `(c·(row mod r) + row/r + col) mod n`. The result is always a valid
    /// fully-filled board.
    pub fn generate(n: usize, seed: impl Into<String>) -> Self {
        let seed = seed.into();
        let mut board = Self {
            n,
            seed,
            cells: Vec::new(),
        };
        let (r_base, c_base) = board.box_size();
        let mut rng = seed_rng(&board.seed);

        let mut rows = Vec::with_capacity(n);
        for g in shuffled(&mut rng, 0..c_base) {
            for r in shuffled(&mut rng, 0..r_base) {
                rows.push(g * r_base + r);
            }
        }
        let mut cols = Vec::with_capacity(n);
        for g in shuffled(&mut rng, 0..r_base) {
            for c in shuffled(&mut rng, 0..c_base) {
                cols.push(g * c_base + c);
            }
        }
        let nums: Vec<usize> = shuffled(&mut rng, 1..=n);

        let pattern = |row: usize, col: usize| (c_base * (row % r_base) + row / r_base + col) % n;
        board.cells = rows
            .iter()
            .map(|&r| cols.iter().map(|&c| nums[pattern(r, c)] as u32).collect())
            .collect();
        board
    }

    /// Build a board from explicit cells (e.g. a decoded candidate solution).
    pub fn from_cells(n: usize, seed: impl Into<String>, cells: Vec<Vec<u32>>) -> Self {
        Self {
            n,
            seed: seed.into(),
            cells,
        }
    }

    /// Board side length.
    pub fn size(&self) -> usize {
        self.n
    }

    /// The seed this board was generated from.
    pub fn seed(&self) -> &str {
        &self.seed
    }

    /// Cell value at `(row, col)`; 0 means hidden.
    pub fn cell(&self, row: usize, col: usize) -> u32 {
        self.cells[row][col]
    }

    /// Box dimensions `(r, c)` with `r·c == n` and `r` the largest divisor
    /// not exceeding `√n` (so 9 → (3, 3), 8 → (2, 4), 143 → (11, 13)).
    pub fn box_size(&self) -> (usize, usize) {
        box_size_for(self.n)
    }

    /// Whether placing `number` at `(row, col)` conflicts with no filled cell.
    ///
    /// Zero (hidden) is always allowed; the cell's own current value is
    /// ignored so the check can be run over an already-filled board.
    pub(crate) fn is_valid_location(&self, row: usize, col: usize, number: u32) -> bool {
        if number == 0 {
            return true;
        }
        if number as usize > self.n {
            return false;
        }
        for i in 0..self.n {
            if self.cells[row][i] == number && i != col {
                return false;
            }
        }
        for i in 0..self.n {
            if self.cells[i][col] == number && i != row {
                return false;
            }
        }
        let (box_r, box_c) = self.box_size();
        let top = (row / box_r) * box_r;
        let left = (col / box_c) * box_c;
        for i in top..top + box_r {
            for j in left..left + box_c {
                if (i, j) != (row, col) && self.cells[i][j] == number {
                    return false;
                }
            }
        }
        true
    }

    /// Whether every filled cell is conflict-free (hidden cells are ignored).
    pub fn is_valid(&self) -> bool {
        (0..self.n).all(|row| {
            (0..self.n).all(|col| self.is_valid_location(row, col, self.cells[row][col]))
        })
    }

    /// Whether the board is fully filled and valid.
    pub fn is_solved(&self) -> bool {
        self.is_valid() && self.cells.iter().all(|row| !row.contains(&0))
    }

    /// Hide `count` squares, chosen by a fresh shuffle of the seed RNG.
    pub fn hide_squares(&mut self, count: usize) -> Result<(), PuzzleError> {
        let cells = self.n * self.n;
        if cells < count {
            return Err(PuzzleError::TooManyHidden {
                requested: count,
                cells,
            });
        }
        let mut rng = seed_rng(&self.seed);
        let indices = shuffled(&mut rng, 0..cells);
        for &index in indices.iter().take(count) {
            self.cells[index / self.n][index % self.n] = 0;
        }
        Ok(())
    }

    /// Whether `candidate` solves this puzzle: it must be a solved board of
    /// the same size agreeing with every non-hidden cell here.
    pub fn is_valid_solution(&self, candidate: &SudokuBoard) -> bool {
        if candidate.n != self.n || !candidate.is_solved() {
            return false;
        }
        for row in 0..self.n {
            for col in 0..self.n {
                let given = self.cells[row][col];
                if given != 0 && given != candidate.cells[row][col] {
                    return false;
                }
            }
        }
        true
    }

    /// Encode as base64-wrapped JSON.
    pub fn encode(&self) -> String {
        let wire = BoardWire {
            n: self.n,
            seed: self.seed.clone(),
            board: self.cells.clone(),
            box_size: self.box_size(),
        };
        let json = serde_json::to_string(&wire).expect("board wire shape always serializes");
        BASE64.encode(json)
    }

    /// Decode a base64-wrapped JSON board, checking its dimensions.
    pub fn decode(encoded: &str) -> Result<Self, PuzzleError> {
        let bytes = BASE64
            .decode(encoded.trim())
            .map_err(|e| PuzzleError::MalformedBoard(e.to_string()))?;
        let wire: BoardWire = serde_json::from_slice(&bytes)
            .map_err(|e| PuzzleError::MalformedBoard(e.to_string()))?;
        if wire.n == 0 || wire.board.len() != wire.n || wire.board.iter().any(|r| r.len() != wire.n)
        {
            return Err(PuzzleError::MalformedBoard(format!(
                "expected {n}x{n} cells",
                n = wire.n
            )));
        }
        Ok(Self {
            n: wire.n,
            seed: wire.seed,
            cells: wire.board,
        })
    }
}

impl fmt::Display for SudokuBoard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{n}x{n} board, seed {seed}", n = self.n, seed = self.seed)?;
        for row in &self.cells {
            let line: Vec<String> = row.iter().map(|v| v.to_string()).collect();
            writeln!(f, "{}", line.join(" "))?;
        }
        Ok(())
    }
}

fn box_size_for(n: usize) -> (usize, usize) {
    let limit = (n as f64).sqrt() as usize;
    let r = (1..=limit).rev().find(|d| n % d == 0).unwrap_or(1);
    (r, n / r)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board_4(cells: [[u32; 4]; 4]) -> SudokuBoard {
        SudokuBoard::from_cells(4, "seed", cells.iter().map(|r| r.to_vec()).collect())
    }

    // --- Box sizes ---

    #[test]
    fn box_sizes() {
        assert_eq!(SudokuBoard::generate(9, "s").box_size(), (3, 3));
        assert_eq!(SudokuBoard::generate(8, "s").box_size(), (2, 4));
        assert_eq!(SudokuBoard::generate(16, "s").box_size(), (4, 4));
        assert_eq!(box_size_for(143), (11, 13));
        assert_eq!(box_size_for(4), (2, 2));
        assert_eq!(box_size_for(6), (2, 3));
    }

    // --- Location validity ---

    #[test]
    fn valid_location_small() {
        let board = SudokuBoard::from_cells(
            3,
            "seed",
            vec![vec![1, 2, 3], vec![3, 0, 0], vec![2, 3, 1]],
        );
        assert!(board.is_valid_location(1, 1, 1));
        assert!(!board.is_valid_location(1, 1, 3));
        assert!(!board.is_valid_location(1, 1, 2));
        assert!(!board.is_valid_location(1, 1, 10));
    }

    #[test]
    fn valid_location_9_by_9() {
        let mut cells = vec![
            vec![1, 2, 3, 4, 5, 6, 7, 8, 9],
            vec![4, 0, 6, 0, 0, 0, 0, 0, 0],
            vec![7, 8, 9, 0, 0, 0, 0, 0, 0],
        ];
        cells.extend(std::iter::repeat_n(vec![0; 9], 6));
        let board = SudokuBoard::from_cells(9, "seed", cells);
        assert!(board.is_valid_location(1, 1, 5)); // free in its box
        assert!(!board.is_valid_location(1, 1, 1)); // box conflict
        assert!(!board.is_valid_location(4, 6, 7)); // column conflict
        assert!(!board.is_valid_location(1, 6, 4)); // row conflict
    }

    #[test]
    fn valid_location_8_by_8_rectangular_box() {
        let mut cells = vec![
            vec![1, 2, 3, 4, 5, 6, 7, 8],
            vec![5, 0, 6, 0, 0, 0, 0, 0],
            vec![7, 8, 0, 0, 0, 0, 0, 0],
        ];
        cells.extend(std::iter::repeat_n(vec![0; 8], 5));
        let board = SudokuBoard::from_cells(8, "seed", cells);
        assert!(board.is_valid_location(1, 1, 7));
        assert!(!board.is_valid_location(1, 1, 4)); // 2x4 box conflict
        assert!(!board.is_valid_location(1, 6, 7)); // column conflict
        assert!(!board.is_valid_location(1, 6, 6)); // row conflict
    }

    // --- Validity and solvedness ---

    #[test]
    fn valid_and_solved_boards() {
        let solved = board_4([[1, 4, 2, 3], [2, 3, 1, 4], [4, 2, 3, 1], [3, 1, 4, 2]]);
        assert!(solved.is_valid());
        assert!(solved.is_solved());

        let invalid = board_4([[1, 2, 3, 4], [2, 3, 4, 1], [2, 4, 3, 1], [4, 1, 2, 3]]);
        assert!(!invalid.is_valid());
        assert!(!invalid.is_solved());

        let partial = board_4([[1, 4, 2, 3], [2, 3, 1, 4], [4, 2, 3, 1], [3, 1, 4, 0]]);
        assert!(partial.is_valid());
        assert!(!partial.is_solved());
    }

    #[test]
    fn generated_boards_are_solved() {
        for n in [4, 6, 8, 9, 10, 12] {
            let board = SudokuBoard::generate(n, "seed");
            assert_eq!(board.size(), n);
            assert_eq!(board.cells.len(), n);
            assert!(board.cells.iter().all(|r| r.len() == n));
            assert!(board.is_solved(), "generated {n}x{n} board not solved");
        }
    }

    #[test]
    fn generation_is_deterministic() {
        let a = SudokuBoard::generate(9, "some-seed");
        let b = SudokuBoard::generate(9, "some-seed");
        assert_eq!(a, b);
    }

    #[test]
    fn generation_varies_with_seed() {
        let a = SudokuBoard::generate(9, "seed-a");
        let b = SudokuBoard::generate(9, "seed-b");
        assert_ne!(a.cells, b.cells);
    }

    // --- Hiding ---

    #[test]
    fn hide_squares_zeroes_cells() {
        let mut board = SudokuBoard::generate(4, "seed");
        board.hide_squares(10).unwrap();
        let hidden = board.cells.iter().flatten().filter(|&&v| v == 0).count();
        assert_eq!(hidden, 10);
    }

    #[test]
    fn hide_squares_is_deterministic() {
        let mut a = SudokuBoard::generate(6, "seed");
        let mut b = SudokuBoard::generate(6, "seed");
        a.hide_squares(12).unwrap();
        b.hide_squares(12).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn hide_more_than_board_errors() {
        let mut board = SudokuBoard::generate(4, "seed");
        assert_eq!(
            board.hide_squares(17),
            Err(PuzzleError::TooManyHidden { requested: 17, cells: 16 }),
        );
    }

    // --- Solutions ---

    #[test]
    fn empty_puzzle_accepts_any_solved_board() {
        let empty = board_4([[0; 4]; 4]);
        assert!(empty.is_valid_solution(&SudokuBoard::generate(4, "whatever")));
    }

    #[test]
    fn hidden_puzzle_accepts_its_own_solution() {
        let mut puzzle = SudokuBoard::generate(4, "seed");
        puzzle.hide_squares(10).unwrap();
        assert!(puzzle.is_valid_solution(&SudokuBoard::generate(4, "seed")));
    }

    #[test]
    fn hidden_puzzle_rejects_other_solution() {
        let mut puzzle = SudokuBoard::generate(4, "seed");
        puzzle.hide_squares(10).unwrap();
        assert!(!puzzle.is_valid_solution(&SudokuBoard::generate(4, "other")));
    }

    #[test]
    fn rejects_unsolved_candidate() {
        let puzzle = SudokuBoard::generate(4, "seed");
        let partial = board_4([[1, 4, 2, 3], [2, 3, 1, 4], [4, 2, 3, 1], [3, 1, 4, 0]]);
        assert!(!puzzle.is_valid_solution(&partial));
    }

    #[test]
    fn rejects_wrong_size_candidate() {
        let puzzle = SudokuBoard::generate(4, "seed");
        let other = SudokuBoard::generate(6, "seed");
        assert!(!puzzle.is_valid_solution(&other));
    }

    // --- Encoding ---

    #[test]
    fn encode_decode_round_trip() {
        let mut board = SudokuBoard::generate(6, "round-trip");
        board.hide_squares(7).unwrap();
        let decoded = SudokuBoard::decode(&board.encode()).unwrap();
        assert_eq!(decoded, board);
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(SudokuBoard::decode("not base64 at all!!!").is_err());
        let bytes = BASE64.encode("{\"n\": 4}");
        assert!(SudokuBoard::decode(&bytes).is_err());
    }

    #[test]
    fn decode_rejects_wrong_dimensions() {
        let wire = BoardWire {
            n: 4,
            seed: "s".into(),
            board: vec![vec![1, 2, 3]],
            box_size: (2, 2),
        };
        let encoded = BASE64.encode(serde_json::to_string(&wire).unwrap());
        assert!(SudokuBoard::decode(&encoded).is_err());
    }

    #[test]
    fn display_renders_rows() {
        let board = board_4([[1, 4, 2, 3], [2, 3, 1, 4], [4, 2, 3, 1], [3, 1, 4, 2]]);
        let text = board.to_string();
        assert!(text.contains("1 4 2 3"));
        assert!(text.contains("4x4 board"));
    }
}
