//! Puzzle generation from a `(difficulty, seed)` pair.
//!
//! Difficulty controls the board size: `n` is the k-th composite number with
//! `k = ⌊log₃(difficulty)⌋` (clamped to 1). The seed fixes the solved board
//! and the choice of hidden squares, so the full puzzle is a pure function of
//! `(difficulty, seed, policy)`.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;

use crate::board::SudokuBoard;
use crate::composites::nth_composite;
use crate::error::PuzzleError;

/// How many squares to hide when generating a puzzle.
///
/// The live network hides none: with every cell given, the "solution" is the
/// deterministic solved board itself, and mining reduces to regenerating it
/// from the seed. `Scaled` hides a difficulty-proportional share of the board
/// (between half and four fifths of the cells across one size band), turning
/// the puzzle into an actual search problem.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum HiddenSquares {
    /// Hide nothing (network default).
    #[default]
    None,
    /// Hide the difficulty-scaled count.
    Scaled,
}

/// Deterministic puzzle generator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SudokuGenerator {
    difficulty: u64,
    seed: String,
    hidden: HiddenSquares,
}

impl SudokuGenerator {
    /// Create a generator with the default (hide-nothing) policy.
    pub fn new(difficulty: u64, seed: impl Into<String>) -> Self {
        Self {
            difficulty,
            seed: seed.into(),
            hidden: HiddenSquares::default(),
        }
    }

    /// Override the hidden-squares policy.
    pub fn with_hidden(mut self, hidden: HiddenSquares) -> Self {
        self.hidden = hidden;
        self
    }

    /// The generator's difficulty.
    pub fn difficulty(&self) -> u64 {
        self.difficulty
    }

    /// The generator's seed.
    pub fn seed(&self) -> &str {
        &self.seed
    }

    /// Board side length for this difficulty: the k-th composite number with
    /// `k = ⌊log₃(difficulty)⌋`, clamped to at least 1.
    ///
    /// The clamp covers difficulty 2 as well as difficulty ≤ 1: `⌊log₃ 2⌋`
    /// is 0, which has no composite to index, so difficulty 2 maps to the
    /// smallest board (n = 4) just like difficulty 1. This is not a remote
    /// corner — a chain starting at difficulty 1 and advancing by one per
    /// accepted block mines and verifies its second block at difficulty 2.
    pub fn board_size(&self) -> usize {
        let k = if self.difficulty > 1 {
            (self.difficulty as f64).log(3.0) as usize
        } else {
            1
        };
        nth_composite(k.max(1))
    }

    /// Number of squares the current policy hides.
    pub fn hidden_count(&self) -> usize {
        match self.hidden {
            HiddenSquares::None => 0,
            HiddenSquares::Scaled => self.scaled_hidden(),
        }
    }

    /// The difficulty-scaled hidden count.
    ///
    /// Within one board-size band (difficulties `3^(n-2)` to `3^(n-1)`), the
    /// hidden count scales linearly from half to four fifths of the board's
    /// n² cells, truncated toward zero and clamped to the board.
    pub fn scaled_hidden(&self) -> usize {
        let n = self.board_size();
        let squares = (n * n) as f64;
        let last_increase = 3f64.powi(n as i32 - 2);
        let next_increase = 3f64.powi(n as i32 - 1);
        let max_hidden = (4.0 * squares / 5.0).floor();
        let min_hidden = (squares / 2.0).floor();

        let scaled = (max_hidden - min_hidden) * (self.difficulty as f64 - last_increase)
            / (next_increase - last_increase)
            + min_hidden;
        (scaled as i64).clamp(0, (n * n) as i64) as usize
    }

    /// Generate the puzzle board: the seed-determined solved board with the
    /// policy's square count hidden.
    pub fn generate_board(&self) -> SudokuBoard {
        let mut board = SudokuBoard::generate(self.board_size(), self.seed.clone());
        board
            .hide_squares(self.hidden_count())
            .expect("hidden count is clamped to the board");
        board
    }

    /// Encode as base64 of `"difficulty:seed"`.
    pub fn encode(&self) -> String {
        BASE64.encode(format!("{}:{}", self.difficulty, self.seed))
    }

    /// Decode the `"difficulty:seed"` form. The hidden-squares policy is not
    /// part of the wire format; the decoded generator uses the default.
    pub fn decode(encoded: &str) -> Result<Self, PuzzleError> {
        let bytes = BASE64
            .decode(encoded.trim())
            .map_err(|e| PuzzleError::MalformedGenerator(e.to_string()))?;
        let text =
            String::from_utf8(bytes).map_err(|e| PuzzleError::MalformedGenerator(e.to_string()))?;
        let (difficulty, seed) = text
            .split_once(':')
            .ok_or_else(|| PuzzleError::MalformedGenerator("missing separator".into()))?;
        let difficulty: u64 = difficulty
            .parse()
            .map_err(|_| PuzzleError::MalformedGenerator(format!("bad difficulty {difficulty}")))?;
        Ok(Self::new(difficulty, seed))
    }
}
