//! Error types for the puzzle engine.
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PuzzleError {
    #[error("cannot hide {requested} squares on a {cells}-cell board")] TooManyHidden { requested: usize, cells: usize },
    #[error("malformed board encoding: {0}")] MalformedBoard(String),
    #[error("malformed generator encoding: {0}")] MalformedGenerator(String),
    #[error("puzzle has no solution")] Unsolvable,
}
