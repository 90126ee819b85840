use thiserror::Error;

use crate::stat_config::{Position, StatKind};

/// Errors surfaced by the projection engine, the parlay aggregator and the session.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PropError {
    // Configuration errors
    #[error("invalid stat {stat} for position {position}")]
    InvalidStatKind { position: Position, stat: StatKind },

    #[error("unknown position: {0}")]
    UnknownPosition(String),

    #[error("unknown stat: {0}")]
    UnknownStat(String),

    // Input range errors
    #[error("parlay needs at least 2 legs, got {0}")]
    TooFewLegs(usize),

    #[error("confidence {0} is outside 0..=100")]
    InvalidConfidence(f64),

    #[error("correlation matrix must be {expected}x{expected}, got {rows} rows")]
    MatrixDimension { expected: usize, rows: usize },

    #[error("correlation row {row} has {cols} columns, expected {expected}")]
    MatrixRowLength { row: usize, expected: usize, cols: usize },

    #[error("correlation at ({row}, {col}) is {value}, expected a value in [-1, 1]")]
    InvalidCorrelation { row: usize, col: usize, value: f64 },

    #[error("correlation matrix is not positive semi-definite (pivot {pivot} at row {row})")]
    MatrixNotPositiveSemiDefinite { row: usize, pivot: f64 },

    // Data availability; always absorbed by the engine.
    #[error("{feed} lookup unavailable for {key}")]
    DataUnavailable { feed: String, key: String },

    // Session errors
    #[error("game already exists: {0}")]
    GameExists(String),

    #[error("unknown game: {0}")]
    UnknownGame(String),

    #[error("invalid game: {0}")]
    InvalidGame(String),

    #[error("no active game")]
    NoActiveGame,

    #[error("player already added: {0}")]
    PlayerExists(String),

    #[error("unknown player: {0}")]
    UnknownPlayer(String),

    #[error("team {team} is not playing in {game}")]
    TeamNotInGame { team: String, game: String },
}

impl PropError {
    /// Configuration problems mean the prop can never be projected as requested.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            PropError::InvalidStatKind { .. }
                | PropError::UnknownPosition(_)
                | PropError::UnknownStat(_)
        )
    }

    pub fn unavailable(feed: &str, key: impl Into<String>) -> Self {
        PropError::DataUnavailable {
            feed: feed.to_string(),
            key: key.into(),
        }
    }
}

pub type PropResult<T> = std::result::Result<T, PropError>;
