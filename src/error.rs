use std::io;
use thiserror::Error;

/// Errors surfaced by the game engine to its caller
#[derive(Debug, Error)]
pub enum GameError {
    /// The engine cannot run a round with the configuration it was given
    #[error("configuration error: {0}")]
    Configuration(String),
}

/// Audio capability failures. None of these are fatal to a round.
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("{0} is not available")]
    Unavailable(&'static str),

    #[error("failed to launch `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Error)]
pub enum WordListError {
    #[error("unknown built-in word set `{0}`")]
    UnknownSet(String),

    #[error("built-in word set `{0}` is not valid utf-8")]
    Encoding(String),

    #[error("failed to parse word set: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("failed to read word file: {0}")]
    Io(#[from] io::Error),
}
