use thiserror::Error;

/// Errors raised at the fallible edges of the crate.
///
/// The ad playback state machine itself never fails: malformed markers are
/// ignored and missing sessions turn operations into no-ops. Only
/// configuration, playlist parsing and ad URI validation report errors.
#[derive(Error, Debug)]
pub enum WatchmeError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to parse playlist: {0}")]
    PlaylistParseError(String),

    #[error("Expected a media playlist, got a master playlist")]
    UnexpectedMasterPlaylist,

    #[error("Invalid ad URI {uri}: {source}")]
    InvalidAdUri {
        uri: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Metrics recorder error: {0}")]
    Metrics(String),
}

pub type Result<T> = std::result::Result<T, WatchmeError>;
