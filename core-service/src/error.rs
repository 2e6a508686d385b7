use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Core initialization failed: {0}")]
    InitializationFailed(String),

    #[error("Invalid player configuration: {0}")]
    Config(String),

    #[error("Runtime error: {0}")]
    Runtime(#[from] core_runtime::Error),

    #[error("Playback error: {0}")]
    Playback(#[from] core_playback::PlaybackError),

    /// Shutdown finished but the engine still owns decode buffers.
    #[error("{count} decode buffers still held after shutdown")]
    BuffersOutstanding { count: usize },
}

pub type Result<T> = std::result::Result<T, CoreError>;
