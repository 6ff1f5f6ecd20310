use shared::map::error::RenderError;
use shared::positions::error::SourceError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RefreshError {
    #[error("position log error: {0}")]
    Source(#[from] SourceError),
    #[error("map render error: {0}")]
    Render(#[from] RenderError),
}

#[derive(Debug, Error)]
pub enum MainError {
    #[error(transparent)]
    Init(#[from] shared::error::InitializationError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Join(#[from] tokio::task::JoinError),
}
