use thiserror::Error;

mod model;
pub use model::*;
mod coords;
pub use coords::*;
mod edit;
pub use edit::*;
mod playback;
pub use playback::*;
mod interaction;
pub use interaction::*;
mod envelope;
pub use envelope::*;
mod render;
pub use render::*;
mod config;
pub use config::*;

#[derive(Debug, Error)]
pub enum TimelineError {
    #[error("invalid range: {0}")]
    InvalidRange(String),
    #[error("overlay {overlay} conflicts with {conflicting} on track {track}")]
    PlacementConflict {
        overlay: OverlayId,
        track: TrackId,
        conflicting: OverlayId,
    },
    #[error("overlay not found: {0}")]
    OverlayNotFound(OverlayId),
    #[error("track not found: {0}")]
    TrackNotFound(TrackId),
    #[error("overlay already exists: {0}")]
    OverlayExists(OverlayId),
    #[error("unresolved assets: {}", .0.join(", "))]
    UnresolvedAsset(Vec<String>),
    #[error("history empty: {0}")]
    HistoryEmpty(&'static str),
    #[error("invalid project: {0}")]
    InvalidProject(String),
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Coarse classification callers branch on when choosing a fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidRange,
    PlacementConflict,
    NotFound,
    UnresolvedAsset,
    Other,
}

impl TimelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidRange(_) => ErrorKind::InvalidRange,
            Self::PlacementConflict { .. } => ErrorKind::PlacementConflict,
            Self::OverlayNotFound(_) | Self::TrackNotFound(_) => ErrorKind::NotFound,
            Self::UnresolvedAsset(_) => ErrorKind::UnresolvedAsset,
            Self::OverlayExists(_)
            | Self::HistoryEmpty(_)
            | Self::InvalidProject(_)
            | Self::Serialization(_) => ErrorKind::Other,
        }
    }
}

pub type Result<T> = std::result::Result<T, TimelineError>;

pub type Frame = i64; // 0-based frame index on the project timeline
