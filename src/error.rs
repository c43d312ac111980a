//! Error types
//!
//! Only initialization and audio can fail. The simulation itself is total
//! over its (clamped) inputs and has no error path.

use thiserror::Error;

/// Failure to bring up a game session
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InitError {
    /// The host has no drawing surface for us
    #[error("Rendering surface unavailable: {0}")]
    SurfaceUnavailable(String),

    /// The surface exists but cannot hold the playfield
    #[error("Invalid canvas size {width}x{height}")]
    InvalidCanvas { width: f32, height: f32 },
}

/// Audio failures, always caught inside the audio engine
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AudioError {
    /// No audio output could be created
    #[error("Audio output unavailable")]
    Unavailable,

    /// Output exists but has not been unlocked by a user gesture
    #[error("Audio output locked (state: {0})")]
    Locked(&'static str),

    /// A node could not be created
    #[error("Failed to create {node} node: {reason}")]
    NodeCreation { node: &'static str, reason: String },

    /// Two nodes could not be connected
    #[error("Failed to connect nodes: {0}")]
    Connect(String),

    /// Parameter automation or start/stop scheduling failed
    #[error("Failed to schedule: {0}")]
    Scheduling(String),

    /// The graph referenced a node that does not exist
    #[error("Invalid graph: {0}")]
    InvalidGraph(String),

    /// Release was requested for a voice the backend does not know
    #[error("Unknown voice {0}")]
    UnknownVoice(u32),
}
