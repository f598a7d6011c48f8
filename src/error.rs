use thiserror::Error;

/// Errores al convertir la entrada del usuario en un stream reproducible
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolutionError {
    #[error("Could not extract audio: {0}")]
    ExtractionFailed(String),

    #[error("No results found")]
    NoResults,
}

/// Rechazos del controlador de reproducción. Son informativos, nunca fatales.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum PlaybackStateError {
    #[error("Not currently in a voice channel.")]
    NotConnected,

    #[error("Audio is already paused.")]
    AlreadyPaused,

    #[error("Audio is not paused.")]
    NotPaused,

    #[error("Nothing is playing.")]
    NothingPlaying,

    #[error("Nothing to skip.")]
    NothingToSkip,

    #[error("The queue is empty.")]
    QueueEmpty,
}

/// Error opaco del transporte de voz o del sink de audio
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct TransportError(String);

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Todo lo que un comando puede devolver al usuario
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error(transparent)]
    State(#[from] PlaybackStateError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}
