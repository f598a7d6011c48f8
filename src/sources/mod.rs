pub mod ytdlp;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::ResolutionError;

pub use ytdlp::YtDlpBackend;

/// Título usado cuando el backend no devuelve uno
pub const UNKNOWN_TITLE: &str = "Unknown title";

/// Lo que el usuario escribió en `/play`
#[derive(Debug, Clone)]
pub struct TrackRequest {
    pub raw_input: String,
}

impl TrackRequest {
    pub fn new(raw_input: impl Into<String>) -> Self {
        Self {
            raw_input: raw_input.into(),
        }
    }
}

/// Un track listo para reproducir: stream directo + título.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTrack {
    uri: String,
    title: String,
}

impl ResolvedTrack {
    pub fn new(uri: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            title: title.into(),
        }
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn title(&self) -> &str {
        &self.title
    }
}

/// Metadata tal como la entrega el backend de extracción
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct MediaInfo {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub entries: Option<Vec<MediaInfo>>,
}

impl MediaInfo {
    /// Política sin playlists: baja por `entries` quedándose siempre con el primero.
    fn into_first_entry(self) -> Option<MediaInfo> {
        match self.entries {
            Some(entries) => entries.into_iter().next()?.into_first_entry(),
            None => Some(self),
        }
    }

    fn into_track(self) -> Result<ResolvedTrack, ResolutionError> {
        let entry = self
            .into_first_entry()
            .ok_or(ResolutionError::NoResults)?;

        let uri = entry
            .url
            .filter(|u| !u.is_empty())
            .ok_or_else(|| ResolutionError::ExtractionFailed("no streamable url".to_string()))?;

        let title = entry
            .title
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| UNKNOWN_TITLE.to_string());

        Ok(ResolvedTrack::new(uri, title))
    }
}

/// Backend de extracción/búsqueda. Las implementaciones no deben bloquear el runtime.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ResolverBackend: Send + Sync {
    /// Extrae metadata de una URI sin descargar
    async fn extract(&self, uri: &str) -> Result<MediaInfo, ResolutionError>;

    /// Busca `limit` resultados para un texto libre
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<MediaInfo>, ResolutionError>;
}

pub struct Resolver {
    backend: Box<dyn ResolverBackend>,
}

impl Resolver {
    pub fn new(backend: impl ResolverBackend + 'static) -> Self {
        Self {
            backend: Box::new(backend),
        }
    }

    /// Convierte la entrada del usuario en un [`ResolvedTrack`].
    ///
    /// Una URI se extrae directamente; cualquier otra cosa se trata como
    /// búsqueda y se queda con el primer resultado. No toca ninguna sesión.
    pub async fn resolve(&self, request: &TrackRequest) -> Result<ResolvedTrack, ResolutionError> {
        let input = request.raw_input.trim();

        let info = if is_uri(input) {
            debug!("🔗 Extrayendo URL directa: {}", input);
            self.backend.extract(input).await?
        } else {
            debug!("🔍 Buscando: {}", input);
            self.backend
                .search(input, 1)
                .await?
                .into_iter()
                .next()
                .ok_or(ResolutionError::NoResults)?
        };

        let track = info.into_track()?;
        info!("🎯 Resuelto '{}' -> {}", input, track.title());
        Ok(track)
    }
}

/// Verdadero si la entrada es una URL http(s) con host
pub fn is_uri(input: &str) -> bool {
    match url::Url::parse(input) {
        Ok(parsed) => matches!(parsed.scheme(), "http" | "https") && parsed.host_str().is_some(),
        Err(_) => false,
    }
}
