//! Seams towards the voice transport and the media sink.
//!
//! The session actor only talks to these traits; [`super::voice`] provides
//! the songbird-backed implementations and tests provide recording fakes.

use async_trait::async_trait;
use serenity::model::id::{ChannelId, GuildId};
use std::{sync::Arc, time::Duration};

use crate::error::TransportError;

/// Callback de un solo uso: el sink lo invoca cuando el track termina.
///
/// Puede llegar desde cualquier hilo; nunca toca el estado de la sesión
/// directamente.
pub type CompletionCallback = Box<dyn FnOnce(Option<TransportError>) + Send + 'static>;

/// Reconexión automática cuando el stream se corta
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReconnectPolicy {
    pub enabled: bool,
    pub max_attempts: usize,
    pub delay_max: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            max_attempts: 5,
            delay_max: Duration::from_secs(5),
        }
    }
}

/// Opciones que se pasan al sink con cada track. Se construyen una vez.
///
/// `reconnect` es informativo para el sink de songbird: la política real se
/// aplica al driver en `ReconnectPolicy::songbird_config`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackOptions {
    pub volume: f32,
    pub reconnect: ReconnectPolicy,
}

impl Default for PlaybackOptions {
    fn default() -> Self {
        Self {
            volume: 0.5,
            reconnect: ReconnectPolicy::default(),
        }
    }
}

/// Abre conexiones de voz
#[async_trait]
pub trait VoiceTransport: Send + Sync {
    async fn connect(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
    ) -> Result<Arc<dyn VoiceConnection>, TransportError>;
}

/// Una conexión de voz viva en una guild
#[async_trait]
pub trait VoiceConnection: Send + Sync {
    async fn move_to(&self, channel_id: ChannelId) -> Result<(), TransportError>;

    async fn disconnect(&self) -> Result<(), TransportError>;

    async fn is_connected(&self) -> bool;

    async fn current_channel(&self) -> Option<ChannelId>;

    /// Sink de audio atado a esta conexión
    fn sink(&self) -> Arc<dyn MediaSink>;
}

/// Reproducción de audio sobre una conexión de voz
#[async_trait]
pub trait MediaSink: Send + Sync {
    async fn play(
        &self,
        uri: &str,
        options: &PlaybackOptions,
        on_complete: CompletionCallback,
    ) -> Result<(), TransportError>;

    async fn stop(&self) -> Result<(), TransportError>;

    async fn pause(&self) -> Result<(), TransportError>;

    async fn resume(&self) -> Result<(), TransportError>;
}
