//! Songbird implementations of the voice transport and media sink.

use async_trait::async_trait;
use parking_lot::Mutex;
use serenity::model::id::{ChannelId, GuildId};
use songbird::{
    driver::retry::{ExponentialBackoff, Retry, Strategy},
    input::{HttpRequest, Input},
    tracks::{PlayMode, TrackHandle},
    Call, Event, EventContext, EventHandler as VoiceEventHandler, Songbird, TrackEvent,
};
use std::{sync::Arc, time::Duration};
use tracing::{debug, error, info};

use crate::{
    audio::sink::{
        CompletionCallback, MediaSink, PlaybackOptions, ReconnectPolicy, VoiceConnection,
        VoiceTransport,
    },
    error::TransportError,
};

impl ReconnectPolicy {
    /// Configuración del driver de songbird; se aplica una sola vez al crear el manager
    pub fn songbird_config(&self) -> songbird::Config {
        let retry = if self.enabled {
            Retry {
                strategy: Strategy::Backoff(ExponentialBackoff {
                    min: Duration::from_millis(250),
                    max: self.delay_max,
                    jitter: 0.1,
                }),
                retry_limit: Some(self.max_attempts),
            }
        } else {
            Retry {
                strategy: Strategy::Every(self.delay_max),
                retry_limit: Some(0),
            }
        };

        songbird::Config::default().driver_retry(retry)
    }
}

pub struct SongbirdTransport {
    manager: Arc<Songbird>,
    http: reqwest::Client,
}

impl SongbirdTransport {
    pub fn new(manager: Arc<Songbird>, http: reqwest::Client) -> Self {
        Self { manager, http }
    }
}

#[async_trait]
impl VoiceTransport for SongbirdTransport {
    async fn connect(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
    ) -> Result<Arc<dyn VoiceConnection>, TransportError> {
        let call = self.manager.join(guild_id, channel_id).await.map_err(|e| {
            error!("Error al obtener handler de voz: {:?}", e);
            TransportError::new(format!("could not join voice channel: {}", e))
        })?;

        Ok(Arc::new(SongbirdConnection {
            guild_id,
            manager: self.manager.clone(),
            sink: Arc::new(SongbirdSink {
                call: call.clone(),
                http: self.http.clone(),
                current: Mutex::new(None),
            }),
            call,
        }))
    }
}

struct SongbirdConnection {
    guild_id: GuildId,
    manager: Arc<Songbird>,
    call: Arc<tokio::sync::Mutex<Call>>,
    sink: Arc<SongbirdSink>,
}

#[async_trait]
impl VoiceConnection for SongbirdConnection {
    async fn move_to(&self, channel_id: ChannelId) -> Result<(), TransportError> {
        // En songbird un join sobre una guild ya conectada mueve la llamada
        self.manager
            .join(self.guild_id, channel_id)
            .await
            .map(|_| ())
            .map_err(|e| TransportError::new(format!("could not move: {}", e)))
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        self.manager
            .remove(self.guild_id)
            .await
            .map_err(|e| TransportError::new(format!("could not disconnect: {}", e)))?;
        info!("👋 Desconectado del canal de voz en guild {}", self.guild_id);
        Ok(())
    }

    async fn is_connected(&self) -> bool {
        self.call.lock().await.current_connection().is_some()
    }

    async fn current_channel(&self) -> Option<ChannelId> {
        self.call
            .lock()
            .await
            .current_channel()
            .map(|channel_id| ChannelId::from(channel_id.0))
    }

    fn sink(&self) -> Arc<dyn MediaSink> {
        self.sink.clone()
    }
}

struct SongbirdSink {
    call: Arc<tokio::sync::Mutex<Call>>,
    http: reqwest::Client,
    current: Mutex<Option<TrackHandle>>,
}

impl SongbirdSink {
    fn current(&self) -> Result<TrackHandle, TransportError> {
        self.current
            .lock()
            .clone()
            .ok_or_else(|| TransportError::new("no active track"))
    }
}

#[async_trait]
impl MediaSink for SongbirdSink {
    async fn play(
        &self,
        uri: &str,
        options: &PlaybackOptions,
        on_complete: CompletionCallback,
    ) -> Result<(), TransportError> {
        let input: Input = HttpRequest::new(self.http.clone(), uri.to_string()).into();

        let track = {
            let mut call = self.call.lock().await;
            call.play_only_input(input)
        };

        track
            .set_volume(options.volume)
            .map_err(|e| TransportError::new(format!("could not set volume: {}", e)))?;

        // End y Error comparten el mismo callback de un solo uso
        let slot = Arc::new(Mutex::new(Some(on_complete)));
        for event in [TrackEvent::End, TrackEvent::Error] {
            track
                .add_event(
                    Event::Track(event),
                    TrackEndHandler {
                        callback: slot.clone(),
                    },
                )
                .map_err(|e| TransportError::new(format!("could not watch track: {}", e)))?;
        }

        // La reconexión ya la maneja el driver (ver `songbird_config`)
        debug!("Stream iniciado (vol {})", options.volume);
        *self.current.lock() = Some(track);
        Ok(())
    }

    async fn stop(&self) -> Result<(), TransportError> {
        let track = self.current.lock().take();
        match track {
            Some(track) => track
                .stop()
                .map_err(|e| TransportError::new(format!("could not stop: {}", e))),
            None => Ok(()),
        }
    }

    async fn pause(&self) -> Result<(), TransportError> {
        self.current()?
            .pause()
            .map_err(|e| TransportError::new(format!("could not pause: {}", e)))
    }

    async fn resume(&self) -> Result<(), TransportError> {
        self.current()?
            .play()
            .map_err(|e| TransportError::new(format!("could not resume: {}", e)))
    }
}

/// Handler para cuando termina (o falla) una canción.
///
/// Se registra para `End` y `Error` sobre el mismo slot: solo el primero
/// que llegue invoca el callback.
struct TrackEndHandler {
    callback: Arc<Mutex<Option<CompletionCallback>>>,
}

impl TrackEndHandler {
    fn complete(&self, error: Option<TransportError>) {
        let callback = self.callback.lock().take();
        if let Some(callback) = callback {
            callback(error);
        }
    }
}

#[async_trait]
impl VoiceEventHandler for TrackEndHandler {
    async fn act(&self, ctx: &EventContext<'_>) -> Option<Event> {
        let error = match ctx {
            EventContext::Track(tracks) => tracks
                .iter()
                .find_map(|(state, _)| playback_error(&state.playing)),
            _ => None,
        };

        self.complete(error);

        // Un solo disparo por track
        Some(Event::Cancel)
    }
}

fn playback_error(mode: &PlayMode) -> Option<TransportError> {
    match mode {
        PlayMode::Errored(e) => Some(TransportError::new(e.to_string())),
        _ => None,
    }
}
