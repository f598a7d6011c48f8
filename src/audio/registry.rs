use dashmap::DashMap;
use serenity::model::id::{ChannelId, GuildId};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::{
    audio::{
        session::{ConnectOutcome, Session, SessionHandle},
        sink::{PlaybackOptions, VoiceTransport},
    },
    error::{CommandError, PlaybackStateError},
};

/// Registro explícito `guild -> sesión`.
///
/// Una sesión existe mientras haya conexión de voz en esa guild; el actor se
/// borra solo del registro al terminar.
pub struct SessionRegistry {
    transport: Arc<dyn VoiceTransport>,
    options: PlaybackOptions,
    sessions: Arc<DashMap<GuildId, SessionHandle>>,
    /// Un solo `connect` en vuelo por guild
    connecting: DashMap<GuildId, Arc<Mutex<()>>>,
}

impl SessionRegistry {
    pub fn new(transport: Arc<dyn VoiceTransport>, options: PlaybackOptions) -> Self {
        Self {
            transport,
            options,
            sessions: Arc::new(DashMap::new()),
            connecting: DashMap::new(),
        }
    }

    pub fn get(&self, guild_id: GuildId) -> Option<SessionHandle> {
        self.sessions
            .get(&guild_id)
            .map(|h| h.clone())
            .filter(|h| !h.is_closed())
    }

    /// Sesión activa o `NotConnected`
    pub fn require(&self, guild_id: GuildId) -> Result<SessionHandle, CommandError> {
        self.get(guild_id)
            .ok_or_else(|| PlaybackStateError::NotConnected.into())
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Une al bot a `channel_id`: conecta, mueve, o no hace nada.
    ///
    /// Si la conexión falla no se crea sesión. Dos `connect` a la misma guild
    /// se atienden en orden: el segundo ve la sesión del primero.
    pub async fn connect(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
    ) -> Result<ConnectOutcome, CommandError> {
        let lock = self.connecting.entry(guild_id).or_default().clone();
        let _guard = lock.lock().await;

        if let Some(handle) = self.get(guild_id) {
            match handle.connect(channel_id).await {
                Err(CommandError::State(PlaybackStateError::NotConnected)) => {
                    // El actor terminó entre medio; se crea una sesión nueva
                    debug!("Sesión {} cerrada, reconectando", handle.id());
                    self.sessions
                        .remove_if(&guild_id, |_, h| h.id() == handle.id());
                }
                other => return other,
            }
        }

        let connection = self.transport.connect(guild_id, channel_id).await?;
        let handle = Session::spawn(guild_id, connection, self.options, self.sessions.clone());
        if let Some(stale) = self.sessions.insert(guild_id, handle) {
            // Con el lock tomado solo puede quedar un handle ya cerrado
            debug!("Descartado handle de sesión {}", stale.id());
        }

        info!(
            "🔊 Conectado a {} en guild {} ({} sesiones activas)",
            channel_id,
            guild_id,
            self.len()
        );
        Ok(ConnectOutcome::Joined)
    }

    /// Termina la sesión de la guild (comando `leave` o desconexión externa)
    pub async fn leave(&self, guild_id: GuildId) -> Result<(), CommandError> {
        self.require(guild_id)?.leave().await
    }
}
