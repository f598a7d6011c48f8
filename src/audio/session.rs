use dashmap::DashMap;
use serenity::model::id::{ChannelId, GuildId};
use std::{
    ops::ControlFlow,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::{
    audio::{
        player::{Advance, Completion, PlaybackController, PlaybackState},
        queue::TrackQueue,
        sink::{PlaybackOptions, VoiceConnection},
    },
    error::{CommandError, PlaybackStateError, TransportError},
    sources::ResolvedTrack,
};

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectOutcome {
    Joined,
    Moved,
    AlreadyConnected,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Enqueued {
    NowPlaying(ResolvedTrack),
    Queued { track: ResolvedTrack, position: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkipOutcome {
    pub skipped: ResolvedTrack,
    pub next: Option<ResolvedTrack>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionStatus {
    pub state: PlaybackState,
    pub current: Option<ResolvedTrack>,
    pub queued: usize,
}

enum SessionCommand {
    Connect {
        channel_id: ChannelId,
        reply: oneshot::Sender<Result<ConnectOutcome, TransportError>>,
    },
    Enqueue {
        track: ResolvedTrack,
        reply: oneshot::Sender<Result<Enqueued, CommandError>>,
    },
    Pause {
        reply: oneshot::Sender<Result<(), CommandError>>,
    },
    Resume {
        reply: oneshot::Sender<Result<(), CommandError>>,
    },
    Skip {
        reply: oneshot::Sender<Result<SkipOutcome, CommandError>>,
    },
    Status {
        reply: oneshot::Sender<SessionStatus>,
    },
    Leave {
        reply: oneshot::Sender<()>,
    },
}

/// Handle barato para hablar con el actor de una sesión.
///
/// Si el actor ya terminó, todas las operaciones devuelven `NotConnected`.
#[derive(Clone)]
pub struct SessionHandle {
    id: u64,
    commands: mpsc::UnboundedSender<SessionCommand>,
}

impl SessionHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }

    pub async fn connect(&self, channel_id: ChannelId) -> Result<ConnectOutcome, CommandError> {
        Ok(self
            .request(|reply| SessionCommand::Connect { channel_id, reply })
            .await??)
    }

    /// Agrega a la cola; si no sonaba nada, arranca la reproducción
    pub async fn enqueue(&self, track: ResolvedTrack) -> Result<Enqueued, CommandError> {
        self.request(|reply| SessionCommand::Enqueue { track, reply })
            .await?
    }

    pub async fn pause(&self) -> Result<(), CommandError> {
        self.request(|reply| SessionCommand::Pause { reply }).await?
    }

    pub async fn resume(&self) -> Result<(), CommandError> {
        self.request(|reply| SessionCommand::Resume { reply }).await?
    }

    pub async fn skip(&self) -> Result<SkipOutcome, CommandError> {
        self.request(|reply| SessionCommand::Skip { reply }).await?
    }

    pub async fn status(&self) -> Result<SessionStatus, CommandError> {
        self.request(|reply| SessionCommand::Status { reply }).await
    }

    /// Detiene, limpia la cola y desconecta. La sesión deja de existir.
    pub async fn leave(&self) -> Result<(), CommandError> {
        self.request(|reply| SessionCommand::Leave { reply }).await
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> SessionCommand,
    ) -> Result<T, CommandError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(command(reply))
            .map_err(|_| PlaybackStateError::NotConnected)?;
        Ok(response
            .await
            .map_err(|_| PlaybackStateError::NotConnected)?)
    }
}

/// Actor dueño de la cola, el controlador y la conexión de una guild.
///
/// Comandos y fines de track llegan por canales distintos pero se atienden
/// en el mismo loop, uno por vez.
pub(crate) struct Session {
    id: u64,
    guild_id: GuildId,
    connection: Arc<dyn VoiceConnection>,
    queue: TrackQueue,
    controller: PlaybackController,
    sessions: Arc<DashMap<GuildId, SessionHandle>>,
}

impl Session {
    /// Lanza el actor y devuelve su handle. No lo registra.
    pub(crate) fn spawn(
        guild_id: GuildId,
        connection: Arc<dyn VoiceConnection>,
        options: PlaybackOptions,
        sessions: Arc<DashMap<GuildId, SessionHandle>>,
    ) -> SessionHandle {
        let id = NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed);
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();

        let session = Self {
            id,
            guild_id,
            controller: PlaybackController::new(connection.sink(), options, completions_tx),
            connection,
            queue: TrackQueue::new(),
            sessions,
        };

        tokio::spawn(session.run(commands_rx, completions_rx));

        SessionHandle {
            id,
            commands: commands_tx,
        }
    }

    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<SessionCommand>,
        mut completions: mpsc::UnboundedReceiver<Completion>,
    ) {
        info!("🎛️ Sesión {} iniciada en guild {}", self.id, self.guild_id);

        loop {
            let flow = tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => self.handle_command(command).await,
                    None => {
                        // Nadie puede volver a hablarle a esta sesión
                        info!(
                            "🔌 Sesión {} sin handles, cerrando guild {}",
                            self.id, self.guild_id
                        );
                        self.teardown().await;
                        ControlFlow::Break(())
                    }
                },
                Some(completion) = completions.recv() => self.handle_completion(completion).await,
            };

            if flow.is_break() {
                break;
            }
        }

        self.unregister();
        info!("🔚 Sesión {} terminada en guild {}", self.id, self.guild_id);
    }

    async fn handle_command(&mut self, command: SessionCommand) -> ControlFlow<()> {
        match command {
            SessionCommand::Connect { channel_id, reply } => {
                let _ = reply.send(self.connect(channel_id).await);
            }
            SessionCommand::Enqueue { track, reply } => {
                let _ = reply.send(self.enqueue(track).await);
            }
            SessionCommand::Pause { reply } => {
                let _ = reply.send(self.controller.pause().await);
            }
            SessionCommand::Resume { reply } => {
                let _ = reply.send(self.controller.resume().await);
            }
            SessionCommand::Skip { reply } => {
                let (skipped, advance) = match self.controller.skip(&mut self.queue).await {
                    Ok(result) => result,
                    Err(e) => {
                        let _ = reply.send(Err(e.into()));
                        return ControlFlow::Continue(());
                    }
                };

                let next = match advance {
                    Advance::Started(track) => Some(track),
                    Advance::Exhausted { .. } => None,
                };
                let flow = if next.is_none() {
                    info!("📭 Cola vacía tras saltar en guild {}", self.guild_id);
                    self.teardown().await;
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                };

                let _ = reply.send(Ok(SkipOutcome { skipped, next }));
                return flow;
            }
            SessionCommand::Status { reply } => {
                let _ = reply.send(SessionStatus {
                    state: self.controller.state(),
                    current: self.controller.current().cloned(),
                    queued: self.queue.len(),
                });
            }
            SessionCommand::Leave { reply } => {
                info!("👋 Saliendo del canal de voz en guild {}", self.guild_id);
                self.teardown().await;
                let _ = reply.send(());
                return ControlFlow::Break(());
            }
        }

        ControlFlow::Continue(())
    }

    async fn handle_completion(&mut self, completion: Completion) -> ControlFlow<()> {
        match self.controller.on_complete(completion, &mut self.queue).await {
            None | Some(Advance::Started(_)) => ControlFlow::Continue(()),
            Some(Advance::Exhausted { .. }) => {
                // Cola vacía después de un track: la sesión termina
                info!("📭 Cola vacía, desconectando de guild {}", self.guild_id);
                self.teardown().await;
                ControlFlow::Break(())
            }
        }
    }

    async fn connect(&mut self, channel_id: ChannelId) -> Result<ConnectOutcome, TransportError> {
        if self.connection.is_connected().await
            && self.connection.current_channel().await == Some(channel_id)
        {
            debug!("Ya conectado a {} en guild {}", channel_id, self.guild_id);
            return Ok(ConnectOutcome::AlreadyConnected);
        }

        self.connection.move_to(channel_id).await?;
        info!("🔀 Movido a {} en guild {}", channel_id, self.guild_id);
        Ok(ConnectOutcome::Moved)
    }

    async fn enqueue(&mut self, track: ResolvedTrack) -> Result<Enqueued, CommandError> {
        let position = self.queue.enqueue(track.clone());

        if self.controller.state() != PlaybackState::Idle {
            return Ok(Enqueued::Queued { track, position });
        }

        match self.controller.play_next(&mut self.queue).await {
            Advance::Started(track) => Ok(Enqueued::NowPlaying(track)),
            Advance::Exhausted {
                last_error: Some(e),
            } => Err(e.into()),
            Advance::Exhausted { last_error: None } => Err(PlaybackStateError::QueueEmpty.into()),
        }
    }

    /// Detiene, limpia la cola, desconecta y se quita del registro
    async fn teardown(&mut self) {
        self.controller.stop().await;
        self.queue.clear();

        if let Err(e) = self.connection.disconnect().await {
            warn!("Error al desconectar de guild {}: {}", self.guild_id, e);
        }

        self.unregister();
    }

    fn unregister(&self) {
        self.sessions
            .remove_if(&self.guild_id, |_, handle| handle.id == self.id);
    }
}
