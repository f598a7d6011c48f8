use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::{
    audio::{
        queue::TrackQueue,
        sink::{CompletionCallback, MediaSink, PlaybackOptions},
    },
    error::{CommandError, PlaybackStateError, TransportError},
    sources::ResolvedTrack,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Playing,
    Paused,
}

/// Aviso del sink de que un track terminó, ya llevado al actor de la sesión.
#[derive(Debug)]
pub struct Completion {
    pub generation: u64,
    pub error: Option<TransportError>,
}

/// Resultado de intentar avanzar al siguiente track
#[derive(Debug, Clone, PartialEq)]
pub enum Advance {
    Started(ResolvedTrack),
    /// La cola quedó vacía; `last_error` es el fallo del último intento, si hubo
    Exhausted { last_error: Option<TransportError> },
}

/// State machine for one session's playback.
///
/// Every started track gets a fresh generation number. The completion
/// callback handed to the sink only forwards `(generation, error)` over a
/// channel; the session actor feeds it back through [`Self::on_complete`],
/// so the controller is only ever mutated from the actor. Completions whose
/// generation is no longer current (skipped or stopped tracks) are dropped.
pub struct PlaybackController {
    sink: Arc<dyn MediaSink>,
    options: PlaybackOptions,
    completions: mpsc::UnboundedSender<Completion>,
    state: PlaybackState,
    current: Option<ResolvedTrack>,
    generation: u64,
}

impl PlaybackController {
    pub fn new(
        sink: Arc<dyn MediaSink>,
        options: PlaybackOptions,
        completions: mpsc::UnboundedSender<Completion>,
    ) -> Self {
        Self {
            sink,
            options,
            completions,
            state: PlaybackState::Idle,
            current: None,
            generation: 0,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn current(&self) -> Option<&ResolvedTrack> {
        self.current.as_ref()
    }

    /// Saca la cabeza de la cola y la manda al sink.
    ///
    /// Un track que el sink rechaza se registra y se salta; con la cola vacía
    /// el controlador queda en `Idle`.
    pub async fn play_next(&mut self, queue: &mut TrackQueue) -> Advance {
        let mut last_error = None;

        while let Some(track) = queue.pop_front() {
            // Cualquier callback pendiente queda obsoleto
            self.generation += 1;
            let callback = self.completion_callback(self.generation);

            match self.sink.play(track.uri(), &self.options, callback).await {
                Ok(()) => {
                    info!("🎵 Reproduciendo: {}", track.title());
                    self.state = PlaybackState::Playing;
                    self.current = Some(track.clone());
                    return Advance::Started(track);
                }
                Err(e) => {
                    error!("❌ Error al reproducir '{}': {}", track.title(), e);
                    last_error = Some(e);
                }
            }
        }

        self.generation += 1;
        self.state = PlaybackState::Idle;
        self.current = None;
        debug!("Cola vacía, controlador en Idle");
        Advance::Exhausted { last_error }
    }

    /// Procesa el fin de un track. `None` si la notificación es obsoleta.
    pub async fn on_complete(
        &mut self,
        completion: Completion,
        queue: &mut TrackQueue,
    ) -> Option<Advance> {
        if completion.generation != self.generation || self.state == PlaybackState::Idle {
            debug!(
                "Ignorando fin de track obsoleto (gen {}, actual {})",
                completion.generation, self.generation
            );
            return None;
        }

        let title = self.current.as_ref().map_or("?", |t| t.title()).to_string();
        match completion.error {
            // Un error en un track nunca frena el resto de la cola
            Some(e) => error!("❌ Error de reproducción en '{}': {}", title, e),
            None => debug!("Track terminado: {}", title),
        }

        Some(self.play_next(queue).await)
    }

    pub async fn pause(&mut self) -> Result<(), CommandError> {
        match self.state {
            PlaybackState::Idle => Err(PlaybackStateError::NothingPlaying.into()),
            PlaybackState::Paused => Err(PlaybackStateError::AlreadyPaused.into()),
            PlaybackState::Playing => {
                self.sink.pause().await?;
                self.state = PlaybackState::Paused;
                info!("⏸️ Reproducción pausada");
                Ok(())
            }
        }
    }

    pub async fn resume(&mut self) -> Result<(), CommandError> {
        match self.state {
            PlaybackState::Paused => {
                self.sink.resume().await?;
                self.state = PlaybackState::Playing;
                info!("▶️ Reproducción reanudada");
                Ok(())
            }
            _ => Err(PlaybackStateError::NotPaused.into()),
        }
    }

    /// Corta el track actual y avanza exactamente una vez.
    ///
    /// El fin que el sink reporte por el `stop` llega con una generación vieja
    /// y se descarta.
    pub async fn skip(
        &mut self,
        queue: &mut TrackQueue,
    ) -> Result<(ResolvedTrack, Advance), PlaybackStateError> {
        if self.state == PlaybackState::Idle {
            return Err(PlaybackStateError::NothingToSkip);
        }

        let skipped = self.current.take().ok_or(PlaybackStateError::NothingToSkip)?;
        if let Err(e) = self.sink.stop().await {
            warn!("Error al detener '{}': {}", skipped.title(), e);
        }
        info!("⏭️ Saltado: {}", skipped.title());

        let advance = self.play_next(queue).await;
        Ok((skipped, advance))
    }

    /// Detiene lo que suene y deja el controlador en `Idle` sin avanzar
    pub async fn stop(&mut self) {
        if self.state != PlaybackState::Idle {
            self.generation += 1;
            if let Err(e) = self.sink.stop().await {
                warn!("Error al detener reproducción: {}", e);
            }
        }
        self.state = PlaybackState::Idle;
        self.current = None;
    }

    fn completion_callback(&self, generation: u64) -> CompletionCallback {
        let completions = self.completions.clone();
        Box::new(move |error| {
            // El actor puede haber terminado ya; entonces no hay nada que avanzar
            let _ = completions.send(Completion { generation, error });
        })
    }
}
