use std::collections::VecDeque;
use tracing::{debug, info};

use crate::sources::ResolvedTrack;

/// Cola FIFO de tracks pendientes de una sesión.
///
/// Sin límite de tamaño; solo la muta el actor de la sesión.
#[derive(Debug, Default)]
pub struct TrackQueue {
    items: VecDeque<ResolvedTrack>,
}

impl TrackQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Agrega un track al final y devuelve su posición (1 = siguiente)
    pub fn enqueue(&mut self, track: ResolvedTrack) -> usize {
        info!("➕ Agregado a la cola: {}", track.title());
        self.items.push_back(track);
        self.items.len()
    }

    /// Saca el primer track de la cola
    pub fn pop_front(&mut self) -> Option<ResolvedTrack> {
        self.items.pop_front()
    }

    /// Limpia la cola
    pub fn clear(&mut self) {
        let removed = self.items.len();
        self.items.clear();
        debug!("🗑️ Cola limpiada ({} tracks)", removed);
    }

    /// Tracks pendientes, sin contar el que suena
    pub fn len(&self) -> usize {
        self.items.len()
    }
}
