//! Recording fakes for the voice transport and media sink.

use async_trait::async_trait;
use parking_lot::Mutex;
use serenity::model::id::{ChannelId, GuildId};
use std::{
    collections::HashSet,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
    },
};

use super::sink::{
    CompletionCallback, MediaSink, PlaybackOptions, VoiceConnection, VoiceTransport,
};
use crate::error::TransportError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkCall {
    Play(String),
    Stop,
    Pause,
    Resume,
}

/// Sink que guarda el callback del track actual para dispararlo a mano.
///
/// Igual que songbird, `stop` dispara el callback pendiente sin error.
#[derive(Default)]
pub struct FakeSink {
    calls: Mutex<Vec<SinkCall>>,
    pending: Mutex<Option<CompletionCallback>>,
    failing: Mutex<HashSet<String>>,
}

impl FakeSink {
    pub fn calls(&self) -> Vec<SinkCall> {
        self.calls.lock().clone()
    }

    pub fn played(&self) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                SinkCall::Play(uri) => Some(uri.clone()),
                _ => None,
            })
            .collect()
    }

    /// `play` con esta URI devuelve error
    pub fn fail_uri(&self, uri: &str) {
        self.failing.lock().insert(uri.to_string());
    }

    /// Simula el fin del track actual. Devuelve `false` si no había ninguno.
    pub fn finish_current(&self, error: Option<TransportError>) -> bool {
        let callback = self.pending.lock().take();
        match callback {
            Some(callback) => {
                callback(error);
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl MediaSink for FakeSink {
    async fn play(
        &self,
        uri: &str,
        _options: &PlaybackOptions,
        on_complete: CompletionCallback,
    ) -> Result<(), TransportError> {
        self.calls.lock().push(SinkCall::Play(uri.to_string()));
        if self.failing.lock().contains(uri) {
            return Err(TransportError::new(format!("cannot open {}", uri)));
        }
        *self.pending.lock() = Some(on_complete);
        Ok(())
    }

    async fn stop(&self) -> Result<(), TransportError> {
        self.calls.lock().push(SinkCall::Stop);
        self.finish_current(None);
        Ok(())
    }

    async fn pause(&self) -> Result<(), TransportError> {
        self.calls.lock().push(SinkCall::Pause);
        Ok(())
    }

    async fn resume(&self) -> Result<(), TransportError> {
        self.calls.lock().push(SinkCall::Resume);
        Ok(())
    }
}

pub struct FakeConnection {
    sink: Arc<FakeSink>,
    channel: Mutex<Option<ChannelId>>,
    moves: Mutex<Vec<ChannelId>>,
    disconnects: AtomicUsize,
}

impl FakeConnection {
    pub fn new(channel_id: ChannelId) -> Self {
        Self {
            sink: Arc::new(FakeSink::default()),
            channel: Mutex::new(Some(channel_id)),
            moves: Mutex::new(Vec::new()),
            disconnects: AtomicUsize::new(0),
        }
    }

    pub fn fake_sink(&self) -> Arc<FakeSink> {
        self.sink.clone()
    }

    pub fn moves(&self) -> Vec<ChannelId> {
        self.moves.lock().clone()
    }

    pub fn disconnects(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VoiceConnection for FakeConnection {
    async fn move_to(&self, channel_id: ChannelId) -> Result<(), TransportError> {
        self.moves.lock().push(channel_id);
        *self.channel.lock() = Some(channel_id);
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
        *self.channel.lock() = None;
        Ok(())
    }

    async fn is_connected(&self) -> bool {
        self.channel.lock().is_some()
    }

    async fn current_channel(&self) -> Option<ChannelId> {
        *self.channel.lock()
    }

    fn sink(&self) -> Arc<dyn MediaSink> {
        self.sink.clone()
    }
}

#[derive(Default)]
pub struct FakeTransport {
    connections: Mutex<Vec<Arc<FakeConnection>>>,
    failing: AtomicBool,
}

impl FakeTransport {
    /// Transporte cuyo `connect` siempre falla
    pub fn failing() -> Self {
        let transport = Self::default();
        transport.failing.store(true, Ordering::SeqCst);
        transport
    }

    pub fn connections(&self) -> Vec<Arc<FakeConnection>> {
        self.connections.lock().clone()
    }

    pub fn last(&self) -> Arc<FakeConnection> {
        self.connections
            .lock()
            .last()
            .cloned()
            .expect("no connection was opened")
    }
}

#[async_trait]
impl VoiceTransport for FakeTransport {
    async fn connect(
        &self,
        _guild_id: GuildId,
        channel_id: ChannelId,
    ) -> Result<Arc<dyn VoiceConnection>, TransportError> {
        // Como el join real, deja correr a otros comandos mientras conecta
        tokio::task::yield_now().await;

        if self.failing.load(Ordering::SeqCst) {
            return Err(TransportError::new("missing Connect permission"));
        }
        let connection = Arc::new(FakeConnection::new(channel_id));
        self.connections.lock().push(connection.clone());
        Ok(connection)
    }
}
