//! # Audio Module
//!
//! Per-guild queue and playback for the bot.
//!
//! ## Architecture
//!
//! ### [`registry`] - Session Registry
//! - Explicit `GuildId -> SessionHandle` map, no globals
//! - Connect / move / no-op on `join`
//!
//! ### [`session`] - Session Actor
//! - One tokio task per voice connection
//! - Owns the queue, the playback controller and the connection
//! - Serializes user commands and track-end notifications
//!
//! ### [`player`] - Playback Controller
//! - `Idle` / `Playing` / `Paused` state machine
//! - Generation-tagged completion callbacks
//!
//! ### [`queue`] - Queue
//! - Plain FIFO of resolved tracks
//!
//! ### [`sink`] / [`voice`] - Transport Seams
//! - Traits for the voice transport and the media sink
//! - Songbird-backed implementations

pub mod player;
pub mod queue;
pub mod registry;
pub mod session;
pub mod sink;
pub mod voice;

#[cfg(test)]
pub(crate) mod testing;
