use anyhow::Result;
use serenity::{
    builder::{
        CreateInteractionResponse, CreateInteractionResponseMessage, EditInteractionResponse,
    },
    model::{
        application::CommandInteraction,
        id::{ChannelId, GuildId, UserId},
    },
    prelude::Context,
};
use tracing::{info, warn};

use crate::{
    audio::{
        registry::SessionRegistry,
        session::{ConnectOutcome, Enqueued, SkipOutcome},
    },
    bot::MusicBot,
    error::{CommandError, PlaybackStateError},
    sources::{Resolver, TrackRequest},
};

/// Comando ya separado de serenity
#[derive(Debug, Clone)]
pub struct CommandRequest {
    pub guild_id: GuildId,
    pub user_mention: String,
    pub user_voice_channel: Option<ChannelId>,
    pub name: String,
    pub query: Option<String>,
}

/// Maneja comandos slash
pub async fn handle_command(ctx: &Context, command: CommandInteraction, bot: &MusicBot) -> Result<()> {
    let guild_id = command
        .guild_id
        .ok_or_else(|| anyhow::anyhow!("Comando usado fuera de un servidor"))?;

    info!(
        "📝 Comando /{} usado por {} en guild {}",
        command.data.name, command.user.name, guild_id
    );

    let request = CommandRequest {
        guild_id,
        user_mention: format!("<@{}>", command.user.id),
        user_voice_channel: user_voice_channel(ctx, guild_id, command.user.id),
        name: command.data.name.clone(),
        query: command
            .data
            .options
            .iter()
            .find(|opt| opt.name == "query")
            .and_then(|opt| opt.value.as_str())
            .map(str::to_string),
    };

    // `play` puede tardar en resolver: defer primero
    if request.name == "play" {
        command
            .create_response(
                &ctx.http,
                CreateInteractionResponse::Defer(CreateInteractionResponseMessage::new()),
            )
            .await?;

        let content = execute(&bot.registry, &bot.resolver, request).await;
        command
            .edit_response(&ctx.http, EditInteractionResponse::new().content(content))
            .await?;
        return Ok(());
    }

    let content = execute(&bot.registry, &bot.resolver, request).await;
    command
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Message(
                CreateInteractionResponseMessage::new().content(content),
            ),
        )
        .await?;

    Ok(())
}

/// Ejecuta un comando y devuelve el texto para el usuario.
///
/// Los errores de estado, resolución y transporte se traducen aquí; nunca
/// salen de la sesión.
pub async fn execute(registry: &SessionRegistry, resolver: &Resolver, request: CommandRequest) -> String {
    let guild_id = request.guild_id;

    let result = match request.name.as_str() {
        "hello" => Ok(format!("Hi there, {}!", request.user_mention)),
        "join" => handle_join(registry, &request).await,
        "play" => handle_play(registry, resolver, &request).await,
        "pause" => handle_pause(registry, guild_id).await,
        "resume" => handle_resume(registry, guild_id).await,
        "skip" => handle_skip(registry, guild_id).await,
        "queue" => handle_queue(registry, guild_id).await,
        "leave" => handle_leave(registry, guild_id).await,
        other => {
            warn!("Comando no reconocido: {}", other);
            Ok("❌ Unknown command".to_string())
        }
    };

    match result {
        Ok(content) => content,
        Err(e) => {
            info!("Comando /{} rechazado en guild {}: {}", request.name, guild_id, e);
            e.to_string()
        }
    }
}

async fn handle_join(registry: &SessionRegistry, request: &CommandRequest) -> Result<String, CommandError> {
    let Some(channel_id) = request.user_voice_channel else {
        return Ok("You aren't currently in a channel!".to_string());
    };

    let message = match registry.connect(request.guild_id, channel_id).await? {
        ConnectOutcome::Joined => format!("Joining channel <#{}>...", channel_id),
        ConnectOutcome::Moved => format!("Moving to channel <#{}>...", channel_id),
        ConnectOutcome::AlreadyConnected => format!("Already in channel <#{}>.", channel_id),
    };
    Ok(message)
}

async fn handle_play(
    registry: &SessionRegistry,
    resolver: &Resolver,
    request: &CommandRequest,
) -> Result<String, CommandError> {
    let query = request.query.as_deref().unwrap_or_default();
    if query.trim().is_empty() {
        return Ok("Please provide a URL or search terms.".to_string());
    }

    // Sin sesión no vale la pena resolver
    registry.require(request.guild_id)?;

    let track = resolver.resolve(&TrackRequest::new(query)).await?;

    // La sesión pudo terminar mientras se resolvía
    let message = match registry.require(request.guild_id)?.enqueue(track).await? {
        Enqueued::NowPlaying(track) => format!("🎵 Now playing: **{}**", track.title()),
        Enqueued::Queued { track, position } => {
            format!("➕ Queued **{}** at position {}", track.title(), position)
        }
    };
    Ok(message)
}

async fn handle_pause(registry: &SessionRegistry, guild_id: GuildId) -> Result<String, CommandError> {
    registry.require(guild_id)?.pause().await?;
    Ok("⏸️ Audio paused.".to_string())
}

async fn handle_resume(registry: &SessionRegistry, guild_id: GuildId) -> Result<String, CommandError> {
    registry.require(guild_id)?.resume().await?;
    Ok("▶️ Resuming audio...".to_string())
}

async fn handle_skip(registry: &SessionRegistry, guild_id: GuildId) -> Result<String, CommandError> {
    let SkipOutcome { skipped, next } = registry.require(guild_id)?.skip().await?;

    let message = match next {
        Some(next) => format!(
            "⏭️ Skipped **{}**. Now playing: **{}**",
            skipped.title(),
            next.title()
        ),
        None => format!(
            "⏭️ Skipped **{}**. Queue finished, leaving channel.",
            skipped.title()
        ),
    };
    Ok(message)
}

async fn handle_queue(registry: &SessionRegistry, guild_id: GuildId) -> Result<String, CommandError> {
    let status = registry.require(guild_id)?.status().await?;

    match status.current {
        Some(current) => Ok(format!(
            "🎵 Now playing: **{}** ({} more queued)",
            current.title(),
            status.queued
        )),
        None => Err(PlaybackStateError::QueueEmpty.into()),
    }
}

async fn handle_leave(registry: &SessionRegistry, guild_id: GuildId) -> Result<String, CommandError> {
    registry.leave(guild_id).await?;
    Ok("👋 Leaving channel...".to_string())
}

// Funciones auxiliares

fn user_voice_channel(ctx: &Context, guild_id: GuildId, user_id: UserId) -> Option<ChannelId> {
    let guild = guild_id.to_guild_cached(&ctx.cache)?;
    guild
        .voice_states
        .get(&user_id)
        .and_then(|voice_state| voice_state.channel_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        audio::{sink::PlaybackOptions, testing::FakeTransport},
        error::ResolutionError,
        sources::{MediaInfo, MockResolverBackend},
    };
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    const GUILD: u64 = 7;

    fn request(name: &str, query: Option<&str>, channel: Option<u64>) -> CommandRequest {
        CommandRequest {
            guild_id: GuildId::new(GUILD),
            user_mention: "<@99>".to_string(),
            user_voice_channel: channel.map(ChannelId::new),
            name: name.to_string(),
            query: query.map(str::to_string),
        }
    }

    fn resolver_returning(titles: &'static [&'static str]) -> Resolver {
        let mut backend = MockResolverBackend::new();
        let mut remaining = titles.iter();
        backend.expect_search().returning(move |_, _| {
            let title = remaining.next().ok_or(ResolutionError::NoResults)?;
            Ok(vec![MediaInfo {
                title: Some(title.to_string()),
                url: Some(format!("https://cdn.example.com/{}", title)),
                entries: None,
            }])
        });
        Resolver::new(backend)
    }

    fn setup(titles: &'static [&'static str]) -> (Arc<FakeTransport>, SessionRegistry, Resolver) {
        let transport = Arc::new(FakeTransport::default());
        let registry = SessionRegistry::new(transport.clone(), PlaybackOptions::default());
        (transport, registry, resolver_returning(titles))
    }

    #[tokio::test]
    async fn test_hello_mentions_user() {
        let (_t, registry, resolver) = setup(&[]);
        let reply = execute(&registry, &resolver, request("hello", None, None)).await;
        assert_eq!(reply, "Hi there, <@99>!");
    }

    #[tokio::test]
    async fn test_join_requires_user_in_voice() {
        let (transport, registry, resolver) = setup(&[]);
        let reply = execute(&registry, &resolver, request("join", None, None)).await;

        assert_eq!(reply, "You aren't currently in a channel!");
        assert!(transport.connections().is_empty());
    }

    #[tokio::test]
    async fn test_play_without_session() {
        let (_t, registry, resolver) = setup(&["song"]);
        let reply = execute(&registry, &resolver, request("play", Some("song"), Some(1))).await;
        assert_eq!(reply, "Not currently in a voice channel.");
    }

    #[tokio::test]
    async fn test_join_play_queue_flow() {
        let (_t, registry, resolver) = setup(&["first", "second"]);

        let reply = execute(&registry, &resolver, request("join", None, Some(5))).await;
        assert_eq!(reply, "Joining channel <#5>...");

        let reply = execute(&registry, &resolver, request("play", Some("first"), Some(5))).await;
        assert_eq!(reply, "🎵 Now playing: **first**");

        let reply = execute(&registry, &resolver, request("play", Some("second"), Some(5))).await;
        assert_eq!(reply, "➕ Queued **second** at position 1");

        let reply = execute(&registry, &resolver, request("queue", None, None)).await;
        assert_eq!(reply, "🎵 Now playing: **first** (1 more queued)");
    }

    #[tokio::test]
    async fn test_play_with_no_search_results() {
        let (_t, registry, resolver) = setup(&[]);
        execute(&registry, &resolver, request("join", None, Some(5))).await;

        let reply = execute(&registry, &resolver, request("play", Some("???"), Some(5))).await;
        assert_eq!(reply, "No results found");
    }

    #[tokio::test]
    async fn test_pause_resume_messages() {
        let (_t, registry, resolver) = setup(&["a"]);
        execute(&registry, &resolver, request("join", None, Some(5))).await;
        execute(&registry, &resolver, request("play", Some("a"), Some(5))).await;

        let reply = execute(&registry, &resolver, request("pause", None, None)).await;
        assert_eq!(reply, "⏸️ Audio paused.");
        let reply = execute(&registry, &resolver, request("pause", None, None)).await;
        assert_eq!(reply, "Audio is already paused.");

        let reply = execute(&registry, &resolver, request("resume", None, None)).await;
        assert_eq!(reply, "▶️ Resuming audio...");
        let reply = execute(&registry, &resolver, request("resume", None, None)).await;
        assert_eq!(reply, "Audio is not paused.");
    }

    #[tokio::test]
    async fn test_skip_and_leave_messages() {
        let (transport, registry, resolver) = setup(&["a", "b"]);
        execute(&registry, &resolver, request("join", None, Some(5))).await;
        execute(&registry, &resolver, request("play", Some("a"), Some(5))).await;
        execute(&registry, &resolver, request("play", Some("b"), Some(5))).await;

        let reply = execute(&registry, &resolver, request("skip", None, None)).await;
        assert_eq!(reply, "⏭️ Skipped **a**. Now playing: **b**");

        let reply = execute(&registry, &resolver, request("leave", None, None)).await;
        assert_eq!(reply, "👋 Leaving channel...");
        assert_eq!(transport.last().disconnects(), 1);

        let reply = execute(&registry, &resolver, request("skip", None, None)).await;
        assert_eq!(reply, "Not currently in a voice channel.");
    }

    #[tokio::test]
    async fn test_queue_on_idle_session() {
        let (_t, registry, resolver) = setup(&[]);
        execute(&registry, &resolver, request("join", None, Some(5))).await;

        let reply = execute(&registry, &resolver, request("queue", None, None)).await;
        assert_eq!(reply, "The queue is empty.");

        let reply = execute(&registry, &resolver, request("skip", None, None)).await;
        assert_eq!(reply, "Nothing to skip.");
    }
}
