//! # Bot Module
//!
//! Discord side of the bot: command registration, interaction dispatch and
//! voice state tracking.
//!
//! The [`MusicBot`] struct implements Serenity's [`EventHandler`] and owns:
//!
//! - the [`SessionRegistry`] with one session per connected guild
//! - the [`Resolver`] that turns `/play` input into playable tracks

use anyhow::Result;
use serenity::{
    all::{Context, EventHandler, GuildId, Interaction, Ready, VoiceState},
    async_trait,
};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

pub mod commands;
pub mod handlers;

use crate::{
    audio::registry::SessionRegistry, config::Config, error::CommandError, sources::Resolver,
};

/// Main Discord bot handler.
///
/// ## Thread Safety
///
/// Sessions are reached through the registry's [`dashmap::DashMap`]; each
/// session serializes its own mutations, so handlers for different guilds
/// never contend.
pub struct MusicBot {
    /// Bot configuration loaded from environment variables
    config: Arc<Config>,
    /// Sesiones de voz por guild
    pub registry: Arc<SessionRegistry>,
    /// URL / búsqueda -> track reproducible
    pub resolver: Arc<Resolver>,
}

impl MusicBot {
    pub fn new(config: Config, registry: Arc<SessionRegistry>, resolver: Arc<Resolver>) -> Self {
        Self {
            config: Arc::new(config),
            registry,
            resolver,
        }
    }

    /// Registers slash commands with Discord.
    ///
    /// With `GUILD_ID` set, commands go to that guild only (propagation is
    /// near-instant); otherwise they are registered globally.
    async fn register_commands(&self, ctx: &Context) -> Result<()> {
        info!("📝 Registrando comandos slash...");

        match self.config.guild_id {
            Some(guild_id) => {
                let guild_id = GuildId::new(guild_id);

                if !ctx.cache.guilds().contains(&guild_id) {
                    warn!("⚠️ El bot no está en la guild especificada: {}", guild_id);
                    return Ok(());
                }

                commands::register_guild_commands(ctx, guild_id)
                    .await
                    .map_err(|e| {
                        error!("❌ Error registrando comandos de guild: {:?}", e);
                        anyhow::anyhow!("Could not register guild commands. Check the 'applications.commands' permission.")
                    })?;
                info!("✅ Comandos de guild registrados para: {}", guild_id);
            }
            None => {
                commands::register_global_commands(ctx)
                    .await
                    .map_err(|e| {
                        error!("❌ Error registrando comandos globales: {:?}", e);
                        anyhow::anyhow!("Could not register global commands. Check the 'applications.commands' permission.")
                    })?;
                info!("✅ Comandos globales registrados");
            }
        }

        Ok(())
    }
}

#[async_trait]
impl EventHandler for MusicBot {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!("🤖 {} está en línea!", ready.user.name);
        info!("📊 Conectado a {} servidores", ready.guilds.len());

        if let Err(e) = self.register_commands(&ctx).await {
            error!("Error al registrar comandos: {:?}", e);
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        if let Interaction::Command(command_interaction) = interaction {
            if let Err(e) = handlers::handle_command(&ctx, command_interaction, self).await {
                error!("Error manejando comando: {:?}", e);
            }
        }
    }

    /// Si alguien desconecta al bot a mano, la sesión se cierra igual que con `/leave`.
    async fn voice_state_update(&self, ctx: Context, old: Option<VoiceState>, new: VoiceState) {
        let current_user_id = ctx.cache.current_user().id;
        if new.user_id != current_user_id || old.is_none() || new.channel_id.is_some() {
            return;
        }

        let Some(guild_id) = new.guild_id else {
            return;
        };

        info!("🔌 Bot desconectado en guild {}", guild_id);
        match self.registry.leave(guild_id).await {
            Ok(()) => info!("🧹 Sesión limpiada en guild {}", guild_id),
            // Nuestro propio leave también genera este evento
            Err(CommandError::State(_)) => debug!("Sin sesión activa en guild {}", guild_id),
            Err(e) => error!("Error al limpiar sesión: {:?}", e),
        }
    }
}
