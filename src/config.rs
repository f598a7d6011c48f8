use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::audio::sink::{PlaybackOptions, ReconnectPolicy};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    // Discord
    pub discord_token: String,
    pub guild_id: Option<u64>, // Registro de comandos en una sola guild

    // Audio
    pub default_volume: f32,

    // Resolver
    pub ytdlp_path: String,

    // Reconexión del stream
    pub reconnect_enabled: bool,
    pub reconnect_max_attempts: usize,
    pub reconnect_delay_max_secs: u64,
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();

        let config = Self {
            // Discord
            discord_token: std::env::var("DISCORD_TOKEN")
                .or_else(|_| std::env::var("BOT_TOKEN"))
                .map_err(|_| anyhow::anyhow!("DISCORD_TOKEN is not set"))?,
            guild_id: std::env::var("GUILD_ID")
                .or_else(|_| std::env::var("GUILD"))
                .ok()
                .and_then(|s| s.parse().ok()),

            // Audio
            default_volume: std::env::var("DEFAULT_VOLUME")
                .unwrap_or_else(|_| defaults.default_volume.to_string())
                .parse()?,

            // Resolver
            ytdlp_path: std::env::var("YTDLP_PATH").unwrap_or(defaults.ytdlp_path),

            // Reconexión
            reconnect_enabled: std::env::var("RECONNECT_ENABLED")
                .unwrap_or_else(|_| defaults.reconnect_enabled.to_string())
                .parse()?,
            reconnect_max_attempts: std::env::var("RECONNECT_MAX_ATTEMPTS")
                .unwrap_or_else(|_| defaults.reconnect_max_attempts.to_string())
                .parse()?,
            reconnect_delay_max_secs: std::env::var("RECONNECT_DELAY_MAX_SECS")
                .unwrap_or_else(|_| defaults.reconnect_delay_max_secs.to_string())
                .parse()?,
        };

        config.validate()?;

        Ok(config)
    }

    /// Validates configuration values for correctness.
    ///
    /// # Validation Rules
    ///
    /// - Token must not be empty
    /// - Volume must be between 0.0 and 2.0
    /// - Reconnect attempts and delay must be non-zero when reconnect is enabled
    pub fn validate(&self) -> Result<()> {
        if self.discord_token.trim().is_empty() {
            anyhow::bail!("Discord token must not be empty");
        }

        if !(0.0..=2.0).contains(&self.default_volume) {
            anyhow::bail!(
                "Default volume must be between 0.0 and 2.0, got: {}",
                self.default_volume
            );
        }

        if self.ytdlp_path.trim().is_empty() {
            anyhow::bail!("yt-dlp path must not be empty");
        }

        if self.reconnect_enabled {
            if self.reconnect_max_attempts == 0 {
                anyhow::bail!("Reconnect attempts must be greater than 0");
            }
            if self.reconnect_delay_max_secs == 0 {
                anyhow::bail!("Reconnect max delay must be greater than 0");
            }
        }

        Ok(())
    }

    /// Reconnect policy shared by every track of every session.
    pub fn reconnect_policy(&self) -> ReconnectPolicy {
        ReconnectPolicy {
            enabled: self.reconnect_enabled,
            max_attempts: self.reconnect_max_attempts,
            delay_max: Duration::from_secs(self.reconnect_delay_max_secs),
        }
    }

    /// Playback options built once and handed to the media sink for each track.
    pub fn playback_options(&self) -> PlaybackOptions {
        PlaybackOptions {
            volume: self.default_volume,
            reconnect: self.reconnect_policy(),
        }
    }

    /// Returns a summary of the current configuration for logging.
    ///
    /// Excludes the bot token.
    pub fn summary(&self) -> String {
        format!(
            "Config Summary:\n  \
            Discord: commands {}\n  \
            Audio: {}% vol\n  \
            Resolver: {}\n  \
            Reconnect: {} ({} attempts, {}s max delay)",
            self.guild_id
                .map_or("global".to_string(), |id| format!("in guild {}", id)),
            (self.default_volume * 100.0) as u32,
            self.ytdlp_path,
            if self.reconnect_enabled { "on" } else { "off" },
            self.reconnect_max_attempts,
            self.reconnect_delay_max_secs,
        )
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            // Discord (sin default - debe venir del entorno)
            discord_token: String::new(),
            guild_id: None,

            default_volume: 0.5,

            ytdlp_path: "yt-dlp".to_string(),

            reconnect_enabled: true,
            reconnect_max_attempts: 5,
            reconnect_delay_max_secs: 5,
        }
    }
}
