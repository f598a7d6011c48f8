use anyhow::Result;
use serenity::{
    builder::{CreateCommand, CreateCommandOption},
    model::{application::CommandOptionType, id::GuildId},
    prelude::Context,
};

/// Registra comandos globales
pub async fn register_global_commands(ctx: &Context) -> Result<()> {
    for command in all_commands() {
        ctx.http.create_global_command(&command).await?;
    }

    Ok(())
}

/// Registra comandos para una guild específica (desarrollo)
pub async fn register_guild_commands(ctx: &Context, guild_id: GuildId) -> Result<()> {
    guild_id.set_commands(&ctx.http, all_commands()).await?;

    Ok(())
}

fn all_commands() -> Vec<CreateCommand> {
    vec![
        hello_command(),
        join_command(),
        play_command(),
        pause_command(),
        resume_command(),
        skip_command(),
        queue_command(),
        leave_command(),
    ]
}

fn hello_command() -> CreateCommand {
    CreateCommand::new("hello").description("Says hi back to user")
}

fn join_command() -> CreateCommand {
    CreateCommand::new("join").description("Join the current voice channel of the user")
}

fn play_command() -> CreateCommand {
    CreateCommand::new("play")
        .description("Play a URL or the first search result")
        .add_option(
            CreateCommandOption::new(CommandOptionType::String, "query", "URL or search terms")
                .required(true),
        )
}

fn pause_command() -> CreateCommand {
    CreateCommand::new("pause").description("Pauses the current audio")
}

fn resume_command() -> CreateCommand {
    CreateCommand::new("resume").description("Resumes the current audio")
}

fn skip_command() -> CreateCommand {
    CreateCommand::new("skip").description("Skip the current track")
}

fn queue_command() -> CreateCommand {
    CreateCommand::new("queue").description("Show what is playing and how many tracks are queued")
}

fn leave_command() -> CreateCommand {
    CreateCommand::new("leave").description("Leave the voice channel and clear the queue")
}
