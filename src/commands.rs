use std::sync::Arc;

use tracing::debug;
use twilight_model::channel::Message;

use crate::{
    controller::ControlError,
    helper,
    queue::{QueueEntry, QueueError},
    response_context::ResponseContext,
    state::State,
};

pub async fn join(state: Arc<State>, msg: Message) -> Result<(), anyhow::Error> {
    debug!(
        message = "handling command",
        command = "join",
        channel = %msg.channel_id,
        author = %msg.author.name,
    );
    let response = ResponseContext::new(Arc::clone(&state), &msg);
    let Some(guild_id) = msg.guild_id else {
        return Ok(());
    };
    state.controller.associate_text_channel(guild_id, msg.channel_id);

    let Some(channel_id) = helper::user_voice_channel(&state, guild_id, msg.author.id) else {
        response
            .with_content(ControlError::NoVoiceChannel.to_string())
            .await?;
        return Ok(());
    };

    match state.controller.join(guild_id, channel_id).await {
        Ok(()) => {
            response
                .with_content(format!("Joined <#{channel_id}>!"))
                .await?
        }
        Err(err) => response.with_content(err.to_string()).await?,
    };
    Ok(())
}

pub async fn play(state: Arc<State>, msg: Message, query: String) -> Result<(), anyhow::Error> {
    debug!(
        message = "handling command",
        command = "play",
        channel = %msg.channel_id,
        author = %msg.author.name,
    );
    let response = ResponseContext::new(Arc::clone(&state), &msg);
    let Some(guild_id) = msg.guild_id else {
        return Ok(());
    };
    state.controller.associate_text_channel(guild_id, msg.channel_id);

    if query.is_empty() {
        response
            .with_content(format!(
                "Usage: {}play <url or search term>",
                state.command_prefix
            ))
            .await?;
        return Ok(());
    }

    // The requester must sit in a voice channel before anything resolves.
    let Some(voice_channel) = helper::user_voice_channel(&state, guild_id, msg.author.id) else {
        response
            .with_content(ControlError::NoVoiceChannel.to_string())
            .await?;
        return Ok(());
    };
    if let Err(err) = state
        .controller
        .ensure_connected(guild_id, voice_channel)
        .await
    {
        response.with_content(err.to_string()).await?;
        return Ok(());
    }

    let entry = match state.source.resolve(&query).await {
        Ok(resolved) => QueueEntry::new(resolved.title, resolved.canonical_url),
        Err(source) => {
            response
                .with_content(format!("An error occurred: {source}"))
                .await?;
            return Ok(());
        }
    };
    let title = entry.title.clone();
    state.controller.push(guild_id, entry);
    response
        .with_content(format!("Added to queue: **{title}**"))
        .await?;

    if let Err(err) = state.controller.ensure_playing(guild_id).await {
        response.with_content(err.to_string()).await?;
    }
    Ok(())
}

pub async fn add(state: Arc<State>, msg: Message, query: String) -> Result<(), anyhow::Error> {
    debug!(
        message = "handling command",
        command = "add",
        channel = %msg.channel_id,
        author = %msg.author.name,
    );
    let response = ResponseContext::new(Arc::clone(&state), &msg);
    let Some(guild_id) = msg.guild_id else {
        return Ok(());
    };
    state.controller.associate_text_channel(guild_id, msg.channel_id);

    if query.is_empty() {
        response
            .with_content(format!(
                "Usage: {}add <url or search term>",
                state.command_prefix
            ))
            .await?;
        return Ok(());
    }

    let entry = match state.source.resolve(&query).await {
        Ok(resolved) => QueueEntry::new(resolved.title, resolved.canonical_url),
        Err(source) => {
            response
                .with_content(format!("An error occurred: {source}"))
                .await?;
            return Ok(());
        }
    };
    let title = entry.title.clone();
    state.controller.push(guild_id, entry);
    response
        .with_content(format!("Added to queue: **{title}**"))
        .await?;
    Ok(())
}

pub async fn pause(state: Arc<State>, msg: Message) -> Result<(), anyhow::Error> {
    debug!(
        message = "handling command",
        command = "pause",
        channel = %msg.channel_id,
        author = %msg.author.name,
    );
    let response = ResponseContext::new(Arc::clone(&state), &msg);
    let Some(guild_id) = msg.guild_id else {
        return Ok(());
    };
    state.controller.associate_text_channel(guild_id, msg.channel_id);

    match state.controller.pause(guild_id).await {
        Ok(()) => response.with_content("Paused the music").await?,
        Err(err) => response.with_content(err.to_string()).await?,
    };
    Ok(())
}

pub async fn resume(state: Arc<State>, msg: Message) -> Result<(), anyhow::Error> {
    debug!(
        message = "handling command",
        command = "resume",
        channel = %msg.channel_id,
        author = %msg.author.name,
    );
    let response = ResponseContext::new(Arc::clone(&state), &msg);
    let Some(guild_id) = msg.guild_id else {
        return Ok(());
    };
    state.controller.associate_text_channel(guild_id, msg.channel_id);

    match state.controller.resume(guild_id).await {
        Ok(()) => response.with_content("Resumed the music").await?,
        Err(err) => response.with_content(err.to_string()).await?,
    };
    Ok(())
}

pub async fn skip(state: Arc<State>, msg: Message) -> Result<(), anyhow::Error> {
    debug!(
        message = "handling command",
        command = "next",
        channel = %msg.channel_id,
        author = %msg.author.name,
    );
    let response = ResponseContext::new(Arc::clone(&state), &msg);
    let Some(guild_id) = msg.guild_id else {
        return Ok(());
    };
    state.controller.associate_text_channel(guild_id, msg.channel_id);

    match state.controller.skip(guild_id).await {
        Ok(()) => response.with_content("Skipped the current song").await?,
        Err(err) => response.with_content(err.to_string()).await?,
    };
    Ok(())
}

pub async fn list(state: Arc<State>, msg: Message) -> Result<(), anyhow::Error> {
    debug!(
        message = "handling command",
        command = "list",
        channel = %msg.channel_id,
        author = %msg.author.name,
    );
    let response = ResponseContext::new(Arc::clone(&state), &msg);
    let Some(guild_id) = msg.guild_id else {
        return Ok(());
    };
    state.controller.associate_text_channel(guild_id, msg.channel_id);

    let entries = state.controller.playlist(guild_id);
    if entries.is_empty() {
        response
            .with_content(QueueError::Empty.to_string())
            .await?;
        return Ok(());
    }

    let mut text = String::from("Current queue:\n");
    for (index, entry) in entries.iter().enumerate() {
        text.push_str(&format!("{}. {}\n", index + 1, entry.title));
    }
    response.with_content(text.trim_end()).await?;
    Ok(())
}

pub async fn remove(state: Arc<State>, msg: Message, needle: String) -> Result<(), anyhow::Error> {
    debug!(
        message = "handling command",
        command = "remove",
        channel = %msg.channel_id,
        author = %msg.author.name,
    );
    let response = ResponseContext::new(Arc::clone(&state), &msg);
    let Some(guild_id) = msg.guild_id else {
        return Ok(());
    };
    state.controller.associate_text_channel(guild_id, msg.channel_id);

    if needle.is_empty() {
        response
            .with_content(format!("Usage: {}remove <song title>", state.command_prefix))
            .await?;
        return Ok(());
    }

    match state.controller.remove(guild_id, &needle) {
        Ok(entry) => {
            response
                .with_content(format!("Removed **{}** from the queue", entry.title))
                .await?
        }
        Err(err) => response.with_content(err.to_string()).await?,
    };
    Ok(())
}

pub async fn exit(state: Arc<State>, msg: Message) -> Result<(), anyhow::Error> {
    debug!(
        message = "handling command",
        command = "exit",
        channel = %msg.channel_id,
        author = %msg.author.name,
    );
    let response = ResponseContext::new(Arc::clone(&state), &msg);
    let Some(guild_id) = msg.guild_id else {
        return Ok(());
    };
    state.controller.associate_text_channel(guild_id, msg.channel_id);

    match state.controller.teardown(guild_id).await {
        Ok(()) => {
            response
                .with_content("Queue cleared and disconnected")
                .await?
        }
        Err(err) => response.with_content(err.to_string()).await?,
    };
    Ok(())
}

pub async fn volume(state: Arc<State>, msg: Message, argument: String) -> Result<(), anyhow::Error> {
    debug!(
        message = "handling command",
        command = "volume",
        channel = %msg.channel_id,
        author = %msg.author.name,
    );
    let response = ResponseContext::new(Arc::clone(&state), &msg);
    let Some(guild_id) = msg.guild_id else {
        return Ok(());
    };
    state.controller.associate_text_channel(guild_id, msg.channel_id);

    let Ok(value) = argument.parse::<i64>() else {
        response
            .with_content(format!("Usage: {}volume <0-1000>", state.command_prefix))
            .await?;
        return Ok(());
    };

    match state.controller.volume(guild_id, value).await {
        Ok(()) => {
            response
                .with_content(format!("Set the volume to {value}"))
                .await?
        }
        Err(err) => response.with_content(err.to_string()).await?,
    };
    Ok(())
}

pub async fn seek(state: Arc<State>, msg: Message, argument: String) -> Result<(), anyhow::Error> {
    debug!(
        message = "handling command",
        command = "seek",
        channel = %msg.channel_id,
        author = %msg.author.name,
    );
    let response = ResponseContext::new(Arc::clone(&state), &msg);
    let Some(guild_id) = msg.guild_id else {
        return Ok(());
    };
    state.controller.associate_text_channel(guild_id, msg.channel_id);

    let Ok(seconds) = argument.parse::<i64>() else {
        response
            .with_content(format!("Usage: {}seek <seconds>", state.command_prefix))
            .await?;
        return Ok(());
    };

    match state.controller.seek(guild_id, seconds_to_ms(seconds)).await {
        Ok(()) => {
            response
                .with_content(format!("Seeked to {seconds}s"))
                .await?
        }
        Err(err) => response.with_content(err.to_string()).await?,
    };
    Ok(())
}

/// The player seeks in milliseconds; the command takes whole seconds.
fn seconds_to_ms(seconds: i64) -> i64 {
    seconds.saturating_mul(1000)
}

pub async fn show_commands(state: Arc<State>, msg: Message) -> Result<(), anyhow::Error> {
    debug!(
        message = "handling command",
        command = "commands",
        channel = %msg.channel_id,
        author = %msg.author.name,
    );
    let response = ResponseContext::new(Arc::clone(&state), &msg);

    let prefix = &state.command_prefix;
    let text = format!(
        "Available commands:\n\
         {prefix}join - Join your voice channel\n\
         {prefix}play <url or search term> - Queue a song and start playing\n\
         {prefix}add <url or search term> - Queue a song without starting playback\n\
         {prefix}pause - Pause the current song\n\
         {prefix}resume - Resume the paused song\n\
         {prefix}next - Skip to the next song in the queue\n\
         {prefix}list - Show the current queue\n\
         {prefix}remove <song title> - Remove a song from the queue\n\
         {prefix}search <query> - Search for a song and pick one to queue\n\
         {prefix}volume <0-1000> - Set the player volume\n\
         {prefix}seek <seconds> - Seek within the current song\n\
         {prefix}exit - Clear the queue and disconnect\n\
         {prefix}commands - Show this help message"
    );
    response.with_content(text).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seek_offsets_saturate_instead_of_overflowing() {
        assert_eq!(seconds_to_ms(90), 90_000);
        assert_eq!(seconds_to_ms(i64::MAX), i64::MAX);
        assert_eq!(seconds_to_ms(i64::MIN), i64::MIN);
    }
}
