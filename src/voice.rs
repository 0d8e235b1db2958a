use std::sync::Arc;

use async_trait::async_trait;
use twilight_gateway::MessageSender;
use twilight_lavalink::{
    model::{Destroy, Pause, Play, Seek, Stop, Volume},
    Lavalink,
};
use twilight_model::{
    gateway::payload::outgoing::UpdateVoiceState,
    id::{
        marker::{ChannelMarker, GuildMarker},
        Id,
    },
};

/// Voice connectivity and stream control for one guild at a time.
#[async_trait]
pub trait VoiceBackend: Send + Sync {
    async fn connect(
        &self,
        guild_id: Id<GuildMarker>,
        channel_id: Id<ChannelMarker>,
    ) -> Result<(), anyhow::Error>;

    async fn disconnect(&self, guild_id: Id<GuildMarker>) -> Result<(), anyhow::Error>;

    /// Start playing the stream behind `handle`, replacing whatever the
    /// player was doing before.
    async fn play(&self, guild_id: Id<GuildMarker>, handle: &str) -> Result<(), anyhow::Error>;

    async fn set_pause(&self, guild_id: Id<GuildMarker>, paused: bool)
        -> Result<(), anyhow::Error>;

    /// Stop the current stream. The node reports the end of the stream
    /// through its event channel like any other completion.
    async fn stop(&self, guild_id: Id<GuildMarker>) -> Result<(), anyhow::Error>;

    async fn set_volume(&self, guild_id: Id<GuildMarker>, volume: i64)
        -> Result<(), anyhow::Error>;

    async fn seek(&self, guild_id: Id<GuildMarker>, position_ms: i64)
        -> Result<(), anyhow::Error>;
}

/// Voice through the gateway (channel membership) and a Lavalink node
/// (the actual audio).
pub struct LavalinkVoice {
    lavalink: Arc<Lavalink>,
    sender: MessageSender,
}

impl LavalinkVoice {
    pub fn new(lavalink: Arc<Lavalink>, sender: MessageSender) -> Self {
        Self { lavalink, sender }
    }
}

#[async_trait]
impl VoiceBackend for LavalinkVoice {
    async fn connect(
        &self,
        guild_id: Id<GuildMarker>,
        channel_id: Id<ChannelMarker>,
    ) -> Result<(), anyhow::Error> {
        self.sender
            .command(&UpdateVoiceState::new(guild_id, Some(channel_id), false, false))?;
        Ok(())
    }

    async fn disconnect(&self, guild_id: Id<GuildMarker>) -> Result<(), anyhow::Error> {
        // Tear the player down first; a failure here must not keep us
        // stuck in the channel.
        if let Ok(player) = self.lavalink.player(guild_id).await {
            player.send(Destroy::from(guild_id))?;
        }
        self.sender.command(&UpdateVoiceState::new(
            guild_id,
            None::<Id<ChannelMarker>>,
            false,
            false,
        ))?;
        Ok(())
    }

    async fn play(&self, guild_id: Id<GuildMarker>, handle: &str) -> Result<(), anyhow::Error> {
        let player = self.lavalink.player(guild_id).await?;
        player.send(Play::from((guild_id, handle)))?;
        Ok(())
    }

    async fn set_pause(
        &self,
        guild_id: Id<GuildMarker>,
        paused: bool,
    ) -> Result<(), anyhow::Error> {
        let player = self.lavalink.player(guild_id).await?;
        player.send(Pause::from((guild_id, paused)))?;
        Ok(())
    }

    async fn stop(&self, guild_id: Id<GuildMarker>) -> Result<(), anyhow::Error> {
        let player = self.lavalink.player(guild_id).await?;
        player.send(Stop::from(guild_id))?;
        Ok(())
    }

    async fn set_volume(
        &self,
        guild_id: Id<GuildMarker>,
        volume: i64,
    ) -> Result<(), anyhow::Error> {
        let player = self.lavalink.player(guild_id).await?;
        player.send(Volume::from((guild_id, volume)))?;
        Ok(())
    }

    async fn seek(
        &self,
        guild_id: Id<GuildMarker>,
        position_ms: i64,
    ) -> Result<(), anyhow::Error> {
        let player = self.lavalink.player(guild_id).await?;
        player.send(Seek::from((guild_id, position_ms)))?;
        Ok(())
    }
}
