use dashmap::DashMap;
use twilight_model::id::{
    marker::{ChannelMarker, GuildMarker},
    Id,
};

use crate::queue::{QueueEntry, TrackQueue};

/// Where the playback loop currently stands for a guild.
///
/// `Resolving` and `Playing` both mean an advance owns the session; a second
/// advance started in either phase backs off immediately.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Phase {
    #[default]
    Idle,
    Resolving,
    Playing,
}

#[derive(Debug, Default)]
pub struct Session {
    pub queue: TrackQueue,
    pub phase: Phase,
    pub connected: bool,
    pub voice_channel: Option<Id<ChannelMarker>>,
    pub text_channel: Option<Id<ChannelMarker>>,
    pub current: Option<QueueEntry>,
    pub paused: bool,
    pub epoch: u64,
}

impl Session {
    /// Reset the playback machinery, leaving the queue and the text channel
    /// association alone.
    pub fn reset_playback(&mut self) {
        self.phase = Phase::Idle;
        self.current = None;
        self.paused = false;
    }

    /// Drop the voice session. Bumps the epoch so resolutions still in
    /// flight notice the teardown and abandon their result.
    pub fn release(&mut self) {
        self.reset_playback();
        self.connected = false;
        self.voice_channel = None;
        self.epoch += 1;
    }
}

/// Per-guild sessions, created lazily on first touch.
#[derive(Debug, Default)]
pub struct SessionStore {
    map: DashMap<Id<GuildMarker>, Session>,
}

impl SessionStore {
    /// Run `f` with exclusive access to the guild session.
    ///
    /// The map shard stays locked for the duration of `f`, so callers must
    /// not block or await inside the closure.
    pub fn with_session<F, V>(&self, guild_id: Id<GuildMarker>, f: F) -> V
    where
        F: FnOnce(&mut Session) -> V,
    {
        let mut session = self.map.entry(guild_id).or_default();
        f(&mut session)
    }

    pub fn associate_text_channel(&self, guild_id: Id<GuildMarker>, channel_id: Id<ChannelMarker>) {
        self.with_session(guild_id, |session| session.text_channel = Some(channel_id));
    }

    pub fn text_channel(&self, guild_id: Id<GuildMarker>) -> Option<Id<ChannelMarker>> {
        self.map.get(&guild_id).and_then(|session| session.text_channel)
    }
}
