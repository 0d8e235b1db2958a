use std::ops::RangeInclusive;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, warn};
use twilight_model::id::{
    marker::{ChannelMarker, GuildMarker},
    Id,
};

use crate::{
    notify::Notifier,
    queue::{QueueEntry, QueueError},
    session::{Phase, SessionStore},
    source::TrackSource,
    voice::VoiceBackend,
};

pub const VOLUME_BOUNDS: RangeInclusive<i64> = 0..=1000;

const REASON_REPLACED: &str = "REPLACED";
const REASON_LOAD_FAILED: &str = "LOAD_FAILED";

#[derive(Debug, Error)]
pub enum ControlError {
    #[error("You are not connected to a voice channel")]
    NoVoiceChannel,
    #[error("Already connected to that voice channel")]
    AlreadyConnected,
    #[error("Not connected to a voice channel")]
    NotConnected,
    #[error("No song is playing right now")]
    NothingPlaying,
    #[error("No music is playing right now")]
    NotPlaying,
    #[error("The music is not paused")]
    NotPaused,
    #[error("Selection timed out")]
    SelectionTimeout,
    #[error("volume value is out of bounds: {value}, must be in {bounds:?}")]
    VolumeOutOfBounds {
        value: i64,
        bounds: RangeInclusive<i64>,
    },
    #[error(transparent)]
    Queue(#[from] QueueError),
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// What the advance loop found when it claimed the session.
enum AdvanceStep {
    /// Another advance already owns the session.
    Busy,
    /// Nothing left to play.
    Drained { was_connected: bool },
    /// A track was popped and the session moved to `Resolving`.
    Entry { entry: QueueEntry, epoch: u64 },
}

/// Drives playback for every guild: owns the per-guild sessions and talks
/// to the track resolver, the voice backend and the notification sink.
pub struct Controller {
    sessions: SessionStore,
    source: Arc<dyn TrackSource>,
    voice: Arc<dyn VoiceBackend>,
    notifier: Arc<dyn Notifier>,
}

impl Controller {
    pub fn new(
        source: Arc<dyn TrackSource>,
        voice: Arc<dyn VoiceBackend>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            sessions: SessionStore::default(),
            source,
            voice,
            notifier,
        }
    }

    /// Remember where progress messages for this guild should go.
    pub fn associate_text_channel(&self, guild_id: Id<GuildMarker>, channel_id: Id<ChannelMarker>) {
        self.sessions.associate_text_channel(guild_id, channel_id);
    }

    pub fn push(&self, guild_id: Id<GuildMarker>, entry: QueueEntry) {
        debug!(message = "queueing track", guild = %guild_id, title = %entry.title);
        self.sessions
            .with_session(guild_id, |session| session.queue.push(entry));
    }

    pub fn remove(&self, guild_id: Id<GuildMarker>, needle: &str) -> Result<QueueEntry, ControlError> {
        let removed = self
            .sessions
            .with_session(guild_id, |session| session.queue.remove_first(needle))?;
        debug!(message = "removed track", guild = %guild_id, title = %removed.title);
        Ok(removed)
    }

    pub fn playlist(&self, guild_id: Id<GuildMarker>) -> Vec<QueueEntry> {
        self.sessions
            .with_session(guild_id, |session| session.queue.entries())
    }

    pub fn current(&self, guild_id: Id<GuildMarker>) -> Option<QueueEntry> {
        self.sessions
            .with_session(guild_id, |session| session.current.clone())
    }

    pub fn is_connected(&self, guild_id: Id<GuildMarker>) -> bool {
        self.sessions
            .with_session(guild_id, |session| session.connected)
    }

    pub fn is_playing(&self, guild_id: Id<GuildMarker>) -> bool {
        self.sessions
            .with_session(guild_id, |session| session.phase == Phase::Playing)
    }

    /// Connect to `channel_id`, moving there if connected elsewhere.
    pub async fn join(
        &self,
        guild_id: Id<GuildMarker>,
        channel_id: Id<ChannelMarker>,
    ) -> Result<(), ControlError> {
        let already_there = self.sessions.with_session(guild_id, |session| {
            session.connected && session.voice_channel == Some(channel_id)
        });
        if already_there {
            return Err(ControlError::AlreadyConnected);
        }

        self.voice.connect(guild_id, channel_id).await?;
        self.sessions.with_session(guild_id, |session| {
            session.connected = true;
            session.voice_channel = Some(channel_id);
        });
        Ok(())
    }

    /// Connect to `channel_id` unless some voice channel is already held.
    pub async fn ensure_connected(
        &self,
        guild_id: Id<GuildMarker>,
        channel_id: Id<ChannelMarker>,
    ) -> Result<(), ControlError> {
        let connected = self
            .sessions
            .with_session(guild_id, |session| session.connected);
        if connected {
            return Ok(());
        }

        self.voice.connect(guild_id, channel_id).await?;
        self.sessions.with_session(guild_id, |session| {
            session.connected = true;
            session.voice_channel = Some(channel_id);
        });
        Ok(())
    }

    /// Kick off playback when the session sits idle. Used by the enqueue
    /// paths so a first track starts without an explicit skip.
    pub async fn ensure_playing(&self, guild_id: Id<GuildMarker>) -> Result<(), ControlError> {
        let should_advance = self.sessions.with_session(guild_id, |session| {
            session.connected && session.phase == Phase::Idle
        });
        if should_advance {
            self.advance(guild_id).await?;
        }
        Ok(())
    }

    /// Move playback to the next queued track.
    ///
    /// Pops entries in order until one of them both resolves and starts;
    /// every failure is reported to the guild's text channel and skipped.
    /// An empty queue releases the voice channel. At most one advance runs
    /// per guild: the session phase acts as the claim, taken and returned
    /// under the session lock.
    pub async fn advance(&self, guild_id: Id<GuildMarker>) -> Result<(), ControlError> {
        loop {
            let step = self.sessions.with_session(guild_id, |session| {
                if session.phase != Phase::Idle {
                    return AdvanceStep::Busy;
                }
                match session.queue.pop_front() {
                    Ok(entry) => {
                        session.phase = Phase::Resolving;
                        AdvanceStep::Entry {
                            entry,
                            epoch: session.epoch,
                        }
                    }
                    Err(_) => {
                        let was_connected = session.connected;
                        session.release();
                        AdvanceStep::Drained { was_connected }
                    }
                }
            });

            let (entry, epoch) = match step {
                AdvanceStep::Busy => return Ok(()),
                AdvanceStep::Drained { was_connected } => {
                    if was_connected {
                        debug!(message = "queue drained, leaving voice", guild = %guild_id);
                        self.voice.disconnect(guild_id).await?;
                        self.report(guild_id, "Queue ended. Disconnected.".to_owned())
                            .await;
                    }
                    return Ok(());
                }
                AdvanceStep::Entry { entry, epoch } => (entry, epoch),
            };

            debug!(message = "resolving queued track", guild = %guild_id, title = %entry.title);
            let resolved = self.source.resolve(&entry.source_url).await;

            // The session may have been torn down while the resolver ran.
            if self.is_stale(guild_id, epoch) {
                debug!(
                    message = "session ended during resolution, dropping track",
                    guild = %guild_id,
                    title = %entry.title,
                );
                return Ok(());
            }

            let resolved = match resolved {
                Ok(resolved) => resolved,
                Err(source) => {
                    self.report(
                        guild_id,
                        format!("Error extracting audio for **{}**: {source}", entry.title),
                    )
                    .await;
                    self.reset_own_claim(guild_id, epoch);
                    continue;
                }
            };

            // Mark the stream live before handing it to the backend so an
            // immediate end event still finds the session in `Playing`. The
            // epoch check shares the closure: a session a teardown released
            // must not come back as `Playing`.
            let claimed = self.sessions.with_session(guild_id, |session| {
                if session.epoch != epoch {
                    return false;
                }
                session.phase = Phase::Playing;
                session.paused = false;
                session.current = Some(entry.clone());
                true
            });
            if !claimed {
                debug!(
                    message = "session ended during resolution, dropping track",
                    guild = %guild_id,
                    title = %entry.title,
                );
                return Ok(());
            }

            match self.voice.play(guild_id, &resolved.handle).await {
                Ok(()) => {
                    // A teardown may have landed while the play op was in
                    // flight; the released session gets no announcement.
                    if self.is_stale(guild_id, epoch) {
                        debug!(
                            message = "session ended during playback start, dropping track",
                            guild = %guild_id,
                            title = %entry.title,
                        );
                        return Ok(());
                    }
                    self.report(guild_id, format!("Now playing: **{}**", entry.title))
                        .await;
                    return Ok(());
                }
                Err(source) => {
                    if self.is_stale(guild_id, epoch) {
                        debug!(
                            message = "session ended during playback start, dropping track",
                            guild = %guild_id,
                            title = %entry.title,
                        );
                        return Ok(());
                    }
                    self.report(
                        guild_id,
                        format!("Error playing **{}**: {source}", entry.title),
                    )
                    .await;
                    self.reset_own_claim(guild_id, epoch);
                    continue;
                }
            }
        }
    }

    /// React to the backend reporting the end of a stream.
    pub async fn handle_track_end(
        &self,
        guild_id: Id<GuildMarker>,
        reason: &str,
    ) -> Result<(), ControlError> {
        // A play that replaces a live stream ends the replaced one; advancing
        // on that event would double-step the queue.
        if reason == REASON_REPLACED {
            return Ok(());
        }

        let ended = self.sessions.with_session(guild_id, |session| {
            if session.phase != Phase::Playing {
                return None;
            }
            let current = session.current.take();
            session.reset_playback();
            Some(current)
        });
        let Some(current) = ended else {
            debug!(
                message = "ignoring track end without active stream",
                guild = %guild_id,
                reason,
            );
            return Ok(());
        };

        // The player accepts a play op up front and surfaces a broken
        // stream through this event, so the failure is reported here.
        if reason == REASON_LOAD_FAILED {
            warn!(message = "player reported a load failure", guild = %guild_id);
            if let Some(entry) = current {
                self.report(
                    guild_id,
                    format!(
                        "Error playing **{}**: the player failed to load the stream",
                        entry.title,
                    ),
                )
                .await;
            }
        }
        self.advance(guild_id).await
    }

    /// Stop the current stream; the resulting end event drives the advance.
    pub async fn skip(&self, guild_id: Id<GuildMarker>) -> Result<(), ControlError> {
        self.sessions.with_session(guild_id, |session| {
            if !session.connected {
                return Err(ControlError::NotConnected);
            }
            if session.phase != Phase::Playing {
                return Err(ControlError::NothingPlaying);
            }
            Ok(())
        })?;
        self.voice.stop(guild_id).await?;
        Ok(())
    }

    pub async fn pause(&self, guild_id: Id<GuildMarker>) -> Result<(), ControlError> {
        self.sessions.with_session(guild_id, |session| {
            if !session.connected {
                return Err(ControlError::NotConnected);
            }
            if session.phase != Phase::Playing || session.paused {
                return Err(ControlError::NotPlaying);
            }
            Ok(())
        })?;
        self.voice.set_pause(guild_id, true).await?;
        self.sessions
            .with_session(guild_id, |session| session.paused = true);
        Ok(())
    }

    pub async fn resume(&self, guild_id: Id<GuildMarker>) -> Result<(), ControlError> {
        self.sessions.with_session(guild_id, |session| {
            if !session.connected {
                return Err(ControlError::NotConnected);
            }
            if !session.paused {
                return Err(ControlError::NotPaused);
            }
            Ok(())
        })?;
        self.voice.set_pause(guild_id, false).await?;
        self.sessions
            .with_session(guild_id, |session| session.paused = false);
        Ok(())
    }

    /// Drop everything for the guild: queue, current stream and the voice
    /// connection.
    pub async fn teardown(&self, guild_id: Id<GuildMarker>) -> Result<(), ControlError> {
        let was_connected = self.sessions.with_session(guild_id, |session| {
            if !session.connected {
                return false;
            }
            session.queue.clear();
            session.release();
            true
        });
        if !was_connected {
            return Err(ControlError::NotConnected);
        }
        self.voice.disconnect(guild_id).await?;
        Ok(())
    }

    pub async fn volume(&self, guild_id: Id<GuildMarker>, value: i64) -> Result<(), ControlError> {
        if !VOLUME_BOUNDS.contains(&value) {
            return Err(ControlError::VolumeOutOfBounds {
                value,
                bounds: VOLUME_BOUNDS,
            });
        }
        if !self.is_connected(guild_id) {
            return Err(ControlError::NotConnected);
        }
        self.voice.set_volume(guild_id, value).await?;
        Ok(())
    }

    pub async fn seek(&self, guild_id: Id<GuildMarker>, position_ms: i64) -> Result<(), ControlError> {
        if !self.is_playing(guild_id) {
            return Err(ControlError::NothingPlaying);
        }
        self.voice.seek(guild_id, position_ms).await?;
        Ok(())
    }

    fn is_stale(&self, guild_id: Id<GuildMarker>, epoch: u64) -> bool {
        self.sessions
            .with_session(guild_id, |session| session.epoch != epoch)
    }

    /// Drop this advance's playback claim so the loop can take the next
    /// entry. A session torn down in the meantime is left alone.
    fn reset_own_claim(&self, guild_id: Id<GuildMarker>, epoch: u64) {
        self.sessions.with_session(guild_id, |session| {
            if session.epoch == epoch {
                session.reset_playback();
            }
        });
    }

    async fn report(&self, guild_id: Id<GuildMarker>, content: String) {
        match self.sessions.text_channel(guild_id) {
            Some(channel_id) => self.notifier.notify(channel_id, content).await,
            None => debug!(
                message = "no text channel associated, dropping notification",
                guild = %guild_id,
                content = %content,
            ),
        }
    }
}
