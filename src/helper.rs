use tracing::debug;
use twilight_model::id::{
    marker::{ChannelMarker, GuildMarker, UserMarker},
    Id,
};

use crate::state::State;

/// The voice channel `user_id` currently sits in, according to the cache.
pub fn user_voice_channel(
    state: &State,
    guild_id: Id<GuildMarker>,
    user_id: Id<UserMarker>,
) -> Option<Id<ChannelMarker>> {
    let voice_state = state.cache.voice_state(user_id, guild_id);
    let Some(voice_state) = voice_state else {
        debug!(
            message = "unable to find user voice state in cache",
            guild = %guild_id,
            user = %user_id,
        );
        return None;
    };
    Some(voice_state.channel_id())
}
