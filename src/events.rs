use std::sync::Arc;

use futures::StreamExt;
use tracing::{debug, warn};
use twilight_lavalink::{model::IncomingEvent, node::IncomingEvents};

use crate::state::State;

/// Drive playback from the node's event stream.
///
/// Runs until the node connection closes. A single task consumes the
/// stream, so end-of-track handling for a guild never races itself.
pub async fn process_lavalink(state: Arc<State>, mut events: IncomingEvents) {
    while let Some(event) = events.next().await {
        match event {
            IncomingEvent::TrackEnd(end) => {
                debug!(
                    message = "track ended",
                    guild = %end.guild_id,
                    reason = %end.reason,
                );
                if let Err(source) = state
                    .controller
                    .handle_track_end(end.guild_id, &end.reason)
                    .await
                {
                    warn!(
                        message = "unable to advance after track end",
                        guild = %end.guild_id,
                        %source,
                    );
                }
            }
            IncomingEvent::TrackStart(start) => {
                debug!(message = "track started", guild = %start.guild_id);
            }
            _ => {}
        }
    }
    debug!(message = "lavalink event stream ended");
}
