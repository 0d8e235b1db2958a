use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;
use twilight_http::Client as HttpClient;
use twilight_model::id::{marker::ChannelMarker, Id};

/// Sink for playback progress messages that are not replies to a command:
/// track started, track failed, queue drained.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, channel_id: Id<ChannelMarker>, content: String);
}

/// Posts notifications as plain messages to a text channel.
pub struct ChannelNotifier {
    http: Arc<HttpClient>,
}

impl ChannelNotifier {
    pub fn new(http: Arc<HttpClient>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl Notifier for ChannelNotifier {
    async fn notify(&self, channel_id: Id<ChannelMarker>, content: String) {
        let sent = self.http.create_message(channel_id).content(&content).await;
        if let Err(source) = sent {
            warn!(
                message = "unable to deliver playback notification",
                channel = %channel_id,
                ?source,
            );
        }
    }
}
