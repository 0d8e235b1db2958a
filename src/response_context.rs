use std::sync::Arc;

use twilight_model::{
    channel::Message,
    id::{marker::ChannelMarker, Id},
};

use crate::state::State;

/// Reply target for a command, bound to the channel the command came from.
#[derive(Clone)]
pub struct ResponseContext {
    state: Arc<State>,
    channel_id: Id<ChannelMarker>,
}

impl ResponseContext {
    pub fn new(state: Arc<State>, to: &Message) -> Self {
        Self {
            state,
            channel_id: to.channel_id,
        }
    }

    pub async fn with_content(&self, content: impl Into<String>) -> Result<Message, anyhow::Error> {
        let content = content.into();
        let response = self
            .state
            .http
            .create_message(self.channel_id)
            .content(&content)
            .await?;
        Ok(response.model().await?)
    }
}
