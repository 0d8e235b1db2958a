use std::sync::Arc;

use twilight_cache_inmemory::InMemoryCache;
use twilight_http::Client as HttpClient;
use twilight_standby::Standby;

use crate::{controller::Controller, source::TrackSource};

/// Everything the command handlers share.
pub struct State {
    pub cache: InMemoryCache,
    pub command_prefix: String,
    pub controller: Controller,
    pub http: Arc<HttpClient>,
    pub source: Arc<dyn TrackSource>,
    pub standby: Standby,
}
