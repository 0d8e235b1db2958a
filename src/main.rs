use std::{future::Future, sync::Arc};

use anyhow::Context;
use tracing::{debug, info, warn};
use twilight_cache_inmemory::{InMemoryCache, ResourceType};
use twilight_gateway::{Event, EventTypeFlags, Intents, Shard, ShardId, StreamExt as _};
use twilight_http::Client as HttpClient;
use twilight_lavalink::Lavalink;
use twilight_standby::Standby;

use queuebot::{
    commands,
    config::Config,
    controller::Controller,
    events,
    notify::ChannelNotifier,
    selection,
    source::{LavalinkSource, TrackSource},
    state::State,
    voice::{LavalinkVoice, VoiceBackend},
};

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    // Initialize the tracing subscriber.
    tracing_subscriber::fmt::init();

    let config = Config::from_env()?;

    let http = Arc::new(HttpClient::new(config.token.clone()));
    let user_id = http.current_user().await?.model().await?.id;

    let lavalink = Arc::new(Lavalink::new(user_id, 1));
    let (_node, lavalink_events) = lavalink
        .add(config.lavalink_host, config.lavalink_authorization.clone())
        .await
        .with_context(|| "unable to connect to the lavalink node")?;

    let intents = Intents::GUILDS
        | Intents::GUILD_MESSAGES
        | Intents::GUILD_MESSAGE_REACTIONS
        | Intents::GUILD_VOICE_STATES
        | Intents::MESSAGE_CONTENT;
    let mut shard = Shard::new(ShardId::ONE, config.token.clone(), intents);

    let state = {
        let source: Arc<dyn TrackSource> = Arc::new(LavalinkSource::new(
            reqwest::Client::new(),
            config.lavalink_host,
            config.lavalink_authorization.clone(),
        ));
        let voice: Arc<dyn VoiceBackend> =
            Arc::new(LavalinkVoice::new(Arc::clone(&lavalink), shard.sender()));
        let notifier = Arc::new(ChannelNotifier::new(Arc::clone(&http)));
        let controller = Controller::new(Arc::clone(&source), voice, notifier);

        Arc::new(State {
            cache: InMemoryCache::builder()
                .resource_types(ResourceType::VOICE_STATE)
                .build(),
            command_prefix: config.command_prefix,
            controller,
            http,
            source,
            standby: Standby::new(),
        })
    };

    tokio::spawn(events::process_lavalink(
        Arc::clone(&state),
        lavalink_events,
    ));

    info!(message = "processing events");

    while let Some(item) = shard.next_event(EventTypeFlags::all()).await {
        let event = match item {
            Ok(event) => event,
            Err(source) => {
                warn!(message = "error receiving gateway event", ?source);
                continue;
            }
        };

        state.cache.update(&event);
        state.standby.process(&event);
        if let Err(source) = lavalink.process(&event).await {
            warn!(message = "error processing gateway event", ?source);
        }

        if let Event::MessageCreate(msg) = event {
            if msg.author.bot
                || msg.guild_id.is_none()
                || !msg.content.starts_with(&state.command_prefix)
            {
                continue;
            }

            let content = msg.content[state.command_prefix.len()..].to_owned();
            let mut parts = content.splitn(2, ' ');
            let command = parts.next().unwrap_or_default().to_owned();
            let argument = parts.next().unwrap_or_default().trim().to_owned();

            let state = Arc::clone(&state);
            match command.as_str() {
                "join" => spawn(async move { commands::join(state, msg.0).await }),
                "play" => spawn(async move { commands::play(state, msg.0, argument).await }),
                "add" => spawn(async move { commands::add(state, msg.0, argument).await }),
                "pause" => spawn(async move { commands::pause(state, msg.0).await }),
                "resume" => spawn(async move { commands::resume(state, msg.0).await }),
                "next" => spawn(async move { commands::skip(state, msg.0).await }),
                "list" => spawn(async move { commands::list(state, msg.0).await }),
                "remove" => spawn(async move { commands::remove(state, msg.0, argument).await }),
                "search" => spawn(async move { selection::run(state, msg.0, argument).await }),
                "volume" => spawn(async move { commands::volume(state, msg.0, argument).await }),
                "seek" => spawn(async move { commands::seek(state, msg.0, argument).await }),
                "exit" => spawn(async move { commands::exit(state, msg.0).await }),
                "commands" => spawn(async move { commands::show_commands(state, msg.0).await }),
                _ => continue,
            }
        }
    }

    Ok(())
}

fn spawn<F>(fut: F)
where
    F: Future<Output = Result<(), anyhow::Error>> + Send + 'static,
{
    tokio::spawn(async move {
        if let Err(why) = fut.await {
            debug!("handler error: {:?}", why);
        }
    });
}
