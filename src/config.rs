use std::{
    env,
    net::{SocketAddr, ToSocketAddrs},
};

use anyhow::Context;

/// Process configuration, read from the environment once at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub command_prefix: String,
    pub lavalink_authorization: String,
    pub lavalink_host: SocketAddr,
    pub token: String,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        // Populate the environment from `.env` when one is present.
        let _ = dotenvy::dotenv();

        let token = env::var("DISCORD_TOKEN")
            .with_context(|| "unable to obtain DISCORD_TOKEN env var")?;
        let lavalink_host = env::var("LAVALINK_HOST")
            .with_context(|| "unable to obtain LAVALINK_HOST env var")?
            .to_socket_addrs()
            .with_context(|| "unable to parse LAVALINK_HOST env var")?
            .next()
            .with_context(|| "unable to resolve LAVALINK_HOST env var")?;
        let lavalink_authorization = env::var("LAVALINK_AUTHORIZATION")
            .with_context(|| "unable to obtain LAVALINK_AUTHORIZATION env var")?;
        let command_prefix = env::var("COMMAND_PREFIX").unwrap_or_else(|_| "!".to_owned());

        Ok(Self {
            command_prefix,
            lavalink_authorization,
            lavalink_host,
            token,
        })
    }
}
