use std::net::SocketAddr;

use async_trait::async_trait;
use reqwest::{header::AUTHORIZATION, Client as ReqwestClient};
use serde::Deserialize;
use thiserror::Error;

/// How many candidates an interactive search offers.
pub const SEARCH_RESULT_LIMIT: usize = 5;

/// One search hit, not yet loaded for playback.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TrackCandidate {
    pub title: String,
    pub canonical_url: String,
}

/// A fully resolved song: display title, the stable URL it can be
/// re-resolved from, and the opaque handle the player consumes.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ResolvedTrack {
    pub title: String,
    pub canonical_url: String,
    pub handle: String,
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("track lookup request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("no tracks found")]
    NoMatches,
    #[error("the node failed to load the track")]
    LoadFailed,
}

/// Turns user input (a URL or free-text search) into playable tracks.
#[async_trait]
pub trait TrackSource: Send + Sync {
    /// Resolve the best match for a direct URL or search query.
    async fn resolve(&self, identifier: &str) -> Result<ResolvedTrack, SourceError>;

    /// Ordered candidates for an interactive pick.
    async fn search(&self, query: &str) -> Result<Vec<TrackCandidate>, SourceError>;
}

/// Track resolution through the Lavalink REST API.
pub struct LavalinkSource {
    reqwest: ReqwestClient,
    address: SocketAddr,
    authorization: String,
}

impl LavalinkSource {
    pub fn new(
        reqwest: ReqwestClient,
        address: SocketAddr,
        authorization: impl Into<String>,
    ) -> Self {
        Self {
            reqwest,
            address,
            authorization: authorization.into(),
        }
    }

    async fn load(&self, identifier: &str) -> Result<LoadedTracks, SourceError> {
        let url = format!("http://{}/loadtracks", self.address);
        let response = self
            .reqwest
            .get(url)
            .query(&[("identifier", identifier)])
            .header(AUTHORIZATION, self.authorization.as_str())
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json::<LoadedTracks>().await?)
    }
}

#[async_trait]
impl TrackSource for LavalinkSource {
    async fn resolve(&self, identifier: &str) -> Result<ResolvedTrack, SourceError> {
        let loaded = self.load(&as_identifier(identifier)).await?;
        let track = loaded
            .into_tracks()?
            .into_iter()
            .next()
            .ok_or(SourceError::NoMatches)?;
        Ok(track.into_resolved(identifier))
    }

    async fn search(&self, query: &str) -> Result<Vec<TrackCandidate>, SourceError> {
        let loaded = self.load(&format!("ytsearch:{query}")).await?;
        let candidates: Vec<_> = loaded
            .into_tracks()?
            .into_iter()
            .take(SEARCH_RESULT_LIMIT)
            .filter_map(LoadedTrack::into_candidate)
            .collect();
        if candidates.is_empty() {
            return Err(SourceError::NoMatches);
        }
        Ok(candidates)
    }
}

/// Direct URLs pass through untouched, anything else becomes a search.
fn as_identifier(input: &str) -> String {
    if input.starts_with("http://") || input.starts_with("https://") {
        input.to_owned()
    } else {
        format!("ytsearch:{input}")
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoadedTracks {
    load_type: String,
    #[serde(default)]
    tracks: Vec<LoadedTrack>,
}

impl LoadedTracks {
    fn into_tracks(self) -> Result<Vec<LoadedTrack>, SourceError> {
        match self.load_type.as_str() {
            "LOAD_FAILED" => Err(SourceError::LoadFailed),
            "NO_MATCHES" => Err(SourceError::NoMatches),
            _ => Ok(self.tracks),
        }
    }
}

#[derive(Debug, Deserialize)]
struct LoadedTrack {
    track: String,
    info: LoadedTrackInfo,
}

impl LoadedTrack {
    fn into_resolved(self, fallback_url: &str) -> ResolvedTrack {
        ResolvedTrack {
            title: self.info.title.unwrap_or_else(|| "Unknown title".to_owned()),
            canonical_url: self
                .info
                .uri
                .unwrap_or_else(|| fallback_url.to_owned()),
            handle: self.track,
        }
    }

    /// Candidates without a stable URL cannot be queued, drop them.
    fn into_candidate(self) -> Option<TrackCandidate> {
        Some(TrackCandidate {
            title: self.info.title.unwrap_or_else(|| "Unknown title".to_owned()),
            canonical_url: self.info.uri?,
        })
    }
}

#[derive(Debug, Deserialize)]
struct LoadedTrackInfo {
    title: Option<String>,
    uri: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direct_urls_are_not_wrapped_in_a_search() {
        assert_eq!(
            as_identifier("https://youtu.be/dQw4w9WgXcQ"),
            "https://youtu.be/dQw4w9WgXcQ"
        );
        assert_eq!(as_identifier("darude sandstorm"), "ytsearch:darude sandstorm");
    }

    #[test]
    fn load_response_parses_and_filters() {
        let body = r#"{
            "loadType": "SEARCH_RESULT",
            "playlistInfo": {},
            "tracks": [
                {
                    "track": "QAAAjQIA",
                    "info": {
                        "identifier": "dQw4w9WgXcQ",
                        "isSeekable": true,
                        "author": "Rick Astley",
                        "length": 212000,
                        "isStream": false,
                        "position": 0,
                        "title": "Never Gonna Give You Up",
                        "uri": "https://www.youtube.com/watch?v=dQw4w9WgXcQ"
                    }
                },
                {
                    "track": "QBBBjQIB",
                    "info": {
                        "identifier": "local",
                        "isSeekable": false,
                        "length": 1000,
                        "isStream": false,
                        "position": 0,
                        "title": null,
                        "uri": null
                    }
                }
            ]
        }"#;

        let loaded: LoadedTracks = serde_json::from_str(body).unwrap();
        let tracks = loaded.into_tracks().unwrap();
        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[0].info.title.as_deref(), Some("Never Gonna Give You Up"));
        assert_eq!(tracks[0].track, "QAAAjQIA");

        let candidates: Vec<_> = tracks
            .into_iter()
            .filter_map(LoadedTrack::into_candidate)
            .collect();
        // The entry without a URL is dropped.
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].title, "Never Gonna Give You Up");
    }

    #[test]
    fn resolution_falls_back_to_the_input_url() {
        let track = LoadedTrack {
            track: "QAAA".to_owned(),
            info: LoadedTrackInfo {
                title: None,
                uri: None,
            },
        };

        let resolved = track.into_resolved("https://example.com/page");
        assert_eq!(resolved.title, "Unknown title");
        assert_eq!(resolved.canonical_url, "https://example.com/page");
        assert_eq!(resolved.handle, "QAAA");
    }

    #[test]
    fn failed_and_empty_loads_become_errors() {
        let failed: LoadedTracks =
            serde_json::from_str(r#"{"loadType": "LOAD_FAILED"}"#).unwrap();
        assert!(matches!(failed.into_tracks(), Err(SourceError::LoadFailed)));

        let empty: LoadedTracks =
            serde_json::from_str(r#"{"loadType": "NO_MATCHES", "tracks": []}"#).unwrap();
        assert!(matches!(empty.into_tracks(), Err(SourceError::NoMatches)));
    }
}
